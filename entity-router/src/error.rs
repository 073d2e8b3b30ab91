/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Error types surfaced by driver collaborators and router lifecycle APIs.
//!
//! Dispatch entry points never return these: driver failures are downgraded to
//! `InternalError` results at the target boundary.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure reported by a driver capability call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// The backend could not be reached or refused the call.
    Unavailable(String),
    /// The backend accepted the call but failed to complete it.
    Failed(String),
    /// The driver does not implement the requested operation for this input.
    Unsupported(String),
}

impl DriverError {
    pub fn failed(message: impl Into<String>) -> Self {
        DriverError::Failed(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        DriverError::Unavailable(message.into())
    }
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::Unavailable(message) => write!(f, "driver unavailable: {message}"),
            DriverError::Failed(message) => write!(f, "driver call failed: {message}"),
            DriverError::Unsupported(message) => {
                write!(f, "operation not supported by driver: {message}")
            }
        }
    }
}

impl Error for DriverError {}

/// Failures for router insertion through the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddRouterError {
    EmptyId,
    AlreadyExists(String),
}

/// Failures for router removal through the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveRouterError {
    NotFound(String),
}

impl Display for AddRouterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AddRouterError::EmptyId => write!(f, "router configuration id must not be empty"),
            AddRouterError::AlreadyExists(id) => write!(f, "router already exists: {id}"),
        }
    }
}

impl Error for AddRouterError {}

impl Display for RemoveRouterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoveRouterError::NotFound(id) => write!(f, "router not found: {id}"),
        }
    }
}

impl Error for RemoveRouterError {}
