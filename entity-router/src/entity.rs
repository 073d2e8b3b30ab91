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

//! Entity abstraction and the per-operation inputs and payloads exchanged with drivers.
//!
//! The concrete entity type system lives outside this crate. The router only needs a stable
//! kind tag (used to key capabilities and buffers), a uuid (used as the query of each item) and
//! optional hooks for filtering and range narrowing.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// An item stored behind a route.
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Entity-kind tag, e.g. `"objects"`. Used in capability keys, route keys and buffer keys.
    const KIND: &'static str;

    /// Unique identifier of this entity. Serves as the query string for publish results.
    fn uuid(&self) -> &str;

    /// Key matched by route entity filters. Defaults to the uuid.
    fn filter_key(&self) -> &str {
        self.uuid()
    }

    /// Position used when narrowing redirected range queries.
    fn range_key(&self) -> i64 {
        0
    }
}

/// Whether a write is executed against the driver or appended to its async buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationMode {
    Sync,
    #[default]
    Async,
}

/// Request to delete or expire entities addressed by `target`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDeleteRequest {
    pub target: String,
    /// Optional cutoff; entities older than this (driver-defined unit) are affected.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl EntityDeleteRequest {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(target: impl Into<String>, timestamp: i64) -> Self {
        Self {
            target: target.into(),
            timestamp: Some(timestamp),
        }
    }
}

/// Request to invalidate cached state for one entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityEmptyRequest {
    pub entity_uuid: String,
}

impl EntityEmptyRequest {
    pub fn new(entity_uuid: impl Into<String>) -> Self {
        Self {
            entity_uuid: entity_uuid.into(),
        }
    }
}

/// Request to update one secondary index entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityIndexRequest {
    pub target: String,
    pub subject: String,
    pub value: String,
}

impl EntityIndexRequest {
    pub fn new(
        target: impl Into<String>,
        subject: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            subject: subject.into(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishResultType {
    Created,
    Changed,
    Unchanged,
    Queued,
}

/// Outcome of publishing one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct PublishResult<E> {
    pub kind: PublishResultType,
    pub entity: E,
}

impl<E> PublishResult<E> {
    pub fn new(kind: PublishResultType, entity: E) -> Self {
        Self { kind, entity }
    }

    pub fn queued(entity: E) -> Self {
        Self::new(PublishResultType::Queued, entity)
    }
}

/// Outcome of an expire request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub target: String,
    pub count: u64,
}

impl DeleteResult {
    pub fn new(target: impl Into<String>, count: u64) -> Self {
        Self {
            target: target.into(),
            count,
        }
    }
}
