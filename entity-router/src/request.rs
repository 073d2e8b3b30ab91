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

//! Dispatch requests: an id, a human-readable name, ordered queries and optional parameters.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// Ordered key/value parameters attached to a request or a single query.
pub type RouteParameters = BTreeMap<String, String>;

/// One query item plus its own parameters (for example range bounds).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteQuery {
    pub query: String,
    pub parameters: RouteParameters,
}

impl RouteQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            parameters: RouteParameters::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.parameters.insert(name.into(), value.to_string());
        self
    }

    /// Typed parameter lookup; missing or unparsable values yield `None`.
    pub fn parameter<T: FromStr>(&self, name: &str) -> Option<T> {
        self.parameters.get(name).and_then(|value| value.parse().ok())
    }
}

impl From<&str> for RouteQuery {
    fn from(query: &str) -> Self {
        RouteQuery::new(query)
    }
}

impl From<String> for RouteQuery {
    fn from(query: String) -> Self {
        RouteQuery::new(query)
    }
}

/// A request flowing through the dispatch engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteRequest {
    pub id: String,
    pub name: String,
    pub queries: Vec<RouteQuery>,
    pub parameters: RouteParameters,
}

impl RouteRequest {
    /// Builds a request; a fresh v4 uuid is used when `id` is `None` or empty.
    pub fn new<I, Q>(name: impl Into<String>, id: Option<String>, queries: I) -> Self
    where
        I: IntoIterator<Item = Q>,
        Q: Into<RouteQuery>,
    {
        let id = match id {
            Some(id) if !id.is_empty() => id,
            _ => Uuid::new_v4().to_string(),
        };

        Self {
            id,
            name: name.into(),
            queries: queries.into_iter().map(Into::into).collect(),
            parameters: RouteParameters::new(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.parameters.insert(name.into(), value.to_string());
        self
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Display) {
        self.parameters.insert(name.into(), value.to_string());
    }

    pub fn parameter<T: FromStr>(&self, name: &str) -> Option<T> {
        self.parameters.get(name).and_then(|value| value.parse().ok())
    }

    /// Query strings in submission order.
    pub fn query_strings(&self) -> Vec<String> {
        self.queries.iter().map(|query| query.query.clone()).collect()
    }

    /// A request with the same id and name and no queries or parameters.
    pub fn derive_empty(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            queries: Vec::new(),
            parameters: RouteParameters::new(),
        }
    }
}

/// Builds the display name `"[{category}] {operation} {kind}"`.
pub fn request_name(category: &str, operation: &str, kind: &str) -> String {
    format!("[{category}] {operation} {kind}")
}
