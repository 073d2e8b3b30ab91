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

//! Per-query result codes and the response envelope returned by every dispatch.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

/// Classification of one query's outcome at one handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultType {
    Ok,
    Empty,
    NotFound,
    InternalError,
    RouteNotConfigured,
}

impl ResultType {
    pub const ALL: [ResultType; 5] = [
        ResultType::Ok,
        ResultType::Empty,
        ResultType::NotFound,
        ResultType::InternalError,
        ResultType::RouteNotConfigured,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultType::Ok => "Ok",
            ResultType::Empty => "Empty",
            ResultType::NotFound => "NotFound",
            ResultType::InternalError => "InternalError",
            ResultType::RouteNotConfigured => "RouteNotConfigured",
        }
    }
}

impl Display for ResultType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a result-code name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownResultType(pub String);

impl Display for UnknownResultType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown result type: {}", self.0)
    }
}

impl std::error::Error for UnknownResultType {}

impl FromStr for ResultType {
    type Err = UnknownResultType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ResultType::ALL
            .into_iter()
            .find(|result_type| result_type.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownResultType(s.to_string()))
    }
}

/// One query's outcome at one handler.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteResult<T> {
    /// Id of the driver, router or target that produced the result.
    pub source_id: String,
    /// The query (or entity id) this result answers. `None` for request-level results.
    pub query: Option<String>,
    pub result_type: ResultType,
    pub content: Option<T>,
}

impl<T> RouteResult<T> {
    pub fn new(
        source_id: impl Into<String>,
        query: Option<String>,
        result_type: ResultType,
        content: Option<T>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            query,
            result_type,
            content,
        }
    }

    pub fn ok(source_id: impl Into<String>, query: impl Into<String>, content: T) -> Self {
        Self::new(source_id, Some(query.into()), ResultType::Ok, Some(content))
    }

    pub fn empty(source_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(source_id, Some(query.into()), ResultType::Empty, None)
    }

    pub fn not_found(source_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(source_id, Some(query.into()), ResultType::NotFound, None)
    }

    pub fn internal_error(source_id: impl Into<String>, query: Option<String>) -> Self {
        Self::new(source_id, query, ResultType::InternalError, None)
    }

    pub fn route_not_configured(source_id: impl Into<String>, query: Option<String>) -> Self {
        Self::new(source_id, query, ResultType::RouteNotConfigured, None)
    }

    pub fn is_ok(&self) -> bool {
        self.result_type == ResultType::Ok
    }
}

/// Results of one dispatch plus the time it took.
#[derive(Clone, Debug)]
pub struct RouteResponse<T> {
    pub results: Vec<RouteResult<T>>,
    pub duration: Duration,
}

impl<T> Default for RouteResponse<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            duration: Duration::ZERO,
        }
    }
}

impl<T> RouteResponse<T> {
    pub fn new(results: Vec<RouteResult<T>>, duration: Duration) -> Self {
        Self { results, duration }
    }

    /// `true` when at least one result is `Ok`.
    pub fn is_success(&self) -> bool {
        self.results.iter().any(RouteResult::is_ok)
    }

    /// `true` when there is at least one result and every result is `Empty`.
    pub fn is_empty(&self) -> bool {
        !self.results.is_empty()
            && self
                .results
                .iter()
                .all(|result| result.result_type == ResultType::Empty)
    }

    pub fn success_results(&self) -> impl Iterator<Item = &RouteResult<T>> {
        self.results.iter().filter(|result| result.is_ok())
    }

    /// Contents of the `Ok` results, in result order.
    pub fn content(&self) -> Vec<&T> {
        self.success_results()
            .filter_map(|result| result.content.as_ref())
            .collect()
    }
}
