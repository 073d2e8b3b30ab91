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

//! Route pattern matching with a per-router memo of `(pattern, route key)` outcomes.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use crate::configuration::WILDCARD;
use crate::observability::events;

const COMPONENT: &str = "pattern_matcher";

/// Matches route keys against configured patterns.
///
/// `*` matches everything and exact equality short-circuits. Anything else is compiled as an
/// unanchored regular expression; patterns that fail to compile never match. Outcomes are cached
/// for the lifetime of the matcher, which is owned by one router build.
#[derive(Default)]
pub struct PatternMatcher {
    cache: Mutex<HashMap<(String, String), bool>>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_match(&self, pattern: &str, route_key: &str) -> bool {
        if pattern == WILDCARD || pattern == route_key {
            return true;
        }

        let cache_key = (pattern.to_string(), route_key.to_string());
        if let Some(matched) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cache_key)
        {
            return *matched;
        }

        // Compile outside the lock; concurrent misses for one pair compute the same answer.
        let matched = match Regex::new(pattern) {
            Ok(regex) => regex.is_match(route_key),
            Err(err) => {
                warn!(
                    event = events::PATTERN_INVALID,
                    component = COMPONENT,
                    pattern,
                    err = %err,
                    "route pattern is not a valid regular expression"
                );
                false
            }
        };

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cache_key, matched);
        matched
    }

    #[cfg(test)]
    pub(crate) fn cached_entries(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
