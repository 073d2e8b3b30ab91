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

//! Entity filters compiled from a route's `filters` list.

use regex::Regex;
use tracing::warn;

use crate::configuration::WILDCARD;
use crate::entity::Entity;
use crate::observability::events;

const COMPONENT: &str = "entity_filter";

/// Allow/deny filter over [`Entity::filter_key`].
///
/// An entity passes when it matches any allow pattern (or there are none) and no deny
/// pattern. Deny patterns carry a leading `!`.
#[derive(Debug, Clone)]
pub struct EntityFilter {
    allow: Vec<Regex>,
    allow_all: bool,
    deny: Vec<Regex>,
}

impl EntityFilter {
    /// Compiles filter patterns. Returns `None` when nothing usable was configured.
    pub fn compile(patterns: &[String]) -> Option<Self> {
        let mut filter = EntityFilter {
            allow: Vec::new(),
            allow_all: false,
            deny: Vec::new(),
        };

        for pattern in patterns {
            let (negated, body) = match pattern.strip_prefix('!') {
                Some(body) => (true, body),
                None => (false, pattern.as_str()),
            };
            if body == WILDCARD {
                if !negated {
                    filter.allow_all = true;
                }
                continue;
            }
            match Regex::new(body) {
                Ok(regex) if negated => filter.deny.push(regex),
                Ok(regex) => filter.allow.push(regex),
                Err(err) => warn!(
                    event = events::FILTER_PATTERN_INVALID,
                    component = COMPONENT,
                    pattern = pattern.as_str(),
                    err = %err,
                    "ignoring invalid entity filter pattern"
                ),
            }
        }

        if filter.allow.is_empty() && filter.deny.is_empty() && !filter.allow_all {
            None
        } else {
            Some(filter)
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        let allowed =
            self.allow_all || self.allow.is_empty() || self.allow.iter().any(|r| r.is_match(key));
        allowed && !self.deny.iter().any(|r| r.is_match(key))
    }

    /// Entities that pass the filter, in input order.
    pub fn apply<E: Entity>(&self, entities: &[E]) -> Vec<E> {
        entities
            .iter()
            .filter(|entity| self.matches(entity.filter_key()))
            .cloned()
            .collect()
    }
}

/// Applies an optional filter; `None` passes everything through.
pub fn filter_entities<E: Entity>(filter: Option<&EntityFilter>, entities: &[E]) -> Vec<E> {
    match filter {
        Some(filter) => filter.apply(entities),
        None => entities.to_vec(),
    }
}
