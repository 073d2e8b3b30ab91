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

//! Recursion guard carried through nested-router and redirect dispatch.

use crate::observability::fields;

/// Maximum number of nested dispatch hops (redirects, nested routers, option feedback).
pub const MAX_DISPATCH_DEPTH: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CycleReason {
    RouterReentered,
    MaxDepth,
}

impl CycleReason {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            CycleReason::RouterReentered => fields::REASON_ROUTER_REENTERED,
            CycleReason::MaxDepth => fields::REASON_MAX_DEPTH,
        }
    }
}

/// Depth and router chain of the dispatch currently executing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchTrace {
    depth: usize,
    routers: Vec<String>,
}

impl DispatchTrace {
    /// Trace for a call entering `router_id` from outside the engine.
    pub fn root(router_id: &str) -> Self {
        Self {
            depth: 0,
            routers: vec![router_id.to_string()],
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Router ids entered so far, outermost first.
    pub fn routers(&self) -> &[String] {
        &self.routers
    }

    pub(crate) fn exceeded(&self) -> bool {
        self.depth > MAX_DISPATCH_DEPTH
    }

    /// One hop deeper within the same router chain.
    pub(crate) fn deeper(&self) -> Self {
        Self {
            depth: self.depth + 1,
            routers: self.routers.clone(),
        }
    }

    /// Trace for dispatching into nested router `router_id`.
    pub(crate) fn entering(&self, router_id: &str) -> Result<Self, CycleReason> {
        if self.routers.iter().any(|entered| entered == router_id) {
            return Err(CycleReason::RouterReentered);
        }
        let mut next = self.deeper();
        if next.exceeded() {
            return Err(CycleReason::MaxDepth);
        }
        next.routers.push(router_id.to_string());
        Ok(next)
    }
}
