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

//! Dispatch engine.
//!
//! [`EntityRouter`] is the typed entry point. Every operation builds a request, resolves the
//! route's targets on its router and hands them to the generic engine together with an
//! operation handler. Subscriptions take a separate fan-in path. [`DispatchTrace`] bounds
//! recursion through nested routers, redirects and option feedback.

pub(crate) mod engine;
pub(crate) mod operations;
pub mod query_range;
pub(crate) mod subscribe;
pub(crate) mod trace;

pub use engine::{DispatchResponse, Operation, RouteOption};
pub use operations::EntityRouter;
pub use trace::{DispatchTrace, MAX_DISPATCH_DEPTH};
