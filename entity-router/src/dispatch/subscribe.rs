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

//! Subscription fan-in across resolved targets.
//!
//! Every bound subscribe-capable driver and every nested router contributes a consumer; the
//! consumers are merged into one. Subscriptions produce no result codes, so redirects do not
//! apply.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{trace, warn};

use crate::configuration::TargetType;
use crate::consumer::Consumer;
use crate::dispatch::trace::DispatchTrace;
use crate::driver::EntitySubscribeDriver;
use crate::entity::Entity;
use crate::observability::events;
use crate::request::RouteRequest;
use crate::router::Router;

const COMPONENT: &str = "dispatch_subscribe";

/// Subscribes to every target resolved for `route` and merges the consumers.
pub(crate) fn subscribe_targets<'a, E: Entity>(
    router: &'a Router,
    route: &'a str,
    request: &'a RouteRequest,
    trace: &'a DispatchTrace,
) -> BoxFuture<'a, Option<Consumer<Vec<E>>>> {
    async move {
        let targets = router.get_targets(route);
        trace!(
            event = events::DISPATCH_RECEIVED,
            component = COMPONENT,
            request_id = request.id.as_str(),
            request_name = request.name.as_str(),
            router_id = router.id(),
            route,
            targets = targets.len(),
            depth = trace.depth(),
            "subscription received"
        );

        let mut consumers = Vec::new();
        for target in &targets {
            match target.target_type() {
                TargetType::Driver => {
                    for driver in target.drivers::<dyn EntitySubscribeDriver<E>>().iter() {
                        match AssertUnwindSafe(driver.handle.subscribe())
                            .catch_unwind()
                            .await
                        {
                            Ok(Ok(consumer)) => consumers.push(consumer),
                            Ok(Err(err)) => warn!(
                                event = events::SUBSCRIBE_DRIVER_FAILED,
                                component = COMPONENT,
                                request_id = request.id.as_str(),
                                router_id = router.id(),
                                target_id = target.id(),
                                driver_id = driver.id(),
                                err = %err,
                                "driver subscription failed"
                            ),
                            Err(_) => warn!(
                                event = events::SUBSCRIBE_DRIVER_FAILED,
                                component = COMPONENT,
                                request_id = request.id.as_str(),
                                router_id = router.id(),
                                target_id = target.id(),
                                driver_id = driver.id(),
                                "driver subscription panicked"
                            ),
                        }
                    }
                }
                TargetType::Router => {
                    let Some(nested) = target.router() else {
                        continue;
                    };
                    let nested_trace = match trace.entering(nested.id()) {
                        Ok(nested_trace) => nested_trace,
                        Err(reason) => {
                            warn!(
                                event = events::DISPATCH_CYCLE_DETECTED,
                                component = COMPONENT,
                                request_id = request.id.as_str(),
                                router_id = router.id(),
                                target_id = target.id(),
                                depth = trace.depth(),
                                reason = reason.as_str(),
                                "subscription cycle detected; nested router skipped"
                            );
                            continue;
                        }
                    };
                    if let Some(consumer) = nested
                        .entities::<E>()
                        .subscribe_traced(route, Some(request.id.clone()), &nested_trace)
                        .await
                    {
                        consumers.push(consumer);
                    }
                }
            }
        }

        if consumers.is_empty() {
            trace!(
                event = events::SUBSCRIBE_EMPTY,
                component = COMPONENT,
                request_id = request.id.as_str(),
                router_id = router.id(),
                "no consumer available for subscription"
            );
            return None;
        }

        trace!(
            event = events::SUBSCRIBE_MERGED,
            component = COMPONENT,
            request_id = request.id.as_str(),
            router_id = router.id(),
            consumers = consumers.len(),
            "merged subscription consumers"
        );
        Consumer::merge(consumers)
    }
    .boxed()
}
