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

//! The generic `run` loop: execute a request against resolved targets, downgrade driver failures
//! to per-query results, and apply redirects recursively.
//!
//! The engine knows nothing about concrete operations. An [`OperationHandler`] supplies the
//! driver call, the nested-router call and the request narrowing used for redirects; the engine
//! owns result aggregation, the redirect walk and option collection.

use async_trait::async_trait;
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

use crate::configuration::{RedirectOption, TargetType};
use crate::dispatch::trace::{CycleReason, DispatchTrace};
use crate::driver::{BoundDriver, CapabilityInterface, CapabilityKey};
use crate::error::DriverError;
use crate::observability::{events, fields};
use crate::request::{request_name, RouteRequest};
use crate::result::{ResultType, RouteResponse, RouteResult};
use crate::router::Router;
use crate::routing::target::RouteTarget;

const COMPONENT: &str = "dispatch_engine";

const REQUEST_CATEGORY: &str = "Entities";

/// Explicit descriptor of one typed operation: capability tag, entity-kind tag and result kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operation {
    pub key: CapabilityKey,
    pub result_kind: &'static str,
}

impl Operation {
    pub fn of<D: CapabilityInterface + ?Sized>(result_kind: &'static str) -> Self {
        Self {
            key: D::key(),
            result_kind,
        }
    }

    /// Display name of requests for this operation, e.g. `[Entities] Publish objects`.
    pub fn request_name(&self) -> String {
        request_name(
            REQUEST_CATEGORY,
            self.key.capability.label(),
            self.key.entity_kind,
        )
    }
}

/// A post-redirect side effect collected during dispatch.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteOption<T> {
    pub option: RedirectOption,
    /// The query the option applies to.
    pub request: Option<String>,
    /// Payload carried by `Publish` options.
    pub argument: Option<T>,
}

/// Aggregated outcome of [`run`]: results in target order, elapsed time and collected options.
#[derive(Clone, Debug)]
pub struct DispatchResponse<T> {
    pub results: Vec<RouteResult<T>>,
    pub duration: Duration,
    pub options: Vec<RouteOption<T>>,
}

impl<T> Default for DispatchResponse<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            duration: Duration::ZERO,
            options: Vec::new(),
        }
    }
}

impl<T> DispatchResponse<T> {
    pub fn into_parts(self) -> (RouteResponse<T>, Vec<RouteOption<T>>) {
        (RouteResponse::new(self.results, self.duration), self.options)
    }

    pub fn into_response(self) -> RouteResponse<T> {
        RouteResponse::new(self.results, self.duration)
    }
}

/// Operation-specific callbacks used by [`run`].
#[async_trait]
pub(crate) trait OperationHandler<D: ?Sized, T>: Send + Sync {
    /// Executes the request against one bound driver.
    async fn call_driver(
        &self,
        target: &RouteTarget,
        driver: &BoundDriver<D>,
        request: &RouteRequest,
    ) -> Result<RouteResponse<T>, DriverError>;

    /// Executes the request against a nested router.
    async fn call_router(
        &self,
        target: &RouteTarget,
        router: Arc<Router>,
        request: &RouteRequest,
        trace: &DispatchTrace,
    ) -> RouteResponse<T>;

    /// Derives the request handed to a redirect. `results` holds every primary result of the
    /// target; `triggered` is the group whose result type matched the redirect.
    fn process(
        &self,
        request: &RouteRequest,
        _results: &[RouteResult<T>],
        triggered: &[RouteResult<T>],
    ) -> RouteRequest {
        narrow_to_results(request, triggered)
    }

    /// The part of `request` a driver of `target` actually receives.
    fn delivered(&self, _target: &RouteTarget, request: &RouteRequest) -> RouteRequest {
        request.clone()
    }
}

/// Keeps only the queries answered by `results`. Request-level results, or results that name
/// none of the queries, keep the whole request.
pub(crate) fn narrow_to_results<T>(
    request: &RouteRequest,
    results: &[RouteResult<T>],
) -> RouteRequest {
    if results.iter().any(|result| result.query.is_none()) {
        return request.clone();
    }

    let queries: Vec<_> = request
        .queries
        .iter()
        .filter(|query| {
            results
                .iter()
                .any(|result| result.query.as_deref() == Some(query.query.as_str()))
        })
        .cloned()
        .collect();

    if queries.is_empty() {
        return request.clone();
    }

    RouteRequest {
        queries,
        ..request.clone()
    }
}

struct TargetResponse<T> {
    results: Vec<RouteResult<T>>,
    options: Vec<RouteOption<T>>,
}

impl<T> Default for TargetResponse<T> {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            options: Vec::new(),
        }
    }
}

fn per_query<T>(
    request: &RouteRequest,
    fallback: Option<String>,
    result: impl Fn(Option<String>) -> RouteResult<T>,
) -> Vec<RouteResult<T>> {
    if request.queries.is_empty() {
        return vec![result(fallback)];
    }
    request
        .queries
        .iter()
        .map(|query| result(Some(query.query.clone())))
        .collect()
}

fn push_option<T>(options: &mut Vec<RouteOption<T>>, option: RouteOption<T>) {
    if !options
        .iter()
        .any(|existing| existing.option == option.option && existing.request == option.request)
    {
        options.push(option);
    }
}

/// Resolves the targets for `route` on `router` and runs the request against them.
pub(crate) async fn dispatch<D, T, H>(
    router: &Router,
    operation: Operation,
    route: &str,
    request: &RouteRequest,
    handler: &H,
    trace: &DispatchTrace,
) -> DispatchResponse<T>
where
    D: CapabilityInterface + ?Sized,
    T: Clone + Send + Sync + 'static,
    H: OperationHandler<D, T>,
{
    let targets = router.get_targets(route);
    trace!(
        event = events::DISPATCH_RECEIVED,
        component = COMPONENT,
        request_id = request.id.as_str(),
        request_name = request.name.as_str(),
        router_id = router.id(),
        route,
        queries = request.queries.len(),
        targets = targets.len(),
        depth = trace.depth(),
        "dispatch received"
    );

    let response = run::<D, T, H>(router.id(), operation, request, &targets, handler, trace).await;

    trace!(
        event = events::DISPATCH_COMPLETED,
        component = COMPONENT,
        request_id = request.id.as_str(),
        request_name = request.name.as_str(),
        router_id = router.id(),
        results = response.results.len(),
        options = response.options.len(),
        elapsed_ms = fields::format_elapsed_ms(response.duration),
        "dispatch completed"
    );
    response
}

/// Runs `request` against `targets`.
///
/// Sibling targets execute concurrently; the aggregate keeps target order. Without targets every
/// query yields `RouteNotConfigured`.
pub(crate) async fn run<D, T, H>(
    router_id: &str,
    operation: Operation,
    request: &RouteRequest,
    targets: &[Arc<RouteTarget>],
    handler: &H,
    trace: &DispatchTrace,
) -> DispatchResponse<T>
where
    D: CapabilityInterface + ?Sized,
    T: Clone + Send + Sync + 'static,
    H: OperationHandler<D, T>,
{
    let started = Instant::now();

    if targets.is_empty() {
        trace!(
            event = events::DISPATCH_ROUTE_NOT_CONFIGURED,
            component = COMPONENT,
            request_id = request.id.as_str(),
            router_id,
            operation = %operation.key,
            "no target configured for route"
        );
        return DispatchResponse {
            results: per_query(request, None, |query| {
                RouteResult::route_not_configured(router_id, query)
            }),
            duration: started.elapsed(),
            options: Vec::new(),
        };
    }

    let mut response = DispatchResponse::default();
    for target_response in
        run_targets::<D, T, H>(router_id, operation, request, targets, handler, trace).await
    {
        response.results.extend(target_response.results);
        for option in target_response.options {
            push_option(&mut response.options, option);
        }
    }
    response.duration = started.elapsed();
    response
}

/// Runs `request` against each of `targets` concurrently; one response per target, in order.
fn run_targets<'a, D, T, H>(
    router_id: &'a str,
    operation: Operation,
    request: &'a RouteRequest,
    targets: &'a [Arc<RouteTarget>],
    handler: &'a H,
    trace: &'a DispatchTrace,
) -> BoxFuture<'a, Vec<TargetResponse<T>>>
where
    D: CapabilityInterface + ?Sized,
    T: Clone + Send + Sync + 'static,
    H: OperationHandler<D, T>,
{
    let pending: Vec<_> = targets
        .iter()
        .map(|target| run_target::<D, T, H>(router_id, operation, request, target, handler, trace))
        .collect();
    join_all(pending).boxed()
}

async fn run_target<D, T, H>(
    router_id: &str,
    operation: Operation,
    request: &RouteRequest,
    target: &RouteTarget,
    handler: &H,
    trace: &DispatchTrace,
) -> TargetResponse<T>
where
    D: CapabilityInterface + ?Sized,
    T: Clone + Send + Sync + 'static,
    H: OperationHandler<D, T>,
{
    if trace.exceeded() {
        return cycle_response(router_id, request, target, trace, CycleReason::MaxDepth);
    }

    match target.target_type() {
        TargetType::Driver => {
            run_driver_target::<D, T, H>(router_id, operation, request, target, handler, trace)
                .await
        }
        TargetType::Router => {
            run_router_target::<D, T, H>(router_id, operation, request, target, handler, trace)
                .await
        }
    }
}

async fn run_driver_target<D, T, H>(
    router_id: &str,
    operation: Operation,
    request: &RouteRequest,
    target: &RouteTarget,
    handler: &H,
    trace: &DispatchTrace,
) -> TargetResponse<T>
where
    D: CapabilityInterface + ?Sized,
    T: Clone + Send + Sync + 'static,
    H: OperationHandler<D, T>,
{
    let drivers = target.drivers::<D>();

    if drivers.is_empty() {
        trace!(
            event = events::DISPATCH_ROUTE_NOT_CONFIGURED,
            component = COMPONENT,
            request_id = request.id.as_str(),
            router_id,
            target_id = target.id(),
            operation = %operation.key,
            "no driver bound to target"
        );
        let results = per_query(request, None, |query| {
            RouteResult::route_not_configured(router_id, query)
        });
        return process_results::<D, T, H>(
            router_id,
            operation,
            request,
            target,
            target.id(),
            results,
            handler,
            trace,
        )
        .await;
    }

    let mut response = TargetResponse::default();
    for driver in drivers.iter() {
        let started = Instant::now();
        let outcome = AssertUnwindSafe(handler.call_driver(target, driver, request))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(driver_response)) => {
                trace!(
                    event = events::TARGET_DRIVER_RESPONSE,
                    component = COMPONENT,
                    request_id = request.id.as_str(),
                    router_id,
                    target_id = target.id(),
                    driver_id = driver.id(),
                    results = driver_response.results.len(),
                    elapsed_ms = fields::format_elapsed_ms(started.elapsed()),
                    "driver responded"
                );
                let processed = process_results::<D, T, H>(
                    router_id,
                    operation,
                    request,
                    target,
                    driver.id(),
                    driver_response.results,
                    handler,
                    trace,
                )
                .await;
                response.results.extend(processed.results);
                response.options.extend(processed.options);
                continue;
            }
            Ok(Err(err)) => warn!(
                event = events::TARGET_DRIVER_FAILED,
                component = COMPONENT,
                request_id = request.id.as_str(),
                router_id,
                target_id = target.id(),
                driver_id = driver.id(),
                err = %err,
                "driver call failed"
            ),
            Err(_) => warn!(
                event = events::TARGET_DRIVER_PANICKED,
                component = COMPONENT,
                request_id = request.id.as_str(),
                router_id,
                target_id = target.id(),
                driver_id = driver.id(),
                "driver call panicked"
            ),
        }

        let delivered = handler.delivered(target, request);
        if delivered.queries.is_empty() && !request.queries.is_empty() {
            continue;
        }
        response
            .results
            .extend(per_query(&delivered, Some(request.id.clone()), |query| {
                RouteResult::internal_error(driver.id(), query)
            }));
    }
    response
}

async fn run_router_target<D, T, H>(
    router_id: &str,
    operation: Operation,
    request: &RouteRequest,
    target: &RouteTarget,
    handler: &H,
    trace: &DispatchTrace,
) -> TargetResponse<T>
where
    D: CapabilityInterface + ?Sized,
    T: Clone + Send + Sync + 'static,
    H: OperationHandler<D, T>,
{
    let Some(router) = target.router() else {
        trace!(
            event = events::TARGET_ROUTER_UNBOUND,
            component = COMPONENT,
            request_id = request.id.as_str(),
            router_id,
            target_id = target.id(),
            "router target has no bound router"
        );
        return TargetResponse::default();
    };

    let nested_trace = match trace.entering(router.id()) {
        Ok(nested_trace) => nested_trace,
        Err(reason) => return cycle_response(router_id, request, target, trace, reason),
    };

    let started = Instant::now();
    let nested = handler
        .call_router(target, router.clone(), request, &nested_trace)
        .await;
    trace!(
        event = events::TARGET_ROUTER_RESPONSE,
        component = COMPONENT,
        request_id = request.id.as_str(),
        router_id,
        target_id = target.id(),
        nested_router_id = router.id(),
        results = nested.results.len(),
        elapsed_ms = fields::format_elapsed_ms(started.elapsed()),
        "nested router responded"
    );

    process_results::<D, T, H>(
        router_id,
        operation,
        request,
        target,
        router.id(),
        nested.results,
        handler,
        trace,
    )
    .await
}

fn cycle_response<T>(
    router_id: &str,
    request: &RouteRequest,
    target: &RouteTarget,
    trace: &DispatchTrace,
    reason: CycleReason,
) -> TargetResponse<T> {
    warn!(
        event = events::DISPATCH_CYCLE_DETECTED,
        component = COMPONENT,
        request_id = request.id.as_str(),
        router_id,
        target_id = target.id(),
        depth = trace.depth(),
        routers = ?trace.routers(),
        reason = reason.as_str(),
        "dispatch cycle detected; target not executed"
    );
    TargetResponse {
        results: per_query(request, Some(request.id.clone()), |query| {
            RouteResult::internal_error(target.id(), query)
        }),
        options: Vec::new(),
    }
}

/// Applies the target's redirects to `results` produced by `source_id`.
///
/// Result types are visited in first-appearance order; each uses the first redirect whose
/// conditions contain it. Redirect results are appended after the primary results.
#[allow(clippy::too_many_arguments)]
async fn process_results<D, T, H>(
    router_id: &str,
    operation: Operation,
    request: &RouteRequest,
    target: &RouteTarget,
    source_id: &str,
    results: Vec<RouteResult<T>>,
    handler: &H,
    trace: &DispatchTrace,
) -> TargetResponse<T>
where
    D: CapabilityInterface + ?Sized,
    T: Clone + Send + Sync + 'static,
    H: OperationHandler<D, T>,
{
    if target.redirects().is_empty() || results.is_empty() {
        return TargetResponse {
            results,
            options: Vec::new(),
        };
    }

    let mut result_types: Vec<ResultType> = Vec::new();
    for result in &results {
        if !result_types.contains(&result.result_type) {
            result_types.push(result.result_type);
        }
    }

    let mut redirected_results = Vec::new();
    let mut options = Vec::new();

    for result_type in result_types {
        let group: Vec<RouteResult<T>> = results
            .iter()
            .filter(|result| result.result_type == result_type)
            .cloned()
            .collect();
        trace!(
            event = events::RESULT_GROUP,
            component = COMPONENT,
            request_id = request.id.as_str(),
            router_id,
            target_id = target.id(),
            source_id,
            result_type = result_type.as_str(),
            count = group.len(),
            "result group"
        );

        let Some(redirect) = target.find_redirect(result_type) else {
            continue;
        };
        if redirect.targets().is_empty() {
            continue;
        }

        let redirect_request = handler.process(request, &results, &group);
        if redirect_request.queries.is_empty() && !request.queries.is_empty() {
            continue;
        }
        trace!(
            event = events::REDIRECT_TRIGGER,
            component = COMPONENT,
            request_id = request.id.as_str(),
            router_id,
            target_id = target.id(),
            redirect_id = redirect.id(),
            result_type = result_type.as_str(),
            queries = redirect_request.queries.len(),
            "redirect triggered"
        );

        let redirect_trace = trace.deeper();
        let redirected = run_targets::<D, T, H>(
            router_id,
            operation,
            &redirect_request,
            redirect.targets(),
            handler,
            &redirect_trace,
        )
        .await;

        let mut nested_options = Vec::new();
        let mut foreign_results = Vec::new();
        for (redirect_target, target_response) in redirect.targets().iter().zip(redirected) {
            nested_options.extend(target_response.options);
            // Results produced by the originating source never feed options back into it.
            if redirect_target.id() != target.id() {
                foreign_results.extend(target_response.results.iter().cloned());
            }
            redirected_results.extend(target_response.results);
        }
        let foreign = RouteResponse::new(foreign_results, Duration::ZERO);

        if redirect.has_option(RedirectOption::Publish) && foreign.is_success() {
            let before = options.len();
            for result in foreign.success_results() {
                push_option(
                    &mut options,
                    RouteOption {
                        option: RedirectOption::Publish,
                        request: result.query.clone(),
                        argument: result.content.clone(),
                    },
                );
            }
            let count = options.len() - before;
            trace_option_set(request, router_id, target, RedirectOption::Publish, count);
        }

        if redirect.has_option(RedirectOption::Empty) && foreign.is_empty() {
            let before = options.len();
            for result in &foreign.results {
                push_option(
                    &mut options,
                    RouteOption {
                        option: RedirectOption::Empty,
                        request: result.query.clone(),
                        argument: None,
                    },
                );
            }
            let count = options.len() - before;
            trace_option_set(request, router_id, target, RedirectOption::Empty, count);
        }

        for option in nested_options {
            push_option(&mut options, option);
        }
    }

    let mut aggregated = results;
    aggregated.extend(redirected_results);
    TargetResponse {
        results: aggregated,
        options,
    }
}

fn trace_option_set(
    request: &RouteRequest,
    router_id: &str,
    target: &RouteTarget,
    option: RedirectOption,
    count: usize,
) {
    trace!(
        event = events::REDIRECT_OPTION_SET,
        component = COMPONENT,
        request_id = request.id.as_str(),
        router_id,
        target_id = target.id(),
        option = option.as_str(),
        count,
        "redirect option set"
    );
}

#[cfg(test)]
mod tests {
    use super::{dispatch, narrow_to_results, Operation, OperationHandler};
    use crate::buffer::BufferRegistry;
    use crate::configuration::{
        RedirectConfiguration, RedirectOption, RouteConfiguration, RouterConfiguration,
        TargetConfiguration,
    };
    use crate::dispatch::trace::DispatchTrace;
    use crate::driver::{BoundDriver, Driver, EntityReadDriver};
    use crate::error::DriverError;
    use crate::request::RouteRequest;
    use crate::result::{ResultType, RouteResponse, RouteResult};
    use crate::router::Router;
    use crate::routing::target::RouteTarget;
    use crate::test_support::{NoopDriver, Note};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Answers every query with the result type scripted for the driver id.
    struct ScriptedHandler {
        script: HashMap<&'static str, Option<ResultType>>,
    }

    #[async_trait]
    impl OperationHandler<dyn EntityReadDriver<Note>, Note> for ScriptedHandler {
        async fn call_driver(
            &self,
            _target: &RouteTarget,
            driver: &BoundDriver<dyn EntityReadDriver<Note>>,
            request: &RouteRequest,
        ) -> Result<RouteResponse<Note>, DriverError> {
            let Some(result_type) = self.script.get(driver.id()).copied().flatten() else {
                return Err(DriverError::failed("scripted failure"));
            };
            Ok(RouteResponse::new(
                request
                    .queries
                    .iter()
                    .map(|query| {
                        let content = (result_type == ResultType::Ok)
                            .then(|| Note::new(query.query.clone()));
                        RouteResult::new(
                            driver.id(),
                            Some(query.query.clone()),
                            result_type,
                            content,
                        )
                    })
                    .collect(),
                Default::default(),
            ))
        }

        async fn call_router(
            &self,
            _target: &RouteTarget,
            _router: Arc<Router>,
            _request: &RouteRequest,
            _trace: &DispatchTrace,
        ) -> RouteResponse<Note> {
            RouteResponse::default()
        }
    }

    fn driver(id: &str, configuration_id: &str) -> Arc<Driver> {
        Arc::new(
            Driver::new(id, configuration_id)
                .with_capability::<dyn EntityReadDriver<Note>>(Arc::new(NoopDriver)),
        )
    }

    fn router_with(target: TargetConfiguration, drivers: &[Arc<Driver>]) -> Arc<Router> {
        let router = Arc::new(Router::new(
            RouterConfiguration::new(
                "main",
                "Main",
                vec![RouteConfiguration::new("notes", ["notes.read"], vec![target])],
            ),
            Arc::new(BufferRegistry::new()),
        ));
        router.initialize(&[router.clone()], drivers);
        router
    }

    fn request(queries: &[&str]) -> RouteRequest {
        RouteRequest::new("[Entities] Read notes", None, queries.iter().copied())
    }

    fn operation() -> Operation {
        Operation::of::<dyn EntityReadDriver<Note>>("entity")
    }

    #[tokio::test]
    async fn unknown_route_yields_route_not_configured_per_query() {
        let router = router_with(TargetConfiguration::driver("store", "mem"), &[]);
        let handler = ScriptedHandler {
            script: HashMap::new(),
        };

        let response = dispatch::<dyn EntityReadDriver<Note>, Note, _>(
            &router,
            operation(),
            "blobs.read",
            &request(&["a", "b"]),
            &handler,
            &DispatchTrace::root("main"),
        )
        .await;

        assert_eq!(response.results.len(), 2);
        assert!(response
            .results
            .iter()
            .all(|result| result.result_type == ResultType::RouteNotConfigured
                && result.source_id == "main"));
    }

    #[tokio::test]
    async fn failing_driver_downgrades_to_internal_error_and_skips_redirects() {
        let router = router_with(
            TargetConfiguration::driver("store", "*").with_redirect(RedirectConfiguration::new(
                "on-error",
                ["InternalError"],
                vec![TargetConfiguration::driver("backup", "backup")],
                Vec::new(),
            )),
            &[driver("broken-1", "broken"), driver("backup-1", "backup")],
        );
        let handler = ScriptedHandler {
            script: HashMap::from([("broken-1", None), ("backup-1", Some(ResultType::Ok))]),
        };

        let response = dispatch::<dyn EntityReadDriver<Note>, Note, _>(
            &router,
            operation(),
            "notes.read",
            &request(&["a", "b", "c"]),
            &handler,
            &DispatchTrace::root("main"),
        )
        .await;

        let errors: Vec<_> = response
            .results
            .iter()
            .filter(|result| result.source_id == "broken-1")
            .map(|result| result.result_type)
            .collect();
        assert_eq!(errors, vec![ResultType::InternalError; 3]);
        // backup-1 is bound to the wildcard target too and answers directly
        assert_eq!(response.results.len(), 6);
    }

    #[tokio::test]
    async fn redirect_runs_for_triggering_queries_and_sets_publish_option() {
        let router = router_with(
            TargetConfiguration::driver("cache", "cache").with_redirect(
                RedirectConfiguration::new(
                    "fill",
                    ["NotFound"],
                    vec![TargetConfiguration::driver("store", "store")],
                    vec![RedirectOption::Publish],
                ),
            ),
            &[driver("cache-1", "cache"), driver("store-1", "store")],
        );
        let handler = ScriptedHandler {
            script: HashMap::from([
                ("cache-1", Some(ResultType::NotFound)),
                ("store-1", Some(ResultType::Ok)),
            ]),
        };

        let response = dispatch::<dyn EntityReadDriver<Note>, Note, _>(
            &router,
            operation(),
            "notes.read",
            &request(&["a"]),
            &handler,
            &DispatchTrace::root("main"),
        )
        .await;

        let kinds: Vec<_> = response
            .results
            .iter()
            .map(|result| (result.source_id.as_str(), result.result_type))
            .collect();
        assert_eq!(
            kinds,
            vec![("cache-1", ResultType::NotFound), ("store-1", ResultType::Ok)]
        );
        assert_eq!(response.options.len(), 1);
        assert_eq!(response.options[0].option, RedirectOption::Publish);
        assert_eq!(response.options[0].request.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn self_redirect_sets_no_options() {
        let router = router_with(
            TargetConfiguration::driver("cache", "cache").with_redirect(
                RedirectConfiguration::new(
                    "refresh",
                    ["Ok"],
                    vec![TargetConfiguration::driver("cache-again", "cache")],
                    vec![RedirectOption::Publish],
                ),
            ),
            &[driver("cache-1", "cache")],
        );
        let handler = ScriptedHandler {
            script: HashMap::from([("cache-1", Some(ResultType::Ok))]),
        };

        let response = dispatch::<dyn EntityReadDriver<Note>, Note, _>(
            &router,
            operation(),
            "notes.read",
            &request(&["a"]),
            &handler,
            &DispatchTrace::root("main"),
        )
        .await;

        assert_eq!(response.results.len(), 2);
        assert!(response.options.is_empty());
    }

    #[test]
    fn narrowing_keeps_only_answered_queries() {
        let request = request(&["a", "b", "c"]);
        let results = vec![
            RouteResult::<Note>::empty("mem-1", "c"),
            RouteResult::<Note>::empty("mem-1", "a"),
        ];
        assert_eq!(
            narrow_to_results(&request, &results).query_strings(),
            vec!["a", "c"]
        );

        let request_level = vec![RouteResult::<Note>::internal_error("mem-1", None)];
        assert_eq!(narrow_to_results(&request, &request_level), request);
    }
}
