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

//! Typed entity operations on one router.
//!
//! Each operation wraps the generic engine with its driver call, nested-router call and redirect
//! narrowing, then feeds collected `Publish`/`Empty` options back through the same entry points.
//! Write operations in [`OperationMode::Async`] append to the driver's async buffer instead of
//! calling the driver.

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tracing::{trace, warn};

use crate::buffer::{BufferKey, BufferOperation, BufferRegistry};
use crate::configuration::RedirectOption;
use crate::consumer::Consumer;
use crate::dispatch::engine::{dispatch, Operation, OperationHandler, RouteOption};
use crate::dispatch::query_range::{narrow_range, SKIP, TAKE};
use crate::dispatch::subscribe::subscribe_targets;
use crate::dispatch::trace::DispatchTrace;
use crate::driver::{
    route_of, BoundDriver, CapabilityInterface, EntityDeleteDriver, EntityEmptyDriver,
    EntityExpirationAccessDriver, EntityExpirationDriver, EntityExpirationUpdateDriver,
    EntityIndexUpdateDriver, EntityPublishDriver, EntityQueryDriver, EntityReadDriver,
    EntitySubscribeDriver,
};
use crate::entity::{
    DeleteResult, Entity, EntityDeleteRequest, EntityEmptyRequest, EntityIndexRequest,
    OperationMode, PublishResult,
};
use crate::error::DriverError;
use crate::observability::events;
use crate::request::{RouteQuery, RouteRequest};
use crate::result::{RouteResponse, RouteResult};
use crate::router::Router;
use crate::routing::filter::filter_entities;
use crate::routing::target::RouteTarget;

const COMPONENT: &str = "entity_operations";

const RESULT_ENTITY: &str = "entity";
const RESULT_PUBLISH: &str = "publish-result";
const RESULT_FLAG: &str = "bool";
const RESULT_DELETE: &str = "delete-result";
const RESULT_CONSUMER: &str = "consumer";

/// Entity operations for entity kind `E`, bound to one router.
///
/// Obtained from [`Router::entities`]. Every call returns one result per submitted item (or a
/// `RouteNotConfigured` result per item when nothing handles the route) and never fails.
pub struct EntityRouter<E: Entity> {
    router: Arc<Router>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for EntityRouter<E> {
    fn clone(&self) -> Self {
        Self::new(self.router.clone())
    }
}

impl<E: Entity> EntityRouter<E> {
    pub(crate) fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            _entity: PhantomData,
        }
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    fn root_trace(&self) -> DispatchTrace {
        DispatchTrace::root(self.router.id())
    }

    pub async fn read<I, S>(&self, route: &str, ids: I, request_id: Option<String>) -> RouteResponse<E>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        self.read_traced(route, ids, request_id, &self.root_trace())
            .await
    }

    pub(crate) async fn read_traced(
        &self,
        route: &str,
        ids: Vec<String>,
        request_id: Option<String>,
        trace: &DispatchTrace,
    ) -> RouteResponse<E> {
        let operation = Operation::of::<dyn EntityReadDriver<E>>(RESULT_ENTITY);
        let request = RouteRequest::new(operation.request_name(), request_id, ids);
        let handler = ReadHandler { route };

        let (response, options) = dispatch::<dyn EntityReadDriver<E>, E, _>(
            &self.router,
            operation,
            route,
            &request,
            &handler,
            trace,
        )
        .await
        .into_parts();

        self.process_options(options, |entity| Some(entity.clone()), request.id, trace)
            .await;
        response
    }

    /// Range query. Each query may carry `start`/`stop` parameters; `skip`/`take` apply to the
    /// whole request. Redirects only ask for the part of each range that was not found.
    pub async fn query(
        &self,
        route: &str,
        queries: Vec<RouteQuery>,
        skip: i64,
        take: i64,
        request_id: Option<String>,
    ) -> RouteResponse<E> {
        self.query_traced(route, queries, skip, take, request_id, &self.root_trace())
            .await
    }

    pub(crate) async fn query_traced(
        &self,
        route: &str,
        queries: Vec<RouteQuery>,
        skip: i64,
        take: i64,
        request_id: Option<String>,
        trace: &DispatchTrace,
    ) -> RouteResponse<E> {
        let operation = Operation::of::<dyn EntityQueryDriver<E>>(RESULT_ENTITY);
        let request = RouteRequest::new(operation.request_name(), request_id, queries)
            .with_parameter(SKIP, skip)
            .with_parameter(TAKE, take);
        let handler = QueryHandler { route };

        let (response, options) = dispatch::<dyn EntityQueryDriver<E>, E, _>(
            &self.router,
            operation,
            route,
            &request,
            &handler,
            trace,
        )
        .await
        .into_parts();

        self.process_options(options, |entity| Some(entity.clone()), request.id, trace)
            .await;
        response
    }

    /// Long-lived subscription merged across every target of `route`. `None` when no driver or
    /// nested router produced a consumer.
    pub async fn subscribe(
        &self,
        route: &str,
        request_id: Option<String>,
    ) -> Option<Consumer<Vec<E>>> {
        self.subscribe_traced(route, request_id, &self.root_trace())
            .await
    }

    pub(crate) async fn subscribe_traced(
        &self,
        route: &str,
        request_id: Option<String>,
        trace: &DispatchTrace,
    ) -> Option<Consumer<Vec<E>>> {
        let operation = Operation::of::<dyn EntitySubscribeDriver<E>>(RESULT_CONSUMER);
        let request = RouteRequest::new(
            operation.request_name(),
            request_id,
            std::iter::empty::<String>(),
        );
        subscribe_targets::<E>(&self.router, route, &request, trace).await
    }

    /// Publishes entities. Each target only receives the entities its route filter admits.
    pub async fn publish(
        &self,
        route: &str,
        entities: Vec<E>,
        mode: OperationMode,
        request_id: Option<String>,
    ) -> RouteResponse<PublishResult<E>> {
        self.publish_traced(route, entities, mode, request_id, &self.root_trace())
            .await
    }

    pub(crate) async fn publish_traced(
        &self,
        route: &str,
        entities: Vec<E>,
        mode: OperationMode,
        request_id: Option<String>,
        trace: &DispatchTrace,
    ) -> RouteResponse<PublishResult<E>> {
        self.write(PublishOp, route, entities, mode, request_id, trace)
            .await
    }

    pub async fn empty(
        &self,
        route: &str,
        requests: Vec<EntityEmptyRequest>,
        mode: OperationMode,
        request_id: Option<String>,
    ) -> RouteResponse<bool> {
        self.empty_traced(route, requests, mode, request_id, &self.root_trace())
            .await
    }

    pub(crate) async fn empty_traced(
        &self,
        route: &str,
        requests: Vec<EntityEmptyRequest>,
        mode: OperationMode,
        request_id: Option<String>,
        trace: &DispatchTrace,
    ) -> RouteResponse<bool> {
        self.write(EmptyOp, route, requests, mode, request_id, trace)
            .await
    }

    pub async fn update_index(
        &self,
        route: &str,
        requests: Vec<EntityIndexRequest>,
        mode: OperationMode,
        request_id: Option<String>,
    ) -> RouteResponse<bool> {
        self.update_index_traced(route, requests, mode, request_id, &self.root_trace())
            .await
    }

    pub(crate) async fn update_index_traced(
        &self,
        route: &str,
        requests: Vec<EntityIndexRequest>,
        mode: OperationMode,
        request_id: Option<String>,
        trace: &DispatchTrace,
    ) -> RouteResponse<bool> {
        self.write(IndexOp, route, requests, mode, request_id, trace)
            .await
    }

    pub async fn delete(
        &self,
        route: &str,
        requests: Vec<EntityDeleteRequest>,
        mode: OperationMode,
        request_id: Option<String>,
    ) -> RouteResponse<bool> {
        self.delete_traced(route, requests, mode, request_id, &self.root_trace())
            .await
    }

    pub(crate) async fn delete_traced(
        &self,
        route: &str,
        requests: Vec<EntityDeleteRequest>,
        mode: OperationMode,
        request_id: Option<String>,
        trace: &DispatchTrace,
    ) -> RouteResponse<bool> {
        self.write(DeleteOp, route, requests, mode, request_id, trace)
            .await
    }

    pub async fn expire(
        &self,
        route: &str,
        requests: Vec<EntityDeleteRequest>,
        request_id: Option<String>,
    ) -> RouteResponse<DeleteResult> {
        self.expire_traced(route, requests, request_id, &self.root_trace())
            .await
    }

    pub(crate) async fn expire_traced(
        &self,
        route: &str,
        requests: Vec<EntityDeleteRequest>,
        request_id: Option<String>,
        trace: &DispatchTrace,
    ) -> RouteResponse<DeleteResult> {
        self.write(ExpireOp, route, requests, OperationMode::Sync, request_id, trace)
            .await
    }

    pub async fn expire_by_access(
        &self,
        route: &str,
        requests: Vec<EntityDeleteRequest>,
        request_id: Option<String>,
    ) -> RouteResponse<DeleteResult> {
        self.expire_by_access_traced(route, requests, request_id, &self.root_trace())
            .await
    }

    pub(crate) async fn expire_by_access_traced(
        &self,
        route: &str,
        requests: Vec<EntityDeleteRequest>,
        request_id: Option<String>,
        trace: &DispatchTrace,
    ) -> RouteResponse<DeleteResult> {
        self.write(
            ExpireByAccessOp,
            route,
            requests,
            OperationMode::Sync,
            request_id,
            trace,
        )
        .await
    }

    pub async fn expire_by_update(
        &self,
        route: &str,
        requests: Vec<EntityDeleteRequest>,
        request_id: Option<String>,
    ) -> RouteResponse<DeleteResult> {
        self.expire_by_update_traced(route, requests, request_id, &self.root_trace())
            .await
    }

    pub(crate) async fn expire_by_update_traced(
        &self,
        route: &str,
        requests: Vec<EntityDeleteRequest>,
        request_id: Option<String>,
        trace: &DispatchTrace,
    ) -> RouteResponse<DeleteResult> {
        self.write(
            ExpireByUpdateOp,
            route,
            requests,
            OperationMode::Sync,
            request_id,
            trace,
        )
        .await
    }

    async fn write<O: WriteOperation<E>>(
        &self,
        op: O,
        route: &str,
        items: Vec<O::Item>,
        mode: OperationMode,
        request_id: Option<String>,
        trace: &DispatchTrace,
    ) -> RouteResponse<O::Output> {
        let operation = Operation::of::<O::Driver>(O::RESULT_KIND);
        let request = RouteRequest::new(
            operation.request_name(),
            request_id,
            items.iter().map(|item| O::query(item).to_string()),
        );
        let handler = WriteHandler {
            op,
            route,
            items,
            mode,
            buffers: self.router.buffers(),
            _entity: PhantomData::<fn() -> E>,
        };

        let (response, options) = dispatch::<O::Driver, O::Output, _>(
            &self.router,
            operation,
            route,
            &request,
            &handler,
            trace,
        )
        .await
        .into_parts();

        if O::ALWAYS_PROCESS_OPTIONS || response.is_success() {
            self.process_options(options, O::payload, request.id, trace)
                .await;
        }
        response
    }

    /// Realises collected options: `Publish` republishes the carried entities, `Empty` marks the
    /// carried queries empty. Both go through the regular publish/empty entry points.
    fn process_options<'a, T>(
        &'a self,
        options: Vec<RouteOption<T>>,
        payload: fn(&T) -> Option<E>,
        request_id: String,
        trace: &'a DispatchTrace,
    ) -> BoxFuture<'a, ()> {
        let entities: Vec<E> = options
            .iter()
            .filter(|option| option.option == RedirectOption::Publish)
            .filter_map(|option| option.argument.as_ref().and_then(payload))
            .collect();
        let empties: Vec<EntityEmptyRequest> = options
            .iter()
            .filter(|option| option.option == RedirectOption::Empty)
            .filter_map(|option| option.request.clone())
            .map(EntityEmptyRequest::new)
            .collect();

        async move {
            if entities.is_empty() && empties.is_empty() {
                return;
            }
            trace!(
                event = events::OPTIONS_PROCESS,
                component = COMPONENT,
                router_id = self.router.id(),
                request_id = request_id.as_str(),
                publish = entities.len(),
                empty = empties.len(),
                depth = trace.depth(),
                "processing redirect options"
            );

            let option_trace = trace.deeper();
            if !entities.is_empty() {
                let route = route_of::<dyn EntityPublishDriver<E>>();
                self.publish_traced(
                    &route,
                    entities,
                    OperationMode::Async,
                    Some(request_id.clone()),
                    &option_trace,
                )
                .await;
            }
            if !empties.is_empty() {
                let route = route_of::<dyn EntityEmptyDriver<E>>();
                self.empty_traced(
                    &route,
                    empties,
                    OperationMode::Async,
                    Some(request_id),
                    &option_trace,
                )
                .await;
            }
        }
        .boxed()
    }
}

struct ReadHandler<'r> {
    route: &'r str,
}

#[async_trait]
impl<'r, E: Entity> OperationHandler<dyn EntityReadDriver<E>, E> for ReadHandler<'r> {
    async fn call_driver(
        &self,
        _target: &RouteTarget,
        driver: &BoundDriver<dyn EntityReadDriver<E>>,
        request: &RouteRequest,
    ) -> Result<RouteResponse<E>, DriverError> {
        driver.handle.read(&request.query_strings()).await
    }

    async fn call_router(
        &self,
        _target: &RouteTarget,
        router: Arc<Router>,
        request: &RouteRequest,
        trace: &DispatchTrace,
    ) -> RouteResponse<E> {
        router
            .entities::<E>()
            .read_traced(
                self.route,
                request.query_strings(),
                Some(request.id.clone()),
                trace,
            )
            .await
    }
}

struct QueryHandler<'r> {
    route: &'r str,
}

fn range_parameters(request: &RouteRequest) -> (i64, i64) {
    (
        request.parameter(SKIP).unwrap_or(0),
        request.parameter(TAKE).unwrap_or(0),
    )
}

#[async_trait]
impl<'r, E: Entity> OperationHandler<dyn EntityQueryDriver<E>, E> for QueryHandler<'r> {
    async fn call_driver(
        &self,
        _target: &RouteTarget,
        driver: &BoundDriver<dyn EntityQueryDriver<E>>,
        request: &RouteRequest,
    ) -> Result<RouteResponse<E>, DriverError> {
        let (skip, take) = range_parameters(request);
        driver.handle.query(&request.queries, skip, take).await
    }

    async fn call_router(
        &self,
        _target: &RouteTarget,
        router: Arc<Router>,
        request: &RouteRequest,
        trace: &DispatchTrace,
    ) -> RouteResponse<E> {
        let (skip, take) = range_parameters(request);
        router
            .entities::<E>()
            .query_traced(
                self.route,
                request.queries.clone(),
                skip,
                take,
                Some(request.id.clone()),
                trace,
            )
            .await
    }

    fn process(
        &self,
        request: &RouteRequest,
        results: &[RouteResult<E>],
        _triggered: &[RouteResult<E>],
    ) -> RouteRequest {
        narrow_range(request, results)
    }
}

/// Per-operation pieces of an item-based write.
#[async_trait]
trait WriteOperation<E: Entity>: Send + Sync + 'static {
    type Driver: CapabilityInterface + ?Sized;
    type Item: Clone + Send + Sync + 'static;
    type Output: Clone + Send + Sync + 'static;

    const RESULT_KIND: &'static str;
    /// Buffer used in async mode; `None` for synchronous-only operations.
    const BUFFER: Option<BufferOperation>;
    /// Process options even when the response holds no `Ok` result.
    const ALWAYS_PROCESS_OPTIONS: bool = false;

    /// Query string identifying one item.
    fn query(item: &Self::Item) -> &str;

    /// Result content reported for an item accepted by the buffer.
    fn queued(item: &Self::Item) -> Self::Output;

    /// Entity carried by a `Publish` option built from this operation's results.
    fn payload(_output: &Self::Output) -> Option<E> {
        None
    }

    /// Items a target accepts.
    fn admit(_target: &RouteTarget, items: Vec<Self::Item>) -> Vec<Self::Item> {
        items
    }

    async fn call(
        &self,
        driver: &Self::Driver,
        items: &[Self::Item],
    ) -> Result<RouteResponse<Self::Output>, DriverError>;

    async fn nested(
        &self,
        router: &EntityRouter<E>,
        route: &str,
        items: Vec<Self::Item>,
        mode: OperationMode,
        request_id: String,
        trace: &DispatchTrace,
    ) -> RouteResponse<Self::Output>;
}

struct WriteHandler<'r, E, O: WriteOperation<E>>
where
    E: Entity,
{
    op: O,
    route: &'r str,
    items: Vec<O::Item>,
    mode: OperationMode,
    buffers: &'r BufferRegistry,
    _entity: PhantomData<fn() -> E>,
}

impl<'r, E: Entity, O: WriteOperation<E>> WriteHandler<'r, E, O> {
    /// Items for `target`, narrowed to the queries of `request`.
    fn items_for(&self, target: &RouteTarget, request: &RouteRequest) -> Vec<O::Item> {
        O::admit(target, self.items.clone())
            .into_iter()
            .filter(|item| {
                request
                    .queries
                    .iter()
                    .any(|query| query.query == O::query(item))
            })
            .collect()
    }

    fn enqueue(
        &self,
        operation: BufferOperation,
        driver: &BoundDriver<O::Driver>,
        items: &[O::Item],
    ) -> RouteResponse<O::Output> {
        let started = Instant::now();
        let key = BufferKey::for_entity::<E>(operation, driver.configuration_id());
        let buffer = self.buffers.get::<O::Item>(&key);
        if buffer.is_none() {
            warn!(
                event = events::BUFFER_MISSING,
                component = COMPONENT,
                driver_id = driver.id(),
                buffer_key = %key,
                items = items.len(),
                "no async buffer registered"
            );
        }

        let results = items
            .iter()
            .map(|item| {
                let query = O::query(item).to_string();
                match &buffer {
                    Some(buffer) if buffer.add(item.clone()) => {
                        RouteResult::ok(driver.id(), query, O::queued(item))
                    }
                    Some(_) => {
                        warn!(
                            event = events::BUFFER_REJECTED,
                            component = COMPONENT,
                            driver_id = driver.id(),
                            buffer_key = %key,
                            query = query.as_str(),
                            "async buffer rejected item"
                        );
                        RouteResult::internal_error(driver.id(), Some(query))
                    }
                    None => RouteResult::internal_error(driver.id(), Some(query)),
                }
            })
            .collect();
        RouteResponse::new(results, started.elapsed())
    }
}

#[async_trait]
impl<'r, E, O> OperationHandler<O::Driver, O::Output> for WriteHandler<'r, E, O>
where
    E: Entity,
    O: WriteOperation<E>,
{
    async fn call_driver(
        &self,
        target: &RouteTarget,
        driver: &BoundDriver<O::Driver>,
        request: &RouteRequest,
    ) -> Result<RouteResponse<O::Output>, DriverError> {
        let items = self.items_for(target, request);
        if items.is_empty() {
            return Ok(RouteResponse::default());
        }

        match (self.mode, O::BUFFER) {
            (OperationMode::Async, Some(operation)) => {
                Ok(self.enqueue(operation, driver, &items))
            }
            _ => self.op.call(driver.handle.as_ref(), &items).await,
        }
    }

    async fn call_router(
        &self,
        target: &RouteTarget,
        router: Arc<Router>,
        request: &RouteRequest,
        trace: &DispatchTrace,
    ) -> RouteResponse<O::Output> {
        let items = self.items_for(target, request);
        if items.is_empty() {
            return RouteResponse::default();
        }

        self.op
            .nested(
                &router.entities::<E>(),
                self.route,
                items,
                self.mode,
                request.id.clone(),
                trace,
            )
            .await
    }

    fn delivered(&self, target: &RouteTarget, request: &RouteRequest) -> RouteRequest {
        let items = self.items_for(target, request);
        RouteRequest {
            queries: request
                .queries
                .iter()
                .filter(|query| items.iter().any(|item| O::query(item) == query.query))
                .cloned()
                .collect(),
            ..request.clone()
        }
    }
}

struct PublishOp;

#[async_trait]
impl<E: Entity> WriteOperation<E> for PublishOp {
    type Driver = dyn EntityPublishDriver<E>;
    type Item = E;
    type Output = PublishResult<E>;

    const RESULT_KIND: &'static str = RESULT_PUBLISH;
    const BUFFER: Option<BufferOperation> = Some(BufferOperation::Publish);
    const ALWAYS_PROCESS_OPTIONS: bool = true;

    fn query(item: &E) -> &str {
        item.uuid()
    }

    fn queued(item: &E) -> PublishResult<E> {
        PublishResult::queued(item.clone())
    }

    fn payload(output: &PublishResult<E>) -> Option<E> {
        Some(output.entity.clone())
    }

    fn admit(target: &RouteTarget, items: Vec<E>) -> Vec<E> {
        match target.filter() {
            Some(_) => filter_entities(target.filter(), &items),
            None => items,
        }
    }

    async fn call(
        &self,
        driver: &Self::Driver,
        items: &[E],
    ) -> Result<RouteResponse<PublishResult<E>>, DriverError> {
        driver.publish(items).await
    }

    async fn nested(
        &self,
        router: &EntityRouter<E>,
        route: &str,
        items: Vec<E>,
        mode: OperationMode,
        request_id: String,
        trace: &DispatchTrace,
    ) -> RouteResponse<PublishResult<E>> {
        router
            .publish_traced(route, items, mode, Some(request_id), trace)
            .await
    }
}

struct EmptyOp;

#[async_trait]
impl<E: Entity> WriteOperation<E> for EmptyOp {
    type Driver = dyn EntityEmptyDriver<E>;
    type Item = EntityEmptyRequest;
    type Output = bool;

    const RESULT_KIND: &'static str = RESULT_FLAG;
    const BUFFER: Option<BufferOperation> = Some(BufferOperation::Empty);

    fn query(item: &EntityEmptyRequest) -> &str {
        &item.entity_uuid
    }

    fn queued(_item: &EntityEmptyRequest) -> bool {
        true
    }

    async fn call(
        &self,
        driver: &Self::Driver,
        items: &[EntityEmptyRequest],
    ) -> Result<RouteResponse<bool>, DriverError> {
        driver.empty(items).await
    }

    async fn nested(
        &self,
        router: &EntityRouter<E>,
        route: &str,
        items: Vec<EntityEmptyRequest>,
        mode: OperationMode,
        request_id: String,
        trace: &DispatchTrace,
    ) -> RouteResponse<bool> {
        router
            .empty_traced(route, items, mode, Some(request_id), trace)
            .await
    }
}

struct IndexOp;

#[async_trait]
impl<E: Entity> WriteOperation<E> for IndexOp {
    type Driver = dyn EntityIndexUpdateDriver<E>;
    type Item = EntityIndexRequest;
    type Output = bool;

    const RESULT_KIND: &'static str = RESULT_FLAG;
    const BUFFER: Option<BufferOperation> = Some(BufferOperation::Index);

    fn query(item: &EntityIndexRequest) -> &str {
        &item.target
    }

    fn queued(_item: &EntityIndexRequest) -> bool {
        true
    }

    async fn call(
        &self,
        driver: &Self::Driver,
        items: &[EntityIndexRequest],
    ) -> Result<RouteResponse<bool>, DriverError> {
        driver.update_index(items).await
    }

    async fn nested(
        &self,
        router: &EntityRouter<E>,
        route: &str,
        items: Vec<EntityIndexRequest>,
        mode: OperationMode,
        request_id: String,
        trace: &DispatchTrace,
    ) -> RouteResponse<bool> {
        router
            .update_index_traced(route, items, mode, Some(request_id), trace)
            .await
    }
}

struct DeleteOp;

#[async_trait]
impl<E: Entity> WriteOperation<E> for DeleteOp {
    type Driver = dyn EntityDeleteDriver<E>;
    type Item = EntityDeleteRequest;
    type Output = bool;

    const RESULT_KIND: &'static str = RESULT_FLAG;
    const BUFFER: Option<BufferOperation> = Some(BufferOperation::Delete);

    fn query(item: &EntityDeleteRequest) -> &str {
        &item.target
    }

    fn queued(_item: &EntityDeleteRequest) -> bool {
        true
    }

    async fn call(
        &self,
        driver: &Self::Driver,
        items: &[EntityDeleteRequest],
    ) -> Result<RouteResponse<bool>, DriverError> {
        driver.delete(items).await
    }

    async fn nested(
        &self,
        router: &EntityRouter<E>,
        route: &str,
        items: Vec<EntityDeleteRequest>,
        mode: OperationMode,
        request_id: String,
        trace: &DispatchTrace,
    ) -> RouteResponse<bool> {
        router
            .delete_traced(route, items, mode, Some(request_id), trace)
            .await
    }
}

macro_rules! expire_operation {
    ($op:ident, $driver:ident, $method:ident, $traced:ident) => {
        struct $op;

        #[async_trait]
        impl<E: Entity> WriteOperation<E> for $op {
            type Driver = dyn $driver<E>;
            type Item = EntityDeleteRequest;
            type Output = DeleteResult;

            const RESULT_KIND: &'static str = RESULT_DELETE;
            const BUFFER: Option<BufferOperation> = None;

            fn query(item: &EntityDeleteRequest) -> &str {
                &item.target
            }

            fn queued(item: &EntityDeleteRequest) -> DeleteResult {
                DeleteResult::new(item.target.clone(), 0)
            }

            async fn call(
                &self,
                driver: &Self::Driver,
                items: &[EntityDeleteRequest],
            ) -> Result<RouteResponse<DeleteResult>, DriverError> {
                driver.$method(items).await
            }

            async fn nested(
                &self,
                router: &EntityRouter<E>,
                route: &str,
                items: Vec<EntityDeleteRequest>,
                _mode: OperationMode,
                request_id: String,
                trace: &DispatchTrace,
            ) -> RouteResponse<DeleteResult> {
                router.$traced(route, items, Some(request_id), trace).await
            }
        }
    };
}

expire_operation!(ExpireOp, EntityExpirationDriver, expire, expire_traced);
expire_operation!(
    ExpireByAccessOp,
    EntityExpirationAccessDriver,
    expire_by_access,
    expire_by_access_traced
);
expire_operation!(
    ExpireByUpdateOp,
    EntityExpirationUpdateDriver,
    expire_by_update,
    expire_by_update_traced
);
