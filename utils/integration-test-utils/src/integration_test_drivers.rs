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


use async_trait::async_trait;
use entity_router::query_range::{START, STOP};
use entity_router::{
    Capability, Consumer, ConsumerSender, DeleteResult, Driver, DriverError, EntityDeleteDriver,
    EntityDeleteRequest, EntityEmptyDriver, EntityEmptyRequest, EntityExpirationAccessDriver,
    EntityExpirationDriver, EntityExpirationUpdateDriver, EntityIndexRequest,
    EntityIndexUpdateDriver, EntityPublishDriver, EntityQueryDriver, EntityReadDriver,
    EntitySubscribeDriver, PublishResult, PublishResultType, RouteQuery, RouteResponse,
    RouteResult, DEFAULT_CONSUMER_CAPACITY,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::debug;

use crate::TestObject;

/// One capability call observed by a [`MemoryDriver`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DriverCall {
    pub capability: Capability,
    pub queries: Vec<String>,
}

/// In-memory object store implementing every entity capability and recording each call.
pub struct MemoryDriver {
    id: String,
    objects: Mutex<BTreeMap<String, TestObject>>,
    empties: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<DriverCall>>,
    subscribers: Mutex<Vec<ConsumerSender<Vec<TestObject>>>>,
}

impl MemoryDriver {
    pub fn new(id: &str) -> Arc<Self> {
        Self::with_objects(id, Vec::new())
    }

    pub fn with_objects(id: &str, objects: impl IntoIterator<Item = TestObject>) -> Arc<Self> {
        let objects = objects
            .into_iter()
            .map(|object| (object.uuid.clone(), object))
            .collect();
        Arc::new(Self {
            id: id.to_string(),
            objects: Mutex::new(objects),
            empties: Mutex::new(BTreeSet::new()),
            calls: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Registration advertising every capability for `objects`.
    pub fn driver(self: &Arc<Self>, configuration_id: &str) -> Driver {
        self.driver_with(
            configuration_id,
            &[
                Capability::Read,
                Capability::Query,
                Capability::Subscribe,
                Capability::Publish,
                Capability::Empty,
                Capability::IndexUpdate,
                Capability::Delete,
                Capability::Expire,
                Capability::ExpireByAccess,
                Capability::ExpireByUpdate,
            ],
        )
    }

    /// Registration advertising only `capabilities`.
    pub fn driver_with(self: &Arc<Self>, configuration_id: &str, capabilities: &[Capability]) -> Driver {
        capabilities
            .iter()
            .fold(Driver::new(self.id.clone(), configuration_id), |driver, capability| {
                match capability {
                    Capability::Read => {
                        driver.with_capability::<dyn EntityReadDriver<TestObject>>(self.clone())
                    }
                    Capability::Query => {
                        driver.with_capability::<dyn EntityQueryDriver<TestObject>>(self.clone())
                    }
                    Capability::Subscribe => driver
                        .with_capability::<dyn EntitySubscribeDriver<TestObject>>(self.clone()),
                    Capability::Publish => {
                        driver.with_capability::<dyn EntityPublishDriver<TestObject>>(self.clone())
                    }
                    Capability::Empty => {
                        driver.with_capability::<dyn EntityEmptyDriver<TestObject>>(self.clone())
                    }
                    Capability::IndexUpdate => driver
                        .with_capability::<dyn EntityIndexUpdateDriver<TestObject>>(self.clone()),
                    Capability::Delete => {
                        driver.with_capability::<dyn EntityDeleteDriver<TestObject>>(self.clone())
                    }
                    Capability::Expire => driver
                        .with_capability::<dyn EntityExpirationDriver<TestObject>>(self.clone()),
                    Capability::ExpireByAccess => driver
                        .with_capability::<dyn EntityExpirationAccessDriver<TestObject>>(
                            self.clone(),
                        ),
                    Capability::ExpireByUpdate => driver
                        .with_capability::<dyn EntityExpirationUpdateDriver<TestObject>>(
                            self.clone(),
                        ),
                }
            })
    }

    pub fn insert(&self, object: TestObject) {
        self.lock_objects().insert(object.uuid.clone(), object);
    }

    /// Makes reads of `uuid` answer `Empty` instead of `NotFound`.
    pub fn mark_empty(&self, uuid: &str) {
        self.empties
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uuid.to_string());
    }

    pub fn get(&self, uuid: &str) -> Option<TestObject> {
        self.lock_objects().get(uuid).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock_objects().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_objects().is_empty()
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn calls_for(&self, capability: Capability) -> Vec<DriverCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.capability == capability)
            .collect()
    }

    /// Pushes `objects` to every live subscriber. Returns how many received them.
    pub async fn emit(&self, objects: Vec<TestObject>) -> usize {
        let subscribers: Vec<_> = {
            let mut guard = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            guard.retain(|subscriber| !subscriber.is_cancelled());
            guard.clone()
        };

        let mut delivered = 0;
        for subscriber in subscribers {
            if subscriber.send(objects.clone()).await {
                delivered += 1;
            }
        }
        delivered
    }

    fn lock_objects(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, TestObject>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, capability: Capability, queries: Vec<String>) {
        debug!(driver_id = self.id.as_str(), ?capability, ?queries, "driver call");
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(DriverCall {
                capability,
                queries,
            });
    }

    fn expire_where(
        &self,
        requests: &[EntityDeleteRequest],
    ) -> Result<RouteResponse<DeleteResult>, DriverError> {
        let started = Instant::now();
        let mut objects = self.lock_objects();
        let results = requests
            .iter()
            .map(|request| {
                let before = objects.len();
                objects.retain(|uuid, object| {
                    !(uuid.starts_with(&request.target)
                        && request
                            .timestamp
                            .map_or(true, |cutoff| object.position < cutoff))
                });
                let count = (before - objects.len()) as u64;
                RouteResult::ok(
                    self.id.clone(),
                    request.target.clone(),
                    DeleteResult::new(request.target.clone(), count),
                )
            })
            .collect();
        Ok(RouteResponse::new(results, started.elapsed()))
    }
}

#[async_trait]
impl EntityReadDriver<TestObject> for MemoryDriver {
    async fn read(&self, ids: &[String]) -> Result<RouteResponse<TestObject>, DriverError> {
        self.record(Capability::Read, ids.to_vec());
        let started = Instant::now();
        let objects = self.lock_objects();
        let empties = self.empties.lock().unwrap_or_else(PoisonError::into_inner);
        let results = ids
            .iter()
            .map(|id| match objects.get(id) {
                Some(object) => RouteResult::ok(self.id.clone(), id.clone(), object.clone()),
                None if empties.contains(id) => RouteResult::empty(self.id.clone(), id.clone()),
                None => RouteResult::not_found(self.id.clone(), id.clone()),
            })
            .collect();
        Ok(RouteResponse::new(results, started.elapsed()))
    }
}

#[async_trait]
impl EntityQueryDriver<TestObject> for MemoryDriver {
    async fn query(
        &self,
        queries: &[RouteQuery],
        skip: i64,
        take: i64,
    ) -> Result<RouteResponse<TestObject>, DriverError> {
        self.record(
            Capability::Query,
            queries.iter().map(|query| query.query.clone()).collect(),
        );
        let started = Instant::now();
        let objects = self.lock_objects();

        let mut results = Vec::new();
        let mut remaining_skip = skip.max(0);
        let mut remaining_take = if take > 0 { take } else { i64::MAX };
        for query in queries {
            let start: i64 = query.parameter(START).unwrap_or(0);
            let stop: i64 = query.parameter(STOP).unwrap_or(0);

            let mut matches: Vec<&TestObject> = objects
                .values()
                .filter(|object| object.uuid.starts_with(&query.query))
                .filter(|object| object.position >= start && (stop <= 0 || object.position < stop))
                .collect();
            matches.sort_by_key(|object| object.position);

            let mut found = false;
            for object in matches {
                if remaining_skip > 0 {
                    remaining_skip -= 1;
                    continue;
                }
                if remaining_take == 0 {
                    break;
                }
                remaining_take -= 1;
                found = true;
                results.push(RouteResult::ok(
                    self.id.clone(),
                    query.query.clone(),
                    object.clone(),
                ));
            }
            if !found {
                results.push(RouteResult::not_found(self.id.clone(), query.query.clone()));
            }
        }
        Ok(RouteResponse::new(results, started.elapsed()))
    }
}

#[async_trait]
impl EntitySubscribeDriver<TestObject> for MemoryDriver {
    async fn subscribe(&self) -> Result<Consumer<Vec<TestObject>>, DriverError> {
        self.record(Capability::Subscribe, Vec::new());
        let (sender, consumer) = Consumer::channel(DEFAULT_CONSUMER_CAPACITY);
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sender);
        Ok(consumer)
    }
}

#[async_trait]
impl EntityPublishDriver<TestObject> for MemoryDriver {
    async fn publish(
        &self,
        entities: &[TestObject],
    ) -> Result<RouteResponse<PublishResult<TestObject>>, DriverError> {
        self.record(
            Capability::Publish,
            entities.iter().map(|entity| entity.uuid.clone()).collect(),
        );
        let started = Instant::now();
        let mut objects = self.lock_objects();
        let results = entities
            .iter()
            .map(|entity| {
                let kind = match objects.insert(entity.uuid.clone(), entity.clone()) {
                    None => PublishResultType::Created,
                    Some(previous) if previous == *entity => PublishResultType::Unchanged,
                    Some(_) => PublishResultType::Changed,
                };
                RouteResult::ok(
                    self.id.clone(),
                    entity.uuid.clone(),
                    PublishResult::new(kind, entity.clone()),
                )
            })
            .collect();
        Ok(RouteResponse::new(results, started.elapsed()))
    }
}

#[async_trait]
impl EntityEmptyDriver<TestObject> for MemoryDriver {
    async fn empty(
        &self,
        requests: &[EntityEmptyRequest],
    ) -> Result<RouteResponse<bool>, DriverError> {
        self.record(
            Capability::Empty,
            requests.iter().map(|request| request.entity_uuid.clone()).collect(),
        );
        let started = Instant::now();
        let mut objects = self.lock_objects();
        let results = requests
            .iter()
            .map(|request| {
                let removed = objects.remove(&request.entity_uuid).is_some();
                RouteResult::ok(self.id.clone(), request.entity_uuid.clone(), removed)
            })
            .collect();
        Ok(RouteResponse::new(results, started.elapsed()))
    }
}

#[async_trait]
impl EntityIndexUpdateDriver<TestObject> for MemoryDriver {
    async fn update_index(
        &self,
        requests: &[EntityIndexRequest],
    ) -> Result<RouteResponse<bool>, DriverError> {
        self.record(
            Capability::IndexUpdate,
            requests.iter().map(|request| request.target.clone()).collect(),
        );
        let started = Instant::now();
        let results = requests
            .iter()
            .map(|request| RouteResult::ok(self.id.clone(), request.target.clone(), true))
            .collect();
        Ok(RouteResponse::new(results, started.elapsed()))
    }
}

#[async_trait]
impl EntityDeleteDriver<TestObject> for MemoryDriver {
    async fn delete(
        &self,
        requests: &[EntityDeleteRequest],
    ) -> Result<RouteResponse<bool>, DriverError> {
        self.record(
            Capability::Delete,
            requests.iter().map(|request| request.target.clone()).collect(),
        );
        let started = Instant::now();
        let mut objects = self.lock_objects();
        let results = requests
            .iter()
            .map(|request| match objects.remove(&request.target) {
                Some(_) => RouteResult::ok(self.id.clone(), request.target.clone(), true),
                None => RouteResult::not_found(self.id.clone(), request.target.clone()),
            })
            .collect();
        Ok(RouteResponse::new(results, started.elapsed()))
    }
}

#[async_trait]
impl EntityExpirationDriver<TestObject> for MemoryDriver {
    async fn expire(
        &self,
        requests: &[EntityDeleteRequest],
    ) -> Result<RouteResponse<DeleteResult>, DriverError> {
        self.record(
            Capability::Expire,
            requests.iter().map(|request| request.target.clone()).collect(),
        );
        self.expire_where(requests)
    }
}

#[async_trait]
impl EntityExpirationAccessDriver<TestObject> for MemoryDriver {
    async fn expire_by_access(
        &self,
        requests: &[EntityDeleteRequest],
    ) -> Result<RouteResponse<DeleteResult>, DriverError> {
        self.record(
            Capability::ExpireByAccess,
            requests.iter().map(|request| request.target.clone()).collect(),
        );
        self.expire_where(requests)
    }
}

#[async_trait]
impl EntityExpirationUpdateDriver<TestObject> for MemoryDriver {
    async fn expire_by_update(
        &self,
        requests: &[EntityDeleteRequest],
    ) -> Result<RouteResponse<DeleteResult>, DriverError> {
        self.record(
            Capability::ExpireByUpdate,
            requests.iter().map(|request| request.target.clone()).collect(),
        );
        self.expire_where(requests)
    }
}
