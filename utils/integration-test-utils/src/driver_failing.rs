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
use entity_router::{
    Consumer, Driver, DriverError, EntityPublishDriver, EntityQueryDriver, EntityReadDriver,
    EntitySubscribeDriver, PublishResult, RouteQuery, RouteResponse,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::TestObject;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureMode {
    /// Every call returns `Err`.
    Error,
    /// Every call panics.
    Panic,
}

/// Driver whose read, query, subscribe and publish calls always fail.
pub struct FailingDriver {
    id: String,
    mode: FailureMode,
    calls: AtomicUsize,
}

impl FailingDriver {
    pub fn new(id: &str, mode: FailureMode) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            mode,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn driver(self: &Arc<Self>, configuration_id: &str) -> Driver {
        Driver::new(self.id.clone(), configuration_id)
            .with_capability::<dyn EntityReadDriver<TestObject>>(self.clone())
            .with_capability::<dyn EntityQueryDriver<TestObject>>(self.clone())
            .with_capability::<dyn EntitySubscribeDriver<TestObject>>(self.clone())
            .with_capability::<dyn EntityPublishDriver<TestObject>>(self.clone())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self, operation: &str) -> Result<T, DriverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!("{}: failing {operation}", self.id);
        match self.mode {
            FailureMode::Error => Err(DriverError::unavailable(format!(
                "{} refused {operation}",
                self.id
            ))),
            FailureMode::Panic => panic!("{} crashed during {operation}", self.id),
        }
    }
}

#[async_trait]
impl EntityReadDriver<TestObject> for FailingDriver {
    async fn read(&self, _ids: &[String]) -> Result<RouteResponse<TestObject>, DriverError> {
        self.fail("read")
    }
}

#[async_trait]
impl EntityQueryDriver<TestObject> for FailingDriver {
    async fn query(
        &self,
        _queries: &[RouteQuery],
        _skip: i64,
        _take: i64,
    ) -> Result<RouteResponse<TestObject>, DriverError> {
        self.fail("query")
    }
}

#[async_trait]
impl EntitySubscribeDriver<TestObject> for FailingDriver {
    async fn subscribe(&self) -> Result<Consumer<Vec<TestObject>>, DriverError> {
        self.fail("subscribe")
    }
}

#[async_trait]
impl EntityPublishDriver<TestObject> for FailingDriver {
    async fn publish(
        &self,
        _entities: &[TestObject],
    ) -> Result<RouteResponse<PublishResult<TestObject>>, DriverError> {
        self.fail("publish")
    }
}
