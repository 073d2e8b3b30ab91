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

//! Narrow per-operation capability traits implemented by entity drivers.
//!
//! Every method returns the handler's results for the submitted items plus the time it took.
//! Returning `Err` marks every query of the call as `InternalError`.

use async_trait::async_trait;

use crate::consumer::Consumer;
use crate::driver::{Capability, CapabilityInterface, CapabilityKey};
use crate::entity::{
    DeleteResult, Entity, EntityDeleteRequest, EntityEmptyRequest, EntityIndexRequest,
    PublishResult,
};
use crate::error::DriverError;
use crate::request::RouteQuery;
use crate::result::RouteResponse;

#[async_trait]
pub trait EntityReadDriver<E: Entity>: Send + Sync {
    async fn read(&self, ids: &[String]) -> Result<RouteResponse<E>, DriverError>;
}

/// Range query over positioned entities (`start`/`stop` per query, `skip`/`take` overall).
#[async_trait]
pub trait EntityQueryDriver<E: Entity>: Send + Sync {
    async fn query(
        &self,
        queries: &[RouteQuery],
        skip: i64,
        take: i64,
    ) -> Result<RouteResponse<E>, DriverError>;
}

#[async_trait]
pub trait EntitySubscribeDriver<E: Entity>: Send + Sync {
    async fn subscribe(&self) -> Result<Consumer<Vec<E>>, DriverError>;
}

#[async_trait]
pub trait EntityPublishDriver<E: Entity>: Send + Sync {
    async fn publish(&self, entities: &[E])
        -> Result<RouteResponse<PublishResult<E>>, DriverError>;
}

#[async_trait]
pub trait EntityEmptyDriver<E: Entity>: Send + Sync {
    async fn empty(
        &self,
        requests: &[EntityEmptyRequest],
    ) -> Result<RouteResponse<bool>, DriverError>;
}

#[async_trait]
pub trait EntityIndexUpdateDriver<E: Entity>: Send + Sync {
    async fn update_index(
        &self,
        requests: &[EntityIndexRequest],
    ) -> Result<RouteResponse<bool>, DriverError>;
}

#[async_trait]
pub trait EntityDeleteDriver<E: Entity>: Send + Sync {
    async fn delete(
        &self,
        requests: &[EntityDeleteRequest],
    ) -> Result<RouteResponse<bool>, DriverError>;
}

#[async_trait]
pub trait EntityExpirationDriver<E: Entity>: Send + Sync {
    async fn expire(
        &self,
        requests: &[EntityDeleteRequest],
    ) -> Result<RouteResponse<DeleteResult>, DriverError>;
}

#[async_trait]
pub trait EntityExpirationAccessDriver<E: Entity>: Send + Sync {
    async fn expire_by_access(
        &self,
        requests: &[EntityDeleteRequest],
    ) -> Result<RouteResponse<DeleteResult>, DriverError>;
}

#[async_trait]
pub trait EntityExpirationUpdateDriver<E: Entity>: Send + Sync {
    async fn expire_by_update(
        &self,
        requests: &[EntityDeleteRequest],
    ) -> Result<RouteResponse<DeleteResult>, DriverError>;
}

macro_rules! capability_interface {
    ($($driver:ident => $capability:expr),+ $(,)?) => {
        $(
            impl<E: Entity> CapabilityInterface for dyn $driver<E> {
                fn key() -> CapabilityKey {
                    CapabilityKey::new($capability, E::KIND)
                }
            }
        )+
    };
}

capability_interface! {
    EntityReadDriver => Capability::Read,
    EntityQueryDriver => Capability::Query,
    EntitySubscribeDriver => Capability::Subscribe,
    EntityPublishDriver => Capability::Publish,
    EntityEmptyDriver => Capability::Empty,
    EntityIndexUpdateDriver => Capability::IndexUpdate,
    EntityDeleteDriver => Capability::Delete,
    EntityExpirationDriver => Capability::Expire,
    EntityExpirationAccessDriver => Capability::ExpireByAccess,
    EntityExpirationUpdateDriver => Capability::ExpireByUpdate,
}
