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

//! # entity-router
//!
//! `entity-router` routes entity operations (read, query, subscribe, publish, empty, index,
//! delete and expire) to the drivers and nested routers configured for a route key. Results that
//! come back with a configured result type are redirected to further targets, optionally feeding
//! the found entities back through publish or empty.
//!
//! Typical usage goes through [`RouterProvider`], which owns the live routers and rebuilds them
//! whenever the configuration profile or the set of registered drivers changes.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use entity_router::{
//!     BufferRegistry, Driver, DriverError, DriverRegistry, Entity, EntityReadDriver,
//!     MemoryConfigurationProfile, ProviderSettings, ResultType, RouteConfiguration, RouteResponse,
//!     RouteResult, RouterConfiguration, RouterProvider, TargetConfiguration,
//! };
//!
//! #[derive(Clone, Debug)]
//! struct Note {
//!     id: String,
//! }
//!
//! impl Entity for Note {
//!     const KIND: &'static str = "notes";
//!     fn uuid(&self) -> &str {
//!         &self.id
//!     }
//! }
//!
//! struct NoteStore;
//!
//! #[async_trait]
//! impl EntityReadDriver<Note> for NoteStore {
//!     async fn read(&self, ids: &[String]) -> Result<RouteResponse<Note>, DriverError> {
//!         let results = ids
//!             .iter()
//!             .map(|id| RouteResult::ok("notes-1", id.clone(), Note { id: id.clone() }))
//!             .collect();
//!         Ok(RouteResponse::new(results, Default::default()))
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let drivers = Arc::new(DriverRegistry::new());
//! drivers.add(
//!     Driver::new("notes-1", "notes").with_capability::<dyn EntityReadDriver<Note>>(Arc::new(NoteStore)),
//! );
//!
//! let profile = Arc::new(MemoryConfigurationProfile::new(vec![RouterConfiguration::new(
//!     "main",
//!     "default",
//!     vec![RouteConfiguration::new(
//!         "notes",
//!         ["notes.*"],
//!         vec![TargetConfiguration::driver("notes-target", "notes")],
//!     )],
//! )]));
//!
//! let provider = RouterProvider::new(
//!     profile,
//!     drivers,
//!     Arc::new(BufferRegistry::new()),
//!     ProviderSettings::default(),
//! );
//! provider.load();
//!
//! let router = provider.get_router().unwrap();
//! let response = router.entities::<Note>().read("notes.read", ["n-1"], None).await;
//! assert!(response.is_success());
//! assert_eq!(response.results[0].result_type, ResultType::Ok);
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - `routing`: route-pattern matching, entity filters and the target tree built from each
//!   route configuration.
//! - `router`: one router per configuration; target selection and driver/router binding.
//! - `dispatch`: the per-operation dispatch engine. Targets run concurrently, non-success result
//!   groups are redirected, and redirect options are fed back after the operation completes.
//! - `provider`: the process-wide router set and its debounced reload loop.
//! - `driver`, `buffer`, `configuration`: collaborator contracts and their in-process
//!   implementations.
//!
//! ## Observability model
//!
//! Every log line is a `tracing` event carrying stable `event` and `component` fields. The
//! event names live in [`observability::events`], shared field names in
//! [`observability::fields`]. Dispatch events also carry `request_id`, `router_id` and
//! `target_id` so a single request can be followed across nested routers.

mod buffer;
mod configuration;
mod consumer;
mod dispatch;
mod driver;
mod entity;
mod error;
pub mod observability;
mod provider;
mod request;
mod result;
mod router;
mod routing;

pub use buffer::{Buffer, BufferKey, BufferOperation, BufferRegistry, MemoryBuffer};
pub use configuration::{
    ConfigurationEvent, ConfigurationProfile, MemoryConfigurationProfile, RedirectConfiguration,
    RedirectOption, RouteConfiguration, RouterConfiguration, TargetConfiguration, TargetType,
    UnknownVariant, WILDCARD,
};
pub use consumer::{Consumer, ConsumerSender, DEFAULT_CONSUMER_CAPACITY};
pub use dispatch::query_range;
pub use dispatch::{
    DispatchResponse, DispatchTrace, EntityRouter, Operation, RouteOption, MAX_DISPATCH_DEPTH,
};
pub use driver::{
    route_of, BoundDriver, Capability, CapabilityInterface, CapabilityKey, Driver, DriverEvent,
    DriverProvider, DriverRegistry, EntityDeleteDriver, EntityEmptyDriver,
    EntityExpirationAccessDriver, EntityExpirationDriver, EntityExpirationUpdateDriver,
    EntityIndexUpdateDriver, EntityPublishDriver, EntityQueryDriver, EntityReadDriver,
    EntitySubscribeDriver,
};
pub use entity::{
    DeleteResult, Entity, EntityDeleteRequest, EntityEmptyRequest, EntityIndexRequest,
    OperationMode, PublishResult, PublishResultType,
};
pub use error::{AddRouterError, DriverError, RemoveRouterError};
pub use provider::{ProviderSettings, RouterEvent, RouterProvider};
pub use request::{request_name, RouteParameters, RouteQuery, RouteRequest};
pub use result::{ResultType, RouteResponse, RouteResult, UnknownResultType};
pub use router::{
    RedirectInformation, RouteInformation, Router, RouterInformation, TargetInformation,
    DEFAULT_ROUTER_NAME,
};
pub use routing::filter::{filter_entities, EntityFilter};
pub use routing::pattern_matcher::PatternMatcher;
pub use routing::target::{Redirect, RouteTarget};

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;

    use crate::driver::{EntityDeleteDriver, EntityPublishDriver, EntityReadDriver};
    use crate::entity::{Entity, EntityDeleteRequest, PublishResult};
    use crate::error::DriverError;
    use crate::result::RouteResponse;

    #[derive(Clone, Debug, PartialEq)]
    pub struct Note {
        pub id: String,
        pub position: i64,
    }

    impl Note {
        pub fn new(id: impl Into<String>) -> Self {
            Self::at(id, 0)
        }

        pub fn at(id: impl Into<String>, position: i64) -> Self {
            Self {
                id: id.into(),
                position,
            }
        }
    }

    impl Entity for Note {
        const KIND: &'static str = "notes";

        fn uuid(&self) -> &str {
            &self.id
        }

        fn range_key(&self) -> i64 {
            self.position
        }
    }

    pub struct NoopDriver;

    #[async_trait]
    impl EntityReadDriver<Note> for NoopDriver {
        async fn read(&self, _ids: &[String]) -> Result<RouteResponse<Note>, DriverError> {
            Ok(RouteResponse::default())
        }
    }

    #[async_trait]
    impl EntityPublishDriver<Note> for NoopDriver {
        async fn publish(
            &self,
            _entities: &[Note],
        ) -> Result<RouteResponse<PublishResult<Note>>, DriverError> {
            Ok(RouteResponse::default())
        }
    }

    #[async_trait]
    impl EntityDeleteDriver<Note> for NoopDriver {
        async fn delete(
            &self,
            _requests: &[EntityDeleteRequest],
        ) -> Result<RouteResponse<bool>, DriverError> {
            Ok(RouteResponse::default())
        }
    }
}
