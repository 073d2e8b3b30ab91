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

//! Driver capability registry.
//!
//! A [`Driver`] is a registration of one backend instance: its id, the id of the driver
//! configuration it was created from, and the explicit set of operation capabilities it
//! implements. Capabilities are keyed by `(Capability, entity kind)`; targets look drivers up by
//! that key instead of inspecting driver types.

mod capabilities;
mod registry;

pub use capabilities::{
    EntityDeleteDriver, EntityEmptyDriver, EntityExpirationAccessDriver, EntityExpirationDriver,
    EntityExpirationUpdateDriver, EntityIndexUpdateDriver, EntityPublishDriver, EntityQueryDriver,
    EntityReadDriver, EntitySubscribeDriver,
};
pub use registry::{DriverEvent, DriverProvider, DriverRegistry};

use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Operation an entity driver can implement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Capability {
    Read,
    Query,
    Subscribe,
    Publish,
    Empty,
    IndexUpdate,
    Delete,
    Expire,
    ExpireByAccess,
    ExpireByUpdate,
}

impl Capability {
    /// Route segment advertised for this capability.
    pub fn route_segment(&self) -> &'static str {
        match self {
            Capability::Read => "read",
            Capability::Query => "query",
            Capability::Subscribe => "subscribe",
            Capability::Publish => "publish",
            Capability::Empty => "empty",
            Capability::IndexUpdate => "index",
            Capability::Delete => "delete",
            Capability::Expire => "expire",
            Capability::ExpireByAccess => "expire-access",
            Capability::ExpireByUpdate => "expire-update",
        }
    }

    /// Operation label used in request names, e.g. `Expire-Access`.
    pub fn label(&self) -> &'static str {
        match self {
            Capability::Read => "Read",
            Capability::Query => "Query",
            Capability::Subscribe => "Subscribe",
            Capability::Publish => "Publish",
            Capability::Empty => "Empty",
            Capability::IndexUpdate => "Index",
            Capability::Delete => "Delete",
            Capability::Expire => "Expire",
            Capability::ExpireByAccess => "Expire-Access",
            Capability::ExpireByUpdate => "Expire-Update",
        }
    }
}

/// Registry key: one operation for one entity kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CapabilityKey {
    pub capability: Capability,
    pub entity_kind: &'static str,
}

impl CapabilityKey {
    pub const fn new(capability: Capability, entity_kind: &'static str) -> Self {
        Self {
            capability,
            entity_kind,
        }
    }

    /// Route key for this capability, e.g. `objects.publish`.
    pub fn route(&self) -> String {
        format!("{}.{}", self.entity_kind, self.capability.route_segment())
    }
}

impl Display for CapabilityKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.entity_kind, self.capability.route_segment())
    }
}

/// Implemented by each capability trait-object type (`dyn EntityReadDriver<E>`, ...) to name
/// its registry key.
pub trait CapabilityInterface: Send + Sync + 'static {
    fn key() -> CapabilityKey;
}

/// Route key of the capability interface `D`.
pub fn route_of<D: CapabilityInterface + ?Sized>() -> String {
    D::key().route()
}

/// One registered driver instance and the capabilities it advertises.
pub struct Driver {
    id: String,
    configuration_id: String,
    routes: Vec<String>,
    capabilities: HashMap<CapabilityKey, Arc<dyn Any + Send + Sync>>,
}

impl Debug for Driver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("id", &self.id)
            .field("configuration_id", &self.configuration_id)
            .field("routes", &self.routes)
            .finish()
    }
}

impl Driver {
    pub fn new(id: impl Into<String>, configuration_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            configuration_id: configuration_id.into(),
            routes: Vec::new(),
            capabilities: HashMap::new(),
        }
    }

    /// Registers `handle` as the implementation of capability interface `D`.
    ///
    /// ```
    /// # use std::sync::Arc;
    /// # use async_trait::async_trait;
    /// # use entity_router::{DriverError, Entity, EntityReadDriver, RouteResponse};
    /// use entity_router::Driver;
    /// # #[derive(Clone, Debug)]
    /// # struct Note { id: String }
    /// # impl Entity for Note {
    /// #     const KIND: &'static str = "notes";
    /// #     fn uuid(&self) -> &str { &self.id }
    /// # }
    /// # struct NoteStore;
    /// # #[async_trait]
    /// # impl EntityReadDriver<Note> for NoteStore {
    /// #     async fn read(&self, _ids: &[String]) -> Result<RouteResponse<Note>, DriverError> {
    /// #         Ok(RouteResponse::default())
    /// #     }
    /// # }
    ///
    /// let store = Arc::new(NoteStore);
    /// let driver = Driver::new("notes-1", "notes")
    ///     .with_capability::<dyn EntityReadDriver<Note>>(store);
    /// assert_eq!(driver.routes(), ["notes.read"]);
    /// ```
    pub fn with_capability<D>(mut self, handle: Arc<D>) -> Self
    where
        D: CapabilityInterface + ?Sized,
    {
        let key = D::key();
        let route = key.route();
        if !self.routes.contains(&route) {
            self.routes.push(route);
        }
        self.capabilities
            .insert(key, Arc::new(handle) as Arc<dyn Any + Send + Sync>);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn configuration_id(&self) -> &str {
        &self.configuration_id
    }

    /// Route keys advertised by this driver, in registration order.
    pub fn routes(&self) -> &[String] {
        &self.routes
    }

    pub fn supports(&self, key: &CapabilityKey) -> bool {
        self.capabilities.contains_key(key)
    }

    pub fn capability_keys(&self) -> impl Iterator<Item = &CapabilityKey> {
        self.capabilities.keys()
    }

    /// Resolves the handle registered for capability interface `D`.
    pub fn capability<D>(&self) -> Option<Arc<D>>
    where
        D: CapabilityInterface + ?Sized,
    {
        self.capabilities
            .get(&D::key())
            .and_then(|handle| handle.downcast_ref::<Arc<D>>())
            .cloned()
    }

    /// Keys a route pattern is matched against: the driver id, then each advertised route.
    pub(crate) fn match_keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.id.as_str()).chain(self.routes.iter().map(String::as_str))
    }
}

/// A driver resolved for one capability interface.
pub struct BoundDriver<D: ?Sized> {
    pub driver: Arc<Driver>,
    pub handle: Arc<D>,
}

impl<D: ?Sized> Clone for BoundDriver<D> {
    fn clone(&self) -> Self {
        Self {
            driver: self.driver.clone(),
            handle: self.handle.clone(),
        }
    }
}

impl<D: ?Sized> BoundDriver<D> {
    pub fn id(&self) -> &str {
        self.driver.id()
    }

    pub fn configuration_id(&self) -> &str {
        self.driver.configuration_id()
    }
}

#[cfg(test)]
mod tests {
    use super::{Capability, CapabilityKey, Driver, EntityPublishDriver, EntityReadDriver};
    use crate::test_support::{NoopDriver, Note};
    use std::sync::Arc;

    #[test]
    fn route_keys_follow_kind_and_capability() {
        let key = CapabilityKey::new(Capability::ExpireByAccess, "objects");
        assert_eq!(key.route(), "objects.expire-access");
        assert_eq!(key.to_string(), "objects.expire-access");
    }

    #[test]
    fn capabilities_resolve_by_key() {
        let handle = Arc::new(NoopDriver);
        let driver = Driver::new("mem-1", "mem")
            .with_capability::<dyn EntityReadDriver<Note>>(handle.clone())
            .with_capability::<dyn EntityPublishDriver<Note>>(handle);

        assert!(driver.capability::<dyn EntityReadDriver<Note>>().is_some());
        assert!(driver.capability::<dyn EntityPublishDriver<Note>>().is_some());
        assert!(driver
            .capability::<dyn super::EntityDeleteDriver<Note>>()
            .is_none());
        assert_eq!(driver.routes(), ["notes.read", "notes.publish"]);
        assert!(driver.supports(&CapabilityKey::new(Capability::Publish, "notes")));
    }

    #[test]
    fn match_keys_list_id_before_routes() {
        let driver = Driver::new("svc-legacy", "svc")
            .with_capability::<dyn EntityReadDriver<Note>>(Arc::new(NoopDriver));

        let keys: Vec<&str> = driver.match_keys().collect();
        assert_eq!(keys, vec!["svc-legacy", "notes.read"]);
    }
}
