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

//! Process-wide owner of the live routers.
//!
//! The router set is an immutable snapshot behind an `ArcSwap`. Every load builds a fresh set
//! from the configuration profile, binds it against the live drivers and swaps it in. Readers
//! take the current snapshot and never block on a rebuild.

mod reload;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::buffer::BufferRegistry;
use crate::configuration::{ConfigurationProfile, RouterConfiguration};
use crate::driver::DriverProvider;
use crate::error::{AddRouterError, RemoveRouterError};
use crate::observability::events;
use crate::router::{Router, RouterInformation, DEFAULT_ROUTER_NAME};

const COMPONENT: &str = "router_provider";

const ROUTER_EVENT_CAPACITY: usize = 64;

/// Provider tuning.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ProviderSettings {
    /// Quiet period after the last configuration or driver event before routers are rebuilt.
    pub reload_debounce_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            reload_debounce_ms: 1000,
        }
    }
}

impl ProviderSettings {
    pub fn reload_debounce(&self) -> Duration {
        Duration::from_millis(self.reload_debounce_ms)
    }
}

/// Router lifecycle notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RouterEvent {
    Added(String),
    Removed(String),
}

pub struct RouterProvider {
    profile: Arc<dyn ConfigurationProfile>,
    drivers: Arc<dyn DriverProvider>,
    buffers: Arc<BufferRegistry>,
    settings: ProviderSettings,
    routers: ArcSwap<Vec<Arc<Router>>>,
    writer: Mutex<()>,
    events: broadcast::Sender<RouterEvent>,
    reload_task: Mutex<Option<JoinHandle<()>>>,
}

impl RouterProvider {
    pub fn new(
        profile: Arc<dyn ConfigurationProfile>,
        drivers: Arc<dyn DriverProvider>,
        buffers: Arc<BufferRegistry>,
        settings: ProviderSettings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(ROUTER_EVENT_CAPACITY);
        Arc::new(Self {
            profile,
            drivers,
            buffers,
            settings,
            routers: ArcSwap::from_pointee(Vec::new()),
            writer: Mutex::new(()),
            events,
            reload_task: Mutex::new(None),
        })
    }

    /// Loads the routers and starts reacting to configuration and driver changes.
    pub fn start(self: &Arc<Self>) {
        let mut reload_task = self
            .reload_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if reload_task.is_some() {
            return;
        }

        // Subscribe before loading so no change between the two is missed.
        let configuration_events = self.profile.subscribe();
        let driver_events = self.drivers.subscribe();
        self.load();

        *reload_task = Some(reload::spawn_reload_loop(
            Arc::downgrade(self),
            configuration_events,
            driver_events,
            self.settings.reload_debounce(),
        ));
    }

    /// Stops the reload loop. Loaded routers stay available.
    pub fn stop(&self) {
        if let Some(task) = self
            .reload_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }

    /// Rebuilds every router from the profile, binds the new set and swaps it in.
    pub fn load(&self) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        info!(
            event = events::PROVIDER_LOAD_START,
            component = COMPONENT,
            "loading routers"
        );

        let mut routers: Vec<Arc<Router>> = Vec::new();
        for configuration in self.profile.routers() {
            if routers.iter().any(|router| router.id() == configuration.id) {
                continue;
            }
            routers.push(Arc::new(Router::new(configuration, self.buffers.clone())));
        }

        let drivers = self.drivers.drivers();
        for router in &routers {
            router.initialize(&routers, &drivers);
        }

        let count = routers.len();
        self.routers.store(Arc::new(routers));
        info!(
            event = events::PROVIDER_LOAD_OK,
            component = COMPONENT,
            routers = count,
            drivers = drivers.len(),
            "routers loaded"
        );
    }

    /// Current router snapshot in configuration order.
    pub fn routers(&self) -> Arc<Vec<Arc<Router>>> {
        self.routers.load_full()
    }

    /// Persists `configuration` and brings its router online without waiting for a reload.
    pub fn add_router(
        &self,
        configuration: RouterConfiguration,
    ) -> Result<Arc<Router>, AddRouterError> {
        if configuration.id.is_empty() {
            warn!(
                event = events::ROUTER_ADD_FAILED,
                component = COMPONENT,
                reason = "empty_id",
                "router configuration has no id"
            );
            return Err(AddRouterError::EmptyId);
        }

        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.routers.load_full();
        if current.iter().any(|router| router.id() == configuration.id) {
            warn!(
                event = events::ROUTER_ADD_FAILED,
                component = COMPONENT,
                router_id = configuration.id.as_str(),
                reason = "already_exists",
                "router already loaded"
            );
            return Err(AddRouterError::AlreadyExists(configuration.id));
        }

        self.profile.add(configuration.clone());

        let router = Arc::new(Router::new(configuration, self.buffers.clone()));
        let mut routers: Vec<Arc<Router>> = current.as_ref().clone();
        routers.push(router.clone());

        let drivers = self.drivers.drivers();
        for existing in &routers {
            existing.map_targets(&routers, &drivers);
        }
        router.initialize(&routers, &drivers);
        self.routers.store(Arc::new(routers));

        let _ = self.events.send(RouterEvent::Added(router.id().to_string()));
        info!(
            event = events::ROUTER_ADD_OK,
            component = COMPONENT,
            router_id = router.id(),
            "router added"
        );
        Ok(router)
    }

    /// Removes the configuration from the profile and reloads.
    pub fn remove_router(&self, router_id: &str) -> Result<(), RemoveRouterError> {
        if !self.profile.remove(router_id) {
            warn!(
                event = events::ROUTER_REMOVE_FAILED,
                component = COMPONENT,
                router_id,
                "router configuration not found"
            );
            return Err(RemoveRouterError::NotFound(router_id.to_string()));
        }

        let _ = self
            .events
            .send(RouterEvent::Removed(router_id.to_string()));
        info!(
            event = events::ROUTER_REMOVE_OK,
            component = COMPONENT,
            router_id,
            "router removed"
        );
        self.load();
        Ok(())
    }

    /// The router named `default`, or the first router when none has that name. Only initialized
    /// routers are returned.
    pub fn get_router(&self) -> Option<Arc<Router>> {
        let routers = self.routers.load();
        let candidate = routers
            .iter()
            .find(|router| router.name() == DEFAULT_ROUTER_NAME)
            .or_else(|| routers.first())?;
        candidate.is_initialized().then(|| candidate.clone())
    }

    /// Resolves `key` by exact id or case-insensitive name. An empty key selects
    /// [`RouterProvider::get_router`].
    pub fn get_router_by_key(&self, key: &str) -> Option<Arc<Router>> {
        if key.is_empty() {
            return self.get_router();
        }

        self.routers
            .load()
            .iter()
            .find(|router| router.id() == key || router.name().eq_ignore_ascii_case(key))
            .filter(|router| router.is_initialized())
            .cloned()
    }

    pub fn information(&self) -> Vec<RouterInformation> {
        self.routers
            .load()
            .iter()
            .map(|router| router.information())
            .collect()
    }

    pub fn information_for(&self, router_id: &str) -> Option<RouterInformation> {
        self.routers
            .load()
            .iter()
            .find(|router| router.id() == router_id)
            .map(|router| router.information())
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RouterEvent> {
        self.events.subscribe()
    }
}

impl Drop for RouterProvider {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::{ProviderSettings, RouterEvent, RouterProvider};
    use crate::buffer::BufferRegistry;
    use crate::configuration::{MemoryConfigurationProfile, RouterConfiguration};
    use crate::driver::DriverRegistry;
    use crate::error::{AddRouterError, RemoveRouterError};
    use std::sync::Arc;

    fn provider(configurations: Vec<RouterConfiguration>) -> Arc<RouterProvider> {
        RouterProvider::new(
            Arc::new(MemoryConfigurationProfile::new(configurations)),
            Arc::new(DriverRegistry::new()),
            Arc::new(BufferRegistry::new()),
            ProviderSettings::default(),
        )
    }

    #[test]
    fn settings_default_and_parse() {
        assert_eq!(ProviderSettings::default().reload_debounce_ms, 1000);
        let parsed: ProviderSettings =
            serde_json::from_str(r#"{ "reloadDebounceMs": 50 }"#).expect("valid settings");
        assert_eq!(parsed.reload_debounce().as_millis(), 50);
        assert!(serde_json::from_str::<ProviderSettings>(r#"{ "debounce": 1 }"#).is_err());
    }

    #[test]
    fn default_router_is_preferred_by_name() {
        let provider = provider(vec![
            RouterConfiguration::new("edge", "Edge", Vec::new()),
            RouterConfiguration::new("main", "default", Vec::new()),
        ]);
        assert!(provider.get_router().is_none());

        provider.load();
        assert_eq!(provider.get_router().expect("loaded").id(), "main");
        assert_eq!(provider.get_router_by_key("EDGE").expect("by name").id(), "edge");
        assert_eq!(provider.get_router_by_key("edge").expect("by id").id(), "edge");
        assert_eq!(provider.get_router_by_key("").expect("fallback").id(), "main");
        assert!(provider.get_router_by_key("missing").is_none());
    }

    #[test]
    fn first_router_is_used_without_default() {
        let provider = provider(vec![
            RouterConfiguration::new("edge", "Edge", Vec::new()),
            RouterConfiguration::new("edge", "Duplicate", Vec::new()),
            RouterConfiguration::new("main", "Main", Vec::new()),
        ]);
        provider.load();

        assert_eq!(provider.routers().len(), 2);
        assert_eq!(provider.get_router().expect("first").id(), "edge");
        assert_eq!(provider.information().len(), 2);
        assert_eq!(
            provider.information_for("main").expect("main").name,
            "Main"
        );
    }

    #[test]
    fn add_and_remove_emit_events() {
        let provider = provider(Vec::new());
        provider.load();
        let mut events = provider.subscribe_events();

        let router = provider
            .add_router(RouterConfiguration::new("main", "Main", Vec::new()))
            .expect("added");
        assert!(router.is_initialized());
        assert_eq!(
            provider.add_router(RouterConfiguration::new("main", "Main", Vec::new())).err(),
            Some(AddRouterError::AlreadyExists("main".to_string()))
        );
        assert_eq!(
            provider.add_router(RouterConfiguration::new("", "Nameless", Vec::new())).err(),
            Some(AddRouterError::EmptyId)
        );

        provider.remove_router("main").expect("removed");
        assert!(provider.get_router_by_key("main").is_none());
        assert_eq!(
            provider.remove_router("main"),
            Err(RemoveRouterError::NotFound("main".to_string()))
        );

        assert_eq!(
            events.try_recv().expect("added event"),
            RouterEvent::Added("main".to_string())
        );
        assert_eq!(
            events.try_recv().expect("removed event"),
            RouterEvent::Removed("main".to_string())
        );
    }
}
