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

//! Declarative router configuration and the configuration-profile collaborator contract.
//!
//! Configurations are immutable once loaded; every change is delivered as a whole new
//! [`RouterConfiguration`] and results in a full rebuild of that router's target tree.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;

/// Reserved route pattern matching every route key.
pub const WILDCARD: &str = "*";

const CONFIGURATION_EVENT_CAPACITY: usize = 64;

/// Kind of handler a target resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetType {
    Driver,
    Router,
}

/// Post-redirect side effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RedirectOption {
    Publish,
    Empty,
}

/// Error for unrecognised enum spellings in configuration documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl Display for UnknownVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown {}: {}", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Driver => "Driver",
            TargetType::Router => "Router",
        }
    }
}

impl TryFrom<String> for TargetType {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "driver" => Ok(TargetType::Driver),
            "router" => Ok(TargetType::Router),
            _ => Err(UnknownVariant {
                kind: "target type",
                value,
            }),
        }
    }
}

impl From<TargetType> for String {
    fn from(value: TargetType) -> Self {
        value.as_str().to_string()
    }
}

impl RedirectOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            RedirectOption::Publish => "Publish",
            RedirectOption::Empty => "Empty",
        }
    }
}

impl Display for RedirectOption {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for RedirectOption {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "publish" => Ok(RedirectOption::Publish),
            "empty" => Ok(RedirectOption::Empty),
            _ => Err(UnknownVariant {
                kind: "redirect option",
                value,
            }),
        }
    }
}

impl From<RedirectOption> for String {
    fn from(value: RedirectOption) -> Self {
        value.as_str().to_string()
    }
}

/// A conditional secondary dispatch attached to a target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RedirectConfiguration {
    pub id: String,
    /// Result-code names that trigger this redirect, e.g. `"Empty"`.
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub targets: Vec<TargetConfiguration>,
    #[serde(default)]
    pub options: Vec<RedirectOption>,
}

impl RedirectConfiguration {
    pub fn new<C, S>(
        id: impl Into<String>,
        conditions: C,
        targets: Vec<TargetConfiguration>,
        options: Vec<RedirectOption>,
    ) -> Self
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            conditions: conditions.into_iter().map(Into::into).collect(),
            targets,
            options,
        }
    }

    pub fn with_target(mut self, target: TargetConfiguration) -> Self {
        self.targets.push(target);
        self
    }
}

/// One handler bound to a route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TargetConfiguration {
    pub id: String,
    /// Driver configuration id, [`WILDCARD`], or nested router id.
    pub source: String,
    #[serde(rename = "type")]
    pub target_type: TargetType,
    #[serde(default)]
    pub redirects: Vec<RedirectConfiguration>,
}

impl TargetConfiguration {
    pub fn driver(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target_type: TargetType::Driver,
            redirects: Vec::new(),
        }
    }

    pub fn router(id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target_type: TargetType::Router,
            redirects: Vec::new(),
        }
    }

    pub fn with_redirect(mut self, redirect: RedirectConfiguration) -> Self {
        self.redirects.push(redirect);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouteConfiguration {
    pub id: String,
    /// Route patterns; `*` matches everything and a leading `!` denies.
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Entity filter patterns applied to published entities.
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub targets: Vec<TargetConfiguration>,
}

impl RouteConfiguration {
    pub fn new<P, S>(id: impl Into<String>, patterns: P, targets: Vec<TargetConfiguration>) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            filters: Vec::new(),
            targets,
        }
    }

    pub fn with_filters<F, S>(mut self, filters: F) -> Self
    where
        F: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filters = filters.into_iter().map(Into::into).collect();
        self
    }
}

/// Configuration of one routing domain. One configuration produces one live router.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RouterConfiguration {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub routes: Vec<RouteConfiguration>,
}

impl RouterConfiguration {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        routes: Vec<RouteConfiguration>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            routes,
        }
    }
}

/// Change notification published by a configuration profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigurationEvent {
    Added(String),
    Removed(String),
}

/// Source of router configurations (file, database, in-memory).
pub trait ConfigurationProfile: Send + Sync {
    /// Current router configurations in load order.
    fn routers(&self) -> Vec<RouterConfiguration>;

    /// Adds or replaces the configuration with the same id.
    fn add(&self, configuration: RouterConfiguration);

    /// Removes a configuration. Returns `false` when the id is unknown.
    fn remove(&self, router_id: &str) -> bool;

    /// Subscribes to add/remove notifications.
    fn subscribe(&self) -> broadcast::Receiver<ConfigurationEvent>;
}

/// In-process configuration profile.
pub struct MemoryConfigurationProfile {
    configurations: RwLock<Vec<RouterConfiguration>>,
    events: broadcast::Sender<ConfigurationEvent>,
}

impl Default for MemoryConfigurationProfile {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryConfigurationProfile {
    pub fn new(configurations: Vec<RouterConfiguration>) -> Self {
        let (events, _) = broadcast::channel(CONFIGURATION_EVENT_CAPACITY);
        Self {
            configurations: RwLock::new(configurations),
            events,
        }
    }

    /// Replaces the whole set, emitting `Removed` for dropped ids and `Added` for the rest.
    pub fn replace_all(&self, configurations: Vec<RouterConfiguration>) {
        let previous = {
            let mut guard = self
                .configurations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, configurations.clone())
        };

        for removed in previous
            .iter()
            .filter(|old| !configurations.iter().any(|new| new.id == old.id))
        {
            let _ = self
                .events
                .send(ConfigurationEvent::Removed(removed.id.clone()));
        }
        for added in &configurations {
            let _ = self.events.send(ConfigurationEvent::Added(added.id.clone()));
        }
    }
}

impl ConfigurationProfile for MemoryConfigurationProfile {
    fn routers(&self) -> Vec<RouterConfiguration> {
        self.configurations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn add(&self, configuration: RouterConfiguration) {
        let id = configuration.id.clone();
        {
            let mut guard = self
                .configurations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            match guard.iter_mut().find(|existing| existing.id == id) {
                Some(existing) => *existing = configuration,
                None => guard.push(configuration),
            }
        }
        // No receivers is not an error for a profile.
        let _ = self.events.send(ConfigurationEvent::Added(id));
    }

    fn remove(&self, router_id: &str) -> bool {
        let removed = {
            let mut guard = self
                .configurations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let before = guard.len();
            guard.retain(|existing| existing.id != router_id);
            guard.len() != before
        };
        if removed {
            let _ = self
                .events
                .send(ConfigurationEvent::Removed(router_id.to_string()));
        }
        removed
    }

    fn subscribe(&self) -> broadcast::Receiver<ConfigurationEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigurationEvent, ConfigurationProfile, MemoryConfigurationProfile, RedirectOption,
        RouterConfiguration, TargetType,
    };

    const ROUTER_JSON: &str = r#"{
        "id": "primary",
        "name": "default",
        "routes": [{
            "id": "objects",
            "patterns": ["objects\\..*", "!objects.expire"],
            "targets": [{
                "id": "memory",
                "source": "mem",
                "type": "driver",
                "redirects": [{
                    "id": "fallback",
                    "conditions": ["Empty", "NotFound"],
                    "options": ["publish"],
                    "targets": [{ "id": "archive", "source": "archive", "type": "Router" }]
                }]
            }]
        }]
    }"#;

    #[test]
    fn router_configuration_parses_with_case_insensitive_enums() {
        let configuration: RouterConfiguration =
            serde_json::from_str(ROUTER_JSON).expect("configuration should parse");

        assert_eq!(configuration.id, "primary");
        assert_eq!(configuration.description, None);
        let route = &configuration.routes[0];
        assert_eq!(route.patterns.len(), 2);
        assert!(route.filters.is_empty());

        let target = &route.targets[0];
        assert_eq!(target.target_type, TargetType::Driver);
        let redirect = &target.redirects[0];
        assert_eq!(redirect.options, vec![RedirectOption::Publish]);
        assert_eq!(redirect.targets[0].target_type, TargetType::Router);
    }

    #[test]
    fn unknown_fields_and_types_are_rejected() {
        let unknown_field = r#"{ "id": "a", "routez": [] }"#;
        assert!(serde_json::from_str::<RouterConfiguration>(unknown_field).is_err());

        let unknown_type = r#"{ "id": "a", "routes": [{ "id": "r", "targets": [
            { "id": "t", "source": "*", "type": "Service" }
        ]}]}"#;
        assert!(serde_json::from_str::<RouterConfiguration>(unknown_type).is_err());
    }

    #[test]
    fn target_type_serializes_canonical_spelling() {
        let json = serde_json::to_string(&TargetType::Router).expect("serializes");
        assert_eq!(json, "\"Router\"");
    }

    #[tokio::test]
    async fn memory_profile_upserts_and_notifies() {
        let profile = MemoryConfigurationProfile::default();
        let mut events = profile.subscribe();

        profile.add(RouterConfiguration::new("a", "default", Vec::new()));
        profile.add(RouterConfiguration::new("a", "renamed", Vec::new()));
        assert_eq!(profile.routers().len(), 1);
        assert_eq!(profile.routers()[0].name, "renamed");

        assert!(profile.remove("a"));
        assert!(!profile.remove("a"));

        assert_eq!(
            events.recv().await.ok(),
            Some(ConfigurationEvent::Added("a".into()))
        );
        assert_eq!(
            events.recv().await.ok(),
            Some(ConfigurationEvent::Added("a".into()))
        );
        assert_eq!(
            events.recv().await.ok(),
            Some(ConfigurationEvent::Removed("a".into()))
        );
    }
}
