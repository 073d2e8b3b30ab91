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

//! One routing domain: the target tree built from a [`RouterConfiguration`], route-key lookup
//! and driver/router binding.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

use crate::buffer::BufferRegistry;
use crate::configuration::{
    RedirectOption, RouteConfiguration, RouterConfiguration, TargetType, WILDCARD,
};
use crate::dispatch::EntityRouter;
use crate::driver::Driver;
use crate::entity::Entity;
use crate::observability::events;
use crate::result::ResultType;
use crate::routing::filter::EntityFilter;
use crate::routing::pattern_matcher::PatternMatcher;
use crate::routing::target::{Redirect, RouteTarget};

const COMPONENT: &str = "router";

/// Reserved router name preferred by [`crate::RouterProvider::get_router`].
pub const DEFAULT_ROUTER_NAME: &str = "default";

const DENY_PREFIX: char = '!';

pub struct Router {
    id: String,
    configuration: RouterConfiguration,
    routes: Vec<Arc<RouteConfiguration>>,
    targets: Vec<Arc<RouteTarget>>,
    matcher: PatternMatcher,
    buffers: Arc<BufferRegistry>,
    initialized: AtomicBool,
    // Serialises rebinds; dispatch never takes it.
    mapping: Mutex<()>,
}

impl Router {
    /// Builds the target tree for `configuration`. Bindings stay empty until
    /// [`Router::map_targets`] runs.
    pub fn new(configuration: RouterConfiguration, buffers: Arc<BufferRegistry>) -> Self {
        let routes: Vec<Arc<RouteConfiguration>> = configuration
            .routes
            .iter()
            .cloned()
            .map(Arc::new)
            .collect();

        let mut targets = Vec::new();
        for route in &routes {
            let filter = EntityFilter::compile(&route.filters).map(Arc::new);
            for target in &route.targets {
                targets.push(RouteTarget::build(
                    &configuration.id,
                    route,
                    &filter,
                    target,
                ));
            }
        }

        Self {
            id: configuration.id.clone(),
            configuration,
            routes,
            targets,
            matcher: PatternMatcher::new(),
            buffers,
            initialized: AtomicBool::new(false),
            mapping: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.configuration.name
    }

    pub fn configuration(&self) -> &RouterConfiguration {
        &self.configuration
    }

    pub fn buffers(&self) -> &Arc<BufferRegistry> {
        &self.buffers
    }

    /// Top-level targets in configuration order.
    pub fn targets(&self) -> &[Arc<RouteTarget>] {
        &self.targets
    }

    /// Entity operations for entity kind `E` on this router.
    pub fn entities<E: Entity>(self: &Arc<Self>) -> EntityRouter<E> {
        EntityRouter::new(self.clone())
    }

    /// Targets whose route has a pattern matching `route_key`: driver targets first, then router
    /// targets, each in configuration order.
    pub fn get_targets(&self, route_key: &str) -> Vec<Arc<RouteTarget>> {
        if route_key.is_empty() {
            return Vec::new();
        }

        let matching = |target: &&Arc<RouteTarget>| {
            target
                .route()
                .patterns
                .iter()
                .filter(|pattern| !pattern.starts_with(DENY_PREFIX))
                .any(|pattern| self.matcher.is_match(pattern, route_key))
        };

        let drivers = self
            .targets
            .iter()
            .filter(|target| target.target_type() == TargetType::Driver)
            .filter(matching);
        let routers = self
            .targets
            .iter()
            .filter(|target| target.target_type() == TargetType::Router)
            .filter(matching);

        drivers.chain(routers).cloned().collect()
    }

    /// Drivers a driver target binds to.
    ///
    /// A driver is a candidate when an allow pattern matches its id or one of its capability
    /// routes; deny patterns (`!` prefix) then remove candidates. The survivors are restricted to
    /// the target's source configuration id unless the source is `*`, and deduplicated by id.
    pub fn get_target_drivers(
        &self,
        target: &RouteTarget,
        drivers: &[Arc<Driver>],
    ) -> Vec<Arc<Driver>> {
        let patterns = &target.route().patterns;
        if patterns.is_empty() || drivers.is_empty() {
            return Vec::new();
        }

        let matches = |pattern: &str, driver: &Driver| {
            driver
                .match_keys()
                .any(|key| self.matcher.is_match(pattern, key))
        };

        let mut candidates: Vec<&Arc<Driver>> = Vec::new();
        for pattern in patterns.iter().filter(|p| !p.starts_with(DENY_PREFIX)) {
            candidates.extend(drivers.iter().filter(|driver| matches(pattern, driver)));
        }
        for pattern in patterns.iter().filter_map(|p| p.strip_prefix(DENY_PREFIX)) {
            candidates.retain(|driver| !matches(pattern, driver));
        }

        let mut bound: Vec<Arc<Driver>> = Vec::new();
        for driver in candidates {
            if target.id() != WILDCARD && driver.configuration_id() != target.id() {
                continue;
            }
            if !bound.iter().any(|existing| existing.id() == driver.id()) {
                bound.push(driver.clone());
            }
        }
        bound
    }

    /// Rebinds every target (redirect targets included) against the live router and driver sets.
    pub fn map_targets(&self, routers: &[Arc<Router>], drivers: &[Arc<Driver>]) {
        let _guard = self.mapping.lock().unwrap_or_else(PoisonError::into_inner);

        let mut mapped = 0usize;
        for target in &self.targets {
            self.map_target(target, routers, drivers, &mut mapped);
        }

        debug!(
            event = events::TARGETS_MAPPED,
            component = COMPONENT,
            router_id = self.id.as_str(),
            targets = mapped,
            routers = routers.len(),
            drivers = drivers.len(),
            "mapped router targets"
        );
    }

    fn map_target(
        &self,
        target: &Arc<RouteTarget>,
        routers: &[Arc<Router>],
        drivers: &[Arc<Driver>],
        mapped: &mut usize,
    ) {
        match target.target_type() {
            TargetType::Driver => target.bind_drivers(self.get_target_drivers(target, drivers)),
            TargetType::Router => {
                target.bind_router(routers.iter().find(|router| router.id() == target.id()))
            }
        }
        *mapped += 1;

        for redirect in target.redirects() {
            for redirect_target in redirect.targets() {
                self.map_target(redirect_target, routers, drivers, mapped);
            }
        }
    }

    /// Maps targets and marks the router eligible for selection.
    pub fn initialize(&self, routers: &[Arc<Router>], drivers: &[Arc<Driver>]) {
        self.map_targets(routers, drivers);
        self.initialized.store(true, Ordering::Release);
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Serialisable snapshot of the configuration and current bindings.
    pub fn information(&self) -> RouterInformation {
        let routes = self
            .routes
            .iter()
            .map(|route| RouteInformation {
                id: route.id.clone(),
                patterns: route.patterns.clone(),
                filters: route.filters.clone(),
                targets: self
                    .targets
                    .iter()
                    .filter(|target| std::ptr::eq(target.route(), route.as_ref()))
                    .map(|target| TargetInformation::from_target(target))
                    .collect(),
            })
            .collect();

        RouterInformation {
            id: self.id.clone(),
            name: self.configuration.name.clone(),
            description: self.configuration.description.clone(),
            initialized: self.is_initialized(),
            routes,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterInformation {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub initialized: bool,
    pub routes: Vec<RouteInformation>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteInformation {
    pub id: String,
    pub patterns: Vec<String>,
    pub filters: Vec<String>,
    pub targets: Vec<TargetInformation>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetInformation {
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub target_type: TargetType,
    pub drivers: Vec<String>,
    pub router: Option<String>,
    pub redirects: Vec<RedirectInformation>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectInformation {
    pub id: String,
    pub conditions: Vec<ResultType>,
    pub options: Vec<RedirectOption>,
    pub targets: Vec<TargetInformation>,
}

impl TargetInformation {
    fn from_target(target: &RouteTarget) -> Self {
        Self {
            id: target.configuration_id().to_string(),
            source: target.id().to_string(),
            target_type: target.target_type(),
            drivers: target
                .bound_drivers()
                .iter()
                .map(|driver| driver.id().to_string())
                .collect(),
            router: target.bound_router_id(),
            redirects: target
                .redirects()
                .iter()
                .map(RedirectInformation::from_redirect)
                .collect(),
        }
    }
}

impl RedirectInformation {
    fn from_redirect(redirect: &Redirect) -> Self {
        Self {
            id: redirect.id().to_string(),
            conditions: redirect.conditions().to_vec(),
            options: redirect.options().to_vec(),
            targets: redirect
                .targets()
                .iter()
                .map(|target| TargetInformation::from_target(target))
                .collect(),
        }
    }
}
