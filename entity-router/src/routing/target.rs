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

//! Resolved targets and their redirects.
//!
//! A target's shape (id, type, redirects) is fixed when the router is built. Only its bindings
//! change: the matched drivers of a driver target and the nested router of a router target.
//! Both live behind `ArcSwap` so a rebind replaces the whole binding at once and dispatch
//! works from a cheap snapshot.

use arc_swap::{ArcSwap, ArcSwapOption};
use std::any::Any;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tracing::warn;

use crate::configuration::{
    RedirectConfiguration, RedirectOption, RouteConfiguration, TargetConfiguration, TargetType,
};
use crate::driver::{BoundDriver, CapabilityInterface, CapabilityKey, Driver};
use crate::observability::events;
use crate::result::ResultType;
use crate::router::Router;
use crate::routing::filter::EntityFilter;

const COMPONENT: &str = "route_target";

/// Driver set bound to a driver target plus the per-capability resolution cache.
///
/// The cache belongs to the binding snapshot, so swapping in a new binding discards it.
#[derive(Default)]
pub(crate) struct DriverBinding {
    drivers: Vec<Arc<Driver>>,
    resolved: Mutex<HashMap<CapabilityKey, Arc<dyn Any + Send + Sync>>>,
}

impl DriverBinding {
    fn new(drivers: Vec<Arc<Driver>>) -> Self {
        Self {
            drivers,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    fn resolve<D>(&self) -> Arc<Vec<BoundDriver<D>>>
    where
        D: CapabilityInterface + ?Sized,
    {
        let key = D::key();
        let mut resolved = self.resolved.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = resolved
            .get(&key)
            .and_then(|cached| cached.clone().downcast::<Vec<BoundDriver<D>>>().ok())
        {
            return cached;
        }

        // An empty list is cached too and acts as the known-empty marker.
        let bound: Arc<Vec<BoundDriver<D>>> = Arc::new(
            self.drivers
                .iter()
                .filter_map(|driver| {
                    driver.capability::<D>().map(|handle| BoundDriver {
                        driver: driver.clone(),
                        handle,
                    })
                })
                .collect(),
        );
        resolved.insert(key, bound.clone() as Arc<dyn Any + Send + Sync>);
        bound
    }
}

struct RouterBinding {
    router_id: String,
    router: Weak<Router>,
}

/// A redirect attached to a target.
pub struct Redirect {
    id: String,
    conditions: Vec<ResultType>,
    targets: Vec<Arc<RouteTarget>>,
    options: Vec<RedirectOption>,
}

impl Redirect {
    fn build(
        router_id: &str,
        route: &Arc<RouteConfiguration>,
        filter: &Option<Arc<EntityFilter>>,
        configuration: &RedirectConfiguration,
    ) -> Self {
        let mut conditions = Vec::with_capacity(configuration.conditions.len());
        for condition in &configuration.conditions {
            match ResultType::from_str(condition) {
                Ok(result_type) if !conditions.contains(&result_type) => {
                    conditions.push(result_type)
                }
                Ok(_) => {}
                Err(err) => warn!(
                    event = events::REDIRECT_CONDITION_UNKNOWN,
                    component = COMPONENT,
                    router_id,
                    redirect_id = configuration.id.as_str(),
                    err = %err,
                    "ignoring unknown redirect condition"
                ),
            }
        }

        Self {
            id: configuration.id.clone(),
            conditions,
            targets: configuration
                .targets
                .iter()
                .map(|target| RouteTarget::build(router_id, route, filter, target))
                .collect(),
            options: configuration.options.clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn conditions(&self) -> &[ResultType] {
        &self.conditions
    }

    pub fn targets(&self) -> &[Arc<RouteTarget>] {
        &self.targets
    }

    pub fn options(&self) -> &[RedirectOption] {
        &self.options
    }

    pub fn has_option(&self, option: RedirectOption) -> bool {
        self.options.contains(&option)
    }

    pub fn triggers_on(&self, result_type: ResultType) -> bool {
        self.conditions.contains(&result_type)
    }
}

/// A resolved handler attached to a route.
pub struct RouteTarget {
    id: String,
    configuration_id: String,
    target_type: TargetType,
    route: Arc<RouteConfiguration>,
    filter: Option<Arc<EntityFilter>>,
    redirects: Vec<Redirect>,
    drivers: ArcSwap<DriverBinding>,
    router: ArcSwapOption<RouterBinding>,
}

impl RouteTarget {
    /// Builds a target and, recursively, the targets of its redirects.
    pub(crate) fn build(
        router_id: &str,
        route: &Arc<RouteConfiguration>,
        filter: &Option<Arc<EntityFilter>>,
        configuration: &TargetConfiguration,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: configuration.source.clone(),
            configuration_id: configuration.id.clone(),
            target_type: configuration.target_type,
            route: route.clone(),
            filter: filter.clone(),
            redirects: configuration
                .redirects
                .iter()
                .map(|redirect| Redirect::build(router_id, route, filter, redirect))
                .collect(),
            drivers: ArcSwap::from_pointee(DriverBinding::default()),
            router: ArcSwapOption::empty(),
        })
    }

    /// Target identity: the configured `source` (driver configuration id, `*`, or router id).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn configuration_id(&self) -> &str {
        &self.configuration_id
    }

    pub fn target_type(&self) -> TargetType {
        self.target_type
    }

    pub fn route(&self) -> &RouteConfiguration {
        &self.route
    }

    pub fn filter(&self) -> Option<&EntityFilter> {
        self.filter.as_deref()
    }

    pub fn redirects(&self) -> &[Redirect] {
        &self.redirects
    }

    /// First redirect whose conditions contain `result_type`.
    pub fn find_redirect(&self, result_type: ResultType) -> Option<&Redirect> {
        self.redirects
            .iter()
            .find(|redirect| redirect.triggers_on(result_type))
    }

    /// Bound drivers implementing capability interface `D`, in binding order.
    pub fn drivers<D>(&self) -> Arc<Vec<BoundDriver<D>>>
    where
        D: CapabilityInterface + ?Sized,
    {
        self.drivers.load().resolve::<D>()
    }

    /// All drivers in the current binding regardless of capability.
    pub fn bound_drivers(&self) -> Vec<Arc<Driver>> {
        self.drivers.load().drivers.clone()
    }

    pub(crate) fn bind_drivers(&self, drivers: Vec<Arc<Driver>>) {
        self.drivers.store(Arc::new(DriverBinding::new(drivers)));
    }

    /// The bound nested router, if it is still alive.
    pub fn router(&self) -> Option<Arc<Router>> {
        self.router
            .load()
            .as_ref()
            .and_then(|binding| binding.router.upgrade())
    }

    pub fn bound_router_id(&self) -> Option<String> {
        self.router
            .load()
            .as_ref()
            .map(|binding| binding.router_id.clone())
    }

    pub(crate) fn bind_router(&self, router: Option<&Arc<Router>>) {
        self.router.store(router.map(|router| {
            Arc::new(RouterBinding {
                router_id: router.id().to_string(),
                router: Arc::downgrade(router),
            })
        }));
    }
}
