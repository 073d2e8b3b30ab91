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


use entity_router::{
    BufferRegistry, Driver, DriverRegistry, MemoryConfigurationProfile, ProviderSettings,
    RedirectConfiguration, RedirectOption, ResultType, RouteConfiguration, RouteResponse,
    Router, RouterConfiguration, RouterProvider, TargetConfiguration,
};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::time::Instant;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Installs a test-writer `tracing` subscriber once per test binary. `RUST_LOG` overrides the
/// default `entity_router=trace` filter.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("entity_router=trace"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Polls `condition` every 10ms until it holds or `timeout` passes.
pub async fn wait_until<F: Fn() -> bool>(timeout: Duration, condition: F) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Route with a single driver target.
pub fn driver_route(id: &str, patterns: &[&str], source: &str) -> RouteConfiguration {
    RouteConfiguration::new(
        id,
        patterns.iter().copied(),
        vec![TargetConfiguration::driver(format!("{id}-target"), source)],
    )
}

/// Redirect to the driver targets in `sources` on `conditions`.
pub fn redirect_on(
    id: &str,
    conditions: &[&str],
    sources: &[&str],
    options: Vec<RedirectOption>,
) -> RedirectConfiguration {
    RedirectConfiguration::new(
        id,
        conditions.iter().copied(),
        sources
            .iter()
            .map(|source| TargetConfiguration::driver(format!("{id}-{source}"), *source))
            .collect(),
        options,
    )
}

pub fn result_types<T>(response: &RouteResponse<T>) -> Vec<ResultType> {
    response
        .results
        .iter()
        .map(|result| result.result_type)
        .collect()
}

/// Queries answered with `Ok`, in result order.
pub fn ok_queries<T>(response: &RouteResponse<T>) -> Vec<String> {
    response
        .results
        .iter()
        .filter(|result| result.result_type == ResultType::Ok)
        .filter_map(|result| result.query.clone())
        .collect()
}

/// A provider wired to in-memory configuration, driver and buffer registries.
pub struct RouterHarness {
    pub profile: Arc<MemoryConfigurationProfile>,
    pub drivers: Arc<DriverRegistry>,
    pub buffers: Arc<BufferRegistry>,
    pub provider: Arc<RouterProvider>,
}

impl RouterHarness {
    pub fn new(configurations: Vec<RouterConfiguration>, drivers: Vec<Driver>) -> Self {
        Self::with_settings(configurations, drivers, ProviderSettings::default())
    }

    pub fn with_settings(
        configurations: Vec<RouterConfiguration>,
        drivers: Vec<Driver>,
        settings: ProviderSettings,
    ) -> Self {
        init_logging();

        let profile = Arc::new(MemoryConfigurationProfile::new(configurations));
        let registry = Arc::new(DriverRegistry::new());
        for driver in drivers {
            registry.add(driver);
        }
        let buffers = Arc::new(BufferRegistry::new());
        let provider = RouterProvider::new(
            profile.clone(),
            registry.clone(),
            buffers.clone(),
            settings,
        );
        provider.load();

        Self {
            profile,
            drivers: registry,
            buffers,
            provider,
        }
    }

    /// Router resolved by id or name. Panics when it is not loaded.
    pub fn router(&self, key: &str) -> Arc<Router> {
        self.provider
            .get_router_by_key(key)
            .unwrap_or_else(|| panic!("router {key} is not loaded"))
    }
}
