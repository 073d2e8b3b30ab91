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

//! Debounced reload loop for the router provider.

use lazy_static::lazy_static;
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::select;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::configuration::ConfigurationEvent;
use crate::driver::DriverEvent;
use crate::observability::events;
use crate::provider::RouterProvider;

const COMPONENT: &str = "provider_reload";

const RELOAD_RUNTIME_THREADS: usize = 2;

lazy_static! {
    static ref RELOAD_RUNTIME: Runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(RELOAD_RUNTIME_THREADS)
        .thread_name("entity-router-reload")
        .enable_all()
        .build()
        .expect("Unable to create router reload runtime");
}

pub(crate) fn spawn_reload_loop(
    provider: Weak<RouterProvider>,
    configuration_events: Receiver<ConfigurationEvent>,
    driver_events: Receiver<DriverEvent>,
    debounce: Duration,
) -> JoinHandle<()> {
    RELOAD_RUNTIME.spawn(run_reload_loop(
        provider,
        configuration_events,
        driver_events,
        debounce,
    ))
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Reloads the provider once no configuration or driver event arrived for `debounce`.
async fn run_reload_loop(
    provider: Weak<RouterProvider>,
    mut configuration_events: Receiver<ConfigurationEvent>,
    mut driver_events: Receiver<DriverEvent>,
    debounce: Duration,
) {
    let mut deadline: Option<Instant> = None;
    let mut configurations_open = true;
    let mut drivers_open = true;

    loop {
        if !configurations_open && !drivers_open && deadline.is_none() {
            break;
        }

        let source = select! {
            event = configuration_events.recv(), if configurations_open => match event {
                Ok(_) => "configuration",
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        event = events::PROVIDER_RELOAD_LAGGED,
                        component = COMPONENT,
                        source = "configuration",
                        skipped,
                        "reload listener lagged"
                    );
                    "configuration"
                }
                Err(RecvError::Closed) => {
                    configurations_open = false;
                    continue;
                }
            },
            event = driver_events.recv(), if drivers_open => match event {
                Ok(_) => "driver",
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        event = events::PROVIDER_RELOAD_LAGGED,
                        component = COMPONENT,
                        source = "driver",
                        skipped,
                        "reload listener lagged"
                    );
                    "driver"
                }
                Err(RecvError::Closed) => {
                    drivers_open = false;
                    continue;
                }
            },
            _ = wait_for(deadline) => {
                deadline = None;
                let Some(provider) = provider.upgrade() else {
                    break;
                };
                provider.load();
                continue;
            }
        };

        deadline = Some(Instant::now() + debounce);
        debug!(
            event = events::PROVIDER_RELOAD_SCHEDULED,
            component = COMPONENT,
            source,
            debounce_ms = debounce.as_millis() as u64,
            "router reload scheduled"
        );
    }

    info!(
        event = events::PROVIDER_RELOAD_STOPPED,
        component = COMPONENT,
        "router reload loop stopped"
    );
}
