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

//! Live driver set collaborator.

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

use crate::driver::Driver;

const DRIVER_EVENT_CAPACITY: usize = 64;

/// Change notification for the live driver set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DriverEvent {
    Added(String),
    Removed(String),
}

/// Supplies the current set of driver registrations.
pub trait DriverProvider: Send + Sync {
    fn drivers(&self) -> Vec<Arc<Driver>>;

    fn subscribe(&self) -> broadcast::Receiver<DriverEvent>;
}

/// In-process driver provider.
pub struct DriverRegistry {
    drivers: RwLock<Vec<Arc<Driver>>>,
    events: broadcast::Sender<DriverEvent>,
}

impl Default for DriverRegistry {
    fn default() -> Self {
        let (events, _) = broadcast::channel(DRIVER_EVENT_CAPACITY);
        Self {
            drivers: RwLock::new(Vec::new()),
            events,
        }
    }
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a driver, replacing any registration with the same id.
    pub fn add(&self, driver: Driver) -> Arc<Driver> {
        let driver = Arc::new(driver);
        {
            let mut drivers = self.drivers.write().unwrap_or_else(PoisonError::into_inner);
            match drivers.iter_mut().find(|existing| existing.id() == driver.id()) {
                Some(existing) => *existing = driver.clone(),
                None => drivers.push(driver.clone()),
            }
        }
        let _ = self.events.send(DriverEvent::Added(driver.id().to_string()));
        driver
    }

    pub fn remove(&self, driver_id: &str) -> bool {
        let removed = {
            let mut drivers = self.drivers.write().unwrap_or_else(PoisonError::into_inner);
            let before = drivers.len();
            drivers.retain(|existing| existing.id() != driver_id);
            drivers.len() != before
        };
        if removed {
            let _ = self
                .events
                .send(DriverEvent::Removed(driver_id.to_string()));
        }
        removed
    }

    pub fn get(&self, driver_id: &str) -> Option<Arc<Driver>> {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|driver| driver.id() == driver_id)
            .cloned()
    }
}

impl DriverProvider for DriverRegistry {
    fn drivers(&self) -> Vec<Arc<Driver>> {
        self.drivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<DriverEvent> {
        self.events.subscribe()
    }
}
