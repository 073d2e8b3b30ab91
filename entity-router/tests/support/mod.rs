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


#![allow(dead_code)]

use entity_router::{
    BufferKey, BufferOperation, EntityEmptyRequest, MemoryBuffer, RedirectOption,
    RouteConfiguration, RouterConfiguration, TargetConfiguration,
};
use integration_test_utils::{redirect_on, RouterHarness, TestObject};
use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::subscriber::DefaultGuard;

pub(crate) const CACHE: &str = "cache";
pub(crate) const STORE: &str = "store";
pub(crate) const BUFFER_CAPACITY: usize = 16;

/// `main` router: reads and queries go to the cache and are redirected to the store on
/// `conditions`; publish and empty go to the cache.
pub(crate) fn cache_through_router(
    conditions: &[&str],
    options: Vec<RedirectOption>,
) -> RouterConfiguration {
    RouterConfiguration::new(
        "main",
        "default",
        vec![
            RouteConfiguration::new(
                "objects-read",
                ["objects.read", "objects.query"],
                vec![TargetConfiguration::driver("cache-read", CACHE)
                    .with_redirect(redirect_on("miss", conditions, &[STORE], options))],
            ),
            RouteConfiguration::new(
                "objects-write",
                ["objects.publish", "objects.empty"],
                vec![TargetConfiguration::driver("cache-write", CACHE)],
            ),
        ],
    )
}

pub(crate) fn publish_buffer(
    harness: &RouterHarness,
    configuration_id: &str,
    capacity: usize,
) -> Arc<MemoryBuffer<TestObject>> {
    harness.buffers.register_memory::<TestObject>(
        BufferKey::for_entity::<TestObject>(BufferOperation::Publish, configuration_id),
        capacity,
    )
}

pub(crate) fn empty_buffer(
    harness: &RouterHarness,
    configuration_id: &str,
) -> Arc<MemoryBuffer<EntityEmptyRequest>> {
    harness.buffers.register_memory::<EntityEmptyRequest>(
        BufferKey::for_entity::<TestObject>(BufferOperation::Empty, configuration_id),
        BUFFER_CAPACITY,
    )
}

/// Formatted `tracing` output captured for the current thread.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    /// Routes every event on this thread into the capture until the guard drops.
    pub(crate) fn install(&self) -> DefaultGuard {
        let logs = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || logs.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
