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

//! Async write buffers.
//!
//! When a write runs in [`OperationMode::Async`](crate::OperationMode::Async) the dispatch path
//! appends each item to the buffer registered for `(operation, entity kind, driver configuration
//! id)` and returns immediately. Draining buffers into drivers belongs to the buffer owner.

use serde::Serialize;
use std::any::Any;
use std::collections::{HashMap, VecDeque};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;

use crate::entity::{Entity, EntityDeleteRequest, EntityEmptyRequest, EntityIndexRequest};
use crate::observability::events;

const COMPONENT: &str = "buffer";

/// Write operation a buffer accepts items for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum BufferOperation {
    Publish,
    Delete,
    Empty,
    Index,
}

impl BufferOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BufferOperation::Publish => "publish",
            BufferOperation::Delete => "delete",
            BufferOperation::Empty => "empty",
            BufferOperation::Index => "index",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct BufferKey {
    pub operation: BufferOperation,
    pub entity_kind: &'static str,
    pub driver_configuration_id: String,
}

impl BufferKey {
    pub fn new(
        operation: BufferOperation,
        entity_kind: &'static str,
        driver_configuration_id: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            entity_kind,
            driver_configuration_id: driver_configuration_id.into(),
        }
    }

    pub fn for_entity<E: Entity>(
        operation: BufferOperation,
        driver_configuration_id: impl Into<String>,
    ) -> Self {
        Self::new(operation, E::KIND, driver_configuration_id)
    }
}

impl Display for BufferKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.operation.as_str(),
            self.entity_kind,
            self.driver_configuration_id
        )
    }
}

/// Synchronous, non-blocking accept/reject of one item.
pub trait Buffer<T>: Send + Sync {
    fn add(&self, item: T) -> bool;
}

/// Registry of buffers keyed by [`BufferKey`].
#[derive(Default)]
pub struct BufferRegistry {
    buffers: RwLock<HashMap<BufferKey, Arc<dyn Any + Send + Sync>>>,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the buffer for `key`.
    pub fn register<T: 'static>(&self, key: BufferKey, buffer: Arc<dyn Buffer<T>>) {
        debug!(
            event = events::BUFFER_REGISTERED,
            component = COMPONENT,
            buffer_key = %key,
            "registered async buffer"
        );
        self.buffers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(buffer) as Arc<dyn Any + Send + Sync>);
    }

    /// Creates, registers and returns a bounded in-memory buffer.
    pub fn register_memory<T: Send + 'static>(
        &self,
        key: BufferKey,
        capacity: usize,
    ) -> Arc<MemoryBuffer<T>> {
        let buffer = Arc::new(MemoryBuffer::new(capacity));
        self.register::<T>(key, buffer.clone());
        buffer
    }

    pub fn unregister(&self, key: &BufferKey) -> bool {
        self.buffers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    pub fn get<T: 'static>(&self, key: &BufferKey) -> Option<Arc<dyn Buffer<T>>> {
        self.buffers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .and_then(|buffer| buffer.downcast_ref::<Arc<dyn Buffer<T>>>())
            .cloned()
    }

    pub fn publish_buffer<E: Entity>(&self, configuration_id: &str) -> Option<Arc<dyn Buffer<E>>> {
        self.get(&BufferKey::for_entity::<E>(
            BufferOperation::Publish,
            configuration_id,
        ))
    }

    pub fn delete_buffer<E: Entity>(
        &self,
        configuration_id: &str,
    ) -> Option<Arc<dyn Buffer<EntityDeleteRequest>>> {
        self.get(&BufferKey::for_entity::<E>(
            BufferOperation::Delete,
            configuration_id,
        ))
    }

    pub fn empty_buffer<E: Entity>(
        &self,
        configuration_id: &str,
    ) -> Option<Arc<dyn Buffer<EntityEmptyRequest>>> {
        self.get(&BufferKey::for_entity::<E>(
            BufferOperation::Empty,
            configuration_id,
        ))
    }

    pub fn index_buffer<E: Entity>(
        &self,
        configuration_id: &str,
    ) -> Option<Arc<dyn Buffer<EntityIndexRequest>>> {
        self.get(&BufferKey::for_entity::<E>(
            BufferOperation::Index,
            configuration_id,
        ))
    }
}

/// Bounded FIFO buffer; rejects items once `capacity` items are pending.
pub struct MemoryBuffer<T> {
    capacity: usize,
    items: Mutex<VecDeque<T>>,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl<T> MemoryBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: Mutex::new(VecDeque::new()),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Removes up to `max` pending items in arrival order.
    pub fn drain(&self, max: usize) -> Vec<T> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        let count = max.min(items.len());
        items.drain(..count).collect()
    }

    pub fn len(&self) -> usize {
        self.items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}

impl<T: Send> Buffer<T> for MemoryBuffer<T> {
    fn add(&self, item: T) -> bool {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if items.len() >= self.capacity {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        items.push_back(item);
        self.accepted.fetch_add(1, Ordering::Relaxed);
        true
    }
}
