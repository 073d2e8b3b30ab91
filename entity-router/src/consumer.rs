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

//! Long-lived subscription consumers with cooperative cancellation and fan-in merging.

use tokio::sync::{mpsc, watch};
use tracing::debug;
use uuid::Uuid;

use crate::observability::events;

const COMPONENT: &str = "consumer";

/// Default channel capacity for consumers created by drivers and merges.
pub const DEFAULT_CONSUMER_CAPACITY: usize = 256;

/// Receiving half of a subscription.
///
/// Cancelling (or dropping) a consumer signals its producer through [`ConsumerSender::cancelled`].
/// A merged consumer cancels every underlying consumer when it is cancelled.
pub struct Consumer<T> {
    id: String,
    receiver: mpsc::Receiver<T>,
    cancel: watch::Sender<bool>,
}

/// Producing half of a subscription, held by a driver or a merge task.
pub struct ConsumerSender<T> {
    sender: mpsc::Sender<T>,
    cancelled: watch::Receiver<bool>,
}

impl<T> Clone for ConsumerSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            cancelled: self.cancelled.clone(),
        }
    }
}

impl<T: Send + 'static> Consumer<T> {
    /// Creates a connected sender/consumer pair.
    pub fn channel(capacity: usize) -> (ConsumerSender<T>, Consumer<T>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let (cancel, cancelled) = watch::channel(false);
        (
            ConsumerSender { sender, cancelled },
            Consumer {
                id: Uuid::new_v4().to_string(),
                receiver,
                cancel,
            },
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Receives the next item; `None` once every producer is gone or after cancellation.
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Stops the subscription and signals the producer(s).
    pub fn cancel(&mut self) {
        self.cancel.send_replace(true);
        self.receiver.close();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    /// Merges consumers into one fan-in consumer. Returns `None` for an empty input.
    ///
    /// Each child is drained by its own task. Cancelling or dropping the merged consumer
    /// cancels every child; a child ending on its own does not end the merged consumer
    /// until all children have ended.
    pub fn merge(children: Vec<Consumer<T>>) -> Option<Consumer<T>> {
        if children.is_empty() {
            return None;
        }

        let (sender, merged) = Consumer::channel(DEFAULT_CONSUMER_CAPACITY);
        for child in children {
            tokio::spawn(forward(child, sender.clone()));
        }
        Some(merged)
    }
}

impl<T> Drop for Consumer<T> {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}

impl<T: Send + 'static> ConsumerSender<T> {
    /// Delivers one item. Returns `false` when the consumer is gone or cancelled.
    pub async fn send(&self, item: T) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.sender.send(item).await.is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow() || self.sender.is_closed()
    }

    /// Resolves once the consumer has been cancelled or dropped.
    pub async fn cancelled(&self) {
        let mut cancelled = self.cancelled.clone();
        loop {
            if *cancelled.borrow_and_update() {
                return;
            }
            if cancelled.changed().await.is_err() {
                return;
            }
        }
    }
}

async fn forward<T: Send + 'static>(mut child: Consumer<T>, sender: ConsumerSender<T>) {
    loop {
        tokio::select! {
            _ = sender.cancelled() => {
                debug!(
                    event = events::CONSUMER_CANCELLED,
                    component = COMPONENT,
                    consumer_id = child.id(),
                    "merged consumer cancelled, cancelling child"
                );
                child.cancel();
                break;
            }
            item = child.recv() => match item {
                Some(item) => {
                    if !sender.send(item).await {
                        child.cancel();
                        break;
                    }
                }
                None => break,
            }
        }
    }
}
