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

use async_trait::async_trait;
use hub_router::{BoxError, Closable, Message, SendFailure, Sink, SinkFactory, SinkResult};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Error a [`RecordingSink`] reports for a message it was told to fail.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("injected delivery failure for message {message_id}")]
pub struct InjectedFailure {
    pub message_id: String,
}

/// Sink that records what it delivered and fails a configured set of message ids.
pub struct RecordingSink {
    hub: String,
    fail_ids: HashSet<String>,
    fail_close: bool,
    delivered: Mutex<Vec<Message>>,
    closes: AtomicUsize,
}

impl RecordingSink {
    pub fn hub(&self) -> &str {
        &self.hub
    }

    pub fn delivered_ids(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|message| message.id().to_string())
            .collect()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Closable for RecordingSink {
    async fn close(&self, _token: &CancellationToken) -> Result<(), BoxError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(format!("sink for {} failed to flush", self.hub).into());
        }
        Ok(())
    }
}

#[async_trait]
impl Sink for RecordingSink {
    async fn process(&self, messages: Vec<Message>, _token: &CancellationToken) -> SinkResult {
        let mut result = SinkResult::default();
        for message in messages {
            if self.fail_ids.contains(message.id()) {
                let error = InjectedFailure {
                    message_id: message.id().to_string(),
                };
                result.failures.push(SendFailure {
                    message,
                    error: Box::new(error),
                });
            } else {
                self.delivered.lock().unwrap().push(message.clone());
                result.succeeded.push(message);
            }
        }
        result
    }
}

#[derive(Default)]
struct FactoryState {
    fail_ids: HashSet<String>,
    fail_create: bool,
    fail_close_for: HashSet<String>,
    create_delay: Option<Duration>,
    created: Vec<Arc<RecordingSink>>,
}

/// Sink factory that hands out [`RecordingSink`]s and counts its own lifecycle.
#[derive(Clone, Default)]
pub struct RecordingSinkFactory {
    state: Arc<Mutex<FactoryState>>,
    creates: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl RecordingSinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sinks created from now on fail the message with `message_id`.
    pub fn fail_message(&self, message_id: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_ids
            .insert(message_id.to_string());
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.state.lock().unwrap().fail_create = fail;
    }

    /// Sinks created for `hub` from now on fail `close`.
    pub fn fail_close_for(&self, hub: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_close_for
            .insert(hub.to_string());
    }

    pub fn set_create_delay(&self, delay: Duration) {
        self.state.lock().unwrap().create_delay = Some(delay);
    }

    /// Number of `create` calls, including failed ones.
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn created_for(&self, hub: &str) -> Vec<Arc<RecordingSink>> {
        self.state
            .lock()
            .unwrap()
            .created
            .iter()
            .filter(|sink| sink.hub() == hub)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SinkFactory for RecordingSinkFactory {
    async fn create(&self, hub: &str) -> Result<Arc<dyn Sink>, BoxError> {
        self.creates.fetch_add(1, Ordering::SeqCst);

        let delay = self.state.lock().unwrap().create_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.fail_create {
            return Err(format!("unable to allocate queue for {hub}").into());
        }
        let sink = Arc::new(RecordingSink {
            hub: hub.to_string(),
            fail_ids: state.fail_ids.clone(),
            fail_close: state.fail_close_for.contains(hub),
            delivered: Mutex::new(Vec::new()),
            closes: AtomicUsize::new(0),
        });
        state.created.push(sink.clone());
        Ok(sink)
    }

    async fn close(&self, _token: &CancellationToken) -> Result<(), BoxError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
