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
use hub_router::{EndpointHealth, HealthStatus, Message, RoutingError, RoutingService};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Inner routing service that records every batch it is handed.
#[derive(Default)]
pub struct RecordingRoutingService {
    routed: Mutex<Vec<(String, Vec<Message>)>>,
    starts: AtomicUsize,
    closes: AtomicUsize,
}

impl RecordingRoutingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches received so far as `(hub, message ids)`, in arrival order.
    pub fn routed_ids(&self) -> Vec<(String, Vec<String>)> {
        self.routed
            .lock()
            .unwrap()
            .iter()
            .map(|(hub, messages)| {
                let ids = messages
                    .iter()
                    .map(|message| message.id().to_string())
                    .collect();
                (hub.clone(), ids)
            })
            .collect()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingService for RecordingRoutingService {
    async fn route(&self, hub: &str, messages: Vec<Message>) -> Result<(), RoutingError> {
        self.routed
            .lock()
            .unwrap()
            .push((hub.to_string(), messages));
        Ok(())
    }

    async fn endpoint_health(&self, hub: &str) -> Result<Vec<EndpointHealth>, RoutingError> {
        Ok(vec![EndpointHealth::new(
            format!("{hub}-storage"),
            HealthStatus::Healthy,
        )])
    }

    async fn start(&self) -> Result<(), RoutingError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self, _token: &CancellationToken) -> Result<(), RoutingError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
