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

use crate::error::RoutingError;
use crate::routing::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Reported state of one routing endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointHealth {
    pub endpoint_id: String,
    pub status: HealthStatus,
}

impl EndpointHealth {
    pub fn new(endpoint_id: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            endpoint_id: endpoint_id.into(),
            status,
        }
    }
}

/// Routes batches of hub messages.
///
/// Implemented by [`crate::FilteringRoutingService`] and
/// [`crate::FrontendRoutingService`], and by whatever service a filtering
/// service wraps.
#[async_trait]
pub trait RoutingService: Send + Sync {
    /// Routes `messages` of `hub`. Success means every message was handled.
    async fn route(&self, hub: &str, messages: Vec<Message>) -> Result<(), RoutingError>;

    async fn route_one(&self, hub: &str, message: Message) -> Result<(), RoutingError> {
        self.route(hub, vec![message]).await
    }

    async fn endpoint_health(&self, hub: &str) -> Result<Vec<EndpointHealth>, RoutingError>;

    async fn start(&self) -> Result<(), RoutingError>;

    /// Stops accepting work and releases every resource. Calling it again is a no-op.
    async fn close(&self, token: &CancellationToken) -> Result<(), RoutingError>;
}
