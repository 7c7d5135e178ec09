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

use crate::control_plane::hub_cache::ArtifactBuilder;
use crate::error::{BoxError, RoutingError};
use crate::routing::message::Message;
use crate::runtime::teardown::Closable;
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A message the sink could not deliver, with the sink's own error.
pub struct SendFailure {
    pub message: Message,
    pub error: BoxError,
}

impl Debug for SendFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendFailure")
            .field("message_id", &self.message.id())
            .field("error", &self.error.to_string())
            .finish()
    }
}

/// Outcome of one [`Sink::process`] batch.
#[derive(Debug, Default)]
pub struct SinkResult {
    pub succeeded: Vec<Message>,
    pub failures: Vec<SendFailure>,
}

impl SinkResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Terminal delivery target of one hub.
#[async_trait]
pub trait Sink: Closable {
    async fn process(&self, messages: Vec<Message>, token: &CancellationToken) -> SinkResult;
}

/// Creates the [`Sink`] of a hub and owns whatever the sinks share.
#[async_trait]
pub trait SinkFactory: Send + Sync {
    async fn create(&self, hub: &str) -> Result<Arc<dyn Sink>, BoxError>;

    /// Releases shared resources once every sink has been closed.
    async fn close(&self, _token: &CancellationToken) -> Result<(), BoxError> {
        Ok(())
    }
}

pub(crate) struct SinkBuilder {
    factory: Arc<dyn SinkFactory>,
}

impl SinkBuilder {
    pub(crate) fn new(factory: Arc<dyn SinkFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl ArtifactBuilder<dyn Sink> for SinkBuilder {
    async fn build(
        &self,
        hub: &str,
        token: &CancellationToken,
    ) -> Result<Arc<dyn Sink>, RoutingError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(RoutingError::Cancelled),
            created = self.factory.create(hub) => {
                created.map_err(|source| RoutingError::SinkCreate {
                    hub: hub.to_string(),
                    source,
                })
            }
        }
    }
}
