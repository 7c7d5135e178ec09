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

//! Change-feed subscription contract.

use crate::error::BoxError;
use crate::runtime::teardown::Closable;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Receives configuration-change events for a hub.
#[async_trait]
pub trait HubChangeListener: Send + Sync {
    /// The hub's routing configuration changed.
    async fn on_update(&self, hub: &str);

    /// The hub was deleted.
    async fn on_remove(&self, hub: &str);
}

/// A subscription handle to the change feed of one hub.
///
/// Closing a notifier stops further callbacks. `close` may be invoked from
/// within one of the listener's own callbacks and must not wait for that
/// callback to return.
#[async_trait]
pub trait Notifier: Closable {
    async fn subscribe(
        &self,
        subscriber_name: &str,
        listener: Arc<dyn HubChangeListener>,
        token: &CancellationToken,
    ) -> Result<(), BoxError>;
}

/// Creates one [`Notifier`] per hub. Creation itself performs no I/O.
pub trait NotifierFactory: Send + Sync {
    fn create(&self, hub: &str) -> Arc<dyn Notifier>;
}
