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

use crate::change_feed::ChangeFeed;
use async_trait::async_trait;
use hub_router::{RouteStore, RouteStoreError, RouterConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// In-memory route store whose edits are published on a [`ChangeFeed`].
pub struct MemoryRouteStore {
    configs: Mutex<HashMap<String, RouterConfig>>,
    feed: ChangeFeed,
    fetch_delay: Mutex<Option<Duration>>,
    fetches: AtomicUsize,
}

impl MemoryRouteStore {
    pub fn new(feed: ChangeFeed) -> Self {
        Self {
            configs: Mutex::new(HashMap::new()),
            feed,
            fetch_delay: Mutex::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Stores `config` without notifying subscribers.
    pub fn seed(&self, hub: &str, config: RouterConfig) {
        self.configs.lock().unwrap().insert(hub.to_string(), config);
    }

    /// Stores `config` and publishes an update for `hub`.
    pub fn set(&self, hub: &str, config: RouterConfig) {
        self.seed(hub, config);
        self.feed.publish_update(hub);
    }

    /// Deletes `hub` and publishes its removal.
    pub fn delete(&self, hub: &str) {
        self.configs.lock().unwrap().remove(hub);
        self.feed.publish_remove(hub);
    }

    /// Makes every fetch sleep first, widening first-use races.
    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteStore for MemoryRouteStore {
    async fn router_config(
        &self,
        hub: &str,
        token: &CancellationToken,
    ) -> Result<RouterConfig, RouteStoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::select! {
                _ = token.cancelled() => return Err(RouteStoreError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.configs
            .lock()
            .unwrap()
            .get(hub)
            .cloned()
            .ok_or_else(|| RouteStoreError::NotFound(hub.to_string()))
    }
}
