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

//! Tuning knobs shared by both routing services.

use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 60_000;

/// Per-service cache configuration.
///
/// ```
/// use hub_router::HubCacheConfig;
///
/// let config: HubCacheConfig =
///     serde_json::from_str(r#"{ "subscriber_name": "edge", "close_timeout_ms": 500 }"#).unwrap();
/// assert_eq!(config.close_timeout().as_millis(), 500);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubCacheConfig {
    /// Name passed to `Notifier::subscribe` for every hub.
    pub subscriber_name: String,
    /// Deadline for closing a single evicted notifier, evaluator or sink.
    pub close_timeout_ms: u64,
}

impl HubCacheConfig {
    pub fn new(subscriber_name: impl Into<String>) -> Self {
        Self {
            subscriber_name: subscriber_name.into(),
            ..Self::default()
        }
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

impl Default for HubCacheConfig {
    fn default() -> Self {
        Self {
            subscriber_name: String::new(),
            close_timeout_ms: DEFAULT_CLOSE_TIMEOUT_MS,
        }
    }
}
