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

//! Read-only [`RouteStore`] backed by a JSON file.
//!
//! The file is a JSON object mapping hub names to router configurations. It is
//! re-read on every fetch so edits show up on the next cache miss or update.
//!
//! ```
//! use hub_router::RouteStore;
//! use route_store_static_file::StaticFileRouteStore;
//! use tokio_util::sync::CancellationToken;
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let store = StaticFileRouteStore::new("static-configs/routes.json");
//! let config = store
//!     .router_config("h1", &CancellationToken::new())
//!     .await
//!     .unwrap();
//! assert_eq!(config.routes.len(), 1);
//! # });
//! ```

use async_trait::async_trait;
use hub_router::{RouteStore, RouteStoreError, RouterConfig};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const COMPONENT: &str = "route_store_static_file";

pub struct StaticFileRouteStore {
    static_file: PathBuf,
}

impl StaticFileRouteStore {
    pub fn new(static_file: impl Into<PathBuf>) -> Self {
        Self {
            static_file: static_file.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.static_file
    }

    async fn read_static_config_json(&self) -> Result<Value, RouteStoreError> {
        debug!(component = COMPONENT, file = ?self.static_file, "reading route file");

        let data = tokio::fs::read_to_string(&self.static_file)
            .await
            .map_err(|error| {
                RouteStoreError::Unavailable(format!(
                    "unable to read {}: {error}",
                    self.static_file.display()
                ))
            })?;

        serde_json::from_str(&data)
            .map_err(|error| RouteStoreError::Invalid(format!("unable to parse JSON: {error}")))
    }

    async fn load(&self, hub: &str) -> Result<RouterConfig, RouteStoreError> {
        let value = self.read_static_config_json().await?;
        let Some(mut hubs) = value_into_object(value) else {
            return Err(RouteStoreError::Invalid(
                "route file must be a JSON object mapping hub names to router configurations"
                    .to_string(),
            ));
        };

        let Some(entry) = hubs.remove(hub) else {
            return Err(RouteStoreError::NotFound(hub.to_string()));
        };

        serde_json::from_value(entry).map_err(|error| {
            warn!(component = COMPONENT, hub, err = %error, "invalid router configuration");
            RouteStoreError::Invalid(format!("hub {hub:?}: {error}"))
        })
    }
}

fn value_into_object(value: Value) -> Option<serde_json::Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[async_trait]
impl RouteStore for StaticFileRouteStore {
    async fn router_config(
        &self,
        hub: &str,
        token: &CancellationToken,
    ) -> Result<RouterConfig, RouteStoreError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(RouteStoreError::Cancelled),
            config = self.load(hub) => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StaticFileRouteStore;
    use hub_router::{Condition, Destination, RouteStore, RouteStoreError};
    use std::path::PathBuf;
    use tokio_util::sync::CancellationToken;

    fn fixture() -> StaticFileRouteStore {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("static-configs/routes.json");
        StaticFileRouteStore::new(path)
    }

    #[tokio::test]
    async fn reads_hub_configuration() {
        let config = fixture()
            .router_config("h2", &CancellationToken::new())
            .await
            .expect("h2 is configured");

        assert_eq!(config.routes.len(), 1);
        assert_eq!(
            config.routes[0].endpoints,
            vec![Destination::new("pager"), Destination::new("storage")]
        );
        let fallback = config.fallback.expect("h2 has a fallback route");
        assert_eq!(fallback.condition, Condition::Always);
    }

    #[tokio::test]
    async fn unknown_hub_is_not_found() {
        let result = fixture()
            .router_config("h9", &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(RouteStoreError::NotFound(hub)) if hub == "h9"));
    }

    #[tokio::test]
    async fn malformed_hub_entry_is_invalid() {
        let result = fixture()
            .router_config("broken", &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(RouteStoreError::Invalid(_))));
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let store = StaticFileRouteStore::new("does-not-exist.json");

        let result = store.router_config("h1", &CancellationToken::new()).await;

        assert!(matches!(result, Err(RouteStoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let token = CancellationToken::new();
        token.cancel();

        let result = fixture().router_config("h1", &token).await;

        assert!(matches!(result, Err(RouteStoreError::Cancelled)));
    }
}
