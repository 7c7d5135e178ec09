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
use crate::error::RoutingError;
use crate::routing::evaluator::{Evaluator, RouteCompiler};
use crate::routing::route_store::RouteStore;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Fetches a hub's router configuration and compiles it.
pub(crate) struct EvaluatorBuilder {
    route_store: Arc<dyn RouteStore>,
    compiler: Arc<dyn RouteCompiler>,
}

impl EvaluatorBuilder {
    pub(crate) fn new(route_store: Arc<dyn RouteStore>, compiler: Arc<dyn RouteCompiler>) -> Self {
        Self {
            route_store,
            compiler,
        }
    }
}

#[async_trait]
impl ArtifactBuilder<dyn Evaluator> for EvaluatorBuilder {
    async fn build(
        &self,
        hub: &str,
        token: &CancellationToken,
    ) -> Result<Arc<dyn Evaluator>, RoutingError> {
        let config = self
            .route_store
            .router_config(hub, token)
            .await
            .map_err(|source| RoutingError::RouteStore {
                hub: hub.to_string(),
                source,
            })?;

        self.compiler
            .compile(hub, config)
            .map_err(|source| RoutingError::Compile {
                hub: hub.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::EvaluatorBuilder;
    use crate::control_plane::hub_cache::ArtifactBuilder;
    use crate::error::{RouteStoreError, RoutingError};
    use crate::routing::evaluator::DefaultRouteCompiler;
    use crate::routing::message::{Destination, Message};
    use crate::routing::route_config::{Condition, RouteSpec, RouterConfig};
    use crate::routing::route_store::RouteStore;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct SingleHubStore;

    #[async_trait]
    impl RouteStore for SingleHubStore {
        async fn router_config(
            &self,
            hub: &str,
            _token: &CancellationToken,
        ) -> Result<RouterConfig, RouteStoreError> {
            match hub {
                "h1" => Ok(RouterConfig::new(vec![RouteSpec::new(
                    "telemetry",
                    Condition::property_equals("type", "telemetry"),
                    vec![Destination::new("storage")],
                )])),
                "broken" => Ok(RouterConfig::new(vec![RouteSpec::new(
                    "empty",
                    Condition::Always,
                    Vec::new(),
                )])),
                other => Err(RouteStoreError::NotFound(other.to_string())),
            }
        }
    }

    fn builder() -> EvaluatorBuilder {
        EvaluatorBuilder::new(Arc::new(SingleHubStore), Arc::new(DefaultRouteCompiler))
    }

    #[tokio::test]
    async fn builds_evaluator_from_stored_config() {
        let evaluator = builder()
            .build("h1", &CancellationToken::new())
            .await
            .expect("evaluator builds");

        let message = Message::with_id("m-1", Vec::new()).with_property("type", "telemetry");
        assert!(evaluator
            .evaluate(&message)
            .contains(&Destination::new("storage")));
    }

    #[tokio::test]
    async fn store_and_compile_failures_are_classified() {
        let token = CancellationToken::new();

        let missing = builder().build("h9", &token).await;
        let broken = builder().build("broken", &token).await;

        assert!(matches!(missing, Err(RoutingError::RouteStore { .. })));
        assert!(matches!(broken, Err(RoutingError::Compile { .. })));
    }
}
