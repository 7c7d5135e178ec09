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

use crate::error::RouteStoreError;
use crate::routing::route_config::RouterConfig;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Source of per-hub router configuration.
///
/// Implementations should return [`RouteStoreError::Cancelled`] promptly once
/// `token` fires instead of waiting for slow I/O to finish.
#[async_trait]
pub trait RouteStore: Send + Sync {
    async fn router_config(
        &self,
        hub: &str,
        token: &CancellationToken,
    ) -> Result<RouterConfig, RouteStoreError>;
}
