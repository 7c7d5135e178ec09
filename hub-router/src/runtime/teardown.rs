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

//! Best-effort, time-bounded teardown of per-hub resources.

use crate::error::BoxError;
use crate::observability::events;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const COMPONENT: &str = "teardown";

/// A resource holding external state that must be released explicitly.
#[async_trait]
pub trait Closable: Send + Sync {
    /// Releases the resource. Implementations should stop early once `token` fires.
    async fn close(&self, token: &CancellationToken) -> Result<(), BoxError>;
}

/// Closes `resource` under a deadline derived from `parent`.
///
/// Failures and timeouts are logged and reported as `false`; they never propagate.
/// On timeout the close future is dropped and its token cancelled.
pub(crate) async fn close_bounded<C>(
    resource_kind: &'static str,
    hub: &str,
    resource: &C,
    parent: &CancellationToken,
    timeout: Duration,
) -> bool
where
    C: Closable + ?Sized,
{
    let scope = parent.child_token();

    match tokio::time::timeout(timeout, resource.close(&scope)).await {
        Ok(Ok(())) => {
            debug!(
                event = events::CLOSE_RESOURCE_OK,
                component = COMPONENT,
                hub,
                resource = resource_kind,
                "closed resource"
            );
            true
        }
        Ok(Err(err)) => {
            warn!(
                event = events::CLOSE_RESOURCE_FAILED,
                component = COMPONENT,
                hub,
                resource = resource_kind,
                err = %err,
                "error closing resource"
            );
            false
        }
        Err(_elapsed) => {
            scope.cancel();
            warn!(
                event = events::CLOSE_RESOURCE_TIMEOUT,
                component = COMPONENT,
                hub,
                resource = resource_kind,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "abandoned resource close after timeout"
            );
            false
        }
    }
}

/// Closes every resource concurrently; each close is independently bounded.
///
/// Returns how many closes failed or timed out.
pub(crate) async fn close_all_bounded<C>(
    resource_kind: &'static str,
    resources: Vec<(String, Arc<C>)>,
    parent: &CancellationToken,
    timeout: Duration,
) -> usize
where
    C: Closable + ?Sized,
{
    let closes = resources.iter().map(|(hub, resource)| {
        close_bounded(resource_kind, hub, resource.as_ref(), parent, timeout)
    });

    join_all(closes)
        .await
        .into_iter()
        .filter(|closed| !closed)
        .count()
}
