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
use crate::observability::events;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Open/closed state and cancellation scope of a routing service.
pub(crate) struct Lifecycle {
    component: &'static str,
    closed: AtomicBool,
    scope: CancellationToken,
}

impl Lifecycle {
    pub(crate) fn new(component: &'static str) -> Self {
        Self {
            component,
            closed: AtomicBool::new(false),
            scope: CancellationToken::new(),
        }
    }

    pub(crate) fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_open(
        &self,
        operation: &'static str,
        hub: Option<&str>,
    ) -> Result<(), RoutingError> {
        if !self.is_closed() {
            return Ok(());
        }
        debug!(
            event = events::ROUTE_REJECTED_CLOSED,
            component = self.component,
            operation,
            hub,
            "rejected call on closed service"
        );
        Err(RoutingError::Closed)
    }

    /// Flips the service to closed and cancels its scope.
    ///
    /// Returns `true` for exactly one caller.
    pub(crate) fn begin_close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!(
                event = events::SERVICE_CLOSE_SKIPPED,
                component = self.component,
                "service already closed"
            );
            return false;
        }
        self.scope.cancel();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::Lifecycle;
    use crate::error::RoutingError;

    #[test]
    fn begin_close_wins_once_and_cancels_scope() {
        let lifecycle = Lifecycle::new("test_service");
        assert!(lifecycle.ensure_open("route", Some("h1")).is_ok());

        assert!(lifecycle.begin_close());
        assert!(!lifecycle.begin_close());

        assert!(lifecycle.is_closed());
        assert!(lifecycle.scope().is_cancelled());
        assert!(matches!(
            lifecycle.ensure_open("route", Some("h1")),
            Err(RoutingError::Closed)
        ));
    }
}
