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

//! Error types surfaced by the routing services and their collaborators.
//!
//! - [`RoutingError`] is what callers of [`crate::RoutingService`] observe.
//! - [`RouteStoreError`] is raised by [`crate::RouteStore`] implementations.
//! - [`BoxError`] carries errors produced by external collaborators (sinks,
//!   notifiers, compilers) without rewrapping them, so callers can downcast to
//!   the original type.

use thiserror::Error;

/// Type-erased error raised by an external collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while fetching a hub's routing configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RouteStoreError {
    /// The store holds no configuration for the hub.
    #[error("no router configuration for hub {0:?}")]
    NotFound(String),

    /// The backing store could not be reached or read.
    #[error("route store unavailable: {0}")]
    Unavailable(String),

    /// The stored configuration could not be decoded.
    #[error("invalid router configuration: {0}")]
    Invalid(String),

    /// The fetch was abandoned because its cancellation token fired.
    #[error("route store request cancelled")]
    Cancelled,
}

/// Errors observed by callers of a routing service.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RoutingError {
    /// The service has been closed; no new work is accepted.
    #[error("routing service is closed")]
    Closed,

    /// The operation was abandoned because the service scope was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Fetching the hub's routing configuration failed.
    #[error("failed to fetch router configuration for hub {hub:?}: {source}")]
    RouteStore {
        hub: String,
        #[source]
        source: RouteStoreError,
    },

    /// Compiling the hub's routes into an evaluator failed.
    #[error("failed to compile routes for hub {hub:?}: {source}")]
    Compile {
        hub: String,
        #[source]
        source: BoxError,
    },

    /// The sink factory could not create the hub's sink.
    #[error("failed to create sink for hub {hub:?}: {source}")]
    SinkCreate {
        hub: String,
        #[source]
        source: BoxError,
    },

    /// Subscribing the hub's change notifier failed.
    #[error("failed to subscribe notifier for hub {hub:?}: {source}")]
    Subscribe {
        hub: String,
        #[source]
        source: BoxError,
    },

    /// The sink reported a send failure; `source` is the sink's original error.
    #[error("delivery of message {message_id} for hub {hub:?} failed: {source}")]
    Delivery {
        hub: String,
        message_id: String,
        #[source]
        source: BoxError,
    },

    /// The wrapped inner routing service failed.
    #[error("inner routing service failed: {0}")]
    Inner(#[source] BoxError),

    /// A cache write lost a compare-and-swap it must win while holding the hub lock.
    #[error("cache invariant violated: {0}")]
    InvariantViolated(&'static str),
}

impl RoutingError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RoutingError::Closed => "routing_closed",
            RoutingError::Cancelled => "routing_cancelled",
            RoutingError::RouteStore { .. } => "route_store_failed",
            RoutingError::Compile { .. } => "compile_failed",
            RoutingError::SinkCreate { .. } => "sink_create_failed",
            RoutingError::Subscribe { .. } => "subscribe_failed",
            RoutingError::Delivery { .. } => "delivery_failed",
            RoutingError::Inner(_) => "inner_failed",
            RoutingError::InvariantViolated(_) => "invariant_violated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BoxError, RouteStoreError, RoutingError};
    use std::error::Error;
    use std::fmt;

    #[derive(Debug)]
    struct QueueFull;

    impl fmt::Display for QueueFull {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "queue full")
        }
    }

    impl Error for QueueFull {}

    #[test]
    fn delivery_error_keeps_original_source() {
        let source: BoxError = Box::new(QueueFull);
        let err = RoutingError::Delivery {
            hub: "h2".to_string(),
            message_id: "m-2".to_string(),
            source,
        };

        assert_eq!(err.as_label(), "delivery_failed");
        assert!(err.to_string().contains("queue full"));
        let source = err.source().expect("delivery error has a source");
        assert!(source.downcast_ref::<QueueFull>().is_some());
    }

    #[test]
    fn route_store_error_is_chained() {
        let err = RoutingError::RouteStore {
            hub: "h1".to_string(),
            source: RouteStoreError::NotFound("h1".to_string()),
        };

        assert!(err.to_string().contains("h1"));
        assert!(err
            .source()
            .and_then(|s| s.downcast_ref::<RouteStoreError>())
            .is_some());
    }

    #[test]
    fn closed_error_display_is_stable() {
        assert_eq!(RoutingError::Closed.to_string(), "routing service is closed");
        assert!(RoutingError::Closed.source().is_none());
    }
}
