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

//! # hub-router
//!
//! `hub-router` is the multi-tenant dispatch layer of an IoT gateway. Every hub
//! (tenant) has its own routing rules and its own delivery sink; both are built
//! lazily on first use, cached behind a lock-free read path, kept current by a
//! per-hub change feed and torn down with bounded latency when the hub is
//! deleted or the service shuts down.
//!
//! Two services implement [`RoutingService`]:
//!
//! - [`FilteringRoutingService`] evaluates each message against its hub's
//!   compiled routes and forwards only the matching ones to an inner service.
//! - [`FrontendRoutingService`] hands each batch to its hub's [`Sink`].
//!
//! ## Filtering in front of a terminal service
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use hub_router::{
//!     BoxError, Closable, Condition, DefaultRouteCompiler, Destination, FilteringRoutingService,
//!     FrontendRoutingService, HubChangeListener, Message, Notifier, NotifierFactory,
//!     RouteSpec, RouteStore, RouteStoreError, RouterConfig, RoutingService, Sink,
//!     SinkFactory, SinkResult,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! struct OneRoute;
//!
//! #[async_trait]
//! impl RouteStore for OneRoute {
//!     async fn router_config(
//!         &self,
//!         _hub: &str,
//!         _token: &CancellationToken,
//!     ) -> Result<RouterConfig, RouteStoreError> {
//!         Ok(RouterConfig::new(vec![RouteSpec::new(
//!             "telemetry",
//!             Condition::property_equals("type", "telemetry"),
//!             vec![Destination::new("storage")],
//!         )]))
//!     }
//! }
//!
//! struct NoFeed;
//!
//! #[async_trait]
//! impl Closable for NoFeed {
//!     async fn close(&self, _token: &CancellationToken) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! #[async_trait]
//! impl Notifier for NoFeed {
//!     async fn subscribe(
//!         &self,
//!         _subscriber_name: &str,
//!         _listener: Arc<dyn HubChangeListener>,
//!         _token: &CancellationToken,
//!     ) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! impl NotifierFactory for NoFeed {
//!     fn create(&self, _hub: &str) -> Arc<dyn Notifier> {
//!         Arc::new(NoFeed)
//!     }
//! }
//!
//! struct AcceptAll;
//!
//! #[async_trait]
//! impl Closable for AcceptAll {
//!     async fn close(&self, _token: &CancellationToken) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! #[async_trait]
//! impl Sink for AcceptAll {
//!     async fn process(&self, messages: Vec<Message>, _token: &CancellationToken) -> SinkResult {
//!         SinkResult { succeeded: messages, failures: Vec::new() }
//!     }
//! }
//!
//! #[async_trait]
//! impl SinkFactory for AcceptAll {
//!     async fn create(&self, _hub: &str) -> Result<Arc<dyn Sink>, BoxError> {
//!         Ok(Arc::new(AcceptAll))
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let frontend: Arc<dyn RoutingService> =
//!     Arc::new(FrontendRoutingService::new(Arc::new(AcceptAll), Arc::new(NoFeed)));
//! let filtering = FilteringRoutingService::new(
//!     frontend,
//!     Arc::new(OneRoute),
//!     Arc::new(DefaultRouteCompiler),
//!     Arc::new(NoFeed),
//! );
//!
//! let batch = vec![
//!     Message::new(b"21.5".to_vec()).with_property("type", "telemetry"),
//!     Message::new(b"boot".to_vec()).with_property("type", "log"),
//! ];
//! filtering.route("h1", batch).await.unwrap();
//! assert_eq!(filtering.cached_hubs(), vec!["h1".to_string()]);
//!
//! filtering.close(&CancellationToken::new()).await.unwrap();
//! assert!(filtering.route("h1", Vec::new()).await.is_err());
//! # });
//! ```
//!
//! ## Internal architecture map
//!
//! - API facade: the routing-service contract, both services and their open/closed lifecycle
//! - Control plane: snapshot cell, hub lock, notifier contract and the shared per-hub cache
//! - Routing: message model, router configuration, route store and evaluator compilation
//! - Data plane: sink contract and per-hub sink construction
//! - Runtime: bounded, fault-isolated teardown of per-hub resources
//!
//! ## Observability model
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not initialize a global subscriber.
//! Binaries and tests are responsible for one-time `tracing_subscriber`
//! initialization at process boundaries.

mod api;
pub use api::filtering::FilteringRoutingService;
pub use api::frontend::FrontendRoutingService;
pub use api::routing_service::{EndpointHealth, HealthStatus, RoutingService};

mod config;
pub use config::HubCacheConfig;

mod control_plane;
pub use control_plane::notifier::{HubChangeListener, Notifier, NotifierFactory};

mod data_plane;
pub use data_plane::sink::{SendFailure, Sink, SinkFactory, SinkResult};

mod error;
pub use error::{BoxError, RouteStoreError, RoutingError};

#[doc(hidden)]
pub mod observability;

mod routing;
pub use routing::evaluator::{CompiledEvaluator, DefaultRouteCompiler, Evaluator, RouteCompiler};
pub use routing::message::{Destination, Message};
pub use routing::route_config::{Condition, RouteSpec, RouterConfig};
pub use routing::route_store::RouteStore;

mod runtime;
pub use runtime::teardown::Closable;
