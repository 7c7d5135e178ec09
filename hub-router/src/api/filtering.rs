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

use crate::api::lifecycle::Lifecycle;
use crate::api::routing_service::{EndpointHealth, RoutingService};
use crate::config::HubCacheConfig;
use crate::control_plane::hub_cache::HubCache;
use crate::control_plane::notifier::NotifierFactory;
use crate::error::RoutingError;
use crate::observability::{events, fields};
use crate::routing::evaluator::{Evaluator, RouteCompiler};
use crate::routing::evaluator_builder::EvaluatorBuilder;
use crate::routing::message::Message;
use crate::routing::route_store::RouteStore;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMPONENT: &str = "filtering_service";
const SUBSCRIBER_NAME: &str = "filtering";

/// Drops the messages a hub's routes do not match and forwards the rest, in
/// their original order, to an inner [`RoutingService`].
///
/// Each hub's [`Evaluator`] is built on first use from the [`RouteStore`]
/// and kept current through the hub's notifier.
pub struct FilteringRoutingService {
    inner: Arc<dyn RoutingService>,
    evaluators: Arc<HubCache<dyn Evaluator>>,
    lifecycle: Lifecycle,
}

impl FilteringRoutingService {
    pub fn new(
        inner: Arc<dyn RoutingService>,
        route_store: Arc<dyn RouteStore>,
        compiler: Arc<dyn RouteCompiler>,
        notifier_factory: Arc<dyn NotifierFactory>,
    ) -> Self {
        Self::with_config(
            inner,
            route_store,
            compiler,
            notifier_factory,
            HubCacheConfig::new(SUBSCRIBER_NAME),
        )
    }

    pub fn with_config(
        inner: Arc<dyn RoutingService>,
        route_store: Arc<dyn RouteStore>,
        compiler: Arc<dyn RouteCompiler>,
        notifier_factory: Arc<dyn NotifierFactory>,
        config: HubCacheConfig,
    ) -> Self {
        let lifecycle = Lifecycle::new(COMPONENT);
        let evaluators: Arc<HubCache<dyn Evaluator>> = HubCache::new(
            fields::RESOURCE_EVALUATOR,
            Box::new(EvaluatorBuilder::new(route_store, compiler)),
            notifier_factory,
            config,
            lifecycle.scope().clone(),
        );

        Self {
            inner,
            evaluators,
            lifecycle,
        }
    }

    /// Hubs that currently hold a compiled evaluator.
    pub fn cached_hubs(&self) -> Vec<String> {
        self.evaluators.cached_hubs()
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }
}

async fn teardown(
    evaluators: &HubCache<dyn Evaluator>,
    inner: &dyn RoutingService,
    token: &CancellationToken,
) -> Result<(), RoutingError> {
    let failed = evaluators.close_all(token).await;
    let result = inner.close(token).await;

    info!(
        event = events::SERVICE_CLOSE_OK,
        component = COMPONENT,
        failed,
        inner_ok = result.is_ok(),
        "service closed"
    );
    result
}

#[async_trait]
impl RoutingService for FilteringRoutingService {
    async fn route(&self, hub: &str, messages: Vec<Message>) -> Result<(), RoutingError> {
        self.lifecycle.ensure_open("route", Some(hub))?;
        if messages.is_empty() {
            return Ok(());
        }

        let evaluator = self.evaluators.get_or_create(hub).await?;

        let received = messages.len();
        let matched: Vec<Message> = messages
            .into_iter()
            .filter(|message| !evaluator.evaluate(message).is_empty())
            .collect();

        if matched.is_empty() {
            debug!(
                event = events::ROUTE_FILTERED_EMPTY,
                component = COMPONENT,
                hub,
                msg_count = received,
                "no message matched a route"
            );
            return Ok(());
        }

        debug!(
            event = events::ROUTE_FORWARDED,
            component = COMPONENT,
            hub,
            msg_count = received,
            forwarded = matched.len(),
            msg_ids = %fields::format_message_ids(&matched),
            "forwarding matched messages"
        );
        self.inner.route(hub, matched).await
    }

    async fn endpoint_health(&self, hub: &str) -> Result<Vec<EndpointHealth>, RoutingError> {
        self.lifecycle.ensure_open("endpoint_health", Some(hub))?;
        self.inner.endpoint_health(hub).await
    }

    async fn start(&self) -> Result<(), RoutingError> {
        self.lifecycle.ensure_open("start", None)?;
        info!(
            event = events::SERVICE_START,
            component = COMPONENT,
            "starting inner service"
        );
        self.inner.start().await
    }

    async fn close(&self, token: &CancellationToken) -> Result<(), RoutingError> {
        if !self.lifecycle.begin_close() {
            return Ok(());
        }
        info!(
            event = events::SERVICE_CLOSE_START,
            component = COMPONENT,
            "closing service"
        );
        teardown(&self.evaluators, self.inner.as_ref(), token).await
    }
}

impl Drop for FilteringRoutingService {
    fn drop(&mut self) {
        if !self.lifecycle.begin_close() {
            return;
        }

        let evaluators = self.evaluators.clone();
        let inner = self.inner.clone();
        match Handle::try_current() {
            Ok(handle) => {
                warn!(
                    event = events::SERVICE_DROPPED_OPEN,
                    component = COMPONENT,
                    "service dropped without close, tearing down in background"
                );
                handle.spawn(async move {
                    let _ = teardown(&evaluators, inner.as_ref(), &CancellationToken::new()).await;
                });
            }
            Err(_) => {
                warn!(
                    event = events::SERVICE_DROPPED_OPEN,
                    component = COMPONENT,
                    "service dropped without close outside a runtime, resources not closed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FilteringRoutingService;
    use crate::api::routing_service::{EndpointHealth, RoutingService};
    use crate::control_plane::notifier::{HubChangeListener, Notifier, NotifierFactory};
    use crate::error::{BoxError, RouteStoreError, RoutingError};
    use crate::routing::evaluator::DefaultRouteCompiler;
    use crate::routing::message::{Destination, Message};
    use crate::routing::route_config::{Condition, RouteSpec, RouterConfig};
    use crate::routing::route_store::RouteStore;
    use crate::runtime::teardown::Closable;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct CountingStore {
        fetches: AtomicUsize,
    }

    #[async_trait]
    impl RouteStore for CountingStore {
        async fn router_config(
            &self,
            _hub: &str,
            _token: &CancellationToken,
        ) -> Result<RouterConfig, RouteStoreError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(RouterConfig::new(vec![RouteSpec::new(
                "telemetry",
                Condition::property_equals("type", "telemetry"),
                vec![Destination::new("storage")],
            )]))
        }
    }

    struct SilentNotifier;

    #[async_trait]
    impl Closable for SilentNotifier {
        async fn close(&self, _token: &CancellationToken) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn subscribe(
            &self,
            _subscriber_name: &str,
            _listener: Arc<dyn HubChangeListener>,
            _token: &CancellationToken,
        ) -> Result<(), BoxError> {
            Ok(())
        }
    }

    struct SilentNotifiers;

    impl NotifierFactory for SilentNotifiers {
        fn create(&self, _hub: &str) -> Arc<dyn Notifier> {
            Arc::new(SilentNotifier)
        }
    }

    #[derive(Default)]
    struct CapturingInner {
        routed: Mutex<Vec<(String, Vec<String>)>>,
        closes: AtomicUsize,
    }

    #[async_trait]
    impl RoutingService for Arc<CapturingInner> {
        async fn route(&self, hub: &str, messages: Vec<Message>) -> Result<(), RoutingError> {
            let ids = messages.iter().map(|m| m.id().to_string()).collect();
            self.routed.lock().unwrap().push((hub.to_string(), ids));
            Ok(())
        }

        async fn endpoint_health(&self, _hub: &str) -> Result<Vec<EndpointHealth>, RoutingError> {
            Ok(Vec::new())
        }

        async fn start(&self) -> Result<(), RoutingError> {
            Ok(())
        }

        async fn close(&self, _token: &CancellationToken) -> Result<(), RoutingError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service() -> (FilteringRoutingService, Arc<CountingStore>, Arc<CapturingInner>) {
        let store = Arc::new(CountingStore::default());
        let inner = Arc::new(CapturingInner::default());
        let service = FilteringRoutingService::new(
            Arc::new(inner.clone()),
            store.clone(),
            Arc::new(DefaultRouteCompiler),
            Arc::new(SilentNotifiers),
        );
        (service, store, inner)
    }

    fn telemetry(id: &str) -> Message {
        Message::with_id(id, Vec::new()).with_property("type", "telemetry")
    }

    #[tokio::test]
    async fn empty_batch_does_not_resolve_hub() {
        let (service, store, inner) = service();

        service.route("h1", Vec::new()).await.expect("empty batch");

        assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
        assert!(service.cached_hubs().is_empty());
        assert!(inner.routed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unmatched_batch_is_not_forwarded() {
        let (service, _store, inner) = service();
        let log = Message::with_id("m-1", Vec::new()).with_property("type", "log");

        service.route("h1", vec![log]).await.expect("route succeeds");

        assert!(inner.routed.lock().unwrap().is_empty());
        assert_eq!(service.cached_hubs(), vec!["h1".to_string()]);
    }

    #[tokio::test]
    async fn route_one_forwards_a_matching_message() {
        let (service, _store, inner) = service();

        service
            .route_one("h1", telemetry("m-1"))
            .await
            .expect("route succeeds");

        assert_eq!(
            *inner.routed.lock().unwrap(),
            vec![("h1".to_string(), vec!["m-1".to_string()])]
        );
    }

    #[tokio::test]
    async fn closed_service_rejects_without_touching_cache() {
        let (service, store, inner) = service();

        service
            .close(&CancellationToken::new())
            .await
            .expect("close succeeds");

        assert!(matches!(
            service.route("h1", vec![telemetry("m-1")]).await,
            Err(RoutingError::Closed)
        ));
        assert!(matches!(service.start().await, Err(RoutingError::Closed)));
        assert!(matches!(
            service.endpoint_health("h1").await,
            Err(RoutingError::Closed)
        ));
        assert_eq!(store.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(inner.closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dropping_an_open_service_closes_inner_in_background() {
        let (service, _store, inner) = service();
        service
            .route("h1", vec![telemetry("m-1")])
            .await
            .expect("route succeeds");

        drop(service);

        for _ in 0..50 {
            if inner.closes.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(inner.closes.load(Ordering::SeqCst), 1);
    }
}
