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
use crate::data_plane::sink::{Sink, SinkBuilder, SinkFactory};
use crate::error::RoutingError;
use crate::observability::{events, fields};
use crate::routing::message::Message;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const COMPONENT: &str = "frontend_service";
const SUBSCRIBER_NAME: &str = "frontend";

/// Terminal routing service delivering each hub's messages to that hub's [`Sink`].
///
/// A batch succeeds only if the sink delivered every message. Otherwise the
/// caller gets the sink's error for the first failed message as
/// [`RoutingError::Delivery`], even if other messages of the batch were sent.
pub struct FrontendRoutingService {
    sink_factory: Arc<dyn SinkFactory>,
    sinks: Arc<HubCache<dyn Sink>>,
    lifecycle: Lifecycle,
}

impl FrontendRoutingService {
    pub fn new(
        sink_factory: Arc<dyn SinkFactory>,
        notifier_factory: Arc<dyn NotifierFactory>,
    ) -> Self {
        Self::with_config(
            sink_factory,
            notifier_factory,
            HubCacheConfig::new(SUBSCRIBER_NAME),
        )
    }

    pub fn with_config(
        sink_factory: Arc<dyn SinkFactory>,
        notifier_factory: Arc<dyn NotifierFactory>,
        config: HubCacheConfig,
    ) -> Self {
        let lifecycle = Lifecycle::new(COMPONENT);
        let sinks: Arc<HubCache<dyn Sink>> = HubCache::new(
            fields::RESOURCE_SINK,
            Box::new(SinkBuilder::new(sink_factory.clone())),
            notifier_factory,
            config,
            lifecycle.scope().clone(),
        );

        Self {
            sink_factory,
            sinks,
            lifecycle,
        }
    }

    /// Hubs that currently hold a sink.
    pub fn cached_hubs(&self) -> Vec<String> {
        self.sinks.cached_hubs()
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }
}

async fn teardown(
    sinks: &HubCache<dyn Sink>,
    sink_factory: &dyn SinkFactory,
    token: &CancellationToken,
) -> Result<(), RoutingError> {
    let failed = sinks.close_all(token).await;
    let result = sink_factory.close(token).await.map_err(RoutingError::Inner);

    info!(
        event = events::SERVICE_CLOSE_OK,
        component = COMPONENT,
        failed,
        factory_ok = result.is_ok(),
        "service closed"
    );
    result
}

#[async_trait]
impl RoutingService for FrontendRoutingService {
    async fn route(&self, hub: &str, messages: Vec<Message>) -> Result<(), RoutingError> {
        self.lifecycle.ensure_open("route", Some(hub))?;
        if messages.is_empty() {
            return Ok(());
        }

        let sink = self.sinks.get_or_create(hub).await?;

        let submitted = messages.len();
        let result = sink.process(messages, self.lifecycle.scope()).await;
        let sent = result.succeeded.len();
        let failed = result.failures.len();

        let Some(first) = result.failures.into_iter().next() else {
            debug!(
                event = events::SINK_DELIVERY_OK,
                component = COMPONENT,
                hub,
                msg_count = submitted,
                "batch delivered"
            );
            return Ok(());
        };

        warn!(
            event = events::SINK_DELIVERY_FAILED,
            component = COMPONENT,
            hub,
            msg_count = submitted,
            sent,
            failed,
            msg_id = first.message.id(),
            err = %first.error,
            "sink reported failed messages"
        );
        Err(RoutingError::Delivery {
            hub: hub.to_string(),
            message_id: first.message.id().to_string(),
            source: first.error,
        })
    }

    async fn endpoint_health(&self, hub: &str) -> Result<Vec<EndpointHealth>, RoutingError> {
        self.lifecycle.ensure_open("endpoint_health", Some(hub))?;
        Ok(Vec::new())
    }

    async fn start(&self) -> Result<(), RoutingError> {
        self.lifecycle.ensure_open("start", None)?;
        info!(
            event = events::SERVICE_START,
            component = COMPONENT,
            "service started"
        );
        Ok(())
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
        teardown(&self.sinks, self.sink_factory.as_ref(), token).await
    }
}

impl Drop for FrontendRoutingService {
    fn drop(&mut self) {
        if !self.lifecycle.begin_close() {
            return;
        }

        let sinks = self.sinks.clone();
        let sink_factory = self.sink_factory.clone();
        match Handle::try_current() {
            Ok(handle) => {
                warn!(
                    event = events::SERVICE_DROPPED_OPEN,
                    component = COMPONENT,
                    "service dropped without close, tearing down in background"
                );
                handle.spawn(async move {
                    let _ = teardown(&sinks, sink_factory.as_ref(), &CancellationToken::new()).await;
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
    use super::FrontendRoutingService;
    use crate::api::routing_service::RoutingService;
    use crate::control_plane::notifier::{HubChangeListener, Notifier, NotifierFactory};
    use crate::data_plane::sink::{SendFailure, Sink, SinkFactory, SinkResult};
    use crate::error::{BoxError, RoutingError};
    use crate::routing::message::Message;
    use crate::runtime::teardown::Closable;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

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

    /// Fails every message whose body is `fail`.
    struct BodyCheckingSink;

    #[async_trait]
    impl Closable for BodyCheckingSink {
        async fn close(&self, _token: &CancellationToken) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[async_trait]
    impl Sink for BodyCheckingSink {
        async fn process(&self, messages: Vec<Message>, _token: &CancellationToken) -> SinkResult {
            let mut result = SinkResult::default();
            for message in messages {
                if message.body() == b"fail" {
                    let error = format!("rejected {}", message.id()).into();
                    result.failures.push(SendFailure { message, error });
                } else {
                    result.succeeded.push(message);
                }
            }
            result
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        creates: AtomicUsize,
        closes: AtomicUsize,
    }

    #[async_trait]
    impl SinkFactory for Arc<CountingFactory> {
        async fn create(&self, _hub: &str) -> Result<Arc<dyn Sink>, BoxError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(BodyCheckingSink))
        }

        async fn close(&self, _token: &CancellationToken) -> Result<(), BoxError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn service() -> (FrontendRoutingService, Arc<CountingFactory>) {
        let factory = Arc::new(CountingFactory::default());
        let service =
            FrontendRoutingService::new(Arc::new(factory.clone()), Arc::new(SilentNotifiers));
        (service, factory)
    }

    #[tokio::test]
    async fn first_failure_is_surfaced() {
        let (service, _factory) = service();
        let batch = vec![
            Message::with_id("m-1", b"ok".to_vec()),
            Message::with_id("m-2", b"fail".to_vec()),
            Message::with_id("m-3", b"fail".to_vec()),
        ];

        let err = service
            .route("h2", batch)
            .await
            .expect_err("batch has failures");

        match err {
            RoutingError::Delivery {
                message_id, source, ..
            } => {
                assert_eq!(message_id, "m-2");
                assert_eq!(source.to_string(), "rejected m-2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn sink_is_created_once_per_hub() {
        let (service, factory) = service();

        for id in ["m-1", "m-2", "m-3"] {
            service
                .route_one("h2", Message::with_id(id, b"ok".to_vec()))
                .await
                .expect("delivered");
        }

        assert_eq!(factory.creates.load(Ordering::SeqCst), 1);
        assert_eq!(service.cached_hubs(), vec!["h2".to_string()]);
    }

    #[tokio::test]
    async fn health_is_empty_until_closed() {
        let (service, factory) = service();

        assert!(service
            .endpoint_health("h2")
            .await
            .expect("open service reports health")
            .is_empty());
        service.start().await.expect("start is a no-op");

        service
            .close(&CancellationToken::new())
            .await
            .expect("close succeeds");
        service
            .close(&CancellationToken::new())
            .await
            .expect("second close is a no-op");

        assert_eq!(factory.closes.load(Ordering::SeqCst), 1);
        assert!(matches!(
            service.endpoint_health("h2").await,
            Err(RoutingError::Closed)
        ));
        assert!(matches!(service.start().await, Err(RoutingError::Closed)));
    }
}
