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

#![allow(dead_code)]

use hub_router::{
    Condition, DefaultRouteCompiler, Destination, FilteringRoutingService, FrontendRoutingService,
    HubCacheConfig, Message, RouteSpec, RouterConfig,
};
use integration_test_utils::{
    init_logging, BroadcastNotifierFactory, ChangeFeed, MemoryRouteStore, RecordingRoutingService,
    RecordingSinkFactory,
};
use std::sync::Arc;
use std::time::Duration;

pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

pub fn telemetry_config() -> RouterConfig {
    RouterConfig::new(vec![RouteSpec::new(
        "telemetry-to-storage",
        Condition::property_equals("type", "telemetry"),
        vec![Destination::new("storage")],
    )])
}

pub fn alert_config() -> RouterConfig {
    RouterConfig::new(vec![RouteSpec::new(
        "alerts-to-pager",
        Condition::property_equals("type", "alert"),
        vec![Destination::new("pager")],
    )])
}

pub fn message(id: &str, kind: &str) -> Message {
    Message::with_id(id, format!("{id}-body").into_bytes()).with_property("type", kind)
}

pub struct FilteringHarness {
    pub feed: ChangeFeed,
    pub store: Arc<MemoryRouteStore>,
    pub notifiers: BroadcastNotifierFactory,
    pub inner: Arc<RecordingRoutingService>,
    pub service: FilteringRoutingService,
}

pub fn filtering_harness() -> FilteringHarness {
    init_logging();
    let feed = ChangeFeed::new();
    let store = Arc::new(MemoryRouteStore::new(feed.clone()));
    let notifiers = BroadcastNotifierFactory::new(feed.clone());
    let inner = Arc::new(RecordingRoutingService::new());
    let service = FilteringRoutingService::with_config(
        inner.clone(),
        store.clone(),
        Arc::new(DefaultRouteCompiler),
        Arc::new(notifiers.clone()),
        HubCacheConfig::new("filtering-tests").with_close_timeout(CLOSE_TIMEOUT),
    );
    FilteringHarness {
        feed,
        store,
        notifiers,
        inner,
        service,
    }
}

pub struct FrontendHarness {
    pub feed: ChangeFeed,
    pub notifiers: BroadcastNotifierFactory,
    pub sinks: RecordingSinkFactory,
    pub service: FrontendRoutingService,
}

pub fn frontend_harness() -> FrontendHarness {
    init_logging();
    let feed = ChangeFeed::new();
    let notifiers = BroadcastNotifierFactory::new(feed.clone());
    let sinks = RecordingSinkFactory::new();
    let service = FrontendRoutingService::with_config(
        Arc::new(sinks.clone()),
        Arc::new(notifiers.clone()),
        HubCacheConfig::new("frontend-tests").with_close_timeout(CLOSE_TIMEOUT),
    );
    FrontendHarness {
        feed,
        notifiers,
        sinks,
        service,
    }
}

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
