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

//! In-process collaborators for exercising `hub-router` services end to end.

mod change_feed;
pub use change_feed::{BroadcastNotifierFactory, ChangeFeed, FeedNotifier, HubChange};

mod memory_route_store;
pub use memory_route_store::MemoryRouteStore;

mod recording_service;
pub use recording_service::RecordingRoutingService;

mod recording_sink;
pub use recording_sink::{InjectedFailure, RecordingSink, RecordingSinkFactory};

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Installs a `tracing_subscriber` fmt subscriber once per process.
///
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
