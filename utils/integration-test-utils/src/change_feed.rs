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

use async_trait::async_trait;
use hub_router::{BoxError, Closable, HubChangeListener, Notifier, NotifierFactory};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const FEED_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HubChange {
    Updated(String),
    Removed(String),
}

impl HubChange {
    fn hub(&self) -> &str {
        match self {
            HubChange::Updated(hub) | HubChange::Removed(hub) => hub,
        }
    }
}

/// In-process change feed shared by every hub.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<HubChange>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, change: HubChange) {
        // No receivers simply means no hub is subscribed yet.
        let _ = self.sender.send(change);
    }

    pub fn publish_update(&self, hub: &str) {
        self.publish(HubChange::Updated(hub.to_string()));
    }

    pub fn publish_remove(&self, hub: &str) {
        self.publish(HubChange::Removed(hub.to_string()));
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct FactoryState {
    fail_subscribe: HashSet<String>,
    fail_close: HashSet<String>,
    created: Vec<Arc<FeedNotifier>>,
}

/// Creates [`FeedNotifier`]s attached to one [`ChangeFeed`] and remembers them
/// so tests can inspect subscriptions and closes.
#[derive(Clone)]
pub struct BroadcastNotifierFactory {
    feed: ChangeFeed,
    state: Arc<Mutex<FactoryState>>,
}

impl BroadcastNotifierFactory {
    pub fn new(feed: ChangeFeed) -> Self {
        Self {
            feed,
            state: Arc::new(Mutex::new(FactoryState::default())),
        }
    }

    /// Notifiers created for `hub` from now on reject `subscribe`.
    pub fn fail_subscribe_for(&self, hub: &str) {
        self.state.lock().unwrap().fail_subscribe.insert(hub.to_string());
    }

    pub fn clear_subscribe_failures(&self) {
        self.state.lock().unwrap().fail_subscribe.clear();
    }

    /// Notifiers created for `hub` from now on fail `close`.
    pub fn fail_close_for(&self, hub: &str) {
        self.state.lock().unwrap().fail_close.insert(hub.to_string());
    }

    pub fn created(&self) -> Vec<Arc<FeedNotifier>> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn created_for(&self, hub: &str) -> Vec<Arc<FeedNotifier>> {
        self.created()
            .into_iter()
            .filter(|notifier| notifier.hub() == hub)
            .collect()
    }

    /// Close count per hub, summed over every notifier created for it.
    pub fn closes_by_hub(&self) -> HashMap<String, usize> {
        let mut closes = HashMap::new();
        for notifier in self.created() {
            *closes.entry(notifier.hub().to_string()).or_insert(0) += notifier.closes();
        }
        closes
    }
}

impl NotifierFactory for BroadcastNotifierFactory {
    fn create(&self, hub: &str) -> Arc<dyn Notifier> {
        let mut state = self.state.lock().unwrap();
        let notifier = Arc::new(FeedNotifier {
            hub: hub.to_string(),
            feed: self.feed.clone(),
            fail_subscribe: state.fail_subscribe.contains(hub),
            fail_close: state.fail_close.contains(hub),
            subscriptions: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            stop: CancellationToken::new(),
        });
        state.created.push(notifier.clone());
        notifier
    }
}

/// Forwards the feed's changes for one hub to the subscribed listener.
pub struct FeedNotifier {
    hub: String,
    feed: ChangeFeed,
    fail_subscribe: bool,
    fail_close: bool,
    subscriptions: AtomicUsize,
    closes: AtomicUsize,
    stop: CancellationToken,
}

impl FeedNotifier {
    pub fn hub(&self) -> &str {
        &self.hub
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

async fn dispatch(
    hub: String,
    mut receiver: broadcast::Receiver<HubChange>,
    listener: Arc<dyn HubChangeListener>,
    stop: CancellationToken,
) {
    loop {
        let change = tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            received = receiver.recv() => received,
        };

        match change {
            Ok(change) if change.hub() != hub => {}
            Ok(HubChange::Updated(hub)) => listener.on_update(&hub).await,
            Ok(HubChange::Removed(hub)) => listener.on_remove(&hub).await,
            Err(RecvError::Lagged(skipped)) => {
                warn!(hub = %hub, skipped, "change feed lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
    debug!(hub = %hub, "change feed dispatch stopped");
}

#[async_trait]
impl Closable for FeedNotifier {
    async fn close(&self, _token: &CancellationToken) -> Result<(), BoxError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.stop.cancel();
        if self.fail_close {
            return Err(format!("change feed for {} unreachable", self.hub).into());
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for FeedNotifier {
    async fn subscribe(
        &self,
        subscriber_name: &str,
        listener: Arc<dyn HubChangeListener>,
        _token: &CancellationToken,
    ) -> Result<(), BoxError> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribe {
            return Err(format!("subscription of {subscriber_name} to {} rejected", self.hub).into());
        }

        let receiver = self.feed.sender.subscribe();
        tokio::spawn(dispatch(
            self.hub.clone(),
            receiver,
            listener,
            self.stop.clone(),
        ));
        debug!(hub = %self.hub, subscriber_name, "subscribed to change feed");
        Ok(())
    }
}
