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

//! Per-hub artifact cache shared by the filtering and frontend services.
//!
//! Reads go straight to the snapshot and never wait. Construction, updates,
//! removals and shutdown all run under the [`HubLock`] and publish their result
//! with a compare-and-swap; evicted resources are closed only after the swap is
//! visible and after the lock has been released.

use crate::config::HubCacheConfig;
use crate::control_plane::hub_lock::HubLock;
use crate::control_plane::notifier::{HubChangeListener, Notifier, NotifierFactory};
use crate::control_plane::snapshot_cell::{
    with_entry, without_entry, HubMap, Snapshot, SnapshotCell,
};
use crate::error::RoutingError;
use crate::observability::{events, fields};
use crate::runtime::teardown::{close_all_bounded, close_bounded, Closable};
use async_trait::async_trait;
use std::sync::{Arc, Weak};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const COMPONENT: &str = "hub_cache";
const CAS_LOST: &str = "cache swap lost while holding the hub lock";

/// Builds the artifact cached for one hub (an evaluator or a sink).
#[async_trait]
pub(crate) trait ArtifactBuilder<A: ?Sized>: Send + Sync {
    async fn build(&self, hub: &str, token: &CancellationToken) -> Result<Arc<A>, RoutingError>;
}

pub(crate) struct HubCache<A: ?Sized + Closable + 'static> {
    resource_kind: &'static str,
    config: HubCacheConfig,
    artifacts: SnapshotCell<A>,
    notifiers: SnapshotCell<dyn Notifier>,
    lock: HubLock,
    builder: Box<dyn ArtifactBuilder<A>>,
    notifier_factory: Arc<dyn NotifierFactory>,
    scope: CancellationToken,
    this: Weak<Self>,
}

impl<A: ?Sized + Closable + 'static> HubCache<A> {
    /// `scope` is the owning service's cancellation scope; every lock wait and
    /// build observes it.
    pub(crate) fn new(
        resource_kind: &'static str,
        builder: Box<dyn ArtifactBuilder<A>>,
        notifier_factory: Arc<dyn NotifierFactory>,
        config: HubCacheConfig,
        scope: CancellationToken,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            resource_kind,
            config,
            artifacts: SnapshotCell::new(),
            notifiers: SnapshotCell::new(),
            lock: HubLock::new(),
            builder,
            notifier_factory,
            scope,
            this: this.clone(),
        })
    }

    pub(crate) fn cached_hubs(&self) -> Vec<String> {
        self.artifacts.hubs()
    }

    /// Returns the hub's artifact, building it and subscribing the hub's
    /// notifier on first use.
    ///
    /// Failures are not cached; the next call starts over.
    pub(crate) async fn get_or_create(&self, hub: &str) -> Result<Arc<A>, RoutingError> {
        if let Some(artifact) = self.artifacts.get(hub) {
            return Ok(artifact);
        }

        debug!(
            event = events::HUB_CACHE_MISS,
            component = COMPONENT,
            hub,
            resource = self.resource_kind,
            "artifact not cached"
        );

        let guard = self.lock.acquire(&self.scope).await?;

        let snapshot = self.artifacts.load();
        if let Some(artifact) = snapshot.get(hub) {
            debug!(
                event = events::HUB_CACHE_HIT_AFTER_LOCK,
                component = COMPONENT,
                hub,
                resource = self.resource_kind,
                "artifact installed by a concurrent caller"
            );
            return Ok(artifact.clone());
        }

        let artifact = self.build_artifact(hub).await?;
        swap_locked(
            &self.artifacts,
            &snapshot,
            with_entry(&snapshot, hub, artifact.clone()),
            hub,
        )?;

        if let Err((err, notifier)) = self.ensure_notifier(hub).await {
            let current = self.artifacts.load();
            let removed = swap_locked(&self.artifacts, &current, without_entry(&current, hub), hub);
            drop(guard);

            warn!(
                event = events::ARTIFACT_ROLLBACK,
                component = COMPONENT,
                hub,
                resource = self.resource_kind,
                reason = fields::REASON_SUBSCRIBE_FAILED,
                err = %err,
                "removed artifact after notifier subscription failed"
            );

            let timeout = self.config.close_timeout();
            let close_artifact = async {
                if removed.is_ok() {
                    close_bounded(self.resource_kind, hub, artifact.as_ref(), &self.scope, timeout)
                        .await;
                }
            };
            let close_notifier = close_bounded(
                fields::RESOURCE_NOTIFIER,
                hub,
                notifier.as_ref(),
                &self.scope,
                timeout,
            );
            tokio::join!(close_artifact, close_notifier);

            return Err(err);
        }

        drop(guard);
        Ok(artifact)
    }

    async fn build_artifact(&self, hub: &str) -> Result<Arc<A>, RoutingError> {
        debug!(
            event = events::ARTIFACT_BUILD_START,
            component = COMPONENT,
            hub,
            resource = self.resource_kind,
            "building artifact"
        );

        match self.builder.build(hub, &self.scope).await {
            Ok(artifact) => {
                info!(
                    event = events::ARTIFACT_BUILD_OK,
                    component = COMPONENT,
                    hub,
                    resource = self.resource_kind,
                    "built artifact"
                );
                Ok(artifact)
            }
            Err(err) => {
                warn!(
                    event = events::ARTIFACT_BUILD_FAILED,
                    component = COMPONENT,
                    hub,
                    resource = self.resource_kind,
                    reason = err.as_label(),
                    err = %err,
                    "artifact build failed"
                );
                Err(err)
            }
        }
    }

    /// Must be called with the hub lock held. On failure hands back the
    /// notifier so the caller can close it after releasing the lock.
    async fn ensure_notifier(&self, hub: &str) -> Result<(), (RoutingError, Arc<dyn Notifier>)> {
        let snapshot = self.notifiers.load();
        if snapshot.contains_key(hub) {
            return Ok(());
        }

        let notifier = self.notifier_factory.create(hub);
        let listener: Arc<dyn HubChangeListener> = Arc::new(HubInvalidation {
            cache: self.this.clone(),
        });

        if let Err(source) = notifier
            .subscribe(&self.config.subscriber_name, listener, &self.scope)
            .await
        {
            warn!(
                event = events::NOTIFIER_SUBSCRIBE_FAILED,
                component = COMPONENT,
                hub,
                subscriber = %self.config.subscriber_name,
                err = %source,
                "notifier subscription failed"
            );
            let err = RoutingError::Subscribe {
                hub: hub.to_string(),
                source,
            };
            return Err((err, notifier));
        }

        if let Err(err) = swap_locked(
            &self.notifiers,
            &snapshot,
            with_entry(&snapshot, hub, notifier.clone()),
            hub,
        ) {
            return Err((err, notifier));
        }

        info!(
            event = events::NOTIFIER_SUBSCRIBE_OK,
            component = COMPONENT,
            hub,
            subscriber = %self.config.subscriber_name,
            "subscribed to hub changes"
        );
        Ok(())
    }

    /// Rebuilds a cached hub's artifact and closes the one it replaces.
    ///
    /// Hubs that are not cached are left alone. Build failures keep the
    /// current artifact.
    pub(crate) async fn update(&self, hub: &str) {
        debug!(
            event = events::HUB_UPDATE_START,
            component = COMPONENT,
            hub,
            resource = self.resource_kind,
            "hub configuration changed"
        );

        let guard = match self.lock.acquire(&self.scope).await {
            Ok(guard) => guard,
            Err(err) => {
                debug!(
                    event = events::HUB_UPDATE_FAILED,
                    component = COMPONENT,
                    hub,
                    reason = err.as_label(),
                    "update abandoned"
                );
                return;
            }
        };

        if self.artifacts.get(hub).is_none() {
            debug!(
                event = events::HUB_UPDATE_FAILED,
                component = COMPONENT,
                hub,
                reason = "not_cached",
                "ignoring update for hub without a cached artifact"
            );
            return;
        }

        let replacement = match self.builder.build(hub, &self.scope).await {
            Ok(artifact) => artifact,
            Err(err) => {
                warn!(
                    event = events::HUB_UPDATE_FAILED,
                    component = COMPONENT,
                    hub,
                    resource = self.resource_kind,
                    reason = err.as_label(),
                    err = %err,
                    "rebuild failed, keeping cached artifact"
                );
                return;
            }
        };

        let snapshot = self.artifacts.load();
        let previous = snapshot.get(hub).cloned();
        let swapped = swap_locked(
            &self.artifacts,
            &snapshot,
            with_entry(&snapshot, hub, replacement.clone()),
            hub,
        );
        drop(guard);

        let timeout = self.config.close_timeout();
        if swapped.is_err() {
            close_bounded(self.resource_kind, hub, replacement.as_ref(), &self.scope, timeout).await;
            return;
        }

        info!(
            event = events::HUB_UPDATE_OK,
            component = COMPONENT,
            hub,
            resource = self.resource_kind,
            "replaced artifact"
        );

        if let Some(previous) = previous {
            close_bounded(self.resource_kind, hub, previous.as_ref(), &self.scope, timeout).await;
        }
    }

    /// Evicts the hub from both caches and closes what was evicted.
    pub(crate) async fn remove(&self, hub: &str) {
        debug!(
            event = events::HUB_REMOVE_START,
            component = COMPONENT,
            hub,
            resource = self.resource_kind,
            "hub removed"
        );

        let guard = match self.lock.acquire(&self.scope).await {
            Ok(guard) => guard,
            Err(err) => {
                debug!(
                    event = events::HUB_REMOVE_FAILED,
                    component = COMPONENT,
                    hub,
                    reason = err.as_label(),
                    "removal abandoned"
                );
                return;
            }
        };

        let artifact = evict_locked(&self.artifacts, hub);
        let notifier = evict_locked(&self.notifiers, hub);
        drop(guard);

        let timeout = self.config.close_timeout();
        let close_artifact = async {
            match &artifact {
                Some(artifact) => {
                    close_bounded(self.resource_kind, hub, artifact.as_ref(), &self.scope, timeout)
                        .await
                }
                None => true,
            }
        };
        let close_notifier = async {
            match &notifier {
                Some(notifier) => {
                    close_bounded(
                        fields::RESOURCE_NOTIFIER,
                        hub,
                        notifier.as_ref(),
                        &self.scope,
                        timeout,
                    )
                    .await
                }
                None => true,
            }
        };
        let (artifact_closed, notifier_closed) = tokio::join!(close_artifact, close_notifier);

        info!(
            event = events::HUB_REMOVE_OK,
            component = COMPONENT,
            hub,
            resource = self.resource_kind,
            had_artifact = artifact.is_some(),
            had_notifier = notifier.is_some(),
            artifact_closed,
            notifier_closed,
            "evicted hub"
        );
    }

    /// Empties both caches and closes every notifier, then every artifact.
    ///
    /// The caches are taken under the hub lock even when `token` has fired, so
    /// an in-flight first use either installs before the take or, once the
    /// owner's scope is cancelled, is rejected after it.
    /// Closes run concurrently under `token` and are individually bounded.
    /// Returns the number of closes that failed or timed out.
    pub(crate) async fn close_all(&self, token: &CancellationToken) -> usize {
        let guard = self.lock.acquire_for_teardown().await;
        let notifiers = self.notifiers.take();
        let artifacts = self.artifacts.take();
        drop(guard);

        let timeout = self.config.close_timeout();
        let failed_notifiers = close_all_bounded(
            fields::RESOURCE_NOTIFIER,
            entries(&notifiers),
            token,
            timeout,
        )
        .await;
        let failed_artifacts =
            close_all_bounded(self.resource_kind, entries(&artifacts), token, timeout).await;

        failed_notifiers + failed_artifacts
    }

    #[cfg(test)]
    pub(crate) fn lock(&self) -> &HubLock {
        &self.lock
    }

    #[cfg(test)]
    pub(crate) fn notifier_hubs(&self) -> Vec<String> {
        self.notifiers.hubs()
    }
}

fn swap_locked<V: ?Sized>(
    cell: &SnapshotCell<V>,
    expected: &Snapshot<V>,
    next: HubMap<V>,
    hub: &str,
) -> Result<(), RoutingError> {
    if cell.compare_and_swap(expected, next) {
        return Ok(());
    }
    error!(
        event = events::CACHE_CAS_LOST,
        component = COMPONENT,
        hub,
        "{CAS_LOST}"
    );
    debug_assert!(false, "{CAS_LOST}");
    Err(RoutingError::InvariantViolated(CAS_LOST))
}

fn evict_locked<V: ?Sized>(cell: &SnapshotCell<V>, hub: &str) -> Option<Arc<V>> {
    let snapshot = cell.load();
    let evicted = snapshot.get(hub).cloned()?;
    swap_locked(cell, &snapshot, without_entry(&snapshot, hub), hub).ok()?;
    Some(evicted)
}

fn entries<V: ?Sized>(snapshot: &HubMap<V>) -> Vec<(String, Arc<V>)> {
    snapshot
        .iter()
        .map(|(hub, value)| (hub.clone(), value.clone()))
        .collect()
}

/// Routes change-feed callbacks back into the cache without keeping it alive.
struct HubInvalidation<A: ?Sized + Closable + 'static> {
    cache: Weak<HubCache<A>>,
}

impl<A: ?Sized + Closable + 'static> HubInvalidation<A> {
    fn cache(&self, hub: &str) -> Option<Arc<HubCache<A>>> {
        let cache = self.cache.upgrade();
        if cache.is_none() {
            debug!(
                event = events::HUB_CACHE_DROPPED,
                component = COMPONENT,
                hub,
                reason = fields::REASON_CACHE_DROPPED,
                "ignoring change for a dropped cache"
            );
        }
        cache
    }
}

#[async_trait]
impl<A: ?Sized + Closable + 'static> HubChangeListener for HubInvalidation<A> {
    async fn on_update(&self, hub: &str) {
        if let Some(cache) = self.cache(hub) {
            cache.update(hub).await;
        }
    }

    async fn on_remove(&self, hub: &str) {
        if let Some(cache) = self.cache(hub) {
            cache.remove(hub).await;
        }
    }
}
