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
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

pub(crate) type HubLockGuard<'a> = MutexGuard<'a, ()>;

/// Serializes cache writers. Waiters are served in FIFO order and the lock is
/// released when the returned guard is dropped, on every exit path.
pub(crate) struct HubLock {
    inner: Mutex<()>,
}

impl HubLock {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(()),
        }
    }

    /// Waits for the lock unless `token` fires first.
    ///
    /// An already cancelled token fails even when the lock is free.
    pub(crate) async fn acquire(
        &self,
        token: &CancellationToken,
    ) -> Result<HubLockGuard<'_>, RoutingError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(RoutingError::Cancelled),
            guard = self.inner.lock() => Ok(guard),
        }
    }

    /// Waits for the lock regardless of cancellation.
    ///
    /// Holders observe the owner's cancelled scope, so the wait ends once the
    /// in-flight writer unwinds or finishes.
    pub(crate) async fn acquire_for_teardown(&self) -> HubLockGuard<'_> {
        self.inner.lock().await
    }

    #[cfg(test)]
    pub(crate) fn try_acquire(&self) -> Option<HubLockGuard<'_>> {
        self.inner.try_lock().ok()
    }
}
