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

//! Control-plane layer.
//!
//! Owns the per-hub caches: the snapshot cell and hub lock they are built on,
//! the change-feed contract that keeps them current, and the shared
//! get-or-create / update / remove / close routines.

pub(crate) mod hub_cache;
pub(crate) mod hub_lock;
pub(crate) mod notifier;
pub(crate) mod snapshot_cell;
