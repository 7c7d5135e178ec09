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

//! Canonical structured event names used across `hub-router`.

// Hub cache resolution events.
pub const HUB_CACHE_HIT_AFTER_LOCK: &str = "hub_cache_hit_after_lock";
pub const HUB_CACHE_MISS: &str = "hub_cache_miss";
pub const ARTIFACT_BUILD_START: &str = "artifact_build_start";
pub const ARTIFACT_BUILD_OK: &str = "artifact_build_ok";
pub const ARTIFACT_BUILD_FAILED: &str = "artifact_build_failed";
pub const ARTIFACT_ROLLBACK: &str = "artifact_rollback";
pub const CACHE_CAS_LOST: &str = "cache_cas_lost";

// Notifier subscription events.
pub const NOTIFIER_SUBSCRIBE_OK: &str = "notifier_subscribe_ok";
pub const NOTIFIER_SUBSCRIBE_FAILED: &str = "notifier_subscribe_failed";

// Change-feed driven lifecycle events.
pub const HUB_UPDATE_START: &str = "hub_update_start";
pub const HUB_UPDATE_OK: &str = "hub_update_ok";
pub const HUB_UPDATE_FAILED: &str = "hub_update_failed";
pub const HUB_REMOVE_START: &str = "hub_remove_start";
pub const HUB_REMOVE_OK: &str = "hub_remove_ok";
pub const HUB_REMOVE_FAILED: &str = "hub_remove_failed";
pub const HUB_CACHE_DROPPED: &str = "hub_cache_dropped";

// Resource teardown events.
pub const CLOSE_RESOURCE_OK: &str = "close_resource_ok";
pub const CLOSE_RESOURCE_FAILED: &str = "close_resource_failed";
pub const CLOSE_RESOURCE_TIMEOUT: &str = "close_resource_timeout";

// Service lifecycle and data-path events.
pub const SERVICE_START: &str = "service_start";
pub const SERVICE_CLOSE_START: &str = "service_close_start";
pub const SERVICE_CLOSE_OK: &str = "service_close_ok";
pub const SERVICE_CLOSE_SKIPPED: &str = "service_close_skipped";
pub const SERVICE_DROPPED_OPEN: &str = "service_dropped_open";
pub const ROUTE_REJECTED_CLOSED: &str = "route_rejected_closed";
pub const ROUTE_FILTERED_EMPTY: &str = "route_filtered_empty";
pub const ROUTE_FORWARDED: &str = "route_forwarded";
pub const SINK_DELIVERY_OK: &str = "sink_delivery_ok";
pub const SINK_DELIVERY_FAILED: &str = "sink_delivery_failed";
