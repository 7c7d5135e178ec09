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

//! API facade layer.
//!
//! Owns the outward [`RoutingService`] contract and its two implementations.
//!
//! [`RoutingService`]: crate::RoutingService

pub(crate) mod filtering;
pub(crate) mod frontend;
pub(crate) mod lifecycle;
pub(crate) mod routing_service;
