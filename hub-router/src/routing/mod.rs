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

//! Routing layer.
//!
//! Owns the message model, per-hub router configuration, the route-store
//! contract and the compilation of a configuration into an [`Evaluator`].
//!
//! ```
//! use hub_router::{Condition, DefaultRouteCompiler, Destination, Message, RouteCompiler};
//! use hub_router::{RouteSpec, RouterConfig};
//!
//! let config = RouterConfig::new(vec![RouteSpec::new(
//!     "telemetry",
//!     Condition::property_equals("type", "telemetry"),
//!     vec![Destination::new("storage")],
//! )]);
//! let evaluator = DefaultRouteCompiler.compile("h1", config).unwrap();
//!
//! let message = Message::new(b"21.5".to_vec()).with_property("type", "telemetry");
//! assert!(evaluator.evaluate(&message).contains(&Destination::new("storage")));
//! ```
//!
//! [`Evaluator`]: crate::Evaluator

pub(crate) mod evaluator;
pub(crate) mod evaluator_builder;
pub(crate) mod message;
pub(crate) mod route_config;
pub(crate) mod route_store;
