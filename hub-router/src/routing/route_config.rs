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

//! Per-hub router configuration as supplied by a [`crate::RouteStore`].

use crate::routing::message::{Destination, Message};
use serde::{Deserialize, Serialize};

/// The routes configured for one hub.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    /// Applied only to messages no other route matched.
    #[serde(default)]
    pub fallback: Option<RouteSpec>,
}

impl RouterConfig {
    pub fn new(routes: Vec<RouteSpec>) -> Self {
        Self {
            routes,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: RouteSpec) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteSpec {
    pub id: String,
    pub condition: Condition,
    pub endpoints: Vec<Destination>,
}

impl RouteSpec {
    pub fn new(id: impl Into<String>, condition: Condition, endpoints: Vec<Destination>) -> Self {
        Self {
            id: id.into(),
            condition,
            endpoints,
        }
    }
}

/// Structured match predicate over a message's properties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Always,
    PropertyEquals { property: String, value: String },
    SystemPropertyEquals { property: String, value: String },
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn property_equals(property: impl Into<String>, value: impl Into<String>) -> Self {
        Condition::PropertyEquals {
            property: property.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, message: &Message) -> bool {
        match self {
            Condition::Always => true,
            Condition::PropertyEquals { property, value } => {
                message.property(property) == Some(value.as_str())
            }
            Condition::SystemPropertyEquals { property, value } => {
                message.system_property(property) == Some(value.as_str())
            }
            Condition::All(conditions) => conditions.iter().all(|c| c.matches(message)),
            Condition::Any(conditions) => conditions.iter().any(|c| c.matches(message)),
            Condition::Not(condition) => !condition.matches(message),
        }
    }
}
