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

//! Compiled per-hub route evaluation.

use crate::error::BoxError;
use crate::routing::message::{Destination, Message};
use crate::routing::route_config::{Condition, RouteSpec, RouterConfig};
use crate::runtime::teardown::Closable;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Answers which destinations a message of one hub matches.
pub trait Evaluator: Closable {
    fn evaluate(&self, message: &Message) -> BTreeSet<Destination>;
}

/// Turns a hub's [`RouterConfig`] into an [`Evaluator`].
pub trait RouteCompiler: Send + Sync {
    fn compile(&self, hub: &str, config: RouterConfig) -> Result<Arc<dyn Evaluator>, BoxError>;
}

/// Compiler for the structured [`Condition`] model.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultRouteCompiler;

impl RouteCompiler for DefaultRouteCompiler {
    fn compile(&self, hub: &str, config: RouterConfig) -> Result<Arc<dyn Evaluator>, BoxError> {
        Ok(Arc::new(CompiledEvaluator::compile(hub, config)?))
    }
}

struct CompiledRoute {
    condition: Condition,
    endpoints: Vec<Destination>,
}

impl CompiledRoute {
    fn from_route(hub: &str, route: RouteSpec) -> Result<Self, BoxError> {
        if route.endpoints.is_empty() {
            return Err(format!("route {:?} of hub {hub:?} has no endpoints", route.id).into());
        }
        Ok(Self {
            condition: route.condition,
            endpoints: route.endpoints,
        })
    }
}

/// Evaluator produced by [`DefaultRouteCompiler`].
///
/// Holds no external resources, so closing it is a no-op.
pub struct CompiledEvaluator {
    routes: Vec<CompiledRoute>,
    fallback: Option<CompiledRoute>,
}

impl CompiledEvaluator {
    pub fn compile(hub: &str, config: RouterConfig) -> Result<Self, BoxError> {
        let mut seen = HashSet::new();
        let mut routes = Vec::with_capacity(config.routes.len());

        for route in config.routes {
            if !seen.insert(route.id.clone()) {
                return Err(format!("duplicate route id {:?} in hub {hub:?}", route.id).into());
            }
            routes.push(CompiledRoute::from_route(hub, route)?);
        }

        let fallback = config
            .fallback
            .map(|route| CompiledRoute::from_route(hub, route))
            .transpose()?;

        Ok(Self { routes, fallback })
    }
}

impl Evaluator for CompiledEvaluator {
    fn evaluate(&self, message: &Message) -> BTreeSet<Destination> {
        let mut destinations: BTreeSet<Destination> = self
            .routes
            .iter()
            .filter(|route| route.condition.matches(message))
            .flat_map(|route| route.endpoints.iter().cloned())
            .collect();

        if destinations.is_empty() {
            if let Some(fallback) = &self.fallback {
                if fallback.condition.matches(message) {
                    destinations.extend(fallback.endpoints.iter().cloned());
                }
            }
        }

        destinations
    }
}

#[async_trait]
impl Closable for CompiledEvaluator {
    async fn close(&self, _token: &CancellationToken) -> Result<(), BoxError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DefaultRouteCompiler, RouteCompiler};
    use crate::routing::message::{Destination, Message};
    use crate::routing::route_config::{Condition, RouteSpec, RouterConfig};

    fn telemetry_route(id: &str, endpoint: &str) -> RouteSpec {
        RouteSpec::new(
            id,
            Condition::property_equals("type", "telemetry"),
            vec![Destination::new(endpoint)],
        )
    }

    #[test]
    fn matching_routes_union_their_endpoints() {
        let config = RouterConfig::new(vec![
            telemetry_route("r1", "storage"),
            telemetry_route("r2", "analytics"),
            RouteSpec::new(
                "r3",
                Condition::property_equals("type", "alert"),
                vec![Destination::new("pager")],
            ),
        ]);
        let evaluator = DefaultRouteCompiler
            .compile("h1", config)
            .expect("config compiles");

        let message = Message::with_id("m-1", Vec::new()).with_property("type", "telemetry");
        let destinations: Vec<String> = evaluator
            .evaluate(&message)
            .into_iter()
            .map(|d| d.to_string())
            .collect();

        assert_eq!(destinations, vec!["analytics", "storage"]);
    }

    #[test]
    fn fallback_applies_only_when_nothing_else_matched() {
        let config = RouterConfig::new(vec![telemetry_route("r1", "storage")]).with_fallback(
            RouteSpec::new("fallback", Condition::Always, vec![Destination::new("cold")]),
        );
        let evaluator = DefaultRouteCompiler
            .compile("h1", config)
            .expect("config compiles");

        let telemetry = Message::with_id("m-1", Vec::new()).with_property("type", "telemetry");
        let other = Message::with_id("m-2", Vec::new()).with_property("type", "log");

        assert!(evaluator
            .evaluate(&telemetry)
            .contains(&Destination::new("storage")));
        assert!(!evaluator
            .evaluate(&telemetry)
            .contains(&Destination::new("cold")));
        assert!(evaluator.evaluate(&other).contains(&Destination::new("cold")));
    }

    #[test]
    fn compile_rejects_duplicate_ids_and_empty_endpoints() {
        let duplicate = RouterConfig::new(vec![
            telemetry_route("r1", "storage"),
            telemetry_route("r1", "analytics"),
        ]);
        let empty = RouterConfig::new(vec![RouteSpec::new("r1", Condition::Always, Vec::new())]);

        assert!(DefaultRouteCompiler.compile("h1", duplicate).is_err());
        assert!(DefaultRouteCompiler.compile("h1", empty).is_err());
    }

    #[test]
    fn empty_config_matches_nothing() {
        let evaluator = DefaultRouteCompiler
            .compile("h1", RouterConfig::default())
            .expect("empty config compiles");

        assert!(evaluator
            .evaluate(&Message::with_id("m-1", Vec::new()))
            .is_empty());
    }
}
