//! Pattern strategy: explicit route template to backend path mappings.
//!
//! ```text
//! "/orders/:id"            → "/v1/orders/:id"
//! "/customers/:c/orders"   → "/v1/orders/by-customer/:c"
//! ```
//!
//! Every parameter a target uses must be captured by its route. Entries are
//! compiled in key order, so registration is deterministic.

use std::collections::BTreeMap;

use crate::dispatch::error::DispatchError;
use crate::dispatch::forwarder::Forwarder;
use crate::dispatch::route::{ApplicationContext, CompiledRoute};
use crate::routing::PathTemplate;

fn compile_one(
    route: &str,
    target: &str,
    ctx: &ApplicationContext,
) -> Result<CompiledRoute, DispatchError> {
    let template_error = |source| DispatchError::Template {
        app: ctx.name.to_string(),
        route: route.to_string(),
        source,
    };

    if !target.starts_with('/') {
        return Err(DispatchError::InvalidTarget {
            app: ctx.name.to_string(),
            route: route.to_string(),
            target: target.to_string(),
        });
    }

    let route_template = PathTemplate::parse(route).map_err(template_error)?;
    let target_template = PathTemplate::parse(target).map_err(template_error)?;

    if let Some(param) = target_template.missing_from(&route_template).next() {
        return Err(DispatchError::UnresolvedParameter {
            app: ctx.name.to_string(),
            route: route.to_string(),
            target: target.to_string(),
            param: param.to_string(),
        });
    }

    let upstream = format!("{}{}", ctx.backend_url.trim_end_matches('/'), target);
    tracing::debug!(app = %ctx.name, route, upstream, "Compiled pattern route");

    Ok(CompiledRoute::new(
        route_template,
        target_template,
        Forwarder::new(ctx).into_handler(),
    ))
}

pub fn compile(
    patterns: &BTreeMap<String, String>,
    ctx: &ApplicationContext,
) -> Result<Vec<CompiledRoute>, DispatchError> {
    patterns
        .iter()
        .map(|(route, target)| compile_one(route, target, ctx))
        .collect()
}
