//! Path strategy: mount an application below a path prefix.
//!
//! ```text
//! mount "/assets/"  (trailing slashes trimmed)
//!     /assets          → {backend}/
//!     /assets/*path    → {backend}/{path}
//! ```
//!
//! Both routes share a single forwarder.

use crate::dispatch::error::DispatchError;
use crate::dispatch::forwarder::Forwarder;
use crate::dispatch::route::{ApplicationContext, CompiledRoute};
use crate::routing::PathTemplate;

/// Name of the remainder capture on the wildcard route.
pub const REMAINDER: &str = "path";

fn parse(ctx: &ApplicationContext, template: &str) -> Result<PathTemplate, DispatchError> {
    PathTemplate::parse(template).map_err(|source| DispatchError::Template {
        app: ctx.name.to_string(),
        route: template.to_string(),
        source,
    })
}

pub fn compile(mount: &str, ctx: &ApplicationContext) -> Result<Vec<CompiledRoute>, DispatchError> {
    let mount = mount.trim_end_matches('/');

    let exact = if mount.is_empty() { "/" } else { mount };
    let wildcard = format!("{mount}/*{REMAINDER}");
    let remainder_target = format!("/*{REMAINDER}");

    let forwarder = Forwarder::new(ctx).into_handler();

    Ok(vec![
        CompiledRoute::new(parse(ctx, exact)?, parse(ctx, "/")?, forwarder.clone()),
        CompiledRoute::new(
            parse(ctx, &wildcard)?,
            parse(ctx, &remainder_target)?,
            forwarder,
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::testing::{app_context, RecordingProxy};

    #[test]
    fn test_exact_and_wildcard_routes() {
        let routes = compile("/assets/", &app_context("assets", RecordingProxy::new())).unwrap();
        assert_eq!(routes.len(), 2);

        assert_eq!(routes[0].template(), "/assets");
        assert_eq!(routes[0].target.source(), "/");
        assert_eq!(routes[0].route.names().count(), 0);

        assert_eq!(routes[1].template(), "/assets/*path");
        assert_eq!(routes[1].target.source(), "/*path");
        assert_eq!(routes[1].route.names().collect::<Vec<_>>(), vec!["path"]);

        assert!(routes[0].forwarder.same_as(&routes[1].forwarder));
    }

    #[test]
    fn test_root_mount() {
        let routes = compile("/", &app_context("root", RecordingProxy::new())).unwrap();
        assert_eq!(routes[0].template(), "/");
        assert_eq!(routes[1].template(), "/*path");
    }
}
