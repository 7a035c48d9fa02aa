//! Default manifest generator driven purely by declarations.

use std::collections::HashSet;

use crate::build::manifest::{
    GeneratedManifest, Manifest, ManifestFunctionConfig, ManifestGenerator, ManifestInput, RouteEntry,
};
use crate::declarations::{CacheMode, Declaration};
use crate::error::BuildError;

/// Builds one route per declaration whose function has a handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarationGenerator;

impl ManifestGenerator for DeclarationGenerator {
    fn generate(&self, input: ManifestInput<'_>) -> Result<GeneratedManifest, BuildError> {
        let handler_names: HashSet<&str> = input.handlers.iter().map(|h| h.name.as_str()).collect();
        let mut manifest = Manifest::default();
        let mut routed = HashSet::new();

        for declaration in input.declarations {
            if !handler_names.contains(declaration.function.as_str()) {
                tracing::debug!(function = %declaration.function, "Declaration has no matching edge function, skipping");
                continue;
            }
            let Some(route) = route_entry(declaration) else {
                tracing::debug!(function = %declaration.function, "Declaration has neither path nor pattern, skipping");
                continue;
            };
            routed.insert(declaration.function.as_str());
            match declaration.cache {
                CacheMode::Pre => manifest.routes.push(route),
                CacheMode::Post => manifest.post_cache_routes.push(route),
            }
        }

        for handler in input.handlers {
            let Some(config) = input.function_config.get(&handler.name) else {
                continue;
            };
            let entry = ManifestFunctionConfig {
                excluded_patterns: config.excluded_path.iter().map(|p| path_to_pattern(p)).collect(),
                name: config.name.clone(),
                on_error: config.on_error.clone(),
            };
            if entry != ManifestFunctionConfig::default() {
                manifest.function_config.insert(handler.name.clone(), entry);
            }
        }

        let unrouted_functions = input
            .handlers
            .iter()
            .filter(|h| !routed.contains(h.name.as_str()))
            .map(|h| h.name.clone())
            .collect();

        if !input.feature_flags.is_empty() {
            tracing::trace!(flags = ?input.feature_flags, "Feature flags ignored by declaration generator");
        }

        Ok(GeneratedManifest {
            manifest,
            unrouted_functions,
        })
    }
}

fn route_entry(declaration: &Declaration) -> Option<RouteEntry> {
    let pattern = match (&declaration.pattern, &declaration.path) {
        (Some(pattern), _) => pattern.clone(),
        (None, Some(path)) => path_to_pattern(path),
        (None, None) => return None,
    };

    let mut excluded_patterns = declaration.excluded_pattern.clone();
    excluded_patterns.extend(declaration.excluded_path.iter().map(|p| path_to_pattern(p)));

    Some(RouteEntry {
        function: declaration.function.clone(),
        name: declaration.name.clone(),
        pattern,
        path: declaration.path.clone(),
        excluded_patterns,
        methods: declaration.method.iter().map(|m| m.to_ascii_uppercase()).collect(),
    })
}

/// Convert a URL path glob into an anchored regular expression.
///
/// `*` matches any run of characters; a trailing slash is optional.
pub fn path_to_pattern(path: &str) -> String {
    let escaped = regex::escape(path).replace(r"\*", ".*");
    let trimmed = escaped.trim_end_matches('/');
    format!("^{trimmed}/?$")
}
