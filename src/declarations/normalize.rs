//! Merging declarations from every source into one ordered list.
//!
//! # Precedence
//! ```text
//! deploy-time declarations   checked against internal in-source configs
//! static declarations        checked against user in-source configs
//! in-source configs          one declaration per `path`, for functions not yet declared
//! ```
//! A declaration whose function exports its own `path` is superseded by the
//! in-source config.

use std::collections::{BTreeMap, HashSet};

use crate::declarations::types::{CacheMode, Declaration, DeclarationSource, FunctionConfig};

/// Normalize tagged declaration sources into the merged declaration list.
pub fn normalize(sources: Vec<DeclarationSource>) -> Vec<Declaration> {
    let mut deploy_time = Vec::new();
    let mut static_decls = Vec::new();
    let mut internal_configs: BTreeMap<String, FunctionConfig> = BTreeMap::new();
    let mut user_configs: BTreeMap<String, FunctionConfig> = BTreeMap::new();
    let mut in_source_order = Vec::new();

    for source in sources {
        match source {
            DeclarationSource::Static(decl) => static_decls.push(decl),
            DeclarationSource::DeployTime(decl) => deploy_time.push(decl),
            DeclarationSource::InSource { function, config, internal } => {
                in_source_order.push((function.clone(), internal));
                if internal {
                    internal_configs.insert(function, config);
                } else {
                    user_configs.insert(function, config);
                }
            }
        }
    }

    let mut declared = HashSet::new();
    let mut merged = Vec::new();
    merged.extend(filter_superseded(deploy_time, &internal_configs, &mut declared));
    merged.extend(filter_superseded(static_decls, &user_configs, &mut declared));

    // Internal configs first, matching the handler order used for compilation.
    in_source_order.sort_by_key(|(_, internal)| !*internal);
    for (function, internal) in in_source_order {
        if declared.contains(&function) {
            continue;
        }
        let configs = if internal { &internal_configs } else { &user_configs };
        if let Some(config) = configs.get(&function) {
            declared.insert(function.clone());
            merged.extend(from_function_config(&function, config));
        }
    }

    merged
}

fn filter_superseded(
    declarations: Vec<Declaration>,
    configs: &BTreeMap<String, FunctionConfig>,
    declared: &mut HashSet<String>,
) -> Vec<Declaration> {
    declarations
        .into_iter()
        .filter(|decl| {
            let superseded = configs
                .get(&decl.function)
                .is_some_and(|config| !config.path.is_empty());
            if !superseded {
                declared.insert(decl.function.clone());
            }
            !superseded
        })
        .collect()
}

fn from_function_config(function: &str, config: &FunctionConfig) -> Vec<Declaration> {
    config
        .path
        .iter()
        .map(|path| Declaration {
            function: function.to_string(),
            name: config.name.clone(),
            path: Some(path.clone()),
            pattern: None,
            excluded_path: config.excluded_path.clone(),
            excluded_pattern: Vec::new(),
            method: config.method.clone(),
            cache: config.cache.unwrap_or(CacheMode::Pre),
        })
        .collect()
}
