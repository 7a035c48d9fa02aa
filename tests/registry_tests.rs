//! End-to-end tests for the registry actor, driven through `trigger`.

mod common;

use std::time::Duration;

use common::{handler_names, next_event, parse_config, start, wait_for_status, Project, ScriptedCompiler};
use edge_registry::config::ProjectConfig;
use edge_registry::declarations::FunctionConfig;
use edge_registry::registry::EventKind;
use edge_registry::watch::{intents_for, Batch};
use edge_registry::{Intent, Registry, RegistryOptions};

const API_CONFIG: &str = r#"
[[edge_functions]]
function = "a"
path = "/api/*"
"#;

#[tokio::test]
async fn test_routes_declared_path() {
    let project = Project::new();
    project.add_handler("a");
    let compiler = ScriptedCompiler::new();

    let registry = start(&project, parse_config(API_CONFIG), compiler.clone()).await;
    registry.initialize().await.unwrap();

    assert_eq!(handler_names(&registry, "/api/users", "GET"), vec!["a"]);
    assert!(handler_names(&registry, "/other", "POST").is_empty());
    assert_eq!(compiler.calls(), 1);

    let status = registry.status();
    assert!(status.initialized);
    assert_eq!(status.functions, vec!["a"]);
    assert_eq!(status.routes, 1);
    assert_eq!(status.generation, 1);
    assert!(status.build_error.is_none());
}

#[tokio::test]
async fn test_empty_project_initializes_without_compiling() {
    let project = Project::new();
    let compiler = ScriptedCompiler::new();

    let registry = start(&project, ProjectConfig::default(), compiler.clone()).await;
    registry.initialize().await.unwrap();

    assert!(handler_names(&registry, "/", "GET").is_empty());
    assert_eq!(compiler.calls(), 0);
}

#[tokio::test]
async fn test_initial_scan_emits_loaded_events() {
    let project = Project::new();
    project.add_handler("a");
    project.add_handler("lonely");
    let registry = start(&project, parse_config(API_CONFIG), ScriptedCompiler::new()).await;
    let mut events = registry.subscribe();

    let first = next_event(&mut events, EventKind::Loaded).await;
    let second = next_event(&mut events, EventKind::Loaded).await;

    assert_eq!(first.function.as_deref(), Some("a"));
    assert!(first.warnings.is_empty());
    assert_eq!(second.function.as_deref(), Some("lonely"));
    assert_eq!(
        second.warnings,
        vec!["Edge function is not accessible because it does not have a path configured."]
    );
}

#[tokio::test]
async fn test_initial_build_failure_installs_empty_table() {
    let project = Project::new();
    project.add_handler("a");
    let compiler = ScriptedCompiler::new();
    compiler.set_fail(true);

    let registry = start(&project, parse_config(API_CONFIG), compiler).await;
    registry.initialize().await.unwrap();

    assert!(handler_names(&registry, "/api/users", "GET").is_empty());
    let status = registry.status();
    assert_eq!(status.generation, 0);
    assert!(status.build_error.is_some());
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_table() {
    let project = Project::new();
    let a = project.add_handler("a");
    let compiler = ScriptedCompiler::new();

    let registry = start(&project, parse_config(API_CONFIG), compiler.clone()).await;
    registry.initialize().await.unwrap();
    let mut events = registry.subscribe();

    compiler.set_fail(true);
    registry.trigger(Intent::FilesChanged(vec![a.clone()])).unwrap();

    next_event(&mut events, EventKind::Reloading).await;
    let failure = next_event(&mut events, EventKind::BuildError).await;
    assert!(failure.error.is_some());
    assert_eq!(handler_names(&registry, "/api/users", "GET"), vec!["a"]);
    assert!(registry.status().build_error.is_some());

    // Any change after a failure retries the build, even an unrelated one.
    compiler.set_fail(false);
    registry
        .trigger(Intent::FilesChanged(vec![project.path("README.md")]))
        .unwrap();
    next_event(&mut events, EventKind::Reloaded).await;

    let status = registry.status();
    assert!(status.build_error.is_none());
    assert_eq!(status.generation, 2);
}

#[tokio::test]
async fn test_rescan_reports_added_and_removed_handlers() {
    let project = Project::new();
    project.add_handler("a");
    let registry = start(&project, parse_config(API_CONFIG), ScriptedCompiler::new()).await;
    registry.initialize().await.unwrap();
    let mut events = registry.subscribe();

    project.add_handler("b");
    registry.trigger(Intent::HandlersChanged).unwrap();
    let loaded = next_event(&mut events, EventKind::Loaded).await;
    assert_eq!(loaded.function.as_deref(), Some("b"));

    project.remove("edge-functions/a.ts");
    registry.trigger(Intent::HandlersChanged).unwrap();
    let removed = next_event(&mut events, EventKind::Removed).await;
    assert_eq!(removed.function.as_deref(), Some("a"));

    let status = wait_for_status(&registry, |s| s.generation == 3).await;
    assert_eq!(status.functions, vec!["b"]);
    assert!(handler_names(&registry, "/api/users", "GET").is_empty());
}

#[tokio::test]
async fn test_rescan_without_changes_does_not_build() {
    let project = Project::new();
    let a = project.add_handler("a");
    let compiler = ScriptedCompiler::new();
    let registry = start(&project, parse_config(API_CONFIG), compiler.clone()).await;
    registry.initialize().await.unwrap();
    let mut events = registry.subscribe();

    registry.trigger(Intent::HandlersChanged).unwrap();
    registry.trigger(Intent::FilesChanged(vec![a])).unwrap();
    next_event(&mut events, EventKind::Reloaded).await;

    // The rescan found nothing new; only the file change built.
    assert_eq!(compiler.calls(), 2);
}

#[tokio::test]
async fn test_dependency_change_reloads_importing_handler() {
    let project = Project::new();
    let a = project.add_handler("a");
    project.add_handler("b");
    let util = project.write("lib/util.ts", "export const x = 1");
    let deep = project.write("lib/deep.ts", "export const y = 2");

    let compiler = ScriptedCompiler::new();
    compiler.set_imports(&a, &[&util]);
    compiler.set_imports(&util, &[&deep]);

    let registry = start(&project, parse_config(API_CONFIG), compiler).await;
    registry.initialize().await.unwrap();
    let mut events = registry.subscribe();

    registry.trigger(Intent::FilesChanged(vec![deep])).unwrap();

    next_event(&mut events, EventKind::Reloading).await;
    let reloaded = next_event(&mut events, EventKind::Reloaded).await;
    assert_eq!(reloaded.function.as_deref(), Some("a"));
}

#[tokio::test]
async fn test_unrelated_change_does_not_build() {
    let project = Project::new();
    let a = project.add_handler("a");
    let compiler = ScriptedCompiler::new();
    let registry = start(&project, parse_config(API_CONFIG), compiler.clone()).await;
    registry.initialize().await.unwrap();
    let mut events = registry.subscribe();

    registry
        .trigger(Intent::FilesChanged(vec![project.path("notes.txt")]))
        .unwrap();
    // A later relevant change proves the first intent has been handled.
    registry.trigger(Intent::FilesChanged(vec![a])).unwrap();
    next_event(&mut events, EventKind::Reloaded).await;

    assert_eq!(compiler.calls(), 2);
    assert_eq!(registry.status().generation, 2);
}

#[tokio::test]
async fn test_missing_graph_keeps_dependency_index() {
    let project = Project::new();
    let a = project.add_handler("a");
    let util = project.write("lib/util.ts", "export const x = 1");
    let compiler = ScriptedCompiler::new();
    compiler.set_imports(&a, &[&util]);

    let registry = start(&project, parse_config(API_CONFIG), compiler.clone()).await;
    registry.initialize().await.unwrap();
    let mut events = registry.subscribe();

    compiler.set_no_graph(true);
    registry.trigger(Intent::FilesChanged(vec![a])).unwrap();
    next_event(&mut events, EventKind::Reloaded).await;

    registry.trigger(Intent::FilesChanged(vec![util])).unwrap();
    let reloaded = next_event(&mut events, EventKind::Reloaded).await;
    assert_eq!(reloaded.function.as_deref(), Some("a"));
    assert_eq!(compiler.calls(), 3);
}

#[tokio::test]
async fn test_triggers_during_build_coalesce() {
    let project = Project::new();
    let a = project.add_handler("a");
    let compiler = ScriptedCompiler::new();
    let registry = start(&project, parse_config(API_CONFIG), compiler.clone()).await;
    registry.initialize().await.unwrap();

    compiler.set_delay(Duration::from_millis(200));
    for _ in 0..5 {
        registry.trigger(Intent::FilesChanged(vec![a.clone()])).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    wait_for_status(&registry, |s| s.generation >= 2).await;
    tokio::time::sleep(Duration::from_millis(600)).await;

    // One build for the first trigger, one for everything queued behind it.
    assert!(compiler.calls() <= 3, "calls = {}", compiler.calls());
    assert_eq!(compiler.max_in_flight(), 1);
}

#[tokio::test]
async fn test_unsupported_deploy_manifest_still_initializes() {
    let project = Project::new();
    project.add_handler("a");
    project.write(".edge/internal/manifest.json", r#"{"version": 2, "functions": []}"#);
    let compiler = ScriptedCompiler::new();

    let registry = start(&project, parse_config(API_CONFIG), compiler.clone()).await;
    registry.initialize().await.unwrap();

    let status = registry.status();
    assert!(status.build_error.unwrap().contains("version"));
    assert!(handler_names(&registry, "/api/users", "GET").is_empty());
    assert_eq!(compiler.calls(), 0);

    // Fixing the manifest and touching it recovers.
    let mut events = registry.subscribe();
    let manifest = project.write(".edge/internal/manifest.json", r#"{"version": 1, "functions": []}"#);
    registry.trigger(Intent::FilesChanged(vec![manifest])).unwrap();
    next_event(&mut events, EventKind::Loaded).await;

    assert_eq!(handler_names(&registry, "/api/users", "GET"), vec!["a"]);
    assert!(registry.status().build_error.is_none());
}

#[tokio::test]
async fn test_deploy_manifest_routes_internal_handler() {
    let project = Project::new();
    project.add_internal_handler("geo");
    project.write(
        ".edge/internal/manifest.json",
        r#"{
            "version": 1,
            "functions": [{"function": "geo", "path": "/geo", "name": "Geolocation"}],
            "import_map": "import_map.json"
        }"#,
    );
    let compiler = ScriptedCompiler::new();

    let registry = start(&project, ProjectConfig::default(), compiler.clone()).await;
    let mut events = registry.subscribe();
    registry.initialize().await.unwrap();

    let loaded = next_event(&mut events, EventKind::Loaded).await;
    assert_eq!(loaded.display_name.as_deref(), Some("Geolocation"));
    assert_eq!(handler_names(&registry, "/geo", "GET"), vec!["geo"]);
    assert_eq!(
        compiler.last_import_maps(),
        vec![project.path(".edge/internal/import_map.json")]
    );
    assert_eq!(compiler.last_env()["EDGE_REGION"], "local");
}

#[tokio::test]
async fn test_deploy_manifest_edit_rebuilds_routes() {
    let project = Project::new();
    project.add_internal_handler("geo");
    project.write(
        ".edge/internal/manifest.json",
        r#"{"version": 1, "functions": [{"function": "geo", "path": "/geo"}]}"#,
    );
    let compiler = ScriptedCompiler::new();
    let registry = start(&project, ProjectConfig::default(), compiler.clone()).await;
    registry.initialize().await.unwrap();
    assert_eq!(handler_names(&registry, "/geo", "GET"), vec!["geo"]);

    let manifest = project.write(
        ".edge/internal/manifest.json",
        r#"{"version": 1, "functions": [{"function": "geo", "path": "/geo2"}]}"#,
    );
    registry.trigger(Intent::FilesChanged(vec![manifest])).unwrap();
    wait_for_status(&registry, |s| s.generation == 2).await;

    assert_eq!(handler_names(&registry, "/geo2", "GET"), vec!["geo"]);
    assert!(handler_names(&registry, "/geo", "GET").is_empty());
    assert_eq!(compiler.calls(), 2);
}

#[tokio::test]
async fn test_handler_replaced_by_rename_is_rebuilt() {
    let project = Project::new();
    let a = project.add_handler("a");
    let compiler = ScriptedCompiler::new();
    let registry = start(&project, parse_config(API_CONFIG), compiler.clone()).await;
    registry.initialize().await.unwrap();
    let mut events = registry.subscribe();

    // Atomic saves show up as an add of the existing path.
    let mut batch = Batch::default();
    batch.added.insert(a.clone());
    for intent in intents_for(batch) {
        registry.trigger(intent).unwrap();
    }

    next_event(&mut events, EventKind::Reloading).await;
    let reloaded = next_event(&mut events, EventKind::Reloaded).await;
    assert_eq!(reloaded.function.as_deref(), Some("a"));
    assert_eq!(compiler.calls(), 2);
}

#[tokio::test]
async fn test_in_source_config_routes_and_warns_on_typo() {
    let project = Project::new();
    project.add_handler("a");
    project.add_handler("b");
    let compiler = ScriptedCompiler::new();
    compiler.set_config(
        "a",
        FunctionConfig {
            path: vec!["/from-source".to_string()],
            method: vec!["get".to_string()],
            ..Default::default()
        },
    );
    compiler.set_config(
        "b",
        serde_json::from_value(serde_json::json!({ "paths": ["/b"] })).unwrap(),
    );

    let registry = start(&project, ProjectConfig::default(), compiler).await;
    let mut events = registry.subscribe();
    registry.initialize().await.unwrap();

    assert_eq!(handler_names(&registry, "/from-source", "GET"), vec!["a"]);
    assert!(handler_names(&registry, "/from-source", "POST").is_empty());

    next_event(&mut events, EventKind::Loaded).await;
    let b = next_event(&mut events, EventKind::Loaded).await;
    assert_eq!(b.function.as_deref(), Some("b"));
    assert!(b
        .warnings
        .contains(&"Unknown 'paths' configuration property. Did you mean 'path'?".to_string()));
}

#[tokio::test]
async fn test_config_change_reloads_declarations() {
    let project = Project::new();
    project.add_handler("a");
    project.add_handler("b");
    project.write("edge.toml", API_CONFIG);

    let compiler = ScriptedCompiler::new();
    let registry = Registry::start(
        RegistryOptions::new(&project.root, parse_config(API_CONFIG)).with_config_path("edge.toml"),
        common::collaborators(compiler),
    )
    .await
    .unwrap();
    registry.initialize().await.unwrap();
    assert!(handler_names(&registry, "/b", "GET").is_empty());

    project.write(
        "edge.toml",
        &format!("{API_CONFIG}\n[[edge_functions]]\nfunction = \"b\"\npath = \"/b\"\n"),
    );
    registry.trigger(Intent::ConfigChanged).unwrap();
    wait_for_status(&registry, |s| s.generation == 2).await;

    assert_eq!(handler_names(&registry, "/b", "GET"), vec!["b"]);
    assert_eq!(handler_names(&registry, "/api/x", "GET"), vec!["a"]);
}

#[tokio::test]
async fn test_invalid_config_keeps_current_declarations() {
    let project = Project::new();
    let a = project.add_handler("a");
    project.write("edge.toml", API_CONFIG);

    let compiler = ScriptedCompiler::new();
    let registry = Registry::start(
        RegistryOptions::new(&project.root, parse_config(API_CONFIG)).with_config_path("edge.toml"),
        common::collaborators(compiler.clone()),
    )
    .await
    .unwrap();
    registry.initialize().await.unwrap();
    let mut events = registry.subscribe();

    project.write("edge.toml", "edge_functions = 42");
    registry.trigger(Intent::ConfigChanged).unwrap();
    registry.trigger(Intent::FilesChanged(vec![a])).unwrap();
    next_event(&mut events, EventKind::Reloaded).await;

    assert_eq!(handler_names(&registry, "/api/x", "GET"), vec!["a"]);
    assert_eq!(compiler.calls(), 2);
}

#[tokio::test]
async fn test_shutdown_stops_actor() {
    let project = Project::new();
    let registry = start(&project, ProjectConfig::default(), ScriptedCompiler::new()).await;
    registry.initialize().await.unwrap();

    registry.shutdown();
    tokio::time::timeout(common::WAIT, registry.stopped()).await.unwrap();
    assert!(registry.trigger(Intent::HandlersChanged).is_err());
}

#[tokio::test]
async fn test_watcher_picks_up_new_handler() {
    let project = Project::new();
    let mut config = parse_config(API_CONFIG);
    config.dev.debounce_ms = 20;
    let registry = Registry::start(
        RegistryOptions::new(&project.root, config).with_watch(true),
        common::collaborators(ScriptedCompiler::new()),
    )
    .await
    .unwrap();
    registry.initialize().await.unwrap();
    let mut events = registry.subscribe();

    // Give the watcher a moment to register before writing.
    tokio::time::sleep(Duration::from_millis(100)).await;
    project.add_handler("a");

    let loaded = next_event(&mut events, EventKind::Loaded).await;
    assert_eq!(loaded.function.as_deref(), Some("a"));
    assert_eq!(handler_names(&registry, "/api/users", "GET"), vec!["a"]);
}
