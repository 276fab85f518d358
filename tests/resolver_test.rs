use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use depgraph_core::error::{DepGraphError, DepGraphResult};
use depgraph_core::graph::{EdgeLabel, JsonGraphStore, LookupMode, MemoryGraphStore};
use depgraph_core::package::{PackageMetadata, PackageName, Pin};
use depgraph_core::requirements::Requirements;
use depgraph_resolver::{GraphResolver, MemoryRegistry, Registry, ResolverOptions};

fn name(s: &str) -> PackageName {
    PackageName::new(s).unwrap()
}

fn registry() -> MemoryRegistry {
    MemoryRegistry::new()
        .with_release("flask", "2.0.0", &["Werkzeug (>=2.0)", "click>=7.1.2", "itsdangerous>=2.0"], Some(">=3.6"))
        .with_release("celery", "5.2.0", &["click>=8.0,<9.0", "kombu>=5.2"], Some(">=3.7"))
        .with_release("werkzeug", "2.0.0", &[], Some(">=3.6"))
        .with_release("click", "7.1.2", &[], None)
        .with_published("click", &["7.0", "7.1.2", "8.0.0", "8.0.3", "8.1.7", "9.0.0"])
        .with_published("itsdangerous", &["2.0.0", "2.1.2"])
        .with_published("kombu", &["5.2.0", "5.3.1"])
}

#[tokio::test]
async fn test_requirements_file_to_graph() {
    let requirements = Requirements::parse(
        "# web stack\nFlask==2.0.0\ncelery==5.2.0  # workers\nnot a pin\n",
    );
    assert_eq!(requirements.invalid, vec!["not a pin"]);

    let resolver = GraphResolver::new(registry(), ResolverOptions::default());
    let mut store = MemoryGraphStore::new(LookupMode::Exact);
    let metrics = resolver
        .resolve_requirements(&mut store, &requirements.pins)
        .await
        .unwrap();

    assert_eq!(metrics.root_count, 2);
    assert_eq!(store.node(&name("flask")).unwrap().version, "2.0.0");
    assert_eq!(store.node(&name("werkzeug")).unwrap().version, ">=2.0");
    // click is reached from both roots and narrowed to what both admit
    assert_eq!(store.node(&name("click")).unwrap().version, ">=8.0.0,<=8.1.7");
    assert_eq!(
        store.edge(&name("celery"), &name("click")),
        Some(EdgeLabel::DependsOn)
    );
    let dot = store.to_dot();
    assert!(dot.contains("flask 2.0.0"));
    assert!(dot.contains("DEPENDS_ON"));
}

#[tokio::test]
async fn test_runs_merge_into_the_same_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("graph.json");
    let resolver = GraphResolver::new(registry(), ResolverOptions::default());

    {
        let mut store = JsonGraphStore::open(&path, LookupMode::Exact).await.unwrap();
        resolver
            .resolve_requirements(&mut store, &[Pin::new(name("flask"), "2.0.0")])
            .await
            .unwrap();
    }
    let first: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(first["nodes"].as_array().unwrap().len(), 4);

    let mut store = JsonGraphStore::open(&path, LookupMode::Exact).await.unwrap();
    resolver
        .resolve_requirements(&mut store, &[Pin::new(name("celery"), "5.2.0")])
        .await
        .unwrap();

    let graph = store.graph();
    assert_eq!(graph.node_count(), 6);
    assert!(graph.node(&name("flask")).is_some());
    assert!(graph.node(&name("kombu")).is_some());
}

#[tokio::test]
async fn test_conflict_between_roots() {
    let registry = MemoryRegistry::new()
        .with_release("app", "1.0", &["urllib3>=2.0"], None)
        .with_release("legacy-client", "0.9", &["urllib3<1.27"], None)
        .with_published("urllib3", &["1.26.18", "2.0.7", "2.2.1"]);
    let resolver = GraphResolver::new(registry, ResolverOptions::default());
    let mut store = MemoryGraphStore::default();

    let err = resolver
        .resolve_requirements(
            &mut store,
            &[
                Pin::new(name("app"), "1.0"),
                Pin::new(name("legacy-client"), "0.9"),
            ],
        )
        .await
        .unwrap_err();

    assert!(err.is_conflict());
    assert_eq!(
        err.to_string(),
        "Change the versions of legacy-client/urllib3, currently incompatible (rejected <1.27)"
    );
    assert_eq!(
        store.edge(&name("legacy-client"), &name("urllib3")),
        Some(EdgeLabel::IncompatibleUpgradeRequired)
    );
}

/// Registry that fails every other request
struct FlakyRegistry {
    inner: MemoryRegistry,
    calls: AtomicUsize,
}

#[async_trait]
impl Registry for FlakyRegistry {
    async fn get_metadata(
        &self,
        name: &PackageName,
        version: Option<&str>,
    ) -> DepGraphResult<PackageMetadata> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
            return Err(DepGraphError::network("connection reset"));
        }
        self.inner.get_metadata(name, version).await
    }

    async fn get_published_versions(&self, name: &PackageName) -> DepGraphResult<Vec<String>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 1 {
            return Err(DepGraphError::network("connection reset"));
        }
        self.inner.get_published_versions(name).await
    }
}

#[tokio::test]
async fn test_flaky_registry_still_builds_a_graph() {
    let registry = FlakyRegistry {
        inner: registry(),
        calls: AtomicUsize::new(0),
    };
    let resolver = GraphResolver::new(registry, ResolverOptions::default());
    let mut store = MemoryGraphStore::default();

    let result = resolver
        .resolve_requirements(
            &mut store,
            &[
                Pin::new(name("flask"), "2.0.0"),
                Pin::new(name("celery"), "5.2.0"),
            ],
        )
        .await;

    // Failed fetches degrade to empty answers; a root is always recorded
    match result {
        Ok(metrics) => assert_eq!(metrics.root_count, 2),
        Err(e) => assert!(e.is_conflict(), "unexpected error: {e}"),
    }
    assert!(store.node(&name("flask")).is_some());
}
