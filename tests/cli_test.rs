use std::path::Path;
use std::process::{Command, Output};

use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RELEASES: &str = r#"releases = ["3.8", "3.9", "3.10", "3.11", "3.12"]"#;

fn workspace(registry_url: &str, requirements: &str) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("depgraph.toml"),
        format!(
            "[registry]\nurl = \"{}\"\nconnect_timeout = 2\nrequest_timeout = 5\n\n[runtime]\n{}\n\n[graph]\npath = \"graph.json\"\n\n[logging]\nansi = false\n",
            registry_url, RELEASES
        ),
    )
    .unwrap();
    std::fs::write(dir.path().join("requirements.txt"), requirements).unwrap();
    dir
}

fn depgraph(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("depgraph").unwrap();
    cmd.current_dir(dir)
        .env_remove("DEPGRAPH_REGISTRY_URL")
        .env_remove("DEPGRAPH_GRAPH_PATH")
        .env_remove("DEPGRAPH_TARGET_RUNTIME")
        .env_remove("RUST_LOG");
    cmd
}

/// Nothing listens on the discard port, so every registry request fails fast
const UNREACHABLE: &str = "http://127.0.0.1:9/pypi";

#[test]
fn test_help() {
    Command::cargo_bin("depgraph")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("graph"))
        .stdout(predicate::str::contains("compat"));
}

#[test]
fn test_missing_requirements_file() {
    let dir = workspace(UNREACHABLE, "");
    depgraph(dir.path())
        .args(["--requirements", "missing.txt", "--target", "3.12"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("missing.txt"));
}

#[test]
fn test_offline_check() {
    let dir = workspace(UNREACHABLE, "six==1.16.0\nflask>=2\n");
    depgraph(dir.path())
        .args(["--target", "3.12"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Graph written to"))
        .stdout(predicate::str::contains(
            "Compatible Python versions for all packages: any",
        ))
        .stdout(predicate::str::contains("Minimum Python version: 3.8"))
        .stdout(predicate::str::contains("Maximum Python version: 3.12"))
        .stdout(predicate::str::contains("flask>=2"))
        .stdout(predicate::str::contains("All pinned packages support Python 3.12"));

    let snapshot: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("graph.json")).unwrap())
            .unwrap();
    assert_eq!(snapshot["nodes"].as_array().unwrap().len(), 1);
}

#[test]
fn test_graph_writes_dot() {
    let dir = workspace(UNREACHABLE, "six==1.16.0\n");
    depgraph(dir.path())
        .args(["graph", "--dot", "graph.dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("DOT graph written to graph.dot"));

    let dot = std::fs::read_to_string(dir.path().join("graph.dot")).unwrap();
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("six 1.16.0"));
}

#[test]
fn test_invalid_target() {
    let dir = workspace(UNREACHABLE, "six==1.16.0\n");
    depgraph(dir.path())
        .args(["--target", "banana", "compat"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid target Python version"));
}

#[test]
fn test_missing_target_without_terminal() {
    let dir = workspace(UNREACHABLE, "six==1.16.0\n");
    depgraph(dir.path())
        .arg("compat")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--target"));
}

async fn run(mut cmd: Command) -> Output {
    tokio::task::spawn_blocking(move || cmd.output())
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_conflict_exits_with_two() {
    let server = MockServer::start().await;
    let release = |name: &str, version: &str, requires: &[&str]| {
        json!({
            "info": {
                "name": name,
                "version": version,
                "requires_python": ">=3.8",
                "requires_dist": requires,
            },
            "releases": {}
        })
    };
    Mock::given(method("GET"))
        .and(path("/pypi/a/1.0/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release("a", "1.0", &["c (>=1.0)"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pypi/b/1.0/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(release("b", "1.0", &["c (>=5.0)"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pypi/c/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "info": {"name": "c", "version": "2.0", "requires_python": null, "requires_dist": null},
            "releases": {"1.0": [], "2.0": []}
        })))
        .mount(&server)
        .await;

    let dir = workspace(&format!("{}/pypi", server.uri()), "a==1.0\nb==1.0\n");
    let mut cmd = depgraph(dir.path());
    cmd.args(["--target", "3.12"]);
    let output = run(cmd).await;

    output
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "Change the versions of b/c, currently incompatible",
        ))
        .stdout(predicate::str::contains("Compatible Python versions").not());

    let snapshot = std::fs::read_to_string(dir.path().join("graph.json")).unwrap();
    assert!(snapshot.contains("INCOMPATIBLE_UPGRADE_REQUIRED"));
}
