//! Integration tests for action upgrades
//!
//! Workflows on disk are upgraded against a table-driven resolver in each
//! output format, with and without version constraints.

mod common;

use std::sync::Arc;

use common::*;
use github_ci::config::Config;
use github_ci::upgrade::Upgrader;
use github_ci::workflow;
use pretty_assertions::assert_eq;

const WORKFLOW: &str = "\
name: Release
on: push
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3
      - uses: someone/unlisted@v1
      - uses: ./local
";

fn upgrader(config: &str) -> Upgrader {
    Upgrader::new(
        Arc::new(StaticResolver::checkout()),
        Arc::new(Config::from_yaml(config).unwrap()),
    )
}

async fn upgrade(repo: &TestRepo, config: &str, dry_run: bool) -> Vec<github_ci::upgrade::Upgrade> {
    let mut workflows = workflow::load_workflows(repo.workflows_dir()).unwrap();
    upgrader(config).run(&mut workflows, dry_run).await.unwrap()
}

#[tokio::test]
async fn test_upgrade_to_latest_tag() {
    let repo = TestRepo::new();
    let path = repo.add_workflow("release.yml", WORKFLOW);

    let upgrades = upgrade(&repo, "", false).await;

    assert_eq!(upgrades.len(), 1);
    assert_eq!(upgrades[0].to_string(), "release.yml:7: actions/checkout v3 -> v4.2.2");
    let written = repo.read(&path);
    assert!(written.contains("      - uses: actions/checkout@v4.2.2\n"));
    assert!(written.contains("someone/unlisted@v1"));
}

#[tokio::test]
async fn test_upgrade_writes_hash_with_tag_comment() {
    let repo = TestRepo::new();
    let path = repo.add_workflow("release.yml", WORKFLOW);

    upgrade(&repo, "upgrade:\n  version: hash\n", false).await;

    assert!(repo
        .read(&path)
        .contains(&format!("actions/checkout@{CHECKOUT_V4_HASH} # v4.2.2\n")));
}

#[tokio::test]
async fn test_upgrade_writes_major_only() {
    let repo = TestRepo::new();
    let path = repo.add_workflow("release.yml", WORKFLOW);

    upgrade(&repo, "upgrade:\n  version: major\n", false).await;

    assert!(repo.read(&path).contains("      - uses: actions/checkout@v4\n"));
}

#[tokio::test]
async fn test_constraint_limits_upgrade() {
    let repo = TestRepo::new();
    let path = repo.add_workflow("release.yml", WORKFLOW);

    let upgrades = upgrade(
        &repo,
        "upgrade:\n  actions:\n    actions/checkout:\n      version: ^3.0.0\n",
        false,
    )
    .await;

    assert_eq!(upgrades[0].to, "v3.5.0");
    assert!(repo.read(&path).contains("actions/checkout@v3.5.0\n"));
}

#[tokio::test]
async fn test_pinned_reference_upgrades_from_its_tag() {
    let repo = TestRepo::new();
    let path = repo.add_workflow(
        "ci.yml",
        &format!(
            "on: push\njobs:\n  a:\n    steps:\n      - uses: actions/checkout@{CHECKOUT_V3_HASH} # v3.5.0\n"
        ),
    );

    let upgrades = upgrade(&repo, "upgrade:\n  version: hash\n", false).await;

    assert_eq!(upgrades[0].from, "v3.5.0");
    assert_eq!(upgrades[0].to, "v4.2.2");
    let written = repo.read(&path);
    assert!(written.contains(&format!("actions/checkout@{CHECKOUT_V4_HASH} # v4.2.2\n")));
    assert!(!written.contains(CHECKOUT_V3_HASH));
}

#[tokio::test]
async fn test_dry_run_leaves_files_alone() {
    let repo = TestRepo::new();
    let path = repo.add_workflow("release.yml", WORKFLOW);

    let upgrades = upgrade(&repo, "", true).await;

    assert_eq!(upgrades.len(), 1);
    assert_eq!(repo.read(&path), WORKFLOW);
}

#[tokio::test]
async fn test_up_to_date_reference_is_left_alone() {
    let repo = TestRepo::new();
    let content = "on: push\njobs:\n  a:\n    steps:\n      - uses: actions/checkout@v4.2.2\n";
    let path = repo.add_workflow("ci.yml", content);

    let upgrades = upgrade(&repo, "", false).await;

    assert!(upgrades.is_empty());
    assert_eq!(repo.read(&path), content);
}
