//! Replay runs over artifacts persisted on disk

use crate::common::{self, FakeFetcher, ScriptedModel};
use scrape_bench::compare::{MatchMethod, Verdict};
use scrape_bench::crawler::FetchRegistry;
use scrape_bench::escalation::{JudgeRegistry, LlmJudge};
use scrape_bench::pipeline::{
    plan_from_store, FailureStage, PlanFilter, RunMode, RunOptions, Runner, UnitKey, UnitStatus,
};
use scrape_bench::schema::{FieldKind, FieldSpec, Schema};
use scrape_bench::storage::{ArtifactStore, FsArtifactStore};
use scrape_bench::{Domain, UnitState};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

fn replay_options() -> RunOptions {
    RunOptions {
        mode: RunMode::Replay,
        ..RunOptions::default()
    }
}

/// Runner over a fresh store rooted at `root`
fn disk_runner(root: &Path, schema: Schema, site: &Domain, options: RunOptions) -> Runner {
    let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(root));
    Runner::new(store, schema, common::ground_truth(&[site]), options)
}

/// Runs one live unit into the artifact store under `root`
async fn live_run(root: &Path, site: &Domain) -> UnitKey {
    let mut fetchers = FetchRegistry::new();
    fetchers.register(FakeFetcher::serving("jina", "Acme, San Francisco. Call (555) 123-4567."));
    let (extractors, _) = common::extractor(common::correct_reply());

    let runner = disk_runner(root, common::schema(), site, RunOptions::default())
        .with_fetchers(fetchers)
        .with_extractors(extractors);

    let unit = UnitKey::new(site, "jina", "openai");
    let outcome = runner.run(vec![unit.clone()]).await;
    assert!(outcome.entry(&unit).unwrap().is_done());
    unit
}

#[tokio::test]
async fn test_replay_scores_from_disk_without_adapters() {
    let dir = tempfile::tempdir().unwrap();
    let site = common::domain("acme.test");
    let unit = live_run(dir.path(), &site).await;

    // A fresh store over the same directory and no adapters at all
    let runner = disk_runner(dir.path(), common::schema(), &site, replay_options());
    let outcome = runner.run(vec![unit.clone()]).await;
    let entry = outcome.entry(&unit).unwrap();

    assert_eq!(entry.state, UnitState::Done);
    assert!(entry.fetch_cached);
    assert!(entry.extract_cached);
    assert_eq!(entry.score().unwrap().accuracy, Some(1.0));
}

#[tokio::test]
async fn test_replay_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let site = common::domain("acme.test");
    let unit = live_run(dir.path(), &site).await;

    let runner = disk_runner(dir.path(), common::schema(), &site, replay_options());

    let first = runner.run(vec![unit.clone()]).await;
    let second = runner.run(vec![unit.clone()]).await;

    assert_eq!(
        first.entry(&unit).unwrap().score(),
        second.entry(&unit).unwrap().score()
    );
}

#[tokio::test]
async fn test_plan_from_store_lists_cached_units() {
    let dir = tempfile::tempdir().unwrap();
    let acme = common::domain("acme.test");
    let globex = common::domain("www.globex.test");
    live_run(dir.path(), &acme).await;
    live_run(dir.path(), &globex).await;

    let store = FsArtifactStore::new(dir.path());
    let all = plan_from_store(&store, &PlanFilter::default()).unwrap();
    assert_eq!(all.len(), 2);

    let filter = PlanFilter {
        domain: Some(common::domain("globex.test")),
        ..PlanFilter::default()
    };
    let only = plan_from_store(&store, &filter).unwrap();
    assert_eq!(only, vec![UnitKey::new(&globex, "jina", "openai")]);
}

#[tokio::test]
async fn test_replay_of_unknown_domain_fails_unit() {
    let dir = tempfile::tempdir().unwrap();
    let site = common::domain("never-fetched.test");

    let runner = disk_runner(dir.path(), common::schema(), &site, replay_options());
    let unit = UnitKey::new(&site, "jina", "openai");
    let outcome = runner.run(vec![unit.clone()]).await;

    let entry = outcome.entry(&unit).unwrap();
    assert_eq!(entry.state, UnitState::Failed);
    assert!(matches!(
        &entry.status,
        UnitStatus::Failed { stage: FailureStage::Fetch, kind, .. } if kind == "missing_artifact"
    ));
}

#[tokio::test]
async fn test_schema_change_makes_extraction_stale() {
    let dir = tempfile::tempdir().unwrap();
    let site = common::domain("acme.test");
    let unit = live_run(dir.path(), &site).await;

    let mut fields = common::schema().fields().to_vec();
    fields.push(FieldSpec::new("founded", FieldKind::Text, "Founding year"));
    let changed = Schema::new(fields);

    let runner = disk_runner(dir.path(), changed, &site, replay_options());
    let outcome = runner.run(vec![unit.clone()]).await;

    let entry = outcome.entry(&unit).unwrap();
    assert!(matches!(
        &entry.status,
        UnitStatus::Failed { stage: FailureStage::Extract, kind, .. } if kind == "stale_artifact"
    ));
}

fn judges(reply: &str) -> (JudgeRegistry, Arc<ScriptedModel>) {
    let model = ScriptedModel::new(reply);
    let mut registry = JudgeRegistry::new();
    registry.register(Arc::new(LlmJudge::new("openai", model.clone())));
    (registry, model)
}

#[tokio::test]
async fn test_replay_reuses_cached_judge_votes() {
    let dir = tempfile::tempdir().unwrap();
    let site = common::domain("acme.test");
    let unit = UnitKey::new(&site, "jina", "openai");

    let mut fetchers = FetchRegistry::new();
    fetchers.register(FakeFetcher::serving("jina", "Acme is based in the Bay Area"));
    let (extractors, _) = common::extractor(json!({
        "phone": "(555) 123-4567",
        "headquarters": "Bay Area"
    }));
    let (live_judges, live_model) = judges(r#"{"match": true, "similarity": 0.9}"#);

    let options = RunOptions {
        escalate: true,
        ..RunOptions::default()
    };
    let live = disk_runner(dir.path(), common::schema(), &site, options)
        .with_fetchers(fetchers)
        .with_extractors(extractors)
        .with_judges(live_judges);
    live.run(vec![unit.clone()]).await;
    assert_eq!(live_model.calls(), 1);

    // The replay judge would disagree, but cached votes win without a call
    let (replay_judges, replay_model) = judges(r#"{"match": false}"#);
    let options = RunOptions {
        escalate: true,
        ..replay_options()
    };
    let replay = disk_runner(dir.path(), common::schema(), &site, options)
        .with_judges(replay_judges);
    let outcome = replay.run(vec![unit.clone()]).await;

    assert_eq!(replay_model.calls(), 0);
    let hq = outcome
        .entry(&unit)
        .and_then(|e| e.score())
        .and_then(|s| s.field("headquarters").cloned())
        .unwrap();
    assert_eq!(hq.verdict, Verdict::PresentCorrect);
    assert_eq!(hq.method, MatchMethod::Judged);
}
