//! End-to-end runs of the benchmark matrix
//!
//! These tests drive the runner with a wiremock site or fake adapters and an
//! in-memory artifact store.

use crate::common::{self, FakeFetcher, ScriptedModel};
use scrape_bench::compare::{GroundTruth, MatchMethod, Verdict};
use scrape_bench::config::Config;
use scrape_bench::crawler::{FetchRegistry, HtmlSource, RetryPolicy, SiteCrawler};
use scrape_bench::escalation::{JudgeRegistry, LlmJudge};
use scrape_bench::extract::LlmExtractor;
use scrape_bench::output::{combo_key, RunParameters, RunReport};
use scrape_bench::pipeline::{plan_matrix, FailureStage, RunOptions, Runner, UnitKey, UnitStatus};
use scrape_bench::storage::MemoryArtifactStore;
use scrape_bench::{Domain, UnitState};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Runner over an in-memory store with ground truth for `sites`
fn live_runner(sites: &[&Domain], options: RunOptions) -> Runner {
    let store = Arc::new(MemoryArtifactStore::new());
    let truth = common::ground_truth(sites);
    Runner::new(store, common::schema(), truth, options)
}

#[tokio::test]
async fn test_crawl_extract_and_score_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r##"<html><body>
                <h1>Acme</h1>
                <a href="mailto:hello@acme.test">Mail</a>
                <a href="#top">Top</a>
                <a href="/login">Login</a>
                <a href="/logo.png">Logo</a>
                <a href="/about">About</a>
            </body></html>"##,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>Call (555) 123-4567</p></body></html>"),
        )
        .mount(&server)
        .await;

    let site = common::domain(&server.uri());
    let crawler = SiteCrawler::new(HtmlSource::new(reqwest::Client::new()), RetryPolicy::new(1))
        .with_scheme("http");
    let mut fetchers = FetchRegistry::new();
    fetchers.register(Arc::new(crawler));
    let (extractors, model) = common::extractor(common::correct_reply());

    let runner = live_runner(&[&site], RunOptions::default())
        .with_fetchers(fetchers)
        .with_extractors(extractors);

    let unit = UnitKey::new(&site, "custom_html", "openai");
    let outcome = runner.run(vec![unit.clone()]).await;
    let entry = outcome.entry(&unit).unwrap();

    assert_eq!(entry.state, UnitState::Done, "{:?}", entry.failure_reason());
    // Only /about survives link filtering
    assert_eq!(entry.link_stats.internal, 1);
    assert_eq!(entry.link_stats.external, 0);
    assert_eq!(entry.pages, 2);
    assert_eq!(model.calls(), 1);

    let score = entry.score().unwrap();
    let phone = score.field("phone").unwrap();
    assert_eq!(phone.verdict, Verdict::PresentCorrect);
    let email = score.field("email").unwrap();
    assert_eq!(email.verdict, Verdict::AbsentExpectedAbsent);
    assert_eq!(score.accuracy, Some(1.0));
}

#[tokio::test]
async fn test_failing_crawler_does_not_affect_others() {
    let site = common::domain("acme.test");
    let broken = FakeFetcher::failing("firecrawl");
    let steady = FakeFetcher::serving("jina", "Acme, San Francisco. Call (555) 123-4567.");

    let mut fetchers = FetchRegistry::new();
    fetchers.register(broken.clone());
    fetchers.register(steady.clone());
    let (extractors, model) = common::extractor(common::correct_reply());

    let runner = live_runner(&[&site], RunOptions::default())
        .with_fetchers(fetchers)
        .with_extractors(extractors);

    let units = plan_matrix(
        &[site.clone()],
        &["firecrawl".to_string(), "jina".to_string()],
        &["openai".to_string()],
    );
    let outcome = runner.run(units).await;

    assert_eq!(outcome.entries.len(), 2);
    assert_eq!(outcome.done_count(), 1);
    assert_eq!(outcome.failed_count(), 1);

    let failed = outcome
        .entry(&UnitKey::new(&site, "firecrawl", "openai"))
        .unwrap();
    assert!(matches!(
        &failed.status,
        UnitStatus::Failed { stage: FailureStage::Fetch, kind, .. } if kind == "blocked"
    ));
    let done = outcome
        .entry(&UnitKey::new(&site, "jina", "openai"))
        .unwrap();
    assert_eq!(done.score().unwrap().accuracy, Some(1.0));

    assert_eq!(broken.calls(), 1);
    assert_eq!(steady.calls(), 1);
    // The broken crawler never reached the extractor
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn test_one_fetch_serves_every_extractor() {
    let site = common::domain("acme.test");
    let fetcher = FakeFetcher::serving("jina", "Acme homepage");

    let mut fetchers = FetchRegistry::new();
    fetchers.register(fetcher.clone());
    let (mut extractors, _) = common::extractor(common::correct_reply());
    let claude = ScriptedModel::new(json!({"phone": null}).to_string());
    extractors.register(Arc::new(LlmExtractor::new("claude", claude.clone())));

    let runner = live_runner(&[&site], RunOptions::default())
        .with_fetchers(fetchers)
        .with_extractors(extractors);

    let units = plan_matrix(
        &[site.clone()],
        &["jina".to_string()],
        &["openai".to_string(), "claude".to_string()],
    );
    let outcome = runner.run(units).await;

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(claude.calls(), 1);
    assert_eq!(outcome.done_count(), 2);

    let claude_score = outcome
        .entry(&UnitKey::new(&site, "jina", "claude"))
        .and_then(|e| e.score())
        .unwrap();
    assert_eq!(
        claude_score.field("phone").unwrap().verdict,
        Verdict::AbsentExpectedPresent
    );
}

#[tokio::test]
async fn test_domain_without_ground_truth_is_unverifiable() {
    let site = common::domain("unknown.test");
    let mut fetchers = FetchRegistry::new();
    fetchers.register(FakeFetcher::serving("jina", "Some company"));
    let (extractors, _) = common::extractor(common::correct_reply());

    let store = Arc::new(MemoryArtifactStore::new());
    let options = RunOptions::default();
    let runner = Runner::new(store, common::schema(), GroundTruth::new(), options)
        .with_fetchers(fetchers)
        .with_extractors(extractors);

    let unit = UnitKey::new(&site, "jina", "openai");
    let outcome = runner.run(vec![unit.clone()]).await;
    let score = outcome.entry(&unit).and_then(|e| e.score()).unwrap();

    assert!(score
        .fields
        .iter()
        .all(|f| f.verdict == Verdict::PresentUnverifiable));
    assert_eq!(score.accuracy, None);
}

fn escalation_runner(site: &Domain, judge_replies: &[&str]) -> (Runner, Vec<Arc<ScriptedModel>>) {
    let mut fetchers = FetchRegistry::new();
    fetchers.register(FakeFetcher::serving("jina", "Acme is based in the Bay Area"));
    let (extractors, _) = common::extractor(json!({
        "phone": "(555) 123-4567",
        "email": null,
        "headquarters": "Bay Area"
    }));

    let mut judges = JudgeRegistry::new();
    let mut models = Vec::new();
    for (index, reply) in judge_replies.iter().enumerate() {
        let model = ScriptedModel::new(*reply);
        let judge = LlmJudge::new(&format!("judge{}", index), model.clone());
        judges.register(Arc::new(judge));
        models.push(model);
    }

    let options = RunOptions {
        escalate: true,
        ..RunOptions::default()
    };
    let runner = live_runner(&[site], options)
        .with_fetchers(fetchers)
        .with_extractors(extractors)
        .with_judges(judges);
    (runner, models)
}

#[tokio::test]
async fn test_judge_majority_accepts_value() {
    let site = common::domain("acme.test");
    let replies = [
        r#"{"match": true, "similarity": 0.8}"#,
        r#"{"match": true, "similarity": 0.7}"#,
    ];
    let (runner, models) = escalation_runner(&site, &replies);

    let unit = UnitKey::new(&site, "jina", "openai");
    let outcome = runner.run(vec![unit.clone()]).await;
    let entry = outcome.entry(&unit).unwrap();
    let hq = entry.score().unwrap().field("headquarters").unwrap();

    assert_eq!(hq.verdict, Verdict::PresentCorrect);
    assert_eq!(hq.method, MatchMethod::Judged);
    assert_eq!(entry.escalated, 1);
    // Only the unsettled field is escalated
    assert!(models.iter().all(|m| m.calls() == 1));
}

#[tokio::test]
async fn test_judge_tie_counts_as_incorrect() {
    let site = common::domain("acme.test");
    let replies = [r#"{"match": true}"#, r#"{"match": false}"#];
    let (runner, _) = escalation_runner(&site, &replies);

    let unit = UnitKey::new(&site, "jina", "openai");
    let outcome = runner.run(vec![unit.clone()]).await;
    let score = outcome.entry(&unit).and_then(|e| e.score()).unwrap();
    let hq = score.field("headquarters").unwrap();

    assert_eq!(hq.verdict, Verdict::PresentIncorrect);
    assert_eq!(hq.method, MatchMethod::Judged);
    assert!(!hq.escalation_candidate);
}

#[tokio::test]
async fn test_judge_failures_abstain() {
    let site = common::domain("acme.test");
    let (runner, _) = escalation_runner(&site, &["I cannot decide", r#"{"match": true}"#]);

    let unit = UnitKey::new(&site, "jina", "openai");
    let outcome = runner.run(vec![unit.clone()]).await;
    let hq = outcome
        .entry(&unit)
        .and_then(|e| e.score())
        .and_then(|s| s.field("headquarters").cloned())
        .unwrap();

    // One abstain and one match resolves to a match
    assert_eq!(hq.verdict, Verdict::PresentCorrect);
}

#[tokio::test]
async fn test_every_judge_failing_is_not_a_judgement() {
    let site = common::domain("acme.test");
    let (runner, _) = escalation_runner(&site, &["no idea", "still no idea"]);

    let unit = UnitKey::new(&site, "jina", "openai");
    let outcome = runner.run(vec![unit.clone()]).await;
    let hq = outcome
        .entry(&unit)
        .and_then(|e| e.score())
        .and_then(|s| s.field("headquarters").cloned())
        .unwrap();

    assert_eq!(hq.verdict, Verdict::PresentIncorrect);
    assert_ne!(hq.method, MatchMethod::Judged);
    assert!(!hq.escalation_candidate);
}

#[tokio::test]
async fn test_report_groups_units() {
    let site = common::domain("acme.test");
    let mut fetchers = FetchRegistry::new();
    fetchers.register(FakeFetcher::failing("firecrawl"));
    fetchers.register(FakeFetcher::serving("jina", "Acme"));
    let (extractors, _) = common::extractor(common::correct_reply());

    let options = RunOptions::default();
    let runner = live_runner(&[&site], options.clone())
        .with_fetchers(fetchers)
        .with_extractors(extractors);

    let units = plan_matrix(
        &[site.clone()],
        &["firecrawl".to_string(), "jina".to_string()],
        &["openai".to_string()],
    );
    let outcome = runner.run(units).await;

    let mut config = Config::default();
    config.run.crawlers = vec!["firecrawl".to_string(), "jina".to_string()];
    config.run.extractors = vec!["openai".to_string()];
    let parameters = RunParameters::new(&config, &options);
    let report = RunReport::from_outcome(&outcome, parameters, "abc123");

    assert_eq!(report.metadata.total_units, 2);
    assert_eq!(report.metadata.total_domains, 1);
    assert_eq!(report.metadata.fingerprint, "abc123");
    assert!(report.entries.contains_key("acme.test|jina|openai"));

    let jina = &report.summary.by_combo[&combo_key("jina", "openai")];
    assert_eq!(jina.done, 1);
    assert_eq!(jina.accuracy, Some(1.0));

    let openai = &report.summary.by_extractor["openai"];
    assert_eq!(openai.units, 2);
    assert_eq!(openai.failed, 1);
    assert_eq!(report.failed_entries().count(), 1);

    let acme = &report.summary.by_domain["acme.test"];
    assert_eq!((acme.units, acme.done, acme.failed), (2, 1, 1));
    assert_eq!(acme.accuracy, Some(1.0));
    assert_eq!(report.summary.by_domain.len(), 1);
}
