//! Pipeline runner - orchestrates the (domain × crawler × extractor) matrix
//!
//! Each (domain, crawler) pair is one task: it fetches once (or loads the
//! cached page set) and then fans out to every extractor of the pair. Fetches
//! are bounded per crawler, extractor and judge calls share one run-wide
//! limiter. A failing unit is recorded and never stops the others.

use super::unit::{FailureStage, Unit, UnitEntry, UnitFailure, UnitKey};
use crate::compare::{compare, GroundTruth, Score};
use crate::config::Config;
use crate::crawler::{FetchBudget, FetchError, FetchRegistry, PageSet};
use crate::escalation::{Escalator, JudgePolicy, JudgeRegistry};
use crate::extract::{ExtractError, ExtractionRecord, ExtractorRegistry};
use crate::schema::Schema;
use crate::state::UnitState;
use crate::storage::{
    self, extract_fingerprint, fetch_fingerprint, ArtifactKey, ArtifactStore, CacheLookup, Stage,
};
use crate::url::Domain;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Whether adapters may be called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Cached artifacts are reused when valid, everything else is produced
    Live,
    /// Only cached artifacts are used; no fetch or extract adapter is called
    Replay,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Replay => "replay",
        }
    }
}

/// Knobs for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RunMode,
    pub budget: FetchBudget,
    pub save_intermediate: bool,
    pub escalate: bool,
    pub force_judges: bool,
    /// Simultaneous fetches per crawler
    pub fetch_concurrency: usize,
    /// Simultaneous extractor and judge calls across the run
    pub extract_concurrency: usize,
    pub timeout: Option<Duration>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            mode: RunMode::Live,
            budget: FetchBudget::new(10),
            save_intermediate: true,
            escalate: false,
            force_judges: false,
            fetch_concurrency: 2,
            extract_concurrency: 4,
            timeout: None,
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &Config, mode: RunMode) -> Self {
        Self {
            mode,
            budget: FetchBudget {
                max_pages: config.run.max_pages,
                pages: config.run.pages.clone(),
            },
            save_intermediate: config.run.save_intermediate,
            escalate: config.escalation.enabled,
            force_judges: config.escalation.force,
            fetch_concurrency: config.concurrency.fetch_per_crawler,
            extract_concurrency: config.concurrency.extract,
            timeout: config.run.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Judge policy implied by the mode and the force flag
    pub fn judge_policy(&self) -> JudgePolicy {
        match (self.force_judges, self.mode) {
            (true, _) => JudgePolicy::Force,
            (false, RunMode::Live) => JudgePolicy::CacheOrInvoke,
            (false, RunMode::Replay) => JudgePolicy::CacheOnly,
        }
    }
}

/// Every unit's entry after a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub entries: BTreeMap<UnitKey, UnitEntry>,
    /// The run was cancelled or hit its timeout
    pub cancelled: bool,
}

impl RunOutcome {
    pub fn done_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_done()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.len() - self.done_count()
    }

    pub fn entry(&self, key: &UnitKey) -> Option<&UnitEntry> {
        self.entries.get(key)
    }
}

/// A fetched page set and where it came from
struct Fetched {
    pages: PageSet,
    cached: bool,
}

/// Shared, read-only state of a run handed to every task
struct RunContext {
    store: Arc<dyn ArtifactStore>,
    schema: Arc<Schema>,
    schema_fingerprint: String,
    ground_truth: Arc<GroundTruth>,
    options: RunOptions,
    fetchers: FetchRegistry,
    extractors: ExtractorRegistry,
    escalator: Option<Escalator>,
    extract_limiter: Arc<Semaphore>,
    cancel: CancellationToken,
}

/// Runs benchmark units against injected adapters and an artifact store
pub struct Runner {
    store: Arc<dyn ArtifactStore>,
    schema: Arc<Schema>,
    ground_truth: Arc<GroundTruth>,
    options: RunOptions,
    fetchers: FetchRegistry,
    extractors: ExtractorRegistry,
    judges: JudgeRegistry,
    cancel: CancellationToken,
}

impl Runner {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        schema: Schema,
        ground_truth: GroundTruth,
        options: RunOptions,
    ) -> Self {
        Self {
            store,
            schema: Arc::new(schema),
            ground_truth: Arc::new(ground_truth),
            options,
            fetchers: FetchRegistry::new(),
            extractors: ExtractorRegistry::new(),
            judges: JudgeRegistry::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_fetchers(mut self, fetchers: FetchRegistry) -> Self {
        self.fetchers = fetchers;
        self
    }

    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn with_judges(mut self, judges: JudgeRegistry) -> Self {
        self.judges = judges;
        self
    }

    /// Token that cancels the run when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Runs every unit and returns one entry per requested unit
    pub async fn run(&self, units: Vec<UnitKey>) -> RunOutcome {
        let started_at = Utc::now();
        let start = Instant::now();
        let context = Arc::new(self.context());

        // Group units into (domain, crawler) fetch jobs
        let mut jobs: BTreeMap<(Domain, String), Vec<String>> = BTreeMap::new();
        for unit in &units {
            let extractors = jobs
                .entry((unit.domain.clone(), unit.crawler.clone()))
                .or_default();
            if !extractors.contains(&unit.extractor) {
                extractors.push(unit.extractor.clone());
            }
        }

        tracing::info!(
            "Starting {} run: {} units across {} fetch jobs",
            self.options.mode.as_str(),
            units.len(),
            jobs.len()
        );

        let timer = self.options.timeout.map(|timeout| {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                tracing::warn!("Run timeout of {:?} reached, cancelling", timeout);
                cancel.cancel();
            })
        });

        let mut fetch_limiters: HashMap<String, Arc<Semaphore>> = HashMap::new();
        let mut tasks = JoinSet::new();
        for ((domain, crawler), extractors) in jobs {
            let limiter = fetch_limiters
                .entry(crawler.clone())
                .or_insert_with(|| Arc::new(Semaphore::new(self.options.fetch_concurrency)))
                .clone();
            let context = Arc::clone(&context);
            tasks.spawn(async move {
                context
                    .process_pair(domain, crawler, extractors, limiter)
                    .await
            });
        }

        let mut entries = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(done) => {
                    for entry in done {
                        entries.insert(entry.key.clone(), entry);
                    }
                }
                Err(e) => tracing::error!("Fetch job panicked: {}", e),
            }
        }

        if let Some(timer) = timer {
            timer.abort();
        }

        // Every requested unit is listed, even when its task died
        for key in units {
            if !entries.contains_key(&key) {
                let failure = UnitFailure::new(
                    FailureStage::Fetch,
                    "aborted",
                    "unit task did not complete",
                );
                entries.insert(key.clone(), Unit::new(key).fail(failure));
            }
        }

        let outcome = RunOutcome {
            mode: self.options.mode,
            started_at,
            finished_at: Utc::now(),
            entries,
            cancelled: self.cancel.is_cancelled(),
        };

        tracing::info!(
            "Run finished in {:.1}s: {} done, {} failed",
            start.elapsed().as_secs_f64(),
            outcome.done_count(),
            outcome.failed_count()
        );
        outcome
    }

    fn context(&self) -> RunContext {
        let escalator = if self.options.escalate && !self.judges.is_empty() {
            let escalator = Escalator::new(
                self.judges.clone(),
                Arc::clone(&self.store),
                self.options.judge_policy(),
            );
            Some(if self.options.save_intermediate {
                escalator
            } else {
                escalator.without_saving()
            })
        } else {
            None
        };

        RunContext {
            store: Arc::clone(&self.store),
            schema: Arc::clone(&self.schema),
            schema_fingerprint: self.schema.fingerprint(),
            ground_truth: Arc::clone(&self.ground_truth),
            options: self.options.clone(),
            fetchers: self.fetchers.clone(),
            extractors: self.extractors.clone(),
            escalator,
            extract_limiter: Arc::new(Semaphore::new(self.options.extract_concurrency)),
            cancel: self.cancel.clone(),
        }
    }
}

impl RunContext {
    /// Fetches once for a (domain, crawler) pair and finishes each of its units
    async fn process_pair(
        &self,
        domain: Domain,
        crawler: String,
        extractors: Vec<String>,
        fetch_limiter: Arc<Semaphore>,
    ) -> Vec<UnitEntry> {
        let units: Vec<Unit> = extractors
            .iter()
            .map(|extractor| Unit::new(UnitKey::new(&domain, &crawler, extractor)))
            .collect();

        let fetched = if self.cancel.is_cancelled() {
            Err(UnitFailure::cancelled(FailureStage::Fetch))
        } else {
            self.fetch_pages(&domain, &crawler, &fetch_limiter).await
        };

        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(failure) => {
                return units
                    .into_iter()
                    .map(|unit| unit.fail(failure.clone()))
                    .collect();
            }
        };

        join_all(units.into_iter().map(|unit| self.complete_unit(unit, &fetched))).await
    }

    /// Cached or fresh page set for (domain, crawler)
    async fn fetch_pages(
        &self,
        domain: &Domain,
        crawler: &str,
        limiter: &Semaphore,
    ) -> Result<Fetched, UnitFailure> {
        let key = ArtifactKey::fetch(domain, crawler);
        let store = self.store.as_ref();

        if self.options.mode == RunMode::Replay {
            return match storage::lookup::<PageSet>(store, Stage::Fetch, &key, None) {
                CacheLookup::Hit(pages) => Ok(Fetched {
                    pages,
                    cached: true,
                }),
                other => Err(UnitFailure::new(
                    FailureStage::Fetch,
                    "missing_artifact",
                    format!("no usable fetch artifact for {} ({})", key, other.label()),
                )),
            };
        }

        let fingerprint = fetch_fingerprint(&self.options.budget);
        let cached = storage::lookup::<PageSet>(store, Stage::Fetch, &key, Some(&fingerprint));
        if let CacheLookup::Hit(pages) = cached {
            return Ok(Fetched {
                pages,
                cached: true,
            });
        }

        let adapter = self.fetchers.get(crawler).ok_or_else(|| {
            UnitFailure::new(
                FailureStage::Fetch,
                "unknown_backend",
                format!("no crawler registered as '{}'", crawler),
            )
        })?;

        tracing::debug!("Fetching {} with {}", domain, crawler);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled),
            result = async {
                let _permit = limiter.acquire().await;
                adapter.fetch(domain, &self.options.budget).await
            } => result,
        };

        let pages = result
            .map_err(|e| UnitFailure::new(FailureStage::Fetch, e.kind(), e.to_string()))?;
        tracing::info!(
            "Fetched {} with {}: {} pages in {}ms",
            domain,
            crawler,
            pages.pages.len(),
            pages.duration_ms
        );

        if self.options.save_intermediate {
            if let Err(e) = storage::store(store, Stage::Fetch, &key, &fingerprint, &pages) {
                tracing::warn!("Failed to save fetch artifact {}: {}", key, e);
            }
        }
        Ok(Fetched {
            pages,
            cached: false,
        })
    }

    async fn complete_unit(&self, mut unit: Unit, fetched: &Fetched) -> UnitEntry {
        let (score, escalated) = match self.score_unit(&mut unit, fetched).await {
            Ok(scored) => scored,
            Err(failure) => return unit.fail(failure),
        };

        let key = unit.key.clone();
        let entry = match unit.finish(score, escalated) {
            Ok(entry) => entry,
            Err((unit, failure)) => return unit.fail(failure),
        };

        if self.options.save_intermediate {
            if let Err(e) = storage::store(
                self.store.as_ref(),
                Stage::Compare,
                &key.extract_key(),
                &self.schema_fingerprint,
                &entry,
            ) {
                tracing::warn!("Failed to save compare artifact for {}: {}", key, e);
            }
        }
        entry
    }

    /// Runs the unit from `Pending` up to a scored `Comparing` state
    async fn score_unit(
        &self,
        unit: &mut Unit,
        fetched: &Fetched,
    ) -> Result<(Score, usize), UnitFailure> {
        if !fetched.cached {
            unit.advance(UnitState::Fetching)?;
        }
        unit.advance(UnitState::Fetched)?;
        unit.pages = fetched.pages.pages.len();
        unit.link_stats = fetched.pages.link_stats;
        unit.fetch_cached = fetched.cached;

        let record = self.extraction(unit, &fetched.pages).await?;

        unit.advance(UnitState::Comparing)?;
        let truth = self.ground_truth.get(&unit.key.domain);
        let mut score = compare(&record, truth, &self.schema);

        let escalated = match &self.escalator {
            Some(escalator) => {
                escalator
                    .escalate(
                        &unit.key.extract_key(),
                        &self.schema,
                        &mut score,
                        &self.extract_limiter,
                        &self.cancel,
                    )
                    .await
            }
            None => 0,
        };

        Ok((score, escalated))
    }

    /// Cached or fresh extraction record for the unit
    async fn extraction(
        &self,
        unit: &mut Unit,
        pages: &PageSet,
    ) -> Result<ExtractionRecord, UnitFailure> {
        let key = unit.key.extract_key();
        let store = self.store.as_ref();
        let fingerprint = extract_fingerprint(&self.schema_fingerprint, &pages.content_digest());

        match storage::lookup::<ExtractionRecord>(store, Stage::Extract, &key, Some(&fingerprint)) {
            CacheLookup::Hit(record) => {
                unit.extract_cached = true;
                unit.advance(UnitState::Extracted)?;
                return Ok(record);
            }
            other if self.options.mode == RunMode::Replay => {
                unit.advance(UnitState::Extracting)?;
                let kind = match other {
                    CacheLookup::Stale { .. } => "stale_artifact",
                    _ => "missing_artifact",
                };
                return Err(UnitFailure::new(
                    FailureStage::Extract,
                    kind,
                    format!("no usable extract artifact for {} ({})", key, other.label()),
                ));
            }
            _ => {}
        }

        unit.advance(UnitState::Extracting)?;
        let record = if pages.is_empty() {
            tracing::debug!("{}: empty page set, recording every field absent", unit.key);
            ExtractionRecord::all_absent(
                &unit.key.domain,
                &unit.key.crawler,
                &unit.key.extractor,
                &self.schema,
            )
        } else {
            let extractor = self.extractors.get(&unit.key.extractor).ok_or_else(|| {
                UnitFailure::new(
                    FailureStage::Extract,
                    "unknown_backend",
                    format!("no extractor registered as '{}'", unit.key.extractor),
                )
            })?;

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(ExtractError::Cancelled),
                result = async {
                    let _permit = self.extract_limiter.acquire().await;
                    extractor.extract(pages, &self.schema).await
                } => result,
            };

            let fields = result
                .map_err(|e| UnitFailure::new(FailureStage::Extract, e.kind(), e.to_string()))?;
            ExtractionRecord::new(
                &unit.key.domain,
                &unit.key.crawler,
                &unit.key.extractor,
                fields,
            )
        };

        if self.options.save_intermediate {
            if let Err(e) = storage::store(store, Stage::Extract, &key, &fingerprint, &record) {
                tracing::warn!("Failed to save extract artifact {}: {}", key, e);
            }
        }

        unit.advance(UnitState::Extracted)?;
        Ok(record)
    }
}
