//! Units of work: one (domain, crawler, extractor) combination each

use crate::compare::Score;
use crate::crawler::LinkStats;
use crate::state::UnitState;
use crate::storage::ArtifactKey;
use crate::url::Domain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a unit, also the key of its report entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    pub domain: Domain,
    pub crawler: String,
    pub extractor: String,
}

impl UnitKey {
    pub fn new(domain: &Domain, crawler: &str, extractor: &str) -> Self {
        Self {
            domain: domain.clone(),
            crawler: crawler.to_string(),
            extractor: extractor.to_string(),
        }
    }

    /// `domain|crawler|extractor`, the key used in report files
    pub fn report_key(&self) -> String {
        format!("{}|{}|{}", self.domain, self.crawler, self.extractor)
    }

    pub fn fetch_key(&self) -> ArtifactKey {
        ArtifactKey::fetch(&self.domain, &self.crawler)
    }

    pub fn extract_key(&self) -> ArtifactKey {
        ArtifactKey::extract(&self.domain, &self.crawler, &self.extractor)
    }
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.domain, self.crawler, self.extractor)
    }
}

/// Stage a unit failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Extract,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Extract => "extract",
        }
    }
}

/// Why a unit did not produce a score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub stage: FailureStage,
    /// Short machine-readable label, e.g. `timeout` or `missing_artifact`
    pub kind: String,
    pub reason: String,
}

impl UnitFailure {
    pub fn new(stage: FailureStage, kind: &str, reason: impl Into<String>) -> Self {
        Self {
            stage,
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }

    pub fn cancelled(stage: FailureStage) -> Self {
        Self::new(stage, "cancelled", "run cancelled before the unit finished")
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed ({}): {}",
            self.stage.as_str(),
            self.kind,
            self.reason
        )
    }
}

/// Final outcome of a unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitStatus {
    Done {
        score: Score,
    },
    Failed {
        stage: FailureStage,
        kind: String,
        reason: String,
    },
}

/// One row of the run report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitEntry {
    pub key: UnitKey,
    pub state: UnitState,
    #[serde(flatten)]
    pub status: UnitStatus,
    /// Pages in the page set the unit was scored on
    pub pages: usize,
    #[serde(default)]
    pub link_stats: LinkStats,
    pub fetch_cached: bool,
    pub extract_cached: bool,
    /// Fields put to the judge panel
    pub escalated: usize,
    pub completed_at: DateTime<Utc>,
}

impl UnitEntry {
    pub fn score(&self) -> Option<&Score> {
        match &self.status {
            UnitStatus::Done { score } => Some(score),
            UnitStatus::Failed { .. } => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, UnitStatus::Done { .. })
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            UnitStatus::Failed { reason, .. } => Some(reason),
            UnitStatus::Done { .. } => None,
        }
    }
}

/// A unit in flight, carrying its state machine value
#[derive(Debug)]
pub(crate) struct Unit {
    pub key: UnitKey,
    state: UnitState,
    pub pages: usize,
    pub link_stats: LinkStats,
    pub fetch_cached: bool,
    pub extract_cached: bool,
}

impl Unit {
    pub fn new(key: UnitKey) -> Self {
        Self {
            key,
            state: UnitState::Pending,
            pages: 0,
            link_stats: LinkStats::default(),
            fetch_cached: false,
            extract_cached: false,
        }
    }

    /// Moves to `next`; an illegal move is a unit failure
    pub fn advance(&mut self, next: UnitState) -> Result<(), UnitFailure> {
        let from = self.state;
        match from.transition(next) {
            Ok(state) => {
                self.state = state;
                tracing::debug!("{}: {} -> {}", self.key, from, next);
                Ok(())
            }
            Err(e) => Err(UnitFailure::new(
                self.current_stage(),
                "invalid_transition",
                e.to_string(),
            )),
        }
    }

    fn current_stage(&self) -> FailureStage {
        match self.state {
            UnitState::Pending | UnitState::Fetching => FailureStage::Fetch,
            _ => FailureStage::Extract,
        }
    }

    /// Records `failure` and closes the unit
    ///
    /// A unit that never started a backend call is moved into the matching
    /// in-flight state first, so `Failed` is always entered from `Fetching`
    /// or `Extracting`.
    pub fn fail(mut self, failure: UnitFailure) -> UnitEntry {
        let in_flight = match failure.stage {
            FailureStage::Fetch => UnitState::Fetching,
            FailureStage::Extract => UnitState::Extracting,
        };
        if self.state != in_flight && self.state.can_transition_to(in_flight) {
            self.state = in_flight;
        }
        if let Err(e) = self.advance(UnitState::Failed) {
            tracing::debug!("{}: forcing failed state: {}", self.key, e.reason);
            self.state = UnitState::Failed;
        }

        tracing::warn!("{} {}", self.key, failure);
        let status = UnitStatus::Failed {
            stage: failure.stage,
            kind: failure.kind,
            reason: failure.reason,
        };
        self.into_entry(status, 0)
    }

    /// Closes the unit with its score
    pub fn finish(
        mut self,
        score: Score,
        escalated: usize,
    ) -> Result<UnitEntry, (Self, UnitFailure)> {
        if let Err(failure) = self.advance(UnitState::Done) {
            return Err((self, failure));
        }
        Ok(self.into_entry(UnitStatus::Done { score }, escalated))
    }

    fn into_entry(self, status: UnitStatus, escalated: usize) -> UnitEntry {
        UnitEntry {
            key: self.key,
            state: self.state,
            status,
            pages: self.pages,
            link_stats: self.link_stats,
            fetch_cached: self.fetch_cached,
            extract_cached: self.extract_cached,
            escalated,
            completed_at: Utc::now(),
        }
    }
}
