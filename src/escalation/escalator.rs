use super::registry::JudgeRegistry;
use super::{resolve_votes, Judge, JudgeDecision, JudgeRequest, JudgeVote};
use crate::compare::Score;
use crate::schema::Schema;
use crate::storage::{self, judge_fingerprint, ArtifactKey, ArtifactStore, CacheLookup, Stage};
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// When judges are actually called
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JudgePolicy {
    /// Use a cached vote when present, otherwise ask the judge
    CacheOrInvoke,
    /// Use cached votes only; a missing vote is an abstain
    CacheOnly,
    /// Ask every judge again, replacing cached votes
    Force,
}

/// Puts escalation candidates of a score to the judge panel
pub struct Escalator {
    judges: JudgeRegistry,
    store: Arc<dyn ArtifactStore>,
    policy: JudgePolicy,
    save_votes: bool,
}

impl Escalator {
    pub fn new(judges: JudgeRegistry, store: Arc<dyn ArtifactStore>, policy: JudgePolicy) -> Self {
        Self {
            judges,
            store,
            policy,
            save_votes: true,
        }
    }

    /// Disables persisting fresh votes
    pub fn without_saving(mut self) -> Self {
        self.save_votes = false;
        self
    }

    pub fn policy(&self) -> JudgePolicy {
        self.policy
    }

    /// Resolves every escalation candidate in `score`
    ///
    /// `unit` is the extract key of the unit being scored. Judge calls share
    /// `limiter` with extraction and stop being issued once `cancel` fires.
    /// Returns the number of fields judged.
    pub async fn escalate(
        &self,
        unit: &ArtifactKey,
        schema: &Schema,
        score: &mut Score,
        limiter: &Semaphore,
        cancel: &CancellationToken,
    ) -> usize {
        if self.judges.is_empty() {
            return 0;
        }

        let candidates: Vec<(String, Value, Value)> = score
            .escalation_candidates()
            .map(|f| (f.field.clone(), f.extracted.clone(), f.expected.clone()))
            .collect();

        let mut judged = 0;
        for (field_name, extracted, expected) in candidates {
            let Some(field) = schema.field(&field_name) else {
                continue;
            };
            let request = JudgeRequest {
                domain: &unit.domain,
                field,
                extracted: &extracted,
                expected: &expected,
            };

            let votes = join_all(
                self.judges
                    .judges()
                    .iter()
                    .map(|judge| self.vote(judge.as_ref(), unit, &request, limiter, cancel)),
            )
            .await;

            let resolution = resolve_votes(&votes);
            tracing::debug!(
                "Escalated {} {}: votes {:?} -> {:?}",
                unit,
                field_name,
                votes,
                resolution
            );
            score.apply_judgement(&field_name, resolution);
            judged += 1;
        }
        judged
    }

    async fn vote(
        &self,
        judge: &dyn Judge,
        unit: &ArtifactKey,
        request: &JudgeRequest<'_>,
        limiter: &Semaphore,
        cancel: &CancellationToken,
    ) -> JudgeVote {
        let extractor = unit.extractor.as_deref().unwrap_or_default();
        let key = ArtifactKey::judge(
            &unit.domain,
            &unit.crawler,
            extractor,
            &request.field.name,
            judge.id(),
        );
        let fingerprint =
            judge_fingerprint(&request.field.name, request.extracted, request.expected);

        if self.policy != JudgePolicy::Force {
            match storage::lookup::<JudgeDecision>(
                self.store.as_ref(),
                Stage::Judge,
                &key,
                Some(&fingerprint),
            ) {
                CacheLookup::Hit(decision) => return decision.vote,
                _ if self.policy == JudgePolicy::CacheOnly => {
                    tracing::debug!("No cached vote for {}", key);
                    return JudgeVote::Abstain;
                }
                _ => {}
            }
        }

        if cancel.is_cancelled() {
            return JudgeVote::Abstain;
        }
        let decision = tokio::select! {
            biased;
            _ = cancel.cancelled() => return JudgeVote::Abstain,
            result = async {
                let _permit = limiter.acquire().await;
                judge.judge(request).await
            } => result,
        };

        match decision {
            Ok(decision) => {
                if self.save_votes {
                    if let Err(e) = storage::store(
                        self.store.as_ref(),
                        Stage::Judge,
                        &key,
                        &fingerprint,
                        &decision,
                    ) {
                        tracing::warn!("Failed to save vote {}: {}", key, e);
                    }
                }
                decision.vote
            }
            Err(e) => {
                tracing::warn!("Judge {} abstained on {}: {}", judge.id(), key, e);
                JudgeVote::Abstain
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{compare, GroundTruthRecord, GroundTruthValue, MatchMethod, Verdict};
    use crate::escalation::JudgeError;
    use crate::extract::{ExtractedFields, ExtractionRecord};
    use crate::schema::{FieldKind, FieldSpec};
    use crate::storage::MemoryArtifactStore;
    use crate::url::Domain;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedJudge {
        id: &'static str,
        answer: Result<JudgeVote, JudgeError>,
        calls: AtomicUsize,
    }

    impl FixedJudge {
        fn new(id: &'static str, answer: Result<JudgeVote, JudgeError>) -> Arc<Self> {
            Arc::new(Self {
                id,
                answer,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Judge for FixedJudge {
        fn id(&self) -> &str {
            self.id
        }

        async fn judge(&self, _request: &JudgeRequest<'_>) -> Result<JudgeDecision, JudgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone().map(JudgeDecision::new)
        }
    }

    fn domain() -> Domain {
        Domain::parse("acme.com").unwrap()
    }

    fn schema() -> Schema {
        Schema::new(vec![FieldSpec::new("main_product_type", FieldKind::Text, "")])
    }

    fn ambiguous_score() -> Score {
        let truth = GroundTruthRecord::new(domain())
            .with_field(
                "main_product_type",
                GroundTruthValue::new(json!("Payroll software")),
            );
        let mut fields = std::collections::BTreeMap::new();
        fields.insert("main_product_type".to_string(), json!("HR tools"));
        let extraction = ExtractionRecord::new(
            &domain(),
            "jina",
            "openai",
            ExtractedFields {
                fields,
                raw_response: String::new(),
            },
        );
        compare(&extraction, Some(&truth), &schema())
    }

    fn panel(judges: &[Arc<FixedJudge>]) -> JudgeRegistry {
        let mut registry = JudgeRegistry::new();
        for judge in judges {
            registry.register(judge.clone());
        }
        registry
    }

    async fn run(escalator: &Escalator, score: &mut Score) -> usize {
        let unit = ArtifactKey::extract(&domain(), "jina", "openai");
        escalator
            .escalate(
                &unit,
                &schema(),
                score,
                &Semaphore::new(2),
                &CancellationToken::new(),
            )
            .await
    }

    #[tokio::test]
    async fn test_tie_stays_incorrect() {
        let yes = FixedJudge::new("openai", Ok(JudgeVote::Match));
        let no = FixedJudge::new("claude", Ok(JudgeVote::NoMatch));
        let store = Arc::new(MemoryArtifactStore::new());
        let escalator = Escalator::new(panel(&[yes, no]), store, JudgePolicy::CacheOrInvoke);

        let mut score = ambiguous_score();
        assert_eq!(run(&escalator, &mut score).await, 1);

        let field = score.field("main_product_type").unwrap();
        assert_eq!(field.verdict, Verdict::PresentIncorrect);
        assert!(!field.escalation_candidate);
    }

    #[tokio::test]
    async fn test_majority_match_is_correct() {
        let judges = [
            FixedJudge::new("a", Ok(JudgeVote::Match)),
            FixedJudge::new("b", Ok(JudgeVote::Match)),
            FixedJudge::new("c", Ok(JudgeVote::NoMatch)),
        ];
        let escalator = Escalator::new(
            panel(&judges),
            Arc::new(MemoryArtifactStore::new()),
            JudgePolicy::CacheOrInvoke,
        );

        let mut score = ambiguous_score();
        run(&escalator, &mut score).await;
        assert_eq!(
            score.field("main_product_type").unwrap().verdict,
            Verdict::PresentCorrect
        );
        assert_eq!(score.accuracy, Some(1.0));
    }

    #[tokio::test]
    async fn test_failure_abstains() {
        let broken = FixedJudge::new("a", Err(JudgeError::Backend("timeout".to_string())));
        let yes = FixedJudge::new("b", Ok(JudgeVote::Match));
        let escalator = Escalator::new(
            panel(&[broken, yes]),
            Arc::new(MemoryArtifactStore::new()),
            JudgePolicy::CacheOrInvoke,
        );

        let mut score = ambiguous_score();
        run(&escalator, &mut score).await;
        assert_eq!(
            score.field("main_product_type").unwrap().verdict,
            Verdict::PresentCorrect
        );
    }

    #[tokio::test]
    async fn test_all_abstain_falls_back() {
        let broken = FixedJudge::new("a", Err(JudgeError::MalformedResponse("?".to_string())));
        let escalator = Escalator::new(
            panel(&[broken]),
            Arc::new(MemoryArtifactStore::new()),
            JudgePolicy::CacheOrInvoke,
        );

        let mut score = ambiguous_score();
        run(&escalator, &mut score).await;
        let field = score.field("main_product_type").unwrap();
        assert_eq!(field.verdict, Verdict::PresentIncorrect);
        assert_ne!(field.method, MatchMethod::Judged);
    }

    #[tokio::test]
    async fn test_cached_votes_are_reused() {
        let store: Arc<MemoryArtifactStore> = Arc::new(MemoryArtifactStore::new());
        let judge = FixedJudge::new("openai", Ok(JudgeVote::Match));

        let first = Escalator::new(
            panel(&[judge.clone()]),
            store.clone(),
            JudgePolicy::CacheOrInvoke,
        );
        run(&first, &mut ambiguous_score()).await;
        assert_eq!(judge.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.list_keys(Stage::Judge).unwrap().len(), 1);

        let again = Escalator::new(
            panel(&[judge.clone()]),
            store.clone(),
            JudgePolicy::CacheOrInvoke,
        );
        let mut score = ambiguous_score();
        run(&again, &mut score).await;
        assert_eq!(judge.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            score.field("main_product_type").unwrap().verdict,
            Verdict::PresentCorrect
        );

        let forced = Escalator::new(panel(&[judge.clone()]), store, JudgePolicy::Force);
        run(&forced, &mut ambiguous_score()).await;
        assert_eq!(judge.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cache_only_never_calls_judges() {
        let judge = FixedJudge::new("openai", Ok(JudgeVote::Match));
        let escalator = Escalator::new(
            panel(&[judge.clone()]),
            Arc::new(MemoryArtifactStore::new()),
            JudgePolicy::CacheOnly,
        );

        let mut score = ambiguous_score();
        run(&escalator, &mut score).await;
        assert_eq!(judge.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            score.field("main_product_type").unwrap().verdict,
            Verdict::PresentIncorrect
        );
    }

    #[tokio::test]
    async fn test_cancelled_run_abstains() {
        let judge = FixedJudge::new("openai", Ok(JudgeVote::Match));
        let escalator = Escalator::new(
            panel(&[judge]),
            Arc::new(MemoryArtifactStore::new()),
            JudgePolicy::CacheOrInvoke,
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut score = ambiguous_score();
        let unit = ArtifactKey::extract(&domain(), "jina", "openai");
        escalator
            .escalate(&unit, &schema(), &mut score, &Semaphore::new(1), &cancel)
            .await;
        assert_eq!(
            score.field("main_product_type").unwrap().verdict,
            Verdict::PresentIncorrect
        );
    }
}
