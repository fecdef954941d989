//! Comparator: scores an extraction record against ground truth
//!
//! `compare` is a pure function of the extraction, the ground-truth record and
//! the schema. Fields it cannot settle with canonical equality or the text and
//! list heuristics are flagged as escalation candidates and scored
//! `present-incorrect` until a judge says otherwise.

mod canonical;
mod ground_truth;

pub use canonical::{
    canonical_items, canonicalize, is_absent, is_absent_marker, value_text, ABSENT_MARKERS,
};
pub use ground_truth::{
    GroundTruth, GroundTruthError, GroundTruthRecord, GroundTruthResult, GroundTruthValue,
};

use crate::escalation::Resolution;
use crate::extract::ExtractionRecord;
use crate::schema::{FieldKind, FieldSpec, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// Shortest string that may count as contained in another
pub const MIN_CONTAINMENT_CHARS: usize = 3;

/// Jaccard similarity at which two lists count as matching
pub const LIST_MATCH_THRESHOLD: f64 = 0.5;

/// Per-field outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    PresentCorrect,
    PresentIncorrect,
    PresentUnverifiable,
    AbsentExpectedPresent,
    AbsentExpectedAbsent,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PresentCorrect => "present-correct",
            Self::PresentIncorrect => "present-incorrect",
            Self::PresentUnverifiable => "present-unverifiable",
            Self::AbsentExpectedPresent => "absent-expected-present",
            Self::AbsentExpectedAbsent => "absent-expected-absent",
        }
    }

    /// Counts toward the accuracy numerator
    pub fn is_correct(&self) -> bool {
        matches!(self, Self::PresentCorrect | Self::AbsentExpectedAbsent)
    }

    /// Counts toward the accuracy denominator
    pub fn is_verifiable(&self) -> bool {
        !matches!(self, Self::PresentUnverifiable)
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field's similarity was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Exact,
    Variant,
    Containment,
    Overlap,
    Judged,
    None,
}

impl MatchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Variant => "variant",
            Self::Containment => "containment",
            Self::Overlap => "overlap",
            Self::Judged => "judged",
            Self::None => "none",
        }
    }
}

/// Score of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldScore {
    pub field: String,
    pub verdict: Verdict,
    /// Similarity in `[0, 1]`
    pub similarity: f64,
    pub method: MatchMethod,
    pub extracted: Value,
    pub expected: Value,
    pub extracted_present: bool,
    pub expected_present: bool,
    /// Both sides present but not settled by canonical comparison
    #[serde(default)]
    pub escalation_candidate: bool,
}

/// Aggregate score of one unit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub fields: Vec<FieldScore>,
    pub correct: usize,
    pub incorrect: usize,
    pub unverifiable: usize,
    pub missing: usize,
    pub absent_correct: usize,
    pub verifiable: usize,
    /// `(correct + absent_correct) / verifiable`, `None` with nothing verifiable
    pub accuracy: Option<f64>,
    /// Share of verifiable fields whose presence matches ground truth
    pub presence_accuracy: Option<f64>,
}

impl Score {
    pub fn from_fields(fields: Vec<FieldScore>) -> Self {
        let mut score = Self {
            fields,
            ..Self::default()
        };
        score.recount();
        score
    }

    fn recount(&mut self) {
        let fields = &self.fields;
        let count = |v: Verdict| fields.iter().filter(|f| f.verdict == v).count();
        let presence_hits = fields
            .iter()
            .filter(|f| f.verdict.is_verifiable() && f.extracted_present == f.expected_present)
            .count();

        self.correct = count(Verdict::PresentCorrect);
        self.incorrect = count(Verdict::PresentIncorrect);
        self.unverifiable = count(Verdict::PresentUnverifiable);
        self.missing = count(Verdict::AbsentExpectedPresent);
        self.absent_correct = count(Verdict::AbsentExpectedAbsent);
        self.verifiable = self.fields.len() - self.unverifiable;

        if self.verifiable == 0 {
            self.accuracy = None;
            self.presence_accuracy = None;
        } else {
            let denominator = self.verifiable as f64;
            self.accuracy = Some((self.correct + self.absent_correct) as f64 / denominator);
            self.presence_accuracy = Some(presence_hits as f64 / denominator);
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldScore> {
        self.fields.iter().find(|f| f.field == name)
    }

    /// Fields awaiting a judge decision
    pub fn escalation_candidates(&self) -> impl Iterator<Item = &FieldScore> {
        self.fields.iter().filter(|f| f.escalation_candidate)
    }

    /// Records the panel's resolution for an escalation candidate
    ///
    /// When every judge abstained the field stays `present-incorrect` and
    /// keeps its deterministic match method. Returns `false` when `field` is
    /// not a candidate.
    pub fn apply_judgement(&mut self, field: &str, resolution: Resolution) -> bool {
        let Some(entry) = self
            .fields
            .iter_mut()
            .find(|f| f.field == field && f.escalation_candidate)
        else {
            return false;
        };

        entry.escalation_candidate = false;
        if resolution != Resolution::AllAbstained {
            entry.method = MatchMethod::Judged;
        }
        if resolution.is_match() {
            entry.verdict = Verdict::PresentCorrect;
            entry.similarity = 1.0;
        } else {
            entry.verdict = Verdict::PresentIncorrect;
        }
        self.recount();
        true
    }
}

/// Outcome of comparing two present values
struct ValueMatch {
    correct: bool,
    similarity: f64,
    method: MatchMethod,
}

impl ValueMatch {
    fn hit(similarity: f64, method: MatchMethod) -> Self {
        Self {
            correct: true,
            similarity,
            method,
        }
    }

    fn miss(similarity: f64) -> Self {
        Self {
            correct: false,
            similarity,
            method: MatchMethod::None,
        }
    }
}

fn jaccard<T: Eq + std::hash::Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

fn word_overlap(a: &str, b: &str) -> f64 {
    let words_a: HashSet<&str> = a.split_whitespace().collect();
    let words_b: HashSet<&str> = b.split_whitespace().collect();
    jaccard(&words_a, &words_b)
}

fn match_lists(extracted: &Value, expected: &Value, variants: &[Value]) -> ValueMatch {
    let ours: HashSet<String> = canonical_items(extracted).into_iter().collect();

    let mut best = ValueMatch::miss(0.0);
    for (index, candidate) in std::iter::once(expected).chain(variants).enumerate() {
        let theirs: HashSet<String> = canonical_items(candidate).into_iter().collect();
        let similarity = jaccard(&ours, &theirs);
        if similarity <= best.similarity && index > 0 {
            continue;
        }
        best = if similarity >= 1.0 {
            let method = if index == 0 {
                MatchMethod::Exact
            } else {
                MatchMethod::Variant
            };
            ValueMatch::hit(1.0, method)
        } else if similarity >= LIST_MATCH_THRESHOLD {
            ValueMatch::hit(similarity, MatchMethod::Overlap)
        } else {
            ValueMatch::miss(similarity)
        };
        if similarity >= 1.0 {
            break;
        }
    }
    best
}

fn match_scalars(
    kind: FieldKind,
    extracted: &Value,
    expected: &Value,
    variants: &[Value],
) -> ValueMatch {
    let ours = canonicalize(kind, &value_text(extracted));
    let theirs = canonicalize(kind, &value_text(expected));

    if ours == theirs {
        return ValueMatch::hit(1.0, MatchMethod::Exact);
    }
    if variants
        .iter()
        .any(|v| canonicalize(kind, &value_text(v)) == ours)
    {
        return ValueMatch::hit(1.0, MatchMethod::Variant);
    }

    if matches!(kind, FieldKind::Text | FieldKind::Enum) {
        let (shorter, longer) = if ours.chars().count() <= theirs.chars().count() {
            (&ours, &theirs)
        } else {
            (&theirs, &ours)
        };
        let short_len = shorter.chars().count();
        if short_len >= MIN_CONTAINMENT_CHARS && longer.contains(shorter.as_str()) {
            let similarity = short_len as f64 / longer.chars().count() as f64;
            return ValueMatch::hit(similarity, MatchMethod::Containment);
        }
    }

    ValueMatch::miss(word_overlap(&ours, &theirs))
}

/// Scores one field
pub fn compare_field(
    field: &FieldSpec,
    extracted: &Value,
    truth: Option<&GroundTruthValue>,
) -> FieldScore {
    let extracted_present = !is_absent(extracted);
    let (expected, expected_present, verifiable) = match truth {
        Some(t) => (t.value.clone(), t.has_value(), t.verifiable),
        None => (Value::Null, false, true),
    };

    let mut score = FieldScore {
        field: field.name.clone(),
        verdict: Verdict::PresentUnverifiable,
        similarity: 0.0,
        method: MatchMethod::None,
        extracted: extracted.clone(),
        expected,
        extracted_present,
        expected_present,
        escalation_candidate: false,
    };

    if !verifiable {
        return score;
    }

    match (extracted_present, expected_present) {
        (false, false) => {
            score.verdict = Verdict::AbsentExpectedAbsent;
            score.similarity = 1.0;
            score.method = MatchMethod::Exact;
        }
        (false, true) => score.verdict = Verdict::AbsentExpectedPresent,
        (true, false) => score.verdict = Verdict::PresentIncorrect,
        (true, true) => {
            let variants = truth.map(|t| t.variants.as_slice()).unwrap_or_default();
            let result = if field.kind == FieldKind::List {
                match_lists(extracted, &score.expected, variants)
            } else {
                match_scalars(field.kind, extracted, &score.expected, variants)
            };

            score.similarity = result.similarity;
            score.method = result.method;
            if result.correct {
                score.verdict = Verdict::PresentCorrect;
            } else {
                score.verdict = Verdict::PresentIncorrect;
                score.escalation_candidate = true;
            }
        }
    }

    score
}

/// Scores an extraction record against its ground truth
///
/// A domain without a ground-truth record scores every field
/// `present-unverifiable`.
pub fn compare(
    extraction: &ExtractionRecord,
    truth: Option<&GroundTruthRecord>,
    schema: &Schema,
) -> Score {
    let fields = schema
        .fields()
        .iter()
        .map(|field| {
            let extracted = extraction.value(&field.name);
            match truth {
                Some(record) => compare_field(field, extracted, record.field(&field.name)),
                None => compare_field(field, extracted, Some(&GroundTruthValue::unverifiable())),
            }
        })
        .collect();

    Score::from_fields(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ExtractedFields;
    use crate::url::Domain;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn field(name: &str, kind: FieldKind) -> FieldSpec {
        FieldSpec::new(name, kind, "")
    }

    fn truth(value: Value) -> GroundTruthValue {
        GroundTruthValue::new(value)
    }

    fn record(fields: &[(&str, Value)]) -> ExtractionRecord {
        let fields: BTreeMap<String, Value> = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        ExtractionRecord::new(
            &Domain::parse("example.com").unwrap(),
            "jina",
            "openai",
            ExtractedFields {
                fields,
                raw_response: String::new(),
            },
        )
    }

    #[test]
    fn test_phone_canonical_match() {
        let phone = field("phone", FieldKind::Phone);
        let score = compare_field(
            &phone,
            &json!("5551234567"),
            Some(&truth(json!("(555) 123-4567"))),
        );
        assert_eq!(score.verdict, Verdict::PresentCorrect);
        assert_eq!(score.method, MatchMethod::Exact);
    }

    #[test]
    fn test_empty_extraction_is_absent_expected_present() {
        let phone = field("phone", FieldKind::Phone);
        let score = compare_field(&phone, &json!(""), Some(&truth(json!("(555) 123-4567"))));
        assert_eq!(score.verdict, Verdict::AbsentExpectedPresent);
    }

    #[test]
    fn test_undeclared_and_absent() {
        let phone = field("phone", FieldKind::Phone);
        let score = compare_field(&phone, &Value::Null, None);
        assert_eq!(score.verdict, Verdict::AbsentExpectedAbsent);
        assert!(score.verdict.is_correct());
    }

    #[test]
    fn test_present_without_truth_is_incorrect() {
        let phone = field("phone", FieldKind::Phone);
        let score = compare_field(&phone, &json!("555"), None);
        assert_eq!(score.verdict, Verdict::PresentIncorrect);
        assert!(!score.escalation_candidate);
    }

    #[test]
    fn test_variant_match() {
        let email = field("email", FieldKind::Email);
        let gt = truth(json!("info@acme.com")).with_variants(vec![json!("sales@acme.com")]);
        let score = compare_field(&email, &json!("mailto:Sales@Acme.com"), Some(&gt));
        assert_eq!(score.verdict, Verdict::PresentCorrect);
        assert_eq!(score.method, MatchMethod::Variant);
    }

    #[test]
    fn test_text_containment() {
        let text = field("main_product_type", FieldKind::Text);
        let score = compare_field(&text, &json!("SaaS"), Some(&truth(json!("SaaS platform"))));
        assert_eq!(score.verdict, Verdict::PresentCorrect);
        assert_eq!(score.method, MatchMethod::Containment);
        assert!(score.similarity > 0.0 && score.similarity < 1.0);

        // Too short to count
        let score = compare_field(&text, &json!("a"), Some(&truth(json!("a platform"))));
        assert_eq!(score.verdict, Verdict::PresentIncorrect);
        assert!(score.escalation_candidate);
    }

    #[test]
    fn test_list_overlap() {
        let list = field("industries", FieldKind::List);
        let gt = truth(json!("fintech, payments, banking"));

        let close = compare_field(&list, &json!(["Payments", "FinTech"]), Some(&gt));
        assert_eq!(close.verdict, Verdict::PresentCorrect);
        assert_eq!(close.method, MatchMethod::Overlap);

        let far = compare_field(&list, &json!(["retail"]), Some(&gt));
        assert_eq!(far.verdict, Verdict::PresentIncorrect);
        assert!(far.escalation_candidate);
        assert_eq!(far.similarity, 0.0);
    }

    #[test]
    fn test_unverifiable_field() {
        let text = field("patents", FieldKind::Text);
        let score = compare_field(
            &text,
            &json!("US123"),
            Some(&GroundTruthValue::unverifiable()),
        );
        assert_eq!(score.verdict, Verdict::PresentUnverifiable);
    }

    #[test]
    fn test_compare_aggregates() {
        let schema = Schema::new(vec![
            field("phone", FieldKind::Phone),
            field("email", FieldKind::Email),
            field("website", FieldKind::Url),
            field("patents", FieldKind::Text),
        ]);
        let gt = GroundTruthRecord::new(Domain::parse("example.com").unwrap())
            .with_field("phone", truth(json!("(555) 123-4567")))
            .with_field("email", truth(json!("a@example.com")))
            .with_field("patents", GroundTruthValue::unverifiable());
        let extraction = record(&[
            ("phone", json!("555-123-4567")),
            ("email", Value::Null),
            ("patents", json!("US123")),
        ]);

        let score = compare(&extraction, Some(&gt), &schema);
        assert_eq!(score.correct, 1);
        assert_eq!(score.missing, 1);
        assert_eq!(score.absent_correct, 1);
        assert_eq!(score.unverifiable, 1);
        assert_eq!(score.verifiable, 3);
        assert_eq!(score.accuracy, Some(2.0 / 3.0));
        assert_eq!(score.presence_accuracy, Some(2.0 / 3.0));
    }

    #[test]
    fn test_compare_without_ground_truth() {
        let schema = Schema::new(vec![field("phone", FieldKind::Phone)]);
        let score = compare(&record(&[("phone", json!("555"))]), None, &schema);
        assert_eq!(score.unverifiable, 1);
        assert_eq!(score.accuracy, None);
    }

    #[test]
    fn test_compare_is_deterministic() {
        let schema = crate::schema::company_schema();
        let gt = GroundTruthRecord::new(Domain::parse("example.com").unwrap())
            .with_field("industries", truth(json!(["a", "b"])))
            .with_field("language", truth(json!("en")));
        let extraction = record(&[("industries", json!(["b", "c"])), ("language", json!("EN"))]);

        assert_eq!(
            compare(&extraction, Some(&gt), &schema),
            compare(&extraction, Some(&gt), &schema)
        );
    }

    #[test]
    fn test_apply_judgement() {
        let schema = Schema::new(vec![field("main_product_type", FieldKind::Text)]);
        let gt = GroundTruthRecord::new(Domain::parse("example.com").unwrap())
            .with_field("main_product_type", truth(json!("Payroll software")));
        let extraction = record(&[("main_product_type", json!("HR tools"))]);

        let mut score = compare(&extraction, Some(&gt), &schema);
        assert_eq!(score.escalation_candidates().count(), 1);
        assert_eq!(score.accuracy, Some(0.0));

        assert!(score.apply_judgement("main_product_type", Resolution::Match));
        assert_eq!(score.accuracy, Some(1.0));
        assert_eq!(
            score.field("main_product_type").unwrap().method,
            MatchMethod::Judged
        );
        assert!(!score.apply_judgement("main_product_type", Resolution::NoMatch));
    }

    #[test]
    fn test_all_abstained_keeps_match_method() {
        let schema = Schema::new(vec![field("main_product_type", FieldKind::Text)]);
        let gt = GroundTruthRecord::new(Domain::parse("example.com").unwrap())
            .with_field("main_product_type", truth(json!("Payroll software")));
        let extraction = record(&[("main_product_type", json!("HR tools"))]);

        let mut score = compare(&extraction, Some(&gt), &schema);
        let before = score.field("main_product_type").unwrap().method;

        assert!(score.apply_judgement("main_product_type", Resolution::AllAbstained));
        let field = score.field("main_product_type").unwrap();
        assert_eq!(field.verdict, Verdict::PresentIncorrect);
        assert_eq!(field.method, before);
        assert_ne!(field.method, MatchMethod::Judged);
        assert!(!field.escalation_candidate);
    }
}
