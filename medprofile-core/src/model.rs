use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// A drug identity resolved from a user-supplied name.
///
/// Two queries that normalize to the same `canonical_id` refer to the same
/// drug everywhere downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalDrug {
    pub canonical_id: String,
    pub generic_name: String,
    pub brand_names: BTreeSet<String>,
}

impl CanonicalDrug {
    pub fn new(
        canonical_id: impl Into<String>,
        generic_name: impl Into<String>,
        brand_names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            canonical_id: canonical_id.into(),
            generic_name: generic_name.into(),
            brand_names: brand_names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Therapeutic classification for one drug. At most one per canonical id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub canonical_id: String,
    pub atc_code: String,
    pub therapeutic_class: String,
}

/// Label and warning data, typically sourced from an external label API.
/// Every field except the id may be absent on the source side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelInfo {
    pub canonical_id: String,
    pub purpose: Option<String>,
    pub warnings: Vec<String>,
    pub brand_name: Option<String>,
    pub generic_name: Option<String>,
}

/// Outcome of one lookup against one source.
///
/// `Missing` means the source answered and had nothing on file;
/// `Unavailable` means the lookup itself failed. Consumers must be able to
/// tell these apart, so the distinction is carried explicitly rather than
/// collapsed into an `Option`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Sourced<T> {
    Found(T),
    Missing,
    Unavailable { reason: String },
}

impl<T> Sourced<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Sourced::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn found(&self) -> Option<&T> {
        match self {
            Sourced::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Sourced::Found(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Sourced::Unavailable { .. })
    }
}

/// Aggregated per-drug view: identity plus whatever each source could
/// provide. Always constructible — missing or failed sub-lookups surface as
/// explicit [`Sourced`] states, never by dropping fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugProfile {
    pub drug: CanonicalDrug,
    pub classification: Sourced<Classification>,
    pub label: Sourced<LabelInfo>,
}

/// Clinical severity of a drug-drug interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    None,
    Minor,
    Moderate,
    Major,
}

/// A known interaction between two drugs. Symmetric in the pair: the record
/// for (A, B) is the record for (B, A).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub drug_a: String,
    pub drug_b: String,
    pub severity: Severity,
    pub description: String,
}

impl InteractionRecord {
    /// Whether this record covers the given unordered pair of canonical ids.
    pub fn covers(&self, id_a: &str, id_b: &str) -> bool {
        (self.drug_a == id_a && self.drug_b == id_b)
            || (self.drug_a == id_b && self.drug_b == id_a)
    }
}

/// One checked pair. `interaction` is `Missing` when the store answered and
/// had no interaction on file, `Unavailable` when the lookup failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionCheck {
    pub drug_a: String,
    pub drug_b: String,
    pub interaction: Sourced<InteractionRecord>,
}

/// Therapeutic alternatives for a single queried drug, excluding the drug
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlternativeSet {
    pub canonical_id: String,
    pub therapeutic_class: String,
    pub alternatives: Vec<CanonicalDrug>,
}

impl AlternativeSet {
    /// Assemble an alternative set from a class query result.
    pub fn from_lookup(
        canonical_id: impl Into<String>,
        therapeutic_class: impl Into<String>,
        alternatives: Vec<CanonicalDrug>,
    ) -> Self {
        Self {
            canonical_id: canonical_id.into(),
            therapeutic_class: therapeutic_class.into(),
            alternatives,
        }
    }
}

/// Which branch the orchestrator took for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightMode {
    Alternatives,
    Interactions,
}

/// An input the orchestrator could not act on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFailure {
    pub input: String,
    pub reason: String,
}

/// Aggregate result for one insight request.
///
/// `profiles` preserves input order (failed inputs skipped). Exactly one of
/// `alternatives` / `interactions` is populated depending on `mode`, except
/// when no input resolved, in which case both are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResult {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub profiles: Vec<DrugProfile>,
    pub mode: InsightMode,
    pub alternatives: Option<Sourced<AlternativeSet>>,
    pub interactions: Option<Vec<InteractionCheck>>,
    pub failures: Vec<QueryFailure>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interaction_record_covers_both_orders() {
        let record = InteractionRecord {
            drug_a: "aspirin".to_string(),
            drug_b: "warfarin".to_string(),
            severity: Severity::Major,
            description: "Increased bleeding risk".to_string(),
        };

        assert!(record.covers("aspirin", "warfarin"));
        assert!(record.covers("warfarin", "aspirin"));
        assert!(!record.covers("aspirin", "ibuprofen"));
    }

    #[test]
    fn sourced_serializes_with_explicit_status() {
        let found: Sourced<Classification> = Sourced::Found(Classification {
            canonical_id: "acetaminophen".to_string(),
            atc_code: "N02BE01".to_string(),
            therapeutic_class: "Analgesics".to_string(),
        });
        let value = serde_json::to_value(&found).unwrap();
        assert_eq!(value["status"], "found");
        assert_eq!(value["data"]["therapeutic_class"], "Analgesics");

        let missing: Sourced<Classification> = Sourced::Missing;
        assert_eq!(serde_json::to_value(&missing).unwrap()["status"], "missing");

        let unavailable: Sourced<Classification> = Sourced::unavailable("timed out");
        let value = serde_json::to_value(&unavailable).unwrap();
        assert_eq!(value["status"], "unavailable");
        assert_eq!(value["data"]["reason"], "timed out");
    }

    #[test]
    fn severity_orders_by_risk() {
        assert!(Severity::Major > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Minor);
        assert!(Severity::Minor > Severity::None);
    }
}
