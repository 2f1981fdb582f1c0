use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::enrich::Enricher;
use crate::error::{InsightError, Result, StoreError};
use crate::model::{
    AlternativeSet, CanonicalDrug, DrugProfile, InsightMode, InsightResult, InteractionCheck,
    QueryFailure, Sourced,
};
use crate::normalize::Normalizer;
use crate::store::{AlternativesStore, InteractionStore};

/// Tuning knobs for one engine instance.
#[derive(Debug, Clone)]
pub struct InsightConfig {
    /// Cap on inputs per request; pair checks grow quadratically.
    pub max_drugs: usize,
    /// Bound on each alternatives/interaction lookup.
    pub lookup_timeout: Duration,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            max_drugs: 8,
            lookup_timeout: Duration::from_secs(5),
        }
    }
}

/// Multi-drug insight orchestrator.
///
/// Runs normalization and enrichment per input drug, tolerating per-input
/// failure, then branches on how many distinct drugs resolved: one drug gets
/// therapeutic alternatives, two or more get pairwise interaction checks.
#[derive(Clone)]
pub struct InsightEngine {
    normalizer: Normalizer,
    enricher: Enricher,
    interactions: Arc<dyn InteractionStore>,
    alternatives: Arc<dyn AlternativesStore>,
    config: InsightConfig,
}

impl InsightEngine {
    pub fn new(
        normalizer: Normalizer,
        enricher: Enricher,
        interactions: Arc<dyn InteractionStore>,
        alternatives: Arc<dyn AlternativesStore>,
    ) -> Self {
        Self {
            normalizer,
            enricher,
            interactions,
            alternatives,
            config: InsightConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InsightConfig) -> Self {
        self.config = config;
        self
    }

    /// Aggregate profiles and cross-drug insights for the given queries.
    ///
    /// Per-input problems (unknown names, failed sub-lookups) degrade into
    /// the result; only an invalid request or a hard store outage fails it.
    pub async fn get_insights(&self, queries: &[String]) -> Result<InsightResult> {
        if queries.is_empty() {
            return Err(InsightError::EmptyQuery);
        }
        if queries.len() > self.config.max_drugs {
            return Err(InsightError::TooManyDrugs {
                count: queries.len(),
                limit: self.config.max_drugs,
            });
        }

        let request_id = Uuid::new_v4();
        info!(%request_id, inputs = queries.len(), "starting insight request");

        let (resolved, failures) = self.normalize_all(queries).await?;
        let distinct = dedup_by_canonical_id(resolved);
        let profiles = self.enrich_all(&distinct).await;

        let (mode, alternatives, interactions) = match distinct.len() {
            0 => (InsightMode::Alternatives, None, None),
            1 => {
                let payload = self.alternatives_for(&profiles[0]).await?;
                (InsightMode::Alternatives, Some(payload), None)
            }
            _ => {
                let checks = self.check_pairs(&distinct).await?;
                (InsightMode::Interactions, None, Some(checks))
            }
        };

        info!(
            %request_id,
            resolved = distinct.len(),
            failed = failures.len(),
            mode = ?mode,
            "insight request complete"
        );

        Ok(InsightResult {
            request_id,
            generated_at: Utc::now(),
            profiles,
            mode,
            alternatives,
            interactions,
            failures,
        })
    }

    /// Normalize every input concurrently, reassembling outcomes in input
    /// order. Unknown names and transient lookup errors become `failures`
    /// entries; a hard name-store outage aborts the request.
    async fn normalize_all(
        &self,
        queries: &[String],
    ) -> Result<(Vec<CanonicalDrug>, Vec<QueryFailure>)> {
        let handles: Vec<_> = queries
            .iter()
            .map(|query| {
                let normalizer = self.normalizer.clone();
                let query = query.clone();
                tokio::spawn(async move { normalizer.normalize(&query).await })
            })
            .collect();

        let mut resolved = Vec::new();
        let mut failures = Vec::new();

        for (query, handle) in queries.iter().zip(handles) {
            match handle.await {
                Ok(Ok(Some(drug))) => resolved.push(drug),
                Ok(Ok(None)) => failures.push(QueryFailure {
                    input: query.clone(),
                    reason: "not recognized".to_string(),
                }),
                Ok(Err(StoreError::Transient { reason })) => {
                    warn!(input = %query, %reason, "name lookup failed transiently");
                    failures.push(QueryFailure {
                        input: query.clone(),
                        reason: "name lookup failed".to_string(),
                    });
                }
                Ok(Err(StoreError::Unavailable { reason })) => {
                    return Err(InsightError::ServiceUnavailable {
                        store: "name lookup",
                        reason,
                    });
                }
                Err(join_err) => {
                    warn!(input = %query, error = %join_err, "normalization task aborted");
                    failures.push(QueryFailure {
                        input: query.clone(),
                        reason: "name lookup failed".to_string(),
                    });
                }
            }
        }

        Ok((resolved, failures))
    }

    /// Enrich the distinct drugs concurrently, preserving order.
    async fn enrich_all(&self, distinct: &[CanonicalDrug]) -> Vec<DrugProfile> {
        let handles: Vec<_> = distinct
            .iter()
            .map(|drug| {
                let enricher = self.enricher.clone();
                let drug = drug.clone();
                tokio::spawn(async move { enricher.enrich(drug).await })
            })
            .collect();

        let mut profiles = Vec::with_capacity(distinct.len());
        for (drug, handle) in distinct.iter().zip(handles) {
            match handle.await {
                Ok(profile) => profiles.push(profile),
                Err(join_err) => {
                    warn!(canonical_id = %drug.canonical_id, error = %join_err, "enrichment task aborted");
                    profiles.push(DrugProfile {
                        drug: drug.clone(),
                        classification: Sourced::unavailable("enrichment aborted"),
                        label: Sourced::unavailable("enrichment aborted"),
                    });
                }
            }
        }
        profiles
    }

    /// Alternatives payload for the single-drug branch. Without a known
    /// therapeutic class there is nothing to look up: the set is marked
    /// unavailable rather than guessed.
    async fn alternatives_for(&self, profile: &DrugProfile) -> Result<Sourced<AlternativeSet>> {
        let Some(classification) = profile.classification.found() else {
            return Ok(Sourced::unavailable("therapeutic class unavailable"));
        };

        let lookup = self.alternatives.alternatives_in_class(
            &classification.therapeutic_class,
            &profile.drug.canonical_id,
        );

        match timeout(self.config.lookup_timeout, lookup).await {
            Ok(Ok(alternatives)) => Ok(Sourced::Found(AlternativeSet::from_lookup(
                profile.drug.canonical_id.clone(),
                classification.therapeutic_class.clone(),
                alternatives,
            ))),
            Ok(Err(StoreError::Transient { reason })) => {
                warn!(canonical_id = %profile.drug.canonical_id, %reason, "alternatives lookup failed");
                Ok(Sourced::unavailable(reason))
            }
            Ok(Err(StoreError::Unavailable { reason })) => Err(InsightError::ServiceUnavailable {
                store: "alternatives",
                reason,
            }),
            Err(_) => Ok(Sourced::unavailable("timed out")),
        }
    }

    /// One check per unordered pair of distinct drugs, looked up
    /// concurrently, reported in profile order.
    async fn check_pairs(&self, distinct: &[CanonicalDrug]) -> Result<Vec<InteractionCheck>> {
        let mut pairs = Vec::new();
        for (i, a) in distinct.iter().enumerate() {
            for b in &distinct[i + 1..] {
                pairs.push((a.canonical_id.clone(), b.canonical_id.clone()));
            }
        }

        let handles: Vec<_> = pairs
            .iter()
            .map(|(id_a, id_b)| {
                let store = self.interactions.clone();
                let lookup_timeout = self.config.lookup_timeout;
                let (id_a, id_b) = (id_a.clone(), id_b.clone());
                tokio::spawn(async move {
                    timeout(lookup_timeout, store.interaction(&id_a, &id_b)).await
                })
            })
            .collect();

        let mut checks = Vec::with_capacity(pairs.len());
        for ((id_a, id_b), handle) in pairs.into_iter().zip(handles) {
            let interaction = match handle.await {
                Ok(Ok(Ok(Some(record)))) => Sourced::Found(record),
                Ok(Ok(Ok(None))) => Sourced::Missing,
                Ok(Ok(Err(StoreError::Transient { reason }))) => {
                    warn!(drug_a = %id_a, drug_b = %id_b, %reason, "interaction lookup failed");
                    Sourced::unavailable(reason)
                }
                Ok(Ok(Err(StoreError::Unavailable { reason }))) => {
                    return Err(InsightError::ServiceUnavailable {
                        store: "interaction",
                        reason,
                    });
                }
                Ok(Err(_)) => Sourced::unavailable("timed out"),
                Err(join_err) => {
                    warn!(drug_a = %id_a, drug_b = %id_b, error = %join_err, "interaction task aborted");
                    Sourced::unavailable("lookup aborted")
                }
            };

            checks.push(InteractionCheck {
                drug_a: id_a,
                drug_b: id_b,
                interaction,
            });
        }

        Ok(checks)
    }
}

/// Keep the first occurrence of each canonical id. A brand name and its
/// generic alias therefore count once for branching and appear once in the
/// profile list.
fn dedup_by_canonical_id(resolved: Vec<CanonicalDrug>) -> Vec<CanonicalDrug> {
    let mut seen = HashSet::new();
    resolved
        .into_iter()
        .filter(|drug| seen.insert(drug.canonical_id.clone()))
        .collect()
}
