use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::error::StoreError;
use crate::model::{CanonicalDrug, Classification, DrugProfile, LabelInfo, Sourced};
use crate::store::{ClassificationStore, LabelSource};

const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds a [`DrugProfile`] for a resolved drug by querying the
/// classification store and the label source.
///
/// The two lookups touch disjoint sources and run concurrently, each bounded
/// by `lookup_timeout`. A failed sub-fetch degrades that field to
/// `Sourced::Unavailable`; enrichment itself never fails.
#[derive(Clone)]
pub struct Enricher {
    classifications: Arc<dyn ClassificationStore>,
    labels: Arc<dyn LabelSource>,
    lookup_timeout: Duration,
}

impl Enricher {
    pub fn new(classifications: Arc<dyn ClassificationStore>, labels: Arc<dyn LabelSource>) -> Self {
        Self {
            classifications,
            labels,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    pub async fn enrich(&self, drug: CanonicalDrug) -> DrugProfile {
        let (classification, label) =
            tokio::join!(self.fetch_classification(&drug), self.fetch_label(&drug));

        DrugProfile {
            drug,
            classification,
            label,
        }
    }

    async fn fetch_classification(&self, drug: &CanonicalDrug) -> Sourced<Classification> {
        match timeout(
            self.lookup_timeout,
            self.classifications.classify(&drug.canonical_id),
        )
        .await
        {
            Ok(Ok(Some(classification))) => Sourced::Found(classification),
            Ok(Ok(None)) => Sourced::Missing,
            Ok(Err(err)) => {
                warn!(canonical_id = %drug.canonical_id, error = %err, "classification lookup failed");
                Sourced::unavailable(err.to_string())
            }
            Err(_) => {
                warn!(canonical_id = %drug.canonical_id, "classification lookup timed out");
                Sourced::unavailable("timed out")
            }
        }
    }

    /// Label fetch with a single retry on transient failure. Timeouts are
    /// not retried: the time allowed for this lookup is already spent.
    async fn fetch_label(&self, drug: &CanonicalDrug) -> Sourced<LabelInfo> {
        match self.try_fetch_label(drug).await {
            Ok(outcome) => outcome,
            Err(StoreError::Transient { reason }) => {
                warn!(canonical_id = %drug.canonical_id, %reason, "label fetch failed, retrying once");
                match self.try_fetch_label(drug).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        warn!(canonical_id = %drug.canonical_id, error = %err, "label retry failed");
                        Sourced::unavailable(err.to_string())
                    }
                }
            }
            Err(err) => {
                warn!(canonical_id = %drug.canonical_id, error = %err, "label fetch failed");
                Sourced::unavailable(err.to_string())
            }
        }
    }

    async fn try_fetch_label(
        &self,
        drug: &CanonicalDrug,
    ) -> Result<Sourced<LabelInfo>, StoreError> {
        match timeout(self.lookup_timeout, self.labels.fetch_label(drug)).await {
            Ok(Ok(Some(label))) => Ok(Sourced::Found(label)),
            Ok(Ok(None)) => Ok(Sourced::Missing),
            Ok(Err(err)) => Err(err),
            Err(_) => Ok(Sourced::unavailable("timed out")),
        }
    }
}
