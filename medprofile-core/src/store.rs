use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::StoreError;
use crate::model::{CanonicalDrug, Classification, InteractionRecord, LabelInfo};

/// Name-to-identity resolution against an imported reference dataset.
///
/// Generic and brand lookups are separate methods so the caller controls
/// match precedence; both are exact matches on an already-lowercased name.
#[async_trait]
pub trait NameLookup: Send + Sync {
    async fn resolve_generic(&self, name: &str) -> Result<Option<CanonicalDrug>, StoreError>;
    async fn resolve_brand(&self, name: &str) -> Result<Option<CanonicalDrug>, StoreError>;
}

/// Therapeutic classification lookup. At most one classification per drug.
#[async_trait]
pub trait ClassificationStore: Send + Sync {
    async fn classify(&self, canonical_id: &str) -> Result<Option<Classification>, StoreError>;
}

/// Label and warning data, possibly network-backed.
#[async_trait]
pub trait LabelSource: Send + Sync {
    async fn fetch_label(&self, drug: &CanonicalDrug) -> Result<Option<LabelInfo>, StoreError>;
}

/// Pairwise interaction lookup. Implementations must be order-independent:
/// `interaction(a, b)` and `interaction(b, a)` return the same record.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn interaction(
        &self,
        id_a: &str,
        id_b: &str,
    ) -> Result<Option<InteractionRecord>, StoreError>;
}

/// Drugs sharing a therapeutic class, excluding the queried drug itself.
#[async_trait]
pub trait AlternativesStore: Send + Sync {
    async fn alternatives_in_class(
        &self,
        therapeutic_class: &str,
        excluding_id: &str,
    ) -> Result<Vec<CanonicalDrug>, StoreError>;
}

/// In-memory formulary: drug identities, name indexes, classifications and
/// class membership. Backs `NameLookup`, `ClassificationStore` and
/// `AlternativesStore` for tests and for the demo dataset.
pub struct InMemoryFormulary {
    drugs: DashMap<String, CanonicalDrug>,
    generic_index: DashMap<String, String>,
    brand_index: DashMap<String, String>,
    classifications: DashMap<String, Classification>,
    class_members: DashMap<String, Vec<String>>,
}

impl InMemoryFormulary {
    pub fn new() -> Self {
        Self {
            drugs: DashMap::new(),
            generic_index: DashMap::new(),
            brand_index: DashMap::new(),
            classifications: DashMap::new(),
            class_members: DashMap::new(),
        }
    }

    /// Register a drug and (optionally) its classification. Name indexes are
    /// lowercased at insert time; class members keep insertion order.
    pub fn insert(&self, drug: CanonicalDrug, classification: Option<Classification>) {
        let id = drug.canonical_id.clone();

        self.generic_index
            .insert(drug.generic_name.to_lowercase(), id.clone());
        for brand in &drug.brand_names {
            self.brand_index.insert(brand.to_lowercase(), id.clone());
        }

        if let Some(classification) = classification {
            self.class_members
                .entry(classification.therapeutic_class.clone())
                .or_default()
                .push(id.clone());
            self.classifications.insert(id.clone(), classification);
        }

        self.drugs.insert(id, drug);
    }

    fn drug_by_id(&self, id: &str) -> Option<CanonicalDrug> {
        self.drugs.get(id).map(|entry| entry.clone())
    }
}

impl Default for InMemoryFormulary {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NameLookup for InMemoryFormulary {
    async fn resolve_generic(&self, name: &str) -> Result<Option<CanonicalDrug>, StoreError> {
        Ok(self
            .generic_index
            .get(name)
            .and_then(|id| self.drug_by_id(&id)))
    }

    async fn resolve_brand(&self, name: &str) -> Result<Option<CanonicalDrug>, StoreError> {
        Ok(self
            .brand_index
            .get(name)
            .and_then(|id| self.drug_by_id(&id)))
    }
}

#[async_trait]
impl ClassificationStore for InMemoryFormulary {
    async fn classify(&self, canonical_id: &str) -> Result<Option<Classification>, StoreError> {
        Ok(self
            .classifications
            .get(canonical_id)
            .map(|entry| entry.clone()))
    }
}

#[async_trait]
impl AlternativesStore for InMemoryFormulary {
    async fn alternatives_in_class(
        &self,
        therapeutic_class: &str,
        excluding_id: &str,
    ) -> Result<Vec<CanonicalDrug>, StoreError> {
        let Some(members) = self.class_members.get(therapeutic_class) else {
            return Ok(Vec::new());
        };

        Ok(members
            .iter()
            .filter(|id| id.as_str() != excluding_id)
            .filter_map(|id| self.drug_by_id(id))
            .collect())
    }
}

/// In-memory interaction reference, keyed on the lexicographically ordered
/// pair so lookups are order-independent.
pub struct InMemoryInteractions {
    records: DashMap<(String, String), InteractionRecord>,
}

fn pair_key(id_a: &str, id_b: &str) -> (String, String) {
    if id_a <= id_b {
        (id_a.to_string(), id_b.to_string())
    } else {
        (id_b.to_string(), id_a.to_string())
    }
}

impl InMemoryInteractions {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn insert(&self, record: InteractionRecord) {
        let key = pair_key(&record.drug_a, &record.drug_b);
        self.records.insert(key, record);
    }
}

impl Default for InMemoryInteractions {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InteractionStore for InMemoryInteractions {
    async fn interaction(
        &self,
        id_a: &str,
        id_b: &str,
    ) -> Result<Option<InteractionRecord>, StoreError> {
        Ok(self
            .records
            .get(&pair_key(id_a, id_b))
            .map(|entry| entry.clone()))
    }
}

/// In-memory label data, keyed by canonical id. The demo fallback when the
/// network-backed label source is not in use.
pub struct InMemoryLabels {
    labels: DashMap<String, LabelInfo>,
}

impl InMemoryLabels {
    pub fn new() -> Self {
        Self {
            labels: DashMap::new(),
        }
    }

    pub fn insert(&self, label: LabelInfo) {
        self.labels.insert(label.canonical_id.clone(), label);
    }
}

impl Default for InMemoryLabels {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LabelSource for InMemoryLabels {
    async fn fetch_label(&self, drug: &CanonicalDrug) -> Result<Option<LabelInfo>, StoreError> {
        Ok(self
            .labels
            .get(&drug.canonical_id)
            .map(|entry| entry.clone()))
    }
}
