use std::sync::Arc;

use tracing::debug;

use crate::error::StoreError;
use crate::model::CanonicalDrug;
use crate::store::NameLookup;

/// Maps a raw user-supplied drug name to its canonical identity.
///
/// Matching is deliberately exact (after trimming and lowercasing): generic
/// names take precedence over brand aliases, and unknown names stay unknown
/// rather than being fuzzy-matched to something plausible.
#[derive(Clone)]
pub struct Normalizer {
    names: Arc<dyn NameLookup>,
}

impl Normalizer {
    pub fn new(names: Arc<dyn NameLookup>) -> Self {
        Self { names }
    }

    /// Resolve a raw query. `Ok(None)` means the name is not recognized,
    /// including the empty-after-trim case.
    pub async fn normalize(&self, query: &str) -> Result<Option<CanonicalDrug>, StoreError> {
        let name = query.trim().to_lowercase();
        if name.is_empty() {
            return Ok(None);
        }

        if let Some(drug) = self.names.resolve_generic(&name).await? {
            debug!(query, canonical_id = %drug.canonical_id, "resolved via generic name");
            return Ok(Some(drug));
        }

        let resolved = self.names.resolve_brand(&name).await?;
        if let Some(drug) = &resolved {
            debug!(query, canonical_id = %drug.canonical_id, "resolved via brand alias");
        } else {
            debug!(query, "name not recognized");
        }
        Ok(resolved)
    }
}
