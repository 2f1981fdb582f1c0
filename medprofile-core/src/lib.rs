pub mod enrich;
pub mod error;
pub mod insights;
pub mod model;
pub mod normalize;
#[cfg(feature = "openfda")]
pub mod openfda;
pub mod sqlite;
pub mod store;

// Re-export commonly used types
pub use enrich::Enricher;
pub use error::{InsightError, Result, StoreError};
pub use insights::{InsightConfig, InsightEngine};
pub use model::{
    AlternativeSet, CanonicalDrug, Classification, DrugProfile, InsightMode, InsightResult,
    InteractionCheck, InteractionRecord, LabelInfo, QueryFailure, Severity, Sourced,
};
pub use normalize::Normalizer;
#[cfg(feature = "openfda")]
pub use openfda::OpenFdaLabelSource;
pub use sqlite::{SqliteFormulary, SqliteInteractions};
pub use store::{
    AlternativesStore, ClassificationStore, InMemoryFormulary, InMemoryInteractions,
    InMemoryLabels, InteractionStore, LabelSource, NameLookup,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn end_to_end_insight_over_in_memory_stores() {
        let formulary = Arc::new(InMemoryFormulary::new());
        formulary.insert(
            CanonicalDrug::new("aspirin", "aspirin", ["Ecotrin"]),
            Some(Classification {
                canonical_id: "aspirin".to_string(),
                atc_code: "B01AC06".to_string(),
                therapeutic_class: "Antiplatelet Agents".to_string(),
            }),
        );
        formulary.insert(
            CanonicalDrug::new("warfarin", "warfarin", ["Coumadin"]),
            Some(Classification {
                canonical_id: "warfarin".to_string(),
                atc_code: "B01AA03".to_string(),
                therapeutic_class: "Anticoagulants".to_string(),
            }),
        );

        let interactions = Arc::new(InMemoryInteractions::new());
        interactions.insert(InteractionRecord {
            drug_a: "aspirin".to_string(),
            drug_b: "warfarin".to_string(),
            severity: Severity::Major,
            description: "Greatly increased risk of bleeding".to_string(),
        });

        let engine = InsightEngine::new(
            Normalizer::new(formulary.clone()),
            Enricher::new(formulary.clone(), Arc::new(InMemoryLabels::new())),
            interactions,
            formulary,
        );

        let result = engine
            .get_insights(&["Ecotrin".to_string(), "Coumadin".to_string()])
            .await
            .unwrap();

        assert_eq!(result.mode, InsightMode::Interactions);
        assert_eq!(result.profiles.len(), 2);
        let checks = result.interactions.unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].interaction.found().unwrap().severity, Severity::Major);
    }
}
