//! Store wiring: SQLite reference databases when configured, a seeded
//! in-memory demo dataset otherwise.

use std::sync::Arc;

use medprofile_core::{
    AlternativesStore, CanonicalDrug, Classification, ClassificationStore, InMemoryFormulary,
    InMemoryInteractions, InMemoryLabels, InteractionRecord, InteractionStore, LabelInfo,
    LabelSource, NameLookup, OpenFdaLabelSource, Severity, SqliteFormulary, SqliteInteractions,
};
use tracing::info;

/// The five collaborator capabilities the core consumes, already boxed for
/// injection into the engine.
pub struct Stores {
    pub names: Arc<dyn NameLookup>,
    pub classifications: Arc<dyn ClassificationStore>,
    pub labels: Arc<dyn LabelSource>,
    pub interactions: Arc<dyn InteractionStore>,
    pub alternatives: Arc<dyn AlternativesStore>,
}

/// Build stores from the environment.
///
/// `FORMULARY_DB` / `INTERACTIONS_DB` select the SQLite reference databases;
/// without them the seeded demo dataset is used. `OPENFDA_OFFLINE` switches
/// the label source from the openFDA API to the demo labels.
pub async fn stores_from_env() -> anyhow::Result<Stores> {
    let (names, classifications, alternatives) =
        if let Ok(database_url) = std::env::var("FORMULARY_DB") {
            info!(%database_url, "using SQLite formulary");
            let formulary = Arc::new(SqliteFormulary::connect(&database_url).await?);
            (
                formulary.clone() as Arc<dyn NameLookup>,
                formulary.clone() as Arc<dyn ClassificationStore>,
                formulary as Arc<dyn AlternativesStore>,
            )
        } else {
            info!("using in-memory demo formulary (set FORMULARY_DB to use SQLite)");
            let formulary = demo_formulary();
            (
                formulary.clone() as Arc<dyn NameLookup>,
                formulary.clone() as Arc<dyn ClassificationStore>,
                formulary as Arc<dyn AlternativesStore>,
            )
        };

    let interactions: Arc<dyn InteractionStore> =
        if let Ok(database_url) = std::env::var("INTERACTIONS_DB") {
            info!(%database_url, "using SQLite interaction store");
            Arc::new(SqliteInteractions::connect(&database_url).await?)
        } else {
            info!("using in-memory demo interactions (set INTERACTIONS_DB to use SQLite)");
            demo_interactions()
        };

    let labels: Arc<dyn LabelSource> = if std::env::var("OPENFDA_OFFLINE").is_ok() {
        info!("using in-memory demo labels (OPENFDA_OFFLINE set)");
        demo_labels()
    } else {
        info!("using openFDA label source");
        Arc::new(OpenFdaLabelSource::new())
    };

    Ok(Stores {
        names,
        classifications,
        labels,
        interactions,
        alternatives,
    })
}

fn classification(id: &str, atc: &str, class: &str) -> Classification {
    Classification {
        canonical_id: id.to_string(),
        atc_code: atc.to_string(),
        therapeutic_class: class.to_string(),
    }
}

/// Small built-in formulary covering the demo walkthroughs: common
/// analgesics, an antiplatelet, an anticoagulant, a statin and an
/// ACE inhibitor.
pub fn demo_formulary() -> Arc<InMemoryFormulary> {
    let formulary = InMemoryFormulary::new();

    formulary.insert(
        CanonicalDrug::new("acetaminophen", "acetaminophen", ["Tylenol", "Panadol"]),
        Some(classification("acetaminophen", "N02BE01", "Analgesics")),
    );
    formulary.insert(
        CanonicalDrug::new("ibuprofen", "ibuprofen", ["Advil", "Motrin"]),
        Some(classification("ibuprofen", "M01AE01", "Analgesics")),
    );
    formulary.insert(
        CanonicalDrug::new("naproxen", "naproxen", ["Aleve", "Naprosyn"]),
        Some(classification("naproxen", "M01AE02", "Analgesics")),
    );
    formulary.insert(
        CanonicalDrug::new("aspirin", "aspirin", ["Ecotrin", "Bufferin"]),
        Some(classification("aspirin", "B01AC06", "Antiplatelet Agents")),
    );
    formulary.insert(
        CanonicalDrug::new("warfarin", "warfarin", ["Coumadin", "Jantoven"]),
        Some(classification("warfarin", "B01AA03", "Anticoagulants")),
    );
    formulary.insert(
        CanonicalDrug::new("atorvastatin", "atorvastatin", ["Lipitor"]),
        Some(classification("atorvastatin", "C10AA05", "Statins")),
    );
    formulary.insert(
        CanonicalDrug::new("simvastatin", "simvastatin", ["Zocor"]),
        Some(classification("simvastatin", "C10AA01", "Statins")),
    );
    formulary.insert(
        CanonicalDrug::new("lisinopril", "lisinopril", ["Prinivil", "Zestril"]),
        Some(classification("lisinopril", "C09AA03", "ACE Inhibitors")),
    );

    Arc::new(formulary)
}

pub fn demo_interactions() -> Arc<InMemoryInteractions> {
    let interactions = InMemoryInteractions::new();

    interactions.insert(InteractionRecord {
        drug_a: "aspirin".to_string(),
        drug_b: "warfarin".to_string(),
        severity: Severity::Major,
        description: "Concurrent use greatly increases the risk of bleeding".to_string(),
    });
    interactions.insert(InteractionRecord {
        drug_a: "ibuprofen".to_string(),
        drug_b: "warfarin".to_string(),
        severity: Severity::Major,
        description: "NSAIDs increase anticoagulant effect and GI bleeding risk".to_string(),
    });
    interactions.insert(InteractionRecord {
        drug_a: "aspirin".to_string(),
        drug_b: "ibuprofen".to_string(),
        severity: Severity::Moderate,
        description: "Ibuprofen may blunt aspirin's antiplatelet effect".to_string(),
    });
    interactions.insert(InteractionRecord {
        drug_a: "lisinopril".to_string(),
        drug_b: "ibuprofen".to_string(),
        severity: Severity::Moderate,
        description: "NSAIDs may reduce the antihypertensive effect of ACE inhibitors".to_string(),
    });

    Arc::new(interactions)
}

pub fn demo_labels() -> Arc<InMemoryLabels> {
    let labels = InMemoryLabels::new();

    labels.insert(LabelInfo {
        canonical_id: "acetaminophen".to_string(),
        purpose: Some("Pain reliever / fever reducer".to_string()),
        warnings: vec![
            "Liver warning: contains acetaminophen".to_string(),
            "Do not use with other drugs containing acetaminophen".to_string(),
        ],
        brand_name: Some("Tylenol".to_string()),
        generic_name: Some("acetaminophen".to_string()),
    });
    labels.insert(LabelInfo {
        canonical_id: "aspirin".to_string(),
        purpose: Some("Pain reliever / fever reducer".to_string()),
        warnings: vec!["Reye's syndrome warning".to_string(), "Bleeding warning".to_string()],
        brand_name: Some("Ecotrin".to_string()),
        generic_name: Some("aspirin".to_string()),
    });
    labels.insert(LabelInfo {
        canonical_id: "warfarin".to_string(),
        purpose: Some("Anticoagulant".to_string()),
        warnings: vec!["May cause major or fatal bleeding".to_string()],
        brand_name: Some("Coumadin".to_string()),
        generic_name: Some("warfarin".to_string()),
    });

    Arc::new(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn demo_formulary_covers_the_walkthrough_scenarios() {
        let formulary = demo_formulary();

        let tylenol = formulary.resolve_brand("tylenol").await.unwrap().unwrap();
        assert_eq!(tylenol.canonical_id, "acetaminophen");

        let classification = formulary.classify("acetaminophen").await.unwrap().unwrap();
        assert_eq!(classification.therapeutic_class, "Analgesics");

        let alternatives = formulary
            .alternatives_in_class("Analgesics", "acetaminophen")
            .await
            .unwrap();
        assert!(!alternatives.is_empty());
        assert!(alternatives.iter().all(|d| d.canonical_id != "acetaminophen"));
    }

    #[tokio::test]
    async fn demo_interactions_include_the_aspirin_warfarin_pair() {
        let interactions = demo_interactions();

        let record = interactions
            .interaction("warfarin", "aspirin")
            .await
            .unwrap()
            .expect("known major interaction");
        assert_eq!(record.severity, Severity::Major);
    }
}
