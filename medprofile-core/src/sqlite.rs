//! SQLite-backed lookup stores.
//!
//! The formulary database carries `drugs(canonical_id, generic_name)`,
//! `brand_names(brand_name, canonical_id)` and
//! `classifications(canonical_id, atc_code, therapeutic_class)`; the
//! interactions database carries
//! `interactions(drug_a, drug_b, severity, description)` with severity as
//! lowercase text. Both are read-only reference data imported ahead of time.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use crate::error::StoreError;
use crate::model::{CanonicalDrug, Classification, InteractionRecord, Severity};
use crate::store::{AlternativesStore, ClassificationStore, InteractionStore, NameLookup};

fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut => StoreError::transient("connection pool timed out"),
        other => StoreError::unavailable(other.to_string()),
    }
}

fn parse_severity(raw: &str) -> Result<Severity, StoreError> {
    match raw {
        "none" => Ok(Severity::None),
        "minor" => Ok(Severity::Minor),
        "moderate" => Ok(Severity::Moderate),
        "major" => Ok(Severity::Major),
        other => Err(StoreError::transient(format!(
            "unrecognized severity: {other}"
        ))),
    }
}

/// Formulary reference database: drug identities, name indexes and
/// classifications behind one pool.
pub struct SqliteFormulary {
    pool: SqlitePool,
}

impl SqliteFormulary {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_drug(&self, canonical_id: &str) -> Result<Option<CanonicalDrug>, StoreError> {
        let row = sqlx::query("SELECT canonical_id, generic_name FROM drugs WHERE canonical_id = ?1")
            .bind(canonical_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let canonical_id: String = row.try_get("canonical_id").map_err(map_sqlx_err)?;
        let generic_name: String = row.try_get("generic_name").map_err(map_sqlx_err)?;

        let brand_rows =
            sqlx::query("SELECT brand_name FROM brand_names WHERE canonical_id = ?1")
                .bind(&canonical_id)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_err)?;

        let mut drug = CanonicalDrug::new(canonical_id, generic_name, Vec::<String>::new());
        for row in brand_rows {
            let brand: String = row.try_get("brand_name").map_err(map_sqlx_err)?;
            drug.brand_names.insert(brand);
        }
        Ok(Some(drug))
    }
}

#[async_trait]
impl NameLookup for SqliteFormulary {
    async fn resolve_generic(&self, name: &str) -> Result<Option<CanonicalDrug>, StoreError> {
        let row = sqlx::query("SELECT canonical_id FROM drugs WHERE lower(generic_name) = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        match row {
            Some(row) => {
                let id: String = row.try_get("canonical_id").map_err(map_sqlx_err)?;
                self.load_drug(&id).await
            }
            None => Ok(None),
        }
    }

    async fn resolve_brand(&self, name: &str) -> Result<Option<CanonicalDrug>, StoreError> {
        let row = sqlx::query("SELECT canonical_id FROM brand_names WHERE lower(brand_name) = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        match row {
            Some(row) => {
                let id: String = row.try_get("canonical_id").map_err(map_sqlx_err)?;
                self.load_drug(&id).await
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ClassificationStore for SqliteFormulary {
    async fn classify(&self, canonical_id: &str) -> Result<Option<Classification>, StoreError> {
        let row = sqlx::query(
            "SELECT canonical_id, atc_code, therapeutic_class \
             FROM classifications WHERE canonical_id = ?1",
        )
        .bind(canonical_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match row {
            Some(row) => Ok(Some(Classification {
                canonical_id: row.try_get("canonical_id").map_err(map_sqlx_err)?,
                atc_code: row.try_get("atc_code").map_err(map_sqlx_err)?,
                therapeutic_class: row.try_get("therapeutic_class").map_err(map_sqlx_err)?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AlternativesStore for SqliteFormulary {
    async fn alternatives_in_class(
        &self,
        therapeutic_class: &str,
        excluding_id: &str,
    ) -> Result<Vec<CanonicalDrug>, StoreError> {
        let rows = sqlx::query(
            "SELECT canonical_id FROM classifications \
             WHERE therapeutic_class = ?1 AND canonical_id <> ?2 \
             ORDER BY canonical_id",
        )
        .bind(therapeutic_class)
        .bind(excluding_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let mut alternatives = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.try_get("canonical_id").map_err(map_sqlx_err)?;
            if let Some(drug) = self.load_drug(&id).await? {
                alternatives.push(drug);
            }
        }
        Ok(alternatives)
    }
}

/// Interaction reference database.
pub struct SqliteInteractions {
    pool: SqlitePool,
}

impl SqliteInteractions {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InteractionStore for SqliteInteractions {
    async fn interaction(
        &self,
        id_a: &str,
        id_b: &str,
    ) -> Result<Option<InteractionRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT drug_a, drug_b, severity, description FROM interactions \
             WHERE (drug_a = ?1 AND drug_b = ?2) OR (drug_a = ?2 AND drug_b = ?1) \
             LIMIT 1",
        )
        .bind(id_a)
        .bind(id_b)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match row {
            Some(row) => {
                let severity: String = row.try_get("severity").map_err(map_sqlx_err)?;
                Ok(Some(InteractionRecord {
                    drug_a: row.try_get("drug_a").map_err(map_sqlx_err)?,
                    drug_b: row.try_get("drug_b").map_err(map_sqlx_err)?,
                    severity: parse_severity(&severity)?,
                    description: row.try_get("description").map_err(map_sqlx_err)?,
                }))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        // A single connection keeps the in-memory database alive and shared.
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    async fn seeded_formulary() -> SqliteFormulary {
        let pool = memory_pool().await;
        sqlx::query(
            "CREATE TABLE drugs (canonical_id TEXT PRIMARY KEY, generic_name TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("CREATE TABLE brand_names (brand_name TEXT NOT NULL, canonical_id TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE classifications (canonical_id TEXT PRIMARY KEY, \
             atc_code TEXT NOT NULL, therapeutic_class TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();

        for (id, generic) in [("acetaminophen", "acetaminophen"), ("ibuprofen", "ibuprofen")] {
            sqlx::query("INSERT INTO drugs VALUES (?1, ?2)")
                .bind(id)
                .bind(generic)
                .execute(&pool)
                .await
                .unwrap();
        }
        for (brand, id) in [("Tylenol", "acetaminophen"), ("Advil", "ibuprofen")] {
            sqlx::query("INSERT INTO brand_names VALUES (?1, ?2)")
                .bind(brand)
                .bind(id)
                .execute(&pool)
                .await
                .unwrap();
        }
        for (id, atc, class) in [
            ("acetaminophen", "N02BE01", "Analgesics"),
            ("ibuprofen", "M01AE01", "Analgesics"),
        ] {
            sqlx::query("INSERT INTO classifications VALUES (?1, ?2, ?3)")
                .bind(id)
                .bind(atc)
                .bind(class)
                .execute(&pool)
                .await
                .unwrap();
        }

        SqliteFormulary::from_pool(pool)
    }

    #[tokio::test]
    async fn formulary_round_trips_names_classes_and_alternatives() {
        let formulary = seeded_formulary().await;

        let drug = formulary
            .resolve_brand("tylenol")
            .await
            .unwrap()
            .expect("brand should resolve");
        assert_eq!(drug.canonical_id, "acetaminophen");
        assert!(drug.brand_names.contains("Tylenol"));

        let classification = formulary
            .classify("acetaminophen")
            .await
            .unwrap()
            .expect("classification on file");
        assert_eq!(classification.therapeutic_class, "Analgesics");

        let alternatives = formulary
            .alternatives_in_class("Analgesics", "acetaminophen")
            .await
            .unwrap();
        assert_eq!(alternatives.len(), 1);
        assert_eq!(alternatives[0].canonical_id, "ibuprofen");

        assert!(formulary.resolve_generic("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn interaction_rows_resolve_in_either_order() {
        let pool = memory_pool().await;
        sqlx::query(
            "CREATE TABLE interactions (drug_a TEXT NOT NULL, drug_b TEXT NOT NULL, \
             severity TEXT NOT NULL, description TEXT NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO interactions VALUES ('aspirin', 'warfarin', 'major', 'Bleeding risk')")
            .execute(&pool)
            .await
            .unwrap();

        let store = SqliteInteractions::from_pool(pool);

        let forward = store.interaction("aspirin", "warfarin").await.unwrap();
        let reverse = store.interaction("warfarin", "aspirin").await.unwrap();
        assert_eq!(forward, reverse);
        assert_eq!(forward.unwrap().severity, Severity::Major);

        assert!(store.interaction("aspirin", "ibuprofen").await.unwrap().is_none());
    }

    #[test]
    fn severity_text_outside_the_enum_is_rejected() {
        assert!(parse_severity("catastrophic").is_err());
        assert_eq!(parse_severity("moderate").unwrap(), Severity::Moderate);
    }
}
