use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use super::{FieldMapping, FieldMappingInput};
use crate::store::RepositoryError;

#[async_trait]
pub trait FieldMappingRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<FieldMapping>, RepositoryError>;
    async fn insert(&self, input: FieldMappingInput) -> Result<FieldMapping, RepositoryError>;
    async fn update(
        &self,
        id: i64,
        input: FieldMappingInput,
    ) -> Result<FieldMapping, RepositoryError>;
    /// Remove a row and return it as it was.
    async fn delete(&self, id: i64) -> Result<FieldMapping, RepositoryError>;
}

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    rows: BTreeMap<i64, FieldMapping>,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryFieldMappingRepository {
    rows: Arc<Mutex<Rows>>,
}

#[async_trait]
impl FieldMappingRepository for InMemoryFieldMappingRepository {
    async fn list(&self) -> Result<Vec<FieldMapping>, RepositoryError> {
        let rows = self.rows.lock().expect("field mappings poisoned");
        Ok(rows.rows.values().cloned().collect())
    }

    async fn insert(&self, input: FieldMappingInput) -> Result<FieldMapping, RepositoryError> {
        let mut rows = self.rows.lock().expect("field mappings poisoned");
        rows.next_id += 1;
        let mapping = input.into_mapping(rows.next_id);
        rows.rows.insert(mapping.id, mapping.clone());
        Ok(mapping)
    }

    async fn update(
        &self,
        id: i64,
        input: FieldMappingInput,
    ) -> Result<FieldMapping, RepositoryError> {
        let mut rows = self.rows.lock().expect("field mappings poisoned");
        let slot = rows.rows.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        *slot = input.into_mapping(id);
        Ok(slot.clone())
    }

    async fn delete(&self, id: i64) -> Result<FieldMapping, RepositoryError> {
        let mut rows = self.rows.lock().expect("field mappings poisoned");
        rows.rows.remove(&id).ok_or(RepositoryError::NotFound)
    }
}

#[derive(Debug, Clone)]
pub struct SqliteFieldMappingRepository {
    pool: SqlitePool,
}

impl SqliteFieldMappingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, id: i64) -> Result<Option<FieldMapping>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, field_name, acquaint_crm, propertydrive, daft, myhome \
             FROM field_mappings WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(mapping_from_row).transpose()?)
    }
}

fn mapping_from_row(row: &SqliteRow) -> Result<FieldMapping, sqlx::Error> {
    Ok(FieldMapping {
        id: row.try_get("id")?,
        field_name: row.try_get("field_name")?,
        acquaint_crm: row.try_get("acquaint_crm")?,
        propertydrive: row.try_get("propertydrive")?,
        daft: row.try_get("daft")?,
        myhome: row.try_get("myhome")?,
    })
}

#[async_trait]
impl FieldMappingRepository for SqliteFieldMappingRepository {
    async fn list(&self) -> Result<Vec<FieldMapping>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, field_name, acquaint_crm, propertydrive, daft, myhome \
             FROM field_mappings ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| mapping_from_row(row).map_err(RepositoryError::from))
            .collect()
    }

    async fn insert(&self, input: FieldMappingInput) -> Result<FieldMapping, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO field_mappings (field_name, acquaint_crm, propertydrive, daft, myhome) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(input.field_name.as_deref())
        .bind(input.acquaint_crm.as_deref())
        .bind(input.propertydrive.as_deref())
        .bind(input.daft.as_deref())
        .bind(input.myhome.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(input.into_mapping(result.last_insert_rowid()))
    }

    async fn update(
        &self,
        id: i64,
        input: FieldMappingInput,
    ) -> Result<FieldMapping, RepositoryError> {
        sqlx::query(
            "UPDATE field_mappings SET field_name = ?, acquaint_crm = ?, propertydrive = ?, \
             daft = ?, myhome = ? WHERE id = ?",
        )
        .bind(input.field_name.as_deref())
        .bind(input.acquaint_crm.as_deref())
        .bind(input.propertydrive.as_deref())
        .bind(input.daft.as_deref())
        .bind(input.myhome.as_deref())
        .bind(id)
        .execute(&self.pool)
        .await?;
        self.fetch(id).await?.ok_or(RepositoryError::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<FieldMapping, RepositoryError> {
        let existing = self.fetch(id).await?.ok_or(RepositoryError::NotFound)?;
        sqlx::query("DELETE FROM field_mappings WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(existing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::connect_sqlite;

    fn input(field: &str, daft: &str) -> FieldMappingInput {
        FieldMappingInput {
            field_name: Some(field.to_string()),
            daft: Some(daft.to_string()),
            ..FieldMappingInput::default()
        }
    }

    #[tokio::test]
    async fn sqlite_rows_round_trip_through_update_and_delete() {
        let pool = connect_sqlite("sqlite::memory:").await.expect("sqlite");
        let repository = SqliteFieldMappingRepository::new(pool);

        let created = repository
            .insert(input("bedrooms", "bedroom_count"))
            .await
            .expect("insert");
        assert_eq!(created.field_name.as_deref(), Some("bedrooms"));

        let updated = repository
            .update(created.id, input("bedrooms", "beds"))
            .await
            .expect("update");
        assert_eq!(updated.daft.as_deref(), Some("beds"));
        assert_eq!(repository.list().await.expect("list"), vec![updated.clone()]);

        let deleted = repository.delete(created.id).await.expect("delete");
        assert_eq!(deleted, updated);
        assert!(repository.list().await.expect("list").is_empty());
        assert!(matches!(
            repository.update(created.id, input("x", "y")).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn memory_store_reports_missing_rows() {
        let repository = InMemoryFieldMappingRepository::default();
        assert!(matches!(
            repository.delete(3).await,
            Err(RepositoryError::NotFound)
        ));
        let created = repository.insert(input("price", "price")).await.expect("insert");
        assert_eq!(created.id, 1);
    }
}
