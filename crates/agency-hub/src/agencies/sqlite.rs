use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::domain::{
    Agency, AgencyBookkeeping, AgencyId, AgencyProfile, AgencyUpdate, NewAgency,
};
use super::repository::AgencyRepository;
use crate::store::RepositoryError;

const SELECT_AGENCY: &str = "SELECT id, name, office_name, address1, address2, logo, site, \
     site_name, acquaint_site_prefix, daft_api_key, fourpm_branch_id, myhome_api_key, \
     myhome_group_id, unique_key, ghl_id, whmcs_id, primary_source, total_properties \
     FROM agencies";

/// Agency store on the `agencies` table.
#[derive(Debug, Clone)]
pub struct SqliteAgencyRepository {
    pool: SqlitePool,
}

impl SqliteAgencyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn require(&self, id: AgencyId) -> Result<Agency, RepositoryError> {
        self.get(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Write every column of an already-loaded agency back to its row.
    async fn store(&self, agency: &Agency) -> Result<(), RepositoryError> {
        let profile = &agency.profile;
        let bookkeeping = &agency.bookkeeping;
        let result = sqlx::query(
            "UPDATE agencies SET name = ?, office_name = ?, address1 = ?, address2 = ?, \
             logo = ?, site = ?, site_name = ?, acquaint_site_prefix = ?, daft_api_key = ?, \
             fourpm_branch_id = ?, myhome_api_key = ?, myhome_group_id = ?, unique_key = ?, \
             ghl_id = ?, whmcs_id = ?, primary_source = ?, total_properties = ? WHERE id = ?",
        )
        .bind(profile.name.as_deref())
        .bind(profile.office_name.as_deref())
        .bind(profile.address1.as_deref())
        .bind(profile.address2.as_deref())
        .bind(profile.logo.as_deref())
        .bind(profile.site.as_deref())
        .bind(profile.site_name.as_deref())
        .bind(profile.acquaint_site_prefix.as_deref())
        .bind(profile.daft_api_key.as_deref())
        .bind(profile.fourpm_branch_id)
        .bind(profile.myhome_api_key.as_deref())
        .bind(profile.myhome_group_id)
        .bind(profile.unique_key.as_deref())
        .bind(bookkeeping.ghl_id.as_deref())
        .bind(bookkeeping.whmcs_id.as_deref())
        .bind(bookkeeping.primary_source.as_deref())
        .bind(agency.total_properties)
        .bind(agency.id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

fn agency_from_row(row: &SqliteRow) -> Result<Agency, sqlx::Error> {
    Ok(Agency {
        id: AgencyId(row.try_get("id")?),
        profile: AgencyProfile {
            name: row.try_get("name")?,
            office_name: row.try_get("office_name")?,
            address1: row.try_get("address1")?,
            address2: row.try_get("address2")?,
            logo: row.try_get("logo")?,
            site: row.try_get("site")?,
            site_name: row.try_get("site_name")?,
            acquaint_site_prefix: row.try_get("acquaint_site_prefix")?,
            daft_api_key: row.try_get("daft_api_key")?,
            fourpm_branch_id: row.try_get("fourpm_branch_id")?,
            myhome_api_key: row.try_get("myhome_api_key")?,
            myhome_group_id: row.try_get("myhome_group_id")?,
            unique_key: row.try_get("unique_key")?,
        },
        bookkeeping: AgencyBookkeeping {
            ghl_id: row.try_get("ghl_id")?,
            whmcs_id: row.try_get("whmcs_id")?,
            primary_source: row.try_get("primary_source")?,
        },
        total_properties: row.try_get("total_properties")?,
    })
}

#[async_trait]
impl AgencyRepository for SqliteAgencyRepository {
    async fn list(&self) -> Result<Vec<Agency>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_AGENCY} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| agency_from_row(row).map_err(RepositoryError::from))
            .collect()
    }

    async fn get(&self, id: AgencyId) -> Result<Option<Agency>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_AGENCY} WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(agency_from_row).transpose()?)
    }

    async fn find_by_unique_key(
        &self,
        unique_key: &str,
    ) -> Result<Option<Agency>, RepositoryError> {
        let row = sqlx::query(&format!(
            "{SELECT_AGENCY} WHERE unique_key = ? ORDER BY id LIMIT 1"
        ))
        .bind(unique_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(agency_from_row).transpose()?)
    }

    async fn insert(&self, agency: NewAgency) -> Result<Agency, RepositoryError> {
        let profile = &agency.profile;
        let bookkeeping = &agency.bookkeeping;
        let result = sqlx::query(
            "INSERT INTO agencies (name, office_name, address1, address2, logo, site, \
             site_name, acquaint_site_prefix, daft_api_key, fourpm_branch_id, myhome_api_key, \
             myhome_group_id, unique_key, ghl_id, whmcs_id, primary_source, total_properties) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(profile.name.as_deref())
        .bind(profile.office_name.as_deref())
        .bind(profile.address1.as_deref())
        .bind(profile.address2.as_deref())
        .bind(profile.logo.as_deref())
        .bind(profile.site.as_deref())
        .bind(profile.site_name.as_deref())
        .bind(profile.acquaint_site_prefix.as_deref())
        .bind(profile.daft_api_key.as_deref())
        .bind(profile.fourpm_branch_id)
        .bind(profile.myhome_api_key.as_deref())
        .bind(profile.myhome_group_id)
        .bind(profile.unique_key.as_deref())
        .bind(bookkeeping.ghl_id.as_deref())
        .bind(bookkeeping.whmcs_id.as_deref())
        .bind(bookkeeping.primary_source.as_deref())
        .bind(agency.total_properties)
        .execute(&self.pool)
        .await?;

        let id = AgencyId(result.last_insert_rowid());
        Ok(agency.into_agency(id))
    }

    async fn apply_profile(
        &self,
        id: AgencyId,
        profile: AgencyProfile,
    ) -> Result<Agency, RepositoryError> {
        let mut agency = self.require(id).await?;
        agency.profile = profile;
        self.store(&agency).await?;
        Ok(agency)
    }

    async fn update(&self, id: AgencyId, update: AgencyUpdate) -> Result<Agency, RepositoryError> {
        let mut agency = self.require(id).await?;
        update.apply_to(&mut agency);
        self.store(&agency).await?;
        Ok(agency)
    }

    async fn set_total_properties(
        &self,
        id: AgencyId,
        total: i64,
    ) -> Result<Agency, RepositoryError> {
        let result = sqlx::query("UPDATE agencies SET total_properties = ? WHERE id = ?")
            .bind(total)
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        self.require(id).await
    }

    async fn delete(&self, id: AgencyId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM agencies WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
