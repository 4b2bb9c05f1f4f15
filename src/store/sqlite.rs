//! SQLite-backed shadow store.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;

use super::connection::DbPool;
use super::model::{ApplicationRow, ConfigRow};
use super::schema::{caas_application, caas_config};
use super::{ApplicationRecord, ConfigRecord, ShadowStore, StoreError, StoredApplication};
use crate::status::WorkloadStatus;

/// Shadow store persisting to SQLite through a Diesel connection pool
pub struct SqliteShadowStore {
    pool: DbPool,
}

impl SqliteShadowStore {
    /// Create a store over an already-migrated pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(
        &self,
    ) -> Result<
        diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>,
        StoreError,
    > {
        self.pool
            .get()
            .map_err(|e| StoreError::Connection(e.to_string()))
    }

    fn application_row(app: &ApplicationRecord) -> ApplicationRow {
        ApplicationRow {
            app_id: app.id.clone(),
            app_name: app.name.clone(),
            k8s_namespace: app.namespace.clone(),
            k8s_deployment_name: app.workload_name.clone(),
            k8s_service_name: app.endpoint_name.clone(),
            owner_user_id: app.owner_id.clone(),
            cached_status: app.cached_status.as_str().to_string(),
            created_at: format_timestamp(&app.created_at),
        }
    }

    fn config_row(config: &ConfigRecord) -> ConfigRow {
        ConfigRow {
            config_id: config.id.clone(),
            app_id: config.application_id.clone(),
            image_link: config.image.clone(),
            external_port: i32::from(config.external_port),
            internal_port: i32::from(config.internal_port),
            created_at: format_timestamp(&config.created_at),
        }
    }

    fn application_from_row(row: ApplicationRow) -> Result<ApplicationRecord, StoreError> {
        let cached_status: WorkloadStatus =
            row.cached_status.parse().map_err(StoreError::Corrupt)?;
        Ok(ApplicationRecord {
            created_at: parse_timestamp(&row.created_at)?,
            id: row.app_id,
            name: row.app_name,
            namespace: row.k8s_namespace,
            workload_name: row.k8s_deployment_name,
            endpoint_name: row.k8s_service_name,
            owner_id: row.owner_user_id,
            cached_status,
        })
    }

    fn config_from_row(row: ConfigRow) -> Result<ConfigRecord, StoreError> {
        Ok(ConfigRecord {
            created_at: parse_timestamp(&row.created_at)?,
            external_port: parse_port(row.external_port)?,
            internal_port: parse_port(row.internal_port)?,
            id: row.config_id,
            application_id: row.app_id,
            image: row.image_link,
        })
    }
}

/// Fixed-width so that text ordering matches time ordering
fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{raw}': {e}")))
}

fn parse_port(raw: i32) -> Result<u16, StoreError> {
    u16::try_from(raw).map_err(|_| StoreError::Corrupt(format!("port {raw} out of range")))
}

impl ShadowStore for SqliteShadowStore {
    fn insert_application(
        &self,
        application: &ApplicationRecord,
        config: &ConfigRecord,
    ) -> Result<(), StoreError> {
        let app_row = Self::application_row(application);
        let config_row = Self::config_row(config);
        let mut conn = self.conn()?;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::insert_into(caas_application::table)
                .values(&app_row)
                .execute(conn)?;
            diesel::insert_into(caas_config::table)
                .values(&config_row)
                .execute(conn)?;
            Ok(())
        })
        .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn list_by_owner(&self, owner_id: &str) -> Result<Vec<StoredApplication>, StoreError> {
        let mut conn = self.conn()?;

        let app_rows: Vec<ApplicationRow> = caas_application::table
            .filter(caas_application::owner_user_id.eq(owner_id))
            .order((
                caas_application::created_at.asc(),
                caas_application::app_id.asc(),
            ))
            .select(ApplicationRow::as_select())
            .load(&mut conn)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let ids: Vec<&str> = app_rows.iter().map(|r| r.app_id.as_str()).collect();
        let config_rows: Vec<ConfigRow> = caas_config::table
            .filter(caas_config::app_id.eq_any(ids))
            .order((caas_config::created_at.asc(), caas_config::config_id.asc()))
            .select(ConfigRow::as_select())
            .load(&mut conn)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut configs_by_app: HashMap<String, Vec<ConfigRecord>> = HashMap::new();
        for row in config_rows {
            let config = Self::config_from_row(row)?;
            configs_by_app
                .entry(config.application_id.clone())
                .or_default()
                .push(config);
        }

        app_rows
            .into_iter()
            .map(|row| {
                let configs = configs_by_app.remove(&row.app_id).unwrap_or_default();
                Ok(StoredApplication {
                    application: Self::application_from_row(row)?,
                    configs,
                })
            })
            .collect()
    }

    fn delete_application(&self, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let deleted = diesel::delete(caas_application::table.find(id))
            .execute(&mut conn)
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(deleted > 0)
    }
}
