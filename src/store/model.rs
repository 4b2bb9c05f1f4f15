//! Database row types for Diesel ORM.

use diesel::prelude::*;

use super::schema::{caas_application, caas_config};

/// Database row for an application.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = caas_application)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ApplicationRow {
    pub app_id: String,
    pub app_name: String,
    pub k8s_namespace: String,
    pub k8s_deployment_name: String,
    pub k8s_service_name: String,
    pub owner_user_id: String,
    pub cached_status: String,
    pub created_at: String,
}

/// Database row for a launch configuration.
#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = caas_config)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ConfigRow {
    pub config_id: String,
    pub app_id: String,
    pub image_link: String,
    pub external_port: i32,
    pub internal_port: i32,
    pub created_at: String,
}
