use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Organizational unit a person can be affiliated to on a publication
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Department {
    pub id: i32,
    pub name_sv: String,
    pub name_en: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

/// Department reference inside a publication's people list.
///
/// Clients usually send back the full department object; only `id` is read.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct DepartmentRef {
    pub id: i32,
}
