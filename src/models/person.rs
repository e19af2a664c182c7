use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, Validator};
use crate::utils::is_valid_orcid;

/// Identifier source for local (x-) accounts.
pub const XKONTO_SOURCE: &str = "xkonto";
/// Identifier source for ORCID iDs.
pub const ORCID_SOURCE: &str = "orcid";

const MIN_YEAR_OF_BIRTH: i32 = 1800;
const MAX_YEAR_OF_BIRTH: i32 = 2100;

/// Columns selected for every [`Person`] query; expects `people` aliased as `p`.
pub const PERSON_COLUMNS: &str = r#"
    p.id, p.first_name, p.last_name, p.year_of_birth, p.affiliated,
    (SELECT i.value FROM identifiers i JOIN sources s ON s.id = i.source_id
      WHERE i.person_id = p.id AND s.name = 'xkonto' ORDER BY i.id LIMIT 1) AS xaccount,
    (SELECT i.value FROM identifiers i JOIN sources s ON s.id = i.source_id
      WHERE i.person_id = p.id AND s.name = 'orcid' ORDER BY i.id LIMIT 1) AS orcid,
    p.created_at, p.updated_at
"#;

/// Person response model
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Person {
    pub id: i32,
    pub first_name: Option<String>,
    pub last_name: String,
    pub year_of_birth: Option<i32>,
    pub affiliated: bool,
    /// Local account name, if the person has one
    pub xaccount: Option<String>,
    pub orcid: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    /// One-line description used in search results, e.g.
    /// `Anna Svensson, 1970 (xanna), Physics, Chemistry`.
    pub fn presentation_string(&self, affiliations: &[String]) -> String {
        let mut s = [self.first_name.as_deref(), Some(self.last_name.as_str())]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<&str>>()
            .join(" ");

        if let Some(year) = self.year_of_birth {
            s.push_str(&format!(", {}", year));
        }
        if let Some(xaccount) = &self.xaccount {
            s.push_str(&format!(" ({})", xaccount));
        }
        if !affiliations.is_empty() {
            s.push_str(", ");
            s.push_str(&affiliations.join(", "));
        }
        s
    }
}

/// Person as returned by the search endpoint
#[derive(Debug, Serialize, ToSchema)]
pub struct PersonListing {
    #[serde(flatten)]
    pub person: Person,
    pub presentation_string: String,
}

/// Person with its identifiers and name variants
#[derive(Debug, Serialize, ToSchema)]
pub struct PersonDetail {
    #[serde(flatten)]
    pub person: Person,
    pub identifiers: Vec<Identifier>,
    pub alternative_names: Vec<AlternativeName>,
}

/// External account or ID belonging to a person
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Identifier {
    pub id: i32,
    pub person_id: i32,
    /// Source name, e.g. `xkonto` or `orcid`
    pub source: String,
    pub value: String,
}

/// Alternative spelling of a person's name
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct AlternativeName {
    pub id: i32,
    pub person_id: i32,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AlternativeNameParams {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Whitelisted person fields accepted on create and update.
///
/// Anything else in the request body is ignored.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PersonParams {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub year_of_birth: Option<i32>,
    pub affiliated: Option<bool>,
    /// Creates or replaces the person's `xkonto` identifier
    pub xaccount: Option<String>,
    /// Creates or replaces the person's `orcid` identifier
    pub orcid: Option<String>,
    /// Replaces the list of alternative names
    pub alternative_names: Option<Vec<AlternativeNameParams>>,
}

impl PersonParams {
    /// Field validation; `creating` additionally requires a last name.
    pub fn validate(&self, creating: bool, message: &str) -> Result<(), ApiError> {
        let mut v = Validator::new();

        match self.last_name.as_deref() {
            Some(name) if name.trim().is_empty() => v.add("last_name", "can't be blank"),
            None if creating => v.add("last_name", "can't be blank"),
            _ => {}
        }

        if let Some(year) = self.year_of_birth {
            if !(MIN_YEAR_OF_BIRTH..=MAX_YEAR_OF_BIRTH).contains(&year) {
                v.add(
                    "year_of_birth",
                    format!("must be between {} and {}", MIN_YEAR_OF_BIRTH, MAX_YEAR_OF_BIRTH),
                );
            }
        }

        if let Some(orcid) = self.orcid.as_deref().map(str::trim) {
            if !orcid.is_empty() && !is_valid_orcid(orcid) {
                v.add("orcid", "is not a valid ORCID iD");
            }
        }

        v.finish(message)
    }

    /// Identifier values to store, keyed by source name. Blank values are skipped.
    pub fn identifiers(&self) -> Vec<(&'static str, String)> {
        [
            (XKONTO_SOURCE, self.xaccount.as_deref()),
            (ORCID_SOURCE, self.orcid.as_deref()),
        ]
        .into_iter()
        .filter_map(|(source, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (source, v.to_string()))
        })
        .collect()
    }
}

/// Request body: `{"person": {...}}`
#[derive(Debug, Deserialize, ToSchema)]
pub struct PersonRequest {
    pub person: PersonParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PeopleResponse {
    pub people: Vec<PersonListing>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PersonResponse {
    pub person: PersonDetail,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PersonQuery {
    /// Substring of a first, last or alternative name, or of an identifier
    pub search_term: Option<String>,
    /// Exact local account name; takes precedence over `search_term`
    pub xkonto: Option<String>,
}
