//! External metadata import.
//!
//! Importers turn a record in an outside bibliographic database into an
//! [`ImportedPublication`], which can be shown to the user or stored as a draft.

pub mod pubmed;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

pub use pubmed::PubmedClient;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Unknown datasource: {0}")]
    UnknownDatasource(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    #[error("No {datasource} record found for {sourceid}")]
    NotFound {
        datasource: Datasource,
        sourceid: String,
    },

    #[error("Could not reach {0}: {1}")]
    Http(Datasource, #[source] reqwest::Error),

    #[error("Unexpected response from {0}: {1}")]
    Malformed(Datasource, String),
}

/// Where publication data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datasource {
    /// Entered by hand, nothing to fetch
    None,
    Pubmed,
}

impl FromStr for Datasource {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Datasource::None),
            "pubmed" => Ok(Datasource::Pubmed),
            other => Err(ImportError::UnknownDatasource(other.to_string())),
        }
    }
}

impl fmt::Display for Datasource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datasource::None => write!(f, "none"),
            Datasource::Pubmed => write!(f, "pubmed"),
        }
    }
}

/// Publication fields as delivered by an external source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ImportedPublication {
    pub datasource: String,
    pub sourceid: String,
    pub title: Option<String>,
    pub pubyear: Option<i32>,
    pub publication_type: Option<String>,
    pub publanguage: Option<String>,
    pub sourcetitle: Option<String>,
    pub sourcevolume: Option<String>,
    pub sourceissue: Option<String>,
    pub sourcepages: Option<String>,
    pub issn: Option<String>,
    pub doi: Option<String>,
    pub pmid: Option<String>,
    /// Author names as printed by the source
    pub authors: Vec<String>,
}

/// Fetch `sourceid` from `datasource`.
pub async fn fetch(
    pubmed: &PubmedClient,
    datasource: Datasource,
    sourceid: &str,
) -> Result<ImportedPublication, ImportError> {
    let sourceid = sourceid.trim();
    if sourceid.is_empty() {
        return Err(ImportError::MissingParameter("sourceid"));
    }

    match datasource {
        Datasource::Pubmed => pubmed.fetch(sourceid).await,
        Datasource::None => Err(ImportError::UnknownDatasource(datasource.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_datasource_names() {
        assert_eq!("pubmed".parse::<Datasource>().unwrap(), Datasource::Pubmed);
        assert_eq!("PubMed".parse::<Datasource>().unwrap(), Datasource::Pubmed);
        assert_eq!("none".parse::<Datasource>().unwrap(), Datasource::None);
        assert_eq!("".parse::<Datasource>().unwrap(), Datasource::None);
        assert!(matches!(
            "scopus".parse::<Datasource>(),
            Err(ImportError::UnknownDatasource(name)) if name == "scopus"
        ));
    }

    #[tokio::test]
    async fn blank_sourceid_is_rejected_before_any_request() {
        let client = PubmedClient::new("http://127.0.0.1:9");
        let err = fetch(&client, Datasource::Pubmed, "  ").await.unwrap_err();
        assert!(matches!(err, ImportError::MissingParameter("sourceid")));
    }

    #[tokio::test]
    async fn none_has_nothing_to_fetch() {
        let client = PubmedClient::new("http://127.0.0.1:9");
        let err = fetch(&client, Datasource::None, "123").await.unwrap_err();
        assert!(matches!(err, ImportError::UnknownDatasource(_)));
    }
}
