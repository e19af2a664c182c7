//! PubMed import through the NCBI E-utilities `esummary` endpoint.

use serde_json::Value;

use super::{Datasource, ImportError, ImportedPublication};

pub const DEFAULT_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Publication type assigned to everything PubMed returns.
const PUBMED_PUBLICATION_TYPE: &str = "journal-articles";

#[derive(Debug, Clone)]
pub struct PubmedClient {
    http: reqwest::Client,
    base_url: String,
}

impl PubmedClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// GET request for one esummary record; `pmid` is sent as an encoded query value.
    pub fn summary_request(&self, pmid: &str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}/esummary.fcgi", self.base_url))
            .query(&[("db", "pubmed"), ("id", pmid), ("retmode", "json")])
    }

    pub async fn fetch(&self, pmid: &str) -> Result<ImportedPublication, ImportError> {
        tracing::info!("Fetching PubMed summary for {}", pmid);

        let document: Value = self
            .summary_request(pmid)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ImportError::Http(Datasource::Pubmed, e))?
            .json()
            .await
            .map_err(|e| ImportError::Malformed(Datasource::Pubmed, e.to_string()))?;

        parse_summary(pmid, &document)
    }
}

/// Map an esummary JSON document onto an [`ImportedPublication`].
pub fn parse_summary(pmid: &str, document: &Value) -> Result<ImportedPublication, ImportError> {
    let result = document.get("result").ok_or_else(|| {
        ImportError::Malformed(Datasource::Pubmed, "missing `result` object".to_string())
    })?;

    let not_found = || ImportError::NotFound {
        datasource: Datasource::Pubmed,
        sourceid: pmid.to_string(),
    };

    let summary = result.get(pmid).ok_or_else(not_found)?;
    if summary.get("error").is_some() {
        return Err(not_found());
    }

    let text = |key: &str| {
        summary
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let doi = summary
        .get("articleids")
        .and_then(Value::as_array)
        .and_then(|ids| {
            ids.iter().find(|id| id.get("idtype").and_then(Value::as_str) == Some("doi"))
        })
        .and_then(|id| id.get("value").and_then(Value::as_str))
        .map(str::to_string);

    let authors = summary
        .get("authors")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let publanguage = summary
        .get("lang")
        .and_then(Value::as_array)
        .and_then(|langs| langs.first())
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ImportedPublication {
        datasource: Datasource::Pubmed.to_string(),
        sourceid: pmid.to_string(),
        title: text("title").map(|t| t.trim_end_matches('.').to_string()),
        pubyear: text("pubdate").as_deref().and_then(year_of),
        publication_type: Some(PUBMED_PUBLICATION_TYPE.to_string()),
        publanguage,
        sourcetitle: text("fulljournalname").or_else(|| text("source")),
        sourcevolume: text("volume"),
        sourceissue: text("issue"),
        sourcepages: text("pages"),
        issn: text("issn").or_else(|| text("essn")),
        doi,
        pmid: Some(pmid.to_string()),
        authors,
    })
}

/// Leading four-digit year of a PubMed date such as `2014 Dec 15`.
fn year_of(date: &str) -> Option<i32> {
    date.get(..4).and_then(|y| y.parse().ok())
}
