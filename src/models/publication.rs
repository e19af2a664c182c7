use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, Validator};
use crate::importers::ImportedPublication;
use crate::models::{Department, DepartmentRef};

/// Accepted values for `publication_type`
pub const PUBLICATION_TYPES: &[&str] = &[
    "journal-articles",
    "magazine-articles",
    "review-articles",
    "conference-papers",
    "conference-posters",
    "conference-abstracts",
    "books",
    "edited-books",
    "book-chapters",
    "reports",
    "doctoral-theses",
    "licentiate-theses",
    "patents",
    "other",
];

pub const PUBLICATION_COLUMNS: &str = r#"
    id, pubid, title, alt_title, abstract AS abstract_text, pubyear,
    publication_type, publanguage, sourcetitle, sourcevolume, sourceissue,
    sourcepages, issn, isbn, doi, pmid, url, keywords, pubnotes,
    category_hsv_local, is_draft, is_deleted, created_at, updated_at
"#;

/// Publication response model
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Publication {
    pub id: i32,
    /// Stable public identifier
    pub pubid: i32,
    pub title: Option<String>,
    pub alt_title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub pubyear: Option<i32>,
    pub publication_type: Option<String>,
    pub publanguage: Option<String>,
    pub sourcetitle: Option<String>,
    pub sourcevolume: Option<String>,
    pub sourceissue: Option<String>,
    pub sourcepages: Option<String>,
    pub issn: Option<String>,
    pub isbn: Option<String>,
    pub doi: Option<String>,
    pub pmid: Option<String>,
    pub url: Option<String>,
    pub keywords: Option<String>,
    pub pubnotes: Option<String>,
    /// Local research subject categories
    pub category_hsv_local: Vec<i32>,
    pub is_draft: bool,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Person listed on a publication, with the departments given for them
#[derive(Debug, Serialize, ToSchema)]
pub struct PublicationPerson {
    pub id: i32,
    pub first_name: Option<String>,
    pub last_name: String,
    pub year_of_birth: Option<i32>,
    pub affiliated: bool,
    pub position: i32,
    pub departments: Vec<Department>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublicationDetail {
    #[serde(flatten)]
    pub publication: Publication,
    pub people: Vec<PublicationPerson>,
}

/// Entry of the `people` list in an update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PersonLink {
    pub id: i32,
    #[serde(default)]
    pub departments: Vec<DepartmentRef>,
}

/// Whitelisted publication fields accepted on create and update.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PublicationParams {
    pub title: Option<String>,
    pub alt_title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub pubyear: Option<i32>,
    pub publication_type: Option<String>,
    pub publanguage: Option<String>,
    pub sourcetitle: Option<String>,
    pub sourcevolume: Option<String>,
    pub sourceissue: Option<String>,
    pub sourcepages: Option<String>,
    pub issn: Option<String>,
    pub isbn: Option<String>,
    pub doi: Option<String>,
    pub pmid: Option<String>,
    pub url: Option<String>,
    pub keywords: Option<String>,
    pub pubnotes: Option<String>,
    pub category_hsv_local: Option<Vec<i32>>,
    pub is_draft: Option<bool>,
    /// Replaces the people (and their departments) linked to the publication
    pub people: Option<Vec<PersonLink>>,
}

impl PublicationParams {
    /// Fill every field missing here from `fallback`.
    pub fn or(self, fallback: PublicationParams) -> PublicationParams {
        PublicationParams {
            title: self.title.or(fallback.title),
            alt_title: self.alt_title.or(fallback.alt_title),
            abstract_text: self.abstract_text.or(fallback.abstract_text),
            pubyear: self.pubyear.or(fallback.pubyear),
            publication_type: self.publication_type.or(fallback.publication_type),
            publanguage: self.publanguage.or(fallback.publanguage),
            sourcetitle: self.sourcetitle.or(fallback.sourcetitle),
            sourcevolume: self.sourcevolume.or(fallback.sourcevolume),
            sourceissue: self.sourceissue.or(fallback.sourceissue),
            sourcepages: self.sourcepages.or(fallback.sourcepages),
            issn: self.issn.or(fallback.issn),
            isbn: self.isbn.or(fallback.isbn),
            doi: self.doi.or(fallback.doi),
            pmid: self.pmid.or(fallback.pmid),
            url: self.url.or(fallback.url),
            keywords: self.keywords.or(fallback.keywords),
            pubnotes: self.pubnotes.or(fallback.pubnotes),
            category_hsv_local: self.category_hsv_local.or(fallback.category_hsv_local),
            is_draft: self.is_draft.or(fallback.is_draft),
            people: self.people.or(fallback.people),
        }
    }

    /// Apply these changes to an existing publication.
    ///
    /// Returns the merged record and the replacement people list, if any.
    pub fn merge_into(self, existing: Publication) -> (Publication, Option<Vec<PersonLink>>) {
        let merged = Publication {
            title: self.title.or(existing.title),
            alt_title: self.alt_title.or(existing.alt_title),
            abstract_text: self.abstract_text.or(existing.abstract_text),
            pubyear: self.pubyear.or(existing.pubyear),
            publication_type: self.publication_type.or(existing.publication_type),
            publanguage: self.publanguage.or(existing.publanguage),
            sourcetitle: self.sourcetitle.or(existing.sourcetitle),
            sourcevolume: self.sourcevolume.or(existing.sourcevolume),
            sourceissue: self.sourceissue.or(existing.sourceissue),
            sourcepages: self.sourcepages.or(existing.sourcepages),
            issn: self.issn.or(existing.issn),
            isbn: self.isbn.or(existing.isbn),
            doi: self.doi.or(existing.doi),
            pmid: self.pmid.or(existing.pmid),
            url: self.url.or(existing.url),
            keywords: self.keywords.or(existing.keywords),
            pubnotes: self.pubnotes.or(existing.pubnotes),
            category_hsv_local: self
                .category_hsv_local
                .unwrap_or(existing.category_hsv_local),
            is_draft: self.is_draft.unwrap_or(existing.is_draft),
            ..existing
        };
        (merged, self.people)
    }
}

impl From<ImportedPublication> for PublicationParams {
    fn from(imported: ImportedPublication) -> Self {
        PublicationParams {
            title: imported.title,
            pubyear: imported.pubyear,
            publication_type: imported.publication_type,
            publanguage: imported.publanguage,
            sourcetitle: imported.sourcetitle,
            sourcevolume: imported.sourcevolume,
            sourceissue: imported.sourceissue,
            sourcepages: imported.sourcepages,
            issn: imported.issn,
            doi: imported.doi,
            pmid: imported.pmid,
            ..Default::default()
        }
    }
}

/// Field checks shared by create and update.
///
/// A finalized (non-draft) publication needs a title.
pub fn validate_publication(
    publication_type: Option<&str>,
    title: Option<&str>,
    is_draft: bool,
    message: &str,
) -> Result<(), ApiError> {
    let mut v = Validator::new();

    if let Some(kind) = publication_type {
        if !PUBLICATION_TYPES.iter().any(|t| *t == kind) {
            v.add("publication_type", format!("'{}' is not a valid publication type", kind));
        }
    }

    if !is_draft && title.map_or(true, |t| t.trim().is_empty()) {
        v.add("title", "can't be blank");
    }

    v.finish(message)
}

/// Drop repeated people, and repeated departments within each person,
/// keeping the first occurrence of each id.
pub fn distinct_people(people: Vec<PersonLink>) -> Vec<PersonLink> {
    let mut seen = Vec::with_capacity(people.len());
    people
        .into_iter()
        .filter(|link| {
            if seen.contains(&link.id) {
                false
            } else {
                seen.push(link.id);
                true
            }
        })
        .map(|mut link| {
            let mut departments_seen = Vec::with_capacity(link.departments.len());
            link.departments.retain(|d| {
                if departments_seen.contains(&d.id) {
                    false
                } else {
                    departments_seen.push(d.id);
                    true
                }
            });
            link
        })
        .collect()
}

/// Request body: `{"publication": {...}}`
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PublicationRequest {
    #[serde(default)]
    pub publication: PublicationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublicationsResponse {
    pub publications: Vec<Publication>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublicationResponse {
    pub publication: PublicationDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportResponse {
    pub publication: ImportedPublication,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PublicationQuery {
    /// List drafts instead of finalized publications
    pub drafts: Option<bool>,
    /// Maximum number of results, 0 to 1000 (default: 100)
    pub limit: Option<i64>,
    /// Number of results to skip (default: 0)
    pub offset: Option<i64>,
}

const DEFAULT_PAGE_SIZE: i64 = 100;
const MAX_PAGE_SIZE: i64 = 1000;

impl PublicationQuery {
    /// Checked `(limit, offset)` pair for the listing query.
    pub fn page(&self) -> Result<(i64, i64), ApiError> {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0);

        let mut v = Validator::new();
        if !(0..=MAX_PAGE_SIZE).contains(&limit) {
            v.add("limit", format!("must be between 0 and {}", MAX_PAGE_SIZE));
        }
        if offset < 0 {
            v.add("offset", "must be greater than or equal to 0");
        }
        v.finish("Invalid paging parameters")?;

        Ok((limit, offset))
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ImportQuery {
    /// `pubmed`, or `none` for manual entry
    pub datasource: Option<String>,
    /// Record id in the datasource (e.g. a PubMed id)
    pub sourceid: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publication() -> Publication {
        Publication {
            id: 1,
            pubid: 2001,
            title: Some("Old title".to_string()),
            alt_title: None,
            abstract_text: None,
            pubyear: Some(2015),
            publication_type: Some("journal-articles".to_string()),
            publanguage: None,
            sourcetitle: None,
            sourcevolume: None,
            sourceissue: None,
            sourcepages: None,
            issn: None,
            isbn: None,
            doi: None,
            pmid: None,
            url: None,
            keywords: None,
            pubnotes: None,
            category_hsv_local: vec![],
            is_draft: false,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_merge_keeps_unchanged_fields() {
        let params = PublicationParams {
            title: Some("New test title".to_string()),
            category_hsv_local: Some(vec![1, 101]),
            ..Default::default()
        };
        let (merged, people) = params.merge_into(publication());
        assert_eq!(merged.title.as_deref(), Some("New test title"));
        assert_eq!(merged.pubyear, Some(2015));
        assert_eq!(merged.category_hsv_local, vec![1, 101]);
        assert_eq!(merged.pubid, 2001);
        assert!(!merged.is_draft);
        assert!(people.is_none());
    }

    #[test]
    fn test_unknown_publication_type() {
        let err = validate_publication(Some("non-existing-type"), Some("t"), false, "msg").unwrap_err();
        match err {
            ApiError::Validation { errors, .. } => assert!(errors.contains_key("publication_type")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_drafts_may_lack_title() {
        assert!(validate_publication(None, None, true, "msg").is_ok());
        assert!(validate_publication(None, Some(" "), false, "msg").is_err());
        assert!(validate_publication(Some("books"), Some("A book"), false, "msg").is_ok());
    }

    #[test]
    fn test_body_overrides_imported_fields() {
        let imported = ImportedPublication {
            title: Some("Imported".to_string()),
            pmid: Some("25505574".to_string()),
            ..Default::default()
        };
        let body = PublicationParams {
            title: Some("Edited".to_string()),
            ..Default::default()
        };
        let params = body.or(PublicationParams::from(imported));
        assert_eq!(params.title.as_deref(), Some("Edited"));
        assert_eq!(params.pmid.as_deref(), Some("25505574"));
    }

    #[test]
    fn test_distinct_people_keeps_first() {
        let links = vec![
            PersonLink { id: 3, departments: vec![DepartmentRef { id: 1 }] },
            PersonLink { id: 4, departments: vec![] },
            PersonLink { id: 3, departments: vec![] },
        ];
        let distinct = distinct_people(links);
        assert_eq!(distinct.iter().map(|l| l.id).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(distinct[0].departments.len(), 1);
    }

    #[test]
    fn test_distinct_people_drops_repeated_departments() {
        let links = vec![PersonLink {
            id: 3,
            departments: vec![
                DepartmentRef { id: 9 },
                DepartmentRef { id: 8 },
                DepartmentRef { id: 9 },
            ],
        }];
        let distinct = distinct_people(links);
        let ids: Vec<i32> = distinct[0].departments.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![9, 8]);
    }

    #[test]
    fn test_people_list_accepts_full_department_objects() {
        let req: PublicationRequest = serde_json::from_value(serde_json::json!({
            "publication": {
                "people": [{"id": 5, "departments": [{"id": 9, "name_sv": "Fysik", "start_year": 2000}]}]
            }
        }))
        .unwrap();
        let people = req.publication.people.unwrap();
        assert_eq!(people[0].departments[0].id, 9);
    }

    #[test]
    fn test_page_defaults_and_bounds() {
        let query = |limit, offset| PublicationQuery { drafts: None, limit, offset };

        assert_eq!(query(None, None).page().unwrap(), (100, 0));
        assert_eq!(query(Some(0), Some(40)).page().unwrap(), (0, 40));
        assert_eq!(query(Some(1000), None).page().unwrap(), (1000, 0));

        assert!(query(Some(-1), None).page().is_err());
        assert!(query(Some(1001), None).page().is_err());
        assert!(query(None, Some(-5)).page().is_err());
    }

    #[test]
    fn test_empty_request_body() {
        let req: PublicationRequest = serde_json::from_str("{}").unwrap();
        assert!(req.publication.title.is_none());
    }
}
