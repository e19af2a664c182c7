use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    Json,
};
use serde_json::json;
use sqlx::{Executor, PgConnection, Pool, Postgres};

use crate::error::{ApiError, FieldErrors, Validator};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::importers::{self, Datasource, ImportError, PubmedClient};
use crate::models::{
    distinct_people, validate_publication, Department, ImportQuery, ImportResponse, PersonLink,
    Publication, PublicationDetail, PublicationParams, PublicationPerson, PublicationQuery,
    PublicationRequest, PublicationResponse, PublicationsResponse, PUBLICATION_COLUMNS,
};

#[derive(sqlx::FromRow)]
struct LinkedPersonRow {
    link_id: i32,
    id: i32,
    first_name: Option<String>,
    last_name: String,
    year_of_birth: Option<i32>,
    affiliated: bool,
    position: i32,
}

#[derive(sqlx::FromRow)]
struct LinkedDepartmentRow {
    people2publication_id: i32,
    #[sqlx(flatten)]
    department: Department,
}

#[utoipa::path(
    get,
    path = "/publications",
    tag = "publications",
    params(PublicationQuery),
    responses(
        (status = 200, description = "List of publications", body = PublicationsResponse),
        (status = 422, description = "Invalid paging parameters", body = crate::error::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_publications(
    State(pool): State<Pool<Postgres>>,
    ApiQuery(query): ApiQuery<PublicationQuery>,
) -> Result<Json<PublicationsResponse>, ApiError> {
    let drafts = query.drafts.unwrap_or(false);
    let (limit, offset) = query.page()?;

    let sql = format!(
        r#"
        SELECT {}
        FROM publications
        WHERE is_deleted = FALSE AND is_draft = $1
        ORDER BY updated_at DESC, id DESC
        LIMIT $2 OFFSET $3
        "#,
        PUBLICATION_COLUMNS
    );
    let publications = sqlx::query_as::<_, Publication>(&sql)
        .bind(drafts)
        .bind(limit)
        .bind(offset)
        .fetch_all(&pool)
        .await?;

    Ok(Json(PublicationsResponse { publications }))
}

#[utoipa::path(
    get,
    path = "/publications/{pubid}",
    tag = "publications",
    params(("pubid" = i32, Path, description = "Publication pubid")),
    responses(
        (status = 200, description = "Publication found", body = PublicationResponse),
        (status = 404, description = "Publication not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_publication(
    State(pool): State<Pool<Postgres>>,
    ApiPath(pubid): ApiPath<i32>,
) -> Result<Json<PublicationResponse>, ApiError> {
    let publication = fetch_publication(&pool, pubid)
        .await?
        .ok_or_else(|| publication_not_found(pubid))?;

    let publication = publication_detail(&pool, publication).await?;
    Ok(Json(PublicationResponse { publication }))
}

#[utoipa::path(
    post,
    path = "/publications",
    tag = "publications",
    params(ImportQuery),
    request_body(content = PublicationRequest, description = "Initial field values; the body may be omitted"),
    responses(
        (status = 201, description = "Draft publication created", body = PublicationResponse),
        (status = 422, description = "Validation or import failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_publication(
    State(pool): State<Pool<Postgres>>,
    State(pubmed): State<PubmedClient>,
    ApiQuery(query): ApiQuery<ImportQuery>,
    body: Bytes,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<PublicationResponse>), ApiError> {
    const FAILED: &str = "Could not create the publication";

    let request: PublicationRequest = if body.iter().all(u8::is_ascii_whitespace) {
        PublicationRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            let mut errors = FieldErrors::new();
            errors.insert("publication".to_string(), vec![e.to_string()]);
            ApiError::validation(FAILED, errors)
        })?
    };

    let datasource: Datasource = query.datasource.as_deref().unwrap_or("none").parse()?;
    let params = match datasource {
        Datasource::None => request.publication,
        source => {
            let sourceid = query
                .sourceid
                .as_deref()
                .ok_or(ImportError::MissingParameter("sourceid"))?;
            let imported = importers::fetch(&pubmed, source, sourceid)
                .await
                .inspect_err(|e| tracing::warn!("Import from {} failed: {}", source, e))?;
            request.publication.or(imported.into())
        }
    };

    let publication = insert_draft(&pool, params).await?;
    let location = format!("/publications/{}", publication.publication.pubid);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(PublicationResponse { publication }),
    ))
}

/// Store a new draft publication, linking the given people if any.
pub async fn insert_draft(
    pool: &Pool<Postgres>,
    params: PublicationParams,
) -> Result<PublicationDetail, ApiError> {
    const FAILED: &str = "Could not create the publication";

    validate_publication(
        params.publication_type.as_deref(),
        params.title.as_deref(),
        true,
        FAILED,
    )?;

    let mut tx = pool.begin().await?;

    let sql = format!(
        r#"
        INSERT INTO publications (
            title, alt_title, abstract, pubyear, publication_type, publanguage,
            sourcetitle, sourcevolume, sourceissue, sourcepages,
            issn, isbn, doi, pmid, url, keywords, pubnotes,
            category_hsv_local, is_draft
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, TRUE)
        RETURNING {}
        "#,
        PUBLICATION_COLUMNS
    );
    let publication = sqlx::query_as::<_, Publication>(&sql)
        .bind(&params.title)
        .bind(&params.alt_title)
        .bind(&params.abstract_text)
        .bind(params.pubyear)
        .bind(&params.publication_type)
        .bind(&params.publanguage)
        .bind(&params.sourcetitle)
        .bind(&params.sourcevolume)
        .bind(&params.sourceissue)
        .bind(&params.sourcepages)
        .bind(&params.issn)
        .bind(&params.isbn)
        .bind(&params.doi)
        .bind(&params.pmid)
        .bind(&params.url)
        .bind(&params.keywords)
        .bind(&params.pubnotes)
        .bind(params.category_hsv_local.clone().unwrap_or_default())
        .fetch_one(&mut *tx)
        .await?;

    if let Some(people) = params.people {
        replace_people(&mut tx, publication.id, people, FAILED).await?;
    }

    tx.commit().await?;
    tracing::info!("Created draft publication {}", publication.pubid);

    Ok(publication_detail(pool, publication).await?)
}

#[utoipa::path(
    put,
    path = "/publications/{pubid}",
    tag = "publications",
    params(("pubid" = i32, Path, description = "Publication pubid")),
    request_body = PublicationRequest,
    responses(
        (status = 200, description = "Publication updated", body = PublicationResponse),
        (status = 404, description = "Publication not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Validation failed or state conflict", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_publication(
    State(pool): State<Pool<Postgres>>,
    ApiPath(pubid): ApiPath<i32>,
    ApiJson(request): ApiJson<PublicationRequest>,
) -> Result<Json<PublicationResponse>, ApiError> {
    let failed = format!("Could not update publication {}", pubid);
    let params = request.publication;

    let mut tx = pool.begin().await?;

    let existing = lock_publication(&mut tx, pubid)
        .await?
        .ok_or_else(|| publication_not_found(pubid))?;

    if !existing.is_draft && params.is_draft == Some(true) {
        return Err(ApiError::Conflict(format!(
            "Publication {} is not a draft and cannot be turned back into one",
            pubid
        )));
    }

    let (merged, people) = params.merge_into(existing);
    validate_publication(
        merged.publication_type.as_deref(),
        merged.title.as_deref(),
        merged.is_draft,
        &failed,
    )?;

    sqlx::query(
        r#"
        UPDATE publications
        SET
            title = $1,
            alt_title = $2,
            abstract = $3,
            pubyear = $4,
            publication_type = $5,
            publanguage = $6,
            sourcetitle = $7,
            sourcevolume = $8,
            sourceissue = $9,
            sourcepages = $10,
            issn = $11,
            isbn = $12,
            doi = $13,
            pmid = $14,
            url = $15,
            keywords = $16,
            pubnotes = $17,
            category_hsv_local = $18,
            is_draft = $19,
            updated_at = NOW()
        WHERE id = $20
        "#,
    )
    .bind(&merged.title)
    .bind(&merged.alt_title)
    .bind(&merged.abstract_text)
    .bind(merged.pubyear)
    .bind(&merged.publication_type)
    .bind(&merged.publanguage)
    .bind(&merged.sourcetitle)
    .bind(&merged.sourcevolume)
    .bind(&merged.sourceissue)
    .bind(&merged.sourcepages)
    .bind(&merged.issn)
    .bind(&merged.isbn)
    .bind(&merged.doi)
    .bind(&merged.pmid)
    .bind(&merged.url)
    .bind(&merged.keywords)
    .bind(&merged.pubnotes)
    .bind(&merged.category_hsv_local)
    .bind(merged.is_draft)
    .bind(merged.id)
    .execute(&mut *tx)
    .await?;

    if let Some(people) = people {
        replace_people(&mut tx, merged.id, people, &failed).await?;
    }

    tx.commit().await?;
    tracing::info!("Updated publication {}", pubid);

    let publication = fetch_publication(&pool, pubid)
        .await?
        .ok_or_else(|| publication_not_found(pubid))?;
    let publication = publication_detail(&pool, publication).await?;

    Ok(Json(PublicationResponse { publication }))
}

#[utoipa::path(
    delete,
    path = "/publications/{pubid}",
    tag = "publications",
    params(("pubid" = i32, Path, description = "Publication pubid")),
    responses(
        (status = 200, description = "Draft deleted; empty object"),
        (status = 404, description = "Publication not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Publication is not a draft", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_publication(
    State(pool): State<Pool<Postgres>>,
    ApiPath(pubid): ApiPath<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    // Soft delete, guarded so a concurrently finalized publication is kept
    let deleted = sqlx::query(
        r#"
        UPDATE publications
        SET is_deleted = TRUE, updated_at = NOW()
        WHERE pubid = $1 AND is_draft AND NOT is_deleted
        "#,
    )
    .bind(pubid)
    .execute(&pool)
    .await?
    .rows_affected();

    if deleted == 0 {
        return Err(match fetch_publication(&pool, pubid).await? {
            Some(_) => ApiError::Conflict(format!(
                "Publication {} is not a draft and cannot be deleted",
                pubid
            )),
            None => publication_not_found(pubid),
        });
    }

    tracing::info!("Deleted draft publication {}", pubid);
    Ok(Json(json!({})))
}

#[utoipa::path(
    get,
    path = "/publications/fetch_import_data",
    tag = "publications",
    params(ImportQuery),
    responses(
        (status = 200, description = "Imported fields, not stored", body = ImportResponse),
        (status = 422, description = "Import failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn fetch_import_data(
    State(pubmed): State<PubmedClient>,
    ApiQuery(query): ApiQuery<ImportQuery>,
) -> Result<Json<ImportResponse>, ApiError> {
    let datasource: Datasource = query
        .datasource
        .as_deref()
        .ok_or(ImportError::MissingParameter("datasource"))?
        .parse()?;
    let sourceid = query.sourceid.as_deref().unwrap_or_default();

    let publication = importers::fetch(&pubmed, datasource, sourceid)
        .await
        .inspect_err(|e| tracing::warn!("Import from {} failed: {}", datasource, e))?;

    Ok(Json(ImportResponse { publication }))
}

fn publication_not_found(pubid: i32) -> ApiError {
    ApiError::NotFound(format!("Could not find publication {}", pubid))
}

/// Live (not deleted) publication with the given pubid.
pub async fn fetch_publication<'e, E>(executor: E, pubid: i32) -> Result<Option<Publication>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        "SELECT {} FROM publications WHERE pubid = $1 AND is_deleted = FALSE",
        PUBLICATION_COLUMNS
    );
    sqlx::query_as::<_, Publication>(&sql)
        .bind(pubid)
        .fetch_optional(executor)
        .await
}

/// Like [`fetch_publication`], but holds a row lock until the transaction ends.
async fn lock_publication(
    conn: &mut PgConnection,
    pubid: i32,
) -> Result<Option<Publication>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM publications WHERE pubid = $1 AND is_deleted = FALSE FOR UPDATE",
        PUBLICATION_COLUMNS
    );
    sqlx::query_as::<_, Publication>(&sql)
        .bind(pubid)
        .fetch_optional(conn)
        .await
}

async fn publication_detail(
    pool: &Pool<Postgres>,
    publication: Publication,
) -> Result<PublicationDetail, sqlx::Error> {
    let people = sqlx::query_as::<_, LinkedPersonRow>(
        r#"
        SELECT
            p2p.id AS link_id, p.id, p.first_name, p.last_name,
            p.year_of_birth, p.affiliated, p2p.position
        FROM people2publications p2p
        JOIN people p ON p.id = p2p.person_id
        WHERE p2p.publication_id = $1
        ORDER BY p2p.position
        "#,
    )
    .bind(publication.id)
    .fetch_all(pool)
    .await?;

    let link_ids: Vec<i32> = people.iter().map(|row| row.link_id).collect();
    let department_rows = sqlx::query_as::<_, LinkedDepartmentRow>(
        r#"
        SELECT
            d2p2p.people2publication_id,
            d.id, d.name_sv, d.name_en, d.start_year, d.end_year
        FROM departments2people2publications d2p2p
        JOIN departments d ON d.id = d2p2p.department_id
        WHERE d2p2p.people2publication_id = ANY($1)
        ORDER BY d2p2p.people2publication_id, d2p2p.position
        "#,
    )
    .bind(&link_ids)
    .fetch_all(pool)
    .await?;

    let mut departments: HashMap<i32, Vec<Department>> = HashMap::new();
    for row in department_rows {
        departments
            .entry(row.people2publication_id)
            .or_default()
            .push(row.department);
    }

    let people = people
        .into_iter()
        .map(|row| PublicationPerson {
            departments: departments.remove(&row.link_id).unwrap_or_default(),
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            year_of_birth: row.year_of_birth,
            affiliated: row.affiliated,
            position: row.position,
        })
        .collect();

    Ok(PublicationDetail { publication, people })
}

/// Replace the people (and their departments) linked to a publication.
///
/// Each distinct person gets one link row in list order; people given at
/// least one department are marked affiliated.
async fn replace_people(
    conn: &mut PgConnection,
    publication_id: i32,
    people: Vec<PersonLink>,
    failed: &str,
) -> Result<(), ApiError> {
    let people = distinct_people(people);

    let person_ids: Vec<i32> = people.iter().map(|link| link.id).collect();
    let mut department_ids: Vec<i32> = people
        .iter()
        .flat_map(|link| link.departments.iter().map(|d| d.id))
        .collect();
    department_ids.sort_unstable();
    department_ids.dedup();

    let known_people: Vec<i32> = sqlx::query_scalar("SELECT id FROM people WHERE id = ANY($1)")
        .bind(&person_ids)
        .fetch_all(&mut *conn)
        .await?;
    let known_departments: Vec<i32> =
        sqlx::query_scalar("SELECT id FROM departments WHERE id = ANY($1)")
            .bind(&department_ids)
            .fetch_all(&mut *conn)
            .await?;

    let mut v = Validator::new();
    for id in person_ids.iter().filter(|id| !known_people.contains(id)) {
        v.add("people", format!("Person {} does not exist", id));
    }
    for id in department_ids.iter().filter(|id| !known_departments.contains(id)) {
        v.add("departments", format!("Department {} does not exist", id));
    }
    v.finish(failed)?;

    // Department links go with their people2publications rows (ON DELETE CASCADE)
    sqlx::query("DELETE FROM people2publications WHERE publication_id = $1")
        .bind(publication_id)
        .execute(&mut *conn)
        .await?;

    for (position, link) in people.iter().enumerate() {
        let link_id: i32 = sqlx::query_scalar(
            r#"
            INSERT INTO people2publications (publication_id, person_id, position)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(publication_id)
        .bind(link.id)
        .bind(position as i32 + 1)
        .fetch_one(&mut *conn)
        .await?;

        for (department_position, department) in link.departments.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO departments2people2publications
                    (people2publication_id, department_id, position)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(link_id)
            .bind(department.id)
            .bind(department_position as i32 + 1)
            .execute(&mut *conn)
            .await?;
        }

        if !link.departments.is_empty() {
            sqlx::query(
                "UPDATE people SET affiliated = TRUE, updated_at = NOW() WHERE id = $1 AND affiliated = FALSE",
            )
            .bind(link.id)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(())
}
