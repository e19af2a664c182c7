use std::collections::HashMap;

use axum::{
    extract::State,
    http::{header, StatusCode},
    Json,
};
use sqlx::{PgConnection, Pool, Postgres};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{
    AlternativeName, AlternativeNameParams, Identifier, PeopleResponse, Person, PersonDetail,
    PersonListing, PersonQuery, PersonRequest, PersonResponse, PERSON_COLUMNS, XKONTO_SOURCE,
};
use crate::utils::affiliation::MAX_AFFILIATIONS;
use crate::utils::{contains_pattern, most_recent_distinct, normalize_term};

#[utoipa::path(
    get,
    path = "/people",
    tag = "people",
    params(PersonQuery),
    responses(
        (status = 200, description = "Matching people", body = PeopleResponse),
        (status = 500, description = "Internal server error", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_people(
    State(pool): State<Pool<Postgres>>,
    ApiQuery(query): ApiQuery<PersonQuery>,
) -> Result<Json<PeopleResponse>, ApiError> {
    let xkonto = query.xkonto.as_deref().and_then(normalize_term);
    let search_term = query.search_term.as_deref().and_then(normalize_term);

    let people = if let Some(xkonto) = xkonto {
        let sql = format!(
            r#"
            SELECT {}
            FROM people p
            WHERE p.id IN (
                SELECT i.person_id
                FROM identifiers i
                JOIN sources s ON s.id = i.source_id
                WHERE s.name = $1 AND lower(i.value) = $2
            )
            ORDER BY lower(p.last_name), lower(p.first_name), p.id
            "#,
            PERSON_COLUMNS
        );
        sqlx::query_as::<_, Person>(&sql)
            .bind(XKONTO_SOURCE)
            .bind(xkonto)
            .fetch_all(&pool)
            .await
    } else if let Some(term) = search_term {
        // Name hits only count for affiliated people; identifier hits count for anyone.
        let sql = format!(
            r#"
            SELECT {}
            FROM people p
            WHERE ((lower(p.first_name) LIKE $1 OR lower(p.last_name) LIKE $1) AND p.affiliated)
               OR (p.affiliated AND p.id IN (
                    SELECT a.person_id FROM alternative_names a
                    WHERE lower(a.first_name) LIKE $1 OR lower(a.last_name) LIKE $1))
               OR p.id IN (
                    SELECT i.person_id FROM identifiers i
                    WHERE lower(i.value) LIKE $1)
            ORDER BY lower(p.last_name), lower(p.first_name), p.id
            "#,
            PERSON_COLUMNS
        );
        let pattern = contains_pattern(&term);
        tracing::debug!("Searching people with pattern {:?}", pattern);
        sqlx::query_as::<_, Person>(&sql)
            .bind(pattern)
            .fetch_all(&pool)
            .await
    } else {
        let sql = format!(
            "SELECT {} FROM people p ORDER BY lower(p.last_name), lower(p.first_name), p.id",
            PERSON_COLUMNS
        );
        sqlx::query_as::<_, Person>(&sql).fetch_all(&pool).await
    }?;

    let ids: Vec<i32> = people.iter().map(|p| p.id).collect();
    let mut affiliations = affiliations_for_actors(&pool, &ids).await?;

    let people = people
        .into_iter()
        .map(|person| {
            let names = affiliations.remove(&person.id).unwrap_or_default();
            PersonListing {
                presentation_string: person.presentation_string(&names),
                person,
            }
        })
        .collect();

    Ok(Json(PeopleResponse { people }))
}

/// Most recent distinct department names (at most two) each person was
/// affiliated with on finalized, non-deleted publications.
pub async fn affiliations_for_actors(
    pool: &Pool<Postgres>,
    person_ids: &[i32],
) -> Result<HashMap<i32, Vec<String>>, sqlx::Error> {
    if person_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i32, String)> = sqlx::query_as(
        r#"
        SELECT p2p.person_id, d.name_sv
        FROM departments2people2publications d2p2p
        JOIN people2publications p2p ON p2p.id = d2p2p.people2publication_id
        JOIN publications pb ON pb.id = p2p.publication_id
        JOIN departments d ON d.id = d2p2p.department_id
        WHERE p2p.person_id = ANY($1)
          AND pb.is_draft = FALSE
          AND pb.is_deleted = FALSE
        ORDER BY p2p.person_id, d2p2p.updated_at DESC, d2p2p.id DESC
        "#,
    )
    .bind(person_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<i32, Vec<String>> = HashMap::new();
    for (person_id, name) in rows {
        grouped.entry(person_id).or_default().push(name);
    }

    Ok(grouped
        .into_iter()
        .map(|(id, names)| (id, most_recent_distinct(names, MAX_AFFILIATIONS)))
        .collect())
}

#[utoipa::path(
    get,
    path = "/people/{id}",
    tag = "people",
    params(("id" = i32, Path, description = "Person ID")),
    responses(
        (status = 200, description = "Person found", body = PersonResponse),
        (status = 404, description = "Person not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_person(
    State(pool): State<Pool<Postgres>>,
    ApiPath(id): ApiPath<i32>,
) -> Result<Json<PersonResponse>, ApiError> {
    let person = fetch_person(&pool, id)
        .await?
        .ok_or_else(|| person_not_found(id))?;

    let person = person_detail(&pool, person).await?;
    Ok(Json(PersonResponse { person }))
}

#[utoipa::path(
    post,
    path = "/people",
    tag = "people",
    request_body = PersonRequest,
    responses(
        (status = 201, description = "Person created", body = PersonResponse),
        (status = 422, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_person(
    State(pool): State<Pool<Postgres>>,
    ApiJson(request): ApiJson<PersonRequest>,
) -> Result<(StatusCode, [(header::HeaderName, String); 1], Json<PersonResponse>), ApiError> {
    const FAILED: &str = "Could not create the person";

    let params = request.person;
    params.validate(true, FAILED)?;

    let mut tx = pool.begin().await?;

    let id: i32 = sqlx::query_scalar(
        r#"
        INSERT INTO people (first_name, last_name, year_of_birth, affiliated)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(params.first_name.as_deref().map(str::trim))
    .bind(params.last_name.as_deref().map(str::trim))
    .bind(params.year_of_birth)
    .bind(params.affiliated.unwrap_or(false))
    .fetch_one(&mut *tx)
    .await?;

    store_identifiers(&mut tx, id, params.identifiers(), FAILED).await?;
    if let Some(names) = &params.alternative_names {
        replace_alternative_names(&mut tx, id, names).await?;
    }

    tx.commit().await?;
    tracing::info!("Created person {}", id);

    let person = fetch_person(&pool, id)
        .await?
        .ok_or_else(|| person_not_found(id))?;
    let person = person_detail(&pool, person).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/people/{}", id))],
        Json(PersonResponse { person }),
    ))
}

#[utoipa::path(
    put,
    path = "/people/{id}",
    tag = "people",
    params(("id" = i32, Path, description = "Person ID")),
    request_body = PersonRequest,
    responses(
        (status = 200, description = "Person updated", body = PersonResponse),
        (status = 404, description = "Person not found", body = crate::error::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_person(
    State(pool): State<Pool<Postgres>>,
    ApiPath(id): ApiPath<i32>,
    ApiJson(request): ApiJson<PersonRequest>,
) -> Result<Json<PersonResponse>, ApiError> {
    let existing = fetch_person(&pool, id)
        .await?
        .ok_or_else(|| person_not_found(id))?;

    let failed = format!("Could not update person {}", id);
    let params = request.person;
    params.validate(false, &failed)?;

    let mut tx = pool.begin().await?;

    // Absent fields keep their current value
    sqlx::query(
        r#"
        UPDATE people
        SET
            first_name = $1,
            last_name = $2,
            year_of_birth = $3,
            affiliated = $4,
            updated_at = NOW()
        WHERE id = $5
        "#,
    )
    .bind(params.first_name.as_deref().map(str::trim).map(str::to_string).or(existing.first_name))
    .bind(
        params
            .last_name
            .as_deref()
            .map(|n| n.trim().to_string())
            .unwrap_or(existing.last_name),
    )
    .bind(params.year_of_birth.or(existing.year_of_birth))
    .bind(params.affiliated.unwrap_or(existing.affiliated))
    .bind(id)
    .execute(&mut *tx)
    .await?;

    store_identifiers(&mut tx, id, params.identifiers(), &failed).await?;
    if let Some(names) = &params.alternative_names {
        replace_alternative_names(&mut tx, id, names).await?;
    }

    tx.commit().await?;
    tracing::info!("Updated person {}", id);

    let person = fetch_person(&pool, id)
        .await?
        .ok_or_else(|| person_not_found(id))?;
    let person = person_detail(&pool, person).await?;

    Ok(Json(PersonResponse { person }))
}

fn person_not_found(id: i32) -> ApiError {
    ApiError::NotFound(format!("Could not find person {}", id))
}

pub async fn fetch_person(pool: &Pool<Postgres>, id: i32) -> Result<Option<Person>, sqlx::Error> {
    let sql = format!("SELECT {} FROM people p WHERE p.id = $1", PERSON_COLUMNS);
    sqlx::query_as::<_, Person>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

async fn person_detail(pool: &Pool<Postgres>, person: Person) -> Result<PersonDetail, sqlx::Error> {
    let identifiers = sqlx::query_as::<_, Identifier>(
        r#"
        SELECT i.id, i.person_id, s.name AS source, i.value
        FROM identifiers i
        JOIN sources s ON s.id = i.source_id
        WHERE i.person_id = $1
        ORDER BY i.id
        "#,
    )
    .bind(person.id)
    .fetch_all(pool)
    .await?;

    let alternative_names = sqlx::query_as::<_, AlternativeName>(
        r#"
        SELECT id, person_id, first_name, last_name
        FROM alternative_names
        WHERE person_id = $1
        ORDER BY id
        "#,
    )
    .bind(person.id)
    .fetch_all(pool)
    .await?;

    Ok(PersonDetail {
        person,
        identifiers,
        alternative_names,
    })
}

/// Set the person's identifier for each source, replacing any previous value.
///
/// A value already owned by someone else is reported against the request
/// field it came from.
async fn store_identifiers(
    conn: &mut PgConnection,
    person_id: i32,
    identifiers: Vec<(&'static str, String)>,
    failed: &str,
) -> Result<(), ApiError> {
    for (source, value) in identifiers {
        sqlx::query(
            r#"
            DELETE FROM identifiers
            WHERE person_id = $1
              AND source_id = (SELECT id FROM sources WHERE name = $2)
            "#,
        )
        .bind(person_id)
        .bind(source)
        .execute(&mut *conn)
        .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO identifiers (person_id, source_id, value)
            SELECT $1, s.id, $3 FROM sources s WHERE s.name = $2
            "#,
        )
        .bind(person_id)
        .bind(source)
        .bind(&value)
        .execute(&mut *conn)
        .await;

        match inserted {
            Ok(_) => {}
            Err(e) if crate::error::is_unique_violation(&e) => {
                let field = if source == XKONTO_SOURCE { "xaccount" } else { source };
                let mut errors = crate::error::FieldErrors::new();
                errors.insert(field.to_string(), vec!["has already been taken".to_string()]);
                return Err(ApiError::validation(failed, errors));
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn replace_alternative_names(
    conn: &mut PgConnection,
    person_id: i32,
    names: &[AlternativeNameParams],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM alternative_names WHERE person_id = $1")
        .bind(person_id)
        .execute(&mut *conn)
        .await?;

    for name in names {
        sqlx::query(
            "INSERT INTO alternative_names (person_id, first_name, last_name) VALUES ($1, $2, $3)",
        )
        .bind(person_id)
        .bind(&name.first_name)
        .bind(&name.last_name)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
