use axum::extract::FromRef;
use sqlx::{Pool, Postgres};

use crate::importers::PubmedClient;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub pubmed: PubmedClient,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>, pubmed: PubmedClient) -> Self {
        Self { pool, pubmed }
    }
}

impl FromRef<AppState> for Pool<Postgres> {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for PubmedClient {
    fn from_ref(state: &AppState) -> Self {
        state.pubmed.clone()
    }
}
