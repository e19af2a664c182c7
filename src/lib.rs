pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod importers;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;

// Re-export commonly used items
pub use config::Config;
pub use error::ApiError;
pub use models::{
    Department, Person, PersonParams, Publication, PublicationParams, PUBLICATION_TYPES,
};
pub use routes::{router, ApiDoc};
pub use state::AppState;
