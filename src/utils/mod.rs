pub mod affiliation;
pub mod identifier;
pub mod search;

pub use affiliation::most_recent_distinct;
pub use identifier::is_valid_orcid;
pub use search::{contains_pattern, normalize_term};
