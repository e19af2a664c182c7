pub mod people;
pub mod publications;

pub use people::*;
pub use publications::*;
