pub mod department;
pub mod person;
pub mod publication;

pub use department::*;
pub use person::*;
pub use publication::*;
