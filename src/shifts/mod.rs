mod admission;
mod models;
pub mod routes;
mod slot;

pub use admission::*;
pub use models::*;
pub use slot::*;
