pub mod loader;
pub mod schema;
pub mod store;

pub use loader::{LoadSummary, StoreLoader};
pub use schema::{IndexSpec, ModelSpec, TableSpec, GEOCODE_MODEL};
pub use store::Store;
