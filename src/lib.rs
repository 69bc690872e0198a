pub mod core;
pub mod extract;
pub mod features;
pub mod http;
pub mod scraping;
pub mod tools;

// --- Primary core exports ---
pub use core::error::LookupError;
pub use core::types;
pub use core::types::*;
pub use core::AppState;

pub use features::flight_store;
pub use tools::lookup;
