pub mod flight_store;

pub use flight_store::{FlightStore, SqliteFlightStore};
