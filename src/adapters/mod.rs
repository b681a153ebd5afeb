// Adapters layer: concrete implementations of the domain ports.

pub mod clock;
pub mod csv_import;
pub mod rest;

pub use clock::{FixedClock, SystemClock};
pub use rest::RestBackend;
