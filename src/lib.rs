pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::AppConfig;

pub use adapters::{FixedClock, RestBackend, SystemClock};
pub use crate::core::{
    certificate::{format_certificate_number, CertificateNumbering},
    directory::Directory,
    latest::latest_per_serial,
    register::{ComplianceRegister, RegisterFilter},
    retest::compute_retest_date,
    status::classify,
};
pub use utils::error::{ComplianceError, Result};
