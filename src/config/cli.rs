use crate::core::register::SortOrder;
use crate::core::{EquipmentKind, InspectionResult, ServiceStatus};
use clap::{Parser, Subcommand};
use chrono::NaiveDate;

#[derive(Debug, Clone, Parser)]
#[command(name = "kit-compliance")]
#[command(about = "Equipment inspection register and certificate numbering")]
pub struct CliConfig {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "compliance.toml")]
    pub config: String,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    /// Evaluate statuses as of this date instead of today
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Email of the user making changes, checked against the admin allowlist
    #[arg(long, env = "KIT_COMPLIANCE_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the retest date for a test date
    Retest { test_date: String },

    /// Classify a retest date as valid, upcoming or expired
    Status { retest_date: String },

    /// Reduce an exported CSV of service records to the latest per serial
    Latest {
        #[arg(long)]
        csv: String,
    },

    /// Show the current register for one equipment kind
    Register {
        #[arg(long)]
        kind: EquipmentKind,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        status: Option<ServiceStatus>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value = "retest")]
        sort: SortOrder,
    },

    /// Count valid, upcoming and expired equipment
    Summary {
        #[arg(long)]
        kind: EquipmentKind,
        #[arg(long)]
        company: Option<String>,
    },

    /// Every record for one serial, newest first
    History {
        #[arg(long)]
        kind: EquipmentKind,
        #[arg(long)]
        serial: String,
    },

    /// Reserve the next certificate number
    NextCert {
        #[arg(long)]
        kind: EquipmentKind,
    },

    /// Record an inspection and issue its certificate
    Record {
        #[arg(long)]
        kind: EquipmentKind,
        #[arg(long)]
        serial: String,
        #[arg(long)]
        test_date: String,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        engineer: Option<String>,
        #[arg(long)]
        result: Option<InspectionResult>,
        #[arg(long)]
        notes: Option<String>,
        /// Extra kind-specific column, e.g. `safe_working_load=2000`
        #[arg(long = "field", value_parser = parse_key_value)]
        fields: Vec<(String, String)>,
    },

    /// List customer companies
    Companies,

    /// List configured engineers
    Engineers,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got '{}'", raw)),
    }
}
