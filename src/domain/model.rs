use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Days between a test and the date by which the equipment must be retested.
/// Certificates already issued use 364, not a calendar year.
pub const RETEST_INTERVAL_DAYS: u64 = 364;

/// Lookahead in which a retest date counts as upcoming.
pub const UPCOMING_WINDOW_DAYS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Valid,
    Upcoming,
    Expired,
}

impl ServiceStatus {
    pub fn color(self) -> ColorToken {
        match self {
            ServiceStatus::Valid => ColorToken::Green,
            ServiceStatus::Upcoming => ColorToken::Amber,
            ServiceStatus::Expired => ColorToken::Red,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceStatus::Valid => "valid",
            ServiceStatus::Upcoming => "upcoming",
            ServiceStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "valid" => Ok(ServiceStatus::Valid),
            "upcoming" => Ok(ServiceStatus::Upcoming),
            "expired" => Ok(ServiceStatus::Expired),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorToken {
    Green,
    Amber,
    Red,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub status: ServiceStatus,
    pub color: ColorToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentKind {
    Compressor,
    RivetTool,
    SpotWelder,
    Loler,
    Service,
}

impl EquipmentKind {
    pub const ALL: [EquipmentKind; 5] = [
        EquipmentKind::Compressor,
        EquipmentKind::RivetTool,
        EquipmentKind::SpotWelder,
        EquipmentKind::Loler,
        EquipmentKind::Service,
    ];

    /// Table holding this kind's service records.
    pub fn service_table(self) -> &'static str {
        match self {
            EquipmentKind::Compressor => "compressor_service_records",
            EquipmentKind::RivetTool => "rivet_tool_service_records",
            EquipmentKind::SpotWelder => "spot_welder_service_records",
            EquipmentKind::Loler => "loler_service_records",
            EquipmentKind::Service => "service_records",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EquipmentKind::Compressor => "compressor",
            EquipmentKind::RivetTool => "rivet_tool",
            EquipmentKind::SpotWelder => "spot_welder",
            EquipmentKind::Loler => "loler",
            EquipmentKind::Service => "service",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EquipmentKind::Compressor => "Compressor",
            EquipmentKind::RivetTool => "Rivet tool",
            EquipmentKind::SpotWelder => "Spot welder",
            EquipmentKind::Loler => "LOLER lifting equipment",
            EquipmentKind::Service => "Service",
        }
    }
}

impl fmt::Display for EquipmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EquipmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        EquipmentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown equipment kind '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InspectionResult {
    Pass,
    Fail,
}

impl FromStr for InspectionResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pass" | "passed" => Ok(InspectionResult::Pass),
            "fail" | "failed" => Ok(InspectionResult::Fail),
            other => Err(format!("unknown result '{}'", other)),
        }
    }
}

/// One inspection or service of a piece of equipment, as stored in a
/// `*_service_records` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: i64,
    #[serde(default)]
    pub company_id: Option<String>,
    pub equipment_serial: String,
    #[serde(default)]
    pub equipment_name: Option<String>,
    #[serde(default)]
    pub certificate_number: Option<String>,
    pub test_date: NaiveDate,
    pub retest_date: NaiveDate,
    #[serde(default)]
    pub engineer_name: Option<String>,
    #[serde(default)]
    pub result: Option<InspectionResult>,
    /// Persisted copy of the derived status; never read back as truth.
    #[serde(default)]
    pub status: Option<ServiceStatus>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Kind-specific columns (working pressure, safe working load, ...).
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Form input for a new service record. Dates are raw strings as typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewServiceRecord {
    pub company_id: Option<String>,
    pub equipment_serial: String,
    pub equipment_name: Option<String>,
    pub test_date: String,
    pub engineer_name: Option<String>,
    pub result: Option<InspectionResult>,
    pub notes: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub id: i64,
    pub company_id: String,
    pub kind: EquipmentKind,
    pub name: String,
    pub serial_number: String,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engineer {
    pub name: String,
    #[serde(default)]
    pub signature_label: Option<String>,
}

/// A register line: the current record for one serial plus its derived status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterEntry {
    pub record: ServiceRecord,
    pub classification: Classification,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusSummary {
    pub valid: usize,
    pub upcoming: usize,
    pub expired: usize,
}

impl StatusSummary {
    pub fn total(&self) -> usize {
        self.valid + self.upcoming + self.expired
    }
}
