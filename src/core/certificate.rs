use crate::core::{Backend, EquipmentKind};
use crate::utils::error::{ComplianceError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

pub const DEFAULT_SEQUENCE_RPC: &str = "reserve_certificate_slot";

/// Largest series base accepted from configuration.
pub const MAX_CERTIFICATE_BASE: u64 = 999_999_999;

/// How the slot for the next certificate is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberingStrategy {
    /// Atomic server-side counter (RPC). Safe under concurrent issuing.
    #[default]
    Sequence,
    /// Exact row count of the table. Races are left to the insert-retry loop.
    RowCount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSeries {
    pub prefix: String,
    pub base: u64,
}

impl CertificateSeries {
    pub fn new(prefix: &str, base: u64) -> Self {
        Self {
            prefix: prefix.to_string(),
            base,
        }
    }

    pub fn default_for(kind: EquipmentKind) -> Self {
        match kind {
            EquipmentKind::Service => Self::new("BWS", 1001),
            EquipmentKind::Compressor => Self::new("CMP", 2000),
            EquipmentKind::RivetTool => Self::new("RVT", 1001),
            EquipmentKind::SpotWelder => Self::new("SPW", 1001),
            EquipmentKind::Loler => Self::new("LOL", 1001),
        }
    }
}

/// `<prefix>-<base + issued>`, where `issued` is how many certificates
/// exist before this one.
pub fn format_certificate_number(prefix: &str, base: u64, issued: u64) -> Result<String> {
    let number = base
        .checked_add(issued)
        .ok_or_else(|| ComplianceError::CertificateNumber {
            prefix: prefix.to_string(),
            reason: format!("number out of range ({} + {})", base, issued),
        })?;
    Ok(format!("{}-{}", prefix, number))
}

#[derive(Debug, Clone)]
pub struct CertificateNumbering {
    strategy: NumberingStrategy,
    sequence_rpc: String,
    series: BTreeMap<EquipmentKind, CertificateSeries>,
}

impl Default for CertificateNumbering {
    fn default() -> Self {
        Self::new(NumberingStrategy::default(), DEFAULT_SEQUENCE_RPC, BTreeMap::new())
    }
}

impl CertificateNumbering {
    /// Kinds missing from `series` fall back to their built-in prefix and base.
    pub fn new(
        strategy: NumberingStrategy,
        sequence_rpc: &str,
        mut series: BTreeMap<EquipmentKind, CertificateSeries>,
    ) -> Self {
        for kind in EquipmentKind::ALL {
            series
                .entry(kind)
                .or_insert_with(|| CertificateSeries::default_for(kind));
        }
        Self {
            strategy,
            sequence_rpc: sequence_rpc.to_string(),
            series,
        }
    }

    pub fn strategy(&self) -> NumberingStrategy {
        self.strategy
    }

    pub fn series(&self, kind: EquipmentKind) -> CertificateSeries {
        self.series
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| CertificateSeries::default_for(kind))
    }

    /// Reserves and formats the next certificate number for `kind`.
    pub async fn next_number<B: Backend>(&self, backend: &B, kind: EquipmentKind) -> Result<String> {
        let series = self.series(kind);
        let table = kind.service_table();

        let issued = match self.strategy {
            NumberingStrategy::Sequence => {
                let reply = backend
                    .rpc(&self.sequence_rpc, json!({ "p_table": table }))
                    .await
                    .map_err(|e| ComplianceError::CertificateNumber {
                        prefix: series.prefix.clone(),
                        reason: e.to_string(),
                    })?;
                slot_from_reply(&reply).ok_or_else(|| ComplianceError::CertificateNumber {
                    prefix: series.prefix.clone(),
                    reason: format!("unexpected reply from {}: {}", self.sequence_rpc, reply),
                })?
            }
            NumberingStrategy::RowCount => {
                backend
                    .count(table)
                    .await
                    .map_err(|e| ComplianceError::CertificateNumber {
                        prefix: series.prefix.clone(),
                        reason: e.to_string(),
                    })?
            }
        };

        let number = format_certificate_number(&series.prefix, series.base, issued)?;
        tracing::debug!(
            "reserved certificate {} for {} ({:?}, {} issued)",
            number,
            kind,
            self.strategy,
            issued
        );
        Ok(number)
    }
}

// PostgREST returns a scalar function result as a bare JSON value; some
// deployments wrap it as `[{"fn": n}]`.
fn slot_from_reply(reply: &Value) -> Option<u64> {
    match reply {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Array(items) if items.len() == 1 => slot_from_reply(&items[0]),
        Value::Object(map) if map.len() == 1 => map.values().next().and_then(slot_from_reply),
        _ => None,
    }
}
