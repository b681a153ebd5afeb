use crate::core::certificate::CertificateNumbering;
use crate::core::forms::EntitySchema;
use crate::core::latest::latest_records;
use crate::core::retest::retest_date_for;
use crate::core::status::classify_date;
use crate::core::{
    Backend, Clock, EquipmentKind, NewServiceRecord, Query, RegisterEntry, ServiceRecord,
    ServiceStatus, StatusSummary,
};
use crate::utils::error::{ComplianceError, Result};
use crate::utils::validation::parse_date;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::str::FromStr;

/// Rows requested per page. PostgREST may hand back fewer (its `max-rows`
/// cap), so paging only stops on an empty page.
pub const PAGE_SIZE: usize = 1000;

/// Columns owned by the register itself; a form's free-form details may
/// not carry them.
const RECORD_COLUMNS: &[&str] = &[
    "id",
    "company_id",
    "equipment_serial",
    "equipment_name",
    "certificate_number",
    "test_date",
    "retest_date",
    "engineer_name",
    "result",
    "status",
    "notes",
    "created_at",
];

/// Columns a partial edit may not touch.
const LOCKED_COLUMNS: &[&str] = &["id", "certificate_number", "status", "created_at"];

fn reject_columns<'a>(
    keys: impl IntoIterator<Item = &'a String>,
    locked: &[&str],
    what: &str,
) -> Result<()> {
    let taken: Vec<&str> = keys
        .into_iter()
        .map(String::as_str)
        .filter(|key| locked.contains(key))
        .collect();
    if taken.is_empty() {
        return Ok(());
    }
    Err(ComplianceError::ValidationError {
        message: format!("{} cannot set {}", what, taken.join(", ")),
    })
}

pub(crate) fn decode_row<T: DeserializeOwned>(row: Value) -> Result<T> {
    Ok(serde_json::from_value(row)?)
}

pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>> {
    rows.into_iter().map(decode_row).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    RetestAsc,
    RetestDesc,
    Serial,
    TestDateDesc,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retest" | "retest-asc" => Ok(SortOrder::RetestAsc),
            "retest-desc" => Ok(SortOrder::RetestDesc),
            "serial" => Ok(SortOrder::Serial),
            "test-date" | "recent" => Ok(SortOrder::TestDateDesc),
            other => Err(format!("unknown sort order '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterFilter {
    pub company_id: Option<String>,
    pub status: Option<ServiceStatus>,
    /// Case-insensitive match on serial, equipment name or certificate number.
    pub search: Option<String>,
    pub sort: SortOrder,
}

impl RegisterFilter {
    fn matches(&self, entry: &RegisterEntry) -> bool {
        if let Some(status) = self.status {
            if entry.classification.status != status {
                return false;
            }
        }

        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                let record = &entry.record;
                [
                    Some(record.equipment_serial.as_str()),
                    record.equipment_name.as_deref(),
                    record.certificate_number.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|haystack| haystack.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }

    fn sort(&self, entries: &mut [RegisterEntry]) {
        match self.sort {
            SortOrder::RetestAsc => entries.sort_by(|a, b| {
                (a.record.retest_date, &a.record.equipment_serial)
                    .cmp(&(b.record.retest_date, &b.record.equipment_serial))
            }),
            SortOrder::RetestDesc => entries.sort_by(|a, b| {
                (b.record.retest_date, &a.record.equipment_serial)
                    .cmp(&(a.record.retest_date, &b.record.equipment_serial))
            }),
            SortOrder::Serial => {
                entries.sort_by(|a, b| a.record.equipment_serial.cmp(&b.record.equipment_serial))
            }
            SortOrder::TestDateDesc => entries.sort_by(|a, b| {
                (b.record.test_date, &a.record.equipment_serial)
                    .cmp(&(a.record.test_date, &b.record.equipment_serial))
            }),
        }
    }
}

/// Service records per equipment kind: the compliance register view and
/// certificate issuing.
pub struct ComplianceRegister<B: Backend, C: Clock> {
    backend: B,
    clock: C,
    numbering: CertificateNumbering,
    max_insert_attempts: usize,
    page_size: usize,
}

impl<B: Backend, C: Clock> ComplianceRegister<B, C> {
    pub fn new(backend: B, clock: C, numbering: CertificateNumbering) -> Self {
        Self {
            backend,
            clock,
            numbering,
            max_insert_attempts: 3,
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_insert_attempts(mut self, attempts: usize) -> Self {
        self.max_insert_attempts = attempts.max(1);
        self
    }

    pub fn numbering(&self) -> &CertificateNumbering {
        &self.numbering
    }

    /// Every matching row, fetched page by page in `id` order so that a
    /// server-side row cap never hides the oldest records.
    async fn fetch_records(&self, kind: EquipmentKind, query: Query) -> Result<Vec<ServiceRecord>> {
        let table = kind.service_table();
        let mut rows = Vec::new();
        loop {
            let page_query = query
                .clone()
                .order("id", true)
                .limit(self.page_size)
                .offset(rows.len());
            let page = self.backend.select(table, &page_query).await?;
            if page.is_empty() {
                break;
            }
            rows.extend(page);
        }
        tracing::debug!("fetched {} {} service records", rows.len(), kind);
        decode_rows(rows)
    }

    /// Current record per serial, classified against today, then filtered
    /// and sorted.
    pub async fn register(
        &self,
        kind: EquipmentKind,
        filter: &RegisterFilter,
    ) -> Result<Vec<RegisterEntry>> {
        let mut query = Query::new();
        if let Some(company_id) = &filter.company_id {
            query = query.eq("company_id", company_id);
        }

        let records = self.fetch_records(kind, query).await?;
        let today = self.clock.today();

        let mut entries: Vec<RegisterEntry> = latest_records(records)
            .into_iter()
            .map(|record| RegisterEntry {
                classification: classify_date(record.retest_date, today),
                record,
            })
            .filter(|entry| filter.matches(entry))
            .collect();

        filter.sort(&mut entries);
        Ok(entries)
    }

    pub async fn summary(
        &self,
        kind: EquipmentKind,
        company_id: Option<&str>,
    ) -> Result<StatusSummary> {
        let filter = RegisterFilter {
            company_id: company_id.map(str::to_string),
            ..RegisterFilter::default()
        };

        let mut summary = StatusSummary::default();
        for entry in self.register(kind, &filter).await? {
            match entry.classification.status {
                ServiceStatus::Valid => summary.valid += 1,
                ServiceStatus::Upcoming => summary.upcoming += 1,
                ServiceStatus::Expired => summary.expired += 1,
            }
        }
        Ok(summary)
    }

    /// Every record for one serial, newest first.
    pub async fn history(&self, kind: EquipmentKind, serial: &str) -> Result<Vec<ServiceRecord>> {
        let query = Query::new().eq("equipment_serial", serial);
        let mut records = self.fetch_records(kind, query).await?;
        records.sort_by(|a, b| (b.test_date, b.id).cmp(&(a.test_date, a.id)));
        Ok(records)
    }

    pub async fn next_certificate_number(&self, kind: EquipmentKind) -> Result<String> {
        self.numbering.next_number(&self.backend, kind).await
    }

    /// Validates the form, schedules the retest, numbers the certificate
    /// and stores the record. A unique-number conflict is retried with a
    /// freshly reserved number.
    pub async fn create_service_record(
        &self,
        kind: EquipmentKind,
        input: NewServiceRecord,
    ) -> Result<ServiceRecord> {
        reject_columns(input.details.keys(), RECORD_COLUMNS, "service record details")?;

        let schema = EntitySchema::service_record(kind);
        let mut values = match serde_json::to_value(&input)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        values.retain(|_, v| !v.is_null());
        schema.validate(&mut values)?;

        let test_date = parse_date(&input.test_date)?;
        let retest_date = retest_date_for(test_date)?;
        let status = classify_date(retest_date, self.clock.today()).status;

        values.insert("test_date".to_string(), Value::String(test_date.to_string()));
        values.insert("retest_date".to_string(), Value::String(retest_date.to_string()));
        values.insert("status".to_string(), Value::String(status.to_string()));

        let mut attempt = 1;
        loop {
            let number = self.numbering.next_number(&self.backend, kind).await?;
            let mut row = values.clone();
            row.insert("certificate_number".to_string(), Value::String(number.clone()));

            match self.backend.insert(schema.table, Value::Object(row)).await {
                Ok(stored) => {
                    tracing::info!(
                        "issued certificate {} for {} {} (retest {})",
                        number,
                        kind,
                        input.equipment_serial,
                        retest_date
                    );
                    return decode_row(stored);
                }
                Err(ComplianceError::Conflict { .. }) if attempt < self.max_insert_attempts => {
                    tracing::warn!(
                        "certificate {} already taken (attempt {}/{}), retrying",
                        number,
                        attempt,
                        self.max_insert_attempts
                    );
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!("failed to store {} service record: {}", kind, e);
                    return Err(e);
                }
            }
        }
    }

    /// Applies a partial edit. A new test date (or an explicit retest
    /// date) refreshes the stored status.
    pub async fn update_service_record(
        &self,
        kind: EquipmentKind,
        id: i64,
        mut patch: Map<String, Value>,
    ) -> Result<ServiceRecord> {
        reject_columns(patch.keys(), LOCKED_COLUMNS, "service record edit")?;

        let schema = EntitySchema::service_record(kind);
        schema.validate_patch(&mut patch)?;

        let test_date = patch.get("test_date").and_then(Value::as_str).map(parse_date).transpose()?;
        let retest_date = match test_date {
            Some(date) => Some(retest_date_for(date)?),
            None => patch
                .get("retest_date")
                .and_then(Value::as_str)
                .map(parse_date)
                .transpose()?,
        };

        if let Some(date) = test_date {
            patch.insert("test_date".to_string(), Value::String(date.to_string()));
        }
        if let Some(retest) = retest_date {
            let status = classify_date(retest, self.clock.today()).status;
            patch.insert("retest_date".to_string(), Value::String(retest.to_string()));
            patch.insert("status".to_string(), Value::String(status.to_string()));
        }

        let stored = self
            .backend
            .update(schema.table, &id.to_string(), Value::Object(patch))
            .await?;
        tracing::info!("updated {} service record {}", kind, id);
        decode_row(stored)
    }

    pub async fn delete_service_record(&self, kind: EquipmentKind, id: i64) -> Result<()> {
        self.backend.delete(kind.service_table(), &id.to_string()).await?;
        tracing::info!("deleted {} service record {}", kind, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::clock::FixedClock;
    use crate::core::certificate::{NumberingStrategy, DEFAULT_SEQUENCE_RPC};
    use crate::core::ColorToken;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Mutex;

    /// Table store kept in memory; `certificate_number` is unique per table.
    /// `max_rows` caps every select the way PostgREST's `max-rows` does.
    #[derive(Default)]
    struct MemoryBackend {
        tables: Mutex<HashMap<String, Vec<Value>>>,
        stale_count: Mutex<Option<u64>>,
        max_rows: Option<usize>,
        selects: Mutex<usize>,
    }

    impl MemoryBackend {
        fn with_rows(table: &str, rows: Vec<Value>) -> Self {
            let backend = Self::default();
            backend.tables.lock().unwrap().insert(table.to_string(), rows);
            backend
        }

        fn rows(&self, table: &str) -> Vec<Value> {
            self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl Backend for MemoryBackend {
        async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
            *self.selects.lock().unwrap() += 1;
            let mut rows: Vec<Value> = self
                .rows(table)
                .into_iter()
                .filter(|row| {
                    query.filters.iter().all(|f| {
                        row.get(&f.column)
                            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                            .is_some_and(|v| v == f.value)
                    })
                })
                .collect();
            if let Some((column, _)) = &query.order_by {
                rows.sort_by_key(|row| row[column.as_str()].as_i64());
            }
            let limit = match (query.limit, self.max_rows) {
                (Some(limit), Some(cap)) => limit.min(cap),
                (limit, cap) => limit.or(cap).unwrap_or(usize::MAX),
            };
            Ok(rows
                .into_iter()
                .skip(query.offset.unwrap_or(0))
                .take(limit)
                .collect())
        }

        async fn count(&self, table: &str) -> Result<u64> {
            if let Some(stale) = self.stale_count.lock().unwrap().take() {
                return Ok(stale);
            }
            Ok(self.rows(table).len() as u64)
        }

        async fn insert(&self, table: &str, mut row: Value) -> Result<Value> {
            let mut tables = self.tables.lock().unwrap();
            let rows = tables.entry(table.to_string()).or_default();
            let number = row.get("certificate_number").cloned();
            if number.is_some() && rows.iter().any(|r| r.get("certificate_number") == number.as_ref()) {
                return Err(ComplianceError::Conflict {
                    table: table.to_string(),
                    message: "duplicate key value violates unique constraint".to_string(),
                });
            }
            row["id"] = json!(rows.len() as i64 + 100);
            rows.push(row.clone());
            Ok(row)
        }

        async fn update(&self, table: &str, id: &str, patch: Value) -> Result<Value> {
            let mut tables = self.tables.lock().unwrap();
            let rows = tables.entry(table.to_string()).or_default();
            let row = rows
                .iter_mut()
                .find(|r| r["id"].to_string() == id)
                .ok_or_else(|| ComplianceError::NotFound {
                    table: table.to_string(),
                    id: id.to_string(),
                })?;
            if let (Some(target), Some(changes)) = (row.as_object_mut(), patch.as_object()) {
                for (k, v) in changes {
                    target.insert(k.clone(), v.clone());
                }
            }
            Ok(row.clone())
        }

        async fn delete(&self, table: &str, id: &str) -> Result<()> {
            let mut tables = self.tables.lock().unwrap();
            if let Some(rows) = tables.get_mut(table) {
                rows.retain(|r| r["id"].to_string() != id);
            }
            Ok(())
        }

        async fn rpc(&self, _function: &str, args: Value) -> Result<Value> {
            let table = args["p_table"].as_str().unwrap_or_default().to_string();
            Ok(json!(self.rows(&table).len()))
        }
    }

    fn row(id: i64, serial: &str, name: &str, test_date: &str, retest_date: &str) -> Value {
        json!({
            "id": id,
            "company_id": "c1",
            "equipment_serial": serial,
            "equipment_name": name,
            "certificate_number": format!("LOL-{}", 1000 + id),
            "test_date": test_date,
            "retest_date": retest_date,
            "safe_working_load": 2000
        })
    }

    fn today() -> FixedClock {
        FixedClock(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
    }

    fn register_with(backend: MemoryBackend) -> ComplianceRegister<MemoryBackend, FixedClock> {
        ComplianceRegister::new(backend, today(), CertificateNumbering::default())
    }

    fn loler_rows() -> Vec<Value> {
        vec![
            row(1, "HOIST-1", "Chain hoist", "2023-01-10", "2024-01-09"),
            row(2, "HOIST-1", "Chain hoist", "2024-01-05", "2025-01-03"),
            row(3, "SLING-9", "Web sling", "2023-07-01", "2024-06-29"),
            row(4, "JACK-2", "Trolley jack", "2023-05-01", "2024-04-29"),
        ]
    }

    #[tokio::test]
    async fn test_register_shows_one_classified_entry_per_serial() {
        let backend = MemoryBackend::with_rows("loler_service_records", loler_rows());
        let register = register_with(backend);

        let entries = register
            .register(EquipmentKind::Loler, &RegisterFilter::default())
            .await
            .unwrap();

        let serials: Vec<&str> = entries.iter().map(|e| e.record.equipment_serial.as_str()).collect();
        assert_eq!(serials, vec!["JACK-2", "SLING-9", "HOIST-1"]);

        assert_eq!(entries[0].classification.status, ServiceStatus::Expired);
        assert_eq!(entries[1].classification.status, ServiceStatus::Upcoming);
        assert_eq!(entries[2].classification.status, ServiceStatus::Valid);
        assert_eq!(entries[2].classification.color, ColorToken::Green);
        assert_eq!(entries[2].record.id, 2);
    }

    #[tokio::test]
    async fn test_register_filters_and_search() {
        let backend = MemoryBackend::with_rows("loler_service_records", loler_rows());
        let register = register_with(backend);

        let expired = register
            .register(
                EquipmentKind::Loler,
                &RegisterFilter {
                    status: Some(ServiceStatus::Expired),
                    ..RegisterFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].record.equipment_serial, "JACK-2");

        let by_name = register
            .register(
                EquipmentKind::Loler,
                &RegisterFilter {
                    search: Some("  web ".to_string()),
                    sort: SortOrder::Serial,
                    ..RegisterFilter::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].record.equipment_serial, "SLING-9");
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let backend = MemoryBackend::with_rows("loler_service_records", loler_rows());
        let register = register_with(backend);

        let summary = register.summary(EquipmentKind::Loler, Some("c1")).await.unwrap();
        assert_eq!(summary, StatusSummary { valid: 1, upcoming: 1, expired: 1 });
        assert_eq!(summary.total(), 3);

        let other = register.summary(EquipmentKind::Loler, Some("c2")).await.unwrap();
        assert_eq!(other.total(), 0);
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let backend = MemoryBackend::with_rows("loler_service_records", loler_rows());
        let register = register_with(backend);

        let history = register.history(EquipmentKind::Loler, "HOIST-1").await.unwrap();
        let ids: Vec<i64> = history.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_create_schedules_retest_and_numbers_certificate() {
        let backend = MemoryBackend::with_rows(
            "service_records",
            (0..5)
                .map(|i| json!({ "id": i, "equipment_serial": format!("S{}", i), "certificate_number": format!("BWS-{}", 1001 + i), "test_date": "2024-01-01", "retest_date": "2024-12-30" }))
                .collect(),
        );
        let register = register_with(backend);

        let record = register
            .create_service_record(
                EquipmentKind::Service,
                NewServiceRecord {
                    company_id: Some("c1".to_string()),
                    equipment_serial: "PUMP-4".to_string(),
                    test_date: "2024-02-29".to_string(),
                    engineer_name: Some("J. Smith".to_string()),
                    ..NewServiceRecord::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(record.certificate_number.as_deref(), Some("BWS-1006"));
        assert_eq!(record.retest_date, NaiveDate::from_ymd_opt(2025, 2, 27).unwrap());
        assert_eq!(record.status, Some(ServiceStatus::Valid));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_fields_before_any_request() {
        let register = register_with(MemoryBackend::default());

        let err = register
            .create_service_record(EquipmentKind::Service, NewServiceRecord::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ComplianceError::MissingFields { .. }));
        assert!(register.backend.rows("service_records").is_empty());
    }

    #[tokio::test]
    async fn test_create_retries_on_duplicate_number() {
        let backend = MemoryBackend::with_rows(
            "service_records",
            vec![
                json!({ "id": 1, "equipment_serial": "A", "certificate_number": "BWS-1001", "test_date": "2024-01-01", "retest_date": "2024-12-30" }),
                json!({ "id": 2, "equipment_serial": "B", "certificate_number": "BWS-1002", "test_date": "2024-01-01", "retest_date": "2024-12-30" }),
            ],
        );
        // Another writer inserted in between: the count reads one row short.
        *backend.stale_count.lock().unwrap() = Some(1);

        let numbering =
            CertificateNumbering::new(NumberingStrategy::RowCount, DEFAULT_SEQUENCE_RPC, BTreeMap::new());
        let register = ComplianceRegister::new(backend, today(), numbering);

        let record = register
            .create_service_record(
                EquipmentKind::Service,
                NewServiceRecord {
                    equipment_serial: "C".to_string(),
                    test_date: "2024-06-01".to_string(),
                    ..NewServiceRecord::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(record.certificate_number.as_deref(), Some("BWS-1003"));
    }

    #[tokio::test]
    async fn test_create_gives_up_after_max_attempts() {
        let backend = MemoryBackend::with_rows(
            "service_records",
            vec![json!({ "id": 1, "equipment_serial": "A", "certificate_number": "BWS-1001", "test_date": "2024-01-01", "retest_date": "2024-12-30" })],
        );
        let register = ComplianceRegister::new(
            backend,
            today(),
            CertificateNumbering::new(NumberingStrategy::RowCount, DEFAULT_SEQUENCE_RPC, BTreeMap::new()),
        )
        .with_max_insert_attempts(2);
        *register.backend.stale_count.lock().unwrap() = Some(0);

        // First attempt collides on BWS-1001, second reads the true count.
        let ok = register
            .create_service_record(
                EquipmentKind::Service,
                NewServiceRecord {
                    equipment_serial: "B".to_string(),
                    test_date: "2024-06-01".to_string(),
                    ..NewServiceRecord::default()
                },
            )
            .await;
        assert!(ok.is_ok());

        let single_try = ComplianceRegister::new(
            MemoryBackend::with_rows(
                "service_records",
                vec![json!({ "id": 1, "equipment_serial": "A", "certificate_number": "BWS-1001", "test_date": "2024-01-01", "retest_date": "2024-12-30" })],
            ),
            today(),
            CertificateNumbering::new(NumberingStrategy::RowCount, DEFAULT_SEQUENCE_RPC, BTreeMap::new()),
        )
        .with_max_insert_attempts(1);
        *single_try.backend.stale_count.lock().unwrap() = Some(0);

        let err = single_try
            .create_service_record(
                EquipmentKind::Service,
                NewServiceRecord {
                    equipment_serial: "B".to_string(),
                    test_date: "2024-06-01".to_string(),
                    ..NewServiceRecord::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ComplianceError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_update_recomputes_retest_date() {
        let backend = MemoryBackend::with_rows("loler_service_records", loler_rows());
        let register = register_with(backend);

        let patch = json!({ "test_date": "2024-06-10" }).as_object().cloned().unwrap();
        let updated = register
            .update_service_record(EquipmentKind::Loler, 4, patch)
            .await
            .unwrap();

        assert_eq!(updated.retest_date, NaiveDate::from_ymd_opt(2025, 6, 9).unwrap());
        assert_eq!(updated.status, Some(ServiceStatus::Valid));
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let backend = MemoryBackend::with_rows("loler_service_records", loler_rows());
        let register = register_with(backend);

        register.delete_service_record(EquipmentKind::Loler, 3).await.unwrap();
        let history = register.history(EquipmentKind::Loler, "SLING-9").await.unwrap();
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_register_pages_past_server_row_cap() {
        // Newest rows first, the one expired serial is the oldest row.
        let mut rows: Vec<Value> = (0..5)
            .map(|i| row(10 + i, &format!("NEW-{}", i), "Hoist", "2024-06-01", "2025-05-31"))
            .collect();
        rows.push(row(1, "OLD-1", "Old hoist", "2022-01-01", "2022-12-31"));
        let backend = MemoryBackend {
            max_rows: Some(2),
            ..MemoryBackend::with_rows("loler_service_records", rows)
        };
        let register = register_with(backend).with_page_size(4);

        let summary = register.summary(EquipmentKind::Loler, None).await.unwrap();
        assert_eq!(summary, StatusSummary { valid: 5, upcoming: 0, expired: 1 });
        // Three capped pages of two plus the closing empty page.
        assert_eq!(*register.backend.selects.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn test_uppercase_result_is_stored_lowercase() {
        let backend = MemoryBackend::with_rows("loler_service_records", loler_rows());
        let register = register_with(backend);

        let patch = json!({ "result": "PASS" }).as_object().cloned().unwrap();
        let updated = register
            .update_service_record(EquipmentKind::Loler, 4, patch)
            .await
            .unwrap();

        assert_eq!(updated.result, Some(crate::core::InspectionResult::Pass));
        let stored = register.backend.rows("loler_service_records");
        assert_eq!(stored[3]["result"], json!("pass"));
    }

    #[tokio::test]
    async fn test_update_with_only_retest_date() {
        let backend = MemoryBackend::with_rows("loler_service_records", loler_rows());
        let register = register_with(backend);

        let patch = json!({ "retest_date": "2024-07-01" }).as_object().cloned().unwrap();
        let updated = register
            .update_service_record(EquipmentKind::Loler, 2, patch)
            .await
            .unwrap();

        assert_eq!(updated.test_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(updated.retest_date, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());
        assert_eq!(updated.status, Some(ServiceStatus::Upcoming));
    }

    #[tokio::test]
    async fn test_update_cannot_touch_locked_columns() {
        let backend = MemoryBackend::with_rows("loler_service_records", loler_rows());
        let register = register_with(backend);

        for column in ["id", "certificate_number", "status"] {
            let mut patch = Map::new();
            patch.insert(column.to_string(), json!("x"));
            let err = register
                .update_service_record(EquipmentKind::Loler, 2, patch)
                .await
                .unwrap_err();
            assert!(matches!(err, ComplianceError::ValidationError { .. }), "{}", column);
        }
        assert_eq!(register.backend.rows("loler_service_records"), loler_rows());
    }

    #[tokio::test]
    async fn test_details_cannot_shadow_record_columns() {
        let register = register_with(MemoryBackend::default());

        for column in ["test_date", "retest_date", "status", "certificate_number", "id"] {
            let mut details = Map::new();
            details.insert(column.to_string(), json!("2030-01-01"));
            let err = register
                .create_service_record(
                    EquipmentKind::Service,
                    NewServiceRecord {
                        equipment_serial: "PUMP-4".to_string(),
                        test_date: "2024-02-29".to_string(),
                        details,
                        ..NewServiceRecord::default()
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, ComplianceError::ValidationError { .. }), "{}", column);
        }
        assert!(register.backend.rows("service_records").is_empty());
    }
}
