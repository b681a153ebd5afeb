use crate::core::ServiceRecord;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

fn supersedes(candidate: &ServiceRecord, current: &ServiceRecord) -> bool {
    (candidate.test_date, candidate.id) > (current.test_date, current.id)
}

/// Keeps the most recent record per `equipment_serial`.
///
/// On equal test dates the higher `id` wins, so the result does not depend
/// on the order rows arrive in.
pub fn latest_per_serial<I>(records: I) -> BTreeMap<String, ServiceRecord>
where
    I: IntoIterator<Item = ServiceRecord>,
{
    let mut latest: BTreeMap<String, ServiceRecord> = BTreeMap::new();

    for record in records {
        match latest.entry(record.equipment_serial.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                if supersedes(&record, slot.get()) {
                    slot.insert(record);
                }
            }
        }
    }

    latest
}

/// List form of [`latest_per_serial`], ordered by serial.
pub fn latest_records<I>(records: I) -> Vec<ServiceRecord>
where
    I: IntoIterator<Item = ServiceRecord>,
{
    latest_per_serial(records).into_values().collect()
}
