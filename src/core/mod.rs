pub mod certificate;
pub mod directory;
pub mod forms;
pub mod latest;
pub mod register;
pub mod retest;
pub mod status;

pub use crate::domain::model::{
    Classification, ColorToken, Company, Engineer, Equipment, EquipmentKind, InspectionResult,
    NewServiceRecord, RegisterEntry, ServiceRecord, ServiceStatus, StatusSummary,
    RETEST_INTERVAL_DAYS, UPCOMING_WINDOW_DAYS,
};
pub use crate::domain::ports::{Backend, Clock, ConfigProvider, Filter, FilterOp, Query};
pub use crate::utils::error::Result;
