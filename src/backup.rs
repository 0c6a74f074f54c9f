use serde::{Deserialize, Serialize};

use crate::model::{AdhocBooking, FixedSchedule, Member};

/// Portable JSON snapshot of one partition. Document keys are not stored;
/// they are recomputed from the record fields on import, which also migrates
/// any legacy-keyed documents to the current key shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub members: Vec<Member>,
    pub fixed_schedules: Vec<FixedSchedule>,
    pub adhoc_bookings: Vec<AdhocBooking>,
    pub sync_key: String,
    pub export_at: String,
}

impl Backup {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
