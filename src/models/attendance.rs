use serde::{Deserialize, Serialize};

use super::AttendanceStatus;

/// Body of `POST /attendance/mark`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MarkAttendanceRequest {
    pub trip_id: String,
    pub student_id: String,
    pub status: AttendanceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Server acknowledgement of a recorded attendance mark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceAck {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub trip_id: String,
    #[serde(default)]
    pub student_id: String,
    #[serde(default)]
    pub status: AttendanceStatus,
    #[serde(default)]
    pub marked_at: Option<String>,
}
