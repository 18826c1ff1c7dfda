use serde::{Deserialize, Deserializer, Serialize};

/// Attendance recorded for one student on one trip.
///
/// Unknown, `null` or missing values read as `Pending` so a partial response
/// never breaks the stop derivations.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    Pending,
    Present,
    Absent,
    HalfDay,
    Reassigned,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Pending => "pending",
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::HalfDay => "half_day",
            AttendanceStatus::Reassigned => "reassigned",
        }
    }

    pub fn from_wire(value: &str) -> Self {
        match value {
            "present" => AttendanceStatus::Present,
            "absent" => AttendanceStatus::Absent,
            "half_day" => AttendanceStatus::HalfDay,
            "reassigned" => AttendanceStatus::Reassigned,
            _ => AttendanceStatus::Pending,
        }
    }

    pub fn is_marked(&self) -> bool {
        !matches!(self, AttendanceStatus::Pending)
    }
}

impl<'de> Deserialize<'de> for AttendanceStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .map(AttendanceStatus::from_wire)
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(default, rename = "class", deserialize_with = "super::null_as_default")]
    pub class_name: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub section: String,
    #[serde(default)]
    pub roll_number: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub stop_id: String,
    #[serde(default)]
    pub parent1_name: Option<String>,
    #[serde(default)]
    pub parent1_phone: Option<String>,
    #[serde(default)]
    pub parent2_name: Option<String>,
    #[serde(default)]
    pub parent2_phone: Option<String>,
    #[serde(default)]
    pub attendance_status: AttendanceStatus,
    #[serde(default)]
    pub status_note: Option<String>,
}

impl Student {
    /// First reachable guardian phone number, if the backend sent one.
    pub fn guardian_contact(&self) -> Option<&str> {
        self.parent1_phone
            .as_deref()
            .or(self.parent2_phone.as_deref())
            .filter(|phone| !phone.trim().is_empty())
    }

    pub fn class_label(&self) -> String {
        if self.section.is_empty() {
            self.class_name.clone()
        } else {
            format!("{}-{}", self.class_name, self.section)
        }
    }
}

/// A stop on a route together with the students currently assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub route_id: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub latitude: f64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub longitude: f64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub order: i64,
    #[serde(default)]
    pub scheduled_pickup_time: Option<String>,
    #[serde(default)]
    pub scheduled_dropoff_time: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub students_count: usize,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub students: Vec<Student>,
}

/// Payload of `GET /routes/{id}/students`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RouteStops {
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub stops: Vec<Stop>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    #[serde(default)]
    pub branch_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub is_active: bool,
}
