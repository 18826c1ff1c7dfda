use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    #[default]
    Pickup,
    Dropoff,
    PreprimaryDrop,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    #[default]
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    #[serde(default)]
    pub bus_id: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, rename = "type")]
    pub trip_type: TripType,
    #[serde(default)]
    pub status: TripStatus,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub total_students: u32,
    #[serde(default)]
    pub present_count: u32,
    #[serde(default)]
    pub absent_count: u32,
    #[serde(default)]
    pub current_stop_index: i64,
    #[serde(default)]
    pub stops: u32,
}

/// Payload of `GET /trips/today`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TodayTrips {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub has_active_trip: bool,
    #[serde(default)]
    pub trips: Vec<Trip>,
}

impl TodayTrips {
    /// Trip that attendance writes are addressed to: the first `active` trip,
    /// falling back to the first trip that has not started yet.
    pub fn select_active(&self) -> Option<&Trip> {
        self.trips
            .iter()
            .find(|trip| trip.status == TripStatus::Active)
            .or_else(|| {
                self.trips
                    .iter()
                    .find(|trip| trip.status == TripStatus::Pending)
            })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub speed: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct NearestStop {
    pub index: i64,
    #[serde(default)]
    pub name: String,
}

/// Live tracking data from `GET /routes/{id}/bus-location`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BusLocation {
    #[serde(default)]
    pub trip_id: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub is_live: bool,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub current_stop_index: i64,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub progress: f64,
    #[serde(default)]
    pub current_location: Option<GeoPoint>,
    #[serde(default)]
    pub nearest_stop: Option<NearestStop>,
}

impl BusLocation {
    /// Progress toward the next stop, clamped to `0.0..=1.0`.
    pub fn clamped_progress(&self) -> f64 {
        clamp_progress(self.progress)
    }
}

pub fn clamp_progress(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
