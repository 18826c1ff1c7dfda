use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

use crate::models::{clamp_progress, AttendanceStatus, BusLocation, Stop, TodayTrips, Trip};

pub type SharedSnapshot = Arc<Mutex<RouteSnapshot>>;

/// Latest load cycle applied for each fetch kind.
#[derive(Debug, Clone, Copy, Default)]
struct AppliedCycles {
    stops: u64,
    trips: u64,
    tracking: u64,
}

/// Everything the route screen renders, owned by one focused screen.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSnapshot {
    pub route_id: String,
    /// Sorted by `order`.
    pub stops: Vec<Stop>,
    /// Local attendance overlay: seeded by every stops fetch, overwritten by taps.
    pub attendance: HashMap<String, AttendanceStatus>,
    pub trips: Vec<Trip>,
    pub active_trip_id: Option<String>,
    pub has_active_trip: bool,
    pub current_stop_index: i64,
    pub progress: f64,
    pub is_live: bool,
    pub is_loading: bool,
    pub is_refreshing: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    applied: AppliedCycles,
}

impl RouteSnapshot {
    pub fn new(route_id: impl Into<String>) -> Self {
        Self {
            route_id: route_id.into(),
            ..Default::default()
        }
    }

    pub fn shared(route_id: impl Into<String>) -> SharedSnapshot {
        Arc::new(Mutex::new(Self::new(route_id)))
    }

    pub fn attendance_of(&self, student_id: &str) -> AttendanceStatus {
        self.attendance
            .get(student_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn set_attendance(&mut self, student_id: &str, status: AttendanceStatus) {
        self.attendance.insert(student_id.to_string(), status);
    }

    pub fn student_count(&self) -> usize {
        self.stops.iter().map(|stop| stop.students.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Replaces stops and students and re-seeds the overlay from server truth.
    /// Returns `false` when a newer cycle already applied its stops.
    pub fn apply_stops(&mut self, cycle: u64, mut stops: Vec<Stop>) -> bool {
        if cycle <= self.applied.stops {
            return false;
        }
        self.applied.stops = cycle;

        stops.sort_by_key(|stop| stop.order);
        self.attendance = stops
            .iter()
            .flat_map(|stop| stop.students.iter())
            .map(|student| (student.id.clone(), student.attendance_status))
            .collect();
        self.stops = stops;
        self.last_synced_at = Some(Utc::now());
        true
    }

    pub fn apply_trips(&mut self, cycle: u64, today: TodayTrips) -> bool {
        if cycle <= self.applied.trips {
            return false;
        }
        self.applied.trips = cycle;

        self.active_trip_id = today.select_active().map(|trip| trip.id.clone());
        self.has_active_trip = today.has_active_trip;
        self.trips = today.trips;
        true
    }

    pub fn apply_tracking(&mut self, cycle: u64, location: BusLocation) -> bool {
        if cycle <= self.applied.tracking {
            return false;
        }
        self.applied.tracking = cycle;

        self.current_stop_index = location.current_stop_index;
        self.progress = clamp_progress(location.progress);
        self.is_live = location.is_live;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Student, TripStatus};

    fn student(id: &str, status: AttendanceStatus) -> Student {
        Student {
            id: id.into(),
            attendance_status: status,
            ..Default::default()
        }
    }

    fn stop(id: &str, order: i64, students: Vec<Student>) -> Stop {
        Stop {
            id: id.into(),
            order,
            students,
            ..Default::default()
        }
    }

    #[test]
    fn stops_are_sorted_and_overlay_reseeded() {
        let mut snapshot = RouteSnapshot::new("r1");
        snapshot.set_attendance("gone", AttendanceStatus::Present);
        snapshot.set_attendance("s1", AttendanceStatus::Absent);

        let applied = snapshot.apply_stops(
            1,
            vec![
                stop("b", 2, vec![student("s2", AttendanceStatus::Pending)]),
                stop("a", 1, vec![student("s1", AttendanceStatus::Present)]),
            ],
        );

        assert!(applied);
        assert_eq!(snapshot.stops[0].id, "a");
        assert_eq!(snapshot.attendance_of("s1"), AttendanceStatus::Present);
        assert_eq!(snapshot.attendance_of("s2"), AttendanceStatus::Pending);
        assert!(!snapshot.attendance.contains_key("gone"));
        assert_eq!(snapshot.student_count(), 2);
    }

    #[test]
    fn stale_cycle_is_ignored_per_kind() {
        let mut snapshot = RouteSnapshot::new("r1");
        assert!(snapshot.apply_tracking(
            3,
            BusLocation {
                current_stop_index: 2,
                ..Default::default()
            }
        ));
        assert!(!snapshot.apply_tracking(
            2,
            BusLocation {
                current_stop_index: 1,
                ..Default::default()
            }
        ));
        assert_eq!(snapshot.current_stop_index, 2);

        // Other kinds keep their own watermark.
        assert!(snapshot.apply_stops(1, Vec::new()));
    }

    #[test]
    fn trips_pick_active_id() {
        let mut snapshot = RouteSnapshot::new("r1");
        snapshot.apply_trips(
            1,
            TodayTrips {
                has_active_trip: true,
                trips: vec![
                    Trip {
                        id: "t1".into(),
                        status: TripStatus::Pending,
                        ..Default::default()
                    },
                    Trip {
                        id: "t2".into(),
                        status: TripStatus::Active,
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
        );
        assert_eq!(snapshot.active_trip_id.as_deref(), Some("t2"));
    }

    #[test]
    fn tracking_progress_is_clamped() {
        let mut snapshot = RouteSnapshot::new("r1");
        snapshot.apply_tracking(
            1,
            BusLocation {
                progress: 3.0,
                is_live: true,
                ..Default::default()
            },
        );
        assert_eq!(snapshot.progress, 1.0);
        assert!(snapshot.is_live);
    }
}
