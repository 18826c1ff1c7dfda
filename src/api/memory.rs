use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
};

use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    AppRole, AttendanceAck, AttendanceStatus, BusLocation, MarkAttendanceRequest, OtpSession,
    Route, Stop, TodayTrips, Trip, TripStatus, UserProfile,
};

use super::{ApiError, AuthApi, TransportApi};

/// OTP the in-memory backend accepts for every registered phone number.
pub const DEMO_OTP: &str = "000000";

#[derive(Default)]
struct BackendState {
    routes: HashMap<String, Vec<Stop>>,
    today: TodayTrips,
    locations: HashMap<String, BusLocation>,
    users: HashMap<String, UserProfile>,
    failures: FailurePlan,
    writes: Vec<MarkAttendanceRequest>,
}

/// Calls that should fail, and the message they fail with.
#[derive(Debug, Clone, Default)]
pub struct FailurePlan {
    pub stops: Option<String>,
    pub trips: Option<String>,
    pub tracking: Option<String>,
    pub writes: Option<String>,
}

#[derive(Debug, Default)]
struct CallCounters {
    stops: AtomicUsize,
    trips: AtomicUsize,
    tracking: AtomicUsize,
    writes: AtomicUsize,
}

/// Snapshot of how often each endpoint was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallCounts {
    pub stops: usize,
    pub trips: usize,
    pub tracking: usize,
    pub writes: usize,
}

/// Backend served from memory.
///
/// Accepted attendance writes are applied to the stored students, so the next
/// route fetch reports them back the way the real server would.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<BackendState>,
    calls: CallCounters,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Three-stop route with an active pickup trip, for offline runs.
    pub fn demo(route_id: &str) -> Self {
        let stops = vec![
            demo_stop(route_id, "1", "Lake View Colony", 1, &["Aarav Sharma", "Vivaan Gupta"]),
            demo_stop(route_id, "2", "Temple Junction", 2, &["Aditya Verma"]),
            demo_stop(route_id, "3", "School", 3, &[]),
        ];
        let trip = Trip {
            id: "trip-demo".into(),
            status: TripStatus::Active,
            stops: stops.len() as u32,
            ..Default::default()
        };
        let attender = UserProfile {
            id: "1".into(),
            name: "Agni Kumar".into(),
            phone_number: "9000000001".into(),
            roles: vec![AppRole::Attender],
            assigned_route: Some(Route {
                id: route_id.into(),
                name: "Route 11".into(),
                code: "11".into(),
                is_active: true,
                ..Default::default()
            }),
            ..Default::default()
        };

        Self::new()
            .with_route(route_id, stops)
            .with_trips(vec![trip])
            .with_location(
                route_id,
                BusLocation {
                    trip_id: Some("trip-demo".into()),
                    is_live: true,
                    current_stop_index: 0,
                    progress: 0.25,
                    ..Default::default()
                },
            )
            .with_user(attender)
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_route(self, route_id: &str, stops: Vec<Stop>) -> Self {
        self.set_route(route_id, stops);
        self
    }

    pub fn with_trips(self, trips: Vec<Trip>) -> Self {
        self.set_trips(trips);
        self
    }

    pub fn with_location(self, route_id: &str, location: BusLocation) -> Self {
        self.set_location(route_id, location);
        self
    }

    pub fn with_user(self, user: UserProfile) -> Self {
        self.lock().users.insert(user.phone_number.clone(), user);
        self
    }

    pub fn set_route(&self, route_id: &str, stops: Vec<Stop>) {
        self.lock().routes.insert(route_id.to_string(), stops);
    }

    pub fn set_trips(&self, trips: Vec<Trip>) {
        let mut state = self.lock();
        state.today = TodayTrips {
            date: Utc::now().format("%A, %-d %B").to_string(),
            has_active_trip: trips.iter().any(|trip| trip.status == TripStatus::Active),
            trips,
        };
    }

    pub fn set_location(&self, route_id: &str, location: BusLocation) {
        self.lock()
            .locations
            .insert(route_id.to_string(), location);
    }

    pub fn set_failures(&self, failures: FailurePlan) {
        self.lock().failures = failures;
    }

    /// Overwrites a student's status on the server side only.
    pub fn set_server_status(&self, student_id: &str, status: AttendanceStatus) {
        apply_status(&mut self.lock(), student_id, status);
    }

    pub fn server_status(&self, student_id: &str) -> Option<AttendanceStatus> {
        self.lock()
            .routes
            .values()
            .flatten()
            .flat_map(|stop| stop.students.iter())
            .find(|student| student.id == student_id)
            .map(|student| student.attendance_status)
    }

    pub fn writes(&self) -> Vec<MarkAttendanceRequest> {
        self.lock().writes.clone()
    }

    pub fn call_counts(&self) -> CallCounts {
        CallCounts {
            stops: self.calls.stops.load(Ordering::SeqCst),
            trips: self.calls.trips.load(Ordering::SeqCst),
            tracking: self.calls.tracking.load(Ordering::SeqCst),
            writes: self.calls.writes.load(Ordering::SeqCst),
        }
    }
}

fn apply_status(state: &mut BackendState, student_id: &str, status: AttendanceStatus) {
    for student in state
        .routes
        .values_mut()
        .flatten()
        .flat_map(|stop| stop.students.iter_mut())
        .filter(|student| student.id == student_id)
    {
        student.attendance_status = status;
    }
}

fn fail_if(planned: &Option<String>) -> Result<(), ApiError> {
    match planned {
        Some(message) => Err(ApiError::backend(message.clone())),
        None => Ok(()),
    }
}

fn demo_stop(route_id: &str, id: &str, name: &str, order: i64, students: &[&str]) -> Stop {
    let students = students
        .iter()
        .enumerate()
        .map(|(idx, student_name)| crate::models::Student {
            id: format!("{id}-{}", idx + 1),
            name: (*student_name).to_string(),
            class_name: "5".into(),
            section: "A".into(),
            stop_id: id.to_string(),
            ..Default::default()
        })
        .collect::<Vec<_>>();

    Stop {
        id: id.to_string(),
        route_id: route_id.to_string(),
        name: name.to_string(),
        order,
        students_count: students.len(),
        students,
        ..Default::default()
    }
}

impl TransportApi for InMemoryBackend {
    async fn route_stops(&self, route_id: &str) -> Result<Vec<Stop>, ApiError> {
        self.calls.stops.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        fail_if(&state.failures.stops)?;
        state
            .routes
            .get(route_id)
            .cloned()
            .ok_or_else(|| ApiError::backend(format!("Route {route_id} not found")))
    }

    async fn today_trips(&self, bus_id: Option<&str>) -> Result<TodayTrips, ApiError> {
        self.calls.trips.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        fail_if(&state.failures.trips)?;
        let mut today = state.today.clone();
        if let Some(bus_id) = bus_id {
            today.trips.retain(|trip| trip.bus_id.is_empty() || trip.bus_id == bus_id);
        }
        Ok(today)
    }

    async fn bus_location(&self, route_id: &str) -> Result<BusLocation, ApiError> {
        self.calls.tracking.fetch_add(1, Ordering::SeqCst);
        let state = self.lock();
        fail_if(&state.failures.tracking)?;
        Ok(state.locations.get(route_id).cloned().unwrap_or_default())
    }

    async fn mark_attendance(
        &self,
        request: MarkAttendanceRequest,
    ) -> Result<AttendanceAck, ApiError> {
        self.calls.writes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        fail_if(&state.failures.writes)?;
        if request.trip_id.is_empty() || request.student_id.is_empty() {
            return Err(ApiError::backend("Trip ID and Student ID required"));
        }

        apply_status(&mut state, &request.student_id, request.status);
        state.writes.push(request.clone());

        Ok(AttendanceAck {
            id: Uuid::new_v4().to_string(),
            trip_id: request.trip_id,
            student_id: request.student_id,
            status: request.status,
            marked_at: Some(Utc::now().to_rfc3339()),
        })
    }
}

impl AuthApi for InMemoryBackend {
    async fn send_otp(&self, phone_number: &str) -> Result<String, ApiError> {
        if self.lock().users.contains_key(phone_number) {
            Ok("OTP sent".into())
        } else {
            Err(ApiError::backend("Phone number not registered"))
        }
    }

    async fn verify_otp(&self, phone_number: &str, otp: &str) -> Result<OtpSession, ApiError> {
        if otp != DEMO_OTP {
            return Err(ApiError::backend("Invalid OTP"));
        }
        let user = self
            .lock()
            .users
            .get(phone_number)
            .cloned()
            .ok_or_else(|| ApiError::backend("Phone number not registered"))?;

        Ok(OtpSession {
            token: format!("demo-{}", Uuid::new_v4()),
            user,
        })
    }

    async fn logout(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn accepted_write_is_reported_by_next_fetch() {
        let backend = InMemoryBackend::demo("r1");
        backend
            .mark_attendance(MarkAttendanceRequest {
                trip_id: "trip-demo".into(),
                student_id: "1-1".into(),
                status: AttendanceStatus::Present,
                note: None,
            })
            .await
            .unwrap();

        let stops = backend.route_stops("r1").await.unwrap();
        assert_eq!(stops[0].students[0].attendance_status, AttendanceStatus::Present);
        assert_eq!(backend.call_counts().writes, 1);
    }

    #[tokio::test]
    async fn planned_failures_surface_as_backend_errors() {
        let backend = InMemoryBackend::demo("r1");
        backend.set_failures(FailurePlan {
            tracking: Some("tracking offline".into()),
            ..Default::default()
        });

        assert!(backend.route_stops("r1").await.is_ok());
        match backend.bus_location("r1").await {
            Err(ApiError::Backend { message }) => assert_eq!(message, "tracking offline"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn verify_otp_needs_demo_code() {
        let backend = InMemoryBackend::demo("r1");
        assert!(backend.verify_otp("9000000001", "123456").await.is_err());
        let session = backend.verify_otp("9000000001", DEMO_OTP).await.unwrap();
        assert!(session.user.has_role(AppRole::Attender));
    }
}
