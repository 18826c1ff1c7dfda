use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::{
    api::TransportApi,
    events::{publish, EventSender, ScreenEvent},
    models::{AttendanceStatus, MarkAttendanceRequest},
    sync::SharedSnapshot,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WriteError {
    #[error("No active trip - cannot record attendance")]
    NoActiveTrip,
    #[error("Route screen is not focused")]
    NotFocused,
}

/// Write that was handed to the backend and is settling in the background.
///
/// Dropping it does not cancel the request.
pub struct PendingWrite {
    pub student_id: String,
    pub status: AttendanceStatus,
    handle: JoinHandle<bool>,
}

impl PendingWrite {
    /// Waits for the backend answer; `true` when the write was acknowledged.
    pub async fn settled(self) -> bool {
        match self.handle.await {
            Ok(acknowledged) => acknowledged,
            Err(err) => {
                log_error!("attendance write task for {} failed: {err}", self.student_id);
                false
            }
        }
    }
}

/// Applies attendance taps to the local overlay first and sends them after.
///
/// A failed write is never rolled back; the next poll brings server truth.
pub struct OptimisticAttendanceWriter<A: TransportApi> {
    api: Arc<A>,
    snapshot: SharedSnapshot,
    events: EventSender,
}

impl<A: TransportApi> Clone for OptimisticAttendanceWriter<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            snapshot: self.snapshot.clone(),
            events: self.events.clone(),
        }
    }
}

impl<A: TransportApi> OptimisticAttendanceWriter<A> {
    pub fn new(api: Arc<A>, snapshot: SharedSnapshot, events: EventSender) -> Self {
        Self {
            api,
            snapshot,
            events,
        }
    }

    /// Marks against the trip currently selected in the snapshot.
    pub async fn mark_attendance(
        &self,
        student_id: &str,
        status: AttendanceStatus,
    ) -> Result<PendingWrite, WriteError> {
        let trip_id = {
            let mut snapshot = self.snapshot.lock().await;
            snapshot.set_attendance(student_id, status);
            snapshot.active_trip_id.clone()
        };
        self.after_local_apply(trip_id, student_id, status)
    }

    /// Marks against an explicit trip; `None` means no trip is known.
    pub async fn mark_attendance_for_trip(
        &self,
        trip_id: Option<&str>,
        student_id: &str,
        status: AttendanceStatus,
    ) -> Result<PendingWrite, WriteError> {
        self.snapshot
            .lock()
            .await
            .set_attendance(student_id, status);
        self.after_local_apply(trip_id.map(str::to_string), student_id, status)
    }

    fn after_local_apply(
        &self,
        trip_id: Option<String>,
        student_id: &str,
        status: AttendanceStatus,
    ) -> Result<PendingWrite, WriteError> {
        publish(
            &self.events,
            ScreenEvent::AttendanceChanged {
                student_id: student_id.to_string(),
                status,
            },
        );

        let Some(trip_id) = trip_id.filter(|id| !id.is_empty()) else {
            log_warn!(
                "Marked {student_id} as {} locally but no active trip is known",
                status.as_str()
            );
            publish(&self.events, ScreenEvent::blocking(WriteError::NoActiveTrip.to_string()));
            return Err(WriteError::NoActiveTrip);
        };

        Ok(self.dispatch(MarkAttendanceRequest {
            trip_id,
            student_id: student_id.to_string(),
            status,
            note: None,
        }))
    }

    fn dispatch(&self, request: MarkAttendanceRequest) -> PendingWrite {
        let api = self.api.clone();
        let events = self.events.clone();
        let student_id = request.student_id.clone();
        let status = request.status;

        let handle = tokio::spawn(async move {
            let trip_id = request.trip_id.clone();
            let student_id = request.student_id.clone();
            match api.mark_attendance(request).await {
                Ok(ack) => {
                    log_info!(
                        "Attendance {} recorded for {student_id} on trip {trip_id} ({})",
                        ack.status.as_str(),
                        ack.id
                    );
                    true
                }
                Err(err) => {
                    log_warn!("Attendance write for {student_id} on trip {trip_id} failed: {err}");
                    publish(
                        &events,
                        ScreenEvent::transient(format!("Could not save attendance: {err}")),
                    );
                    false
                }
            }
        });

        PendingWrite {
            student_id,
            status,
            handle,
        }
    }
}
