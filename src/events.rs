use serde::Serialize;
use tokio::sync::broadcast;

use crate::models::AttendanceStatus;

pub const EVENT_CAPACITY: usize = 64;

pub type EventSender = broadcast::Sender<ScreenEvent>;

/// Part of the route snapshot a fetch replaced.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SnapshotPart {
    Stops,
    Trips,
    Tracking,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NoticeSeverity {
    /// Alert the user must dismiss.
    Blocking,
    /// Toast-style notice.
    Transient,
}

/// Updates pushed to the presentation layer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScreenEvent {
    Loading {
        is_loading: bool,
        is_refreshing: bool,
    },
    SnapshotUpdated {
        part: SnapshotPart,
    },
    AttendanceChanged {
        student_id: String,
        status: AttendanceStatus,
    },
    Notice {
        severity: NoticeSeverity,
        message: String,
    },
}

impl ScreenEvent {
    pub fn blocking(message: impl Into<String>) -> Self {
        ScreenEvent::Notice {
            severity: NoticeSeverity::Blocking,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        ScreenEvent::Notice {
            severity: NoticeSeverity::Transient,
            message: message.into(),
        }
    }
}

pub fn channel() -> EventSender {
    broadcast::channel(EVENT_CAPACITY).0
}

/// Sends without caring whether anyone is listening.
pub fn publish(events: &EventSender, event: ScreenEvent) {
    let _ = events.send(event);
}
