use serde::{Deserialize, Serialize};

use crate::{models::Stop, sync::RouteSnapshot};

/// Where the bus is relative to a stop.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StopStatus {
    Completed,
    Current,
    Pending,
}

/// Marker classification the presentation layer renders.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MarkerStyle {
    NotReached,
    ReachedIncomplete,
    ReachedComplete,
    CurrentIncomplete,
    CurrentComplete,
}

/// Whether a stop without students counts as fully marked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptyStopPolicy {
    #[default]
    NotMarked,
    Marked,
}

/// Derived per-stop view, one entry per stop in route order.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StopView {
    pub index: usize,
    pub stop_id: String,
    pub name: String,
    pub scheduled_pickup_time: Option<String>,
    pub status: StopStatus,
    pub marker: MarkerStyle,
    pub fully_marked: bool,
    pub marked_count: usize,
    pub student_count: usize,
    /// Share of the connector to the next stop drawn as travelled; `None` for
    /// the last stop.
    pub connector_fill: Option<f64>,
}

/// Status of stop `index` when the bus is at `current_stop_index`.
///
/// An index past the last stop means the route is done and every stop is
/// `Completed`.
pub fn stop_status_for(index: usize, current_stop_index: i64, stop_count: usize) -> StopStatus {
    if stop_count > 0 && current_stop_index >= stop_count as i64 {
        return StopStatus::Completed;
    }
    let index = index as i64;
    if index < current_stop_index {
        StopStatus::Completed
    } else if index == current_stop_index {
        StopStatus::Current
    } else {
        StopStatus::Pending
    }
}

/// Pure read-only view over a synced snapshot.
pub struct StopProgressTracker<'a> {
    snapshot: &'a RouteSnapshot,
    empty_stop_policy: EmptyStopPolicy,
}

impl<'a> StopProgressTracker<'a> {
    pub fn new(snapshot: &'a RouteSnapshot, empty_stop_policy: EmptyStopPolicy) -> Self {
        Self {
            snapshot,
            empty_stop_policy,
        }
    }

    pub fn stop_count(&self) -> usize {
        self.snapshot.stops.len()
    }

    pub fn stop_status(&self, index: usize) -> StopStatus {
        stop_status_for(index, self.snapshot.current_stop_index, self.stop_count())
    }

    /// Every student at the stop has a non-pending status in the overlay.
    pub fn is_fully_marked(&self, stop: &Stop) -> bool {
        if stop.students.is_empty() {
            return self.empty_stop_policy == EmptyStopPolicy::Marked;
        }
        stop.students
            .iter()
            .all(|student| self.snapshot.attendance_of(&student.id).is_marked())
    }

    pub fn marked_count(&self, stop: &Stop) -> usize {
        stop.students
            .iter()
            .filter(|student| self.snapshot.attendance_of(&student.id).is_marked())
            .count()
    }

    pub fn marker_style(&self, index: usize) -> MarkerStyle {
        let fully_marked = self
            .snapshot
            .stops
            .get(index)
            .map(|stop| self.is_fully_marked(stop))
            .unwrap_or(false);

        match (self.stop_status(index), fully_marked) {
            (StopStatus::Pending, _) => MarkerStyle::NotReached,
            (StopStatus::Completed, false) => MarkerStyle::ReachedIncomplete,
            (StopStatus::Completed, true) => MarkerStyle::ReachedComplete,
            (StopStatus::Current, false) => MarkerStyle::CurrentIncomplete,
            (StopStatus::Current, true) => MarkerStyle::CurrentComplete,
        }
    }

    /// Fill of the connector leaving stop `index`. The current stop's
    /// connector follows the backend progress as-is; nothing is interpolated.
    pub fn connector_fill(&self, index: usize) -> f64 {
        if index + 1 >= self.stop_count() {
            return 0.0;
        }
        match self.stop_status(index) {
            StopStatus::Completed => 1.0,
            StopStatus::Current => self.snapshot.progress.clamp(0.0, 1.0),
            StopStatus::Pending => 0.0,
        }
    }

    pub fn stop_views(&self) -> Vec<StopView> {
        let last = self.stop_count().saturating_sub(1);
        self.snapshot
            .stops
            .iter()
            .enumerate()
            .map(|(index, stop)| StopView {
                index,
                stop_id: stop.id.clone(),
                name: stop.name.clone(),
                scheduled_pickup_time: stop.scheduled_pickup_time.clone(),
                status: self.stop_status(index),
                marker: self.marker_style(index),
                fully_marked: self.is_fully_marked(stop),
                marked_count: self.marked_count(stop),
                student_count: stop.students.len(),
                connector_fill: (index < last).then(|| self.connector_fill(index)),
            })
            .collect()
    }
}
