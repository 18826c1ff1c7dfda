use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio_util::sync::CancellationToken;

use crate::{
    api::{ApiError, TransportApi},
    events::{publish, EventSender, ScreenEvent, SnapshotPart},
};

use super::state::{RouteSnapshot, SharedSnapshot};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Keeps a focused route screen's snapshot in line with the backend.
///
/// Each `load` cycle fans out three fetches and applies every result on its
/// own as soon as it resolves. Results that arrive after the screen lost focus
/// (the liveness token is cancelled) are dropped, as are results older than the
/// last cycle already applied for the same fetch.
pub struct TripAttendanceSync<A: TransportApi> {
    api: Arc<A>,
    route_id: String,
    bus_id: Option<String>,
    snapshot: SharedSnapshot,
    events: EventSender,
    cycle: Arc<AtomicU64>,
    liveness: CancellationToken,
}

impl<A: TransportApi> Clone for TripAttendanceSync<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            route_id: self.route_id.clone(),
            bus_id: self.bus_id.clone(),
            snapshot: self.snapshot.clone(),
            events: self.events.clone(),
            cycle: self.cycle.clone(),
            liveness: self.liveness.clone(),
        }
    }
}

impl<A: TransportApi> TripAttendanceSync<A> {
    pub fn new(
        api: Arc<A>,
        route_id: impl Into<String>,
        bus_id: Option<String>,
        snapshot: SharedSnapshot,
        events: EventSender,
        liveness: CancellationToken,
    ) -> Self {
        Self {
            api,
            route_id: route_id.into(),
            bus_id,
            snapshot,
            events,
            cycle: Arc::new(AtomicU64::new(0)),
            liveness,
        }
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot.clone()
    }

    pub fn is_live(&self) -> bool {
        !self.liveness.is_cancelled()
    }

    /// Runs one sync cycle. Returns `true` only when all three fetches
    /// succeeded; failures never escape. A non-silent failure publishes a
    /// blocking notice, a silent one is only logged.
    pub async fn load(&self, silent: bool) -> bool {
        let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;

        let (stops, trips, tracking) = tokio::join!(
            self.load_stops(cycle),
            self.load_trips(cycle),
            self.load_tracking(cycle),
        );

        let failures: Vec<(SnapshotPart, ApiError)> = [
            (SnapshotPart::Stops, stops),
            (SnapshotPart::Trips, trips),
            (SnapshotPart::Tracking, tracking),
        ]
        .into_iter()
        .filter_map(|(part, result)| result.err().map(|err| (part, err)))
        .collect();

        let Some((_, first_error)) = failures.first() else {
            return true;
        };

        for (part, err) in &failures {
            if silent {
                log_warn!(
                    "Background sync of {:?} for route {} failed (cycle {cycle}): {err}",
                    part,
                    self.route_id
                );
            } else {
                log_error!(
                    "Failed to load {:?} for route {} (cycle {cycle}): {err}",
                    part,
                    self.route_id
                );
            }
        }

        if !silent && self.is_live() {
            publish(
                &self.events,
                ScreenEvent::blocking(format!("Failed to load route data: {first_error}")),
            );
        }

        false
    }

    async fn load_stops(&self, cycle: u64) -> Result<(), ApiError> {
        let stops = self.api.route_stops(&self.route_id).await?;
        let count = stops.len();
        if self
            .apply(SnapshotPart::Stops, |snapshot| snapshot.apply_stops(cycle, stops))
            .await
        {
            log_info!("Route {} synced: {count} stops (cycle {cycle})", self.route_id);
        }
        Ok(())
    }

    async fn load_trips(&self, cycle: u64) -> Result<(), ApiError> {
        let today = self.api.today_trips(self.bus_id.as_deref()).await?;
        self.apply(SnapshotPart::Trips, |snapshot| snapshot.apply_trips(cycle, today))
            .await;
        Ok(())
    }

    async fn load_tracking(&self, cycle: u64) -> Result<(), ApiError> {
        let location = self.api.bus_location(&self.route_id).await?;
        self.apply(SnapshotPart::Tracking, |snapshot| {
            snapshot.apply_tracking(cycle, location)
        })
        .await;
        Ok(())
    }

    /// Mutates the snapshot only while the owning screen is still focused.
    async fn apply<F>(&self, part: SnapshotPart, update: F) -> bool
    where
        F: FnOnce(&mut RouteSnapshot) -> bool,
    {
        if !self.is_live() {
            log_debug!("Dropping {:?} result for unfocused route {}", part, self.route_id);
            return false;
        }

        let applied = {
            let mut snapshot = self.snapshot.lock().await;
            // Focus may have been lost while waiting for the lock.
            if !self.is_live() {
                return false;
            }
            update(&mut snapshot)
        };

        if applied {
            publish(&self.events, ScreenEvent::SnapshotUpdated { part });
        } else {
            log_debug!("Ignoring stale {:?} result for route {}", part, self.route_id);
        }
        applied
    }
}
