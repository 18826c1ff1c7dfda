use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    api::TransportApi,
    attendance::{OptimisticAttendanceWriter, PendingWrite, WriteError},
    events::{self, publish, EventSender, ScreenEvent},
    models::AttendanceStatus,
    progress::{EmptyStopPolicy, StopProgressTracker, StopView},
    settings::AppConfig,
    sync::{PollPolicy, Poller, RouteSnapshot, SharedSnapshot, TripAttendanceSync},
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// State that exists only while the screen is focused.
struct FocusedScreen<A: TransportApi> {
    id: Uuid,
    snapshot: SharedSnapshot,
    sync: TripAttendanceSync<A>,
    writer: OptimisticAttendanceWriter<A>,
    poller: Poller,
    liveness: CancellationToken,
}

/// The attender's route screen: owns one snapshot per focus and wires the
/// sync, tracker and writer around it.
pub struct RouteScreen<A: TransportApi> {
    api: Arc<A>,
    route_id: String,
    bus_id: Option<String>,
    poll_policy: PollPolicy,
    empty_stop_policy: EmptyStopPolicy,
    events: EventSender,
    focused: Mutex<Option<FocusedScreen<A>>>,
}

impl<A: TransportApi> RouteScreen<A> {
    pub fn new(api: Arc<A>, route_id: impl Into<String>, config: &AppConfig) -> Self {
        Self {
            api,
            route_id: route_id.into(),
            bus_id: None,
            poll_policy: PollPolicy::from_config(config),
            empty_stop_policy: config.empty_stop_policy,
            events: events::channel(),
            focused: Mutex::new(None),
        }
    }

    /// Restricts today's trips to one bus.
    pub fn with_bus(mut self, bus_id: impl Into<String>) -> Self {
        self.bus_id = Some(bus_id.into());
        self
    }

    pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
        self.poll_policy = policy;
        self
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScreenEvent> {
        self.events.subscribe()
    }

    pub async fn is_focused(&self) -> bool {
        self.focused.lock().await.is_some()
    }

    /// Creates a fresh snapshot, runs the foreground load and starts polling.
    /// Returns whether the initial load fully succeeded.
    pub async fn focus(&self) -> Result<bool> {
        let (id, sync, snapshot, liveness) = {
            let mut focused = self.focused.lock().await;
            if focused.is_some() {
                bail!("route screen already focused");
            }

            let liveness = CancellationToken::new();
            let snapshot = RouteSnapshot::shared(self.route_id.clone());
            snapshot.lock().await.is_loading = true;

            let sync = TripAttendanceSync::new(
                self.api.clone(),
                self.route_id.clone(),
                self.bus_id.clone(),
                snapshot.clone(),
                self.events.clone(),
                liveness.clone(),
            );
            let writer = OptimisticAttendanceWriter::new(
                self.api.clone(),
                snapshot.clone(),
                self.events.clone(),
            );

            let id = Uuid::new_v4();
            *focused = Some(FocusedScreen {
                id,
                snapshot: snapshot.clone(),
                sync: sync.clone(),
                writer,
                poller: Poller::new(),
                liveness: liveness.clone(),
            });
            (id, sync, snapshot, liveness)
        };

        log_info!("Route screen {} focused on route {}", id, self.route_id);
        publish(
            &self.events,
            ScreenEvent::Loading {
                is_loading: true,
                is_refreshing: false,
            },
        );

        let loaded = sync.load(false).await;

        if liveness.is_cancelled() {
            log_warn!("Route screen {id} lost focus during its initial load");
            return Ok(loaded);
        }

        snapshot.lock().await.is_loading = false;
        publish(
            &self.events,
            ScreenEvent::Loading {
                is_loading: false,
                is_refreshing: false,
            },
        );

        let mut focused = self.focused.lock().await;
        match focused.as_mut() {
            Some(screen) if screen.id == id => {
                screen
                    .poller
                    .start(sync, self.poll_policy, liveness.child_token())?;
            }
            _ => log_warn!("Route screen {id} was replaced before polling started"),
        }

        Ok(loaded)
    }

    /// Stops polling and discards the snapshot. In-flight results are dropped.
    pub async fn unfocus(&self) -> Result<()> {
        let screen = self.focused.lock().await.take();
        let Some(mut screen) = screen else {
            return Ok(());
        };

        screen.liveness.cancel();
        screen.poller.stop().await?;
        log_info!("Route screen {} unfocused", screen.id);
        Ok(())
    }

    /// Pull-to-refresh: a silent load behind the refreshing indicator.
    pub async fn refresh(&self) -> Result<bool> {
        let (sync, snapshot) = {
            let focused = self.focused.lock().await;
            let screen = focused
                .as_ref()
                .ok_or_else(|| anyhow!("route screen is not focused"))?;
            (screen.sync.clone(), screen.snapshot.clone())
        };

        self.set_refreshing(&snapshot, true).await;
        let loaded = sync.load(true).await;
        if sync.is_live() {
            self.set_refreshing(&snapshot, false).await;
        }
        Ok(loaded)
    }

    async fn set_refreshing(&self, snapshot: &SharedSnapshot, refreshing: bool) {
        let is_loading = {
            let mut guard = snapshot.lock().await;
            guard.is_refreshing = refreshing;
            guard.is_loading
        };
        publish(
            &self.events,
            ScreenEvent::Loading {
                is_loading,
                is_refreshing: refreshing,
            },
        );
    }

    pub async fn mark_attendance(
        &self,
        student_id: &str,
        status: AttendanceStatus,
    ) -> Result<PendingWrite, WriteError> {
        let writer = {
            let focused = self.focused.lock().await;
            focused
                .as_ref()
                .map(|screen| screen.writer.clone())
                .ok_or(WriteError::NotFocused)?
        };
        writer.mark_attendance(student_id, status).await
    }

    /// Copy of the current snapshot, `None` while unfocused.
    pub async fn snapshot(&self) -> Option<RouteSnapshot> {
        let shared = self
            .focused
            .lock()
            .await
            .as_ref()
            .map(|screen| screen.snapshot.clone())?;
        let snapshot = shared.lock().await.clone();
        Some(snapshot)
    }

    pub async fn stop_views(&self) -> Vec<StopView> {
        match self.snapshot().await {
            Some(snapshot) => {
                StopProgressTracker::new(&snapshot, self.empty_stop_policy).stop_views()
            }
            None => Vec::new(),
        }
    }
}
