use anyhow::{bail, Context, Result};
use rand::Rng;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{api::TransportApi, settings::AppConfig};

use super::controller::TripAttendanceSync;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Delay schedule for background polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_backoff: Duration,
    pub jitter: Duration,
}

impl PollPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_backoff: config.max_backoff(),
            jitter: config.backoff_jitter(),
        }
    }

    pub fn fixed(interval: Duration) -> Self {
        Self {
            interval,
            max_backoff: interval,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Interval doubled per consecutive failure, capped at `max_backoff`.
    pub fn base_delay(&self, consecutive_failures: u32) -> Duration {
        let factor = 1u32
            .checked_shl(consecutive_failures.min(16))
            .unwrap_or(u32::MAX);
        self.interval
            .saturating_mul(factor)
            .min(self.max_backoff.max(self.interval))
    }

    /// `base_delay` plus random jitter once the backend has started failing.
    pub fn next_delay(&self, consecutive_failures: u32) -> Duration {
        let base = self.base_delay(consecutive_failures);
        if consecutive_failures == 0 || self.jitter.is_zero() {
            return base;
        }
        let jitter_ms = self.jitter.as_millis() as u64;
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

/// Owns the background poll task of one focused screen.
pub struct Poller {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl Poller {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn start<A: TransportApi>(
        &mut self,
        sync: TripAttendanceSync<A>,
        policy: PollPolicy,
        cancel_token: CancellationToken,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("poller already running");
        }

        let handle = tokio::spawn(poll_loop(sync, policy, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("route poller task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for Poller {
    fn default() -> Self {
        Self::new()
    }
}

/// Calls `load(true)` after every delay until cancelled. An in-flight load is
/// dropped on cancellation, which aborts its requests.
pub async fn poll_loop<A: TransportApi>(
    sync: TripAttendanceSync<A>,
    policy: PollPolicy,
    cancel_token: CancellationToken,
) {
    let mut consecutive_failures: u32 = 0;

    loop {
        let delay = policy.next_delay(consecutive_failures);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel_token.cancelled() => break,
        }

        let succeeded = tokio::select! {
            ok = sync.load(true) => ok,
            _ = cancel_token.cancelled() => break,
        };

        if succeeded {
            if consecutive_failures > 0 {
                log_info!(
                    "Route {} sync recovered after {} failed polls",
                    sync.route_id(),
                    consecutive_failures
                );
            }
            consecutive_failures = 0;
        } else {
            consecutive_failures = consecutive_failures.saturating_add(1);
            log_warn!(
                "Route {} poll failed {} time(s) in a row; next attempt in ~{:?}",
                sync.route_id(),
                consecutive_failures,
                policy.base_delay(consecutive_failures)
            );
        }
    }

    log_info!("Route {} poller shutting down", sync.route_id());
}
