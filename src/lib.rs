pub mod api;
pub mod attendance;
pub mod auth;
pub mod events;
pub mod models;
pub mod progress;
pub mod screen;
pub mod settings;
pub mod storage;
pub mod sync;
mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use tokio::sync::broadcast::error::RecvError;

use api::{InMemoryBackend, RestClient, TransportApi};
use auth::AuthSession;
use events::ScreenEvent;
use screen::RouteScreen;
use settings::{AppConfig, SettingsStore};
use storage::{JsonFileStore, SessionStorage};

const DEMO_ROUTE_ID: &str = "demo-route";

/// Long-lived services shared by every screen: settings, the persisted
/// session and the backend client authenticated from it.
pub struct BusBeaconApp {
    settings: SettingsStore,
    session: SessionStorage,
    client: Arc<RestClient>,
}

impl BusBeaconApp {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let settings = SettingsStore::new(data_dir.join("settings.json"))?;
        let store = JsonFileStore::new(data_dir.join("session.json"))?;
        let session = SessionStorage::new(Arc::new(store));
        let client = RestClient::new(&settings.config()?, Arc::new(session.clone()))?;

        Ok(Self {
            settings,
            session,
            client: Arc::new(client),
        })
    }

    pub fn config(&self) -> Result<AppConfig> {
        self.settings.config()
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn session(&self) -> &SessionStorage {
        &self.session
    }

    pub fn auth(&self) -> AuthSession<RestClient> {
        AuthSession::new(self.client.clone(), self.session.clone())
    }

    /// Route screen for `route_id`, limited to the signed-in attender's bus
    /// when one is assigned.
    pub fn route_screen(&self, route_id: &str) -> Result<RouteScreen<RestClient>> {
        let screen = RouteScreen::new(self.client.clone(), route_id, &self.config()?);
        Ok(match self.assigned_bus_id()? {
            Some(bus_id) => screen.with_bus(bus_id),
            None => screen,
        })
    }

    pub fn assigned_route_id(&self) -> Result<Option<String>> {
        Ok(self
            .session
            .user()?
            .and_then(|user| user.assigned_route)
            .map(|route| route.id))
    }

    fn assigned_bus_id(&self) -> Result<Option<String>> {
        Ok(self
            .session
            .user()?
            .and_then(|user| user.assigned_bus)
            .map(|bus| bus.id)
            .filter(|id| !id.is_empty()))
    }
}

fn default_log_level(debug_flag: Option<&str>) -> log::LevelFilter {
    if debug_flag.is_some_and(settings::flag_enabled) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|value| matches!(value.trim(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Headless attender session: focuses one route screen and logs what the
/// screen would render until Ctrl-C.
pub async fn run() -> Result<()> {
    let data_dir = std::env::var_os("BUSBEACON_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".busbeacon"));

    // Opening storage can already log
    env_logger::Builder::from_default_env()
        .filter_level(default_log_level(
            std::env::var("BUSBEACON_DEBUG").ok().as_deref(),
        ))
        .init();

    log::info!("BusBeacon starting up (data in {})", data_dir.display());

    let app = BusBeaconApp::open(&data_dir)?;
    let config = app.config()?;

    if env_flag("BUSBEACON_DEMO") {
        let route_id = env_value("BUSBEACON_ROUTE_ID").unwrap_or_else(|| DEMO_ROUTE_ID.into());
        log::info!("Demo mode: serving route {route_id} from memory");
        let backend = Arc::new(InMemoryBackend::demo(&route_id));
        return watch_route(RouteScreen::new(backend, route_id, &config)).await;
    }

    if !app.session().is_authenticated() {
        sign_in_from_env(&app).await?;
    }

    let route_id = match env_value("BUSBEACON_ROUTE_ID") {
        Some(route_id) => route_id,
        None => app.assigned_route_id()?.ok_or_else(|| {
            anyhow!("no route assigned to this attender; set BUSBEACON_ROUTE_ID")
        })?,
    };

    log::info!("Attender route {route_id} via {}", config.api_base_url);
    watch_route(app.route_screen(&route_id)?).await
}

async fn sign_in_from_env(app: &BusBeaconApp) -> Result<()> {
    let (Some(phone), Some(otp)) = (env_value("BUSBEACON_PHONE"), env_value("BUSBEACON_OTP"))
    else {
        log::warn!("No stored session; requests go out unauthenticated");
        return Ok(());
    };

    let user = app.auth().verify_otp(&phone, &otp).await?;
    log::info!("Signed in as {} ({})", user.name, user.phone_number);
    Ok(())
}

async fn watch_route<A: TransportApi>(screen: RouteScreen<A>) -> Result<()> {
    let mut events = screen.subscribe();

    if !screen.focus().await? {
        log::warn!("Route {} loaded partially; polling continues", screen.route_id());
    }
    log_stop_views(&screen).await;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                break;
            }
            event = events.recv() => match event {
                Ok(ScreenEvent::SnapshotUpdated { .. })
                | Ok(ScreenEvent::AttendanceChanged { .. }) => {
                    log_stop_views(&screen).await;
                }
                Ok(ScreenEvent::Notice { severity, message }) => {
                    log::warn!("[{severity:?}] {message}");
                }
                Ok(ScreenEvent::Loading { .. }) => {}
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!("Screen event listener skipped {skipped} events");
                    log_stop_views(&screen).await;
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    screen.unfocus().await?;
    log::info!("BusBeacon shut down");
    Ok(())
}

async fn log_stop_views<A: TransportApi>(screen: &RouteScreen<A>) {
    for view in screen.stop_views().await {
        let fill = view
            .connector_fill
            .map(|fill| format!("{:.0}%", fill * 100.0))
            .unwrap_or_else(|| "-".into());
        log::info!(
            "#{} {:<24} {:?} {:?} {}/{} marked, next leg {}",
            view.index + 1,
            view.name,
            view.status,
            view.marker,
            view.marked_count,
            view.student_count,
            fill
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_flag_raises_default_log_level() {
        assert_eq!(default_log_level(None), log::LevelFilter::Info);
        assert_eq!(default_log_level(Some("0")), log::LevelFilter::Info);
        assert_eq!(default_log_level(Some("1")), log::LevelFilter::Debug);
        assert_eq!(default_log_level(Some("TRUE")), log::LevelFilter::Debug);
    }

    #[test]
    fn open_creates_data_dir_and_reads_no_session() {
        let dir = std::env::temp_dir().join(format!("busbeacon-app-{}", uuid::Uuid::new_v4()));
        let app = BusBeaconApp::open(&dir).unwrap();

        assert!(dir.is_dir());
        assert!(!app.session().is_authenticated());
        assert_eq!(app.assigned_route_id().unwrap(), None);

        let _ = std::fs::remove_dir_all(dir);
    }
}
