// ── Router abstraction ──
//
// Lifecycle of one router connection: login, model resolution, snapshot
// refresh (on demand and in the background), command routing and device
// presence. Observers follow state through `watch` channels.

use std::sync::Arc;
use std::time::Duration;

use cudy_api::{
    DetectedModel, DeviceRecord, LuciClient, ModelFamily, ProfileTable, Snapshot, VpnState,
    WifiBand, WifiState, detect_model, get_snapshot,
};
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::RouterConfig;
use crate::error::CoreError;

const COMMAND_CHANNEL_SIZE: usize = 16;

// ── ConnectionState ──────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Display)]
#[serde(tag = "state", rename_all = "snake_case")]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Login or the last refresh failed; the next refresh retries.
    #[strum(to_string = "unavailable ({reason})")]
    Unavailable { reason: String },
}

// ── Router ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<RouterInner>`.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    config: RouterConfig,
    client: LuciClient,
    profiles: ProfileTable,
    model: watch::Sender<Option<DetectedModel>>,
    snapshot: watch::Sender<Arc<Snapshot>>,
    connection_state: watch::Sender<ConnectionState>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Router {
    /// Create a router with the built-in model profiles. Does NOT connect --
    /// call [`connect()`](Self::connect) to log in and start background tasks.
    pub fn new(config: RouterConfig) -> Result<Self, CoreError> {
        Self::with_profiles(config, ProfileTable::builtin())
    }

    /// Create a router resolving models through `profiles`.
    pub fn with_profiles(config: RouterConfig, profiles: ProfileTable) -> Result<Self, CoreError> {
        let client = LuciClient::new(config.client(), &config.transport())?;
        let (model, _) = watch::channel(None);
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::new()));
        let (connection_state, _) = watch::channel(ConnectionState::Disconnected);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(RouterInner {
                config,
                client,
                profiles,
                model,
                snapshot,
                connection_state,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &RouterConfig {
        &self.inner.config
    }

    /// The underlying LuCI client.
    pub fn client(&self) -> &LuciClient {
        &self.inner.client
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Log in, resolve the model family, take the first snapshot and spawn
    /// the background tasks (command processor, periodic refresh).
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.set_state(ConnectionState::Connecting);
        let client = &self.inner.client;

        if !client.authenticate().await {
            return Err(self.unavailable(CoreError::AuthenticationFailed {
                message: format!("no session cookie from {}", client.host()),
            }));
        }

        let model = match self.inner.config.model {
            Some(family) => DetectedModel { raw: None, family },
            None => detect_model(client, &self.inner.profiles)
                .await
                .map_err(|e| self.unavailable(e.into()))?,
        };
        info!(family = %model.family, "using model profile");
        self.inner.model.send_replace(Some(model));

        self.refresh().await?;

        let mut handles = self.inner.task_handles.lock().await;
        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let router = self.clone();
            handles.push(tokio::spawn(command_processor_task(router, rx)));
        }

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let router = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(refresh_task(router, interval, cancel)));
        }

        self.set_state(ConnectionState::Connected);
        info!(host = %client.host(), "connected to router");
        Ok(())
    }

    /// Stop background tasks and drop the session.
    pub async fn disconnect(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.client.logout().await;
        self.set_state(ConnectionState::Disconnected);
        debug!("disconnected");
    }

    /// Take a new snapshot and publish it.
    ///
    /// An authentication failure or a snapshot without modules marks the
    /// router [`Unavailable`](ConnectionState::Unavailable).
    pub async fn refresh(&self) -> Result<(), CoreError> {
        if *self.inner.connection_state.borrow() == ConnectionState::Disconnected {
            return Err(CoreError::NotConnected);
        }

        let snapshot = get_snapshot(&self.inner.client, self.family())
            .await
            .map_err(|e| self.unavailable(e.into()))?;
        if snapshot.is_empty() {
            return Err(self.unavailable(CoreError::EmptySnapshot));
        }

        debug!(
            modules = snapshot.len(),
            devices = snapshot.devices().len(),
            "snapshot refreshed"
        );
        self.inner.snapshot.send_replace(Arc::new(snapshot));
        if matches!(
            *self.inner.connection_state.borrow(),
            ConnectionState::Unavailable { .. }
        ) {
            self.set_state(ConnectionState::Connected);
        }
        Ok(())
    }

    /// One-shot: connect, run closure, disconnect. No background refresh.
    pub async fn oneshot<F, Fut, T>(config: RouterConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Router) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = Duration::ZERO;
        let router = Router::new(cfg)?;
        router.connect().await?;
        let result = f(router.clone()).await;
        router.disconnect().await;
        result
    }

    fn set_state(&self, state: ConnectionState) {
        self.inner.connection_state.send_replace(state);
    }

    /// Record `err` as the reason the router is unavailable.
    fn unavailable(&self, err: CoreError) -> CoreError {
        self.set_state(ConnectionState::Unavailable {
            reason: err.to_string(),
        });
        err
    }

    // ── Command execution ────────────────────────────────────────

    /// Run a command through the command processor.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if matches!(
            *self.inner.connection_state.borrow(),
            ConnectionState::Disconnected | ConnectionState::Connecting
        ) {
            return Err(CoreError::NotConnected);
        }

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::NotConnected)?;

        rx.await.map_err(|_| CoreError::NotConnected)?
    }

    pub async fn reboot(&self) -> Result<(), CoreError> {
        self.execute(Command::Reboot).await.map(drop)
    }

    pub async fn set_wifi(&self, band: WifiBand, enabled: bool) -> Result<(), CoreError> {
        self.execute(Command::SetWifi { band, enabled })
            .await
            .map(drop)
    }

    pub async fn set_vpn(&self, enabled: bool) -> Result<(), CoreError> {
        self.execute(Command::SetVpn { enabled }).await.map(drop)
    }

    pub async fn wifi_state(&self) -> Result<WifiState, CoreError> {
        Ok(self.inner.client.get_wifi_state().await?)
    }

    pub async fn vpn_state(&self) -> Result<VpnState, CoreError> {
        Ok(self.inner.client.get_vpn_state().await?)
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to connection state changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    /// Subscribe to published snapshots.
    pub fn snapshots(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.snapshot.subscribe()
    }

    /// The latest snapshot (empty before the first refresh).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.inner.snapshot.borrow())
    }

    /// The resolved model, once connected.
    pub fn model(&self) -> Option<DetectedModel> {
        self.inner.model.borrow().clone()
    }

    /// Family in use: configured, detected, or generic.
    pub fn family(&self) -> ModelFamily {
        self.inner
            .model
            .borrow()
            .as_ref()
            .map_or(ModelFamily::Generic, |m| m.family)
    }

    // ── Device presence ──────────────────────────────────────────

    /// Devices of the latest snapshot.
    pub fn devices(&self) -> Vec<DeviceRecord> {
        self.snapshot().devices().to_vec()
    }

    /// Look a device up by MAC (case and separator insensitive).
    pub fn device(&self, mac: &str) -> Result<DeviceRecord, CoreError> {
        let wanted = normalize_mac(mac);
        self.snapshot()
            .devices()
            .iter()
            .find(|d| d.has_mac() && normalize_mac(&d.mac) == wanted)
            .cloned()
            .ok_or_else(|| CoreError::DeviceNotFound {
                mac: mac.to_owned(),
            })
    }

    /// Whether `mac` is in the latest device list.
    pub fn is_connected(&self, mac: &str) -> bool {
        self.device(mac).is_ok()
    }
}

fn normalize_mac(mac: &str) -> String {
    mac.trim().to_ascii_lowercase().replace('-', ":")
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically refresh the snapshot.
async fn refresh_task(router: Router, interval: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = router.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        }
    }
}

/// Process commands one at a time.
async fn command_processor_task(router: Router, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = router.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&router, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command(router: &Router, cmd: Command) -> Result<CommandResult, CoreError> {
    let client = &router.inner.client;
    let accepted = match cmd {
        Command::Reboot => client.reboot().await?,
        Command::SetWifi { band, enabled } => client.set_wifi(band, enabled).await?,
        Command::SetVpn { enabled } => client.set_vpn(enabled).await?,
    };

    if !accepted {
        warn!(operation = cmd.operation(), "router refused command");
        return Err(CoreError::Rejected {
            operation: cmd.operation().into(),
        });
    }
    info!(operation = cmd.operation(), "command applied");

    if cmd.needs_refresh() {
        if let Err(e) = router.refresh().await {
            warn!(error = %e, "refresh after command failed");
        }
    }
    Ok(CommandResult::Ok)
}
