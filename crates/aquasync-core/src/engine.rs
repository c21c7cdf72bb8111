// ── Sync engine ──
//
// Owns the polling cadence and the push subscription for one device
// session, and routes user commands back to the cloud. Background tasks
// hang off a CancellationToken; teardown cancels them and joins, so
// results of in-flight HTTP calls are simply discarded.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use aquasync_api::{ApiClient, CodeValue, Specification};

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::DeviceState;
use crate::push::PushEnvelope;
use crate::reconcile::Reconciler;
use crate::store::StateStore;

const COMMAND_CHANNEL_SIZE: usize = 16;

// ── EngineState ──────────────────────────────────────────────────────

/// Lifecycle of the engine, observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    /// Steady state: polling and push bridge active.
    Syncing,
    Stopped,
}

// ── Command ──────────────────────────────────────────────────────────

/// User commands forwarded to the cloud. Fire-and-forget: failures are
/// logged by the processor task and the confirmed state arrives through
/// the next poll or push reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    TurnOn,
    TurnOff,
    SetMode(String),
    SetCooldown(i64),
    SetPump(String),
}

// ── SyncEngine ───────────────────────────────────────────────────────

/// The main entry point for one device session.
///
/// Cheaply cloneable via `Arc`. [`start()`](Self::start) fetches the
/// device specification, runs an initial poll cycle, and spawns the
/// background tasks; [`stop()`](Self::stop) tears everything down.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

struct EngineInner {
    config: SessionConfig,
    api: ApiClient,
    store: Arc<StateStore>,
    reconciler: Arc<Reconciler>,
    state: watch::Sender<EngineState>,
    cancel: CancellationToken,
    command_tx: mpsc::Sender<Command>,
    command_rx: Mutex<Option<mpsc::Receiver<Command>>>,
    /// Handler endpoint for the external push transport; the bridge
    /// task drains the other side.
    push_tx: mpsc::UnboundedSender<PushEnvelope>,
    push_rx: Mutex<Option<mpsc::UnboundedReceiver<PushEnvelope>>>,
    /// Fetched once per session, then served from memory.
    specification: Mutex<Option<Specification>>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SyncEngine {
    /// Run a single command against the cloud without starting the sync
    /// machinery -- lightweight one-shot mode for single CLI
    /// invocations. Unlike the channel path, failures surface to the
    /// caller.
    pub async fn oneshot(config: SessionConfig, command: Command) -> Result<(), CoreError> {
        config.validate()?;
        let api = ApiClient::new(&config.server, &config.client_id, config.secret.clone())?;
        dispatch_command(&api, &config.device_id, &config.registry, &command).await?;
        Ok(())
    }

    /// Create an engine for the configured device. Does NOT talk to the
    /// cloud -- call [`start()`](Self::start) for that.
    ///
    /// Configuration problems are fatal here; a session with a broken
    /// config never enters `Syncing`.
    pub fn new(config: SessionConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let api = ApiClient::new(&config.server, &config.client_id, config.secret.clone())?;
        let store = Arc::new(StateStore::new());
        let reconciler = Arc::new(Reconciler::new(
            &config.device_id,
            config.registry.clone(),
            Arc::clone(&store),
        ));

        let (state, _) = watch::channel(EngineState::Uninitialized);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);
        let (push_tx, push_rx) = mpsc::unbounded_channel();

        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                api,
                store,
                reconciler,
                state,
                cancel: CancellationToken::new(),
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                push_tx,
                push_rx: Mutex::new(Some(push_rx)),
                specification: Mutex::new(None),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    /// The session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Enter `Syncing`: fetch the specification, run the initial poll
    /// cycle, and spawn the poll, push-bridge, and command tasks.
    pub async fn start(&self) -> Result<(), CoreError> {
        if *self.inner.state.borrow() != EngineState::Uninitialized {
            return Err(CoreError::AlreadyStarted);
        }

        self.ensure_specification().await;
        self.poll_cycle().await;

        let mut handles = self.inner.task_handles.lock().await;

        {
            let engine = self.clone();
            let cancel = self.inner.cancel.clone();
            let interval = self.inner.config.poll_interval;
            handles.push(tokio::spawn(poll_task(engine, interval, cancel)));
        }

        if let Some(rx) = self.inner.push_rx.lock().await.take() {
            let engine = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(push_bridge_task(engine, rx, cancel)));
        }

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let engine = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(command_processor_task(engine, rx, cancel)));
        }

        let _ = self.inner.state.send(EngineState::Syncing);
        info!(device = %self.inner.config.device_id, "sync engine started");
        Ok(())
    }

    /// Tear the session down: cancel background tasks and join them.
    /// In-flight HTTP calls finish on their own and their results are
    /// discarded.
    pub async fn stop(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        let _ = self.inner.state.send(EngineState::Stopped);
        debug!(device = %self.inner.config.device_id, "sync engine stopped");
    }

    /// Current engine lifecycle state.
    pub fn engine_state(&self) -> EngineState {
        *self.inner.state.borrow()
    }

    /// Subscribe to lifecycle transitions.
    pub fn subscribe_engine_state(&self) -> watch::Receiver<EngineState> {
        self.inner.state.subscribe()
    }

    // ── Read API (consumed by entity wrappers) ───────────────────────

    /// The current reconciled device snapshot.
    pub fn state(&self) -> DeviceState {
        self.inner.store.current()
    }

    /// Subscribe to device-state changes.
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.inner.store.subscribe()
    }

    /// Liveness flag; unknown counts as offline.
    pub fn is_online(&self) -> bool {
        self.inner.store.current().is_online()
    }

    /// The cached device specification, if the session has fetched it.
    pub async fn specification(&self) -> Option<Specification> {
        self.inner.specification.lock().await.clone()
    }

    /// Handler endpoint for the external push transport. Feeding an
    /// envelope here never blocks; the bridge task reconciles it off
    /// the transport's delivery thread.
    pub fn push_sender(&self) -> mpsc::UnboundedSender<PushEnvelope> {
        self.inner.push_tx.clone()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start watering.
    pub async fn turn_on(&self) {
        self.enqueue(Command::TurnOn).await;
    }

    /// Stop watering.
    pub async fn turn_off(&self) {
        self.enqueue(Command::TurnOff).await;
    }

    /// Select the operating mode.
    pub async fn set_mode(&self, mode: impl Into<String>) {
        self.enqueue(Command::SetMode(mode.into())).await;
    }

    /// Set the cooldown timer. The cloud accepts integers only, so the
    /// value is rounded.
    pub async fn set_cooldown(&self, value: f64) {
        self.enqueue(Command::SetCooldown(value.round() as i64)).await;
    }

    /// Select the pump.
    pub async fn set_pump(&self, pump: impl Into<String>) {
        self.enqueue(Command::SetPump(pump.into())).await;
    }

    async fn enqueue(&self, command: Command) {
        info!(?command, "queueing device command");
        if self.inner.command_tx.send(command).await.is_err() {
            warn!("command channel closed, dropping command");
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Fetch the specification if this session does not have it yet.
    /// A transient failure is logged and retried on the next poll tick;
    /// once fetched, the copy lives for the session.
    async fn ensure_specification(&self) {
        let mut guard = self.inner.specification.lock().await;
        if guard.is_some() {
            return;
        }

        match self
            .inner
            .api
            .fetch_specification(&self.inner.config.device_id)
            .await
        {
            Ok(spec) => {
                info!(capabilities = spec.status.len(), "device specification cached");
                *guard = Some(spec);
            }
            Err(e) => warn!(error = %e, "specification fetch failed, will retry next poll"),
        }
    }

    /// One poll cycle: status, online flag, and the capability reads,
    /// issued concurrently. Each fetch's failure is isolated -- the
    /// others still apply, and prior values persist.
    async fn poll_cycle(&self) {
        self.ensure_specification().await;

        let api = &self.inner.api;
        let device_id = &self.inner.config.device_id;
        let registry = &self.inner.config.registry;
        let reconciler = &self.inner.reconciler;

        let (status, online, cooldown, pump) = tokio::join!(
            api.fetch_status(device_id),
            api.fetch_online_state(device_id),
            api.fetch_capability(device_id, &registry.cooldown_capability),
            api.fetch_capability(device_id, &registry.pump_capability),
        );

        match status {
            Ok(entries) => reconciler.apply_status(&entries),
            Err(e) => warn!(error = %e, "status fetch failed, keeping prior values"),
        }
        match online {
            Ok(flag) => reconciler.apply_online(flag),
            Err(e) => warn!(error = %e, "online-state fetch failed, keeping prior flag"),
        }
        match cooldown {
            Ok(value) => reconciler.apply_capability(&registry.cooldown_capability, &value),
            Err(e) => debug!(error = %e, "cooldown capability fetch failed"),
        }
        match pump {
            Ok(value) => reconciler.apply_capability(&registry.pump_capability, &value),
            Err(e) => debug!(error = %e, "pump capability fetch failed"),
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────────

async fn poll_task(engine: SyncEngine, period: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                debug!("poll tick");
                // A cancel mid-cycle drops the in-flight fetches; their
                // results are never applied after teardown.
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    () = engine.poll_cycle() => {}
                }
            }
        }
    }
}

/// Bridge the external push transport into the reconciler. The handler
/// side (`push_sender`) never blocks; reconciliation happens here.
async fn push_bridge_task(
    engine: SyncEngine,
    mut rx: mpsc::UnboundedReceiver<PushEnvelope>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            msg = rx.recv() => {
                let Some(msg) = msg else { break };
                engine.inner.reconciler.on_message(&msg);
            }
        }
    }
}

/// Process queued commands, routing each to the matching cloud call.
/// Failures are logged, never surfaced: the next successful poll or
/// push reconciliation corrects the visible state.
async fn command_processor_task(
    engine: SyncEngine,
    mut rx: mpsc::Receiver<Command>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            command = rx.recv() => {
                let Some(command) = command else { break };
                execute_command(&engine, command).await;
            }
        }
    }
}

async fn execute_command(engine: &SyncEngine, command: Command) {
    debug!(?command, "sending device command");
    let result = dispatch_command(
        &engine.inner.api,
        &engine.inner.config.device_id,
        &engine.inner.config.registry,
        &command,
    )
    .await;

    if let Err(e) = result {
        warn!(
            ?command,
            error = %e,
            "command send failed; state reconciles on the next poll or push"
        );
    }
}

/// Route a command to the matching cloud call: switch and mode go
/// through the generic command endpoint, cooldown and pump through
/// their capability-write endpoints.
async fn dispatch_command(
    api: &ApiClient,
    device_id: &str,
    registry: &crate::config::DpRegistry,
    command: &Command,
) -> Result<(), aquasync_api::Error> {
    match command {
        Command::TurnOn => {
            api.send_commands(device_id, &[CodeValue::new("switch", true)])
                .await
        }
        Command::TurnOff => {
            api.send_commands(device_id, &[CodeValue::new("switch", false)])
                .await
        }
        Command::SetMode(mode) => {
            api.send_commands(device_id, &[CodeValue::new("mode", mode.as_str())])
                .await
        }
        Command::SetCooldown(value) => {
            api.set_capability(device_id, &registry.cooldown_capability, &json!(value))
                .await
        }
        Command::SetPump(pump) => {
            api.set_capability(device_id, &registry.pump_capability, &json!(pump))
                .await
        }
    }
}
