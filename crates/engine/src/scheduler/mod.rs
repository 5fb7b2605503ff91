//! Rate-controlled poll loop plus the independent heartbeat monitor:
//! two `tokio::spawn` tasks sharing a `tokio::sync::watch<bool>`
//! shutdown channel.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dwp_common::config::{EngineThresholds, ModbusConfig, PollingConfig};
use dwp_common::{
    ChannelKey, CycleRecord, DeviceId, DeviceSpec, LivenessStatus, Result, Side, TransportErrorKind,
};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::cycle::CycleEngine;
use crate::liveness::LivenessTracker;
use crate::store::StoreClient;
use crate::transport::{Transport, TransportAdapter};

fn now_wall() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Everything the poll loop and heartbeat task need, built once at
/// startup and shared by `Arc`.
pub struct SchedulerConfig {
    pub devices: Vec<DeviceSpec>,
    pub thresholds: Arc<EngineThresholds>,
    pub modbus: ModbusConfig,
    pub polling: PollingConfig,
    pub store: Arc<StoreClient>,
    /// Restricts polling to machines with this name, when set.
    pub machine_filter: Option<String>,
}

/// Owns the two spawned tasks and the shutdown `Sender`.
pub struct Scheduler {
    shutdown_tx: watch::Sender<bool>,
    poll_handle: JoinHandle<()>,
    heartbeat_handle: JoinHandle<()>,
}

impl Scheduler {
    pub fn start(config: SchedulerConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let liveness = Arc::new(Mutex::new(LivenessTracker::new()));
        let config = Arc::new(config);

        let poll_handle = tokio::spawn(run_poll_loop(
            Arc::clone(&config),
            Arc::clone(&liveness),
            shutdown_rx.clone(),
        ));
        let heartbeat_handle = tokio::spawn(run_heartbeat_loop(config, liveness, shutdown_rx));

        tracing::info!("Scheduler started");

        Self {
            shutdown_tx,
            poll_handle,
            heartbeat_handle,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        tracing::info!("Scheduler shutdown signaled");
    }

    pub async fn join(self) {
        let _ = self.poll_handle.await;
        let _ = self.heartbeat_handle.await;
    }
}

/// Live (device, line, machine) triples, flattened once at startup so
/// the poll loop just walks a slice every tick.
struct Target {
    device_id: DeviceId,
    line: String,
    machine_name: String,
    addr_th_l: u16,
    addr_th_r: u16,
    addr_side_l: u16,
    addr_side_r: u16,
}

fn flatten_targets(devices: &[DeviceSpec], machine_filter: Option<&str>) -> Vec<Target> {
    let mut targets = Vec::new();
    for device in devices {
        for (line, machines) in &device.lines {
            for machine in machines {
                if let Some(filter) = machine_filter {
                    if machine.name != filter {
                        continue;
                    }
                }
                targets.push(Target {
                    device_id: device.id,
                    line: line.clone(),
                    machine_name: machine.name.clone(),
                    addr_th_l: machine.addr_th_l,
                    addr_th_r: machine.addr_th_r,
                    addr_side_l: machine.addr_side_l,
                    addr_side_r: machine.addr_side_r,
                });
            }
        }
    }
    targets
}

async fn run_poll_loop(
    config: Arc<SchedulerConfig>,
    liveness: Arc<Mutex<LivenessTracker>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let targets = flatten_targets(&config.devices, config.machine_filter.as_deref());
    let devices_by_id: HashMap<DeviceId, &DeviceSpec> =
        config.devices.iter().map(|d| (d.id, d)).collect();

    let mut connections: HashMap<DeviceId, Box<dyn Transport>> = HashMap::new();
    let mut engines: HashMap<ChannelKey, CycleEngine> = HashMap::new();
    let poll_interval = Duration::from_millis(config.polling.poll_interval_ms);

    loop {
        if *shutdown_rx.borrow() {
            tracing::info!("Poll loop shutting down");
            break;
        }

        let t0 = tokio::time::Instant::now();

        for target in &targets {
            ensure_connected(&config, &devices_by_id, &mut connections, &liveness, target.device_id).await;

            let Some(adapter) = connections.get_mut(&target.device_id) else {
                continue;
            };

            match poll_target(adapter.as_mut(), &mut engines, &config.thresholds, target).await {
                Ok(cycles) => {
                    let now = now_wall();
                    {
                        let mut tracker = liveness.lock().await;
                        if let Some(entry) = tracker.record_success(target.device_id, now) {
                            log_status_change(&config.store, entry).await;
                        }
                    }
                    for cycle in cycles {
                        if let Err(e) = config.store.save_cycle(&cycle).await {
                            tracing::error!(
                                line = %target.line,
                                machine = %target.machine_name,
                                error = %e,
                                "failed to persist cycle"
                            );
                        }
                    }
                }
                Err(e) => {
                    let kind = match &e {
                        dwp_common::DwpError::Transport { kind, .. } => *kind,
                        _ => TransportErrorKind::Offline,
                    };
                    let status = match kind {
                        TransportErrorKind::Timeout => LivenessStatus::Timeout,
                        TransportErrorKind::Offline => LivenessStatus::Offline,
                    };

                    tracing::warn!(
                        device_id = %target.device_id,
                        line = %target.line,
                        machine = %target.machine_name,
                        error = %e,
                        "read failed for machine, continuing with next machine"
                    );

                    let mut tracker = liveness.lock().await;
                    if let Some(entry) =
                        tracker.record_failure(target.device_id, status, &e.to_string(), now_wall())
                    {
                        drop(tracker);
                        log_status_change(&config.store, entry).await;
                    }

                    connections.remove(&target.device_id);
                }
            }
        }

        let elapsed = t0.elapsed();
        if elapsed < poll_interval {
            tokio::time::sleep(poll_interval - elapsed).await;
        }
    }
}

/// Reads one target's four registers through `adapter`, feeds both
/// sides into their `CycleEngine`s, and returns whatever cycles that
/// produced. Pure aside from the transport read: no liveness tracking,
/// no persistence, so a mock `Transport` exercises it without a
/// database or a socket.
async fn poll_target(
    adapter: &mut dyn Transport,
    engines: &mut HashMap<ChannelKey, CycleEngine>,
    thresholds: &Arc<EngineThresholds>,
    target: &Target,
) -> Result<Vec<CycleRecord>> {
    let addresses = [
        target.addr_th_l,
        target.addr_th_r,
        target.addr_side_l,
        target.addr_side_r,
    ];
    let values = adapter.read_block(&addresses).await?;
    let now = now_wall();

    let th_l = values[0] as i64;
    let th_r = values[1] as i64;
    let side_l = values[2] as i64;
    let side_r = values[3] as i64;

    let machine_id = dwp_common::MachineSpec {
        name: target.machine_name.clone(),
        addr_th_l: 0,
        addr_th_r: 0,
        addr_side_l: 0,
        addr_side_r: 0,
    }
    .machine_id();

    let mut cycles = feed_side(
        engines,
        thresholds,
        &target.line,
        &target.machine_name,
        Side::L,
        machine_id,
        th_l,
        side_l,
        now,
    );
    cycles.extend(feed_side(
        engines,
        thresholds,
        &target.line,
        &target.machine_name,
        Side::R,
        machine_id,
        th_r,
        side_r,
        now,
    ));
    Ok(cycles)
}

#[allow(clippy::too_many_arguments)]
fn feed_side(
    engines: &mut HashMap<ChannelKey, CycleEngine>,
    thresholds: &Arc<EngineThresholds>,
    line: &str,
    machine_name: &str,
    side: Side,
    machine_id: u32,
    th: i64,
    side_val: i64,
    now: f64,
) -> Vec<CycleRecord> {
    let key = ChannelKey::new(line, machine_name, side);
    let engine = engines
        .entry(key.clone())
        .or_insert_with(|| CycleEngine::new(key, machine_id, Arc::clone(thresholds)));

    engine.accept(dwp_common::SamplePoint::new(th, side_val, now))
}

async fn ensure_connected(
    config: &SchedulerConfig,
    devices_by_id: &HashMap<DeviceId, &DeviceSpec>,
    connections: &mut HashMap<DeviceId, Box<dyn Transport>>,
    liveness: &Arc<Mutex<LivenessTracker>>,
    device_id: DeviceId,
) {
    if connections.contains_key(&device_id) {
        return;
    }
    let Some(device) = devices_by_id.get(&device_id) else {
        return;
    };

    let result = TransportAdapter::connect(
        &device.ip,
        config.modbus.port,
        config.modbus.unit_id,
        config.modbus.timeout_ms,
    )
    .await;

    let now = now_wall();
    let entry = {
        let mut tracker = liveness.lock().await;
        if tracker.status(device_id).is_none() {
            Some(tracker.initialize(device_id, result.is_ok(), now))
        } else if let Err(e) = &result {
            tracker.record_failure(device_id, LivenessStatus::Offline, &e.to_string(), now)
        } else {
            tracker.record_success(device_id, now)
        }
    };
    if let Some(entry) = entry {
        log_status_change(&config.store, entry).await;
    }

    match result {
        Ok(adapter) => {
            connections.insert(device_id, Box::new(adapter));
        }
        Err(e) => {
            tracing::warn!(device_id = %device_id, error = %e, "failed to connect to device");
        }
    }
}

async fn run_heartbeat_loop(
    config: Arc<SchedulerConfig>,
    liveness: Arc<Mutex<LivenessTracker>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let interval = Duration::from_secs(config.polling.heartbeat_check_interval_s);
    let offline_threshold = config.polling.offline_threshold_s as f64;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("Heartbeat monitor shutting down");
                    break;
                }
            }
        }
        if *shutdown_rx.borrow() {
            break;
        }

        let now = now_wall();
        let mut stale = Vec::new();
        {
            let mut tracker = liveness.lock().await;
            for device in &config.devices {
                if let Some(entry) = tracker.mark_offline_if_stale(device.id, now, offline_threshold) {
                    stale.push(entry);
                }
            }
        }
        for entry in stale {
            log_status_change(&config.store, entry).await;
        }
    }
}

async fn log_status_change(store: &StoreClient, entry: dwp_common::StatusChangeEntry) {
    tracing::info!(
        device_id = %entry.device_id,
        status = entry.new_status.as_db_str(),
        message = %entry.message,
        "device liveness transition"
    );
    if let Err(e) = store.log_status_change(&entry).await {
        tracing::error!(device_id = %entry.device_id, error = %e, "failed to log status change");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: i64, line: &str, machine: &str) -> DeviceSpec {
        let mut lines = HashMap::new();
        lines.insert(
            line.to_string(),
            vec![dwp_common::MachineSpec {
                name: machine.to_string(),
                addr_th_l: 0,
                addr_th_r: 1,
                addr_side_l: 2,
                addr_side_r: 3,
            }],
        );
        DeviceSpec {
            id: DeviceId(id),
            name: format!("device-{id}"),
            ip: "127.0.0.1".to_string(),
            lines,
        }
    }

    #[test]
    fn flatten_targets_respects_machine_filter() {
        let devices = vec![device(1, "A", "mc1"), device(2, "A", "mc2")];
        let targets = flatten_targets(&devices, Some("mc2"));
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].machine_name, "mc2");
    }

    #[test]
    fn flatten_targets_without_filter_covers_everything() {
        let devices = vec![device(1, "A", "mc1"), device(2, "B", "mc2")];
        let targets = flatten_targets(&devices, None);
        assert_eq!(targets.len(), 2);
    }

    /// Stands in for a live Modbus connection, returning one canned
    /// register batch per call.
    struct MockTransport {
        responses: std::collections::VecDeque<Vec<u16>>,
    }

    impl MockTransport {
        fn new(responses: Vec<Vec<u16>>) -> Self {
            Self { responses: responses.into() }
        }
    }

    #[async_trait::async_trait]
    impl Transport for MockTransport {
        async fn read_block(&mut self, _addresses: &[u16]) -> dwp_common::Result<Vec<u16>> {
            self.responses.pop_front().ok_or_else(|| dwp_common::DwpError::Transport {
                kind: TransportErrorKind::Offline,
                detail: "mock transport exhausted".to_string(),
            })
        }
    }

    fn target() -> Target {
        Target {
            device_id: DeviceId(1),
            line: "A".to_string(),
            machine_name: "mc1".to_string(),
            addr_th_l: 0,
            addr_th_r: 1,
            addr_side_l: 2,
            addr_side_r: 3,
        }
    }

    #[tokio::test]
    async fn poll_target_opens_an_engine_per_side_on_pressurized_samples() {
        let mut mock = MockTransport::new(vec![vec![38, 39, 0, 0]]);
        let mut engines = HashMap::new();
        let thresholds = Arc::new(EngineThresholds::default());

        let cycles = poll_target(&mut mock, &mut engines, &thresholds, &target())
            .await
            .expect("poll_target should succeed against the mock");

        assert!(cycles.is_empty(), "a single sample never finalizes a cycle");
        assert_eq!(engines.len(), 2, "one engine each for the L and R sides");
        assert!(engines.values().all(|e| e.is_active()));
    }

    #[tokio::test]
    async fn poll_target_propagates_transport_errors() {
        let mut mock = MockTransport::new(vec![]);
        let mut engines = HashMap::new();
        let thresholds = Arc::new(EngineThresholds::default());

        let result = poll_target(&mut mock, &mut engines, &thresholds, &target()).await;

        assert!(result.is_err());
        assert!(engines.is_empty());
    }
}
