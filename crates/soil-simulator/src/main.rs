//! Desktop simulator for soil-node wake cycles.
//!
//! Runs the real lifecycle controller from `soil-core` against an in-process
//! mesh, bridge and collector. Each cycle boots a fresh controller, exactly as
//! the device does after waking from deep sleep; the collector persists across
//! cycles like the broker would.
//!
//! ```text
//! soil-simulator --cycles 3 --raw 520
//! soil-simulator --no-bridge          # watch the connect timeout fire
//! soil-simulator --config node.json   # override the compiled-in config
//! ```

mod collector;
mod hardware;
mod mesh;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration as StdDuration;

use clap::Parser;
use embassy_time::Duration;
use log::{error, info};

use soil_core::clock::SystemClock;
use soil_core::config::NodeConfig;
use soil_core::lifecycle::LifecycleController;
use soil_core::sensors::MoistureSampler;

use collector::Collector;
use hardware::{SimulatedPower, SimulatedProbe, SimulatedRail, StdDelay};
use mesh::{SimulatedBridge, SimulatedMesh};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(version, about = "Run soil-node wake cycles without hardware")]
struct Args {
    /// JSON node configuration; the compiled-in defaults are used otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of wake cycles to run
    #[arg(long, default_value_t = 1)]
    cycles: usize,

    /// Raw ADC value the probe reads around
    #[arg(long, default_value_t = 520)]
    raw: u16,

    /// Amplitude of the probe's wobble, in raw counts
    #[arg(long, default_value_t = 4)]
    jitter: u16,

    /// Delay before the bridge answers, in milliseconds
    #[arg(long, default_value_t = 300)]
    bridge_after_ms: u64,

    /// Never bring the bridge up
    #[arg(long)]
    no_bridge: bool,

    /// Poll interval of the wake loop, in milliseconds
    #[arg(long, default_value_t = 1)]
    tick_ms: u64,
}

/// Station MAC of the simulated node
const NODE_MAC: [u8; 6] = [0x5c, 0xcf, 0x7f, 0x2f, 0xe1, 0x4a];

/// Node id of the simulated bridge
const BRIDGE_ID: u32 = 1;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config_text = match &args.config {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(text) => Some(text),
            Err(e) => {
                error!("Cannot read {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => None,
    };
    let parsed = config_text
        .as_deref()
        .map(|text| serde_json::from_str::<NodeConfig>(text))
        .transpose();
    let config = match parsed {
        Ok(Some(config)) => config,
        Ok(None) => NodeConfig::DEFAULT,
        Err(e) => {
            error!("Invalid config: {}", e);
            std::process::exit(1);
        }
    };

    let collector = Rc::new(RefCell::new(Collector::default()));
    let available_after = (!args.no_bridge).then(|| Duration::from_millis(args.bridge_after_ms));

    for cycle in 1..=args.cycles {
        info!("=== Wake cycle {} ===", cycle);
        run_cycle(&args, &config, available_after, collector.clone());
    }

    let collector = collector.borrow();
    info!(
        "Collector saw {} message(s) from {} device(s)",
        collector.messages.len(),
        collector.devices.len()
    );
    for (id, state_topic) in &collector.devices {
        match collector.latest_moisture(state_topic) {
            Some(moisture) => info!("  {}: {}%", id, moisture),
            None => info!("  {}: no state yet", id),
        }
    }
}

// ---------------------------------------------------------------------------
// Wake cycle
// ---------------------------------------------------------------------------

fn run_cycle(
    args: &Args,
    config: &NodeConfig<'_>,
    available_after: Option<Duration>,
    collector: Rc<RefCell<Collector>>,
) {
    let bridge = SimulatedBridge {
        id: BRIDGE_ID,
        mesh: config.mesh.prefix.to_owned(),
        available_after,
        collector,
    };
    let transport = SimulatedMesh::new(NODE_MAC, bridge);
    let sampler = MoistureSampler::new(
        SimulatedRail::default(),
        SimulatedProbe::new(args.raw, args.jitter),
        StdDelay,
        config.sensor,
    );

    let mut controller =
        LifecycleController::boot(transport, sampler, SystemClock, SimulatedPower::new(), config);

    let tick = StdDuration::from_millis(args.tick_ms);
    let report = controller.run_until_sleep(|| std::thread::sleep(tick));

    info!(
        "Cycle ended: {:?} after {} ms ({} sent, {} failed)",
        report.reason,
        report.awake.as_millis(),
        report.messages_sent,
        report.send_failures
    );
}
