//! MIDI State Bridge - host loop binary
//!
//! Opens a MIDI input, installs the bridge into a fixed-rate host loop and
//! logs the state a consumer would see each cycle.

use anyhow::Result;
use clap::Parser;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use midi_state_bridge::config::AppConfig;
use midi_state_bridge::drivers::hardware::discovery;
use midi_state_bridge::drivers::{Driver, MidirDriver, QueueDriverHandle, DEFAULT_BUFFER_CAPACITY};
use midi_state_bridge::host::{CycleLoop, InMemoryLayoutRegistry, PhaseScheduler, UPDATE};
use midi_state_bridge::midi::MidiMessage;
use midi_state_bridge::{
    DeviceRegistry, EventQueue, HostMode, HostNotification, HostServices, LifecycleWrangler,
    StatePoller,
};

/// MIDI State Bridge - poll MIDI controller state once per host cycle
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI input ports
    #[arg(long)]
    list_ports: bool,

    /// Feed the bridge from a generated in-memory transport instead of hardware
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting MIDI State Bridge...");

    if args.list_ports {
        discovery::print_ports();
        return Ok(());
    }

    info!("Configuration file: {}", args.config);
    let config = AppConfig::load(&args.config).await?;
    info!(
        "Configuration loaded: port '{}', {:?} host at {} Hz",
        config.midi.input_port, config.host.mode, config.host.cycle_hz
    );

    run_app(config, args.simulate, shutdown_signal()).await?;

    info!("MIDI State Bridge shutdown complete");
    Ok(())
}

async fn run_app(
    config: AppConfig,
    simulate: bool,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let host = Arc::new(CycleLoop::standard());
    let devices = Arc::new(DeviceRegistry::new());
    let (queue, events) = EventQueue::new();

    let services = HostServices {
        layouts: Arc::new(InMemoryLayoutRegistry::new()),
        scheduler: host.clone(),
        devices: devices.clone(),
        sink: Arc::new(queue),
    };

    let filter = config.midi.channel_filter();
    let mut wrangler = if simulate {
        let feed = QueueDriverHandle::new(DEFAULT_BUFFER_CAPACITY);
        spawn_simulated_keyboard(feed.clone());
        LifecycleWrangler::new(
            config.host.mode,
            services,
            move || -> midi_state_bridge::Result<Box<dyn Driver>> {
                Ok(Box::new(feed.driver_with_filter(filter)))
            },
        )
    } else {
        let pattern = config.midi.input_port.clone();
        LifecycleWrangler::new(
            config.host.mode,
            services,
            move || -> midi_state_bridge::Result<Box<dyn Driver>> {
                Ok(Box::new(MidirDriver::connect(&pattern, filter)?))
            },
        )
    };

    // Consumer runs after the bridge has been pumped in EarlyUpdate
    let poller = Mutex::new(StatePoller::new(events));
    host.insert_hook(
        UPDATE,
        Arc::new(move || {
            let mut poller = poller.lock();
            let summary = poller.poll();
            for &(channel, value) in poller.edges() {
                if value > 0 {
                    info!("note{} pressed ({})", channel, value);
                } else {
                    info!("note{} released", channel);
                }
            }
            if summary.snapshots > 0 {
                let active: Vec<String> = poller
                    .state()
                    .controls
                    .iter()
                    .enumerate()
                    .filter(|(_, &v)| v > 0)
                    .map(|(c, v)| format!("control{:03}={}", c, v))
                    .collect();
                debug!("Controls: {}", active.join(" "));
            }
        }),
    );

    wrangler.notify(HostNotification::Startup)?;
    if config.host.mode == HostMode::Editor {
        wrangler.notify(HostNotification::EnterActiveMode)?;
    }
    if let Some(bridge) = wrangler.active_bridge() {
        wrangler.notify(HostNotification::DeviceSelected(bridge.id()))?;
    }

    info!("Starting host loop...");
    let mut ticker = tokio::time::interval(Duration::from_secs_f64(
        1.0 / f64::from(config.host.cycle_hz),
    ));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = ticker.tick() => host.run_cycle(),
            _ = &mut shutdown => break,
        }
    }

    if config.host.mode == HostMode::Editor {
        wrangler.notify(HostNotification::ExitActiveMode)?;
    }
    wrangler.notify(HostNotification::Shutdown)?;
    info!("Ran {} host cycles", host.cycle_count());

    Ok(())
}

/// Play a slow arpeggio with a sweeping mod wheel into `feed`
fn spawn_simulated_keyboard(feed: QueueDriverHandle) {
    tokio::spawn(async move {
        const NOTES: [u8; 4] = [60, 64, 67, 72];
        let mut step: usize = 0;
        let mut ticker = tokio::time::interval(Duration::from_millis(250));

        loop {
            ticker.tick().await;
            let note = NOTES[step % NOTES.len()];
            let previous = NOTES[(step + NOTES.len() - 1) % NOTES.len()];

            feed.send(MidiMessage::NoteOff {
                channel: 0,
                note: previous,
            });
            feed.send(MidiMessage::NoteOn {
                channel: 0,
                note,
                velocity: 100,
            });
            feed.send(MidiMessage::ControlChange {
                channel: 0,
                cc: 1,
                value: ((step * 8) % 128) as u8,
            });

            step = step.wrapping_add(1);
        }
    });
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        // Keep the host loop running; the process is stopped externally
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
