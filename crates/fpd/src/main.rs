//! fpd - Fingerprint session daemon
//!
//! Drives one fingerprint session over the simulated legacy sensor from a
//! line-oriented console on stdin. Session callbacks are printed to stdout
//! as JSON lines; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! fpd --config config/fpd.toml --user 0
//! echo -e "enroll\ntouch\ntouch\ntouch\nenumerate" | fpd
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fpd_core::SessionEvent;
use fpd_legacy::config::DeviceConfig;
use fpd_legacy::device::SimulatedSensor;
use fpd_legacy::{
    CancellationSignal, ChannelCallback, Fingerprint, HalConfig, HardwareAuthToken, Session,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod console;

use console::{Command, HELP};

#[derive(Parser, Debug)]
#[command(name = "fpd")]
#[command(about = "Fingerprint session daemon over a simulated legacy sensor")]
struct Args {
    /// Configuration file path (TOML format)
    #[arg(short, long)]
    config: Option<String>,

    /// User whose session is opened at startup
    #[arg(short, long, default_value_t = 0)]
    user: i32,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Console state: the open session and the last cancellation handle
struct Console {
    hal: Fingerprint,
    sensor: Arc<SimulatedSensor>,
    session: Session,
    /// Dropping this tells the session its client is gone
    client_alive: Option<oneshot::Sender<()>>,
    last_signal: Option<CancellationSignal>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl Console {
    fn open(
        hal: Fingerprint,
        sensor: Arc<SimulatedSensor>,
        user_id: i32,
        events_tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<Self> {
        let (session, client_alive) = open_session(&hal, user_id, &events_tx)?;
        Ok(Self {
            hal,
            sensor,
            session,
            client_alive: Some(client_alive),
            last_signal: None,
            events_tx,
        })
    }

    /// Run one command; returns false when the console should exit
    fn execute(&mut self, command: Command) -> Result<bool> {
        let session = &self.session;
        match command {
            Command::Challenge => session.generate_challenge(),
            Command::Revoke(challenge) => session.revoke_challenge(challenge),
            Command::Enroll => {
                self.last_signal = Some(session.enroll(&HardwareAuthToken::default()));
            }
            Command::Auth(operation_id) => {
                self.last_signal = Some(session.authenticate(operation_id));
            }
            Command::Detect => self.last_signal = Some(session.detect_interaction()),
            Command::Enumerate => session.enumerate_enrollments(),
            Command::Remove(ids) => session.remove_enrollments(ids),
            Command::AuthId => session.get_authenticator_id(),
            Command::Invalidate => session.invalidate_authenticator_id(),
            Command::Reset => session.reset_lockout(&HardwareAuthToken::default()),
            Command::Cancel => session.cancel(),
            Command::Abort => match self.last_signal.take() {
                Some(signal) => signal.cancel(),
                None => warn!("No cancellable operation to abort"),
            },
            Command::Down => session.on_pointer_down(0, 0, 0, 0.0, 0.0),
            Command::Up => session.on_pointer_up(0),
            Command::Touch(fid) => {
                if !self.sensor.touch(fid) {
                    warn!("Sensor is not enrolling or authenticating, touch ignored");
                }
            }
            Command::Props => {
                println!("{}", serde_json::to_string(&self.hal.sensor_props())?);
            }
            Command::Open(user_id) => {
                let user_id = user_id.unwrap_or(session.user_id());
                let (session, client_alive) =
                    open_session(&self.hal, user_id, &self.events_tx)?;
                self.session = session;
                self.client_alive = Some(client_alive);
                self.last_signal = None;
            }
            Command::Close => session.close(),
            Command::Help => eprintln!("{HELP}"),
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }
}

fn open_session(
    hal: &Fingerprint,
    user_id: i32,
    events_tx: &mpsc::UnboundedSender<SessionEvent>,
) -> Result<(Session, oneshot::Sender<()>)> {
    let (callback, mut events) = ChannelCallback::new();
    let sensor_id = hal.config().sensor.sensor_id;
    let session = hal
        .create_session(sensor_id, user_id, Arc::new(callback))
        .context("Failed to create session")?;

    // Fan this session's events into the shared printer
    let forward = events_tx.clone();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if forward.send(event).is_err() {
                break;
            }
        }
    });

    let (client_alive, client_gone) = oneshot::channel::<()>();
    session.link_to_death(async move {
        let _ = client_gone.await;
    });

    info!(user_id, session = %session.id(), "Session opened");
    Ok((session, client_alive))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing; stdout is reserved for events
    let default_filter = if args.verbose {
        "fpd=debug,fpd_legacy=trace"
    } else {
        "fpd=info,fpd_legacy=debug"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting fpd (fingerprint session daemon)");

    let config = match &args.config {
        Some(path) => {
            info!(config = %path, "Loading configuration");
            HalConfig::load(path).with_context(|| format!("Failed to load {path}"))?
        }
        None => {
            info!("No config file provided, using defaults");
            HalConfig::default()
        }
    };

    let DeviceConfig::Simulated(sim) = &config.device;
    let sensor = Arc::new(SimulatedSensor::new(sim));
    let hal = Fingerprint::new(config, sensor.clone(), Handle::current());

    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<SessionEvent>();
    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Failed to encode event"),
            }
        }
    });

    let mut console = Console::open(hal, sensor, args.user, events_tx)?;
    eprintln!("fpd ready, type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                None
            }
        };
        let Some(line) = line else {
            break;
        };

        match console::parse(&line) {
            Ok(Some(command)) => match console.execute(command) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => warn!(error = %e, "Command failed"),
            },
            Ok(None) => {}
            Err(e) => eprintln!("{e}"),
        }
    }

    // Client gone: the death link closes the session
    drop(console.client_alive.take());
    let session = console.session.clone();
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(1);
    while !session.is_closed() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    drop(console);
    let _ = tokio::time::timeout(std::time::Duration::from_millis(200), printer).await;
    info!("fpd stopped");
    Ok(())
}
