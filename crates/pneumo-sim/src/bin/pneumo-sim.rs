//! Pneumostab simulation runner
//!
//! Runs the stabilizer simulation in real time and prints the latest state
//! snapshot as JSON once per second.
//!
//! Usage: `pneumo-sim [CONFIG.json] [SECONDS]`

use std::env;
use std::time::Duration;

use pneumo_sim::{Command, SimulationConfig, SimulationLoop};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pneumo_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();

    let config = match args.get(1) {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str::<SimulationConfig>(&text)?
        }
        None => SimulationConfig::default(),
    };
    let seconds: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);

    tracing::info!(road = config.road.label(), dt = config.dt, seconds, "starting simulation");

    let mut sim = SimulationLoop::spawn(config)?;
    sim.control(Command::Start)?;

    let mut report = tokio::time::interval(Duration::from_secs(1));
    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = report.tick() => {
                if let Some(snapshot) = sim.subscribe() {
                    println!("{}", serde_json::to_string(&*snapshot)?);
                    if snapshot.is_faulted() {
                        break;
                    }
                }
            }
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }

    sim.stop()?;
    Ok(())
}
