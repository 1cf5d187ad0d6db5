// drive_simulation.rs
// Feeds a scripted drive into the volume engine and prints how the level moves.
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use adaptive_vol::config::CONFIG_ENV;
use adaptive_vol::logging::init_tracing;
use adaptive_vol::scenario::Scenario;
use adaptive_vol::{ControlPolicy, SystemClock, TracingObserver, VolumeConfig, VolumeEngine};

#[derive(Parser, Debug)]
#[command(name = "drive_simulation", version, about = "Replay a drive through the adaptive volume engine")]
struct Args {
    /// JSON scenario file; the built-in reference drive is used when omitted
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// JSON engine config; falls back to $ADAPTIVE_VOL_CONFIG, then defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Pause between convergence steps
    #[arg(long, default_value_t = 200)]
    step_delay_ms: u64,

    /// Pause between scenario events
    #[arg(long, default_value_t = 1000)]
    event_pause_ms: u64,

    /// Skip all pauses
    #[arg(long)]
    fast: bool,

    /// Random cabin-noise jitter (dB) added to every event
    #[arg(long, default_value_t = 0)]
    jitter: i32,

    /// Print one JSON report per event instead of the console view
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => VolumeConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => VolumeConfig::from_env()
            .with_context(|| format!("loading config from ${CONFIG_ENV}"))?,
    };

    let scenario = match &args.scenario {
        Some(path) => Scenario::load(path)
            .with_context(|| format!("loading scenario {}", path.display()))?,
        None => Scenario::default_drive(),
    };
    let scenario = scenario.with_noise_jitter(args.jitter, &mut rand::rng());

    let mut engine = VolumeEngine::with_config(config, SystemClock, TracingObserver)
        .context("building volume engine")?;

    let (step_delay, event_pause) = if args.fast {
        (Duration::ZERO, Duration::ZERO)
    } else {
        (
            Duration::from_millis(args.step_delay_ms),
            Duration::from_millis(args.event_pause_ms),
        )
    };

    info!(
        events = scenario.steps.len(),
        strategy = engine.strategy_name(),
        "starting drive simulation"
    );

    for step in &scenario.steps {
        engine.update(step.inputs);

        if !args.json {
            print_event_header(&step.name, &engine);
        }

        let steps = engine.settle_with(|e, _| {
            if !args.json {
                println!("[Volume Update] Current: {:.0}", e.current_level());
            }
            if !step_delay.is_zero() {
                sleep(step_delay);
            }
        });

        if args.json {
            let report = engine.report(step.name.clone(), steps);
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("[Final Volume Reached Target: {:.0}]", engine.current_level());
            println!("===============================\n");
        }

        if !event_pause.is_zero() {
            sleep(event_pause);
        }
    }

    info!("drive simulation finished");
    Ok(())
}

fn print_event_header(name: &str, engine: &VolumeEngine<SystemClock, TracingObserver>) {
    let ctx = engine.context();
    let yes_no = |flag: bool| if flag { "Yes" } else { "No" };

    println!("\n===============================");
    println!(" EVENT: {name}");
    println!("===============================");
    println!(
        "Speed: {} km/h | Noise: {} dB | Mode: {}",
        ctx.speed_kmh,
        ctx.cabin_noise_db,
        ctx.mode.label()
    );
    println!(
        "Reverse: {} | Horn: {} | Navigation: {} | Ducking: {}",
        yes_no(ctx.reverse_gear),
        yes_no(ctx.horn_active),
        yes_no(ctx.nav_speaking),
        yes_no(engine.is_ducking())
    );
    match ctx.policy {
        ControlPolicy::Automatic => println!("Control: Adaptive"),
        ControlPolicy::Manual => {
            println!("Control: Manual");
            println!("Manual Volume: {}", ctx.manual_level);
        }
    }
    println!(
        "Target Volume: {:.0} | Current Volume: {:.0}",
        engine.target_level(),
        engine.current_level()
    );
    println!("-------------------------------");
}
