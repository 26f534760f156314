use anyhow::Context;
use clap::Parser;
use pixeldrive::audio::SharedAudioFeatures;
use pixeldrive::engine;
use pixeldrive::store::load_engine_state;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pixeldrive", about = "LED pixel pipeline daemon", version)]
struct Args {
    /// Path to the JSON state file (devices, virtuals, scenes).
    #[arg(short, long, default_value = "pixeldrive.json")]
    state: PathBuf,

    /// Override the stored target frame rate.
    #[arg(long)]
    fps: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut state = load_engine_state(&args.state)
        .with_context(|| format!("loading state from {}", args.state.display()))?;
    if let Some(fps) = args.fps {
        state.target_fps = fps.max(1);
    }

    // The audio capture stage lives outside this crate; until one is
    // attached the shared snapshot stays silent and effects render
    // their idle state.
    let audio = SharedAudioFeatures::default();

    let (handle, events, scheduler) = engine::spawn(state, Some(args.state.clone()), audio);

    thread::spawn(move || {
        for event in events {
            info!(?event, "pipeline event");
        }
    });

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("installing signal handler")?;

    stop_rx.recv().ok();
    info!("shutting down");
    handle.shutdown().ok();
    scheduler.join().ok();
    Ok(())
}
