//! SceneCast console front-end.
//!
//! Usage:
//!   scenecast [--fullscreen]
//!
//! Commands are read from stdin one per line; type `help` for the list.

use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use scenecast_capture_engine::{Studio, StudioDeps};
use scenecast_common::config::{scenes_file_path, AppConfig};
use scenecast_common::logging::init_logging;
use scenecast_scene_model::SceneBook;

mod console;

use console::{Console, Flow};

#[derive(Parser)]
#[command(
    name = "scenecast",
    about = "Scene-based screen, window, and camera recorder",
    version,
    author
)]
struct Cli {
    /// Start with the full-screen status display
    #[arg(long)]
    fullscreen: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load();
    init_logging(&config.logging);

    let scenes_path = scenes_file_path();
    let book = SceneBook::load_or_default(&scenes_path);
    let ui_poll = Duration::from_millis(config.preview.ui_poll_ms.max(1));
    tracing::info!(
        output = %config.output_dir.display(),
        scenes = book.scenes.len(),
        fullscreen = cli.fullscreen,
        "SceneCast starting"
    );

    let studio = Studio::new(config, book, StudioDeps::native()).with_scenes_path(scenes_path);
    let mut console = Console::new(studio, cli.fullscreen);
    console.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut tick = tokio::time::interval(ui_poll);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        let flow = tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => console.handle_line(&line),
                None => console.handle_eof(),
            },
            _ = tick.tick() => {
                console.tick();
                Flow::Continue
            }
            _ = tokio::signal::ctrl_c() => console.handle_interrupt(),
        };
        if flow == Flow::Exit {
            break;
        }
    }

    console.finish();
    Ok(())
}
