mod api;
mod app;
mod game;
mod input;
mod network;
mod rendering;

use app::{App, AppConfig, WINDOW_HEIGHT, WINDOW_WIDTH};
use clap::Parser;
use log::info;
use macroquad::prelude::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Backend base URL (http or https; the WebSocket scheme follows it)
    #[arg(short = 's', long, default_value = "http://127.0.0.1:8000")]
    server: String,

    /// File holding the persisted session token
    #[arg(long, default_value = ".snake-token")]
    token_file: PathBuf,

    /// Skip drawing the background grid lines
    #[arg(long)]
    no_grid: bool,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Snake Multiplayer".to_string(),
        window_width: WINDOW_WIDTH,
        window_height: WINDOW_HEIGHT,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    // Network and HTTP futures run here; the frame loop only polls channels.
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return;
        }
    };

    info!("Starting client against {}", args.server);
    info!("Controls: arrow keys / WASD to move, Esc to leave a game");

    let config = AppConfig {
        base_url: args.server,
        token_file: args.token_file,
        draw_grid: !args.no_grid,
    };
    let mut app = App::new(config, runtime.handle().clone());

    loop {
        app.update();
        app.draw();
        next_frame().await;
    }
}
