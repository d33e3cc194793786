use clap::Parser;
use client::config::{Args, ClientConfig};
use client::input::InputManager;
use client::network::{connect_udp, Session};
use client::rendering::Renderer;
use client::sync::SyncEngine;
use log::{error, info};
use macroquad::prelude::*;
use std::time::Duration;

fn window_conf() -> Conf {
    let args = Args::parse();
    Conf {
        window_title: "Maze Escape".to_string(),
        window_width: args.width as i32,
        window_height: args.height as i32,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    if let Err(e) = run().await {
        error!("Client error: {}", e);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ClientConfig::from(Args::parse());

    info!("Starting client...");
    info!("Connecting to: {}", config.server_addr);
    if config.fake_ping_ms > 0 {
        info!("Simulating {}ms latency", config.fake_ping_ms);
    }
    info!("Controls: W/S to walk, A/D to turn, H to toggle HUD, Esc to quit");

    // Socket I/O runs here; the frame loop only sees decoded packets
    let runtime = tokio::runtime::Runtime::new()?;
    let channel = connect_udp(runtime.handle(), &config.server_addr, config.fake_ping_ms)?;

    let engine = SyncEngine::new(config.profile.clone(), config.seed);
    let mut session = Session::new(channel, engine);
    session.start()?;

    let mut renderer = Renderer::new(config.width, config.height);
    let mut input_manager = InputManager::new();

    loop {
        if is_key_pressed(KeyCode::Escape) {
            break;
        }

        session.pump(&mut renderer);

        let (input, hud_toggle) = input_manager.update();
        if hud_toggle {
            renderer.toggle_hud();
        }
        session.tick(&input, get_frame_time());

        renderer.render(session.engine(), session.status());

        next_frame().await;
    }

    session.shutdown();
    runtime.shutdown_timeout(Duration::from_millis(200));

    Ok(())
}
