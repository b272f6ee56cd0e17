use clap::Parser;
use log::{error, info};
use server::{run_game_loop, Game, MainThreadQueue, Responder, Server, ServerConfig};
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// JSON scene config file
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Server IP address to bind to
    #[clap(short = 'H', long)]
    host: Option<String>,
    /// Server port to listen on
    #[clap(short, long)]
    port: Option<u16>,
    /// Tick rate (updates per second)
    #[clap(short, long)]
    tick_rate: Option<u32>,
    /// Fragments to collect before the puzzle unlocks
    #[clap(short, long)]
    fragments: Option<usize>,
    /// Seed for avatar selection
    #[clap(long)]
    seed: Option<u64>,
    /// Refuse every auto-tracking request
    #[clap(long)]
    no_auto_navigation: bool,
    /// Start with time of day following the local clock
    #[clap(long)]
    realtime_weather: bool,
}

impl Args {
    /// Loads the config file, if any, and applies command line overrides.
    fn into_config(self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(tick_rate) = self.tick_rate {
            config.tick_rate = tick_rate;
        }
        if let Some(fragments) = self.fragments {
            config.fragment_count = fragments;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.no_auto_navigation {
            config.navigation.enabled = false;
        }
        if self.realtime_weather {
            config.realtime_weather.enabled = true;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parses command-line arguments, then runs the network server and the game loop.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Args::parse().into_config()?;

    let responder = Responder::new();
    let queue = MainThreadQueue::<Game>::new();
    let server = Server::bind(&config.bind_addr(), responder.clone(), queue.sender()).await?;
    let game = Game::new(config, responder);

    let server_handle = tokio::spawn(server.run());
    let game_handle = tokio::spawn(run_game_loop(game, queue));

    // Handle shutdown gracefully
    tokio::select! {
        result = server_handle => {
            if let Err(e) = result {
                error!("Network task panicked: {}", e);
            }
        }
        result = game_handle => {
            if let Err(e) = result {
                error!("Game loop task panicked: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
