use clap::Parser;
use client::game::LocalPlayer;
use client::network::Client;
use log::{info, warn};
use shared::{LocalExitStore, PersistenceConfig, TileGrid, WorldSave};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Avatar name; the session host keys exit positions by it
    #[arg(short = 'n', long, default_value = "Guide")]
    name: String,

    /// World save to read the tile grid from; a flat world is used if missing
    #[arg(short = 'w', long, default_value = "world.json")]
    world: PathBuf,

    /// Avatar save holding the local exit position
    #[arg(long)]
    save: Option<PathBuf>,

    /// Persistence settings (JSON); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = PersistenceConfig::load_or_default(args.config.as_deref())?;

    let grid = match WorldSave::load(&args.world) {
        Ok(Some(world)) => world.grid,
        Ok(None) => TileGrid::flat_world(400, 200),
        Err(e) => {
            warn!("Could not read world {}: {}, using a flat world", args.world.display(), e);
            TileGrid::flat_world(400, 200)
        }
    };

    let save_path = args
        .save
        .unwrap_or_else(|| PathBuf::from(format!("{}.json", args.name.to_lowercase())));
    let local_exit = LocalExitStore::open(&save_path)?;

    info!("Starting client...");
    info!("Connecting to: {} as {}", args.server, args.name);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }

    let player = LocalPlayer::new(&args.name, config, local_exit);
    let mut client = Client::new(&args.server, args.fake_ping, player, grid, Some(save_path)).await?;

    client.run().await?;

    Ok(())
}
