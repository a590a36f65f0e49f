use clap::Parser;
use log::info;
use server::network::Server;
use server::session::SessionState;
use shared::{PersistenceConfig, TileGrid, WorldSave};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Tick rate (updates per second)
    #[arg(short, long, default_value = "60")]
    tick_rate: u32,

    /// Maximum number of connected clients
    #[arg(short, long, default_value = "16")]
    max_clients: usize,

    /// World save file; created with a flat world if it does not exist
    #[arg(short, long, default_value = "world.json")]
    world: PathBuf,

    /// Persistence settings (JSON); defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Width in tiles of a newly created world
    #[arg(long, default_value = "400")]
    world_width: i32,

    /// Height in tiles of a newly created world
    #[arg(long, default_value = "200")]
    world_height: i32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = PersistenceConfig::load_or_default(args.config.as_deref())?;

    let world = match WorldSave::load(&args.world)? {
        Some(world) => world,
        None => {
            info!(
                "No world at {}, creating a {}x{} flat world",
                args.world.display(),
                args.world_width,
                args.world_height
            );
            WorldSave {
                world_name: "World".to_string(),
                grid: TileGrid::flat_world(args.world_width, args.world_height),
                exit_positions: Default::default(),
            }
        }
    };

    info!("Session persistence: {}", config.enable_session);

    let session = SessionState::new(world, &config);
    let address = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f32(1.0 / args.tick_rate.max(1) as f32);

    let mut server = Server::new(
        &address,
        tick_duration,
        args.max_clients,
        session,
        args.world,
    )
    .await?;

    server.run().await?;

    Ok(())
}
