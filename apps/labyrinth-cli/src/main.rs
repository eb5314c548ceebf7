mod maze;
mod player;

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use labyrinth_collision::CollisionResolver;
use labyrinth_common::SimConfig;
use labyrinth_ecs::{Entity, EntityRegistry};
use labyrinth_kernel::{FrameClock, SystemManager};
use tracing_subscriber::EnvFilter;

use maze::{COLLISION_SYSTEM, MazeWorld};
use player::Player;

const ENTITY_SYSTEM: &str = "entities";
const WORLD_SYSTEM: &str = "world";

#[derive(Parser)]
#[command(name = "labyrinth-cli", about = "Headless frame driver for the labyrinth runtime")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print crate versions
    Info,
    /// Print the subsystem bring-up order
    Order {
        /// JSON config file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Walk a player through the maze for a number of frames
    Run {
        /// Number of frames to simulate
        #[arg(short, long, default_value = "200")]
        frames: u32,
        /// Fixed step in seconds, non-negative; clamped to the configured maximum
        #[arg(long, default_value = "0.016")]
        dt: f32,
        /// JSON config file (defaults are used when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Walking direction in degrees, from +Z towards +X
        #[arg(long, default_value = "0")]
        heading: f32,
        /// Pace frames in wall-clock time and measure dt with the frame clock
        #[arg(long)]
        realtime: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SimConfig> {
    match path {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(SimConfig::default()),
    }
}

/// Validate a requested fixed step and clamp it to `max_step`.
fn fixed_step(dt: f32, max_step: f32) -> anyhow::Result<f32> {
    if !dt.is_finite() || dt < 0.0 {
        anyhow::bail!("--dt must be a finite, non-negative number of seconds (got {dt})");
    }
    Ok(dt.min(max_step))
}

/// Register the entity registry, the collision resolver and the maze world.
fn build_systems(world: MazeWorld, registry: Rc<RefCell<EntityRegistry>>) -> SystemManager {
    let mut systems = SystemManager::new();
    systems.register(WORLD_SYSTEM, world, &[COLLISION_SYSTEM]);
    systems.register(COLLISION_SYSTEM, CollisionResolver::new(), &[ENTITY_SYSTEM]);
    systems.register_shared(ENTITY_SYSTEM, registry, &[]);
    systems
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("labyrinth-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", labyrinth_common::crate_info());
            println!("kernel: {}", labyrinth_kernel::crate_info());
            println!("ecs: {}", labyrinth_ecs::crate_info());
            println!("collision: {}", labyrinth_collision::crate_info());
        }
        Commands::Order { config } => {
            let config = load_config(config.as_ref())?;
            let registry = Rc::new(RefCell::new(EntityRegistry::new()));
            let mut systems = build_systems(MazeWorld::new(&config), registry);
            systems.init()?;
            println!("Bring-up order: {}", systems.init_order().join(" -> "));
            systems.dispose();
        }
        Commands::Run {
            frames,
            dt,
            config,
            heading,
            realtime,
        } => {
            let config = load_config(config.as_ref())?;
            let fixed_dt = fixed_step(dt, config.max_frame_step)?;
            let world = MazeWorld::new(&config);
            let walls = world.walls().len();
            let registry = Rc::new(RefCell::new(EntityRegistry::new()));
            let player = Rc::new(RefCell::new(Player::new(
                &config,
                world.start_position(),
                heading,
            )));
            let player_id = registry.borrow_mut().register(player.clone(), "Player")?;

            let mut systems = build_systems(world, registry.clone());
            systems.init()?;
            println!(
                "Run: frames={frames}, walls={walls}, player={player_id} at {}",
                player.borrow().position()
            );

            let mut clock = FrameClock::new(config.max_frame_step);
            for frame in 0..frames {
                let step = if realtime {
                    std::thread::sleep(Duration::from_secs_f32(fixed_dt));
                    clock.tick()
                } else {
                    fixed_dt
                };
                systems.update(step);
                tracing::trace!(frame, position = %player.borrow().position(), "frame");
            }

            println!(
                "Final: position={}, entities={}",
                player.borrow().position(),
                registry.borrow().count(None)
            );

            for failure in systems.dispose() {
                tracing::warn!(system = %failure.name, error = %failure.error, "dispose failed");
            }
            println!(
                "Disposed: player_disposed={}, entities={}",
                player.borrow().is_disposed(),
                registry.borrow().count(None)
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn systems_come_up_dependencies_first() {
        let config = SimConfig::default();
        let registry = Rc::new(RefCell::new(EntityRegistry::new()));
        let mut systems = build_systems(MazeWorld::new(&config), registry);
        systems.init().unwrap();
        assert_eq!(systems.init_order(), [ENTITY_SYSTEM, COLLISION_SYSTEM, WORLD_SYSTEM]);
        assert!(systems.dispose().is_empty());
    }

    #[test]
    fn player_stops_at_the_far_wall() {
        let config = SimConfig::default();
        let world = MazeWorld::new(&config);
        let registry = Rc::new(RefCell::new(EntityRegistry::new()));
        let player = Rc::new(RefCell::new(Player::new(&config, world.start_position(), 0.0)));
        registry
            .borrow_mut()
            .register(player.clone(), "Player")
            .unwrap();

        let mut systems = build_systems(world, registry.clone());
        systems.init().unwrap();
        for _ in 0..400 {
            systems.update(0.016);
        }

        // Column x = 1 is open from z = 1 to z = 5; row 6 is wall, its
        // near face at z = 11.
        let position = player.borrow().position();
        assert_abs_diff_eq!(position.x, 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(position.z, 11.0 - config.player_radius, epsilon = 1e-3);
        assert_eq!(position.y, config.player_height);

        systems.dispose();
        assert!(player.borrow().is_disposed());
        assert_eq!(registry.borrow().count(None), 0);
    }

    #[test]
    fn fixed_step_rejects_negative_and_non_finite() {
        assert!(fixed_step(-0.5, 0.05).is_err());
        assert!(fixed_step(f32::NAN, 0.05).is_err());
        assert!(fixed_step(f32::INFINITY, 0.05).is_err());
    }

    #[test]
    fn fixed_step_clamps_to_the_maximum() {
        assert_eq!(fixed_step(0.016, 0.05).unwrap(), 0.016);
        assert_eq!(fixed_step(0.2, 0.05).unwrap(), 0.05);
        assert_eq!(fixed_step(0.0, 0.05).unwrap(), 0.0);
    }
}
