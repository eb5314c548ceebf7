use glam::Vec3;
use labyrinth_collision::CollisionResolver;
use labyrinth_common::{Aabb, SimConfig};
use labyrinth_kernel::{Dependencies, Subsystem, SubsystemError};

/// Name the resolver must be registered under for [`MazeWorld`] to find it.
pub const COLLISION_SYSTEM: &str = "collision";

/// One wall box per `1` cell. Cell `(x, z)` is centred at
/// `(x * t, h / 2, z * t)` with size `(t, h, t)`.
pub fn build_walls(config: &SimConfig) -> Vec<Aabb> {
    let t = config.wall_thickness;
    let h = config.wall_height;
    config
        .grid
        .iter()
        .enumerate()
        .flat_map(|(z, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, cell)| **cell == 1)
                .map(move |(x, _)| {
                    Aabb::from_center_size(
                        Vec3::new(x as f32 * t, h / 2.0, z as f32 * t),
                        Vec3::new(t, h, t),
                    )
                })
        })
        .collect()
}

/// World collaborator: owns the level's colliders and hands them to the
/// collision resolver at bring-up.
pub struct MazeWorld {
    walls: Vec<Aabb>,
    start: Vec3,
}

impl MazeWorld {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            walls: build_walls(config),
            start: config.start_position,
        }
    }

    pub fn walls(&self) -> &[Aabb] {
        &self.walls
    }

    pub fn start_position(&self) -> Vec3 {
        self.start
    }
}

impl Subsystem for MazeWorld {
    fn init(&mut self, deps: &Dependencies) -> Result<(), SubsystemError> {
        let resolver = deps
            .get_as::<CollisionResolver>(COLLISION_SYSTEM)
            .ok_or_else(|| SubsystemError::MissingDependency(COLLISION_SYSTEM.into()))?;
        resolver.borrow_mut().set_world(self.walls.clone());
        tracing::info!(walls = self.walls.len(), "maze world loaded");
        Ok(())
    }
}
