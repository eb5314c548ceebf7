use std::any::Any;

use glam::Vec3;
use labyrinth_common::{EntityId, SimConfig};
use labyrinth_ecs::{Collidable, Disposable, Entity, Updatable};

/// Scripted walker: moves at a constant planar velocity, pinned to eye
/// height.
pub struct Player {
    id: Option<EntityId>,
    position: Vec3,
    velocity: Vec3,
    height: f32,
    radius: f32,
    disposed: bool,
}

impl Player {
    /// Spawn at `start`. `heading_deg` is measured in the X/Z plane from +Z
    /// towards +X.
    pub fn new(config: &SimConfig, start: Vec3, heading_deg: f32) -> Self {
        let heading = heading_deg.to_radians();
        let direction = Vec3::new(heading.sin(), 0.0, heading.cos());
        Self {
            id: None,
            position: start,
            velocity: direction * config.player_speed,
            height: config.player_height,
            radius: config.player_radius,
            disposed: false,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }
}

impl Entity for Player {
    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn updatable(&mut self) -> Option<&mut dyn Updatable> {
        Some(self)
    }

    fn disposable(&mut self) -> Option<&mut dyn Disposable> {
        Some(self)
    }

    fn collidable(&mut self) -> Option<&mut dyn Collidable> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Updatable for Player {
    fn update(&mut self, dt: f32) {
        self.position += self.velocity * dt;
        self.position.y = self.height;
    }
}

impl Disposable for Player {
    fn dispose(&mut self) {
        tracing::debug!(id = ?self.id, "player disposed");
        self.disposed = true;
    }
}

impl Collidable for Player {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn radius(&self) -> f32 {
        self.radius
    }
}
