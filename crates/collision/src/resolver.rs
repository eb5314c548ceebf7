use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;
use labyrinth_common::Aabb;
use labyrinth_ecs::{Collidable, EntityRef, EntityRegistry};
use labyrinth_kernel::{Dependencies, Subsystem, SubsystemError};

/// Stand-in planar separation used to normalize the push direction when the
/// entity centre sits exactly on (or inside) a collider.
pub const SEPARATION_EPSILON: f32 = 1e-4;

/// Push `body` out of each collider in `colliders`, in order.
///
/// Returns the total correction applied to the body's position. Only X and
/// Z are ever modified.
pub fn resolve_against(colliders: &[Aabb], body: &mut dyn Collidable) -> Vec3 {
    let radius = body.radius();
    let start = body.position();
    let mut position = start;

    for collider in colliders {
        let closest = collider.closest_point(position);
        let dx = position.x - closest.x;
        let dz = position.z - closest.z;
        let dist_sq = dx * dx + dz * dz;
        if dist_sq >= radius * radius {
            continue;
        }
        let dist = dist_sq.sqrt();
        let dist = if dist > 0.0 { dist } else { SEPARATION_EPSILON };
        let push = radius - dist;
        position.x += dx / dist * push;
        position.z += dz / dist * push;
    }

    if position != start {
        body.set_position(position);
    }
    position - start
}

/// Resolves overlap between collidable entities and the active collider set.
///
/// The collider set comes wholesale from the world via
/// [`set_world`](Self::set_world). Entities come from the
/// [`EntityRegistry`], which is either attached up front or picked up from
/// the declared dependencies at init.
#[derive(Debug, Default)]
pub struct CollisionResolver {
    colliders: Option<Rc<[Aabb]>>,
    registry: Option<Rc<RefCell<EntityRegistry>>>,
}

impl CollisionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: Rc<RefCell<EntityRegistry>>) -> Self {
        Self {
            colliders: None,
            registry: Some(registry),
        }
    }

    /// Replace the active collider set. The previous set is dropped.
    pub fn set_world(&mut self, colliders: impl Into<Rc<[Aabb]>>) {
        let colliders = colliders.into();
        tracing::debug!(count = colliders.len(), "collision world set");
        self.colliders = Some(colliders);
    }

    pub fn clear_world(&mut self) {
        self.colliders = None;
    }

    pub fn has_world(&self) -> bool {
        self.colliders.is_some()
    }

    pub fn colliders(&self) -> &[Aabb] {
        self.colliders.as_deref().unwrap_or(&[])
    }

    /// Push `body` out of every active collider. Returns the applied
    /// correction, zero when there is no world or no overlap.
    pub fn resolve(&self, body: &mut dyn Collidable) -> Vec3 {
        resolve_against(self.colliders(), body)
    }

    /// Resolve one registered entity. `None` when it is disposed or has no
    /// position and radius.
    pub fn resolve_entity(&self, entity: &EntityRef) -> Option<Vec3> {
        let mut entity = entity.borrow_mut();
        if entity.is_disposed() {
            return None;
        }
        let body = entity.collidable()?;
        Some(self.resolve(body))
    }

    /// Resolve every live collidable entity in the registry. Returns how many
    /// entities were moved.
    pub fn resolve_all(&self) -> usize {
        let (Some(_), Some(registry)) = (&self.colliders, &self.registry) else {
            return 0;
        };
        let entities = registry.borrow().get_all();
        let mut moved = 0;
        for entity in &entities {
            if let Some(correction) = self.resolve_entity(entity) {
                if correction != Vec3::ZERO {
                    tracing::trace!(?correction, "entity pushed out of collider");
                    moved += 1;
                }
            }
        }
        moved
    }
}

impl Subsystem for CollisionResolver {
    fn init(&mut self, deps: &Dependencies) -> Result<(), SubsystemError> {
        if let Some(registry) = deps.find::<EntityRegistry>() {
            self.registry = Some(registry);
        }
        if self.registry.is_none() {
            return Err(SubsystemError::MissingDependency(
                "collision resolver needs an entity registry".into(),
            ));
        }
        Ok(())
    }

    fn update(&mut self, _dt: f32) {
        self.resolve_all();
    }

    fn dispose(&mut self) -> Result<(), SubsystemError> {
        self.colliders = None;
        self.registry = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use labyrinth_common::EntityId;
    use labyrinth_ecs::{Entity, Updatable, entity_ref};
    use labyrinth_kernel::{KernelError, SystemManager};
    use std::any::Any;

    struct Body {
        id: Option<EntityId>,
        position: Vec3,
        radius: f32,
        velocity: Vec3,
        disposed: bool,
    }

    impl Body {
        fn at(position: Vec3, radius: f32) -> Self {
            Self {
                id: None,
                position,
                radius,
                velocity: Vec3::ZERO,
                disposed: false,
            }
        }

        fn moving(mut self, velocity: Vec3) -> Self {
            self.velocity = velocity;
            self
        }
    }

    impl Entity for Body {
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
        fn collidable(&mut self) -> Option<&mut dyn Collidable> {
            Some(self)
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    impl Updatable for Body {
        fn update(&mut self, dt: f32) {
            self.position += self.velocity * dt;
        }
    }

    impl Collidable for Body {
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

    /// Entity with an id and nothing else.
    struct Ghost {
        id: Option<EntityId>,
    }

    impl Entity for Ghost {
        fn id(&self) -> Option<EntityId> {
            self.id
        }
        fn set_id(&mut self, id: EntityId) {
            self.id = Some(id);
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Box spanning x in [0, 2], z in [0, 2], unbounded in y.
    fn unit_wall() -> Aabb {
        Aabb::new(
            Vec3::new(0.0, f32::NEG_INFINITY, 0.0),
            Vec3::new(2.0, f32::INFINITY, 2.0),
        )
    }

    #[test]
    fn pushes_out_along_z_by_penetration_depth() {
        let mut resolver = CollisionResolver::new();
        resolver.set_world(vec![unit_wall()]);
        let mut body = Body::at(Vec3::new(1.0, 1.6, 2.25), 0.3);

        let correction = resolver.resolve(&mut body);
        assert_abs_diff_eq!(body.position.x, 1.0);
        assert_abs_diff_eq!(body.position.y, 1.6);
        assert_abs_diff_eq!(body.position.z, 2.30, epsilon = 1e-5);
        assert_abs_diff_eq!(correction.z, 0.05, epsilon = 1e-5);
    }

    #[test]
    fn pushes_diagonally_from_a_corner() {
        let mut body = Body::at(Vec3::new(2.1, 0.0, 2.1), 0.3);
        resolve_against(&[unit_wall()], &mut body);
        // Pushed along (1, 0, 1) until exactly one radius from the corner.
        let planar = Vec3::new(body.position.x - 2.0, 0.0, body.position.z - 2.0);
        assert_abs_diff_eq!(planar.length(), 0.3, epsilon = 1e-5);
        assert_abs_diff_eq!(body.position.x, body.position.z, epsilon = 1e-6);
    }

    #[test]
    fn no_overlap_leaves_position_untouched() {
        let mut body = Body::at(Vec3::new(1.0, 1.6, 2.4), 0.3);
        let correction = resolve_against(&[unit_wall()], &mut body);
        assert_eq!(correction, Vec3::ZERO);
        assert_eq!(body.position, Vec3::new(1.0, 1.6, 2.4));

        // Touching exactly at the radius is not an overlap.
        let mut touching = Body::at(Vec3::new(1.0, 0.0, 2.5), 0.5);
        assert_eq!(resolve_against(&[unit_wall()], &mut touching), Vec3::ZERO);
    }

    #[test]
    fn vertical_axis_is_ignored() {
        let wall = Aabb::new(Vec3::ZERO, Vec3::new(2.0, 5.0, 2.0));
        let mut body = Body::at(Vec3::new(1.0, 50.0, 2.1), 0.3);
        resolve_against(&[wall], &mut body);
        assert_abs_diff_eq!(body.position.z, 2.3, epsilon = 1e-5);
        assert_eq!(body.position.y, 50.0);
    }

    #[test]
    fn centre_inside_box_stays_finite() {
        let mut body = Body::at(Vec3::new(1.0, 1.0, 1.0), 0.3);
        let correction = resolve_against(&[unit_wall()], &mut body);
        assert!(body.position.is_finite());
        assert_eq!(correction, Vec3::ZERO);
    }

    #[test]
    fn sub_epsilon_separation_still_pushes_full_depth() {
        let mut body = Body::at(Vec3::new(1.0, 0.0, 2.00005), 0.3);
        resolve_against(&[unit_wall()], &mut body);
        assert_abs_diff_eq!(body.position.x, 1.0);
        assert_abs_diff_eq!(body.position.z, 2.3, epsilon = 1e-5);
    }

    #[test]
    fn multi_collider_result_depends_on_order() {
        let a = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Vec3::new(1.2, 0.0, 0.0), Vec3::new(2.2, 1.0, 1.0));
        let start = Vec3::new(1.1, 0.5, 1.1);

        let mut ab = Body::at(start, 0.3);
        resolve_against(&[a, b], &mut ab);
        let mut ba = Body::at(start, 0.3);
        resolve_against(&[b, a], &mut ba);

        assert_abs_diff_eq!(ab.position.z, 1.3, epsilon = 1e-4);
        assert_abs_diff_eq!(ba.position.z, 1.3, epsilon = 1e-4);
        assert!((ab.position.x - ba.position.x).abs() > 0.1);
    }

    #[test]
    fn set_world_replaces_wholesale() {
        let mut resolver = CollisionResolver::new();
        assert!(!resolver.has_world());
        resolver.set_world(vec![unit_wall(), unit_wall()]);
        assert_eq!(resolver.colliders().len(), 2);
        resolver.set_world(Vec::<Aabb>::new());
        assert!(resolver.has_world());
        assert!(resolver.colliders().is_empty());
        resolver.clear_world();
        assert!(!resolver.has_world());
    }

    #[test]
    fn resolve_entity_skips_incapable_and_disposed() {
        let mut resolver = CollisionResolver::new();
        resolver.set_world(vec![unit_wall()]);

        let ghost = entity_ref(Ghost { id: None });
        assert!(resolver.resolve_entity(&ghost).is_none());

        let mut dead = Body::at(Vec3::new(1.0, 0.0, 2.1), 0.3);
        dead.disposed = true;
        let dead = Rc::new(RefCell::new(dead));
        let dead_ref: EntityRef = dead.clone();
        assert!(resolver.resolve_entity(&dead_ref).is_none());
        assert_eq!(dead.borrow().position.z, 2.1);
    }

    #[test]
    fn resolve_all_walks_the_registry() {
        let registry = Rc::new(RefCell::new(EntityRegistry::new()));
        let near = Rc::new(RefCell::new(Body::at(Vec3::new(1.0, 0.0, 2.1), 0.3)));
        let far = Rc::new(RefCell::new(Body::at(Vec3::new(9.0, 0.0, 9.0), 0.3)));
        {
            let mut reg = registry.borrow_mut();
            reg.register(near.clone(), "Body").unwrap();
            reg.register(far.clone(), "Body").unwrap();
            reg.register(entity_ref(Ghost { id: None }), "Ghost").unwrap();
        }

        let mut resolver = CollisionResolver::with_registry(registry);
        assert_eq!(resolver.resolve_all(), 0, "no world yet");
        resolver.set_world(vec![unit_wall()]);
        assert_eq!(resolver.resolve_all(), 1);
        assert_abs_diff_eq!(near.borrow().position.z, 2.3, epsilon = 1e-5);
        assert_eq!(far.borrow().position, Vec3::new(9.0, 0.0, 9.0));
    }

    /// Hands the level's colliders to the resolver during bring-up.
    struct Level {
        walls: Vec<Aabb>,
    }

    impl Subsystem for Level {
        fn init(&mut self, deps: &Dependencies) -> Result<(), SubsystemError> {
            let resolver = deps
                .get_as::<CollisionResolver>("collision")
                .ok_or_else(|| SubsystemError::MissingDependency("collision".into()))?;
            resolver.borrow_mut().set_world(self.walls.clone());
            Ok(())
        }
    }

    #[test]
    fn orchestrated_frame_keeps_walker_out_of_the_wall() {
        let registry = Rc::new(RefCell::new(EntityRegistry::new()));
        let walker = Rc::new(RefCell::new(
            Body::at(Vec3::new(0.0, 1.6, 0.0), 0.3).moving(Vec3::new(0.0, 0.0, 3.0)),
        ));
        registry
            .borrow_mut()
            .register(walker.clone(), "Player")
            .unwrap();

        let wall = Aabb::new(Vec3::new(-10.0, 0.0, 2.0), Vec3::new(10.0, 5.0, 4.0));
        let mut mgr = SystemManager::new();
        mgr.register("level", Level { walls: vec![wall] }, &["collision"]);
        mgr.register("collision", CollisionResolver::new(), &["entities"]);
        mgr.register_shared("entities", registry.clone(), &[]);
        mgr.init().unwrap();
        assert_eq!(mgr.init_order(), ["entities", "collision", "level"]);

        for _ in 0..40 {
            mgr.update(0.05);
            assert!(walker.borrow().position.z <= 1.7 + 1e-5);
        }
        assert_abs_diff_eq!(walker.borrow().position.z, 1.7, epsilon = 1e-5);

        assert!(mgr.dispose().is_empty());
        assert!(registry.borrow().is_empty());
        let resolver = mgr.get_as::<CollisionResolver>("collision").unwrap();
        assert!(!resolver.borrow().has_world());
    }

    #[test]
    fn init_without_registry_fails() {
        let mut mgr = SystemManager::new();
        mgr.register("collision", CollisionResolver::new(), &[]);
        let err = mgr.init().unwrap_err();
        assert!(matches!(
            err,
            KernelError::InitFailed {
                source: SubsystemError::MissingDependency(_),
                ..
            }
        ));
    }
}
