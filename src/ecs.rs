//! Components and systems for the entity scene.
//!
//! Entities live in a `hecs::World`. There is no dynamic event table:
//! the app loop calls [`apply_motion`] and [`propagate_world_matrices`]
//! once per frame in a fixed order, and anything that needs an entity finds
//! it by [`Name`] at composition time.

use glam::{Mat4, Quat, Vec3};
use hecs::{Entity, World};

use crate::mesh::Mesh;

/// Name used for scene lookups (camera targets, authored nodes).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// Local transform: position, rotation, scale.
#[derive(Clone, Copy, Debug)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

/// World-space matrix, refreshed each frame from [`Transform`].
#[derive(Clone, Copy, Debug)]
pub struct WorldMatrix(pub Mat4);

impl WorldMatrix {
    pub fn translation(&self) -> Vec3 {
        self.0.w_axis.truncate()
    }
}

/// Type-safe handle to a mesh in the [`MeshRegistry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

/// Owns every uploaded mesh; entities refer to meshes by [`MeshId`].
pub struct MeshRegistry {
    meshes: Vec<Mesh>,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self { meshes: Vec::new() }
    }

    pub fn add(&mut self, mesh: Mesh) -> MeshId {
        let id = MeshId(self.meshes.len());
        self.meshes.push(mesh);
        id
    }

    pub fn get(&self, id: MeshId) -> &Mesh {
        &self.meshes[id.0]
    }
}

impl Default for MeshRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Component for rendering a mesh into the G-buffer.
#[derive(Clone, Copy, Debug)]
pub struct RenderMesh {
    pub mesh: MeshId,
    /// Base color, linear RGBA.
    pub albedo: [f32; 4],
    /// Emissive color; feeds bloom through the bright pass.
    pub emissive: [f32; 4],
    /// Surface roughness, 0 = mirror.
    pub roughness: f32,
}

impl RenderMesh {
    pub fn new(mesh: MeshId, albedo: [f32; 4]) -> Self {
        Self {
            mesh,
            albedo,
            emissive: [0.0; 4],
            roughness: 0.6,
        }
    }

    pub fn emissive(mut self, emissive: [f32; 4]) -> Self {
        self.emissive = emissive;
        self
    }

    pub fn roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness;
        self
    }
}

/// Continuous rotation around an axis.
#[derive(Clone, Copy, Debug)]
pub struct Spin {
    pub axis: Vec3,
    pub speed: f32,
}

/// Vertical sine-wave drift.
#[derive(Clone, Copy, Debug)]
pub struct Bob {
    pub origin: f32,
    pub amplitude: f32,
    pub speed: f32,
    pub phase: f32,
}

/// Advances animated transforms to `time`.
pub fn apply_motion(world: &mut World, time: f32) {
    for (_, (transform, spin)) in world.query_mut::<(&mut Transform, &Spin)>() {
        transform.rotation = Quat::from_axis_angle(spin.axis.normalize(), time * spin.speed);
    }
    for (_, (transform, bob)) in world.query_mut::<(&mut Transform, &Bob)>() {
        transform.position.y = bob.origin + (time * bob.speed + bob.phase).sin() * bob.amplitude;
    }
}

/// Refreshes every entity's [`WorldMatrix`] from its [`Transform`].
pub fn propagate_world_matrices(world: &mut World) {
    for (_, (transform, world_matrix)) in world.query_mut::<(&Transform, &mut WorldMatrix)>() {
        world_matrix.0 = transform.matrix();
    }
}

/// Finds the first entity with the given name.
pub fn find_by_name(world: &World, name: &str) -> Option<Entity> {
    world
        .query::<&Name>()
        .iter()
        .find(|(_, n)| n.0 == name)
        .map(|(entity, _)| entity)
}

/// World-space position of an entity, if it has a [`WorldMatrix`].
pub fn world_position(world: &World, entity: Entity) -> Option<Vec3> {
    world
        .get::<&WorldMatrix>(entity)
        .ok()
        .map(|m| m.translation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_matrix_carries_translation() {
        let transform = Transform::new().position(Vec3::new(1.0, 2.0, 3.0));
        let world = WorldMatrix(transform.matrix());
        assert_eq!(world.translation(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn find_by_name_matches_exactly() {
        let mut world = World::new();
        let floor = world.spawn((Name::new("Floor"), Transform::new()));
        world.spawn((Name::new("FloorLamp"), Transform::new()));

        assert_eq!(find_by_name(&world, "Floor"), Some(floor));
        assert_eq!(find_by_name(&world, "Ceiling"), None);
    }

    #[test]
    fn propagation_updates_world_position() {
        let mut world = World::new();
        let entity = world.spawn((
            Transform::new().position(Vec3::new(0.0, 5.0, 0.0)),
            WorldMatrix(Mat4::IDENTITY),
        ));

        propagate_world_matrices(&mut world);
        assert_eq!(
            world_position(&world, entity),
            Some(Vec3::new(0.0, 5.0, 0.0))
        );
    }

    #[test]
    fn spin_rotates_over_time() {
        let mut world = World::new();
        let entity = world.spawn((
            Transform::new(),
            Spin {
                axis: Vec3::Y,
                speed: 1.0,
            },
        ));

        apply_motion(&mut world, 1.0);
        let rotation = world.get::<&Transform>(entity).unwrap().rotation;
        assert!(rotation.angle_between(Quat::IDENTITY) > 0.5);
    }

    #[test]
    fn bob_drifts_vertically() {
        let mut world = World::new();
        let entity = world.spawn((
            Transform::new(),
            Bob {
                origin: 2.0,
                amplitude: 0.5,
                speed: 1.0,
                phase: 0.0,
            },
        ));

        apply_motion(&mut world, std::f32::consts::FRAC_PI_2);
        let y = world.get::<&Transform>(entity).unwrap().position.y;
        assert!((y - 2.5).abs() < 1e-4);
    }
}
