//! 2D orthographic camera.

use glam::{Mat4, Vec2, Vec3};
use monkey_core::constants::DEFAULT_WINDOW_SIZE;
use monkey_entity::{Attachment, Entity, World};

/// Smallest zoom the camera accepts.
const MIN_ZOOM: f32 = 0.01;

/// Position the camera returns to when detached.
pub const DEFAULT_CAMERA_POSITION: Vec3 = Vec3::new(0.0, 0.0, 0.9);

/// Orthographic camera looking down -z at the sprite plane.
///
/// When attached to an entity the view is centered on that entity's
/// transform every frame; otherwise it is centered on `position`.
#[derive(Debug, Clone)]
pub struct Camera2D {
    pub position: Vec3,
    zoom: f32,
    viewport: Vec2,
    target: Option<Attachment>,
}

impl Default for Camera2D {
    fn default() -> Self {
        Self {
            position: DEFAULT_CAMERA_POSITION,
            zoom: 1.0,
            viewport: Vec2::new(DEFAULT_WINDOW_SIZE.0 as f32, DEFAULT_WINDOW_SIZE.1 as f32),
            target: None,
        }
    }
}

impl Camera2D {
    /// Create a camera for a viewport of `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        let mut camera = Self::default();
        camera.set_viewport(width, height);
        camera
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width as f32, height as f32);
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Add to the zoom factor. A result at or below zero snaps to 0.01.
    pub fn add_zoom(&mut self, delta: f32) {
        self.zoom += delta;
        if self.zoom <= 0.0 {
            self.zoom = MIN_ZOOM;
        }
    }

    pub fn move_by(&mut self, delta: Vec2) {
        self.position += delta.extend(0.0);
    }

    /// Follow `entity` until [`detach`](Self::detach) is called.
    pub fn attach_to(&mut self, entity: Entity) {
        self.target = Some(Attachment(entity));
    }

    /// Stop following and return to the default position.
    pub fn detach(&mut self) {
        self.target = None;
        self.position = DEFAULT_CAMERA_POSITION;
    }

    pub fn target(&self) -> Option<Attachment> {
        self.target
    }

    /// Point the view is centered on this frame.
    ///
    /// Falls back to `position` if the target entity no longer exists.
    pub fn focus(&self, world: &World) -> Vec2 {
        self.target
            .and_then(|target| target.position(world))
            .unwrap_or_else(|| self.position.truncate())
    }

    /// Y-up projection; the viewport maps to `±viewport * zoom`.
    pub fn projection(&self) -> Mat4 {
        let half = self.viewport * self.zoom;
        Mat4::orthographic_rh(-half.x, half.x, half.y, -half.y, -1.0, 1.0)
    }

    pub fn view(&self, focus: Vec2) -> Mat4 {
        Mat4::from_translation((-focus).extend(0.0))
    }

    pub fn uniforms(&self, focus: Vec2) -> CameraUniforms {
        CameraUniforms {
            proj: self.projection().to_cols_array_2d(),
            view: self.view(focus).to_cols_array_2d(),
        }
    }
}

/// Camera uniform buffer data for GPU.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniforms {
    pub proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use monkey_entity::Transform2D;

    fn project(camera: &Camera2D, focus: Vec2, world: Vec3) -> Vec3 {
        (camera.projection() * camera.view(focus)).project_point3(world)
    }

    #[test]
    fn world_up_is_screen_up() {
        let camera = Camera2D::new(1440, 960);
        let ndc = project(&camera, Vec2::ZERO, Vec3::new(1440.0, 960.0, 0.0));
        assert_relative_eq!(ndc.x, 1.0, epsilon = 1e-6);
        // Vulkan NDC has y pointing down
        assert_relative_eq!(ndc.y, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn closer_sprites_have_smaller_depth() {
        let camera = Camera2D::default();
        let near = project(&camera, Vec2::ZERO, Vec3::new(0.0, 0.0, 0.5));
        let far = project(&camera, Vec2::ZERO, Vec3::new(0.0, 0.0, -0.5));
        assert!(near.z < far.z);
        assert!((0.0..=1.0).contains(&near.z) && (0.0..=1.0).contains(&far.z));
    }

    #[test]
    fn zoom_scales_and_clamps() {
        let mut camera = Camera2D::new(100, 100);
        camera.add_zoom(1.0);
        let ndc = project(&camera, Vec2::ZERO, Vec3::new(100.0, 0.0, 0.0));
        assert_relative_eq!(ndc.x, 0.5, epsilon = 1e-6);

        camera.add_zoom(-5.0);
        assert_relative_eq!(camera.zoom(), 0.01);
    }

    #[test]
    fn view_centers_on_focus() {
        let camera = Camera2D::new(100, 100);
        let ndc = project(&camera, Vec2::new(40.0, -20.0), Vec3::new(40.0, -20.0, 0.0));
        assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn follows_attached_entity() {
        let mut world = World::new();
        let player = world.spawn((Transform2D::at_pixels(Vec2::new(64.0, 32.0), 0.12),));

        let mut camera = Camera2D::default();
        camera.move_by(Vec2::new(5.0, 5.0));
        assert_eq!(camera.focus(&world), Vec2::new(5.0, 5.0));

        camera.attach_to(player);
        assert_eq!(camera.focus(&world), Vec2::new(64.0, 32.0));

        camera.detach();
        assert_eq!(camera.position, DEFAULT_CAMERA_POSITION);
        assert_eq!(camera.focus(&world), Vec2::ZERO);
    }
}
