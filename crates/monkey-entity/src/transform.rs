use glam::{Mat4, Vec2, Vec3};
use monkey_core::to_pixels;

/// 2D placement of an entity in pixel space.
///
/// `model` is the matrix uploaded for the entity's sprite. `depth` is the z
/// translation used for draw ordering (larger is closer to the camera).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2D {
    pub model: Mat4,
    pub angle: f32,
    pub depth: f32,
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            model: Mat4::IDENTITY,
            angle: 0.0,
            depth: 0.0,
        }
    }
}

impl Transform2D {
    /// Create a transform at a pixel position.
    pub fn at_pixels(pos: Vec2, depth: f32) -> Self {
        Self {
            model: Mat4::from_translation(pos.extend(depth)),
            angle: 0.0,
            depth,
        }
    }

    /// Move the model along z by the change in depth.
    pub fn set_depth(&mut self, depth: f32) {
        self.model = Mat4::from_translation(Vec3::new(0.0, 0.0, depth - self.depth)) * self.model;
        self.depth = depth;
    }

    /// Rebuild the model from a physics pose given in meters.
    pub fn set_from_physics(&mut self, pos_m: Vec2, angle: f32) {
        self.angle = angle;
        self.model =
            Mat4::from_translation(to_pixels(pos_m).extend(self.depth)) * Mat4::from_rotation_z(angle);
    }

    /// Translation in pixels.
    pub fn position(&self) -> Vec2 {
        self.model.w_axis.truncate().truncate()
    }

    /// Translation-only matrix, without the rotation.
    pub fn translation_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.model.w_axis.truncate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn physics_pose_to_pixels() {
        let mut t = Transform2D::default();
        t.set_depth(0.12);
        t.set_from_physics(Vec2::new(2.0, 0.5), FRAC_PI_2);

        assert_relative_eq!(t.position().x, 64.0);
        assert_relative_eq!(t.position().y, 16.0);
        assert_relative_eq!(t.model.w_axis.z, 0.12);

        // Rotation maps local +x onto +y
        let corner = t.model.transform_point3(Vec3::X);
        assert_relative_eq!(corner.x, 64.0, epsilon = 1e-4);
        assert_relative_eq!(corner.y, 17.0, epsilon = 1e-4);
    }

    #[test]
    fn depth_changes_are_relative() {
        let mut t = Transform2D::at_pixels(Vec2::new(10.0, 20.0), 0.0);
        t.set_depth(0.5);
        t.set_depth(0.2);
        assert_relative_eq!(t.model.w_axis.z, 0.2);
        assert_relative_eq!(t.depth, 0.2);
        assert_eq!(t.position(), Vec2::new(10.0, 20.0));
    }

    #[test]
    fn translation_matrix_drops_rotation() {
        let mut t = Transform2D::default();
        t.set_from_physics(Vec2::new(1.0, 1.0), 1.0);
        let m = t.translation_matrix();
        assert_eq!(m.x_axis, Mat4::IDENTITY.x_axis);
        assert_relative_eq!(m.w_axis.x, 32.0);
    }
}
