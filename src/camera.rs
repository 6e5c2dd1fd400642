//! Projection parameters for the scene camera.

use glam::Mat4;

/// How many degrees of field-of-view are added per unit of portrait-ness.
const FOV_ASPECT_CORRECTION: f32 = 5.0;

/// Widens the base field of view on portrait aspect ratios so the framed
/// content survives narrow windows. Landscape aspects get the base fov
/// unchanged.
pub fn corrected_fov(base_fov_deg: f32, aspect: f32) -> f32 {
    base_fov_deg + (1.0 / aspect - 1.0).max(0.0) * FOV_ASPECT_CORRECTION
}

/// Camera projection state, recomputed from the display resolution.
pub struct RenderCamera {
    pub near: f32,
    pub far: f32,
    base_fov_deg: f32,
    fov_deg: f32,
    aspect: f32,
    /// World-to-view transform, written by the camera rig each frame.
    pub view: Mat4,
    /// View-to-clip transform, recomputed on resize.
    pub projection: Mat4,
}

impl RenderCamera {
    pub fn new(base_fov_deg: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            near,
            far,
            base_fov_deg,
            fov_deg: base_fov_deg,
            aspect: 1.0,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
        };
        camera.set_resolution(1, 1);
        camera
    }

    /// Recomputes aspect, corrected fov, and the projection matrix.
    pub fn set_resolution(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
        self.fov_deg = corrected_fov(self.base_fov_deg, self.aspect);
        self.projection =
            Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_deg
    }

    pub fn fov_radians(&self) -> f32 {
        self.fov_deg.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn landscape_aspect_keeps_base_fov() {
        assert_eq!(corrected_fov(50.0, 16.0 / 9.0), 50.0);
        assert_eq!(corrected_fov(50.0, 1.0), 50.0);
    }

    #[test]
    fn portrait_aspect_widens_fov() {
        let fov = corrected_fov(50.0, 0.5);
        assert!((fov - 55.0).abs() < 1e-4);
    }

    #[test]
    fn resize_updates_aspect_and_projection() {
        let mut camera = RenderCamera::new(50.0, 90.0, 200.0);
        camera.set_resolution(1920, 1080);
        assert!((camera.aspect() - 1920.0 / 1080.0).abs() < 1e-6);
        assert_eq!(camera.fov_degrees(), 50.0);

        camera.set_resolution(1080, 1920);
        assert!(camera.fov_degrees() > 50.0);
        assert!(camera.projection.is_finite());
    }
}
