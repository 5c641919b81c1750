use glam::{Mat4, Quat, Vec2, Vec3};

use crate::geometry::Aabb;
use crate::options::CameraOptions;

/// Distance used when there is nothing to frame.
const DEFAULT_DISTANCE: f32 = 50.0;
/// Extra room around the framed bounding sphere.
const FIT_PADDING: f32 = 1.25;

/// Perspective camera defined by eye position, target, and projection
/// parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Eye (camera) position in world space.
    pub eye: Vec3,
    /// Look-at target position.
    pub target: Vec3,
    /// Up direction vector.
    pub up: Vec3,
    /// Viewport aspect ratio (width / height).
    pub aspect: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    /// Near clipping plane distance.
    pub znear: f32,
    /// Far clipping plane distance.
    pub zfar: f32,
}

impl Camera {
    /// Combined view-projection matrix (wgpu `[0, 1]` depth range).
    #[must_use]
    pub fn build_matrix(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target, self.up);
        let proj = Mat4::perspective_rh(
            self.fovy.to_radians(),
            self.aspect,
            self.znear,
            self.zfar,
        );
        proj * view
    }
}

/// Orbit camera: rotates around a focus point, pans in the view plane, and
/// zooms along the view direction.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    orientation: Quat,
    distance: f32,
    focus: Vec3,
    framed_radius: f32,
    viewport_height: f32,
    options: CameraOptions,
    /// Derived camera, kept in sync after every change.
    pub camera: Camera,
}

impl OrbitCamera {
    /// Camera in the default view for a `width` × `height` viewport.
    #[must_use]
    pub fn new(options: &CameraOptions, width: u32, height: u32) -> Self {
        let mut orbit = Self {
            orientation: Quat::IDENTITY,
            distance: DEFAULT_DISTANCE,
            focus: Vec3::ZERO,
            framed_radius: DEFAULT_DISTANCE * 0.5,
            viewport_height: height.max(1) as f32,
            options: options.clone(),
            camera: Camera {
                eye: Vec3::new(0.0, 0.0, DEFAULT_DISTANCE),
                target: Vec3::ZERO,
                up: Vec3::Y,
                aspect: width.max(1) as f32 / height.max(1) as f32,
                fovy: options.fovy,
                znear: options.znear,
                zfar: options.zfar,
            },
        };
        orbit.update_camera_pos();
        orbit
    }

    fn update_camera_pos(&mut self) {
        let dir = self.orientation * Vec3::Z;
        self.camera.eye = self.focus + dir * self.distance;
        self.camera.target = self.focus;
        self.camera.up = self.orientation * Vec3::Y;
        let near = (self.distance - self.framed_radius * 2.0).max(self.options.znear);
        self.camera.znear = near.max(f32::EPSILON);
        self.camera.zfar = self.distance + self.framed_radius * 2.0 + self.options.zfar;
    }

    /// Combined view-projection matrix.
    #[must_use]
    pub fn view_proj(&self) -> Mat4 {
        self.camera.build_matrix()
    }

    /// Focus point the camera orbits around.
    #[must_use]
    pub fn focus(&self) -> Vec3 {
        self.focus
    }

    /// Distance from the eye to the focus point.
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// World-space right vector of the view.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    /// World-space up vector of the view.
    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    /// Unit direction the camera looks along.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        -(self.orientation * Vec3::Z)
    }

    /// Update the aspect ratio and pixel scale after a window resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera.aspect = width as f32 / height as f32;
        self.viewport_height = height as f32;
    }

    /// Size of one screen pixel at the focus depth, in world units.
    #[must_use]
    pub fn world_units_per_pixel(&self) -> f32 {
        let half_fovy = self.camera.fovy.to_radians() * 0.5;
        2.0 * self.distance * half_fovy.tan() / self.viewport_height
    }

    /// World-space displacement in the view plane for a screen-space drag
    /// (pixels, y down).
    #[must_use]
    pub fn screen_to_world(&self, delta: Vec2) -> Vec3 {
        let scale = self.world_units_per_pixel();
        self.right() * (delta.x * scale) - self.up() * (delta.y * scale)
    }

    /// Rotation matching a screen-space drag, in world space.
    #[must_use]
    pub fn drag_rotation(&self, delta: Vec2) -> Quat {
        let speed = self.options.rotate_speed.to_radians();
        let horizontal = Quat::from_axis_angle(self.up(), delta.x * speed);
        let vertical = Quat::from_axis_angle(self.right(), delta.y * speed);
        (vertical * horizontal).normalize()
    }

    /// Orbit around the focus point by a screen-space drag in pixels.
    pub fn rotate(&mut self, delta: Vec2) {
        // The scene follows the cursor, so the camera moves the other way.
        self.orientation = (self.drag_rotation(delta).inverse() * self.orientation).normalize();
        self.update_camera_pos();
    }

    /// Move the focus point in the view plane by a screen-space drag.
    pub fn pan(&mut self, delta: Vec2) {
        self.focus -= self.screen_to_world(delta) * self.options.pan_speed;
        self.update_camera_pos();
    }

    /// Zoom by `lines` scroll lines; positive moves closer.
    pub fn zoom(&mut self, lines: f32) {
        let factor = (1.0 - lines * self.options.zoom_speed).clamp(0.1, 10.0);
        let max = (self.framed_radius * 20.0).max(DEFAULT_DISTANCE * 20.0);
        self.distance = (self.distance * factor).clamp(0.5, max);
        self.update_camera_pos();
    }

    /// Frame `bounds` keeping the current orientation; `None` restores the
    /// default view.
    pub fn fit_to_bounds(&mut self, bounds: Option<Aabb>) {
        match bounds {
            Some(bounds) => {
                let radius = bounds.radius().max(1.0);
                let half_fovy = self.camera.fovy.to_radians() * 0.5;
                let half_fovx = (half_fovy.tan() * self.camera.aspect.min(1.0)).atan();
                self.focus = bounds.center();
                self.framed_radius = radius;
                self.distance = radius / half_fovy.min(half_fovx).sin() * FIT_PADDING;
            }
            None => {
                self.orientation = Quat::IDENTITY;
                self.focus = Vec3::ZERO;
                self.framed_radius = DEFAULT_DISTANCE * 0.5;
                self.distance = DEFAULT_DISTANCE;
            }
        }
        self.update_camera_pos();
    }
}
