use cgmath::{InnerSpace, Matrix4, Point3, Vector3};

use super::{Camera, CameraInput, Direction, projection};

pub const YAW: f32 = -90.0;
pub const PITCH: f32 = 0.0;
/// Units per second.
pub const SPEED: f32 = 0.05 * 60.0;
pub const SENSITIVITY: f32 = 0.075;
pub const ZOOM: f32 = 45.0;

/// Free-flying camera steered by yaw and pitch in degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FirstPersonCamera {
    pub position: Vector3<f32>,
    front: Vector3<f32>,
    up: Vector3<f32>,
    right: Vector3<f32>,
    world_up: Vector3<f32>,
    yaw: f32,
    pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    zoom: f32,
}

impl Default for FirstPersonCamera {
    fn default() -> Self {
        Self::new(Vector3::new(0.0, 0.0, 0.0), Vector3::unit_y(), YAW, PITCH)
    }
}

impl FirstPersonCamera {
    pub fn new(position: Vector3<f32>, world_up: Vector3<f32>, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            front: -Vector3::unit_z(),
            up: world_up,
            right: Vector3::unit_x(),
            world_up,
            yaw,
            pitch,
            movement_speed: SPEED,
            mouse_sensitivity: SENSITIVITY,
            zoom: ZOOM,
        };
        camera.update_vectors();
        camera
    }

    pub fn at(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn front(&self) -> Vector3<f32> {
        self.front
    }

    pub fn up(&self) -> Vector3<f32> {
        self.up
    }

    pub fn right(&self) -> Vector3<f32> {
        self.right
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Vertical field of view in degrees.
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn process_keyboard(&mut self, direction: Direction, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match direction {
            Direction::Forward => self.position += self.front * velocity,
            Direction::Backward => self.position -= self.front * velocity,
            Direction::Left => self.position -= self.right * velocity,
            Direction::Right => self.position += self.right * velocity,
        }
    }

    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;
        if constrain_pitch {
            self.pitch = self.pitch.clamp(-89.0, 89.0);
        }
        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(1.0, 45.0);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vector3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

impl Camera for FirstPersonCamera {
    fn view_matrix(&self) -> Matrix4<f32> {
        let eye = Point3::new(self.position.x, self.position.y, self.position.z);
        Matrix4::look_at_rh(eye, eye + self.front, self.up)
    }

    fn projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        projection(self.zoom, aspect, 0.1, 100.0)
    }

    fn position(&self) -> Vector3<f32> {
        self.position
    }

    fn process_input(&mut self, input: &CameraInput) {
        match *input {
            CameraInput::CursorMoved {
                old,
                new,
                button: Some(_),
                ..
            } => self.process_mouse_movement(new.x - old.x, new.y - old.y, true),
            CameraInput::Scroll { delta, .. } => self.process_mouse_scroll(delta),
            CameraInput::Move { direction, dt } => self.process_keyboard(direction, dt),
            _ => {}
        }
    }
}
