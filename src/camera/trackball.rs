use cgmath::{
    InnerSpace, Matrix4, One, Quaternion, Rad, Rotation3, SquareMatrix, Vector2, Vector3, Vector4,
};

use super::{Camera, CameraInput, DragButton, projection};

/// Virtual trackball: a quaternion orientation around the origin, a viewing
/// distance and a 2D pan offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trackball {
    pub rotation: Quaternion<f32>,
    distance: f32,
    pub pan: Vector2<f32>,
}

impl Default for Trackball {
    fn default() -> Self {
        Self::new(3.0)
    }
}

impl Trackball {
    pub const MIN_DISTANCE: f32 = 0.001;
    pub const RADIUS: f32 = 0.8;
    pub const FOVY: f32 = 35.0;

    pub fn new(distance: f32) -> Self {
        Self {
            rotation: Quaternion::one(),
            distance: distance.max(Self::MIN_DISTANCE),
            pan: Vector2::new(0.0, 0.0),
        }
    }

    /// Start from yaw, pitch and roll angles in degrees.
    pub fn from_euler(yaw: f32, pitch: f32, roll: f32, distance: f32) -> Self {
        let rotation = Quaternion::from_angle_y(cgmath::Deg(yaw))
            * Quaternion::from_angle_x(cgmath::Deg(pitch))
            * Quaternion::from_angle_z(cgmath::Deg(roll));
        Self {
            rotation,
            ..Self::new(distance)
        }
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Rotate by the arc between two window positions.
    pub fn drag(&mut self, old: Vector2<f32>, new: Vector2<f32>, size: Vector2<f32>) {
        let normalize = |p: Vector2<f32>| {
            Vector2::new(
                (2.0 * p.x - size.x) / size.x,
                (2.0 * p.y - size.y) / size.y,
            )
        };
        let increment = Self::rotate(normalize(old), normalize(new));
        self.rotation = increment * self.rotation;
    }

    pub fn zoom(&mut self, delta: f32, size: f32) {
        self.distance = (self.distance * (1.0 - 50.0 * delta / size)).max(Self::MIN_DISTANCE);
    }

    pub fn pan(&mut self, old: Vector2<f32>, new: Vector2<f32>) {
        self.pan += (new - old) * 0.001 * self.distance;
    }

    /// Lift a point of the unit square onto the sphere, or onto the
    /// hyperbolic sheet once it leaves the sphere's silhouette.
    pub fn project3d(position: Vector2<f32>) -> Vector3<f32> {
        let p2 = position.magnitude2();
        let r2 = Self::RADIUS * Self::RADIUS;
        let z = if 2.0 * p2 < r2 {
            (r2 - p2).sqrt()
        } else {
            r2 / (2.0 * p2.sqrt())
        };
        Vector3::new(position.x, position.y, z)
    }

    fn rotate(old: Vector2<f32>, new: Vector2<f32>) -> Quaternion<f32> {
        let old = Self::project3d(old).normalize();
        let new = Self::project3d(new).normalize();
        let axis = old.cross(new);
        if axis.magnitude2() <= f32::EPSILON * f32::EPSILON {
            return Quaternion::one();
        }
        let phi = 2.0 * old.dot(new).clamp(-1.0, 1.0).acos();
        Quaternion::from_axis_angle(axis.normalize(), Rad(phi))
    }
}

impl Camera for Trackball {
    fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(Vector3::new(self.pan.x, self.pan.y, -self.distance))
            * Matrix4::from(self.rotation)
    }

    fn projection_matrix(&self, aspect: f32) -> Matrix4<f32> {
        projection(
            Self::FOVY,
            aspect,
            0.1 * self.distance,
            100.0 * self.distance,
        )
    }

    fn position(&self) -> Vector3<f32> {
        self.view_matrix()
            .invert()
            .map(|inverse| (inverse * Vector4::unit_w()).truncate())
            .unwrap_or_else(|| Vector3::new(0.0, 0.0, self.distance))
    }

    fn process_input(&mut self, input: &CameraInput) {
        match *input {
            CameraInput::CursorMoved {
                old,
                new,
                size,
                button: Some(DragButton::Left),
            } => self.drag(old, new, size),
            CameraInput::CursorMoved {
                old,
                new,
                button: Some(DragButton::Right),
                ..
            } => self.pan(old, new),
            CameraInput::Scroll { delta, height } => self.zoom(delta, height),
            _ => {}
        }
    }
}
