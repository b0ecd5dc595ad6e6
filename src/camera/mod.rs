//! Cameras and their input mapping.
//!
//! Both camera models sit behind the [`Camera`] trait so the viewer can own
//! either one as a `Box<dyn Camera>`. Input arrives already translated by
//! [`CameraController`] into [`CameraInput`] values.

pub mod controller;
pub mod first_person;
pub mod trackball;

use cgmath::{Deg, Matrix4, Vector2, Vector3, perspective};

pub use controller::CameraController;
pub use first_person::FirstPersonCamera;
pub use trackball::Trackball;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// GL-style perspective mapped to the wgpu depth range `[0, 1]`.
pub fn projection(fovy_degrees: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * perspective(Deg(fovy_degrees), aspect, near, far)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragButton {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

/// Window input, in pixels with the origin at the bottom-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CameraInput {
    CursorMoved {
        old: Vector2<f32>,
        new: Vector2<f32>,
        size: Vector2<f32>,
        button: Option<DragButton>,
    },
    Scroll {
        delta: f32,
        height: f32,
    },
    Move {
        direction: Direction,
        dt: f32,
    },
}

pub trait Camera {
    fn view_matrix(&self) -> Matrix4<f32>;

    /// Projection for a viewport of the given width / height ratio.
    fn projection_matrix(&self, aspect: f32) -> Matrix4<f32>;

    /// Eye position in world coordinates.
    fn position(&self) -> Vector3<f32>;

    fn process_input(&mut self, input: &CameraInput);
}
