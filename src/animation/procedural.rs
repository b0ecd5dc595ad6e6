//! Closed-form motions for [`ProceduralNode`](super::ProceduralNode).
//!
//! Each function returns the transform generator; it is evaluated on every
//! draw with the frame time and must be pure.

use std::f32::consts::TAU;

use cgmath::{Matrix4, Rad, Vector3};

/// Vertical sine oscillation: `translate(0, amplitude · sin(frequency · t), 0)`.
pub fn bob(amplitude: f32, frequency: f32) -> impl Fn(f32) -> Matrix4<f32> {
    move |t| Matrix4::from_translation(Vector3::new(0.0, amplitude * (frequency * t).sin(), 0.0))
}

/// Circle of `radius` in the xz-plane, one lap per `period` seconds, turned
/// to face along the direction of travel.
pub fn orbit(radius: f32, period: f32) -> impl Fn(f32) -> Matrix4<f32> {
    move |t| {
        let angle = TAU * t / period.max(f32::EPSILON);
        let position = Vector3::new(radius * angle.cos(), 0.0, radius * angle.sin());
        Matrix4::from_translation(position) * Matrix4::from_angle_y(Rad(-angle))
    }
}

/// Lemniscate of Gerono in the xz-plane with half-width `size`.
pub fn figure_eight(size: f32, period: f32) -> impl Fn(f32) -> Matrix4<f32> {
    move |t| {
        let angle = TAU * t / period.max(f32::EPSILON);
        let x = size * angle.sin();
        let z = size * angle.sin() * angle.cos();
        let (dx, dz) = (angle.cos(), (2.0 * angle).cos());
        let heading = dz.atan2(dx);
        Matrix4::from_translation(Vector3::new(x, 0.0, z)) * Matrix4::from_angle_y(Rad(-heading))
    }
}
