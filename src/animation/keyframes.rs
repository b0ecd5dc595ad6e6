//! Keyframe tracks and their interpolation.

use cgmath::{InnerSpace, Matrix4, Quaternion, Vector2, Vector3, VectorSpace};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnimationError {
    #[error("a keyframe track needs at least one key")]
    Empty,
    #[error("keyframe time must be finite")]
    NonFiniteTime,
}

/// How a value type blends between two keys. `fraction` lies in `[0, 1]`.
pub trait Interpolate: Copy {
    fn interpolate(from: Self, to: Self, fraction: f32) -> Self;
}

impl Interpolate for f32 {
    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        from + (to - from) * fraction
    }
}

impl Interpolate for Vector2<f32> {
    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        from.lerp(to, fraction)
    }
}

impl Interpolate for Vector3<f32> {
    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        from.lerp(to, fraction)
    }
}

impl Interpolate for Quaternion<f32> {
    fn interpolate(from: Self, to: Self, fraction: f32) -> Self {
        quaternion_slerp(from, to, fraction)
    }
}

/// Spherical interpolation along the shortest arc between two rotations.
///
/// The endpoints come back unchanged at `fraction` 0 and 1, and equal
/// inputs return that same quaternion.
pub fn quaternion_slerp(q0: Quaternion<f32>, q1: Quaternion<f32>, fraction: f32) -> Quaternion<f32> {
    if fraction <= 0.0 || q0 == q1 {
        return q0;
    }
    if fraction >= 1.0 {
        return q1;
    }
    let from = q0.normalize();
    let mut to = q1.normalize();
    let mut dot = from.dot(to);
    if dot < 0.0 {
        to = -to;
        dot = -dot;
    }
    // Nearly parallel: sin(theta) vanishes, fall back to normalized lerp.
    if dot > 0.9995 {
        return (from * (1.0 - fraction) + to * fraction).normalize();
    }
    let theta_0 = dot.clamp(-1.0, 1.0).acos();
    let theta = theta_0 * fraction;
    let sin_theta_0 = theta_0.sin();
    let s1 = theta.sin() / sin_theta_0;
    let s0 = theta.cos() - dot * s1;
    from * s0 + to * s1
}

/// `(time, value)` pairs sorted by time.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyFrames<T> {
    times: Vec<f32>,
    values: Vec<T>,
}

impl<T: Interpolate> KeyFrames<T> {
    pub fn new(pairs: impl IntoIterator<Item = (f32, T)>) -> Result<Self, AnimationError> {
        let mut pairs: Vec<(f32, T)> = pairs.into_iter().collect();
        if pairs.is_empty() {
            return Err(AnimationError::Empty);
        }
        if pairs.iter().any(|(time, _)| !time.is_finite()) {
            return Err(AnimationError::NonFiniteTime);
        }
        // Stable, so keys sharing a time keep their given order.
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (times, values) = pairs.into_iter().unzip();
        Ok(Self { times, values })
    }

    /// Value at `time`, holding the first and last keys outside the track.
    /// A NaN time yields the first key.
    pub fn value(&self, time: f32) -> T {
        let last = self.times.len() - 1;
        if time.is_nan() || time <= self.times[0] {
            return self.values[0];
        }
        if time >= self.times[last] {
            return self.values[last];
        }
        let idx = self.times.partition_point(|&t| t < time);
        let (t0, t1) = (self.times[idx - 1], self.times[idx]);
        T::interpolate(
            self.values[idx - 1],
            self.values[idx],
            (time - t0) / (t1 - t0),
        )
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    /// Time of the last key.
    pub fn duration(&self) -> f32 {
        self.times[self.times.len() - 1]
    }
}

/// Translation, rotation and scale tracks, each with its own key times.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformKeyFrames {
    pub translation: KeyFrames<Vector3<f32>>,
    pub rotation: KeyFrames<Quaternion<f32>>,
    pub scale: KeyFrames<Vector3<f32>>,
}

impl TransformKeyFrames {
    pub fn new(
        translation: impl IntoIterator<Item = (f32, Vector3<f32>)>,
        rotation: impl IntoIterator<Item = (f32, Quaternion<f32>)>,
        scale: impl IntoIterator<Item = (f32, Vector3<f32>)>,
    ) -> Result<Self, AnimationError> {
        Ok(Self {
            translation: KeyFrames::new(translation)?,
            rotation: KeyFrames::new(rotation)?,
            scale: KeyFrames::new(scale)?,
        })
    }

    /// `T · (R · S)` at `time`.
    pub fn value(&self, time: f32) -> Matrix4<f32> {
        let t = Matrix4::from_translation(self.translation.value(time));
        let r = Matrix4::from(self.rotation.value(time));
        let s = self.scale.value(time);
        t * (r * Matrix4::from_nonuniform_scale(s.x, s.y, s.z))
    }

    pub fn duration(&self) -> f32 {
        self.translation
            .duration()
            .max(self.rotation.duration())
            .max(self.scale.duration())
    }
}
