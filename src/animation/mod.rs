//! Keyframe and procedural animation.
//!
//! Time is never read from a global: the viewer samples its [`Clock`] once per
//! frame and hands the value down through [`Frame`](crate::data_structures::scene_graph::Frame).

pub mod clock;
pub mod keyframes;
pub mod nodes;
pub mod procedural;

pub use clock::{Clock, ManualClock, SystemClock};
pub use keyframes::{AnimationError, Interpolate, KeyFrames, TransformKeyFrames, quaternion_slerp};
pub use nodes::{KeyFrameNode, ProceduralNode, RotationControlNode};
