//! Scene graph nodes whose transform is driven over time or by keys.

use cgmath::{Deg, InnerSpace, Matrix4, SquareMatrix, Vector3};
use winit::keyboard::KeyCode;

use crate::{
    animation::keyframes::TransformKeyFrames,
    data_structures::scene_graph::{Drawable, Frame, KeyHandler, Node},
};

/// Node whose transform follows a keyframe track each frame.
pub struct KeyFrameNode {
    pub node: Node,
    keyframes: TransformKeyFrames,
}

impl KeyFrameNode {
    pub fn new(keyframes: TransformKeyFrames) -> Self {
        Self {
            node: Node::default(),
            keyframes,
        }
    }

    pub fn keyframes(&self) -> &TransformKeyFrames {
        &self.keyframes
    }

    pub fn add(&mut self, drawable: Box<dyn Drawable>) {
        self.node.add(drawable);
    }
}

impl Drawable for KeyFrameNode {
    fn draw(
        &mut self,
        frame: &Frame,
        projection: &Matrix4<f32>,
        view: &Matrix4<f32>,
        model: &Matrix4<f32>,
    ) {
        self.node.transform = self.keyframes.value(frame.time);
        self.node.draw(frame, projection, view, model);
    }

    fn write_to_buffers(&self, queue: &wgpu::Queue) {
        self.node.write_to_buffers(queue);
    }

    fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.node.render(pass);
    }

    fn release(&mut self) {
        self.node.release();
    }

    fn as_key_handler(&mut self) -> Option<&mut dyn KeyHandler> {
        Some(&mut self.node)
    }
}

type Motion = Box<dyn Fn(f32) -> Matrix4<f32>>;

/// Node whose transform is a function of time, recomputed on every draw.
pub struct ProceduralNode {
    pub node: Node,
    motion: Motion,
}

impl ProceduralNode {
    pub fn new(motion: impl Fn(f32) -> Matrix4<f32> + 'static) -> Self {
        Self {
            node: Node::default(),
            motion: Box::new(motion),
        }
    }

    pub fn add(&mut self, drawable: Box<dyn Drawable>) {
        self.node.add(drawable);
    }
}

impl Drawable for ProceduralNode {
    fn draw(
        &mut self,
        frame: &Frame,
        projection: &Matrix4<f32>,
        view: &Matrix4<f32>,
        model: &Matrix4<f32>,
    ) {
        self.node.transform = (self.motion)(frame.time);
        self.node.draw(frame, projection, view, model);
    }

    fn write_to_buffers(&self, queue: &wgpu::Queue) {
        self.node.write_to_buffers(queue);
    }

    fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.node.render(pass);
    }

    fn release(&mut self) {
        self.node.release();
    }

    fn as_key_handler(&mut self) -> Option<&mut dyn KeyHandler> {
        Some(&mut self.node)
    }
}

/// Rotates its subtree about `axis` in 5° steps on two keys.
pub struct RotationControlNode {
    pub node: Node,
    key_up: KeyCode,
    key_down: KeyCode,
    axis: Vector3<f32>,
    angle: f32,
}

impl RotationControlNode {
    pub const STEP: f32 = 5.0;

    pub fn new(key_up: KeyCode, key_down: KeyCode, axis: Vector3<f32>, angle: f32) -> Self {
        let mut control = Self {
            node: Node::default(),
            key_up,
            key_down,
            axis: axis.normalize(),
            angle,
        };
        control.update_transform();
        control
    }

    /// Current angle in degrees.
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn add(&mut self, drawable: Box<dyn Drawable>) {
        self.node.add(drawable);
    }

    fn update_transform(&mut self) {
        self.node.transform = if self.axis.x.is_finite() {
            Matrix4::from_axis_angle(self.axis, Deg(self.angle))
        } else {
            Matrix4::identity()
        };
    }
}

impl KeyHandler for RotationControlNode {
    fn key_handler(&mut self, key: KeyCode) {
        if key == self.key_up {
            self.angle += Self::STEP;
        }
        if key == self.key_down {
            self.angle -= Self::STEP;
        }
        self.update_transform();
        self.node.key_handler(key);
    }
}

impl Drawable for RotationControlNode {
    fn draw(
        &mut self,
        frame: &Frame,
        projection: &Matrix4<f32>,
        view: &Matrix4<f32>,
        model: &Matrix4<f32>,
    ) {
        self.node.draw(frame, projection, view, model);
    }

    fn write_to_buffers(&self, queue: &wgpu::Queue) {
        self.node.write_to_buffers(queue);
    }

    fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.node.render(pass);
    }

    fn release(&mut self) {
        self.node.release();
    }

    fn as_key_handler(&mut self) -> Option<&mut dyn KeyHandler> {
        Some(self)
    }
}
