//! Scene graph and hierarchical scene organization.
//!
//! A scene is a tree of [`Node`]s. Each node owns a local transform and an
//! ordered list of child [`Drawable`]s; drawing passes `model · local` down
//! the tree so a leaf mesh ends up with the product of every transform above
//! it. Children are owned, which keeps the graph a strict forest.
//!
//! A frame visits the tree three times: [`Drawable::draw`] computes matrices
//! and uniform values on the CPU, [`Drawable::write_to_buffers`] uploads them,
//! and [`Drawable::render`] records the draw calls into the render pass.

use cgmath::{Matrix4, SquareMatrix, Vector3};
use winit::keyboard::KeyCode;

/// Per-frame values every drawable may read.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    /// Animation time in seconds.
    pub time: f32,
    pub camera_position: Vector3<f32>,
}

impl Frame {
    pub fn at(time: f32) -> Self {
        Self {
            time,
            camera_position: Vector3::new(0.0, 0.0, 0.0),
        }
    }
}

/// Something that reacts to key presses routed through the scene.
pub trait KeyHandler {
    fn key_handler(&mut self, key: KeyCode);
}

pub trait Drawable {
    fn draw(
        &mut self,
        frame: &Frame,
        projection: &Matrix4<f32>,
        view: &Matrix4<f32>,
        model: &Matrix4<f32>,
    );

    fn write_to_buffers(&self, _queue: &wgpu::Queue) {}

    fn render(&self, _pass: &mut wgpu::RenderPass<'_>) {}

    /// Give back GPU resources. Calling it twice is harmless.
    fn release(&mut self) {}

    /// Nodes forward keys only to children that opt in here.
    fn as_key_handler(&mut self) -> Option<&mut dyn KeyHandler> {
        None
    }
}

/// Scene graph transform and parameter broadcast node.
pub struct Node {
    pub transform: Matrix4<f32>,
    children: Vec<Box<dyn Drawable>>,
}

impl Default for Node {
    fn default() -> Self {
        Self::new(Matrix4::identity())
    }
}

impl Node {
    pub fn new(transform: Matrix4<f32>) -> Self {
        Self {
            transform,
            children: Vec::new(),
        }
    }

    pub fn with_children(
        transform: Matrix4<f32>,
        children: impl IntoIterator<Item = Box<dyn Drawable>>,
    ) -> Self {
        Self {
            transform,
            children: children.into_iter().collect(),
        }
    }

    pub fn add(&mut self, drawable: Box<dyn Drawable>) {
        self.children.push(drawable);
    }

    pub fn add_all(&mut self, drawables: impl IntoIterator<Item = Box<dyn Drawable>>) {
        self.children.extend(drawables);
    }

    pub fn children(&self) -> &[Box<dyn Drawable>] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Hand `key` to every descendant that handles keys, depth first.
    pub fn key_handler(&mut self, key: KeyCode) {
        for child in &mut self.children {
            if let Some(handler) = child.as_key_handler() {
                handler.key_handler(key);
            }
        }
    }
}

impl Drawable for Node {
    fn draw(
        &mut self,
        frame: &Frame,
        projection: &Matrix4<f32>,
        view: &Matrix4<f32>,
        model: &Matrix4<f32>,
    ) {
        let model = model * self.transform;
        for child in &mut self.children {
            child.draw(frame, projection, view, &model);
        }
    }

    fn write_to_buffers(&self, queue: &wgpu::Queue) {
        for child in &self.children {
            child.write_to_buffers(queue);
        }
    }

    fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        for child in &self.children {
            child.render(pass);
        }
    }

    fn release(&mut self) {
        for child in &mut self.children {
            child.release();
        }
    }

    fn as_key_handler(&mut self) -> Option<&mut dyn KeyHandler> {
        Some(self)
    }
}

impl KeyHandler for Node {
    fn key_handler(&mut self, key: KeyCode) {
        Node::key_handler(self, key);
    }
}
