#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use cgmath::{Matrix4, Vector3};
use reef_viewer::{
    KeyCode,
    data_structures::scene_graph::{Drawable, Frame, KeyHandler},
};

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Draw {
        name: &'static str,
        model: Matrix4<f32>,
        time: f32,
        camera_position: Vector3<f32>,
    },
    Key {
        name: &'static str,
        key: KeyCode,
    },
    Release {
        name: &'static str,
    },
}

pub type Log = Rc<RefCell<Vec<Event>>>;

/// Leaf that writes every call it receives into a shared log.
pub struct Recorder {
    name: &'static str,
    log: Log,
    handles_keys: bool,
}

impl Recorder {
    pub fn new(name: &'static str, log: &Log) -> Box<Self> {
        Box::new(Self {
            name,
            log: log.clone(),
            handles_keys: false,
        })
    }

    pub fn with_keys(name: &'static str, log: &Log) -> Box<Self> {
        Box::new(Self {
            name,
            log: log.clone(),
            handles_keys: true,
        })
    }
}

impl KeyHandler for Recorder {
    fn key_handler(&mut self, key: KeyCode) {
        self.log.borrow_mut().push(Event::Key {
            name: self.name,
            key,
        });
    }
}

impl Drawable for Recorder {
    fn draw(
        &mut self,
        frame: &Frame,
        _projection: &Matrix4<f32>,
        _view: &Matrix4<f32>,
        model: &Matrix4<f32>,
    ) {
        self.log.borrow_mut().push(Event::Draw {
            name: self.name,
            model: *model,
            time: frame.time,
            camera_position: frame.camera_position,
        });
    }

    fn release(&mut self) {
        self.log
            .borrow_mut()
            .push(Event::Release { name: self.name });
    }

    fn as_key_handler(&mut self) -> Option<&mut dyn KeyHandler> {
        if self.handles_keys { Some(self) } else { None }
    }
}

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

/// Model matrices of every draw, in call order.
pub fn drawn_models(log: &Log) -> Vec<(&'static str, Matrix4<f32>)> {
    log.borrow()
        .iter()
        .filter_map(|event| match event {
            Event::Draw { name, model, .. } => Some((*name, *model)),
            _ => None,
        })
        .collect()
}

pub fn assert_mat4_near(actual: Matrix4<f32>, expected: Matrix4<f32>) {
    let a: [[f32; 4]; 4] = actual.into();
    let e: [[f32; 4]; 4] = expected.into();
    for (col_a, col_e) in a.iter().zip(e.iter()) {
        for (x, y) in col_a.iter().zip(col_e.iter()) {
            assert!(
                (x - y).abs() < 1e-4,
                "matrices differ:\n{actual:?}\n{expected:?}"
            );
        }
    }
}

pub fn assert_vec3_near(actual: Vector3<f32>, expected: Vector3<f32>) {
    assert!(
        (actual.x - expected.x).abs() < 1e-4
            && (actual.y - expected.y).abs() < 1e-4
            && (actual.z - expected.z).abs() < 1e-4,
        "vectors differ: {actual:?} vs {expected:?}"
    );
}

/// Headless device for the GPU tests.
#[cfg(feature = "integration-tests")]
pub async fn headless() -> (wgpu::Device, wgpu::Queue) {
    let instance = reef_viewer::context::instance();
    let (_, device, queue) = reef_viewer::context::request_device(&instance, None)
        .await
        .expect("no GPU adapter available for integration tests");
    (device, queue)
}
