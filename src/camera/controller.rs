use cgmath::Vector2;
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use super::{CameraInput, Direction, DragButton};

/// Pixels of a trackpad scroll that count as one wheel line.
const PIXELS_PER_LINE: f32 = 20.0;

/// Turns winit window events into [`CameraInput`].
///
/// Cursor positions are flipped so that y grows upwards. Movement keys are
/// tracked while held and turned into one `Move` per frame by [`update`](Self::update).
#[derive(Debug, Default)]
pub struct CameraController {
    cursor: Option<Vector2<f32>>,
    button: Option<DragButton>,
    forward: bool,
    backward: bool,
    left: bool,
    right: bool,
}

impl CameraController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_window_event(
        &mut self,
        event: &WindowEvent,
        size: PhysicalSize<u32>,
    ) -> Option<CameraInput> {
        let size = Vector2::new(size.width.max(1) as f32, size.height.max(1) as f32);
        match event {
            WindowEvent::CursorMoved {
                position: PhysicalPosition { x, y },
                ..
            } => {
                let new = Vector2::new(*x as f32, size.y - *y as f32);
                let old = self.cursor.replace(new)?;
                Some(CameraInput::CursorMoved {
                    old,
                    new,
                    size,
                    button: self.button,
                })
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                None
            }
            WindowEvent::MouseInput { state, button, .. } => {
                let button = match button {
                    MouseButton::Left => DragButton::Left,
                    MouseButton::Right => DragButton::Right,
                    _ => return None,
                };
                match state {
                    ElementState::Pressed => self.button = Some(button),
                    ElementState::Released if self.button == Some(button) => self.button = None,
                    ElementState::Released => {}
                }
                None
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(PhysicalPosition { y, .. }) => {
                        *y as f32 / PIXELS_PER_LINE
                    }
                };
                Some(CameraInput::Scroll {
                    delta,
                    height: size.y,
                })
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                self.process_key(*code, *state == ElementState::Pressed);
                None
            }
            _ => None,
        }
    }

    /// Returns true when `key` is one of the movement keys.
    pub fn process_key(&mut self, key: KeyCode, pressed: bool) -> bool {
        match key {
            KeyCode::KeyW => self.forward = pressed,
            KeyCode::KeyS => self.backward = pressed,
            KeyCode::KeyA => self.left = pressed,
            KeyCode::KeyD => self.right = pressed,
            _ => return false,
        }
        true
    }

    /// One move per held direction, scaled by the frame time in seconds.
    pub fn update(&self, dt: f32) -> Vec<CameraInput> {
        [
            (self.forward, Direction::Forward),
            (self.backward, Direction::Backward),
            (self.left, Direction::Left),
            (self.right, Direction::Right),
        ]
        .into_iter()
        .filter(|(held, _)| *held)
        .map(|(_, direction)| CameraInput::Move { direction, dt })
        .collect()
    }
}
