//! Translation of winit window events into viewer input.

use glam::Vec2;
use peelview_render::{Key, PointerButtons};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::viewer::Viewer;

/// A pointer button the viewer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left button.
    Primary,
    /// Right button.
    Secondary,
    /// Middle button.
    Middle,
}

/// Window input, independent of the windowing library.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// The surface was resized.
    Resized {
        /// New width in pixels.
        width: u32,
        /// New height in pixels.
        height: u32,
    },
    /// The pointer moved to a pixel position.
    PointerMoved(Vec2),
    /// A button changed state.
    Button {
        /// Which button.
        button: Button,
        /// Pressed or released.
        pressed: bool,
    },
    /// Wheel scrolled, in lines.
    Wheel(f32),
    /// A command key was pressed.
    Key(Key),
}

/// Maps a winit event to an [`InputEvent`]; `None` for events the viewer ignores.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn translate(event: &WindowEvent) -> Option<InputEvent> {
    match event {
        WindowEvent::Resized(size) => Some(InputEvent::Resized {
            width: size.width,
            height: size.height,
        }),
        WindowEvent::CursorMoved { position, .. } => Some(InputEvent::PointerMoved(Vec2::new(
            position.x as f32,
            position.y as f32,
        ))),
        WindowEvent::MouseInput { state, button, .. } => {
            let button = match button {
                MouseButton::Left => Button::Primary,
                MouseButton::Right => Button::Secondary,
                MouseButton::Middle => Button::Middle,
                _ => return None,
            };
            Some(InputEvent::Button {
                button,
                pressed: *state == ElementState::Pressed,
            })
        }
        WindowEvent::MouseWheel { delta, .. } => {
            let lines = match delta {
                MouseScrollDelta::LineDelta(_, y) => *y,
                MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.1,
            };
            Some(InputEvent::Wheel(lines))
        }
        WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
            match event.physical_key {
                PhysicalKey::Code(KeyCode::Space) => Some(InputEvent::Key(Key::Reset)),
                PhysicalKey::Code(KeyCode::F5) => Some(InputEvent::Key(Key::ReloadShaders)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Applies `event` to `viewer`. Returns true if a redraw is needed.
pub fn apply(viewer: &mut Viewer, event: InputEvent) -> bool {
    match event {
        InputEvent::Resized { width, height } => viewer.resize(width, height),
        InputEvent::PointerMoved(p) => {
            viewer.pointer.position = p;
            let buttons = viewer.pointer.buttons;
            viewer.pointer_move(p, buttons)
        }
        InputEvent::Button { button, pressed } => {
            let mut buttons = viewer.pointer.buttons;
            match button {
                Button::Primary => buttons.primary = pressed,
                Button::Secondary => buttons.secondary = pressed,
                Button::Middle => buttons.middle = pressed,
            }
            viewer.pointer.buttons = buttons;
            let p = viewer.pointer.position;
            if pressed {
                viewer.pointer_down(p, buttons)
            } else {
                viewer.pointer_up(p)
            }
        }
        InputEvent::Wheel(lines) => viewer.wheel(lines),
        InputEvent::Key(key) => viewer.handle_key(key).unwrap_or_else(|e| {
            log::error!("[input] {key:?} failed: {e}");
            false
        }),
    }
}

/// Translates and applies a winit event. Returns true if a redraw is needed.
pub fn handle_window_event(viewer: &mut Viewer, event: &WindowEvent) -> bool {
    translate(event).is_some_and(|e| apply(viewer, e))
}
