//! Native application: a winit window presenting the sketchpad through
//! softbuffer.

use kurbo::Point;
use sketchpad_core::stroke::{CaptureError, PointerCapture};
use sketchpad_core::{
    ContainerMetrics, Debouncer, Notice, PointerButton, PointerId, PointerInput, SketchConfig,
    SketchError, Sketchpad, SnapshotStore,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event::{ElementState, MouseButton, Touch, TouchPhase, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{Window, WindowId};

use crate::file_ops;
use crate::shortcuts::{Command, ShortcutRegistry};

/// Logical margin between the window edge and the drawing surface.
const SURFACE_MARGIN: f64 = 16.0;

/// Window background around the drawing surface (0RGB).
const WINDOW_BACKGROUND: u32 = 0x00d1_d5db;

/// Pointer id used for the mouse; touch ids are offset past it.
const MOUSE_POINTER_ID: PointerId = 0;

/// Native shell errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Window error: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    #[error("Presentation error: {0}")]
    Present(#[from] softbuffer::SoftBufferError),
    #[error("Sketchpad error: {0}")]
    Sketch(#[from] SketchError),
}

/// Capture bookkeeping for the window.
///
/// The windowing system already keeps delivering events for a pressed
/// button, so acquiring capture only records which pointer holds it.
#[derive(Debug, Default)]
struct WindowCapture {
    held: Option<PointerId>,
}

impl PointerCapture for WindowCapture {
    fn set_capture(&mut self, pointer_id: PointerId) -> Result<(), CaptureError> {
        self.held = Some(pointer_id);
        Ok(())
    }

    fn release_capture(&mut self, pointer_id: PointerId) -> Result<(), CaptureError> {
        if self.held == Some(pointer_id) {
            self.held = None;
            Ok(())
        } else {
            Err(CaptureError {
                pointer_id,
                reason: "not captured".to_string(),
            })
        }
    }

    fn has_capture(&self, pointer_id: PointerId) -> bool {
        self.held == Some(pointer_id)
    }
}

/// Runtime state for the application.
struct AppState {
    window: Arc<Window>,
    _context: softbuffer::Context<Arc<Window>>,
    surface: softbuffer::Surface<Arc<Window>, Arc<Window>>,
    pad: Sketchpad<Box<dyn SnapshotStore>>,
    resize: Debouncer,
    capture: WindowCapture,
    /// Last cursor position in surface logical coordinates.
    cursor: Point,
    modifiers: ModifiersState,
}

impl AppState {
    fn new(window: Arc<Window>, config: SketchConfig) -> Result<Self, AppError> {
        let context = softbuffer::Context::new(window.clone())?;
        let surface = softbuffer::Surface::new(&context, window.clone())?;
        let resize = Debouncer::new(config.resize_debounce());
        let pad = Sketchpad::new(config, file_ops::open_store(), container_metrics(&window))?;

        let mut state = Self {
            window,
            _context: context,
            surface,
            pad,
            resize,
            capture: WindowCapture::default(),
            cursor: Point::ZERO,
            modifiers: ModifiersState::empty(),
        };
        state.resize_buffer()?;
        Ok(state)
    }

    /// Map a physical window position into surface logical coordinates.
    fn to_surface(&self, position: PhysicalPosition<f64>) -> Point {
        let scale = self.window.scale_factor();
        Point::new(
            position.x / scale - SURFACE_MARGIN,
            position.y / scale - SURFACE_MARGIN,
        )
    }

    fn resize_buffer(&mut self) -> Result<(), AppError> {
        let size = self.window.inner_size();
        let width = NonZeroU32::new(size.width.max(1)).unwrap_or(NonZeroU32::MIN);
        let height = NonZeroU32::new(size.height.max(1)).unwrap_or(NonZeroU32::MIN);
        self.surface.resize(width, height)?;
        Ok(())
    }

    /// Apply a debounced resize or pixel ratio change.
    fn apply_resize(&mut self) -> Result<(), AppError> {
        self.resize_buffer()?;
        self.pad.resize_and_restore(container_metrics(&self.window))?;
        self.window.request_redraw();
        Ok(())
    }

    fn handle_pointer(&mut self, input: PointerInput) {
        if self.pad.handle_pointer(input, &mut self.capture) {
            self.window.request_redraw();
        }
    }

    fn handle_touch(&mut self, touch: Touch) {
        let pointer_id = MOUSE_POINTER_ID + 1 + (touch.id % i32::MAX as u64) as PointerId;
        let position = self.to_surface(touch.location);
        let input = match touch.phase {
            TouchPhase::Started => PointerInput::Down {
                pointer_id,
                position,
                button: PointerButton::Primary,
            },
            TouchPhase::Moved => PointerInput::Move {
                pointer_id,
                position,
            },
            TouchPhase::Ended => PointerInput::Up { pointer_id },
            TouchPhase::Cancelled => PointerInput::Cancel { pointer_id },
        };
        self.handle_pointer(input);
    }

    fn run_command(&mut self, command: Command) {
        let result = match command {
            Command::Clear => {
                self.pad.clear();
                Ok(())
            }
            Command::Save => self.pad.save().map(|saved| file_ops::export_png(&saved)),
            Command::Retrieve => self.pad.retrieve().map(|_| ()),
            Command::DeleteSaved => self.pad.delete_saved().map(|()| {
                log::info!("Saved drawing removed");
            }),
            Command::StrokeColor(color) => self.pad.set_stroke_color(color),
            Command::BackgroundColor(color) => self.pad.set_background_color(color),
            Command::LineWidth(width) => {
                let width = self.pad.set_line_width(width);
                log::info!("Brush width {}", width);
                Ok(())
            }
            Command::ShowHelp => {
                ShortcutRegistry::print_all();
                Ok(())
            }
        };

        if let Err(e) = result {
            log::error!("{:?} failed: {}", command, e);
            self.show_message(&e.to_string());
        }
        self.window.request_redraw();
    }

    fn show_notices(&mut self) {
        for notice in self.pad.take_notices() {
            match notice {
                Notice::Saved => log::info!("{}", notice),
                _ if notice.is_error() => log::error!("{}", notice),
                _ => log::warn!("{}", notice),
            }
            self.show_message(&notice.to_string());
        }
    }

    fn show_message(&self, message: &str) {
        let title = format!("{} - {}", self.pad.config().title, message);
        self.window.set_title(&title);
    }

    /// Copy the composite raster into the window buffer.
    fn present(&mut self) -> Result<(), AppError> {
        let size = self.window.inner_size();
        let (win_w, win_h) = (size.width as usize, size.height as usize);
        let offset = (SURFACE_MARGIN * self.window.scale_factor()).round() as usize;

        let rgba = self.pad.surface().composite_rgba();
        let (src_w, src_h) = self.pad.surface().physical_size();
        let (src_w, src_h) = (src_w as usize, src_h as usize);

        let mut buffer = self.surface.buffer_mut()?;
        buffer.fill(WINDOW_BACKGROUND);

        let rows = src_h.min(win_h.saturating_sub(offset));
        let cols = src_w.min(win_w.saturating_sub(offset));
        for y in 0..rows {
            let src_row = &rgba[y * src_w * 4..(y * src_w + cols) * 4];
            let dst_start = (y + offset) * win_w + offset;
            for (dst, px) in buffer[dst_start..dst_start + cols]
                .iter_mut()
                .zip(src_row.chunks_exact(4))
            {
                *dst = (px[0] as u32) << 16 | (px[1] as u32) << 8 | px[2] as u32;
            }
        }

        buffer.present()?;
        Ok(())
    }
}

fn container_metrics(window: &Window) -> ContainerMetrics {
    let scale = window.scale_factor();
    let size = window.inner_size().to_logical::<f64>(scale);
    ContainerMetrics::new(size.width, SURFACE_MARGIN * 2.0, scale)
}

fn pointer_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Right => PointerButton::Secondary,
        MouseButton::Middle => PointerButton::Middle,
        _ => PointerButton::Other,
    }
}

/// Main application struct.
pub struct App {
    config: SketchConfig,
    state: Option<AppState>,
}

impl App {
    /// Create a new application with the user's configuration.
    pub fn new() -> Self {
        Self::with_config(file_ops::load_config())
    }

    /// Create a new application with custom configuration.
    pub fn with_config(config: SketchConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Run the application until the window is closed.
    pub fn run() -> Result<(), AppError> {
        let event_loop = EventLoop::new()?;
        let mut app = App::new();
        event_loop.run_app(&mut app)?;
        Ok(())
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        log::info!("Creating window...");
        let margin = SURFACE_MARGIN * 2.0;
        let attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(LogicalSize::new(
                self.config.base_width + margin,
                self.config.base_height + margin,
            ));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        match AppState::new(window.clone(), self.config.clone()) {
            Ok(state) => {
                log::info!("Keyboard shortcuts: press F1 for the list");
                self.state = Some(state);
                window.request_redraw();
            }
            Err(e) => {
                log::error!("Failed to initialize: {}", e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                state.resize.trigger(Instant::now());
                if let Err(e) = state.resize_buffer() {
                    log::error!("Failed to resize window buffer: {}", e);
                }
                state.window.request_redraw();
            }
            WindowEvent::CursorMoved { position, .. } => {
                state.cursor = state.to_surface(position);
                state.handle_pointer(PointerInput::Move {
                    pointer_id: MOUSE_POINTER_ID,
                    position: state.cursor,
                });
            }
            WindowEvent::CursorLeft { .. } => {
                if !state.capture.has_capture(MOUSE_POINTER_ID) {
                    state.handle_pointer(PointerInput::Out {
                        pointer_id: MOUSE_POINTER_ID,
                    });
                }
            }
            WindowEvent::MouseInput {
                state: button_state,
                button,
                ..
            } => {
                let input = match button_state {
                    ElementState::Pressed => PointerInput::Down {
                        pointer_id: MOUSE_POINTER_ID,
                        position: state.cursor,
                        button: pointer_button(button),
                    },
                    ElementState::Released if button == MouseButton::Left => PointerInput::Up {
                        pointer_id: MOUSE_POINTER_ID,
                    },
                    ElementState::Released => return,
                };
                state.handle_pointer(input);
            }
            WindowEvent::Touch(touch) => state.handle_touch(touch),
            WindowEvent::ModifiersChanged(modifiers) => state.modifiers = modifiers.state(),
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let key = match &event.logical_key {
                    Key::Character(c) => c.to_string(),
                    Key::Named(NamedKey::F1) => "F1".to_string(),
                    Key::Named(NamedKey::Delete) => "Delete".to_string(),
                    _ => return,
                };
                let ctrl = state.modifiers.control_key() || state.modifiers.super_key();
                let shift = state.modifiers.shift_key();
                if let Some(command) = ShortcutRegistry::lookup(&key, ctrl, shift) {
                    state.run_command(command);
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = state.present() {
                    log::error!("Failed to present frame: {}", e);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = self.state.as_mut() else {
            return;
        };

        if state.resize.poll(Instant::now()) {
            if let Err(e) = state.apply_resize() {
                log::error!("Failed to resize surface: {}", e);
            }
        }

        // Decodes complete on the next loop turn, after the event that
        // issued them.
        if state.pad.run_pending_decodes() {
            state.window.request_redraw();
        }
        state.show_notices();

        match state.resize.deadline() {
            Some(deadline) => event_loop.set_control_flow(ControlFlow::WaitUntil(deadline)),
            None => event_loop.set_control_flow(ControlFlow::Wait),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_capture_tracks_holder() {
        let mut capture = WindowCapture::default();
        capture.set_capture(3).unwrap();
        assert!(capture.has_capture(3));
        assert!(capture.release_capture(4).is_err());
        capture.release_capture(3).unwrap();
        assert!(!capture.has_capture(3));
    }

    #[test]
    fn test_pointer_button_mapping() {
        assert_eq!(pointer_button(MouseButton::Left), PointerButton::Primary);
        assert_eq!(pointer_button(MouseButton::Right), PointerButton::Secondary);
        assert_eq!(pointer_button(MouseButton::Back), PointerButton::Other);
    }
}
