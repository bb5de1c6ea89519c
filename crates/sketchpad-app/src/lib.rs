//! Sketchpad Application
//!
//! Application shells around the core sketchpad: a winit window on native
//! targets and a DOM canvas binding on the web.

#[cfg(not(target_arch = "wasm32"))]
mod app;
#[cfg(not(target_arch = "wasm32"))]
pub mod file_ops;
#[cfg(not(target_arch = "wasm32"))]
mod shortcuts;

#[cfg(not(target_arch = "wasm32"))]
pub use app::{App, AppError};
#[cfg(not(target_arch = "wasm32"))]
pub use shortcuts::{Command, Shortcut, ShortcutRegistry};

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::run_wasm;
