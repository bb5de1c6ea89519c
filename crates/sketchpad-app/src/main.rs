//! Main application entry point (native).

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Starting Sketchpad");

    if let Err(e) = sketchpad_app::App::run() {
        log::error!("Sketchpad exited with an error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
