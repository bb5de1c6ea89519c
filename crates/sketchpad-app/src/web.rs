//! WebAssembly entry point: binds the sketchpad to a page canvas and its
//! controls.

use kurbo::Point;
use sketchpad_core::storage::create_default_store;
use sketchpad_core::stroke::{CaptureError, PointerCapture};
use sketchpad_core::{
    ContainerMetrics, Debouncer, DisplaySize, MemoryStore, PointerButton, PointerId, PointerInput, SavedImage,
    SketchConfig, Sketchpad, SnapshotStore,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{
    CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement, HtmlInputElement,
    ImageData, PointerEvent,
};
use web_time::{Duration, Instant};

const CANVAS_ID: &str = "sketchpad-canvas";
const STROKE_COLOR_ID: &str = "stroke-color";
const BACKGROUND_COLOR_ID: &str = "background-color";
const LINE_WIDTH_ID: &str = "line-width";
const CLEAR_BUTTON_ID: &str = "clear-button";
const SAVE_BUTTON_ID: &str = "save-button";
const RETRIEVE_BUTTON_ID: &str = "retrieve-button";

type Shared = Rc<RefCell<WebState>>;

/// Pointer capture through the canvas element.
struct CanvasCapture {
    canvas: HtmlCanvasElement,
}

impl PointerCapture for CanvasCapture {
    fn set_capture(&mut self, pointer_id: PointerId) -> Result<(), CaptureError> {
        self.canvas
            .set_pointer_capture(pointer_id)
            .map_err(|e| CaptureError {
                pointer_id,
                reason: format!("{:?}", e),
            })
    }

    fn release_capture(&mut self, pointer_id: PointerId) -> Result<(), CaptureError> {
        self.canvas
            .release_pointer_capture(pointer_id)
            .map_err(|e| CaptureError {
                pointer_id,
                reason: format!("{:?}", e),
            })
    }

    fn has_capture(&self, pointer_id: PointerId) -> bool {
        self.canvas.has_pointer_capture(pointer_id)
    }
}

struct WebState {
    pad: Sketchpad<Box<dyn SnapshotStore>>,
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    capture: CanvasCapture,
    resize: Debouncer,
    /// Size last applied to the canvas element.
    applied: Option<DisplaySize>,
}

impl WebState {
    /// Match the canvas element to the surface and blit the composite.
    fn render(&mut self) -> Result<(), JsValue> {
        let surface = self.pad.surface();
        let display = surface.display();
        let (width, height) = surface.physical_size();
        let update = display.element_update(self.applied.as_ref());
        if update.backing_store {
            self.canvas.set_width(width);
            self.canvas.set_height(height);
        }
        if update.css_size {
            let style = self.canvas.style();
            style.set_property("width", &format!("{}px", display.logical.width))?;
            style.set_property("height", &format!("{}px", display.logical.height))?;
        }
        self.applied = Some(display);

        let rgba = surface.composite_rgba();
        let image = ImageData::new_with_u8_clamped_array_and_sh(Clamped(rgba.as_slice()), width, height)?;
        self.context.put_image_data(&image, 0.0, 0.0)
    }

    fn render_or_log(&mut self) {
        if let Err(e) = self.render() {
            log::error!("Failed to draw canvas: {:?}", e);
        }
    }
}

/// Initialize and run the WASM application.
#[wasm_bindgen(start)]
pub fn run_wasm() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info)
        .map_err(|e| JsValue::from_str(&format!("Failed to initialize logger: {}", e)))?;

    log::info!("Starting Sketchpad (WASM)");

    let document = document()?;
    let canvas = document
        .get_element_by_id(CANVAS_ID)
        .ok_or_else(|| JsValue::from_str("Canvas element not found"))?
        .dyn_into::<HtmlCanvasElement>()?;
    let context = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context not available"))?
        .dyn_into::<CanvasRenderingContext2d>()?;
    canvas.style().set_property("touch-action", "none")?;

    let config = SketchConfig::default();
    let resize = Debouncer::new(config.resize_debounce());
    let pad = Sketchpad::new(config, open_store(), container_metrics(&canvas))
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let state = Rc::new(RefCell::new(WebState {
        pad,
        capture: CanvasCapture {
            canvas: canvas.clone(),
        },
        canvas: canvas.clone(),
        context,
        resize,
        applied: None,
    }));
    state.borrow_mut().render()?;

    bind_pointer_events(&state, &canvas)?;
    bind_controls(&state, &document)?;
    bind_resize(&state)?;
    watch_pixel_ratio(&state)?;
    Ok(())
}

fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("No window"))
}

fn document() -> Result<Document, JsValue> {
    window()?
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))
}

fn open_store() -> Box<dyn SnapshotStore> {
    match create_default_store() {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::warn!("localStorage unavailable ({}), saving to memory only", e);
            Box::new(MemoryStore::new())
        }
    }
}

/// Measure the canvas's parent: its width, horizontal padding and the
/// page's device pixel ratio.
fn container_metrics(canvas: &HtmlCanvasElement) -> ContainerMetrics {
    let Ok(window) = window() else {
        return ContainerMetrics::new(0.0, 0.0, 1.0);
    };
    let ratio = window.device_pixel_ratio();
    let Some(parent) = canvas.parent_element() else {
        return ContainerMetrics::new(0.0, 0.0, ratio);
    };

    let padding = match window.get_computed_style(&parent) {
        Ok(Some(style)) => ["padding-left", "padding-right"]
            .iter()
            .filter_map(|name| style.get_property_value(name).ok())
            .map(|value| parse_px(&value))
            .sum(),
        _ => 0.0,
    };
    ContainerMetrics::new(parent.client_width() as f64, padding, ratio)
}

fn parse_px(value: &str) -> f64 {
    value.trim().trim_end_matches("px").parse().unwrap_or(0.0)
}

fn pointer_button(button: i16) -> PointerButton {
    match button {
        0 => PointerButton::Primary,
        1 => PointerButton::Middle,
        2 => PointerButton::Secondary,
        _ => PointerButton::Other,
    }
}

fn pointer_position(event: &PointerEvent) -> Point {
    Point::new(event.offset_x() as f64, event.offset_y() as f64)
}

fn add_listener<E, F>(target: &web_sys::EventTarget, event: &str, handler: F) -> Result<(), JsValue>
where
    E: wasm_bindgen::convert::FromWasmAbi + 'static,
    F: FnMut(E) + 'static,
{
    let closure = Closure::<dyn FnMut(E)>::new(handler);
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

fn bind_pointer_events(state: &Shared, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let events: [(&str, fn(&PointerEvent) -> PointerInput); 5] = [
        ("pointerdown", |e| PointerInput::Down {
            pointer_id: e.pointer_id(),
            position: pointer_position(e),
            button: pointer_button(e.button()),
        }),
        ("pointermove", |e| PointerInput::Move {
            pointer_id: e.pointer_id(),
            position: pointer_position(e),
        }),
        ("pointerup", |e| PointerInput::Up {
            pointer_id: e.pointer_id(),
        }),
        ("pointercancel", |e| PointerInput::Cancel {
            pointer_id: e.pointer_id(),
        }),
        ("pointerout", |e| PointerInput::Out {
            pointer_id: e.pointer_id(),
        }),
    ];

    for (name, to_input) in events {
        let state = state.clone();
        add_listener(canvas, name, move |event: PointerEvent| {
            let input = to_input(&event);
            if matches!(input, PointerInput::Down { .. }) {
                event.prevent_default();
            }
            let mut guard = state.borrow_mut();
            let WebState { pad, capture, .. } = &mut *guard;
            if pad.handle_pointer(input, capture) {
                guard.render_or_log();
            }
        })?;
    }
    Ok(())
}

fn bind_controls(state: &Shared, document: &Document) -> Result<(), JsValue> {
    let inputs: [(&str, fn(&mut WebState, &str)); 3] = [
        (STROKE_COLOR_ID, |s, value| {
            if let Err(e) = s.pad.set_stroke_color(value) {
                log::warn!("{}", e);
            }
        }),
        (BACKGROUND_COLOR_ID, |s, value| {
            if let Err(e) = s.pad.set_background_color(value) {
                log::warn!("{}", e);
            }
        }),
        (LINE_WIDTH_ID, |s, value| {
            let width = s.pad.set_line_width(value);
            log::debug!("Brush width {}", width);
        }),
    ];
    for (id, apply) in inputs {
        let Some(element) = find_control(document, id) else {
            continue;
        };
        let Ok(input) = element.clone().dyn_into::<HtmlInputElement>() else {
            log::warn!("Control #{} is not an input, skipping", id);
            continue;
        };
        let state = state.clone();
        add_listener(&element, "input", move |_: web_sys::Event| {
            let mut state = state.borrow_mut();
            apply(&mut state, &input.value());
            state.render_or_log();
        })?;
    }

    if let Some(button) = find_control(document, CLEAR_BUTTON_ID) {
        let state = state.clone();
        add_listener(&button, "click", move |_: web_sys::Event| {
            let mut state = state.borrow_mut();
            state.pad.clear();
            state.render_or_log();
        })?;
    }

    if let Some(button) = find_control(document, SAVE_BUTTON_ID) {
        let state = state.clone();
        add_listener(&button, "click", move |_: web_sys::Event| {
            let saved = state.borrow_mut().pad.save();
            match saved {
                Ok(saved) => {
                    if let Err(e) = download_binary_file(&saved, "image/png") {
                        log::error!("Failed to download {}: {:?}", saved.file_name, e);
                    }
                }
                Err(e) => log::error!("Save failed: {}", e),
            }
            show_notices(&state);
        })?;
    }

    if let Some(button) = find_control(document, RETRIEVE_BUTTON_ID) {
        let state = state.clone();
        add_listener(&button, "click", move |_: web_sys::Event| {
            let retrieved = state.borrow_mut().pad.retrieve();
            if let Err(e) = retrieved {
                log::error!("Retrieve failed: {}", e);
            }
            show_notices(&state);
            spawn_decodes(&state);
        })?;
    }

    Ok(())
}

fn find_control(document: &Document, id: &str) -> Option<HtmlElement> {
    let element = document
        .get_element_by_id(id)
        .and_then(|e| e.dyn_into::<HtmlElement>().ok());
    if element.is_none() {
        log::warn!("Control #{} not found, skipping", id);
    }
    element
}

/// Debounce window resizes before refitting the surface.
fn bind_resize(state: &Shared) -> Result<(), JsValue> {
    let window = window()?;
    let handler_state = state.clone();
    add_listener(&window, "resize", move |_: web_sys::Event| {
        schedule_resize(&handler_state);
    })
}

fn schedule_resize(state: &Shared) {
    let delay = {
        let mut guard = state.borrow_mut();
        guard.resize.trigger(Instant::now());
        guard.resize.delay()
    };
    arm_resize_timer(state, delay);
}

/// Fire the pending resize once its quiet period has passed. Timers can run
/// slightly early, so an early wake-up re-arms for the time that is left.
fn arm_resize_timer(state: &Shared, delay: Duration) {
    let state = state.clone();
    let callback = Closure::once_into_js(move || {
        let now = Instant::now();
        let (due, remaining) = {
            let mut guard = state.borrow_mut();
            let due = guard.resize.poll(now);
            (due, guard.resize.remaining(now))
        };
        if due {
            apply_resize(&state);
        } else if let Some(remaining) = remaining {
            arm_resize_timer(&state, remaining + Duration::from_millis(1));
        }
    });
    let scheduled = window().and_then(|w| {
        w.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.unchecked_ref(),
            delay.as_millis() as i32,
        )
    });
    if let Err(e) = scheduled {
        log::error!("Failed to schedule resize: {:?}", e);
    }
}

fn apply_resize(state: &Shared) {
    {
        let mut guard = state.borrow_mut();
        let metrics = container_metrics(&guard.canvas);
        if let Err(e) = guard.pad.resize_and_restore(metrics) {
            log::error!("Failed to resize surface: {}", e);
            return;
        }
        guard.render_or_log();
    }
    spawn_decodes(state);
}

/// Refit the surface when the page moves to a display with a different
/// pixel ratio. The media query only matches the current ratio, so it is
/// re-armed after every change.
fn watch_pixel_ratio(state: &Shared) -> Result<(), JsValue> {
    let window = window()?;
    let query = format!("(resolution: {}dppx)", window.device_pixel_ratio());
    let Some(media) = window.match_media(&query)? else {
        return Ok(());
    };

    let state = state.clone();
    let handler = Closure::once_into_js(move || {
        log::debug!("Device pixel ratio changed");
        schedule_resize(&state);
        if let Err(e) = watch_pixel_ratio(&state) {
            log::error!("Failed to watch pixel ratio: {:?}", e);
        }
    });
    media.set_onchange(Some(handler.unchecked_ref()));
    Ok(())
}

/// Run queued decodes after yielding to the event loop.
fn spawn_decodes(state: &Shared) {
    let jobs = state.borrow_mut().pad.take_decode_jobs();
    for job in jobs {
        let state = state.clone();
        wasm_bindgen_futures::spawn_local(async move {
            yield_to_browser().await;
            let outcome = job.run();
            let changed = state.borrow_mut().pad.complete_decode(outcome);
            if changed {
                state.borrow_mut().render_or_log();
            }
            show_notices(&state);
        });
    }
}

async fn yield_to_browser() {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        if let Some(window) = web_sys::window() {
            let _ = window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, 0);
        }
    });
    let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
}

fn show_notices(state: &Shared) {
    let notices = state.borrow_mut().pad.take_notices();
    for notice in notices {
        if notice.is_error() {
            log::error!("{}", notice);
        } else {
            log::info!("{}", notice);
        }
        if let Ok(window) = window() {
            let _ = window.alert_with_message(&notice.to_string());
        }
    }
}

/// Offer bytes to the user as a file download.
fn download_binary_file(saved: &SavedImage, mime_type: &str) -> Result<(), JsValue> {
    let document = document()?;

    let uint8_array = js_sys::Uint8Array::from(saved.png.as_slice());
    let blob_parts = js_sys::Array::new();
    blob_parts.push(&uint8_array);

    let options = web_sys::BlobPropertyBag::new();
    options.set_type(mime_type);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&blob_parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let a = document
        .create_element("a")?
        .dyn_into::<web_sys::HtmlAnchorElement>()?;
    a.set_href(&url);
    a.set_download(&saved.file_name);
    a.click();

    web_sys::Url::revoke_object_url(&url)
}
