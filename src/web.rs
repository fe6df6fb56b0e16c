#![cfg(target_arch = "wasm32")]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{anyhow, Result};
use js_sys::Uint8Array;
use log::{error, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Element, HtmlCanvasElement, MouseEvent, WheelEvent};

use crate::app::{camera_params, light_params};
use crate::assets::{self, AssetLoader, FetchMode, MemorySource, MODEL_PATH};
use crate::controls::OrbitControls;
use crate::page::{MountedPage, Page};
use crate::render::Renderer;
use crate::scene::SceneDescriptor;
use crate::timer::{IntervalId, TimerCallback, TimerHost};

#[wasm_bindgen(start)]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Timer host backed by `window.setInterval`.
pub struct BrowserTimerHost {
    window: web_sys::Window,
    next_id: Cell<u64>,
    active: RefCell<HashMap<IntervalId, (i32, Closure<dyn FnMut()>)>>,
}

impl BrowserTimerHost {
    pub fn new() -> Result<Self> {
        Ok(Self {
            window: window().ok_or_else(|| anyhow!("window not available"))?,
            next_id: Cell::new(0),
            active: RefCell::new(HashMap::new()),
        })
    }
}

impl TimerHost for BrowserTimerHost {
    fn set_interval(&self, period_ms: u32, mut callback: TimerCallback) -> IntervalId {
        let id = IntervalId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let closure = Closure::wrap(Box::new(move || callback()) as Box<dyn FnMut()>);
        let timeout = i32::try_from(period_ms).unwrap_or(i32::MAX);
        match self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                timeout,
            ) {
            Ok(handle) => {
                self.active.borrow_mut().insert(id, (handle, closure));
            }
            Err(err) => error!("setInterval failed: {err:?}"),
        }
        id
    }

    fn clear_interval(&self, id: IntervalId) {
        if let Some((handle, _closure)) = self.active.borrow_mut().remove(&id) {
            self.window.clear_interval_with_handle(handle);
        }
    }
}

/// Handle returned to JavaScript. Keeps the page mounted until [`WasmApp::stop`].
#[wasm_bindgen]
pub struct WasmApp {
    inner: Rc<RefCell<AppState>>,
}

/// Mounts the page, drawing its scene into the canvas with id `canvas_id`.
/// `model_bytes` holds the OBJ model served at `/Model/scene.obj`.
#[wasm_bindgen(js_name = start)]
pub fn start_page(canvas_id: String, model_bytes: Uint8Array) -> Result<WasmApp, JsValue> {
    let app = WasmApp::mount(&canvas_id, model_bytes.to_vec())
        .map_err(|err| JsValue::from_str(&format!("{err:#}")))?;
    schedule_animation_loop(Rc::clone(&app.inner))
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    Ok(app)
}

impl WasmApp {
    fn mount(canvas_id: &str, model: Vec<u8>) -> Result<Self> {
        let window = window().ok_or_else(|| anyhow!("window not available"))?;
        let document = window
            .document()
            .ok_or_else(|| anyhow!("document not available"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| anyhow!("canvas element {canvas_id} not found"))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| anyhow!("element {canvas_id} is not a canvas"))?;
        let quote_element = document.get_element_by_id("quote");

        if assets::global().is_some() {
            warn!("page already started once; reusing the loaded model");
        }
        let loader = assets::install_global(AssetLoader::new(
            MemorySource::new().with_file(MODEL_PATH, model),
            FetchMode::Deferred,
        ));

        let host: Rc<dyn TimerHost> = Rc::new(BrowserTimerHost::new()?);
        let page = Page::new(SceneDescriptor::default()).mount(host, loader);
        let controls = page.page().composer().controls();
        let renderer = Renderer::new(canvas.clone())?;
        let started = now_ms();

        let inner = Rc::new(RefCell::new(AppState {
            page: Some(page),
            renderer,
            controls,
            pointer: PointerState::default(),
            quote_element,
            shown_quote: None,
            started,
            last_frame: started,
            listeners: Vec::new(),
        }));
        attach_pointer(&canvas, &inner)?;
        Ok(Self { inner })
    }
}

#[wasm_bindgen]
impl WasmApp {
    /// Text of the quote currently shown.
    pub fn quote(&self) -> Option<String> {
        let state = self.inner.borrow();
        let page = state.page.as_ref()?;
        page.carousel()
            .current()
            .map(|quote| format!("\"{}\" - {}", quote.text, quote.author))
    }

    /// Funding bar width, e.g. `"40%"`.
    pub fn progress(&self) -> String {
        self.inner
            .borrow()
            .page
            .as_ref()
            .map(|page| page.funding().progress().bar_width)
            .unwrap_or_else(|| "0%".to_string())
    }

    pub fn pledge(&self, amount: f64) -> bool {
        self.inner
            .borrow_mut()
            .page
            .as_mut()
            .map_or(false, |page| page.record_pledge(amount))
    }

    /// Unmounts the page: the quote rotation and the render loop stop.
    pub fn stop(&self) {
        let mut state = self.inner.borrow_mut();
        if let Some(page) = state.page.take() {
            page.unmount();
        }
        state.listeners.clear();
    }
}

#[derive(Default)]
struct PointerState {
    dragging: bool,
    last: Option<(f32, f32)>,
}

struct AppState {
    page: Option<MountedPage<'static>>,
    renderer: Renderer,
    controls: OrbitControls,
    pointer: PointerState,
    quote_element: Option<Element>,
    shown_quote: Option<usize>,
    started: f64,
    last_frame: f64,
    listeners: Vec<EventListener>,
}

impl AppState {
    fn render_frame(&mut self) -> Result<bool> {
        let Some(page) = self.page.as_ref() else {
            return Ok(false);
        };
        page.pump();

        let now = now_ms();
        let dt = ((now - self.last_frame) / 1000.0) as f32;
        self.last_frame = now;
        self.controls.update(dt);

        let index = page.carousel().index();
        if self.shown_quote != Some(index) {
            if let (Some(element), Some(quote)) = (&self.quote_element, page.carousel().current()) {
                element.set_text_content(Some(&format!("\"{}\" - {}", quote.text, quote.author)));
            }
            self.shown_quote = Some(index);
        }

        let graph = page.scene();
        let camera = camera_params(&graph, &self.controls, self.renderer.aspect());
        let light = light_params(&graph, self.controls.target);
        let elapsed = ((now - self.started) / 1000.0) as f32;
        let twinkle = graph.stars().map_or(1.0, |stars| stars.twinkle(elapsed));
        self.renderer.update_globals(&camera, &light, twinkle);
        self.renderer.render(&graph).map_err(|err| {
            let message = err
                .as_string()
                .unwrap_or_else(|| "unknown canvas error".to_string());
            anyhow!("render failed: {message}")
        })?;
        Ok(true)
    }
}

fn now_ms() -> f64 {
    window()
        .and_then(|window| window.performance())
        .map_or(0.0, |performance| performance.now())
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn request_frame(frame: &FrameCallback) -> Result<()> {
    let window = window().ok_or_else(|| anyhow!("window not available"))?;
    let frame = frame.borrow();
    let closure = frame
        .as_ref()
        .ok_or_else(|| anyhow!("render loop already stopped"))?;
    window
        .request_animation_frame(closure.as_ref().unchecked_ref())
        .map_err(|err| anyhow!("requestAnimationFrame failed: {err:?}"))?;
    Ok(())
}

/// Renders one frame per animation frame until the page is unmounted.
fn schedule_animation_loop(app: Rc<RefCell<AppState>>) -> Result<()> {
    let frame: FrameCallback = Rc::new(RefCell::new(None));
    let next = Rc::clone(&frame);

    *frame.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        let running = match app.borrow_mut().render_frame() {
            Ok(running) => running,
            Err(err) => {
                error!("{err:#}");
                true
            }
        };
        if !running {
            info!("render loop stopped");
            let _ = next.borrow_mut().take();
            return;
        }
        if let Err(err) = request_frame(&next) {
            error!("{err:#}");
        }
    }) as Box<dyn FnMut()>));

    request_frame(&frame)
}

/// Registered DOM listener, removed again when dropped.
struct EventListener {
    target: web_sys::EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

impl EventListener {
    fn new(
        target: &web_sys::EventTarget,
        kind: &'static str,
        handler: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Self> {
        let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(web_sys::Event)>);
        target
            .add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())
            .map_err(|err| anyhow!("failed to listen for {kind}: {err:?}"))?;
        Ok(Self {
            target: target.clone(),
            kind,
            closure,
        })
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.closure.as_ref().unchecked_ref());
    }
}

fn attach_pointer(canvas: &HtmlCanvasElement, app: &Rc<RefCell<AppState>>) -> Result<()> {
    let target: &web_sys::EventTarget = canvas.as_ref();
    let mut listeners = Vec::with_capacity(4);

    let state = Rc::clone(app);
    listeners.push(EventListener::new(target, "mousedown", move |event| {
        if let Some(event) = event.dyn_ref::<MouseEvent>() {
            let mut state = state.borrow_mut();
            state.pointer.dragging = true;
            state.pointer.last = Some((event.client_x() as f32, event.client_y() as f32));
        }
    })?);

    let state = Rc::clone(app);
    listeners.push(EventListener::new(target, "mouseup", move |_| {
        let mut state = state.borrow_mut();
        state.pointer.dragging = false;
        state.pointer.last = None;
    })?);

    let state = Rc::clone(app);
    listeners.push(EventListener::new(target, "mousemove", move |event| {
        let Some(event) = event.dyn_ref::<MouseEvent>() else {
            return;
        };
        let mut state = state.borrow_mut();
        let position = (event.client_x() as f32, event.client_y() as f32);
        if let (true, Some(last)) = (state.pointer.dragging, state.pointer.last) {
            state.controls.rotate(position.0 - last.0, position.1 - last.1);
        }
        state.pointer.last = Some(position);
    })?);

    let state = Rc::clone(app);
    listeners.push(EventListener::new(target, "wheel", move |event| {
        if let Some(event) = event.dyn_ref::<WheelEvent>() {
            state
                .borrow_mut()
                .controls
                .zoom(-(event.delta_y() as f32) / 100.0);
        }
    })?);

    app.borrow_mut().listeners = listeners;
    Ok(())
}
