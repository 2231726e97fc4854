pub mod logging;
pub mod utils;
pub mod ui;
pub mod config;
pub mod error;
pub mod tween;
pub mod audio;
pub mod assets;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
use {
    std::cell::RefCell,
    std::rc::Rc,
    tracing::{error, info},
    wasm_bindgen::closure::Closure,
    wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue},
    wasm_bindgen_futures::spawn_local,
    web_sys::{Document, Event, HtmlCanvasElement, HtmlElement, KeyboardEvent, MouseEvent, Window},
    config::GameConfig,
    controller::input::wasm::{keyboard_event_to_input, mouse_move_to_input},
    controller::{FrameLoopContext, GameSession, InputEvent},
    view::{GpuContext, SceneRenderer},
};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    logging::init();
    let (window, document, canvas) = init_canvas()?;
    setup_app(&window, &document, &canvas).await
}

#[cfg(target_arch = "wasm32")]
async fn setup_app(window: &Window, document: &Document, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let gpu = GpuContext::new(canvas, canvas.width(), canvas.height())
        .await
        .map_err(|e| js_error(format!("GPU init failed: {e}")))?;
    let renderer = SceneRenderer::new(&gpu);

    let config = GameConfig::default();
    let session = Rc::new(RefCell::new(GameSession::new(config, gpu.config.width, gpu.config.height)));
    let egui_events: Rc<RefCell<Vec<egui::Event>>> = Rc::new(RefCell::new(Vec::new()));

    setup_input_listeners(document, window, canvas, session.clone(), egui_events.clone())?;
    spawn_asset_loads(&session);

    let mut frame_ctx = FrameLoopContext {
        session,
        gpu,
        renderer,
        canvas: canvas.clone(),
        egui_ctx: egui::Context::default(),
        egui_events,
        last_time: window.performance().map(|p| p.now()).unwrap_or(0.0),
    };

    let f = RcCellCallback::new(window.clone(), {
        let window_for_loop = window.clone();
        move || frame_ctx.frame(&window_for_loop)
    });
    f.start();

    Ok(())
}

/// Kick off every asset fetch; each one installs itself when it lands
#[cfg(target_arch = "wasm32")]
fn spawn_asset_loads(session: &Rc<RefCell<GameSession>>) {
    let config = session.borrow().config.clone();

    {
        let session = session.clone();
        let url = config.assets.resolve(&config.assets.scene);
        let names = config.names.clone();
        spawn_local(async move {
            match assets::fetch_bytes(&url).await.and_then(|bytes| assets::parse_level(&bytes, &url, &names)) {
                Ok(level) => {
                    info!("loaded level {} ({} objects)", url, level.scene.object_count());
                    session.borrow_mut().install_level(level);
                }
                Err(e) => error!("{e}"),
            }
        });
    }

    {
        let session = session.clone();
        let url = config.assets.resolve(&config.assets.scare_image);
        spawn_local(async move {
            match assets::fetch_bytes(&url).await.and_then(|bytes| assets::decode_image(&bytes, &url)) {
                Ok(image) => {
                    info!("loaded scare image {} ({}x{})", url, image.width, image.height);
                    session.borrow_mut().install_scare_image(image);
                }
                Err(e) => error!("{e}"),
            }
        });
    }

    for (kind, file) in [
        (audio::SoundKind::Thunder, &config.assets.thunder),
        (audio::SoundKind::Footsteps, &config.assets.footsteps),
    ] {
        let session = session.clone();
        let url = config.assets.resolve(file);
        let result = audio::web::load(&url, move |sound| {
            session.borrow_mut().install_sound(kind, Box::new(sound));
        });
        if let Err(e) = result {
            error!("failed to start loading {}: {:?}", url, e);
        }
    }
}

/// Route DOM events into the session and the egui event queue
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    canvas: &HtmlCanvasElement,
    session: Rc<RefCell<GameSession>>,
    egui_events: Rc<RefCell<Vec<egui::Event>>>,
) -> Result<(), JsValue> {
    // Keyboard down
    {
        let session = session.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            let mut session = session.borrow_mut();
            if session.controls_active() && session.input.is_bound(&e.key()) {
                e.prevent_default();
            }
            session.handle_input(&keyboard_event_to_input(&e, true));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    // Keyboard up
    {
        let session = session.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            session.borrow_mut().handle_input(&keyboard_event_to_input(&e, false));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    // Focus loss - clear all keys
    {
        let session = session.clone();
        let blur = Closure::wrap(Box::new(move |_e: Event| {
            session.borrow_mut().handle_input(&InputEvent::FocusLost);
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
        blur.forget();
    }

    // Visibility change - clear all keys
    {
        let session = session.clone();
        let doc_vis = document.clone();
        let visibility = Closure::wrap(Box::new(move |_e: Event| {
            let visible = !doc_vis.hidden();
            session.borrow_mut().handle_input(&InputEvent::VisibilityChanged { visible });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
        visibility.forget();
    }

    // Pointer lock change
    {
        let session = session.clone();
        let doc_pl = document.clone();
        let plc = Closure::wrap(Box::new(move |_e: Event| {
            let locked = doc_pl.pointer_lock_element().is_some();
            tracing::debug!("pointer lock: {}", locked);
            session.borrow_mut().handle_input(&InputEvent::PointerLockChanged { locked });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("pointerlockchange", plc.as_ref().unchecked_ref())?;
        plc.forget();
    }

    // Canvas click to enter pointer lock
    {
        let canvas_click = canvas.clone();
        let click = Closure::wrap(Box::new(move |_e: MouseEvent| {
            if let Ok(html_el) = canvas_click.clone().dyn_into::<HtmlElement>() {
                html_el.request_pointer_lock();
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        canvas.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;
        click.forget();
    }

    // Mouse move: look while locked, otherwise feed egui
    {
        let session = session.clone();
        let egui_events_q = egui_events.clone();
        let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
            let mut session = session.borrow_mut();
            if session.controls_active() {
                session.handle_input(&mouse_move_to_input(&e));
            } else {
                let pos = egui::pos2(e.client_x() as f32, e.client_y() as f32);
                egui_events_q.borrow_mut().push(egui::Event::PointerMoved(pos));
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
        mm.forget();
    }

    // Mouse buttons for the overlay while unlocked
    for (name, pressed) in [("mousedown", true), ("mouseup", false)] {
        let session = session.clone();
        let egui_events_q = egui_events.clone();
        let button = Closure::wrap(Box::new(move |e: MouseEvent| {
            if session.borrow().controls_active() || e.button() != 0 {
                return;
            }
            egui_events_q.borrow_mut().push(egui::Event::PointerButton {
                pos: egui::pos2(e.client_x() as f32, e.client_y() as f32),
                button: egui::PointerButton::Primary,
                pressed,
                modifiers: egui::Modifiers::default(),
            });
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback(name, button.as_ref().unchecked_ref())?;
        button.forget();
    }

    Ok(())
}

/// Full-window canvas sized in device pixels
#[cfg(target_arch = "wasm32")]
fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
    let window = web_sys::window().ok_or(js_error("no global `window`"))?;
    let document = window.document().ok_or(js_error("no document on window"))?;
    let body = document.body().ok_or(js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;

    let dpr = window.device_pixel_ratio();
    let width = window.inner_width()?.as_f64().unwrap_or(800.0) * dpr;
    let height = window.inner_height()?.as_f64().unwrap_or(600.0) * dpr;
    canvas_el.set_width(width.max(1.0) as u32);
    canvas_el.set_height(height.max(1.0) as u32);
    canvas_el.set_attribute("style", "display: block; width: 100vw; height: 100vh;")?;
    body.set_attribute("style", "margin: 0; overflow: hidden; background: #000;")?;
    body.append_child(&canvas_el)?;
    Ok((window, document, canvas_el))
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

/// Self-rescheduling requestAnimationFrame callback
#[cfg(target_arch = "wasm32")]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut()>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn start(self) {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            inner.borrow_mut().as_mut()();

            // Recursively schedule next frame
            if let Some(cb) = callback_clone.borrow().as_ref() {
                if let Err(e) = window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                    error!("requestAnimationFrame failed: {:?}", e);
                }
            }
        }) as Box<dyn FnMut()>));

        if let Some(cb) = callback.borrow().as_ref() {
            if let Err(e) = self.window.request_animation_frame(cb.as_ref().unchecked_ref()) {
                error!("requestAnimationFrame failed: {:?}", e);
            }
        }

        // Leak the closure to keep it alive
        std::mem::forget(callback);
    }
}
