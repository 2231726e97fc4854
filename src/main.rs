use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowId};

use hauntus::audio::native::AudioOutput;
use hauntus::audio::SoundKind;
use hauntus::config::GameConfig;
use hauntus::controller::{clamp_frame_dt, GameSession, InputEvent};
use hauntus::error::GpuInitError;
use hauntus::view::{gpu_init, GpuContext, OverlayFrame, SceneRenderer};
use hauntus::{assets, logging, ui};

/// Everything that exists once the window is up
struct Game {
    window: Arc<Window>,
    gpu: GpuContext,
    renderer: SceneRenderer,
    egui_state: egui_winit::State,
    egui_ctx: egui::Context,
    session: GameSession,
    _audio: Option<AudioOutput>,
    last_frame_time: Instant,
}

impl Game {
    fn new(window: Arc<Window>) -> Result<Self, GpuInitError> {
        let size = window.inner_size();
        let instance = gpu_init::create_instance();
        let surface = instance.create_surface(window.clone())?;
        let gpu = pollster::block_on(GpuContext::new_native(&instance, surface, size.width, size.height))?;
        let renderer = SceneRenderer::new(&gpu);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            None,
            None,
            None,
        );

        let mut session = GameSession::new(GameConfig::from_env(), gpu.config.width, gpu.config.height);
        let audio = match AudioOutput::new() {
            Ok(out) => Some(out),
            Err(e) => {
                warn!("audio disabled: {e}");
                None
            }
        };
        load_assets(&mut session, audio.as_ref());

        Ok(Self {
            window,
            gpu,
            renderer,
            egui_state,
            egui_ctx,
            session,
            _audio: audio,
            last_frame_time: Instant::now(),
        })
    }

    fn set_locked(&mut self, locked: bool) {
        if locked {
            let grab = self
                .window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(e) = grab {
                warn!("cursor grab failed: {e}");
                return;
            }
        } else {
            let _ = self.window.set_cursor_grab(CursorGrabMode::None);
        }
        self.window.set_cursor_visible(!locked);
        self.session.handle_input(&InputEvent::PointerLockChanged { locked });
    }

    fn keyboard(&mut self, event: &KeyEvent) {
        let pressed = event.state == ElementState::Pressed;
        if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
            if pressed && self.session.controls_active() {
                self.set_locked(false);
            }
            return;
        }
        // rebound keys fall back to the layout's character
        let name = match event.physical_key {
            PhysicalKey::Code(code) => key_name(code).map(str::to_string),
            PhysicalKey::Unidentified(_) => None,
        }
        .or_else(|| match &event.logical_key {
            Key::Character(text) => Some(text.to_string()),
            _ => None,
        });
        if let Some(name) = name {
            let event = if pressed { InputEvent::KeyDown(name) } else { InputEvent::KeyUp(name) };
            self.session.handle_input(&event);
        }
    }

    fn redraw(&mut self) {
        let now = Instant::now();
        let dt = clamp_frame_dt((now - self.last_frame_time).as_secs_f32());
        self.last_frame_time = now;

        self.session.tick(dt);

        let raw_input = self.egui_state.take_egui_input(&self.window);
        let egui::FullOutput { platform_output, textures_delta, shapes, pixels_per_point, .. } =
            ui::build_ui(&self.egui_ctx, raw_input, &self.session.status(), dt);
        self.egui_state.handle_platform_output(&self.window, platform_output);
        let primitives = self.egui_ctx.tessellate(shapes, pixels_per_point);

        let overlay = OverlayFrame { primitives, textures_delta, pixels_per_point };
        self.renderer.render(&self.gpu, &self.session.scene, &self.session.camera, Some(overlay));
    }
}

/// Level, scare image and sounds from the asset directory
fn load_assets(session: &mut GameSession, audio: Option<&AudioOutput>) {
    let files = session.config.assets.clone();
    let names = session.config.names.clone();

    let scene_path = files.resolve(&files.scene);
    match assets::read_file(&scene_path).and_then(|bytes| assets::parse_level(&bytes, &scene_path, &names)) {
        Ok(level) => {
            info!("loaded level {} ({} objects)", scene_path, level.scene.object_count());
            session.install_level(level);
        }
        Err(e) => error!("{e}"),
    }

    let image_path = files.resolve(&files.scare_image);
    match assets::read_file(&image_path).and_then(|bytes| assets::decode_image(&bytes, &image_path)) {
        Ok(image) => session.install_scare_image(image),
        Err(e) => error!("{e}"),
    }

    let Some(audio) = audio else { return };
    for (kind, file) in [(SoundKind::Thunder, &files.thunder), (SoundKind::Footsteps, &files.footsteps)] {
        match audio.load(&files.resolve(file)) {
            Ok(sound) => session.install_sound(kind, Box::new(sound)),
            Err(e) => error!("{e}"),
        }
    }
}

/// Browser-style key strings for the bound physical keys
fn key_name(code: KeyCode) -> Option<&'static str> {
    match code {
        KeyCode::KeyW => Some("w"),
        KeyCode::KeyA => Some("a"),
        KeyCode::KeyS => Some("s"),
        KeyCode::KeyD => Some("d"),
        KeyCode::Space => Some(" "),
        _ => None,
    }
}

#[derive(Default)]
struct App {
    game: Option<Game>,
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.game.is_some() {
            return;
        }
        let attributes = Window::default_attributes()
            .with_title("Hauntus")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        match Game::new(window) {
            Ok(game) => self.game = Some(game),
            Err(e) => {
                error!("{e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(game) = self.game.as_mut() else { return };
        if window_id != game.window.id() {
            return;
        }

        // the overlay only takes input while the cursor is free
        let consumed = game.egui_state.on_window_event(&game.window, &event).consumed;
        if consumed && !game.session.controls_active() {
            return;
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                game.renderer.resize(&mut game.gpu, size.width, size.height);
                game.session.resize(size.width.max(1), size.height.max(1));
            }
            WindowEvent::Focused(false) => {
                game.session.handle_input(&InputEvent::FocusLost);
                if game.session.controls_active() {
                    game.set_locked(false);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => game.keyboard(&event),
            WindowEvent::MouseInput { state: ElementState::Pressed, button: MouseButton::Left, .. } => {
                if !game.session.controls_active() {
                    game.set_locked(true);
                }
            }
            WindowEvent::RedrawRequested => game.redraw(),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(game) = self.game.as_mut() else { return };
        if let DeviceEvent::MouseMotion { delta } = event {
            game.session.handle_input(&InputEvent::MouseMove { dx: delta.0 as f32, dy: delta.1 as f32 });
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(game) = &self.game {
            game.window.request_redraw();
        }
    }
}

fn main() {
    logging::init();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("failed to create event loop: {e}");
            return;
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::default();
    if let Err(e) = event_loop.run_app(&mut app) {
        error!("event loop error: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bound_keys_use_browser_names() {
        assert_eq!(key_name(KeyCode::KeyW), Some("w"));
        assert_eq!(key_name(KeyCode::Space), Some(" "));
        assert_eq!(key_name(KeyCode::KeyQ), None);
    }
}
