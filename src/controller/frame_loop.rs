use std::cell::RefCell;
use std::rc::Rc;

use web_sys::{HtmlCanvasElement, Window};

use crate::controller::session::{clamp_frame_dt, GameSession};
use crate::ui;
use crate::view::{GpuContext, OverlayFrame, SceneRenderer};

/// Per-frame driver state for the browser build
pub struct FrameLoopContext {
    pub session: Rc<RefCell<GameSession>>,
    pub gpu: GpuContext,
    pub renderer: SceneRenderer,
    pub canvas: HtmlCanvasElement,
    pub egui_ctx: egui::Context,
    pub egui_events: Rc<RefCell<Vec<egui::Event>>>,
    pub last_time: f64,
}

impl FrameLoopContext {
    /// Advance the session by the elapsed frame time, then draw
    pub fn frame(&mut self, window: &Window) {
        let now = window.performance().map(|p| p.now()).unwrap_or(self.last_time);
        let dt = clamp_frame_dt(((now - self.last_time) / 1000.0) as f32);
        self.last_time = now;

        self.handle_resize(window);

        let mut session = self.session.borrow_mut();
        session.tick(dt);

        let dpr = window.device_pixel_ratio() as f32;
        let mut raw_input = egui::RawInput::default();
        raw_input.time = Some(now / 1000.0);
        raw_input.screen_rect = Some(egui::Rect::from_min_size(
            egui::Pos2::new(0.0, 0.0),
            egui::vec2(self.gpu.config.width as f32 / dpr, self.gpu.config.height as f32 / dpr),
        ));
        raw_input.events.extend(self.egui_events.borrow_mut().drain(..));
        self.egui_ctx.set_pixels_per_point(dpr);

        let mut full_output = ui::build_ui(&self.egui_ctx, raw_input, &session.status(), dt);
        let primitives = self.egui_ctx.tessellate(std::mem::take(&mut full_output.shapes), dpr);
        let overlay = OverlayFrame {
            primitives,
            textures_delta: full_output.textures_delta,
            pixels_per_point: dpr,
        };

        self.renderer.render(&self.gpu, &session.scene, &session.camera, Some(overlay));
    }

    fn handle_resize(&mut self, window: &Window) {
        if let (Ok(w), Ok(h)) = (window.inner_width(), window.inner_height()) {
            let dpr = window.device_pixel_ratio();
            let nw = (w.as_f64().unwrap_or(800.0) * dpr) as u32;
            let nh = (h.as_f64().unwrap_or(600.0) * dpr) as u32;
            if nw == 0 || nh == 0 {
                return;
            }
            if nw != self.gpu.config.width || nh != self.gpu.config.height {
                self.canvas.set_width(nw);
                self.canvas.set_height(nh);
                self.renderer.resize(&mut self.gpu, nw, nh);
                self.session.borrow_mut().resize(nw, nh);
            }
        }
    }
}
