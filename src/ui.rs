use egui::Context;

use crate::controller::{ScarePhase, SessionStatus};

/// Build the overlay and return egui output
pub fn build_ui(egui_ctx: &Context, raw_input: egui::RawInput, status: &SessionStatus, dt: f32) -> egui::FullOutput {
    egui_ctx.run(raw_input, |ctx| {
        draw_crosshair(ctx);
        draw_debug_window(ctx, status, dt);
        if !status.controls_active {
            draw_play_hint(ctx, status.level_loaded);
        }
    })
}

fn draw_crosshair(ctx: &Context) {
    let painter = ctx.layer_painter(egui::LayerId::new(egui::Order::TOP, egui::Id::new("crosshair")));
    let center = ctx.available_rect().center();
    let size = 6.0;
    let stroke = egui::Stroke::new(1.0, egui::Color32::from_white_alpha(180));
    painter.line_segment(
        [egui::Pos2::new(center.x - size, center.y), egui::Pos2::new(center.x + size, center.y)],
        stroke,
    );
    painter.line_segment(
        [egui::Pos2::new(center.x, center.y - size), egui::Pos2::new(center.x, center.y + size)],
        stroke,
    );
}

fn phase_label(phase: ScarePhase) -> &'static str {
    match phase {
        ScarePhase::Idle => "idle",
        ScarePhase::Triggered => "triggered",
        ScarePhase::FlashActive { .. } => "flash",
    }
}

fn door_label(door_open: Option<bool>) -> &'static str {
    match door_open {
        Some(true) => "open",
        Some(false) => "closed",
        None => "missing",
    }
}

/// Lines shown in the debug window
pub fn status_lines(status: &SessionStatus, dt: f32) -> Vec<String> {
    let p = status.position;
    vec![
        format!("FPS: {:.0}", if dt > 0.0 { 1.0 / dt } else { 0.0 }),
        format!("Pos: x: {:.1} y: {:.1} z: {:.1}", p.x, p.y, p.z),
        format!("Grounded: {}", status.on_ground),
        format!("Door: {}", door_label(status.door_open)),
        format!("Scare: {}", phase_label(status.scare_phase)),
    ]
}

fn draw_debug_window(ctx: &Context, status: &SessionStatus, dt: f32) {
    egui::Window::new("Debug")
        .default_pos([8.0, 8.0])
        .collapsible(true)
        .show(ctx, |ui| {
            for line in status_lines(status, dt) {
                ui.label(egui::RichText::new(line).small());
            }
            ui.separator();
            ui.label(egui::RichText::new("WASD - Move").small());
            ui.label(egui::RichText::new("Space - Open door").small());
            ui.label(egui::RichText::new("Esc - Release mouse").small());
        });
}

fn draw_play_hint(ctx: &Context, level_loaded: bool) {
    let text = if level_loaded { "Click to play" } else { "Loading..." };
    egui::Area::new(egui::Id::new("play_hint"))
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 40.0])
        .show(ctx, |ui| {
            ui.label(egui::RichText::new(text).size(20.0).color(egui::Color32::WHITE));
        });
}
