use crate::capture::{
    ContactId, ContactPhase, ContactSample, FrameTracker, TouchFrame, POINTER_CONTACT_ID,
};
use crate::config::ConfigStore;
use crate::cursor::CursorShape;
use crate::desktop::DesktopHost;
use crate::dimensions::{click_button_cells, scaled_key_rect};
use crate::focus::ForegroundSnapshot;
use crate::inject::{InjectionBackend, MouseButton};
use crate::keys::{shifted_label, ModifierKind, VirtualKey};
use crate::layout::{content_size, KeyboardLayout};
use crate::modifiers::ModifierSnapshot;
use crate::motion::{MouseMode, StickVisual};
use crate::orchestrator::{
    ClickAction, InputOutcome, OverlayCommand, SurfaceRole, WindowOrchestrator, EDIT_DONE_BUTTON,
};
use crate::render::{self, KeyHighlight};
use egui::{Pos2, Rect, Vec2, ViewportBuilder, ViewportCommand, ViewportId};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// Upper bound on how long the UI sleeps while background channels are open.
const CHANNEL_POLL: Duration = Duration::from_millis(16);

const CLICK_BUTTONS: [(ClickAction, &str); 4] = [
    (ClickAction::Click(MouseButton::Left), "L"),
    (ClickAction::Click(MouseButton::Middle), "M"),
    (ClickAction::Click(MouseButton::Right), "R"),
    (ClickAction::Hold, "Hold"),
];

pub type Orchestrator = WindowOrchestrator<Box<dyn InjectionBackend>, Box<dyn DesktopHost>>;

fn viewport_id(role: SurfaceRole) -> ViewportId {
    ViewportId::from_hash_of(role.title())
}

fn cursor_viewport_id() -> ViewportId {
    ViewportId::from_hash_of("tapdeck cursor")
}

/// Input collected from one surface viewport during a frame.
#[derive(Default)]
struct SurfaceInput {
    samples: Vec<ContactSample>,
    keys: Vec<VirtualKey>,
    clicks: Vec<ClickAction>,
    done: bool,
}

pub struct TapdeckApp {
    orchestrator: Orchestrator,
    config: ConfigStore,
    layout: KeyboardLayout,
    layout_input: String,
    layout_error: Option<String>,
    raw_rx: Option<mpsc::Receiver<TouchFrame>>,
    frames: FrameTracker,
    focus_rx: Option<mpsc::Receiver<ForegroundSnapshot>>,
    labels: (ModifierSnapshot, bool),
    stick: Vec2,
    cursor: Option<(Pos2, CursorShape)>,
    click_through: bool,
    /// Set once egui reports real touch events; synthesized pointer events
    /// are ignored from then on.
    touch_seen: bool,
    pointer_down: [bool; 4],
    pointer_touching: bool,
    screen_known: bool,
    shut_down: bool,
}

impl TapdeckApp {
    pub fn new(
        orchestrator: Orchestrator,
        config: ConfigStore,
        layout: KeyboardLayout,
        raw_rx: Option<mpsc::Receiver<TouchFrame>>,
        focus_rx: Option<mpsc::Receiver<ForegroundSnapshot>>,
    ) -> Self {
        let layout_input = config.config().last_used_layout.clone();
        Self {
            orchestrator,
            config,
            layout,
            layout_input,
            layout_error: None,
            raw_rx,
            frames: FrameTracker::new(),
            focus_rx,
            labels: (ModifierSnapshot::default(), false),
            stick: Vec2::ZERO,
            cursor: None,
            click_through: false,
            touch_seen: false,
            pointer_down: [false; 4],
            pointer_touching: false,
            screen_known: false,
            shut_down: false,
        }
    }

    fn drain_channels(&mut self, now: Instant) {
        if let Some(rx) = &self.focus_rx {
            while let Ok(snapshot) = rx.try_recv() {
                self.orchestrator.observe_foreground(snapshot);
            }
        }
        let screen = self.orchestrator.dimensions().screen();
        let mut samples = Vec::new();
        if let Some(rx) = &self.raw_rx {
            while let Ok(frame) = rx.try_recv() {
                samples.extend(self.frames.update(&frame, screen));
            }
        }
        for sample in samples {
            self.orchestrator.on_raw_touch(sample, now);
        }
    }

    fn apply_commands(&mut self, ctx: &egui::Context) {
        for command in self.orchestrator.drain_commands() {
            match command {
                OverlayCommand::SetClickThrough(on) => {
                    self.click_through = on;
                    for role in SurfaceRole::ALL {
                        ctx.send_viewport_cmd_to(viewport_id(role), ViewportCommand::MousePassthrough(on));
                    }
                }
                OverlayCommand::StickVisual(StickVisual::Offset(offset)) => self.stick = offset,
                OverlayCommand::StickVisual(StickVisual::ResetToCenter) => self.stick = Vec2::ZERO,
                OverlayCommand::RefreshKeyLabels {
                    modifiers,
                    caps_lock,
                } => self.labels = (modifiers, caps_lock),
                OverlayCommand::Persist(update) => self.config.apply_update(&update),
                OverlayCommand::PersistEditMode(enabled) => {
                    self.config.config_mut().edit_mode = enabled;
                    self.config.persist();
                }
                OverlayCommand::PersistMouseMode(mode) => {
                    self.config.config_mut().mouse_mode = mode;
                    self.config.persist();
                }
                OverlayCommand::CursorOverlay { position, shape } => {
                    self.cursor = Some((position, shape))
                }
            }
        }
    }

    fn load_layout(&mut self, now: Instant) {
        match KeyboardLayout::resolve(self.layout_input.trim()) {
            Ok(layout) => {
                self.orchestrator.reload_layout(
                    content_size(&layout.left_keys),
                    content_size(&layout.right_keys),
                    now,
                );
                self.layout = layout;
                self.layout_error = None;
                self.config.config_mut().last_used_layout = self.layout_input.trim().to_string();
                self.config.persist();
            }
            Err(e) => {
                tracing::warn!(layout = %self.layout_input, error = %e, "failed to load layout");
                self.layout_error = Some(e.to_string());
            }
        }
    }

    fn control_panel(&mut self, ctx: &egui::Context, now: Instant) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("tapdeck");
            ui.horizontal(|ui| {
                let label = if self.orchestrator.is_visible() { "Hide" } else { "Show" };
                if ui.button(label).clicked() {
                    self.orchestrator.toggle_visibility(now);
                }
                let mut edit = self.orchestrator.edit_mode();
                if ui.checkbox(&mut edit, "Edit mode").changed() {
                    self.orchestrator.set_edit_mode(edit, now);
                }
            });

            ui.horizontal(|ui| {
                ui.label("Mouse:");
                let mut mode = self.orchestrator.mouse_mode();
                for (value, text) in [
                    (MouseMode::Off, "Off"),
                    (MouseMode::Trackpoint, "Trackpoint"),
                    (MouseMode::Trackpad, "Trackpad"),
                ] {
                    ui.radio_value(&mut mode, value, text);
                }
                if mode != self.orchestrator.mouse_mode() {
                    self.orchestrator.set_mouse_mode(mode, now);
                }
            });

            ui.horizontal(|ui| {
                ui.label("Layout:");
                ui.text_edit_singleline(&mut self.layout_input);
                if ui.button("Load").clicked() {
                    self.load_layout(now);
                }
            });
            if let Some(error) = &self.layout_error {
                ui.colored_label(render::ORANGE, error);
            }

            if ui.button("Reset placement").clicked() {
                self.config.reset();
                tracing::info!("config reset; restart to apply default placement");
            }
            ui.separator();
            ui.label(format!("config: {}", self.config.path().display()));
            ui.label(format!(
                "injection: {}",
                self.orchestrator.injector().backend().name()
            ));
        });
    }

    fn show_surface(&mut self, ctx: &egui::Context, role: SurfaceRole, now: Instant) {
        let surface = self.orchestrator.surface(role).clone();
        if !surface.visible() {
            return;
        }
        let rect = surface.rect(now);
        let builder = ViewportBuilder::default()
            .with_title(role.title())
            .with_position(rect.min)
            .with_inner_size(rect.size())
            .with_decorations(false)
            .with_transparent(true)
            .with_always_on_top()
            .with_taskbar(false)
            .with_resizable(false)
            .with_mouse_passthrough(self.click_through);

        let raw_pointer = role == SurfaceRole::Pointer && self.raw_rx.is_some();
        let mut input = SurfaceInput::default();
        ctx.show_viewport_immediate(viewport_id(role), builder, |ctx, _class| {
            egui::CentralPanel::default()
                .frame(egui::Frame::NONE)
                .show(ctx, |ui| {
                    let local = Rect::from_min_size(Pos2::ZERO, rect.size());
                    let painter = ui.painter();
                    render::draw_surface_frame(painter, local, surface.opacity, surface.edit_mode);

                    match role {
                        SurfaceRole::LeftKeyboard | SurfaceRole::RightKeyboard => {
                            let keys = self.layout.keys(role == SurfaceRole::RightKeyboard);
                            let (modifiers, caps_lock) = self.labels;
                            for (i, key) in keys.iter().enumerate() {
                                let key_rect =
                                    scaled_key_rect(Pos2::ZERO, key.rect(), surface.scale_factor);
                                let response = ui.interact(
                                    key_rect,
                                    ui.id().with((role, i)),
                                    egui::Sense::click(),
                                );
                                let highlight = highlight_for(key.virtual_key_code, modifiers);
                                let label = shifted_label(&key.label, modifiers.shift, caps_lock);
                                render::draw_key(
                                    ui.painter(),
                                    key_rect,
                                    &label,
                                    highlight,
                                    response.is_pointer_button_down_on(),
                                    surface.opacity,
                                    surface.scale_factor,
                                );
                                if response.clicked() {
                                    input.keys.push(key.virtual_key_code);
                                }
                            }
                        }
                        SurfaceRole::Pointer => match self.orchestrator.mouse_mode() {
                            MouseMode::Trackpad => render::draw_trackpad(
                                painter,
                                local,
                                self.pointer_touching,
                                surface.opacity,
                            ),
                            _ => render::draw_trackpoint(painter, local, self.stick, surface.opacity),
                        },
                        SurfaceRole::ClickButtons => {
                            let cells: [Rect; 4] = click_button_cells(local);
                            for (cell, (action, label)) in cells.into_iter().zip(CLICK_BUTTONS) {
                                let response =
                                    ui.interact(cell, ui.id().with(label), egui::Sense::click());
                                let active = action == ClickAction::Hold
                                    && self.orchestrator.hold_active();
                                render::draw_click_button(
                                    ui.painter(),
                                    cell,
                                    label,
                                    active || response.is_pointer_button_down_on(),
                                    surface.opacity,
                                );
                                if response.clicked() {
                                    input.clicks.push(action);
                                }
                            }
                        }
                    }

                    if surface.edit_mode {
                        let done = Rect::from_min_size(
                            Pos2::new(local.max.x - EDIT_DONE_BUTTON.x, 0.0),
                            EDIT_DONE_BUTTON,
                        )
                        .shrink(4.0);
                        render::draw_done_button(ui.painter(), done);
                        if ui.interact(done, ui.id().with("done"), egui::Sense::click()).clicked() {
                            input.done = true;
                        }
                    }
                });

            if !raw_pointer {
                input.samples = self.collect_samples(ctx, role, rect.min);
            }
        });

        for vk in input.keys {
            self.orchestrator.on_key_press(vk, now);
        }
        for action in input.clicks {
            self.orchestrator.on_click_button(action, now);
        }
        for sample in input.samples {
            if role == SurfaceRole::Pointer {
                self.pointer_touching = sample.phase != ContactPhase::Up;
            }
            let outcome = self.orchestrator.on_surface_sample(role, sample, now);
            if outcome == InputOutcome::Consumed {
                tracing::trace!(?role, "sample consumed");
            }
        }
        if input.done {
            self.orchestrator.set_edit_mode(false, now);
        }
    }

    /// Touch or pointer events of one viewport as samples in screen
    /// coordinates.
    fn collect_samples(&mut self, ctx: &egui::Context, role: SurfaceRole, origin: Pos2) -> Vec<ContactSample> {
        let events = ctx.input(|i| i.events.clone());
        let offset = origin.to_vec2();
        let mut samples = Vec::new();
        for event in events {
            match event {
                egui::Event::Touch { id, phase, pos, .. } => {
                    self.touch_seen = true;
                    let id = id.0 as ContactId;
                    let at = pos + offset;
                    samples.push(match phase {
                        egui::TouchPhase::Start => ContactSample::down(id, at),
                        egui::TouchPhase::Move => ContactSample::moved(id, at),
                        egui::TouchPhase::End | egui::TouchPhase::Cancel => {
                            ContactSample::up(id, at)
                        }
                    });
                }
                _ if self.touch_seen => {}
                egui::Event::PointerButton {
                    pos,
                    button: egui::PointerButton::Primary,
                    pressed,
                    ..
                } => {
                    self.pointer_down[role.index()] = pressed;
                    let at = pos + offset;
                    samples.push(if pressed {
                        ContactSample::down(POINTER_CONTACT_ID, at)
                    } else {
                        ContactSample::up(POINTER_CONTACT_ID, at)
                    });
                }
                egui::Event::PointerMoved(pos) if self.pointer_down[role.index()] => {
                    samples.push(ContactSample::moved(POINTER_CONTACT_ID, pos + offset));
                }
                _ => {}
            }
        }
        samples
    }

    fn show_cursor(&mut self, ctx: &egui::Context) {
        let (Some(cursor_state), Some((position, shape))) = (self.orchestrator.cursor(), self.cursor)
        else {
            return;
        };
        if !self.orchestrator.is_visible() {
            return;
        }
        let viewport = cursor_state.viewport().as_vec2();
        let builder = ViewportBuilder::default()
            .with_title("tapdeck cursor")
            .with_position(Pos2::ZERO)
            .with_inner_size(viewport)
            .with_decorations(false)
            .with_transparent(true)
            .with_always_on_top()
            .with_taskbar(false)
            .with_mouse_passthrough(true);
        ctx.show_viewport_immediate(cursor_viewport_id(), builder, |ctx, _class| {
            egui::CentralPanel::default()
                .frame(egui::Frame::NONE)
                .show(ctx, |ui| render::draw_cursor(ui.painter(), position, shape));
        });
    }

    fn schedule_repaint(&self, ctx: &egui::Context, now: Instant) {
        if self.orchestrator.is_animating() {
            ctx.request_repaint();
            return;
        }
        let mut wait = self
            .orchestrator
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now));
        if self.raw_rx.is_some() || self.focus_rx.is_some() {
            wait = Some(wait.map_or(CHANNEL_POLL, |w| w.min(CHANNEL_POLL)));
        }
        if let Some(wait) = wait {
            ctx.request_repaint_after(wait);
        }
    }
}

fn highlight_for(vk: VirtualKey, modifiers: ModifierSnapshot) -> KeyHighlight {
    match vk.modifier() {
        Some(ModifierKind::Shift) if modifiers.shift_locked => KeyHighlight::Locked,
        Some(ModifierKind::Shift) if modifiers.shift => KeyHighlight::Active,
        Some(ModifierKind::Ctrl) if modifiers.ctrl => KeyHighlight::Active,
        Some(ModifierKind::Alt) if modifiers.alt => KeyHighlight::Active,
        Some(ModifierKind::Meta) if modifiers.meta => KeyHighlight::Active,
        _ => KeyHighlight::None,
    }
}

impl eframe::App for TapdeckApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        if !self.screen_known {
            if let Some(size) = ctx.input(|i| i.viewport().monitor_size) {
                self.orchestrator.set_screen_size(size.x, size.y);
                self.screen_known = true;
            }
        }

        if ctx.input(|i| i.viewport().close_requested()) && !self.shut_down {
            self.orchestrator.shutdown();
            self.apply_commands(ctx);
            self.shut_down = true;
            return;
        }

        self.drain_channels(now);
        self.orchestrator.tick(now);
        self.apply_commands(ctx);

        self.control_panel(ctx, now);
        for role in SurfaceRole::ALL {
            self.show_surface(ctx, role, now);
        }
        self.show_cursor(ctx);
        self.apply_commands(ctx);

        self.schedule_repaint(ctx, now);
    }
}
