//! Overlay window lifecycle and the input pipeline that runs through it.
//!
//! The orchestrator never touches a window directly. It owns the model of
//! every surface (position, scale, visibility, opacity), feeds contacts and
//! key presses through the modifier machine, movement models and injector,
//! and queues [`OverlayCommand`]s for the view layer to apply each frame.

pub mod click_through;
pub mod draggable;
pub mod overlap;
pub mod surface;

pub use surface::{OverlaySurface, SlideAnimation, SurfaceRole, Visibility};

use crate::capture::{ContactId, ContactPhase, ContactSample, GestureCapture};
use crate::config::{AppConfig, SurfaceConfigUpdate};
use crate::cursor::{CursorShape, CursorState};
use crate::desktop::DesktopHost;
use crate::dimensions::{pointer_base, Dimensions, MAX_USER_SCALE, MIN_USER_SCALE};
use crate::focus::{ForegroundSnapshot, FocusTracker, FOCUS_RESTORE_DELAY};
use crate::inject::{InjectionBackend, InputInjector, MouseButton};
use crate::keys::VirtualKey;
use crate::modifiers::{ModifierSnapshot, ModifierStateMachine};
use crate::motion::{model_for, Motion, MouseMode, MovementModel, StickVisual, SubPixel};
use crate::timer::{earliest, Deadline};
use click_through::{ClickStep, ClickThrough, CLICK_HOLD, CLICK_SETTLE};
use draggable::{DragBehavior, DragOutput};
use egui::{Pos2, Vec2};
use overlap::{avoid_overlap, right_left_edge, PairedSurface};
use std::collections::HashSet;
use std::time::{Duration, Instant};

pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(5);
pub const FADED_OPACITY: f32 = 0.25;
pub const SLIDE_DURATION: Duration = Duration::from_millis(250);
pub const CLICK_DEBOUNCE: Duration = Duration::from_millis(200);

/// The "done" control drawn in the top-right corner of a surface in edit
/// mode. Touches there never start a drag.
pub const EDIT_DONE_BUTTON: Vec2 = Vec2::new(64.0, 32.0);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrchestratorSettings {
    pub inactivity_timeout: Duration,
    pub faded_opacity: f32,
    pub slide_duration: Duration,
    pub click_debounce: Duration,
    pub click_settle: Duration,
    pub click_hold: Duration,
    pub focus_restore_delay: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            inactivity_timeout: INACTIVITY_TIMEOUT,
            faded_opacity: FADED_OPACITY,
            slide_duration: SLIDE_DURATION,
            click_debounce: CLICK_DEBOUNCE,
            click_settle: CLICK_SETTLE,
            click_hold: CLICK_HOLD,
            focus_restore_delay: FOCUS_RESTORE_DELAY,
        }
    }
}

/// Work for the view layer, drained once per frame.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayCommand {
    /// Make every overlay transparent to input (true) or hit-testable again.
    SetClickThrough(bool),
    StickVisual(StickVisual),
    RefreshKeyLabels {
        modifiers: ModifierSnapshot,
        caps_lock: bool,
    },
    Persist(SurfaceConfigUpdate),
    PersistEditMode(bool),
    PersistMouseMode(MouseMode),
    CursorOverlay {
        position: Pos2,
        shape: CursorShape,
    },
}

/// What happened to one input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputOutcome {
    /// Forwarded into the pipeline.
    Handled,
    /// Woke the overlays from the faded state and went no further.
    Consumed,
    /// Dropped on purpose, e.g. debounced or a click in flight.
    Suppressed,
    /// Nothing listens for it right now.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickAction {
    Click(MouseButton),
    /// Toggle the left button held down.
    Hold,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Inactivity {
    Idle,
    Watching,
    Faded,
}

fn done_button_hit(local: Pos2, size: Vec2) -> bool {
    local.x >= size.x - EDIT_DONE_BUTTON.x && local.y <= EDIT_DONE_BUTTON.y
}

pub struct WindowOrchestrator<B, H> {
    injector: InputInjector<B>,
    host: H,
    modifiers: ModifierStateMachine,
    settings: OrchestratorSettings,
    dims: Dimensions,
    surfaces: [OverlaySurface; 4],
    drags: [DragBehavior; 4],
    mouse_mode: MouseMode,
    capture: GestureCapture,
    model: Option<Box<dyn MovementModel>>,
    subpixel: SubPixel,
    cursor: Option<CursorState>,
    visible: bool,
    edit_mode: bool,
    inactivity: Inactivity,
    inactivity_deadline: Deadline,
    /// Contacts whose DOWN woke the overlays; the rest of their lifecycle is
    /// swallowed too.
    consumed: HashSet<(SurfaceRole, ContactId)>,
    /// Raw-touch contacts that started on the pointer surface.
    raw_routed: HashSet<ContactId>,
    focus: FocusTracker,
    click: ClickThrough,
    last_click: Option<Instant>,
    hold_active: bool,
    outbox: Vec<OverlayCommand>,
}

impl<B: InjectionBackend, H: DesktopHost> WindowOrchestrator<B, H> {
    pub fn new(backend: B, host: H, dims: Dimensions, config: &AppConfig) -> Self {
        Self::with_settings(backend, host, dims, config, OrchestratorSettings::default())
    }

    pub fn with_settings(
        backend: B,
        host: H,
        mut dims: Dimensions,
        config: &AppConfig,
        settings: OrchestratorSettings,
    ) -> Self {
        dims.pointer_base = pointer_base(config.mouse_mode);
        let surfaces = SurfaceRole::ALL.map(|role| {
            let placement = config.placement(role);
            let scale = placement.scale.clamp(MIN_USER_SCALE, MAX_USER_SCALE);
            let mut surface = OverlaySurface::new(role, placement.left, placement.top, scale);
            surface.edit_mode = config.edit_mode;
            surface
        });
        let drags = SurfaceRole::ALL.map(|_| {
            DragBehavior::new(MIN_USER_SCALE..=MAX_USER_SCALE)
                .with_hit_test(Box::new(done_button_hit))
        });

        let mut orchestrator = Self {
            injector: InputInjector::new(backend),
            host,
            modifiers: ModifierStateMachine::new(),
            settings,
            dims,
            surfaces,
            drags,
            mouse_mode: config.mouse_mode,
            capture: GestureCapture::new(),
            model: model_for(config.mouse_mode),
            subpixel: SubPixel::default(),
            cursor: config.remote_viewport.map(CursorState::new),
            visible: false,
            edit_mode: config.edit_mode,
            inactivity: Inactivity::Idle,
            inactivity_deadline: Deadline::default(),
            consumed: HashSet::new(),
            raw_routed: HashSet::new(),
            focus: FocusTracker::new(settings.focus_restore_delay),
            click: ClickThrough::new(settings.click_settle, settings.click_hold),
            last_click: None,
            hold_active: false,
            outbox: Vec::new(),
        };
        for role in SurfaceRole::ALL {
            orchestrator.layout_surface(role);
        }
        orchestrator.arrange_keyboards();
        orchestrator
    }

    pub fn surface(&self, role: SurfaceRole) -> &OverlaySurface {
        &self.surfaces[role.index()]
    }

    pub fn surfaces(&self) -> &[OverlaySurface] {
        &self.surfaces
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_faded(&self) -> bool {
        self.inactivity == Inactivity::Faded
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn mouse_mode(&self) -> MouseMode {
        self.mouse_mode
    }

    pub fn hold_active(&self) -> bool {
        self.hold_active
    }

    pub fn click_in_flight(&self) -> bool {
        self.click.in_flight()
    }

    pub fn modifiers(&self) -> &ModifierStateMachine {
        &self.modifiers
    }

    pub fn cursor(&self) -> Option<&CursorState> {
        self.cursor.as_ref()
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dims
    }

    pub fn injector(&self) -> &InputInjector<B> {
        &self.injector
    }

    pub fn injector_mut(&mut self) -> &mut InputInjector<B> {
        &mut self.injector
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn drain_commands(&mut self) -> Vec<OverlayCommand> {
        std::mem::take(&mut self.outbox)
    }

    /// Slide the keyboards in and show the pointer surfaces. Showing while
    /// already visible only counts as activity.
    pub fn show(&mut self, now: Instant) {
        if self.visible {
            self.wake_if_faded(now);
            self.note_activity(now);
            return;
        }
        self.visible = true;
        for role in SurfaceRole::ALL {
            self.layout_surface(role);
        }
        self.arrange_keyboards();

        let screen_width = self.dims.screen_width;
        let duration = self.settings.slide_duration;
        let pointer_shown = self.mouse_mode != MouseMode::Off;
        for surface in self.surfaces.iter_mut() {
            surface.opacity = 1.0;
            surface.edit_mode = self.edit_mode;
            surface.visibility = match surface.role {
                SurfaceRole::LeftKeyboard | SurfaceRole::RightKeyboard => {
                    let from_x = if surface.role == SurfaceRole::LeftKeyboard {
                        -surface.size.x
                    } else {
                        screen_width
                    };
                    Visibility::Showing(SlideAnimation {
                        from_x,
                        to_x: surface.position.x,
                        start: now,
                        duration,
                    })
                }
                SurfaceRole::Pointer | SurfaceRole::ClickButtons if pointer_shown => {
                    Visibility::Visible
                }
                _ => Visibility::Hidden,
            };
        }
        tracing::debug!("overlays showing");

        self.inactivity = Inactivity::Idle;
        self.note_activity(now);
        self.refresh_labels();
        if let Some(cursor) = &self.cursor {
            self.outbox.push(OverlayCommand::CursorOverlay {
                position: cursor.position(),
                shape: cursor.shape(),
            });
        }
    }

    pub fn hide(&mut self, now: Instant) {
        if !self.visible {
            return;
        }
        self.visible = false;
        self.release_hold();
        self.cancel_pointer_tracking();
        self.consumed.clear();
        self.inactivity = Inactivity::Idle;
        self.inactivity_deadline.cancel();
        for drag in self.drags.iter_mut() {
            drag.reset();
        }
        if self.click.abort() {
            self.outbox.push(OverlayCommand::SetClickThrough(false));
        }

        let screen_width = self.dims.screen_width;
        let duration = self.settings.slide_duration;
        for surface in self.surfaces.iter_mut() {
            if !surface.visible() {
                continue;
            }
            surface.visibility = match surface.role {
                SurfaceRole::LeftKeyboard | SurfaceRole::RightKeyboard => {
                    let to_x = if surface.role == SurfaceRole::LeftKeyboard {
                        -surface.size.x
                    } else {
                        screen_width
                    };
                    Visibility::Hiding(SlideAnimation {
                        from_x: surface.current_left(now),
                        to_x,
                        start: now,
                        duration,
                    })
                }
                _ => Visibility::Hidden,
            };
        }
        tracing::debug!("overlays hiding");
    }

    /// Tray/hotkey toggle. Focus goes back to the window that had it before
    /// the toggle once the toggling input has settled.
    pub fn toggle_visibility(&mut self, now: Instant) {
        if self.visible {
            self.hide(now);
        } else {
            self.show(now);
        }
        self.focus.schedule_restore(now);
    }

    pub fn observe_foreground(&mut self, snapshot: ForegroundSnapshot) {
        self.focus.observe(snapshot);
    }

    pub fn set_edit_mode(&mut self, enabled: bool, now: Instant) {
        if enabled == self.edit_mode {
            return;
        }
        self.edit_mode = enabled;
        for surface in self.surfaces.iter_mut() {
            surface.edit_mode = enabled;
        }
        for drag in self.drags.iter_mut() {
            drag.reset();
        }
        if enabled {
            self.cancel_pointer_tracking();
            self.wake_if_faded(now);
            self.inactivity_deadline.cancel();
            self.inactivity = Inactivity::Idle;
        } else {
            self.note_activity(now);
        }
        tracing::info!(enabled, "edit mode");
        self.outbox.push(OverlayCommand::PersistEditMode(enabled));
    }

    pub fn set_mouse_mode(&mut self, mode: MouseMode, now: Instant) {
        if mode == self.mouse_mode {
            return;
        }
        self.cancel_pointer_tracking();
        if mode == MouseMode::Off {
            self.release_hold();
        }
        self.mouse_mode = mode;
        self.model = model_for(mode);
        self.dims.pointer_base = pointer_base(mode);
        self.layout_surface(SurfaceRole::Pointer);

        if self.visible {
            self.wake_if_faded(now);
            let visibility = if mode == MouseMode::Off {
                Visibility::Hidden
            } else {
                Visibility::Visible
            };
            for role in [SurfaceRole::Pointer, SurfaceRole::ClickButtons] {
                let surface = &mut self.surfaces[role.index()];
                surface.visibility = visibility;
                surface.opacity = 1.0;
            }
            self.note_activity(now);
        }
        tracing::info!(?mode, "mouse mode");
        self.outbox.push(OverlayCommand::PersistMouseMode(mode));
    }

    /// A key button on one of the keyboards was pressed.
    pub fn on_key_press(&mut self, vk: VirtualKey, now: Instant) -> InputOutcome {
        if !self.visible || self.edit_mode {
            return InputOutcome::Ignored;
        }
        if self.wake_if_faded(now) {
            tracing::debug!(%vk, "key press consumed by wake");
            return InputOutcome::Consumed;
        }
        self.note_activity(now);
        let changed = self.modifiers.handle_key(vk, now, &mut self.injector);
        if vk == VirtualKey::CAPITAL {
            self.host.caps_lock_pressed();
        }
        if changed || vk == VirtualKey::CAPITAL {
            self.refresh_labels();
        }
        InputOutcome::Handled
    }

    pub fn on_click_button(&mut self, action: ClickAction, now: Instant) -> InputOutcome {
        if !self.visible || self.edit_mode || self.mouse_mode == MouseMode::Off {
            return InputOutcome::Ignored;
        }
        if self.wake_if_faded(now) {
            return InputOutcome::Consumed;
        }
        self.note_activity(now);
        match action {
            ClickAction::Hold => {
                if self.hold_active {
                    self.release_hold();
                } else {
                    self.injector.send_button_down(MouseButton::Left);
                    self.hold_active = true;
                    tracing::debug!("left button held");
                }
                InputOutcome::Handled
            }
            ClickAction::Click(button) => {
                let debounced = self
                    .last_click
                    .is_some_and(|at| now.saturating_duration_since(at) < self.settings.click_debounce);
                if debounced {
                    tracing::debug!(?button, "click debounced");
                    return InputOutcome::Suppressed;
                }
                if !self.click.begin(button, now) {
                    return InputOutcome::Suppressed;
                }
                self.last_click = Some(now);
                self.outbox.push(OverlayCommand::SetClickThrough(true));
                // Click-through windows stop delivering the window-input
                // contact, so its UP would never arrive.
                let window_contact = self
                    .capture
                    .tracked()
                    .is_some_and(|contact| !self.raw_routed.contains(&contact.id));
                if window_contact {
                    tracing::debug!("click-through started, dropping tracked contact");
                    self.cancel_pointer_tracking();
                }
                InputOutcome::Handled
            }
        }
    }

    /// A contact on one surface, in screen coordinates.
    pub fn on_surface_sample(
        &mut self,
        role: SurfaceRole,
        sample: ContactSample,
        now: Instant,
    ) -> InputOutcome {
        let index = role.index();
        if !self.visible || !self.surfaces[index].is_shown() {
            return InputOutcome::Ignored;
        }
        if self.consumed.contains(&(role, sample.id)) {
            if sample.phase == ContactPhase::Up {
                self.consumed.remove(&(role, sample.id));
            }
            return InputOutcome::Consumed;
        }
        if self.inactivity == Inactivity::Faded {
            // Keyboards and click buttons wake through their own press path.
            if role == SurfaceRole::Pointer && sample.phase == ContactPhase::Down {
                self.wake_if_faded(now);
                self.consumed.insert((role, sample.id));
                tracing::debug!(id = sample.id, "contact consumed by wake");
                return InputOutcome::Consumed;
            }
            return InputOutcome::Ignored;
        }

        let rect = self.surfaces[index].rect(now);
        if self.edit_mode {
            let scale = self.surfaces[index].user_scale;
            if let Some(output) = self.drags[index].on_sample(sample, rect.min, rect.size(), scale) {
                self.apply_drag(role, output);
            }
            return InputOutcome::Handled;
        }

        match sample.phase {
            // Holding the trackpoint is how it is used.
            ContactPhase::Down if role != SurfaceRole::Pointer => {
                self.drags[index].arm_long_press(now)
            }
            ContactPhase::Up => self.drags[index].cancel_long_press(),
            _ => {}
        }
        self.note_activity(now);
        if role != SurfaceRole::Pointer || self.model.is_none() {
            return InputOutcome::Handled;
        }
        // A click in flight blocks new contacts only; the tracked one must
        // still see its MOVE and UP.
        if self.click.in_flight() && sample.phase == ContactPhase::Down {
            return InputOutcome::Suppressed;
        }

        let local = sample.translated(-rect.min.to_vec2());
        let events = self.capture.process(local);
        if events.is_empty() {
            tracing::debug!(id = sample.id, phase = ?sample.phase, "sample for untracked contact");
            return InputOutcome::Ignored;
        }
        for event in events {
            let motion = match self.model.as_mut() {
                Some(model) => model.on_contact(&event, rect.size(), now),
                None => Motion::none(),
            };
            self.apply_motion(motion, now);
        }
        if sample.phase == ContactPhase::Up {
            self.subpixel.reset();
        }
        InputOutcome::Handled
    }

    /// A contact from the raw touchscreen source, in screen coordinates.
    /// Only contacts that start on the pointer surface are taken; everything
    /// else is left to the regular window input path.
    pub fn on_raw_touch(&mut self, sample: ContactSample, now: Instant) -> InputOutcome {
        match sample.phase {
            ContactPhase::Down => {
                let pointer = self.surface(SurfaceRole::Pointer);
                if !pointer.is_shown() || !pointer.rect(now).contains(sample.position) {
                    return InputOutcome::Ignored;
                }
                self.raw_routed.insert(sample.id);
            }
            ContactPhase::Move => {
                if !self.raw_routed.contains(&sample.id) {
                    return InputOutcome::Ignored;
                }
            }
            ContactPhase::Up => {
                if !self.raw_routed.remove(&sample.id) {
                    return InputOutcome::Ignored;
                }
            }
        }
        self.on_surface_sample(SurfaceRole::Pointer, sample, now)
    }

    /// Drive every timer. Call whenever `next_deadline` passes, and every
    /// frame while `is_animating`.
    pub fn tick(&mut self, now: Instant) {
        for surface in self.surfaces.iter_mut() {
            surface.advance(now);
        }

        let motion = match self.model.as_mut() {
            Some(model) => model.on_tick(now),
            None => Motion::none(),
        };
        self.apply_motion(motion, now);

        for step in self.click.poll(now) {
            match step {
                ClickStep::Inject(button) => self.inject_click(button),
                ClickStep::Restore => self.outbox.push(OverlayCommand::SetClickThrough(false)),
            }
        }

        if let Some(handle) = self.focus.due(now) {
            match self.host.activate_window(handle) {
                Ok(()) => tracing::debug!(window = %handle, "focus restored"),
                Err(e) => tracing::warn!("focus restore failed: {e}"),
            }
        }

        let long_pressed = self
            .drags
            .iter_mut()
            .fold(false, |any, drag| drag.long_press_due(now) || any);
        if long_pressed && self.visible {
            tracing::info!("long press, entering edit mode");
            self.set_edit_mode(true, now);
        }

        if self.inactivity_deadline.fire(now) {
            match self.inactivity {
                Inactivity::Watching => self.fade(now),
                Inactivity::Faded => {
                    tracing::debug!("inactive while faded, hiding");
                    self.hide(now);
                }
                Inactivity::Idle => {}
            }
        }

        if self.visible {
            let shape = self.host.cursor_shape();
            if let Some(cursor) = self.cursor.as_mut() {
                if cursor.set_shape(shape) {
                    self.outbox.push(OverlayCommand::CursorOverlay {
                        position: cursor.position(),
                        shape,
                    });
                }
            }
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        earliest(
            [
                self.model.as_ref().and_then(|m| m.next_tick()),
                self.click.next_deadline(),
                self.focus.next_deadline(),
                self.inactivity_deadline.at(),
            ]
            .into_iter()
            .chain(self.drags.iter().map(DragBehavior::next_deadline))
            .chain(self.surfaces.iter().map(OverlaySurface::animation_end)),
        )
    }

    pub fn is_animating(&self) -> bool {
        self.surfaces.iter().any(OverlaySurface::is_animating)
    }

    pub fn set_screen_size(&mut self, width: f32, height: f32) {
        if self.dims.screen_width == width && self.dims.screen_height == height {
            return;
        }
        self.dims.screen_width = width;
        self.dims.screen_height = height;
        self.injector
            .backend_mut()
            .set_screen_size(width.round() as i32, height.round() as i32);
        if !self.visible {
            for role in SurfaceRole::ALL {
                self.layout_surface(role);
            }
            self.arrange_keyboards();
        }
    }

    /// New keyboard content sizes. Visible overlays are hidden and shown
    /// again so extents and overlap avoidance are recomputed.
    pub fn reload_layout(&mut self, left_content: Vec2, right_content: Vec2, now: Instant) {
        self.dims.left_content = left_content;
        self.dims.right_content = right_content;
        if self.visible {
            self.hide(now);
            for surface in self.surfaces.iter_mut() {
                surface.finish_animation();
            }
            self.show(now);
        } else {
            for role in [SurfaceRole::LeftKeyboard, SurfaceRole::RightKeyboard] {
                self.layout_surface(role);
            }
            self.arrange_keyboards();
        }
        tracing::info!("layout reloaded");
    }

    /// Release everything the OS sees held and abandon pending work.
    pub fn shutdown(&mut self) {
        self.release_hold();
        self.cancel_pointer_tracking();
        if self.modifiers.release_all(&mut self.injector) {
            self.refresh_labels();
        }
        if self.click.abort() {
            self.outbox.push(OverlayCommand::SetClickThrough(false));
        }
        self.focus = FocusTracker::new(self.settings.focus_restore_delay);
        tracing::debug!("orchestrator shut down");
    }

    fn wake_if_faded(&mut self, now: Instant) -> bool {
        if self.inactivity != Inactivity::Faded {
            return false;
        }
        for surface in self.surfaces.iter_mut() {
            if surface.faded() {
                surface.visibility = Visibility::Visible;
                surface.opacity = 1.0;
            }
        }
        self.inactivity = Inactivity::Watching;
        self.note_activity(now);
        tracing::debug!("woke from faded");
        true
    }

    fn fade(&mut self, now: Instant) {
        for surface in self.surfaces.iter_mut() {
            if surface.visibility == Visibility::Visible {
                surface.visibility = Visibility::Fading;
            }
        }
        let opacity = self.settings.faded_opacity;
        for surface in self.surfaces.iter_mut() {
            if surface.visibility == Visibility::Fading {
                surface.visibility = Visibility::Faded;
                surface.opacity = opacity;
            }
        }
        self.cancel_pointer_tracking();
        self.inactivity = Inactivity::Faded;
        self.inactivity_deadline.arm(now + self.settings.inactivity_timeout);
        tracing::debug!("overlays faded");
    }

    fn note_activity(&mut self, now: Instant) {
        if !self.visible || self.edit_mode {
            return;
        }
        self.inactivity_deadline.arm(now + self.settings.inactivity_timeout);
        if self.inactivity == Inactivity::Idle {
            self.inactivity = Inactivity::Watching;
        }
    }

    fn refresh_labels(&mut self) {
        self.outbox.push(OverlayCommand::RefreshKeyLabels {
            modifiers: self.modifiers.snapshot(),
            caps_lock: self.host.caps_lock_active(),
        });
    }

    fn apply_motion(&mut self, motion: Motion, now: Instant) {
        if let Some(stick) = motion.stick {
            self.outbox.push(OverlayCommand::StickVisual(stick));
        }
        if motion.vectors.is_empty() {
            return;
        }
        for vector in motion.vectors {
            match self.cursor.as_mut() {
                Some(cursor) => {
                    let position = cursor.apply(vector);
                    let viewport = cursor.viewport();
                    let shape = cursor.shape();
                    self.injector.send_absolute_move(
                        position.x.round() as i32,
                        position.y.round() as i32,
                        viewport.width as i32,
                        viewport.height as i32,
                    );
                    self.outbox
                        .push(OverlayCommand::CursorOverlay { position, shape });
                }
                None => {
                    if let Some((dx, dy)) = self.subpixel.take(vector) {
                        self.injector.send_relative_move(dx, dy);
                    }
                }
            }
        }
        self.note_activity(now);
    }

    fn inject_click(&mut self, button: MouseButton) {
        match &self.cursor {
            Some(cursor) => {
                let position = cursor.position();
                let viewport = cursor.viewport();
                self.injector.send_click_at(
                    position.x.round() as i32,
                    position.y.round() as i32,
                    viewport.width as i32,
                    viewport.height as i32,
                    button,
                );
            }
            None => self.injector.send_click(button),
        }
    }

    fn release_hold(&mut self) {
        if self.hold_active {
            self.injector.send_button_up(MouseButton::Left);
            self.hold_active = false;
            tracing::debug!("left button released");
        }
    }

    /// Drop the tracked pointer contact, stop the model and reset the stick.
    fn cancel_pointer_tracking(&mut self) {
        self.capture.cancel();
        if let Some(model) = self.model.as_mut() {
            if let Some(stick) = model.cancel().stick {
                self.outbox.push(OverlayCommand::StickVisual(stick));
            }
        }
        self.subpixel.reset();
        self.raw_routed.clear();
    }

    /// Size and place one surface at its user scale.
    fn layout_surface(&mut self, role: SurfaceRole) {
        let dims = self.dims;
        let surface = &mut self.surfaces[role.index()];
        let size = dims.extent(role, surface.user_scale);
        let default = dims.default_position(role, surface.user_scale);
        surface.size = size;
        surface.scale_factor = surface.user_scale;
        surface.position = Pos2::new(
            surface.user_left.unwrap_or(default.x),
            surface.user_top.unwrap_or(default.y),
        );
    }

    /// Shrink the keyboard pair out of each other's way.
    fn arrange_keyboards(&mut self) {
        let dims = self.dims;
        let left = &self.surfaces[SurfaceRole::LeftKeyboard.index()];
        let right = &self.surfaces[SurfaceRole::RightKeyboard.index()];
        let left_anchor = left.position.x;
        let right_anchor = right.position.x + right.size.x;
        let result = avoid_overlap(
            PairedSurface {
                anchor_x: left_anchor,
                user_scale: left.user_scale,
                extent: |s| dims.extent(SurfaceRole::LeftKeyboard, s),
            },
            PairedSurface {
                anchor_x: right_anchor,
                user_scale: right.user_scale,
                extent: |s| dims.extent(SurfaceRole::RightKeyboard, s),
            },
            dims.screen_width,
        );

        let left = &mut self.surfaces[SurfaceRole::LeftKeyboard.index()];
        left.size = dims.extent(SurfaceRole::LeftKeyboard, result.left_scale);
        left.scale_factor = result.left_scale;

        let right = &mut self.surfaces[SurfaceRole::RightKeyboard.index()];
        right.size = dims.extent(SurfaceRole::RightKeyboard, result.right_scale);
        right.scale_factor = result.right_scale;
        right.position.x = right_left_edge(right_anchor, right.size.x, dims.screen_width);

        if result.overlapping {
            tracing::warn!("keyboards still overlap at the minimum scale");
        }
    }

    fn apply_drag(&mut self, role: SurfaceRole, output: DragOutput) {
        let dims = self.dims;
        let surface = &mut self.surfaces[role.index()];
        let update = match output {
            DragOutput::Moved(position) => {
                surface.position = position;
                // The right keyboard's left edge is stored at its user scale.
                let left = if role == SurfaceRole::RightKeyboard {
                    position.x + surface.size.x - dims.extent(role, surface.user_scale).x
                } else {
                    position.x
                };
                surface.user_left = Some(left);
                surface.user_top = Some(position.y);
                SurfaceConfigUpdate {
                    role,
                    left: Some(left),
                    top: Some(position.y),
                    scale: None,
                }
            }
            DragOutput::Scaled(scale) => {
                if scale == surface.user_scale {
                    return;
                }
                surface.user_scale = scale;
                surface.resize(dims.extent(role, scale), scale);
                let left = (role == SurfaceRole::RightKeyboard).then_some(surface.position.x);
                if left.is_some() {
                    surface.user_left = left;
                }
                SurfaceConfigUpdate {
                    role,
                    left,
                    top: None,
                    scale: Some(scale),
                }
            }
        };
        tracing::debug!(?role, ?update, "surface edited");
        self.outbox.push(OverlayCommand::Persist(update));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SurfacePlacement;
    use crate::desktop::RecordingDesktop;
    use crate::focus::WindowHandle;
    use crate::inject::recording::RecordingBackend;
    use crate::inject::SyntheticEvent;

    type TestOrchestrator = WindowOrchestrator<RecordingBackend, RecordingDesktop>;

    fn orchestrator(config: &AppConfig) -> TestOrchestrator {
        WindowOrchestrator::new(
            RecordingBackend::new(1920, 1080),
            RecordingDesktop::new(),
            Dimensions::new(1920.0, 1080.0),
            config,
        )
    }

    fn shown(config: &AppConfig, t0: Instant) -> TestOrchestrator {
        let mut o = orchestrator(config);
        o.show(t0);
        o.tick(t0 + SLIDE_DURATION);
        o.drain_commands();
        o
    }

    fn events(o: &mut TestOrchestrator) -> Vec<SyntheticEvent> {
        o.injector_mut().backend_mut().take_events()
    }

    fn pointer_center(o: &TestOrchestrator) -> Pos2 {
        o.surface(SurfaceRole::Pointer).rect(Instant::now()).center()
    }

    #[test]
    fn show_slides_keyboards_in_from_the_edges() {
        let t0 = Instant::now();
        let mut o = orchestrator(&AppConfig::default());
        o.show(t0);
        let left = o.surface(SurfaceRole::LeftKeyboard);
        let right = o.surface(SurfaceRole::RightKeyboard);
        assert_eq!(left.current_left(t0), -left.size.x);
        assert_eq!(right.current_left(t0), 1920.0);
        assert!(o.is_animating());
        assert_eq!(o.next_deadline(), Some(t0 + SLIDE_DURATION));

        o.tick(t0 + SLIDE_DURATION);
        assert!(!o.is_animating());
        assert_eq!(o.surface(SurfaceRole::LeftKeyboard).visibility, Visibility::Visible);
        assert_eq!(o.surface(SurfaceRole::Pointer).visibility, Visibility::Visible);
    }

    #[test]
    fn reloading_a_layout_resizes_and_reshows_the_keyboards() {
        let t0 = Instant::now();
        let small = Vec2::new(200.0, 100.0);

        let mut hidden = orchestrator(&AppConfig::default());
        hidden.reload_layout(small, small, t0);
        let left = hidden.surface(SurfaceRole::LeftKeyboard);
        assert_eq!(left.size, hidden.dimensions().extent(SurfaceRole::LeftKeyboard, 1.0));
        assert!(!left.visible());

        let mut o = shown(&AppConfig::default(), t0);
        let later = t0 + Duration::from_secs(1);
        o.reload_layout(small, small, later);
        assert!(o.is_visible());
        assert!(o.is_animating());
        assert_eq!(
            o.surface(SurfaceRole::RightKeyboard).size,
            o.dimensions().extent(SurfaceRole::RightKeyboard, 1.0)
        );
        o.tick(later + SLIDE_DURATION);
        assert_eq!(o.surface(SurfaceRole::LeftKeyboard).visibility, Visibility::Visible);
    }

    #[test]
    fn show_and_hide_are_idempotent() {
        let t0 = Instant::now();
        let mut o = shown(&AppConfig::default(), t0);
        o.show(t0);
        assert_eq!(o.surface(SurfaceRole::LeftKeyboard).visibility, Visibility::Visible);

        o.hide(t0);
        let once = o.surface(SurfaceRole::LeftKeyboard).visibility;
        o.hide(t0 + Duration::from_millis(10));
        assert_eq!(o.surface(SurfaceRole::LeftKeyboard).visibility, once);
        o.tick(t0 + SLIDE_DURATION);
        assert!(o.surfaces().iter().all(|s| !s.visible()));
    }

    #[test]
    fn overlapping_keyboards_shrink_on_show() {
        let mut config = AppConfig::default();
        config.left_keyboard.scale = 3.0;
        config.right_keyboard = SurfacePlacement {
            left: Some(500.0),
            top: None,
            scale: 3.0,
        };
        let t0 = Instant::now();
        let o = shown(&config, t0);
        let left = o.surface(SurfaceRole::LeftKeyboard);
        let right = o.surface(SurfaceRole::RightKeyboard);
        assert!(left.scale_factor < 3.0);
        assert!(right.scale_factor < 3.0);
        assert_eq!(left.user_scale, 3.0);
        assert!(left.right_edge() <= right.position.x || left.scale_factor == overlap::SCALE_FLOOR);
    }

    #[test]
    fn inactivity_fades_then_hides() {
        let t0 = Instant::now();
        let mut o = shown(&AppConfig::default(), t0);
        o.tick(t0 + INACTIVITY_TIMEOUT);
        assert!(o.is_faded());
        let left = o.surface(SurfaceRole::LeftKeyboard);
        assert_eq!(left.visibility, Visibility::Faded);
        assert_eq!(left.opacity, FADED_OPACITY);

        o.tick(t0 + INACTIVITY_TIMEOUT * 2);
        assert!(!o.is_visible());
        assert!(matches!(
            o.surface(SurfaceRole::LeftKeyboard).visibility,
            Visibility::Hiding(_)
        ));
    }

    #[test]
    fn wake_key_press_is_consumed() {
        let t0 = Instant::now();
        let mut o = shown(&AppConfig::default(), t0);
        o.tick(t0 + INACTIVITY_TIMEOUT);
        events(&mut o);

        let now = t0 + INACTIVITY_TIMEOUT + Duration::from_millis(100);
        assert_eq!(o.on_key_press(VirtualKey::letter(b'a'), now), InputOutcome::Consumed);
        assert!(events(&mut o).is_empty());
        assert!(!o.is_faded());
        assert_eq!(o.surface(SurfaceRole::LeftKeyboard).opacity, 1.0);

        assert_eq!(o.on_key_press(VirtualKey::letter(b'a'), now), InputOutcome::Handled);
        assert_eq!(events(&mut o).len(), 2);
    }

    #[test]
    fn wake_contact_is_consumed_for_its_whole_lifecycle() {
        let t0 = Instant::now();
        let mut o = shown(&AppConfig::default(), t0);
        let faded_at = t0 + INACTIVITY_TIMEOUT;
        o.tick(faded_at);
        let center = pointer_center(&o) + Vec2::new(30.0, 0.0);

        assert_eq!(
            o.on_surface_sample(SurfaceRole::Pointer, ContactSample::down(4, center), faded_at),
            InputOutcome::Consumed
        );
        assert_eq!(
            o.on_surface_sample(SurfaceRole::Pointer, ContactSample::moved(4, center), faded_at),
            InputOutcome::Consumed
        );
        o.tick(faded_at + Duration::from_millis(100));
        assert_eq!(
            o.on_surface_sample(SurfaceRole::Pointer, ContactSample::up(4, center), faded_at),
            InputOutcome::Consumed
        );
        assert!(events(&mut o).is_empty());
    }

    #[test]
    fn edit_mode_suspends_inactivity() {
        let t0 = Instant::now();
        let mut o = shown(&AppConfig::default(), t0);
        o.set_edit_mode(true, t0);
        o.tick(t0 + INACTIVITY_TIMEOUT * 3);
        assert!(!o.is_faded());
        assert!(o.is_visible());
        assert!(o.drain_commands().contains(&OverlayCommand::PersistEditMode(true)));
        assert_eq!(o.on_key_press(VirtualKey::SPACE, t0), InputOutcome::Ignored);
    }

    #[test]
    fn edit_mode_drag_moves_and_persists() {
        let t0 = Instant::now();
        let mut config = AppConfig::default();
        config.edit_mode = true;
        let mut o = shown(&config, t0);
        let start = o.surface(SurfaceRole::Pointer).position;
        let touch = start + Vec2::new(10.0, 50.0);

        o.on_surface_sample(SurfaceRole::Pointer, ContactSample::down(1, touch), t0);
        o.on_surface_sample(
            SurfaceRole::Pointer,
            ContactSample::moved(1, touch + Vec2::new(40.0, -20.0)),
            t0,
        );
        let expected = start + Vec2::new(40.0, -20.0);
        assert_eq!(o.surface(SurfaceRole::Pointer).position, expected);
        assert!(o.drain_commands().contains(&OverlayCommand::Persist(SurfaceConfigUpdate {
            role: SurfaceRole::Pointer,
            left: Some(expected.x),
            top: Some(expected.y),
            scale: None,
        })));
        assert!(events(&mut o).is_empty());
    }

    #[test]
    fn long_press_enters_edit_mode() {
        let t0 = Instant::now();
        let mut o = shown(&AppConfig::default(), t0);
        let on_keys = o.surface(SurfaceRole::LeftKeyboard).rect(t0).center();
        o.on_surface_sample(SurfaceRole::LeftKeyboard, ContactSample::down(2, on_keys), t0);
        o.tick(t0 + draggable::LONG_PRESS);
        assert!(o.edit_mode());
    }

    #[test]
    fn click_through_wraps_the_injected_click() {
        let t0 = Instant::now();
        let mut o = shown(&AppConfig::default(), t0);
        assert_eq!(
            o.on_click_button(ClickAction::Click(MouseButton::Left), t0),
            InputOutcome::Handled
        );
        assert_eq!(o.drain_commands(), vec![OverlayCommand::SetClickThrough(true)]);
        assert!(events(&mut o).is_empty());

        o.tick(t0 + CLICK_SETTLE);
        assert_eq!(
            events(&mut o),
            vec![
                SyntheticEvent::ButtonDown(MouseButton::Left),
                SyntheticEvent::ButtonUp(MouseButton::Left),
            ]
        );
        assert!(o.drain_commands().is_empty());
        o.tick(t0 + CLICK_HOLD);
        assert_eq!(o.drain_commands(), vec![OverlayCommand::SetClickThrough(false)]);
    }

    #[test]
    fn rapid_clicks_are_debounced() {
        let t0 = Instant::now();
        let mut o = shown(&AppConfig::default(), t0);
        let click = ClickAction::Click(MouseButton::Right);
        assert_eq!(o.on_click_button(click, t0), InputOutcome::Handled);
        o.tick(t0 + CLICK_HOLD);
        assert_eq!(
            o.on_click_button(click, t0 + Duration::from_millis(150)),
            InputOutcome::Suppressed
        );
        assert_eq!(
            o.on_click_button(click, t0 + CLICK_DEBOUNCE),
            InputOutcome::Handled
        );
    }

    #[test]
    fn hold_is_released_when_the_mouse_is_turned_off() {
        let t0 = Instant::now();
        let mut o = shown(&AppConfig::default(), t0);
        o.on_click_button(ClickAction::Hold, t0);
        assert!(o.hold_active());
        o.set_mouse_mode(MouseMode::Off, t0);
        assert!(!o.hold_active());
        assert_eq!(
            events(&mut o),
            vec![
                SyntheticEvent::ButtonDown(MouseButton::Left),
                SyntheticEvent::ButtonUp(MouseButton::Left),
            ]
        );
        assert_eq!(o.surface(SurfaceRole::Pointer).visibility, Visibility::Hidden);
        assert_eq!(o.surface(SurfaceRole::ClickButtons).visibility, Visibility::Hidden);
    }

    #[test]
    fn hold_is_released_when_inactivity_hides_the_overlays() {
        let t0 = Instant::now();
        let mut o = shown(&AppConfig::default(), t0);
        o.on_click_button(ClickAction::Hold, t0);
        o.tick(t0 + INACTIVITY_TIMEOUT);
        assert!(o.is_faded());
        assert!(o.hold_active());

        o.tick(t0 + INACTIVITY_TIMEOUT * 2);
        assert!(!o.is_visible());
        assert!(!o.hold_active());
        assert_eq!(
            events(&mut o),
            vec![
                SyntheticEvent::ButtonDown(MouseButton::Left),
                SyntheticEvent::ButtonUp(MouseButton::Left),
            ]
        );
    }

    #[test]
    fn switching_mode_cancels_a_held_trackpoint() {
        let t0 = Instant::now();
        let mut o = shown(&AppConfig::default(), t0);
        let held = pointer_center(&o) + Vec2::new(30.0, 0.0);
        o.on_surface_sample(SurfaceRole::Pointer, ContactSample::down(1, held), t0);
        o.drain_commands();

        o.set_mouse_mode(MouseMode::Trackpad, t0);
        let commands = o.drain_commands();
        assert!(commands.contains(&OverlayCommand::StickVisual(StickVisual::ResetToCenter)));
        assert!(commands.contains(&OverlayCommand::PersistMouseMode(MouseMode::Trackpad)));
        assert_eq!(o.next_deadline(), Some(t0 + INACTIVITY_TIMEOUT));
        o.tick(t0 + Duration::from_millis(100));
        assert!(events(&mut o).is_empty());
    }

    #[test]
    fn toggle_restores_focus_after_the_delay() {
        let t0 = Instant::now();
        let mut o = orchestrator(&AppConfig::default());
        o.observe_foreground(ForegroundSnapshot::external(WindowHandle(42)));
        o.toggle_visibility(t0);
        o.tick(t0 + Duration::from_millis(100));
        assert!(o.host().activations.is_empty());
        o.tick(t0 + FOCUS_RESTORE_DELAY);
        assert_eq!(o.host().activations, vec![WindowHandle(42)]);
    }

    #[test]
    fn caps_lock_press_refreshes_labels() {
        let t0 = Instant::now();
        let mut o = shown(&AppConfig::default(), t0);
        o.host_mut().caps_lock = true;
        o.on_key_press(VirtualKey::CAPITAL, t0);
        assert_eq!(
            o.drain_commands(),
            vec![OverlayCommand::RefreshKeyLabels {
                modifiers: ModifierSnapshot::default(),
                caps_lock: true,
            }]
        );
    }
}
