use egui::{Pos2, Vec2};
use std::time::{Duration, Instant};
use tapdeck::capture::ContactSample;
use tapdeck::config::{AppConfig, ConfigStore};
use tapdeck::cursor::ViewportSize;
use tapdeck::desktop::RecordingDesktop;
use tapdeck::dimensions::Dimensions;
use tapdeck::focus::{ForegroundSnapshot, WindowHandle};
use tapdeck::inject::recording::RecordingBackend;
use tapdeck::inject::{denormalize, MouseButton, SyntheticEvent};
use tapdeck::keys::VirtualKey;
use tapdeck::motion::{StickVisual, TRACKPOINT_TICK};
use tapdeck::orchestrator::click_through::{CLICK_HOLD, CLICK_SETTLE};
use tapdeck::orchestrator::{
    ClickAction, InputOutcome, OverlayCommand, SurfaceRole, WindowOrchestrator,
    INACTIVITY_TIMEOUT, SLIDE_DURATION,
};

type Orchestrator = WindowOrchestrator<RecordingBackend, RecordingDesktop>;

const SCREEN: (i32, i32) = (1920, 1080);

fn visible(config: &AppConfig, t0: Instant) -> Orchestrator {
    let mut o = WindowOrchestrator::new(
        RecordingBackend::new(SCREEN.0, SCREEN.1),
        RecordingDesktop::new(),
        Dimensions::new(SCREEN.0 as f32, SCREEN.1 as f32),
        config,
    );
    o.show(t0);
    o.tick(t0 + SLIDE_DURATION);
    o.drain_commands();
    o
}

fn take_events(o: &mut Orchestrator) -> Vec<SyntheticEvent> {
    o.injector_mut().backend_mut().take_events()
}

fn trackpoint_center(o: &Orchestrator, now: Instant) -> Pos2 {
    o.surface(SurfaceRole::Pointer).rect(now).center()
}

#[test]
fn held_trackpoint_moves_once_per_tick_until_release() {
    let t0 = Instant::now();
    let mut o = visible(&AppConfig::default(), t0);
    let start = t0 + SLIDE_DURATION;
    let held = trackpoint_center(&o, start) + Vec2::new(20.0, 0.0);

    assert_eq!(
        o.on_surface_sample(SurfaceRole::Pointer, ContactSample::down(7, held), start),
        InputOutcome::Handled
    );
    assert!(o
        .drain_commands()
        .contains(&OverlayCommand::StickVisual(StickVisual::Offset(Vec2::new(15.0, 0.0)))));

    for tick in 1..=5 {
        o.tick(start + TRACKPOINT_TICK * tick);
    }
    let moves: Vec<(u16, u16)> = take_events(&mut o)
        .into_iter()
        .map(|event| match event {
            SyntheticEvent::MoveAbsolute { x, y } => (x, y),
            other => panic!("unexpected event {other:?}"),
        })
        .collect();
    assert_eq!(moves.len(), 5);

    // (20 - 5) / 5 = 3 px per tick, straight right.
    let mut last_x = SCREEN.0 / 2;
    for (x, y) in moves {
        let x = denormalize(x, SCREEN.0);
        assert!((x - last_x - 3).abs() <= 1, "step {} -> {}", last_x, x);
        assert!((denormalize(y, SCREEN.1) - SCREEN.1 / 2).abs() <= 1);
        last_x = x;
    }

    let released_at = start + TRACKPOINT_TICK * 5 + Duration::from_millis(3);
    o.on_surface_sample(SurfaceRole::Pointer, ContactSample::up(7, held), released_at);
    assert!(o
        .drain_commands()
        .contains(&OverlayCommand::StickVisual(StickVisual::ResetToCenter)));
    for tick in 6..=10 {
        o.tick(start + TRACKPOINT_TICK * tick);
    }
    assert!(take_events(&mut o).is_empty());
}

#[test]
fn key_press_that_wakes_faded_overlays_is_consumed() {
    let t0 = Instant::now();
    let mut o = visible(&AppConfig::default(), t0);
    o.on_key_press(VirtualKey::LSHIFT, t0 + SLIDE_DURATION);
    take_events(&mut o);

    let faded_at = t0 + SLIDE_DURATION + INACTIVITY_TIMEOUT;
    o.tick(faded_at);
    assert!(o.is_faded());

    let press = faded_at + Duration::from_millis(500);
    assert_eq!(
        o.on_key_press(VirtualKey::letter(b'q'), press),
        InputOutcome::Consumed
    );
    assert!(!o.is_faded());
    assert!(take_events(&mut o).is_empty());
    // The latched Shift survived the wake untouched.
    assert!(o.modifiers().snapshot().shift);
}

#[test]
fn click_lands_while_overlays_are_click_through() {
    let t0 = Instant::now();
    let mut o = visible(&AppConfig::default(), t0);
    let click_at = t0 + SLIDE_DURATION;

    o.on_click_button(ClickAction::Click(MouseButton::Right), click_at);
    let mut timeline = Vec::new();
    timeline.extend(o.drain_commands().into_iter().map(|c| format!("{c:?}")));
    for ms in [5, 10, 15, 20, 40, 60, 80] {
        o.tick(click_at + Duration::from_millis(ms));
        timeline.extend(take_events(&mut o).into_iter().map(|e| format!("{e:?}")));
        timeline.extend(o.drain_commands().into_iter().map(|c| format!("{c:?}")));
    }
    assert_eq!(
        timeline,
        vec![
            format!("{:?}", OverlayCommand::SetClickThrough(true)),
            format!("{:?}", SyntheticEvent::ButtonDown(MouseButton::Right)),
            format!("{:?}", SyntheticEvent::ButtonUp(MouseButton::Right)),
            format!("{:?}", OverlayCommand::SetClickThrough(false)),
        ]
    );
    assert!(CLICK_SETTLE < CLICK_HOLD);

    // New trackpoint contacts are dropped while a click is in flight.
    o.on_click_button(ClickAction::Click(MouseButton::Left), click_at + Duration::from_secs(1));
    assert!(o.click_in_flight());
    let center = trackpoint_center(&o, click_at);
    assert_eq!(
        o.on_surface_sample(
            SurfaceRole::Pointer,
            ContactSample::down(1, center),
            click_at + Duration::from_secs(1)
        ),
        InputOutcome::Suppressed
    );
}

fn count_moves(events: &[SyntheticEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, SyntheticEvent::MoveAbsolute { .. }))
        .count()
}

#[test]
fn lifting_the_stick_during_a_click_stops_the_cursor() {
    let t0 = Instant::now();
    let mut o = visible(&AppConfig::default(), t0);
    let start = t0 + SLIDE_DURATION;
    let held = trackpoint_center(&o, start) + Vec2::new(30.0, 0.0);
    o.on_surface_sample(SurfaceRole::Pointer, ContactSample::down(1, held), start);
    o.drain_commands();

    // The overlays turn click-through, so the window never sees this
    // contact's UP: the stick is dropped as soon as the click starts.
    o.on_click_button(ClickAction::Click(MouseButton::Left), start);
    assert!(o
        .drain_commands()
        .contains(&OverlayCommand::StickVisual(StickVisual::ResetToCenter)));
    o.on_surface_sample(
        SurfaceRole::Pointer,
        ContactSample::up(1, held),
        start + Duration::from_millis(5),
    );

    for tick in 1..=20 {
        o.tick(start + TRACKPOINT_TICK * tick);
    }
    let events = take_events(&mut o);
    assert_eq!(count_moves(&events), 0);
    assert!(events.contains(&SyntheticEvent::ButtonUp(MouseButton::Left)));
}

#[test]
fn raw_contact_lifted_during_a_click_still_releases_the_stick() {
    let t0 = Instant::now();
    let mut o = visible(&AppConfig::default(), t0);
    let start = t0 + SLIDE_DURATION;
    let held = trackpoint_center(&o, start) + Vec2::new(30.0, 0.0);
    assert_eq!(
        o.on_raw_touch(ContactSample::down(4, held), start),
        InputOutcome::Handled
    );

    o.on_click_button(ClickAction::Click(MouseButton::Left), start);
    o.drain_commands();
    let lifted = start + Duration::from_millis(5);
    assert_eq!(
        o.on_raw_touch(ContactSample::up(4, held), lifted),
        InputOutcome::Handled
    );
    assert!(o
        .drain_commands()
        .contains(&OverlayCommand::StickVisual(StickVisual::ResetToCenter)));
    take_events(&mut o);

    for tick in 1..=20 {
        o.tick(lifted + TRACKPOINT_TICK * tick);
    }
    assert_eq!(count_moves(&take_events(&mut o)), 0);
}

#[test]
fn clicks_in_a_remote_viewport_move_first() {
    let t0 = Instant::now();
    let config = AppConfig {
        remote_viewport: Some(ViewportSize::new(800, 600)),
        ..AppConfig::default()
    };
    let mut o = visible(&config, t0);
    let click_at = t0 + SLIDE_DURATION;
    o.on_click_button(ClickAction::Click(MouseButton::Left), click_at);
    o.tick(click_at + CLICK_SETTLE);
    let events = take_events(&mut o);
    assert_eq!(events.len(), 3);
    let SyntheticEvent::MoveAbsolute { x, y } = events[0] else {
        panic!("expected a move first, got {:?}", events[0]);
    };
    assert_eq!(denormalize(x, 800), 400);
    assert_eq!(denormalize(y, 600), 300);
    assert_eq!(events[1], SyntheticEvent::ButtonDown(MouseButton::Left));
}

#[test]
fn toggling_hands_focus_back_to_the_previous_window() {
    let t0 = Instant::now();
    let mut o = visible(&AppConfig::default(), t0);
    o.observe_foreground(ForegroundSnapshot::external(WindowHandle(0x1234)));
    o.observe_foreground(ForegroundSnapshot {
        handle: WindowHandle(0x99),
        is_own: true,
        is_shell: false,
    });

    let toggled = t0 + Duration::from_secs(1);
    o.toggle_visibility(toggled);
    assert!(!o.is_visible());
    o.tick(toggled + Duration::from_millis(149));
    assert!(o.host().activations.is_empty());
    o.tick(toggled + Duration::from_millis(150));
    assert_eq!(o.host().activations, vec![WindowHandle(0x1234)]);

    // A window that vanished in the meantime is logged and skipped.
    o.host_mut().mark_gone(WindowHandle(0x1234));
    o.toggle_visibility(toggled + Duration::from_secs(1));
    o.tick(toggled + Duration::from_secs(2));
    assert!(o.is_visible());
    assert_eq!(o.host().activations.len(), 1);
}

#[test]
fn edit_mode_changes_survive_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    let mut store = ConfigStore::open(path.clone());

    let t0 = Instant::now();
    let mut o = visible(store.config(), t0);
    o.set_edit_mode(true, t0);
    let keyboard = o.surface(SurfaceRole::LeftKeyboard).rect(t0);
    let grab = keyboard.min + Vec2::new(20.0, 60.0);
    o.on_surface_sample(SurfaceRole::LeftKeyboard, ContactSample::down(1, grab), t0);
    o.on_surface_sample(
        SurfaceRole::LeftKeyboard,
        ContactSample::moved(1, grab + Vec2::new(100.0, 30.0)),
        t0,
    );
    o.on_surface_sample(
        SurfaceRole::LeftKeyboard,
        ContactSample::up(1, grab + Vec2::new(100.0, 30.0)),
        t0,
    );

    for command in o.drain_commands() {
        match command {
            OverlayCommand::Persist(update) => store.apply_update(&update),
            OverlayCommand::PersistEditMode(enabled) => {
                store.config_mut().edit_mode = enabled;
                store.persist();
            }
            _ => {}
        }
    }

    let reloaded = ConfigStore::open(path);
    assert!(reloaded.config().edit_mode);
    let placement = reloaded.config().left_keyboard;
    assert_eq!(placement.left, Some(keyboard.min.x + 100.0));
    assert_eq!(placement.top, Some(keyboard.min.y + 30.0));

    let restarted = visible(reloaded.config(), t0);
    assert_eq!(
        restarted.surface(SurfaceRole::LeftKeyboard).position,
        keyboard.min + Vec2::new(100.0, 30.0)
    );
}
