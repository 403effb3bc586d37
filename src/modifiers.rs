//! Sticky modifier keys.
//!
//! Pressing a modifier on the overlay latches it (the OS sees it held) until
//! the next regular key, which is sent and then releases every latched
//! modifier. Shift additionally locks on a double tap and unlocks on the next
//! press.

use crate::inject::{InjectionBackend, InputInjector};
use crate::keys::{ModifierKind, VirtualKey};
use std::time::{Duration, Instant};

pub const DOUBLE_TAP_WINDOW: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModifierState {
    Released,
    Active,
    Locked,
}

#[derive(Clone, Copy, Debug)]
pub struct ModifierKey {
    pub kind: ModifierKind,
    pub active: bool,
    pub locked: bool,
    /// Physical code that latched the modifier; released on toggle-off.
    pressed_code: Option<VirtualKey>,
    activated_at: Option<Instant>,
}

impl ModifierKey {
    fn new(kind: ModifierKind) -> Self {
        Self {
            kind,
            active: false,
            locked: false,
            pressed_code: None,
            activated_at: None,
        }
    }

    pub fn state(&self) -> ModifierState {
        match (self.active, self.locked) {
            (_, true) => ModifierState::Locked,
            (true, false) => ModifierState::Active,
            (false, false) => ModifierState::Released,
        }
    }
}

/// Snapshot handed to the view layer whenever modifier state changes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModifierSnapshot {
    pub shift: bool,
    pub shift_locked: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

#[derive(Debug)]
pub struct ModifierStateMachine {
    keys: [ModifierKey; 4],
    double_tap_window: Duration,
}

impl Default for ModifierStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ModifierStateMachine {
    pub fn new() -> Self {
        Self {
            keys: ModifierKind::ALL.map(ModifierKey::new),
            double_tap_window: DOUBLE_TAP_WINDOW,
        }
    }

    pub fn key(&self, kind: ModifierKind) -> &ModifierKey {
        &self.keys[kind.index()]
    }

    pub fn state(&self, kind: ModifierKind) -> ModifierState {
        self.key(kind).state()
    }

    pub fn snapshot(&self) -> ModifierSnapshot {
        ModifierSnapshot {
            shift: self.key(ModifierKind::Shift).active,
            shift_locked: self.key(ModifierKind::Shift).locked,
            ctrl: self.key(ModifierKind::Ctrl).active,
            alt: self.key(ModifierKind::Alt).active,
            meta: self.key(ModifierKind::Meta).active,
        }
    }

    /// Handle a key press from the overlay. Returns true when any modifier
    /// changed state, i.e. labels and highlights need a refresh.
    pub fn handle_key<B: InjectionBackend>(
        &mut self,
        vk: VirtualKey,
        now: Instant,
        injector: &mut InputInjector<B>,
    ) -> bool {
        match vk.modifier() {
            Some(ModifierKind::Shift) => {
                self.press_shift(vk, now, injector);
                true
            }
            Some(kind) => {
                self.toggle(kind, vk, now, injector);
                true
            }
            None => {
                injector.send_key(vk);
                self.release_latched(injector)
            }
        }
    }

    /// Release everything the OS currently sees held, locked Shift included.
    pub fn release_all<B: InjectionBackend>(&mut self, injector: &mut InputInjector<B>) -> bool {
        let mut changed = false;
        for kind in ModifierKind::ALL {
            let key = &mut self.keys[kind.index()];
            if key.locked {
                key.locked = false;
                key.active = false;
                key.pressed_code = None;
                for code in kind.codes() {
                    injector.send_key_up(code);
                }
                changed = true;
            } else if key.active {
                self.deactivate(kind, injector);
                changed = true;
            }
        }
        changed
    }

    fn press_shift<B: InjectionBackend>(
        &mut self,
        vk: VirtualKey,
        now: Instant,
        injector: &mut InputInjector<B>,
    ) {
        let window = self.double_tap_window;
        let shift = &mut self.keys[ModifierKind::Shift.index()];

        if shift.locked {
            shift.locked = false;
            shift.active = false;
            shift.pressed_code = None;
            shift.activated_at = None;
            for code in ModifierKind::Shift.codes() {
                injector.send_key_up(code);
            }
            tracing::debug!("shift unlocked");
            return;
        }

        let double_tap = shift.active
            && shift
                .activated_at
                .is_some_and(|at| now.saturating_duration_since(at) < window);
        if double_tap {
            shift.locked = true;
            shift.activated_at = None;
            tracing::debug!("shift locked");
            return;
        }

        self.toggle(ModifierKind::Shift, vk, now, injector);
    }

    fn toggle<B: InjectionBackend>(
        &mut self,
        kind: ModifierKind,
        vk: VirtualKey,
        now: Instant,
        injector: &mut InputInjector<B>,
    ) {
        if self.keys[kind.index()].active {
            self.deactivate(kind, injector);
        } else {
            let key = &mut self.keys[kind.index()];
            key.active = true;
            key.pressed_code = Some(vk);
            key.activated_at = Some(now);
            injector.send_key_down(vk);
            tracing::debug!(?kind, %vk, "modifier latched");
        }
    }

    fn deactivate<B: InjectionBackend>(&mut self, kind: ModifierKind, injector: &mut InputInjector<B>) {
        let key = &mut self.keys[kind.index()];
        let code = key.pressed_code.take().unwrap_or(kind.codes()[0]);
        key.active = false;
        key.activated_at = None;
        injector.send_key_up(code);
        tracing::debug!(?kind, %code, "modifier released");
    }

    fn release_latched<B: InjectionBackend>(&mut self, injector: &mut InputInjector<B>) -> bool {
        let mut changed = false;
        for kind in ModifierKind::ALL {
            let key = &self.keys[kind.index()];
            if key.active && !key.locked {
                self.deactivate(kind, injector);
                changed = true;
            }
        }
        changed
    }
}
