//! Virtual-key codes and key label helpers.
//!
//! Synthetic keyboard events are expressed purely in Windows virtual-key codes;
//! backends that speak another protocol translate from these.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VirtualKey(pub u16);

impl VirtualKey {
    pub const BACK: VirtualKey = VirtualKey(0x08);
    pub const TAB: VirtualKey = VirtualKey(0x09);
    pub const RETURN: VirtualKey = VirtualKey(0x0D);
    pub const CAPITAL: VirtualKey = VirtualKey(0x14);
    pub const ESCAPE: VirtualKey = VirtualKey(0x1B);
    pub const SPACE: VirtualKey = VirtualKey(0x20);
    pub const LEFT: VirtualKey = VirtualKey(0x25);
    pub const UP: VirtualKey = VirtualKey(0x26);
    pub const RIGHT: VirtualKey = VirtualKey(0x27);
    pub const DOWN: VirtualKey = VirtualKey(0x28);
    pub const DELETE: VirtualKey = VirtualKey(0x2E);
    pub const LWIN: VirtualKey = VirtualKey(0x5B);
    pub const RWIN: VirtualKey = VirtualKey(0x5C);
    pub const LSHIFT: VirtualKey = VirtualKey(0xA0);
    pub const RSHIFT: VirtualKey = VirtualKey(0xA1);
    pub const LCONTROL: VirtualKey = VirtualKey(0xA2);
    pub const RCONTROL: VirtualKey = VirtualKey(0xA3);
    pub const LMENU: VirtualKey = VirtualKey(0xA4);
    pub const RMENU: VirtualKey = VirtualKey(0xA5);
    pub const OEM_1: VirtualKey = VirtualKey(0xBA);
    pub const OEM_PLUS: VirtualKey = VirtualKey(0xBB);
    pub const OEM_COMMA: VirtualKey = VirtualKey(0xBC);
    pub const OEM_MINUS: VirtualKey = VirtualKey(0xBD);
    pub const OEM_PERIOD: VirtualKey = VirtualKey(0xBE);
    pub const OEM_2: VirtualKey = VirtualKey(0xBF);
    pub const OEM_3: VirtualKey = VirtualKey(0xC0);
    pub const OEM_4: VirtualKey = VirtualKey(0xDB);
    pub const OEM_5: VirtualKey = VirtualKey(0xDC);
    pub const OEM_6: VirtualKey = VirtualKey(0xDD);
    pub const OEM_7: VirtualKey = VirtualKey(0xDE);

    /// Letter keys share their ASCII uppercase code.
    pub const fn letter(c: u8) -> VirtualKey {
        VirtualKey(c.to_ascii_uppercase() as u16)
    }

    /// Digit keys share their ASCII code.
    pub const fn digit(d: u8) -> VirtualKey {
        VirtualKey(b'0' as u16 + (d % 10) as u16)
    }

    /// Function keys F1..F24.
    pub const fn function(n: u8) -> VirtualKey {
        VirtualKey(0x6F + n as u16)
    }

    pub fn modifier(self) -> Option<ModifierKind> {
        match self {
            Self::LSHIFT | Self::RSHIFT => Some(ModifierKind::Shift),
            Self::LCONTROL | Self::RCONTROL => Some(ModifierKind::Ctrl),
            Self::LMENU | Self::RMENU => Some(ModifierKind::Alt),
            Self::LWIN | Self::RWIN => Some(ModifierKind::Meta),
            _ => None,
        }
    }
}

impl std::fmt::Display for VirtualKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VK 0x{:02X}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModifierKind {
    Shift,
    Ctrl,
    Alt,
    Meta,
}

impl ModifierKind {
    pub const ALL: [ModifierKind; 4] = [
        ModifierKind::Shift,
        ModifierKind::Ctrl,
        ModifierKind::Alt,
        ModifierKind::Meta,
    ];

    /// Both physical codes for this modifier, left first.
    pub fn codes(self) -> [VirtualKey; 2] {
        match self {
            ModifierKind::Shift => [VirtualKey::LSHIFT, VirtualKey::RSHIFT],
            ModifierKind::Ctrl => [VirtualKey::LCONTROL, VirtualKey::RCONTROL],
            ModifierKind::Alt => [VirtualKey::LMENU, VirtualKey::RMENU],
            ModifierKind::Meta => [VirtualKey::LWIN, VirtualKey::RWIN],
        }
    }

    pub fn index(self) -> usize {
        match self {
            ModifierKind::Shift => 0,
            ModifierKind::Ctrl => 1,
            ModifierKind::Alt => 2,
            ModifierKind::Meta => 3,
        }
    }
}

const SHIFT_MAP: [(&str, &str); 21] = [
    ("`", "~"),
    ("1", "!"),
    ("2", "@"),
    ("3", "#"),
    ("4", "$"),
    ("5", "%"),
    ("6", "^"),
    ("7", "&"),
    ("8", "*"),
    ("9", "("),
    ("0", ")"),
    ("-", "_"),
    ("=", "+"),
    ("[", "{"),
    ("]", "}"),
    ("\\", "|"),
    (";", ":"),
    ("'", "\""),
    (",", "<"),
    (".", ">"),
    ("/", "?"),
];

/// Label a key should show for the current Shift / Caps Lock state.
///
/// Single letters follow `shift XOR caps`; punctuation and the number row only
/// react to Shift. Anything else (Enter, F1, ...) is returned unchanged.
pub fn shifted_label(base: &str, shift: bool, caps_lock: bool) -> String {
    let mut chars = base.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_alphabetic() {
            return if shift ^ caps_lock {
                c.to_uppercase().collect()
            } else {
                c.to_lowercase().collect()
            };
        }
    }

    if shift {
        if let Some((_, shifted)) = SHIFT_MAP.iter().find(|(plain, _)| *plain == base) {
            return (*shifted).to_string();
        }
    }

    base.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_follow_shift_xor_caps() {
        assert_eq!(shifted_label("a", false, false), "a");
        assert_eq!(shifted_label("a", true, false), "A");
        assert_eq!(shifted_label("a", false, true), "A");
        assert_eq!(shifted_label("A", true, true), "a");
    }

    #[test]
    fn symbols_only_react_to_shift() {
        assert_eq!(shifted_label("1", true, false), "!");
        assert_eq!(shifted_label("1", false, true), "1");
        assert_eq!(shifted_label("/", true, true), "?");
        assert_eq!(shifted_label("\\", true, false), "|");
    }

    #[test]
    fn named_keys_are_untouched() {
        assert_eq!(shifted_label("Enter", true, true), "Enter");
        assert_eq!(shifted_label("", true, false), "");
    }

    #[test]
    fn modifier_codes_round_trip() {
        for kind in ModifierKind::ALL {
            for code in kind.codes() {
                assert_eq!(code.modifier(), Some(kind));
            }
        }
        assert_eq!(VirtualKey::letter(b'q').modifier(), None);
        assert_eq!(VirtualKey::function(1), VirtualKey(0x70));
        assert_eq!(VirtualKey::digit(0), VirtualKey(0x30));
    }
}
