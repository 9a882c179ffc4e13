// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Key descriptor normalization (`spec.md` §4.7): a `KeyboardEvent` becomes
//! a string `Mod-Shift-Alt-KEY`, modifiers in that fixed order. `Mod` fires
//! if either Ctrl or Meta is held; Space maps to `Space`; single-character
//! keys are uppercased.

/// A normalized, platform-independent keydown. The host is responsible for
/// translating its own `KeyboardEvent` into this shape.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyEvent {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            meta: false,
            shift: false,
            alt: false,
        }
    }

    pub fn with_mod(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// The lookup key used against a [`crate::schema::keymap::Keymap`].
    pub fn descriptor(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        if self.ctrl || self.meta {
            parts.push("Mod");
        }
        if self.shift {
            parts.push("Shift");
        }
        if self.alt {
            parts.push("Alt");
        }
        let key = normalize_key(&self.key);
        let mut descriptor = parts.join("-");
        if !descriptor.is_empty() {
            descriptor.push('-');
        }
        descriptor.push_str(&key);
        descriptor
    }

    pub fn is_plain(&self) -> bool {
        !self.ctrl && !self.meta && !self.shift && !self.alt
    }

    pub fn is_arrow(&self) -> bool {
        matches!(self.key.as_str(), "ArrowLeft" | "ArrowRight" | "ArrowUp" | "ArrowDown")
    }

    /// A key event that should insert a literal character: no Mod held and
    /// exactly one Unicode scalar value in `key` (the DOM's own convention
    /// for `KeyboardEvent.key` on printable keys).
    pub fn is_printable(&self) -> bool {
        !self.ctrl && !self.meta && self.key.chars().count() == 1
    }
}

fn normalize_key(key: &str) -> String {
    if key == " " || key == "Space" {
        return "Space".to_owned();
    }
    if key.chars().count() == 1 {
        return key.to_uppercase();
    }
    key.to_owned()
}
