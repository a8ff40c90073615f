//! Controller bindings and hotkey shortcuts.

use minarch_common::input::JoypadButton;
use std::fmt::{Display, Formatter};

/// One remappable binding: a core-facing button or a frontend shortcut.
#[derive(Debug, Clone)]
pub struct ButtonMapping {
    /// Display name; core-reported names replace the defaults when the core
    /// registers input descriptors.
    pub name: String,
    /// Libretro joypad device ID, or -1 for frontend shortcuts.
    pub retro_id: i32,
    pub local: Option<JoypadButton>,
    /// Only active while the menu button is held.
    pub modifier: bool,
    pub default_local: Option<JoypadButton>,
    /// The loaded core does not expose this button; hidden from the menu.
    pub ignored: bool,
}

impl ButtonMapping {
    #[must_use]
    pub fn new(name: &str, retro_id: i32, local: Option<JoypadButton>) -> Self {
        Self {
            name: name.to_string(),
            retro_id,
            local,
            modifier: false,
            default_local: local,
            ignored: false,
        }
    }

    /// Encode for config files: `NONE`, `A`, or `MENU+A`.
    #[must_use]
    pub fn encode(&self) -> String {
        match self.local {
            None => "NONE".to_string(),
            Some(button) if self.modifier => format!("MENU+{}", button.label()),
            Some(button) => button.label().to_string(),
        }
    }

    /// Decode a config-file binding label.
    pub fn decode(&mut self, label: &str) {
        let label = label.trim();
        if label == "NONE" {
            self.local = None;
            self.modifier = false;
            return;
        }

        let (modifier, button_label) = match label.strip_prefix("MENU+") {
            Some(rest) => (true, rest),
            None => (false, label),
        };

        match JoypadButton::from_label(button_label) {
            Some(button) => {
                self.local = Some(button);
                self.modifier = modifier;
            }
            None => log::warn!("Unknown button label '{label}' for binding {}", self.name),
        }
    }

    pub fn clear(&mut self) {
        self.local = None;
        self.modifier = false;
    }

    pub fn reset(&mut self) {
        self.local = self.default_local;
        self.modifier = false;
    }
}

impl Display for ButtonMapping {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.name, self.encode())
    }
}

/// Frontend hotkey actions, each individually bindable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Shortcut {
    SaveState = 0,
    LoadState = 1,
    ResetGame = 2,
    SaveQuit = 3,
    CycleScale = 4,
    CycleEffect = 5,
    ToggleFastForward = 6,
    HoldFastForward = 7,
}

impl Shortcut {
    pub const ALL: [Self; 8] = [
        Self::SaveState,
        Self::LoadState,
        Self::ResetGame,
        Self::SaveQuit,
        Self::CycleScale,
        Self::CycleEffect,
        Self::ToggleFastForward,
        Self::HoldFastForward,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SaveState => "Save State",
            Self::LoadState => "Load State",
            Self::ResetGame => "Reset Game",
            Self::SaveQuit => "Save & Quit",
            Self::CycleScale => "Cycle Scaling",
            Self::CycleEffect => "Cycle Effect",
            Self::ToggleFastForward => "Toggle FF",
            Self::HoldFastForward => "Hold FF",
        }
    }
}

/// Default core-facing button set, used when the pak config does not
/// declare bindings. Names follow the libretro joypad layout.
#[must_use]
pub fn default_button_mappings() -> Vec<ButtonMapping> {
    use JoypadButton as B;

    vec![
        ButtonMapping::new("Up", B::Up as i32, Some(B::Up)),
        ButtonMapping::new("Down", B::Down as i32, Some(B::Down)),
        ButtonMapping::new("Left", B::Left as i32, Some(B::Left)),
        ButtonMapping::new("Right", B::Right as i32, Some(B::Right)),
        ButtonMapping::new("Select", B::Select as i32, Some(B::Select)),
        ButtonMapping::new("Start", B::Start as i32, Some(B::Start)),
        ButtonMapping::new("A Button", B::A as i32, Some(B::A)),
        ButtonMapping::new("B Button", B::B as i32, Some(B::B)),
        ButtonMapping::new("X Button", B::X as i32, Some(B::X)),
        ButtonMapping::new("Y Button", B::Y as i32, Some(B::Y)),
        ButtonMapping::new("L1 Button", B::L1 as i32, Some(B::L1)),
        ButtonMapping::new("R1 Button", B::R1 as i32, Some(B::R1)),
        ButtonMapping::new("L2 Button", B::L2 as i32, Some(B::L2)),
        ButtonMapping::new("R2 Button", B::R2 as i32, Some(B::R2)),
        ButtonMapping::new("L3 Button", B::L3 as i32, Some(B::L3)),
        ButtonMapping::new("R3 Button", B::R3 as i32, Some(B::R3)),
    ]
}

/// Default (unbound) shortcut set, indexed by [`Shortcut`].
#[must_use]
pub fn default_shortcut_mappings() -> Vec<ButtonMapping> {
    Shortcut::ALL.into_iter().map(|shortcut| ButtonMapping::new(shortcut.label(), -1, None)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trips() {
        let mut mapping = ButtonMapping::new("Save State", -1, None);
        assert_eq!(mapping.encode(), "NONE");

        mapping.decode("MENU+R1");
        assert_eq!(mapping.local, Some(JoypadButton::R1));
        assert!(mapping.modifier);
        assert_eq!(mapping.encode(), "MENU+R1");

        mapping.decode("A");
        assert!(!mapping.modifier);
        assert_eq!(mapping.encode(), "A");

        mapping.decode("NONE");
        assert_eq!(mapping.local, None);
    }

    #[test]
    fn unknown_label_keeps_previous_binding() {
        let mut mapping = ButtonMapping::new("A Button", 8, Some(JoypadButton::A));
        mapping.decode("FROB");
        assert_eq!(mapping.local, Some(JoypadButton::A));
    }

    #[test]
    fn shortcut_table_lines_up_with_enum() {
        let shortcuts = default_shortcut_mappings();
        assert_eq!(shortcuts.len(), Shortcut::ALL.len());
        assert_eq!(shortcuts[Shortcut::HoldFastForward as usize].name, "Hold FF");
    }
}
