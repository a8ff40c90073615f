//! Option lists: the normalized form of both frontend settings and
//! emulator-reported core options.

/// Legacy core variable: `key` plus a packed `"description; a|b|c"` value
/// string. The first choice is the default.
#[derive(Debug, Clone)]
pub struct RawVariable {
    pub key: String,
    pub value: String,
}

/// Modern core option definition with explicit value/label pairs.
#[derive(Debug, Clone, Default)]
pub struct OptionDefinition {
    pub key: String,
    pub desc: String,
    pub info: String,
    /// (value, optional label) pairs
    pub values: Vec<(String, Option<String>)>,
    pub default_value: Option<String>,
}

/// One user-visible option with its current selection.
#[derive(Debug, Clone)]
pub struct CoreOption {
    pub key: String,
    pub name: String,
    /// Short description shown inline in the menu.
    pub desc: String,
    /// Longer description shown in the info pop-up.
    pub full: String,
    pub values: Vec<String>,
    pub labels: Vec<String>,
    pub default_index: usize,
    pub current_index: usize,
    /// Locked options keep their configured value and are hidden from the
    /// options menu.
    pub locked: bool,
}

impl CoreOption {
    #[must_use]
    pub fn value(&self) -> &str {
        &self.values[self.current_index]
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.labels[self.current_index]
    }

    /// Set by value string; unknown values leave the option untouched.
    pub fn set_value(&mut self, value: &str) -> bool {
        match self.values.iter().position(|v| v == value) {
            Some(index) => {
                self.current_index = index;
                true
            }
            None => {
                log::warn!("Ignoring unknown value '{value}' for option {}", self.key);
                false
            }
        }
    }

    pub fn set_index(&mut self, index: usize) {
        if index < self.values.len() {
            self.current_index = index;
        }
    }

    /// Cycle left (-1) or right (+1), wrapping at both ends.
    pub fn cycle(&mut self, direction: i32) {
        let len = self.values.len();
        if len == 0 {
            return;
        }
        let next = (self.current_index as i64 + i64::from(direction)).rem_euclid(len as i64);
        self.current_index = next as usize;
    }
}

/// A set of options plus the changed flag the emulator polls through its
/// environment callback.
#[derive(Debug, Clone, Default)]
pub struct OptionList {
    pub options: Vec<CoreOption>,
    pub changed: bool,
}

impl OptionList {
    /// Normalize legacy `retro_variable` strings. Format per entry:
    /// `"Description; first|second|third"`, first choice is the default,
    /// labels equal values.
    #[must_use]
    pub fn from_variables(variables: &[RawVariable]) -> Self {
        let mut options = Vec::with_capacity(variables.len());
        for variable in variables {
            let Some((desc, choices)) = variable.value.split_once(';') else {
                log::warn!("Malformed variable '{}', skipping", variable.key);
                continue;
            };
            let values: Vec<String> =
                choices.trim_start().split('|').map(str::to_string).collect();
            if values.is_empty() {
                continue;
            }

            options.push(CoreOption {
                key: variable.key.clone(),
                name: desc.to_string(),
                desc: String::new(),
                full: String::new(),
                labels: values.clone(),
                values,
                default_index: 0,
                current_index: 0,
                locked: false,
            });
        }

        Self { options, changed: true }
    }

    /// Normalize modern option definitions.
    #[must_use]
    pub fn from_definitions(definitions: &[OptionDefinition]) -> Self {
        let mut options = Vec::with_capacity(definitions.len());
        for def in definitions {
            if def.values.is_empty() {
                continue;
            }

            let values: Vec<String> = def.values.iter().map(|(v, _)| v.clone()).collect();
            let labels: Vec<String> = def
                .values
                .iter()
                .map(|(v, l)| l.clone().unwrap_or_else(|| v.clone()))
                .collect();
            let default_index = def
                .default_value
                .as_ref()
                .and_then(|d| values.iter().position(|v| v == d))
                .unwrap_or(0);

            let info = def.info.trim();
            let desc = info.split_once(". ").map_or(info, |(first, _)| first).to_string();

            options.push(CoreOption {
                key: def.key.clone(),
                name: def.desc.clone(),
                desc,
                full: info.to_string(),
                values,
                labels,
                default_index,
                current_index: default_index,
                locked: false,
            });
        }

        Self { options, changed: true }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&CoreOption> {
        self.options.iter().find(|option| option.key == key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut CoreOption> {
        self.options.iter_mut().find(|option| option.key == key)
    }

    /// Current value string for a key, if the option exists.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(CoreOption::value)
    }

    /// Set an option by value string and raise the changed flag.
    pub fn set_value(&mut self, key: &str, value: &str) {
        if let Some(option) = self.get_mut(key) {
            if option.set_value(value) {
                self.changed = true;
            }
        } else {
            log::warn!("Ignoring write to unknown option {key}");
        }
    }

    /// Set an option by index and raise the changed flag.
    pub fn set_index(&mut self, key: &str, index: usize) {
        if let Some(option) = self.get_mut(key) {
            option.set_index(index);
            self.changed = true;
        }
    }

    pub fn reset_to_defaults(&mut self) {
        for option in &mut self.options {
            option.current_index = option.default_index;
            option.locked = false;
        }
        self.changed = true;
    }

    /// Options visible in the menu (not locked).
    pub fn enabled(&self) -> impl Iterator<Item = &CoreOption> {
        self.options.iter().filter(|option| !option.locked)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Consume and clear the changed flag; the emulator polls this once per
    /// frame through the environment callback.
    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_variables_parse_choices_and_default() {
        let list = OptionList::from_variables(&[RawVariable {
            key: "gpsp_boot_mode".into(),
            value: "Boot mode; game|bios".into(),
        }]);

        let option = list.get("gpsp_boot_mode").unwrap();
        assert_eq!(option.name, "Boot mode");
        assert_eq!(option.values, vec!["game", "bios"]);
        assert_eq!(option.labels, option.values);
        assert_eq!(option.value(), "game");
    }

    #[test]
    fn malformed_variable_is_skipped() {
        let list = OptionList::from_variables(&[RawVariable {
            key: "broken".into(),
            value: "no separator here".into(),
        }]);
        assert!(list.is_empty());
    }

    #[test]
    fn definitions_resolve_labels_and_default() {
        let list = OptionList::from_definitions(&[OptionDefinition {
            key: "fceumm_palette".into(),
            desc: "Color Palette".into(),
            info: "Selects the palette. Later sentences only show in the pop-up.".into(),
            values: vec![
                ("default".into(), Some("Default".into())),
                ("rgb".into(), None),
            ],
            default_value: Some("rgb".into()),
        }]);

        let option = list.get("fceumm_palette").unwrap();
        assert_eq!(option.labels, vec!["Default", "rgb"]);
        assert_eq!(option.value(), "rgb");
        assert_eq!(option.desc, "Selects the palette");
        assert!(option.full.contains("pop-up"));
    }

    #[test]
    fn set_value_flags_change_once() {
        let mut list = OptionList::from_variables(&[RawVariable {
            key: "k".into(),
            value: "K; a|b".into(),
        }]);
        list.changed = false;

        list.set_value("k", "b");
        assert!(list.take_changed());
        assert!(!list.take_changed());
        assert_eq!(list.value("k"), Some("b"));
    }

    #[test]
    fn unknown_value_keeps_current_index() {
        let mut list = OptionList::from_variables(&[RawVariable {
            key: "k".into(),
            value: "K; a|b".into(),
        }]);
        list.changed = false;
        list.set_value("k", "zzz");
        assert_eq!(list.value("k"), Some("a"));
    }

    #[test]
    fn cycle_wraps_both_directions() {
        let mut option = CoreOption {
            key: "k".into(),
            name: "K".into(),
            desc: String::new(),
            full: String::new(),
            values: vec!["a".into(), "b".into(), "c".into()],
            labels: vec!["a".into(), "b".into(), "c".into()],
            default_index: 0,
            current_index: 0,
            locked: false,
        };

        option.cycle(-1);
        assert_eq!(option.current_index, 2);
        option.cycle(1);
        assert_eq!(option.current_index, 0);
    }
}
