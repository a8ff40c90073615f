//! Three-tier layered configuration.
//!
//! Layers merge in order (later wins): system config, per-emulator pak
//! defaults, then the user layer, where a per-game file takes precedence
//! over the console-wide one. A `-` prefix on a key in any layer locks that
//! option: the configured value applies and the option disappears from the
//! options menu.
//!
//! File format is line-based `key = value`; bindings use
//! `bind <display name> = <BUTTON>` with `MENU+<BUTTON>` for
//! modifier-gated bindings and `NONE` to unbind.

pub mod frontend_options;
pub mod input;
pub mod options;

use crate::input::ButtonMapping;
use crate::options::OptionList;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error writing config file to '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Error removing config file '{path}': {source}")]
    Remove {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Which user layer is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigScope {
    #[default]
    None,
    /// Console-wide `minarch.cfg`
    Console,
    /// Per-game `<game>.cfg`
    Game,
}

/// Filesystem locations of the three layers.
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Device-wide config, fixed path.
    pub system_cfg: PathBuf,
    /// Defaults shipped beside the emulator module.
    pub pak_cfg: PathBuf,
    /// Directory holding the user layer files.
    pub user_dir: PathBuf,
    /// Game name used for the per-game override file.
    pub game_name: String,
}

impl ConfigPaths {
    #[must_use]
    pub fn console_path(&self) -> PathBuf {
        self.user_dir.join("minarch.cfg")
    }

    #[must_use]
    pub fn game_path(&self) -> PathBuf {
        self.user_dir.join(format!("{}.cfg", self.game_name))
    }
}

/// Default userdata root when the caller does not supply one:
/// `<local data dir>/minarch/<core tag>`.
#[must_use]
pub fn default_userdata_dir(core_tag: &str) -> PathBuf {
    let Some(base_dirs) = directories::BaseDirs::new() else {
        log::error!("Unable to determine user base directories, using current directory");
        return PathBuf::from(".").join("minarch").join(core_tag);
    };

    base_dirs.data_local_dir().join("minarch").join(core_tag)
}

#[derive(Debug, Default)]
pub struct Config {
    pub frontend: OptionList,
    pub core: OptionList,
    pub controls: Vec<ButtonMapping>,
    pub shortcuts: Vec<ButtonMapping>,
    pub scope: ConfigScope,
    // Raw layer texts, merge order; kept because core options register
    // after the files are read and must be re-applied
    system_text: Option<String>,
    pak_text: Option<String>,
    user_text: Option<String>,
}

fn read_layer(path: &Path) -> Option<String> {
    match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            log::warn!("Unable to read config layer '{}': {err}", path.display());
            None
        }
    }
}

impl Config {
    /// Read all layers from disk. Option and binding application happens
    /// separately so late-registered core options can re-apply.
    #[must_use]
    pub fn load(paths: &ConfigPaths, supports_cropped: bool) -> Self {
        let system_text = read_layer(&paths.system_cfg);
        let pak_text = read_layer(&paths.pak_cfg);

        let game_path = paths.game_path();
        let (user_text, scope) = match read_layer(&game_path) {
            Some(text) => (Some(text), ConfigScope::Game),
            None => match read_layer(&paths.console_path()) {
                Some(text) => (Some(text), ConfigScope::Console),
                None => (None, ConfigScope::None),
            },
        };

        log::info!("Config scope: {scope:?}");

        Self {
            frontend: frontend_options::frontend_option_list(supports_cropped),
            core: OptionList::default(),
            controls: input::default_button_mappings(),
            shortcuts: input::default_shortcut_mappings(),
            scope,
            system_text,
            pak_text,
            user_text,
        }
    }

    fn layers(&self) -> impl Iterator<Item = &str> {
        self.system_text
            .as_deref()
            .into_iter()
            .chain(self.pak_text.as_deref())
            .chain(self.user_text.as_deref())
    }

    /// Apply option values from every layer, in order, to both option
    /// lists. Locked keys (`-` prefix) hide the option from the UI.
    pub fn read_options(&mut self) {
        let mut assignments: Vec<(String, String, bool)> = Vec::new();
        for layer in self.layers() {
            for line in layer.lines() {
                let line = line.trim_end();
                if line.is_empty() || line.starts_with("bind ") {
                    continue;
                }
                let Some((key, value)) = line.split_once(" = ") else {
                    continue;
                };
                let (key, locked) = match key.strip_prefix('-') {
                    Some(stripped) => (stripped, true),
                    None => (key, false),
                };
                assignments.push((key.to_string(), value.to_string(), locked));
            }
        }

        for (key, value, locked) in assignments {
            for list in [&mut self.frontend, &mut self.core] {
                if let Some(option) = list.get_mut(&key) {
                    option.set_value(&value);
                    if locked {
                        option.locked = true;
                    }
                    break;
                }
            }
        }
    }

    /// Apply `bind` lines from the pak and user layers to controls and
    /// shortcuts, matching on display name.
    pub fn read_controls(&mut self) {
        let layers: Vec<&str> =
            self.pak_text.as_deref().into_iter().chain(self.user_text.as_deref()).collect();

        for layer in layers {
            for line in layer.lines() {
                let Some(rest) = line.trim_end().strip_prefix("bind ") else {
                    continue;
                };
                let Some((name, label)) = rest.split_once(" = ") else {
                    continue;
                };

                let mapping = self
                    .controls
                    .iter_mut()
                    .chain(self.shortcuts.iter_mut())
                    .find(|mapping| mapping.name == name);
                match mapping {
                    Some(mapping) => mapping.decode(label),
                    None => log::warn!("Ignoring binding for unknown control '{name}'"),
                }
            }
        }
    }

    /// Serialize the current state to the chosen user layer. Writing the
    /// console layer removes a stale per-game file.
    pub fn write(&mut self, paths: &ConfigPaths, per_game: bool) -> Result<(), ConfigError> {
        let path = if per_game {
            paths.game_path()
        } else {
            if self.scope == ConfigScope::Game {
                remove_quietly(&paths.game_path())?;
            }
            paths.console_path()
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.display().to_string(),
                source,
            })?;
        }

        let mut text = String::new();
        for option in self.frontend.options.iter().chain(&self.core.options) {
            text.push_str(&format!("{} = {}\n", option.key, option.value()));
        }
        for mapping in self.controls.iter().chain(&self.shortcuts) {
            text.push_str(&format!("bind {} = {}\n", mapping.name, mapping.encode()));
        }

        fs::write(&path, text)
            .map_err(|source| ConfigError::Write { path: path.display().to_string(), source })?;

        self.scope = if per_game { ConfigScope::Game } else { ConfigScope::Console };
        self.user_text = None;
        Ok(())
    }

    /// Delete the active user layer and reapply the remaining layers over
    /// defaults.
    pub fn restore_defaults(&mut self, paths: &ConfigPaths) -> Result<(), ConfigError> {
        match self.scope {
            ConfigScope::Game => remove_quietly(&paths.game_path())?,
            ConfigScope::Console => remove_quietly(&paths.console_path())?,
            ConfigScope::None => {}
        }
        self.scope = ConfigScope::None;
        self.user_text = None;

        self.frontend.reset_to_defaults();
        self.core.reset_to_defaults();
        for mapping in &mut self.controls {
            mapping.reset();
        }
        for mapping in &mut self.shortcuts {
            mapping.clear();
        }

        self.read_options();
        self.read_controls();
        Ok(())
    }
}

fn remove_quietly(path: &Path) -> Result<(), ConfigError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => {
            Err(ConfigError::Remove { path: path.display().to_string(), source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend_options::{KEY_SCALING, KEY_SHARPNESS};
    use crate::options::RawVariable;
    use minarch_common::input::JoypadButton;
    use std::fs;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!("minarch-config-{name}-{}", std::process::id()));
            fs::create_dir_all(&path).unwrap();
            Self(path)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn paths(dir: &TempDir) -> ConfigPaths {
        ConfigPaths {
            system_cfg: dir.0.join("system.cfg"),
            pak_cfg: dir.0.join("default.cfg"),
            user_dir: dir.0.clone(),
            game_name: "Super Test (USA)".into(),
        }
    }

    #[test]
    fn later_layers_win() {
        let dir = TempDir::new("layers");
        let paths = paths(&dir);
        fs::write(&paths.system_cfg, "minarch_screen_scaling = Native\n").unwrap();
        fs::write(&paths.pak_cfg, "minarch_screen_scaling = Fullscreen\n").unwrap();
        fs::write(paths.console_path(), "minarch_screen_scaling = Aspect\n").unwrap();

        let mut config = Config::load(&paths, true);
        config.read_options();

        assert_eq!(config.scope, ConfigScope::Console);
        assert_eq!(config.frontend.value(KEY_SCALING), Some("Aspect"));
    }

    #[test]
    fn per_game_file_takes_precedence() {
        let dir = TempDir::new("pergame");
        let paths = paths(&dir);
        fs::write(paths.console_path(), "minarch_screen_sharpness = Sharp\n").unwrap();
        fs::write(paths.game_path(), "minarch_screen_sharpness = Crisp\n").unwrap();

        let mut config = Config::load(&paths, true);
        config.read_options();

        assert_eq!(config.scope, ConfigScope::Game);
        assert_eq!(config.frontend.value(KEY_SHARPNESS), Some("Crisp"));
    }

    #[test]
    fn locked_keys_hide_options_but_apply_values() {
        let dir = TempDir::new("lock");
        let paths = paths(&dir);
        fs::write(&paths.pak_cfg, "-minarch_screen_scaling = Fullscreen\n").unwrap();

        let mut config = Config::load(&paths, true);
        config.read_options();

        let option = config.frontend.get(KEY_SCALING).unwrap();
        assert!(option.locked);
        assert_eq!(option.value(), "Fullscreen");
        assert!(config.frontend.enabled().all(|option| option.key != KEY_SCALING));
    }

    #[test]
    fn core_options_pick_up_layer_values_after_registration() {
        let dir = TempDir::new("late");
        let paths = paths(&dir);
        fs::write(paths.console_path(), "gpsp_frameskip = auto\n").unwrap();

        let mut config = Config::load(&paths, true);
        config.read_options(); // before the core registered anything

        config.core = OptionList::from_variables(&[RawVariable {
            key: "gpsp_frameskip".into(),
            value: "Frameskip; off|auto|manual".into(),
        }]);
        config.read_options();

        assert_eq!(config.core.value("gpsp_frameskip"), Some("auto"));
    }

    #[test]
    fn bindings_parse_from_pak_and_user_layers() {
        let dir = TempDir::new("binds");
        let paths = paths(&dir);
        fs::write(&paths.pak_cfg, "bind A Button = B\n").unwrap();
        fs::write(paths.console_path(), "bind Save State = MENU+R1\nbind A Button = A\n").unwrap();

        let mut config = Config::load(&paths, true);
        config.read_controls();

        let a = config.controls.iter().find(|mapping| mapping.name == "A Button").unwrap();
        assert_eq!(a.local, Some(JoypadButton::A));

        let save = config.shortcuts.iter().find(|mapping| mapping.name == "Save State").unwrap();
        assert_eq!(save.local, Some(JoypadButton::R1));
        assert!(save.modifier);
    }

    #[test]
    fn write_and_reload_round_trips() {
        let dir = TempDir::new("roundtrip");
        let paths = paths(&dir);

        let mut config = Config::load(&paths, true);
        config.frontend.set_value(KEY_SCALING, "Fullscreen");
        config.shortcuts[0].decode("MENU+L1");
        config.write(&paths, false).unwrap();

        let mut reloaded = Config::load(&paths, true);
        reloaded.read_options();
        reloaded.read_controls();

        assert_eq!(reloaded.scope, ConfigScope::Console);
        assert_eq!(reloaded.frontend.value(KEY_SCALING), Some("Fullscreen"));
        assert_eq!(reloaded.shortcuts[0].encode(), "MENU+L1");
    }

    #[test]
    fn writing_console_scope_removes_stale_game_file() {
        let dir = TempDir::new("stale");
        let paths = paths(&dir);
        fs::write(paths.game_path(), "minarch_screen_scaling = Native\n").unwrap();

        let mut config = Config::load(&paths, true);
        assert_eq!(config.scope, ConfigScope::Game);

        config.write(&paths, false).unwrap();
        assert!(!paths.game_path().exists());
        assert!(paths.console_path().exists());
    }

    #[test]
    fn restore_defaults_deletes_user_layer() {
        let dir = TempDir::new("restore");
        let paths = paths(&dir);
        fs::write(paths.console_path(), "minarch_screen_scaling = Fullscreen\n").unwrap();

        let mut config = Config::load(&paths, true);
        config.read_options();
        assert_eq!(config.frontend.value(KEY_SCALING), Some("Fullscreen"));

        config.restore_defaults(&paths).unwrap();
        assert!(!paths.console_path().exists());
        assert_eq!(config.frontend.value(KEY_SCALING), Some("Aspect"));
        assert_eq!(config.scope, ConfigScope::None);
    }
}
