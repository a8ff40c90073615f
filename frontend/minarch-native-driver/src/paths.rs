//! Per-core filesystem layout under the userdata root.

use crate::error::{DriverError, DriverResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Directories used by one emulator session:
///
/// ```text
/// <userdata>/<core tag>/bios/      core BIOS / system files
/// <userdata>/<core tag>/saves/     SRAM and RTC
/// <userdata>/<core tag>/states/    save states, previews, disc markers
/// <userdata>/<core tag>/*.cfg      user config layer
/// ```
#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub root: PathBuf,
    pub bios_dir: PathBuf,
    pub saves_dir: PathBuf,
    pub states_dir: PathBuf,
}

impl SessionPaths {
    pub fn create(root: PathBuf) -> DriverResult<Self> {
        let paths = Self {
            bios_dir: root.join("bios"),
            saves_dir: root.join("saves"),
            states_dir: root.join("states"),
            root,
        };

        for dir in [&paths.root, &paths.bios_dir, &paths.saves_dir, &paths.states_dir] {
            fs::create_dir_all(dir).map_err(|source| DriverError::CreateDir {
                path: dir.display().to_string(),
                source,
            })?;
        }
        Ok(paths)
    }

    #[must_use]
    pub fn sram_path(&self, game_name: &str) -> PathBuf {
        self.saves_dir.join(format!("{game_name}.sav"))
    }

    #[must_use]
    pub fn rtc_path(&self, game_name: &str) -> PathBuf {
        self.saves_dir.join(format!("{game_name}.rtc"))
    }

    #[must_use]
    pub fn state_path(&self, game_name: &str, slot: usize) -> PathBuf {
        self.states_dir.join(format!("{game_name}.st{slot}"))
    }

    #[must_use]
    pub fn preview_path(&self, game_name: &str, slot: usize) -> PathBuf {
        self.states_dir.join(format!("{game_name}.{slot}.bmp"))
    }

    #[must_use]
    pub fn disc_marker_path(&self, game_name: &str, slot: usize) -> PathBuf {
        self.states_dir.join(format!("{game_name}.{slot}.txt"))
    }

    /// Remembers the last used save slot across launches.
    #[must_use]
    pub fn slot_memory_path(&self, game_name: &str) -> PathBuf {
        self.states_dir.join(format!("{game_name}.txt"))
    }

    /// Auto-resume marker naming the ROM to resume on next launch.
    #[must_use]
    pub fn resume_marker_path(&self) -> PathBuf {
        self.root.join("resume.txt")
    }

    /// Config layer locations for this session. The pak default ships
    /// beside the emulator module.
    #[must_use]
    pub fn config_paths(&self, core_path: &Path, game_name: &str) -> minarch_config::ConfigPaths {
        let pak_cfg = core_path.parent().map_or_else(
            || PathBuf::from("default.cfg"),
            |dir| dir.join("default.cfg"),
        );

        // The system layer is device-wide, one level above the per-core root
        let system_cfg = self
            .root
            .parent()
            .map_or_else(|| self.root.join("system.cfg"), |base| base.join("system.cfg"));

        minarch_config::ConfigPaths {
            system_cfg,
            pak_cfg,
            user_dir: self.root.clone(),
            game_name: game_name.to_string(),
        }
    }
}
