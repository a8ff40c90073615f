//! Opening and closing game content: plain files, ZIP-packed ROMs, M3U
//! disc sets, and SRAM/RTC persistence.

use crate::archive::{self, ExtractedRom};
use crate::error::{DriverError, DriverResult};
use crate::libretro::{Core, ffi};
use crate::paths::SessionPaths;
use std::fs;
use std::path::{Path, PathBuf};

/// Loaded content and the resources needed to hand it to the core.
#[derive(Debug)]
pub struct Game {
    /// Originally requested path.
    pub path: PathBuf,
    /// Name used for save/state/config files. For a disc of a multi-disc
    /// set this is the M3U file's name, so every disc shares one save set.
    pub name: String,
    /// Path handed to the core (the temp file for extracted archives).
    pub load_path: PathBuf,
    /// In-memory ROM when the core does not require a real path.
    pub data: Option<Vec<u8>>,
    /// Detected M3U disc set, when the content sits beside one.
    pub disc_set: Option<DiscSet>,
    extracted: Option<ExtractedRom>,
}

/// A multi-disc set: all disc paths plus the index of the loaded one.
#[derive(Debug, Clone)]
pub struct DiscSet {
    pub m3u_path: PathBuf,
    pub base_dir: PathBuf,
    pub discs: Vec<PathBuf>,
    pub current: usize,
}

impl DiscSet {
    #[must_use]
    pub fn total(&self) -> usize {
        self.discs.len()
    }
}

/// Hierarchy-based M3U detection: `<rom_dir>/<rom_dir_name>.m3u`.
fn find_m3u(rom_path: &Path) -> Option<PathBuf> {
    let dir = rom_path.parent()?;
    let dir_name = dir.file_name()?;
    let m3u_path = dir.join(Path::new(dir_name).with_extension("m3u"));
    m3u_path.exists().then_some(m3u_path)
}

fn load_disc_set(m3u_path: &Path, rom_path: &Path) -> Option<DiscSet> {
    let base_dir = m3u_path.parent()?.to_path_buf();
    let text = match fs::read_to_string(m3u_path) {
        Ok(text) => text,
        Err(err) => {
            log::warn!("Unable to read m3u '{}': {err}", m3u_path.display());
            return None;
        }
    };

    let mut discs = Vec::new();
    let mut current = 0;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let disc_path = base_dir.join(line);
        if !disc_path.exists() {
            log::warn!("Skipping missing disc '{}'", disc_path.display());
            continue;
        }
        if disc_path == rom_path {
            current = discs.len();
        }
        discs.push(disc_path);
    }

    if discs.is_empty() {
        return None;
    }
    Some(DiscSet { m3u_path: m3u_path.to_path_buf(), base_dir, discs, current })
}

impl Game {
    /// Open content for the loaded core. ZIP archives are extracted unless
    /// the core handles zip natively; file contents are read into memory
    /// unless the core requires a real path.
    pub fn open(rom_path: &Path, core: &Core) -> DriverResult<Self> {
        log::info!("Opening game '{}'", rom_path.display());

        let is_zip = rom_path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("zip"));
        let core_supports_zip = core.extensions.iter().any(|ext| ext == "zip");

        let mut extracted = None;
        let mut load_path = rom_path.to_path_buf();
        if is_zip && !core_supports_zip {
            let rom = archive::extract_first_supported(rom_path, &core.extensions)?;
            load_path = rom.path.clone();
            extracted = Some(rom);
        }

        // Cores that open files themselves (eg. CD-based systems) must not
        // have the frontend slurp a disc image into memory
        let data = if core.need_fullpath {
            None
        } else {
            Some(fs::read(&load_path).map_err(|source| DriverError::RomRead {
                path: load_path.display().to_string(),
                source,
            })?)
        };

        let disc_set = find_m3u(rom_path).and_then(|m3u| load_disc_set(&m3u, rom_path));
        let name = match &disc_set {
            Some(set) => set
                .m3u_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            None => rom_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        Ok(Self { path: rom_path.to_path_buf(), name, load_path, data, disc_set, extracted })
    }

    /// Release content resources, removing any extraction directory.
    pub fn close(&mut self) {
        self.data = None;
        if let Some(extracted) = self.extracted.take() {
            if let Err(err) = fs::remove_dir_all(&extracted.temp_dir) {
                log::warn!(
                    "Unable to remove extraction directory '{}': {err}",
                    extracted.temp_dir.display()
                );
            }
        }
    }

    /// Swap to another disc of the set: close, reopen, and hand the new
    /// image to the core's disk-control interface.
    pub fn change_disc(&mut self, core: &mut Core, disc_path: &Path) -> DriverResult<()> {
        if disc_path == self.path || !disc_path.exists() {
            return Ok(());
        }

        self.close();
        let mut reopened = Game::open(disc_path, core)?;
        // The set identity (name, disc list) survives the swap
        if let (Some(new_set), Some(old_set)) = (&mut reopened.disc_set, &self.disc_set) {
            new_set.current = old_set
                .discs
                .iter()
                .position(|disc| disc == disc_path)
                .unwrap_or(new_set.current);
        }

        if !core.replace_disc(&reopened.load_path, reopened.data.as_deref()) {
            log::error!("Core rejected disc '{}'", disc_path.display());
        }

        *self = reopened;
        Ok(())
    }
}

impl Drop for Game {
    fn drop(&mut self) {
        self.close();
    }
}

/// Restore SRAM and RTC memory regions from disk, if present.
pub fn load_persistent_memory(core: &mut Core, paths: &SessionPaths, game_name: &str) {
    for (memory, path) in [
        (ffi::MEMORY_SAVE_RAM, paths.sram_path(game_name)),
        (ffi::MEMORY_RTC, paths.rtc_path(game_name)),
    ] {
        match fs::read(&path) {
            Ok(bytes) => {
                log::info!("Restoring {} bytes from '{}'", bytes.len(), path.display());
                core.write_memory(memory, &bytes);
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => log::warn!("Unable to read '{}': {err}", path.display()),
        }
    }
}

/// Persist SRAM and RTC memory regions. Called on menu entry, sleep, and
/// shutdown.
pub fn save_persistent_memory(core: &mut Core, paths: &SessionPaths, game_name: &str) {
    for (memory, path) in [
        (ffi::MEMORY_SAVE_RAM, paths.sram_path(game_name)),
        (ffi::MEMORY_RTC, paths.rtc_path(game_name)),
    ] {
        let Some(bytes) = core.read_memory(memory) else {
            continue;
        };
        if let Err(err) = fs::write(&path, &bytes) {
            log::error!("Unable to write '{}': {err}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(name: &str) -> Self {
            let path = std::env::temp_dir().join(format!("minarch-game-{name}-{}", std::process::id()));
            fs::create_dir_all(&path).unwrap();
            Self(path)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn m3u_detection_requires_matching_directory_name() {
        let dir = TempDir::new("m3u");
        let game_dir = dir.0.join("Final Fantasy VII");
        fs::create_dir_all(&game_dir).unwrap();
        let disc = game_dir.join("disc1.bin");
        fs::write(&disc, b"x").unwrap();

        assert!(find_m3u(&disc).is_none());

        fs::write(game_dir.join("Final Fantasy VII.m3u"), "disc1.bin\n").unwrap();
        assert!(find_m3u(&disc).is_some());
    }

    #[test]
    fn disc_set_skips_blank_lines_and_missing_discs() {
        let dir = TempDir::new("discs");
        let game_dir = dir.0.join("Game");
        fs::create_dir_all(&game_dir).unwrap();
        fs::write(game_dir.join("disc1.bin"), b"1").unwrap();
        fs::write(game_dir.join("disc2.bin"), b"2").unwrap();
        let m3u = game_dir.join("Game.m3u");
        fs::write(&m3u, "disc1.bin\n\nmissing.bin\ndisc2.bin\n").unwrap();

        let set = load_disc_set(&m3u, &game_dir.join("disc2.bin")).unwrap();
        assert_eq!(set.total(), 2);
        assert_eq!(set.current, 1);
    }
}
