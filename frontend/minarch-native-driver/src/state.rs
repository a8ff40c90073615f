//! Save states, preview thumbnails, and the auto-resume protocol.
//!
//! States are the core's opaque serialized buffers, written raw to
//! `<name>.st<slot>`. Slots 0-7 are user-facing; slot 8 is reserved for
//! auto-resume and hidden from the menu. Previews are BMPs of the uncropped
//! source frame in the core's native geometry.

use crate::error::{DriverError, DriverResult};
use crate::libretro::Core;
use crate::paths::SessionPaths;
use minarch_common::frontend::{expand_5_to_8, expand_6_to_8};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

pub const SAVE_SLOT_COUNT: usize = 8;
pub const AUTO_RESUME_SLOT: usize = 8;

/// Slot metadata derived from filesystem state.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotStatus {
    pub save_exists: bool,
    pub preview_exists: bool,
}

#[derive(Debug)]
pub struct StateManager {
    paths: SessionPaths,
    game_name: String,
    /// Currently targeted slot, remembered across launches.
    pub slot: usize,
}

impl StateManager {
    #[must_use]
    pub fn new(paths: SessionPaths, game_name: &str) -> Self {
        let mut slot = fs::read_to_string(paths.slot_memory_path(game_name))
            .ok()
            .and_then(|text| text.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if slot >= SAVE_SLOT_COUNT {
            slot = 0;
        }

        Self { paths, game_name: game_name.to_string(), slot }
    }

    #[must_use]
    pub fn status(&self, slot: usize) -> SlotStatus {
        let save_exists = self.paths.state_path(&self.game_name, slot).exists();
        let preview_exists =
            save_exists && self.paths.preview_path(&self.game_name, slot).exists();
        SlotStatus { save_exists, preview_exists }
    }

    #[must_use]
    pub fn preview_path(&self, slot: usize) -> std::path::PathBuf {
        self.paths.preview_path(&self.game_name, slot)
    }

    fn remember_slot(&self) {
        let path = self.paths.slot_memory_path(&self.game_name);
        if let Err(err) = fs::write(&path, self.slot.to_string()) {
            log::warn!("Unable to remember save slot: {err}");
        }
    }

    /// Serialize the core into a slot. The buffer is sized from the
    /// reported serialize size at this moment.
    pub fn write(&mut self, core: &mut Core, slot: usize) -> DriverResult<()> {
        let size = core.serialize_size();
        if size == 0 {
            log::warn!("Core reports zero serialize size, skipping save");
            return Ok(());
        }

        let mut buffer = vec![0_u8; size];
        if !core.serialize(&mut buffer) {
            return Err(DriverError::StateSerialize);
        }

        let path = self.paths.state_path(&self.game_name, slot);
        fs::write(&path, &buffer).map_err(|source| DriverError::StateFileWrite {
            path: path.display().to_string(),
            source,
        })?;

        log::info!("Saved state to '{}'", path.display());
        if slot != AUTO_RESUME_SLOT {
            self.slot = slot;
            self.remember_slot();
        }
        Ok(())
    }

    /// Restore a slot. Some cores report a serialize size that later grows,
    /// so a shorter file is accepted as long as it fits the allocation.
    /// A missing file is not an error (and not even noteworthy for the
    /// auto-resume slot).
    pub fn read(&mut self, core: &mut Core, slot: usize) -> DriverResult<()> {
        let size = core.serialize_size();
        if size == 0 {
            return Ok(());
        }

        let path = self.paths.state_path(&self.game_name, slot);
        let file_data = match fs::read(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                if slot != AUTO_RESUME_SLOT {
                    log::error!("No state file at '{}'", path.display());
                }
                return Ok(());
            }
            Err(source) => {
                return Err(DriverError::StateFileOpen {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        let mut buffer = vec![0_u8; size];
        if file_data.len() > size {
            log::error!(
                "State file '{}' is larger than the reported size ({} > {size})",
                path.display(),
                file_data.len()
            );
            return Ok(());
        }
        buffer[..file_data.len()].copy_from_slice(&file_data);

        if !core.unserialize(&buffer) {
            return Err(DriverError::StateRestore { path: path.display().to_string() });
        }

        log::info!("Loaded state from '{}'", path.display());
        if slot != AUTO_RESUME_SLOT {
            self.slot = slot;
            self.remember_slot();
        }
        Ok(())
    }

    /// Write a BMP preview of the uncropped RGB565 source frame beside a
    /// slot's state.
    pub fn write_preview(&self, slot: usize, frame: &[u8], width: u32, height: u32, pitch: u32) {
        let path = self.paths.preview_path(&self.game_name, slot);
        let pitch = if pitch == 0 { width * 2 } else { pitch };

        let mut image = image::RgbImage::new(width, height);
        for (y, row) in image.rows_mut().enumerate() {
            let row_off = y * pitch as usize;
            for (x, pixel) in row.enumerate() {
                let off = row_off + x * 2;
                let rgb565 = u16::from_ne_bytes([frame[off], frame[off + 1]]);
                *pixel = image::Rgb([
                    expand_5_to_8((rgb565 >> 11) & 0x1F),
                    expand_6_to_8((rgb565 >> 5) & 0x3F),
                    expand_5_to_8(rgb565 & 0x1F),
                ]);
            }
        }

        if let Err(err) = image.save(&path) {
            log::error!("Unable to write preview '{}': {err}", path.display());
        }
    }

    /// Load a slot preview back as RGB565 pixels, or None when absent or
    /// unreadable.
    #[must_use]
    pub fn read_preview(&self, slot: usize) -> Option<(Vec<u16>, u32, u32)> {
        let path = self.paths.preview_path(&self.game_name, slot);
        let image = image::open(&path).ok()?.into_rgb8();

        let (width, height) = image.dimensions();
        let pixels = image
            .pixels()
            .map(|px| {
                (u16::from(px.0[0] >> 3) << 11)
                    | (u16::from(px.0[1] >> 2) << 5)
                    | u16::from(px.0[2] >> 3)
            })
            .collect();
        Some((pixels, width, height))
    }

    /// Record which disc of a multi-disc set a slot was saved on.
    pub fn write_disc_marker(&self, slot: usize, base_dir: &Path, disc_path: &Path) {
        let relative = disc_path.strip_prefix(base_dir).unwrap_or(disc_path);
        let path = self.paths.disc_marker_path(&self.game_name, slot);
        if let Err(err) = fs::write(&path, relative.to_string_lossy().as_bytes()) {
            log::error!("Unable to write disc marker '{}': {err}", path.display());
        }
    }

    /// The disc path a slot was saved on, resolved against the set's base
    /// directory.
    #[must_use]
    pub fn read_disc_marker(&self, slot: usize, base_dir: &Path) -> Option<std::path::PathBuf> {
        let path = self.paths.disc_marker_path(&self.game_name, slot);
        let text = fs::read_to_string(path).ok()?;
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let marker = Path::new(text);
        Some(if marker.is_absolute() { marker.to_path_buf() } else { base_dir.join(marker) })
    }

    /// Write the auto-resume state and marker before sleep or shutdown.
    pub fn autosave(&mut self, core: &mut Core, rom_path: &Path) {
        if let Err(err) = self.write(core, AUTO_RESUME_SLOT) {
            log::error!("Autosave failed: {err}");
            return;
        }

        let marker = self.paths.resume_marker_path();
        if let Err(err) = fs::write(&marker, rom_path.to_string_lossy().as_bytes()) {
            log::error!("Unable to write resume marker '{}': {err}", marker.display());
        }
    }

    /// Resume from the auto-resume slot if the marker names this ROM. The
    /// marker is deleted either way once it matches.
    pub fn resume(&mut self, core: &mut Core, rom_path: &Path) -> DriverResult<()> {
        let marker = self.paths.resume_marker_path();
        let Ok(text) = fs::read_to_string(&marker) else {
            return Ok(());
        };

        if Path::new(text.trim()) != rom_path {
            return Ok(());
        }

        if let Err(err) = fs::remove_file(&marker) {
            log::warn!("Unable to remove resume marker: {err}");
        }

        self.read(core, AUTO_RESUME_SLOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TempDir(std::path::PathBuf);

    impl TempDir {
        fn new(name: &str) -> Self {
            let path =
                std::env::temp_dir().join(format!("minarch-state-{name}-{}", std::process::id()));
            fs::create_dir_all(&path).unwrap();
            Self(path)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    fn manager(dir: &TempDir) -> StateManager {
        let paths = SessionPaths::create(dir.0.clone()).unwrap();
        StateManager::new(paths, "game.gba")
    }

    #[test]
    fn preview_round_trips_rgb565() {
        let dir = TempDir::new("preview");
        let manager = manager(&dir);

        let pixels: [u16; 4] = [0xF800, 0x07E0, 0x001F, 0xFFFF];
        let frame: Vec<u8> = pixels.iter().flat_map(|px| px.to_ne_bytes()).collect();
        manager.write_preview(0, &frame, 2, 2, 0);

        let (loaded, width, height) = manager.read_preview(0).unwrap();
        assert_eq!((width, height), (2, 2));
        assert_eq!(loaded, pixels);
    }

    #[test]
    fn slot_memory_persists_and_clamps() {
        let dir = TempDir::new("slots");
        let paths = SessionPaths::create(dir.0.clone()).unwrap();
        fs::write(paths.slot_memory_path("game.gba"), "5").unwrap();
        assert_eq!(StateManager::new(paths.clone(), "game.gba").slot, 5);

        // The auto-resume slot never persists as the user slot
        fs::write(paths.slot_memory_path("game.gba"), "8").unwrap();
        assert_eq!(StateManager::new(paths, "game.gba").slot, 0);
    }

    #[test]
    fn disc_markers_resolve_relative_paths() {
        let dir = TempDir::new("markers");
        let manager = manager(&dir);
        let base = Path::new("/roms/Game");

        manager.write_disc_marker(2, base, &base.join("disc2.bin"));
        let resolved = manager.read_disc_marker(2, base).unwrap();
        assert_eq!(resolved, base.join("disc2.bin"));
    }

    #[test]
    fn status_reports_missing_slots() {
        let dir = TempDir::new("status");
        let manager = manager(&dir);
        let status = manager.status(3);
        assert!(!status.save_exists);
        assert!(!status.preview_exists);
    }
}
