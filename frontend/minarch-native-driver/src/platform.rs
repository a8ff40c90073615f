//! The platform abstraction: framebuffer, vsync, input decode, audio sink,
//! rumble, CPU speed, and the text primitives the menu draws with.
//!
//! Real devices implement this over their display engine and input stack;
//! the crate ships only the trait and a headless double for tests.

use minarch_common::frontend::PixelFormat;
use minarch_common::input::Buttons;
use minarch_renderer::{DeviceGeometry, ScreenEffect, Sharpness};

/// A CPU-accessible pixel surface. Pixel format matches the platform's
/// framebuffer format; pitch may exceed `width * bytes_per_pixel`.
#[derive(Debug, Clone)]
pub struct Surface {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
}

impl Surface {
    #[must_use]
    pub fn new(width: u32, height: u32, pitch: u32) -> Self {
        Self { pixels: vec![0; (pitch * height) as usize], width, height, pitch }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Resize in place, reallocating and clearing the pixel store.
    pub fn resize(&mut self, width: u32, height: u32, pitch: u32) {
        self.width = width;
        self.height = height;
        self.pitch = pitch;
        self.pixels.clear();
        self.pixels.resize((pitch * height) as usize, 0);
    }

    /// Fill a rectangle with an RGB565 color, clipped to the surface.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: u16) {
        let bytes = color.to_ne_bytes();
        for row in y..(y + h).min(self.height) {
            let row_off = (row * self.pitch) as usize;
            for col in x..(x + w).min(self.width) {
                let off = row_off + (col * 2) as usize;
                self.pixels[off..off + 2].copy_from_slice(&bytes);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VsyncMode {
    Off,
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuSpeed {
    Menu,
    Powersave,
    Normal,
    Performance,
}

/// One stereo audio frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioFrame {
    pub left: i16,
    pub right: i16,
}

/// Text sizes the menu uses; rasterization is the platform's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextStyle {
    Large,
    LargeInverted,
    Medium,
    Small,
}

pub trait Platform {
    fn device_geometry(&self) -> DeviceGeometry;

    fn framebuffer_format(&self) -> PixelFormat {
        PixelFormat::Rgb565
    }

    /// Whether the device can display the Cropped scaling mode.
    fn supports_cropped(&self) -> bool {
        false
    }

    /// True when the display hardware scales and wants a logical-size
    /// source; false when it needs a pre-scaled pixel buffer.
    fn fit_to_device(&self) -> bool {
        false
    }

    /// Reconfigure the display for a new surface geometry.
    fn resize(&mut self, width: u32, height: u32, pitch: u32);

    /// Present a finished surface.
    fn flip(&mut self, surface: &Surface);

    /// Block until vblank (or sleep the remaining frame budget).
    fn vsync_wait(&mut self, _remaining_ms: i32) {}

    fn set_vsync(&mut self, _mode: VsyncMode) {}

    fn set_sharpness(&mut self, _sharpness: Sharpness) {}

    fn set_effect(&mut self, _effect: ScreenEffect) {}

    fn set_cpu_speed(&mut self, _speed: CpuSpeed) {}

    fn set_rumble(&mut self, _strength: u16) {}

    fn audio_init(&mut self, _sample_rate: f64, _fps: f64) {}

    /// Decode pending input events into the frame's button bitmask.
    fn poll_input(&mut self) -> Buttons;

    /// Push a batch of stereo frames into the mixer queue.
    fn push_audio(&mut self, frames: &[AudioFrame]);

    fn draw_text(&mut self, _surface: &mut Surface, _text: &str, _x: i32, _y: i32, _style: TextStyle) {
    }

    fn text_width(&self, text: &str, _style: TextStyle) -> u32 {
        8 * text.len() as u32
    }
}

/// In-memory platform for tests: fixed geometry, scripted input, counted
/// flips.
#[derive(Debug)]
pub struct HeadlessPlatform {
    pub geometry: DeviceGeometry,
    pub cropped_support: bool,
    pub fit: bool,
    /// Button states served to successive `poll_input` calls; the last
    /// entry repeats once the script runs out.
    pub input_script: std::collections::VecDeque<Buttons>,
    pub flips: u32,
    pub resizes: Vec<(u32, u32, u32)>,
    pub audio_frames: usize,
    pub rumble: u16,
}

impl HeadlessPlatform {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            geometry: DeviceGeometry { width, height, pitch: width * 2 },
            cropped_support: true,
            fit: false,
            input_script: std::collections::VecDeque::new(),
            flips: 0,
            resizes: Vec::new(),
            audio_frames: 0,
            rumble: 0,
        }
    }
}

impl Platform for HeadlessPlatform {
    fn device_geometry(&self) -> DeviceGeometry {
        self.geometry
    }

    fn supports_cropped(&self) -> bool {
        self.cropped_support
    }

    fn fit_to_device(&self) -> bool {
        self.fit
    }

    fn resize(&mut self, width: u32, height: u32, pitch: u32) {
        self.resizes.push((width, height, pitch));
    }

    fn flip(&mut self, _surface: &Surface) {
        self.flips += 1;
    }

    fn set_rumble(&mut self, strength: u16) {
        self.rumble = strength;
    }

    fn poll_input(&mut self) -> Buttons {
        if self.input_script.len() > 1 {
            self.input_script.pop_front().unwrap_or(Buttons::NONE)
        } else {
            self.input_script.front().copied().unwrap_or(Buttons::NONE)
        }
    }

    fn push_audio(&mut self, frames: &[AudioFrame]) {
        self.audio_frames += frames.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_rect_clips_to_surface() {
        let mut surface = Surface::new(4, 4, 8);
        surface.fill_rect(2, 2, 10, 10, 0xFFFF);

        for y in 0..4_u32 {
            for x in 0..4_u32 {
                let off = (y * 8 + x * 2) as usize;
                let px = u16::from_ne_bytes([surface.pixels[off], surface.pixels[off + 1]]);
                let expected = if x >= 2 && y >= 2 { 0xFFFF } else { 0 };
                assert_eq!(px, expected);
            }
        }
    }

    #[test]
    fn headless_input_script_repeats_last_entry() {
        let mut platform = HeadlessPlatform::new(320, 240);
        let mut pressed = Buttons::NONE;
        pressed.press(minarch_common::input::JoypadButton::A);
        platform.input_script.push_back(Buttons::NONE);
        platform.input_script.push_back(pressed);

        assert_eq!(platform.poll_input(), Buttons::NONE);
        assert_eq!(platform.poll_input(), pressed);
        assert_eq!(platform.poll_input(), pressed);
    }
}
