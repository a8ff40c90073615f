//! Scaler selection: turns source geometry, device geometry, and the user's
//! scaling mode into a populated render descriptor with the right blitter.

use minarch_common::frontend::PixelFormat;
use minarch_scaler::{Scaler, convert, effect, fractional, lookup16, lookup32};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// User-selected screen scaling mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScalingMode {
    Native,
    #[default]
    Aspect,
    Fullscreen,
    Cropped,
}

impl ScalingMode {
    /// Cycle to the next mode, skipping Cropped on devices that cannot crop.
    #[must_use]
    pub fn cycled(self, supports_cropped: bool) -> Self {
        match self {
            Self::Native => Self::Aspect,
            Self::Aspect => Self::Fullscreen,
            Self::Fullscreen => {
                if supports_cropped {
                    Self::Cropped
                } else {
                    Self::Native
                }
            }
            Self::Cropped => Self::Native,
        }
    }
}

impl Display for ScalingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => write!(f, "Native"),
            Self::Aspect => write!(f, "Aspect"),
            Self::Fullscreen => write!(f, "Fullscreen"),
            Self::Cropped => write!(f, "Cropped"),
        }
    }
}

impl FromStr for ScalingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Native" => Ok(Self::Native),
            "Aspect" => Ok(Self::Aspect),
            "Fullscreen" => Ok(Self::Fullscreen),
            "Cropped" => Ok(Self::Cropped),
            _ => Err(format!("invalid scaling mode: {s}")),
        }
    }
}

/// Platform scaling filter hint. Native mode always renders sharp regardless
/// of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sharpness {
    Sharp,
    Crisp,
    #[default]
    Soft,
}

impl Display for Sharpness {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sharp => write!(f, "Sharp"),
            Self::Crisp => write!(f, "Crisp"),
            Self::Soft => write!(f, "Soft"),
        }
    }
}

impl FromStr for Sharpness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Sharp" => Ok(Self::Sharp),
            "Crisp" => Ok(Self::Crisp),
            "Soft" => Ok(Self::Soft),
            _ => Err(format!("invalid sharpness: {s}")),
        }
    }
}

/// CRT-style post effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenEffect {
    #[default]
    None,
    Line,
    Grid,
}

impl ScreenEffect {
    #[must_use]
    pub fn cycled(self) -> Self {
        match self {
            Self::None => Self::Line,
            Self::Line => Self::Grid,
            Self::Grid => Self::None,
        }
    }
}

impl Display for ScreenEffect {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Line => write!(f, "Line"),
            Self::Grid => write!(f, "Grid"),
        }
    }
}

impl FromStr for ScreenEffect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "None" => Ok(Self::None),
            "Line" => Ok(Self::Line),
            "Grid" => Ok(Self::Grid),
            _ => Err(format!("invalid effect: {s}")),
        }
    }
}

/// Device output geometry as reported by the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceGeometry {
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
}

/// Size and pitch the platform surface must be resized to before blitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSpec {
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
}

/// The mutable record governing every blit. `scale` is the integer factor,
/// `-1` for the fractional path, or `0` for a forced-crop copy. `aspect` is
/// `0.0` for integer modes, `-1.0` for fullscreen stretch, or the
/// core-reported ratio. `dst_p == 0` is the sentinel meaning "reselect on
/// the next frame".
#[derive(Debug, Clone, Copy)]
pub struct RenderDescriptor {
    pub src_x: u32,
    pub src_y: u32,
    pub src_w: u32,
    pub src_h: u32,
    pub src_p: u32,
    /// Uncropped source size as reported by the emulator; geometry changes
    /// are detected against these.
    pub true_w: u32,
    pub true_h: u32,
    pub dst_x: u32,
    pub dst_y: u32,
    pub dst_w: u32,
    pub dst_h: u32,
    pub dst_p: u32,
    pub scale: i32,
    pub aspect: f64,
    pub blit: Option<Scaler>,
}

impl Default for RenderDescriptor {
    fn default() -> Self {
        Self {
            src_x: 0,
            src_y: 0,
            src_w: 0,
            src_h: 0,
            src_p: 0,
            true_w: 0,
            true_h: 0,
            dst_x: 0,
            dst_y: 0,
            dst_w: 0,
            dst_h: 0,
            dst_p: 0,
            scale: 1,
            aspect: 0.0,
            blit: None,
        }
    }
}

const fn ceil_div(a: u32, b: u32) -> u32 {
    a.div_ceil(b)
}

/// Scaler selection state: scaling policy plus the current descriptor.
#[derive(Debug, Clone)]
pub struct Renderer {
    pub mode: ScalingMode,
    pub sharpness: Sharpness,
    pub effect: ScreenEffect,
    /// Source pixel format entering the blit (after any downsample).
    pub format: PixelFormat,
    /// Device framebuffer wants RGBA8888 while the source is RGB565.
    pub convert_to_32: bool,
    /// Platform scales in hardware and wants a logical-size source.
    pub fit: bool,
    pub supports_cropped: bool,
    pub device: DeviceGeometry,
    pub core_aspect: f64,
    pub desc: RenderDescriptor,
}

impl Renderer {
    #[must_use]
    pub fn new(device: DeviceGeometry) -> Self {
        Self {
            mode: ScalingMode::default(),
            sharpness: Sharpness::default(),
            effect: ScreenEffect::default(),
            format: PixelFormat::Rgb565,
            convert_to_32: false,
            fit: false,
            supports_cropped: false,
            device,
            core_aspect: 0.0,
            desc: RenderDescriptor::default(),
        }
    }

    /// True when the incoming frame's geometry no longer matches the
    /// descriptor, or when the sentinel was written to force reselection.
    #[must_use]
    pub fn needs_reselect(&self, src_w: u32, src_h: u32) -> bool {
        self.desc.dst_p == 0 || src_w != self.desc.true_w || src_h != self.desc.true_h
    }

    /// Force scaler reselection before the next blit.
    pub fn invalidate(&mut self) {
        self.desc.dst_p = 0;
    }

    /// Run the ordered selection policy and populate the descriptor.
    /// Returns the surface geometry the platform must present.
    pub fn select(&mut self, src_w: u32, src_h: u32, src_p: u32) -> SurfaceSpec {
        let dev_w = self.device.width;
        let dev_h = self.device.height;
        let dev_p = self.device.pitch;
        let bpp = if self.convert_to_32 { 4 } else { self.format.bytes_per_pixel() };

        if src_w == 0 || src_h == 0 {
            log::warn!("Ignoring selection for empty source {src_w}x{src_h}");
            return SurfaceSpec { width: dev_w, height: dev_h, pitch: dev_p };
        }

        let mut mode = self.mode;
        if mode == ScalingMode::Cropped && !self.supports_cropped {
            mode = ScalingMode::Native;
        }

        // Shape of the source corrected to the core-reported aspect ratio
        let mut aspect_w = src_w;
        let mut aspect_h = if self.core_aspect > 0.0 {
            ((f64::from(aspect_w) + self.core_aspect - 1.0) / self.core_aspect) as u32
        } else {
            src_h
        };
        if self.core_aspect > 0.0 && aspect_h < src_h {
            aspect_h = src_h;
            aspect_w = (f64::from(aspect_h) * self.core_aspect) as u32;
            aspect_w += aspect_w % 2;
        }

        let mut src_x = 0;
        let mut src_y = 0;
        let mut dst_x = 0;
        let mut dst_y = 0;
        let (mut cropped_w, mut cropped_h) = (src_w, src_h);
        let dst_w;
        let dst_h;
        let dst_p;
        let scale: i32;
        let surface;

        match mode {
            ScalingMode::Native | ScalingMode::Cropped => {
                let fit_scale = (dev_w / src_w).min(dev_h / src_h);
                surface = SurfaceSpec { width: dev_w, height: dev_h, pitch: dev_p };
                dst_p = dev_p;

                if fit_scale == 0 {
                    // Forced crop: source is larger than the device on some
                    // axis; clip it symmetrically and center what remains
                    scale = 0;
                    cropped_w = src_w.min(dev_w);
                    cropped_h = src_h.min(dev_h);
                    src_x = (src_w - cropped_w) / 2;
                    src_y = (src_h - cropped_h) / 2;
                    dst_x = (dev_w - cropped_w) / 2;
                    dst_y = (dev_h - cropped_h) / 2;
                    dst_w = cropped_w;
                    dst_h = cropped_h;
                } else if mode == ScalingMode::Cropped {
                    let s = ceil_div(dev_w, src_w).max(ceil_div(dev_h, src_h));
                    scale = s as i32;

                    // Clip whichever axis overflows, then clamp so the
                    // scaled result still fits the device row
                    let scaled_w = src_w * s;
                    let scaled_h = src_h * s;
                    if scaled_w > dev_w {
                        let clip = (scaled_w - dev_w) / 2 / s;
                        cropped_w = (src_w - clip * 2).min(dev_w / s);
                        src_x = (src_w - cropped_w) / 2;
                    }
                    if scaled_h > dev_h {
                        let clip = (scaled_h - dev_h) / 2 / s;
                        cropped_h = (src_h - clip * 2).min(dev_h / s);
                        src_y = (src_h - cropped_h) / 2;
                    }
                    dst_w = cropped_w * s;
                    dst_h = cropped_h * s;
                    dst_x = (dev_w - dst_w) / 2;
                    dst_y = (dev_h - dst_h) / 2;
                } else {
                    scale = fit_scale as i32;
                    dst_w = src_w * fit_scale;
                    dst_h = src_h * fit_scale;
                    dst_x = (dev_w - dst_w) / 2;
                    dst_y = (dev_h - dst_h) / 2;
                }
            }
            ScalingMode::Fullscreen if self.fit => {
                surface = SurfaceSpec { width: dev_w, height: dev_h, pitch: dev_p };
                dst_w = dev_w;
                dst_h = dev_h;
                dst_p = dev_p;
                scale = if src_w == dev_w && src_h == dev_h { 1 } else { -1 };
            }
            ScalingMode::Aspect if self.fit => {
                let scale_f = (f64::from(dev_w) / f64::from(aspect_w))
                    .min(f64::from(dev_h) / f64::from(aspect_h));
                dst_w = (f64::from(aspect_w) * scale_f).round() as u32;
                dst_h = (f64::from(aspect_h) * scale_f).round() as u32;
                dst_x = (dev_w - dst_w.min(dev_w)) / 2;
                dst_y = (dev_h - dst_h.min(dev_h)) / 2;
                dst_p = dev_p;
                surface = SurfaceSpec { width: dev_w, height: dev_h, pitch: dev_p };
                #[allow(clippy::float_cmp)]
                let exact = scale_f == 1.0 && dst_w == src_w && dst_h == src_h;
                scale = if exact { 1 } else { -1 };
            }
            ScalingMode::Fullscreen | ScalingMode::Aspect => {
                // Oversized: scale up past the device, hardware scales down
                let scale_x = ceil_div(dev_w, src_w);
                let mut scale_y = ceil_div(dev_h, src_h);

                // Odd heights (eg. 239-line PS sources) overshoot; snap back
                let r = dev_h.saturating_sub(src_h) % 8;
                if r > 0 && scale_y > 1 {
                    scale_y -= 1;
                }

                let s = scale_x.max(scale_y);
                scale = s as i32;
                let scaled_w = src_w * s;
                let scaled_h = src_h * s;

                if mode == ScalingMode::Fullscreen {
                    dst_w = scaled_w;
                    dst_h = scaled_h;
                } else {
                    let device_aspect = (f64::from(dev_w) / f64::from(dev_h) * 1000.0) as i64;
                    // An unreported aspect ratio degrades to a perfect match
                    let core_aspect = if self.core_aspect > 0.0 {
                        (self.core_aspect * 1000.0) as i64
                    } else {
                        device_aspect
                    };

                    if core_aspect > device_aspect {
                        // Letterbox: pad vertically
                        let aspect_h = (f64::from(dev_w) / self.core_aspect) as u32;
                        let ratio = f64::from(aspect_h) / f64::from(dev_h);
                        dst_w = scaled_w;
                        dst_h = (f64::from(scaled_h) / ratio).round() as u32;
                        dst_y = (dst_h - scaled_h) / 2;
                    } else if core_aspect < device_aspect {
                        // Pillarbox: pad horizontally, snapped to eights
                        let aspect_w = (f64::from(dev_h) * self.core_aspect) as u32;
                        let ratio = f64::from(aspect_w) / f64::from(dev_w);
                        dst_w = ((f64::from(scaled_w) / ratio).round() as u32) / 8 * 8;
                        dst_h = scaled_h;
                        dst_x = (dst_w - scaled_w) / 2;
                    } else {
                        dst_w = scaled_w;
                        dst_h = scaled_h;
                    }
                }
                dst_p = dst_w * bpp;
                surface = SurfaceSpec { width: dst_w, height: dst_h, pitch: dst_p };
            }
        }

        self.desc = RenderDescriptor {
            src_x,
            src_y,
            src_w: cropped_w,
            src_h: cropped_h,
            src_p,
            true_w: src_w,
            true_h: src_h,
            dst_x,
            dst_y,
            dst_w,
            dst_h,
            dst_p,
            scale,
            aspect: match mode {
                ScalingMode::Native | ScalingMode::Cropped => 0.0,
                ScalingMode::Fullscreen => -1.0,
                ScalingMode::Aspect => self.core_aspect,
            },
            blit: None,
        };
        self.desc.blit = Some(self.resolve_blit());
        self.apply_fractional_recipe();

        surface
    }

    /// The fixed-tile fractional blitters emit one exact output size; when
    /// one is selected, snap the destination rect to that size centered on
    /// the device so the tiles land where the blitter expects them.
    fn apply_fractional_recipe(&mut self) {
        if self.desc.scale != -1 || self.convert_to_32 || self.format != PixelFormat::Rgb565 {
            return;
        }

        let desc = &self.desc;
        let recipe: Option<(Scaler, u32, u32)> = match (desc.src_w, desc.src_h) {
            (256, 224) => Some((fractional::scale_256x224_320x238 as Scaler, 320, 238)),
            (240, 160) if desc.dst_h != 240 => {
                Some((fractional::scale_240x160_320x213 as Scaler, 320, 213))
            }
            (160, 144) if desc.dst_w != 320 => {
                Some((fractional::scale_160x144_266x240 as Scaler, 266, 240))
            }
            _ => None,
        };

        let Some((blit, out_w, out_h)) = recipe else {
            return;
        };
        if self.device.width < out_w || self.device.height < out_h {
            return;
        }

        self.desc.dst_w = out_w;
        self.desc.dst_h = out_h;
        self.desc.dst_x = (self.device.width - out_w) / 2;
        self.desc.dst_y = (self.device.height - out_h) / 2;
        self.desc.blit = Some(blit);
    }

    /// Pick the blit function for the populated descriptor, honoring the
    /// active effect, the pixel format, and the fractional recipes.
    fn resolve_blit(&self) -> Scaler {
        let desc = &self.desc;

        if self.convert_to_32 {
            return match desc.scale {
                2 => convert::scale2x_c16to32,
                _ => convert::scale1x_c16to32,
            };
        }

        let sixteen_bit = self.format == PixelFormat::Rgb565;

        if sixteen_bit && self.effect == ScreenEffect::Line {
            match desc.scale {
                1 => return effect::scale1x_line,
                2 => return effect::scale2x_line,
                3 => return effect::scale3x_line,
                4 => return effect::scale4x_line,
                _ => {}
            }
        }
        if sixteen_bit && self.effect == ScreenEffect::Grid {
            match desc.scale {
                2 => return effect::scale2x_grid,
                3 => return effect::scale3x_grid,
                _ => {}
            }
        }

        match desc.scale {
            -1 => {
                // Specific fractional recipes are applied after selection;
                // the general path is the nearest-neighbor fallback
                if sixteen_bit {
                    fractional::scale_nearest16
                } else {
                    fractional::scale_nearest32
                }
            }
            0 => {
                // Forced crop is a clipped 1:1 copy
                if sixteen_bit {
                    lookup16(1, 1).unwrap_or(fractional::scale_nearest16)
                } else {
                    lookup32(1, 1).unwrap_or(fractional::scale_nearest32)
                }
            }
            s => {
                let s = s as u32;
                if sixteen_bit {
                    lookup16(s, s).unwrap_or(fractional::scale_nearest16)
                } else {
                    lookup32(s, s).unwrap_or(fractional::scale_nearest32)
                }
            }
        }
    }

    /// Blit the current frame through the descriptor, offsetting both
    /// buffers by the descriptor's source and destination rectangles.
    pub fn blit(&self, src: &[u8], dst: &mut [u8]) {
        let desc = &self.desc;
        let Some(blit) = desc.blit else {
            log::warn!("blit invoked with no scaler selected");
            return;
        };

        let src_bpp = self.format.bytes_per_pixel();
        let dst_bpp = if self.convert_to_32 { 4 } else { src_bpp };

        let src_off = (desc.src_y * desc.src_p + desc.src_x * src_bpp) as usize;
        let dst_off = (desc.dst_y * desc.dst_p + desc.dst_x * dst_bpp) as usize;

        blit(
            &src[src_off..],
            &mut dst[dst_off..],
            desc.src_w,
            desc.src_h,
            desc.src_p,
            desc.dst_w,
            desc.dst_h,
            desc.dst_p,
        );
    }
}

#[cfg(test)]
mod tests;
