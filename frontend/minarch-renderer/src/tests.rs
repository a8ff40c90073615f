#![allow(unknown_lints, unpredictable_function_pointer_comparisons, clippy::fn_address_comparisons)]

use super::*;
use minarch_scaler::{effect, fractional};

fn device(width: u32, height: u32) -> DeviceGeometry {
    DeviceGeometry { width, height, pitch: width * 2 }
}

fn renderer(dev_w: u32, dev_h: u32, mode: ScalingMode) -> Renderer {
    let mut renderer = Renderer::new(device(dev_w, dev_h));
    renderer.mode = mode;
    renderer
}

fn checkerboard16(w: u32, h: u32) -> Vec<u8> {
    let pixels: Vec<u16> = (0..w * h)
        .map(|i| {
            let (x, y) = (i % w, i / w);
            if (x + y) % 2 == 0 { 0x0000 } else { 0xFFFF }
        })
        .collect();
    bytemuck::cast_slice(&pixels).to_vec()
}

fn pixels16(bytes: &[u8]) -> Vec<u16> {
    bytes.chunks_exact(2).map(|px| u16::from_ne_bytes([px[0], px[1]])).collect()
}

#[test]
fn gb_on_vga_native_selects_triple() {
    let mut r = renderer(640, 480, ScalingMode::Native);
    let surface = r.select(160, 144, 0);

    assert_eq!(r.desc.scale, 3);
    assert_eq!((r.desc.dst_x, r.desc.dst_y), (80, 24));
    assert_eq!((r.desc.dst_w, r.desc.dst_h), (480, 432));
    assert_eq!((surface.width, surface.height), (640, 480));
}

#[test]
fn gb_checkerboard_replicates_and_letterboxes() {
    let mut r = renderer(640, 480, ScalingMode::Native);
    let surface = r.select(160, 144, 0);

    let src = checkerboard16(160, 144);
    let mut dst = vec![0_u8; (surface.pitch * surface.height) as usize];
    r.blit(&src, &mut dst);

    let out = pixels16(&dst);
    let src_px = pixels16(&src);
    for y in 0..480_usize {
        for x in 0..640_usize {
            let expected = if (80..560).contains(&x) && (24..456).contains(&y) {
                src_px[(y - 24) / 3 * 160 + (x - 80) / 3]
            } else {
                0x0000
            };
            assert_eq!(out[y * 640 + x], expected, "pixel ({x},{y})");
        }
    }
}

#[test]
fn gb_on_vga_fullscreen_oversized() {
    let mut r = renderer(640, 480, ScalingMode::Fullscreen);
    r.fit = false;
    let surface = r.select(160, 144, 0);

    assert_eq!(r.desc.scale, 4);
    assert_eq!((r.desc.dst_w, r.desc.dst_h), (640, 576));
    // Oversized surface; the hardware crops the extra 96 rows on scanout
    assert_eq!((surface.width, surface.height), (640, 576));
}

#[test]
fn snes_aspect_fit_snaps_to_recipe() {
    let mut r = renderer(320, 240, ScalingMode::Aspect);
    r.fit = true;
    r.core_aspect = 8.0 / 7.0;
    r.select(256, 224, 0);

    // The recipe snap takes over for 256x224; shape check against the
    // pre-snap policy runs through a non-recipe size below
    assert_eq!(r.desc.scale, -1);
    assert_eq!((r.desc.dst_w, r.desc.dst_h), (320, 238));
    assert_eq!(r.desc.blit, Some(fractional::scale_256x224_320x238 as Scaler));
}

#[test]
fn aspect_fit_shape_matches_core_aspect() {
    // Same fit policy with a size no recipe claims
    let mut r = renderer(320, 240, ScalingMode::Aspect);
    r.fit = true;
    r.core_aspect = 8.0 / 7.0;
    r.select(512, 448, 0);

    let (dst_w, dst_h) = (f64::from(r.desc.dst_w), f64::from(r.desc.dst_h));
    assert!(
        (dst_w / dst_h - 8.0 / 7.0).abs() < 1.0 / 320.0,
        "aspect off: {dst_w}x{dst_h}"
    );
    // Pillarboxed and centered
    assert_eq!(r.desc.dst_x, (320 - r.desc.dst_w) / 2);
}

#[test]
fn gba_on_qvga_native_centers_at_unity() {
    let mut r = renderer(320, 240, ScalingMode::Native);
    let surface = r.select(240, 160, 0);

    assert_eq!(r.desc.scale, 1);
    assert_eq!((surface.width, surface.height), (320, 240));
    // Source sits 40 pixels in on both axes
    assert_eq!((r.desc.dst_x, r.desc.dst_y), (40, 40));
    assert_eq!((r.desc.dst_w, r.desc.dst_h), (240, 160));
}

#[test]
fn forced_crop_clips_oversized_source() {
    let mut r = renderer(320, 240, ScalingMode::Native);
    let surface = r.select(512, 448, 0);

    assert_eq!(r.desc.scale, 0);
    assert_eq!((surface.width, surface.height), (320, 240));
    assert_eq!((r.desc.src_x, r.desc.src_y), (96, 104));
    assert_eq!((r.desc.src_w, r.desc.src_h), (320, 240));
    assert_eq!((r.desc.dst_x, r.desc.dst_y), (0, 0));
    // Uncropped size is preserved for geometry-change detection
    assert_eq!((r.desc.true_w, r.desc.true_h), (512, 448));
}

#[test]
fn forced_crop_copies_the_center_window() {
    let mut r = renderer(320, 240, ScalingMode::Native);
    let surface = r.select(512, 448, 512 * 2);

    let src = checkerboard16(512, 448);
    let mut dst = vec![0_u8; (surface.pitch * surface.height) as usize];
    r.blit(&src, &mut dst);

    let out = pixels16(&dst);
    let src_px = pixels16(&src);
    for y in 0..240_usize {
        for x in 0..320_usize {
            assert_eq!(out[y * 320 + x], src_px[(y + 104) * 512 + x + 96]);
        }
    }
}

#[test]
fn qvga_on_vga_cropped_is_exact() {
    let mut r = renderer(640, 480, ScalingMode::Cropped);
    r.supports_cropped = true;
    let surface = r.select(320, 240, 0);

    assert_eq!(r.desc.scale, 2);
    assert_eq!((r.desc.dst_x, r.desc.dst_y), (0, 0));
    assert_eq!((r.desc.dst_w, r.desc.dst_h), (640, 480));
    // No source clipping needed
    assert_eq!((r.desc.src_x, r.desc.src_y), (0, 0));
    assert_eq!((r.desc.src_w, r.desc.src_h), (320, 240));
    assert_eq!((surface.width, surface.height), (640, 480));
}

#[test]
fn cropped_falls_back_to_native_when_unsupported() {
    let mut r = renderer(640, 480, ScalingMode::Cropped);
    r.supports_cropped = false;
    r.select(320, 240, 0);

    // Native policy: integer fit, centered, no clipping
    assert_eq!(r.desc.scale, 2);
    assert_eq!((r.desc.src_x, r.desc.src_y), (0, 0));
}

#[test]
fn cropped_clips_the_overflowing_axis() {
    let mut r = renderer(640, 480, ScalingMode::Cropped);
    r.supports_cropped = true;
    r.select(256, 224, 0);

    // ceil(640/256)=3, ceil(480/224)=3 -> 768x672 scaled, both axes clipped
    assert_eq!(r.desc.scale, 3);
    assert!(r.desc.src_x > 0 && r.desc.src_y > 0);
    assert!(r.desc.dst_w <= 640 && r.desc.dst_h <= 480);
    assert!(u64::from(r.desc.dst_w) * 2 <= u64::from(r.desc.dst_p));
}

#[test]
fn qvga_rgba8888_fullscreen_doubles() {
    let mut r = renderer(640, 480, ScalingMode::Fullscreen);
    r.format = PixelFormat::Rgba8888;
    r.fit = false;
    r.device.pitch = 640 * 4;
    let surface = r.select(320, 240, 0);

    assert_eq!(r.desc.scale, 2);
    assert_eq!((r.desc.dst_w, r.desc.dst_h), (640, 480));
    assert_eq!(surface.pitch, 640 * 4);

    let pixels: Vec<u32> = (0..320 * 240)
        .map(|i| if (i % 320 + i / 320) % 2 == 0 { 0xFF000000 } else { 0xFFFFFFFF })
        .collect();
    let src: Vec<u8> = bytemuck::cast_slice(&pixels).to_vec();
    let mut dst = vec![0_u8; (surface.pitch * surface.height) as usize];
    r.blit(&src, &mut dst);

    let out: Vec<u32> =
        dst.chunks_exact(4).map(|px| u32::from_ne_bytes(px.try_into().unwrap())).collect();
    for y in 0..480_usize {
        for x in 0..640_usize {
            assert_eq!(out[y * 640 + x], pixels[y / 2 * 320 + x / 2]);
        }
    }
}

#[test]
fn source_equal_to_device_selects_unity_in_every_mode() {
    for mode in
        [ScalingMode::Native, ScalingMode::Aspect, ScalingMode::Fullscreen, ScalingMode::Cropped]
    {
        for fit in [false, true] {
            let mut r = renderer(320, 240, mode);
            r.fit = fit;
            r.supports_cropped = true;
            r.core_aspect = 4.0 / 3.0;
            r.select(320, 240, 0);

            assert_eq!(r.desc.scale, 1, "mode {mode} fit {fit}");
            assert_eq!((r.desc.dst_x, r.desc.dst_y), (0, 0), "mode {mode} fit {fit}");
        }
    }
}

#[test]
fn native_centers_within_one_pixel() {
    let mut r = renderer(640, 480, ScalingMode::Native);
    r.select(160, 144, 0);
    let desc = &r.desc;
    let occupied = desc.dst_x * 2 + desc.src_w * desc.scale as u32;
    assert!(occupied.abs_diff(640) <= 1);
}

#[test]
fn geometry_change_triggers_reselection() {
    let mut r = renderer(640, 480, ScalingMode::Native);
    r.select(160, 144, 0);

    assert!(!r.needs_reselect(160, 144));
    assert!(r.needs_reselect(256, 224));

    r.invalidate();
    assert!(r.needs_reselect(160, 144));
}

#[test]
fn line_effect_selects_effect_blitter_for_supported_factors() {
    let mut r = renderer(640, 480, ScalingMode::Native);
    r.effect = ScreenEffect::Line;
    r.select(320, 240, 0); // 2x
    assert_eq!(r.desc.blit, Some(effect::scale2x_line as Scaler));

    let mut r = renderer(640, 480, ScalingMode::Native);
    r.effect = ScreenEffect::Grid;
    r.select(320, 240, 0);
    assert_eq!(r.desc.blit, Some(effect::scale2x_grid as Scaler));
}

#[test]
fn grid_effect_unsupported_factor_falls_back_to_plain() {
    let mut r = renderer(640, 480, ScalingMode::Native);
    r.effect = ScreenEffect::Grid;
    r.select(160, 120, 0); // 4x: grid only exists for 2x and 3x
    assert_eq!(r.desc.blit, minarch_scaler::lookup16(4, 4));
}

#[test]
fn gb_aspect_fit_selects_gb_recipe() {
    let mut r = renderer(320, 240, ScalingMode::Aspect);
    r.fit = true;
    r.core_aspect = 160.0 / 144.0;
    r.select(160, 144, 0);

    assert_eq!(r.desc.scale, -1);
    assert_eq!(r.desc.blit, Some(fractional::scale_160x144_266x240 as Scaler));
    assert_eq!((r.desc.dst_w, r.desc.dst_h), (266, 240));
    assert_eq!(r.desc.dst_x, (320 - 266) / 2);
}

#[test]
fn conversion_path_selects_c16to32() {
    let mut r = renderer(640, 480, ScalingMode::Native);
    r.convert_to_32 = true;
    r.device.pitch = 640 * 4;
    r.select(320, 240, 0);

    assert_eq!(r.desc.scale, 2);
    assert_eq!(r.desc.blit, Some(minarch_scaler::convert::scale2x_c16to32 as Scaler));
}

#[test]
fn mode_cycling_honors_cropped_support() {
    assert_eq!(ScalingMode::Fullscreen.cycled(true), ScalingMode::Cropped);
    assert_eq!(ScalingMode::Fullscreen.cycled(false), ScalingMode::Native);
    assert_eq!(ScalingMode::Cropped.cycled(true), ScalingMode::Native);
}
