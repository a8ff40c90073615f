//! Approximately-bilinear blitters for non-integer ratios.
//!
//! A small set of fixed-tile recipes covers the handful of sources that do
//! not divide evenly into common device resolutions; everything else goes
//! through [`scale_nearest`]. The recipes blend with RGB565-safe bit tricks:
//! masking each channel's high bits before a right shift keeps the low bits
//! of one channel from bleeding into its neighbor.
//!
//! Mask reference:
//! - `0xF7DE` keeps the top 4/5/4 bits of each channel for a >>1 half
//!   average; `0x0821` gathers the discarded low bits.
//! - `0xE79C` keeps the top 3/4/3 bits for a >>2 quarter average; `0x1863`
//!   gathers the discarded low bits.

/// Half-average mask: channel high bits safe to shift right once.
pub const MASK_AVG_HALF: u16 = 0xF7DE;
/// Carry mask for the half average: each channel's lowest bit.
pub const MASK_CARRY_HALF: u16 = 0x0821;
/// Quarter-average mask: channel high bits safe to shift right twice.
pub const MASK_AVG_QUARTER: u16 = 0xE79C;
/// Carry mask for the quarter average: each channel's lowest two bits.
pub const MASK_CARRY_QUARTER: u16 = 0x1863;

/// Unweighted average of two RGB565 pixels without channel bleed.
#[must_use]
#[inline]
pub const fn average_1_1(a: u16, b: u16) -> u16 {
    ((a & MASK_AVG_HALF) >> 1) + ((b & MASK_AVG_HALF) >> 1) + (a & b & MASK_CARRY_HALF)
}

/// 3/4 A + 1/4 B average of two RGB565 pixels without channel bleed.
#[must_use]
#[inline]
pub const fn average_3_1(a: u16, b: u16) -> u16 {
    ((a & MASK_AVG_HALF) >> 1)
        + ((a & MASK_AVG_QUARTER) >> 2)
        + ((b & MASK_AVG_QUARTER) >> 2)
        + ((((((a & MASK_CARRY_QUARTER) + (a & MASK_CARRY_HALF)) << 1)
            + (b & MASK_CARRY_QUARTER))
            >> 2)
            & MASK_CARRY_QUARTER)
}

#[inline]
const fn c_r(p: u16) -> u16 {
    (p & 0xF800) >> 11
}

#[inline]
const fn c_g(p: u16) -> u16 {
    (p & 0x07E0) >> 5
}

#[inline]
const fn c_b(p: u16) -> u16 {
    p & 0x001F
}

/// 2/3 A + 1/3 B per channel.
#[must_use]
#[inline]
pub const fn average_2_1(a: u16, b: u16) -> u16 {
    (((c_r(b) + (c_r(a) << 1)) / 3) << 11)
        | (((c_g(b) + (c_g(a) << 1)) / 3) << 5)
        | ((c_b(b) + (c_b(a) << 1)) / 3)
}

// Sub-pixel blends: weights differ per channel to line up with an RGB-stripe
// LCD, so a blend leans red toward the left pixel and blue toward the right.

#[inline]
const fn subpixel_3_1(a: u16, b: u16) -> u16 {
    (c_r(a) << 11)
        | ((c_g(a) * 3 / 4 + c_g(b) / 4) << 5)
        | (c_b(a) / 4 + c_b(b) * 3 / 4)
}

#[inline]
const fn subpixel_1_1(a: u16, b: u16) -> u16 {
    ((c_r(a) * 3 / 4 + c_r(b) / 4) << 11)
        | ((c_g(a) / 2 + c_g(b) / 2) << 5)
        | (c_b(a) / 4 + c_b(b) * 3 / 4)
}

#[inline]
const fn subpixel_1_3(a: u16, b: u16) -> u16 {
    ((c_r(b) / 4 + c_r(a) * 3 / 4) << 11)
        | ((c_g(b) * 3 / 4 + c_g(a) / 4) << 5)
        | c_b(b)
}

#[inline]
const fn subpixel_2_1(a: u16, b: u16) -> u16 {
    (c_r(a) << 11)
        | ((c_g(a) * 2 / 3 + c_g(b) / 3) << 5)
        | (c_b(a) / 3 + c_b(b) * 2 / 3)
}

#[inline]
const fn subpixel_1_2(a: u16, b: u16) -> u16 {
    ((c_r(b) / 3 + c_r(a) * 2 / 3) << 11)
        | ((c_g(b) * 2 / 3 + c_g(a) / 3) << 5)
        | c_b(b)
}

// The sub-pixel and thirds blends are not identities on equal inputs
// (integer division truncates per term), so every call site guards on
// equality first.

#[inline]
const fn blend_sub_1_2(a: u16, b: u16) -> u16 {
    if a == b { a } else { subpixel_1_2(a, b) }
}

#[inline]
const fn blend_sub_2_1(a: u16, b: u16) -> u16 {
    if a == b { a } else { subpixel_2_1(a, b) }
}

#[inline]
const fn blend_sub_1_3(a: u16, b: u16) -> u16 {
    if a == b { a } else { subpixel_1_3(a, b) }
}

#[inline]
const fn blend_sub_1_1(a: u16, b: u16) -> u16 {
    if a == b { a } else { subpixel_1_1(a, b) }
}

#[inline]
const fn blend_sub_3_1(a: u16, b: u16) -> u16 {
    if a == b { a } else { subpixel_3_1(a, b) }
}

#[inline]
const fn blend_avg_2_1(a: u16, b: u16) -> u16 {
    if a == b { a } else { average_2_1(a, b) }
}

#[inline]
fn read_px(src: &[u8], offset: usize) -> u16 {
    u16::from_ne_bytes([src[offset], src[offset + 1]])
}

#[inline]
fn write_px(dst: &mut [u8], offset: usize, pixel: u16) {
    dst[offset..offset + 2].copy_from_slice(&pixel.to_ne_bytes());
}

/// 240x160 onto 320x213: 3x3 source tiles become 4x4 output tiles, with a
/// single-row tail for the leftover source row (160 = 3 * 53 + 1).
pub fn scale_240x160_320x213(
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    _dw: u32,
    _dh: u32,
    dp: u32,
) {
    if sw == 0 || sh == 0 {
        return;
    }

    let (sw, sh) = (sw as usize, sh as usize);
    let sp = if sp == 0 { sw * 2 } else { sp as usize };
    let dp = if dp == 0 { sw.div_ceil(3) * 4 * 2 } else { dp as usize };

    let chunks_x = sw / 3;
    let chunks_y = sh / 3;

    for chunk_y in 0..chunks_y {
        let src_row = chunk_y * 3;
        let dst_row = chunk_y * 4;
        for chunk_x in 0..chunks_x {
            let s = src_row * sp + chunk_x * 3 * 2;
            let d = dst_row * dp + chunk_x * 4 * 2;

            let a = read_px(src, s);
            let b = read_px(src, s + 2);
            let c = read_px(src, s + 4);
            let e = read_px(src, s + sp);
            let f = read_px(src, s + sp + 2);
            let g = read_px(src, s + sp + 4);
            let i = read_px(src, s + sp * 2);
            let j = read_px(src, s + sp * 2 + 2);
            let k = read_px(src, s + sp * 2 + 4);

            let abb = blend_sub_1_2(a, b);
            let bbc = blend_sub_2_1(b, c);
            let eff = blend_sub_1_2(e, f);
            let ffg = blend_sub_2_1(f, g);
            let ijj = blend_sub_1_2(i, j);
            let jjk = blend_sub_2_1(j, k);

            for (x, px) in [a, abb, bbc, c].into_iter().enumerate() {
                write_px(dst, d + x * 2, px);
            }
            for (x, px) in [
                blend_avg_2_1(e, a),
                blend_avg_2_1(eff, abb),
                blend_avg_2_1(ffg, bbc),
                blend_avg_2_1(g, c),
            ]
            .into_iter()
            .enumerate()
            {
                write_px(dst, d + dp + x * 2, px);
            }
            for (x, px) in [
                blend_avg_2_1(e, i),
                blend_avg_2_1(eff, ijj),
                blend_avg_2_1(ffg, jjk),
                blend_avg_2_1(g, k),
            ]
            .into_iter()
            .enumerate()
            {
                write_px(dst, d + dp * 2 + x * 2, px);
            }
            for (x, px) in [i, ijj, jjk, k].into_iter().enumerate() {
                write_px(dst, d + dp * 3 + x * 2, px);
            }
        }
    }

    // Leftover source row becomes a single unblended output row
    if sh % 3 == 1 {
        let src_row = chunks_y * 3;
        let dst_row = chunks_y * 4;
        for chunk_x in 0..chunks_x {
            let s = src_row * sp + chunk_x * 3 * 2;
            let d = dst_row * dp + chunk_x * 4 * 2;

            let a = read_px(src, s);
            let b = read_px(src, s + 2);
            let c = read_px(src, s + 4);
            let abb = blend_sub_1_2(a, b);
            let bbc = blend_sub_2_1(b, c);

            for (x, px) in [a, abb, bbc, c].into_iter().enumerate() {
                write_px(dst, d + x * 2, px);
            }
        }
    }
}

/// 160x144 onto 266x240: 3x3 source tiles become 5x5 output tiles; the
/// final source column (160 = 3 * 53 + 1) maps to one output column.
pub fn scale_160x144_266x240(
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    _dw: u32,
    _dh: u32,
    dp: u32,
) {
    if sw == 0 || sh == 0 {
        return;
    }

    let (sw, sh) = (sw as usize, sh as usize);
    let sp = if sp == 0 { sw * 2 } else { sp as usize };
    let dp = if dp == 0 { (sw / 3 * 5 + sw % 3) * 2 } else { dp as usize };

    let mut chunk_y = 0;
    while chunk_y + 3 <= sh {
        let dst_row = chunk_y / 3 * 5;
        let mut dst_x = 0;
        let mut chunk_x = 0;
        while chunk_x < sw {
            let s = chunk_y * sp + chunk_x * 2;
            let d = dst_row * dp + dst_x * 2;

            let a = read_px(src, s);
            let dd = read_px(src, s + sp);
            let g = read_px(src, s + sp * 2);

            // Odd final column: emit a single blended column
            if sw - chunk_x < 3 {
                write_px(dst, d, a);
                write_px(dst, d + dp, blend_avg_2_1(a, dd));
                write_px(dst, d + dp * 2, dd);
                write_px(dst, d + dp * 3, blend_avg_2_1(g, dd));
                write_px(dst, d + dp * 4, g);

                chunk_x += 1;
                dst_x += 1;
                continue;
            }

            let b = read_px(src, s + 2);
            let c = read_px(src, s + 4);
            let e = read_px(src, s + sp + 2);
            let f = read_px(src, s + sp + 4);
            let h = read_px(src, s + sp * 2 + 2);
            let i = read_px(src, s + sp * 2 + 4);

            let aab = blend_sub_2_1(a, b);
            let bcc = blend_sub_1_2(b, c);
            let dde = blend_sub_2_1(dd, e);
            let eff = blend_sub_1_2(e, f);
            let ggh = blend_sub_2_1(g, h);
            let hii = blend_sub_1_2(h, i);

            for (x, px) in [a, aab, b, bcc, c].into_iter().enumerate() {
                write_px(dst, d + x * 2, px);
            }
            for (x, px) in [
                blend_avg_2_1(a, dd),
                blend_avg_2_1(aab, dde),
                blend_avg_2_1(b, e),
                blend_avg_2_1(bcc, eff),
                blend_avg_2_1(c, f),
            ]
            .into_iter()
            .enumerate()
            {
                write_px(dst, d + dp + x * 2, px);
            }
            for (x, px) in [dd, dde, e, eff, f].into_iter().enumerate() {
                write_px(dst, d + dp * 2 + x * 2, px);
            }
            for (x, px) in [
                blend_avg_2_1(g, dd),
                blend_avg_2_1(ggh, dde),
                blend_avg_2_1(h, e),
                blend_avg_2_1(hii, eff),
                blend_avg_2_1(i, f),
            ]
            .into_iter()
            .enumerate()
            {
                write_px(dst, d + dp * 3 + x * 2, px);
            }
            for (x, px) in [g, ggh, h, hii, i].into_iter().enumerate() {
                write_px(dst, d + dp * 4 + x * 2, px);
            }

            chunk_x += 3;
            dst_x += 5;
        }
        chunk_y += 3;
    }
}

/// 256x224 onto 320x238: 4x16 source tiles become 5x17 output tiles. Rows
/// 0-2 and 14-16 of each tile copy through; the middle rows blend 3:1 with
/// the previous row to absorb the extra scanline.
pub fn scale_256x224_320x238(
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    _dw: u32,
    _dh: u32,
    dp: u32,
) {
    if sw == 0 || sh == 0 {
        return;
    }

    let (sw, sh) = (sw as usize, sh as usize);
    let sp = if sp == 0 { sw * 2 } else { sp as usize };
    let dp = if dp == 0 { sw / 4 * 5 * 2 } else { dp as usize };

    let read_cols = |src: &[u8], s: usize, row: usize| -> [u16; 5] {
        let a = read_px(src, s + sp * row);
        let b = read_px(src, s + sp * row + 2);
        let c = read_px(src, s + sp * row + 4);
        let d = read_px(src, s + sp * row + 6);
        [a, blend_sub_1_3(a, b), blend_sub_1_1(b, c), blend_sub_3_1(c, d), d]
    };

    let mut chunk_y = 0;
    while chunk_y + 16 <= sh {
        let dst_row = chunk_y / 16 * 17;
        let mut chunk_x = 0;
        while chunk_x + 4 <= sw {
            let s = chunk_y * sp + chunk_x * 2;
            let d = dst_row * dp + chunk_x / 4 * 5 * 2;

            let mut prev = [0_u16; 5];
            for row in 0..3 {
                let cols = read_cols(src, s, row);
                for (x, &px) in cols.iter().enumerate() {
                    write_px(dst, d + dp * row + x * 2, px);
                }
                prev = cols;
            }
            for row in 3..8 {
                let cols = read_cols(src, s, row);
                for x in 0..5 {
                    write_px(dst, d + dp * row + x * 2, average_3_1(cols[x], prev[x]));
                }
                prev = cols;
            }
            for row in 8..14 {
                let cols = read_cols(src, s, row);
                for x in 0..5 {
                    write_px(dst, d + dp * row + x * 2, average_3_1(prev[x], cols[x]));
                }
                prev = cols;
            }
            for row in 13..16 {
                let cols = read_cols(src, s, row);
                for (x, &px) in cols.iter().enumerate() {
                    write_px(dst, d + dp * (row + 1) + x * 2, px);
                }
            }

            chunk_x += 4;
        }
        chunk_y += 16;
    }
}

/// Generic nearest-neighbor blit for arbitrary ratios, 16-bit. The default
/// "AA" path when no fixed recipe matches and the platform scales in
/// software.
pub fn scale_nearest16(
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    dw: u32,
    dh: u32,
    dp: u32,
) {
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return;
    }

    let (sw, sh, dw, dh) = (sw as usize, sh as usize, dw as usize, dh as usize);
    let sp = if sp == 0 { sw * 2 } else { sp as usize };
    let dp = if dp == 0 { dw * 2 } else { dp as usize };

    // 16.16 fixed-point stepping
    let step_x = (sw << 16) / dw;
    let step_y = (sh << 16) / dh;

    let mut src_y = 0_usize;
    for y in 0..dh {
        let row = (src_y >> 16).min(sh - 1) * sp;
        let mut src_x = 0_usize;
        let dst_off = y * dp;
        for x in 0..dw {
            let sx = (src_x >> 16).min(sw - 1);
            let px = read_px(src, row + sx * 2);
            write_px(dst, dst_off + x * 2, px);
            src_x += step_x;
        }
        src_y += step_y;
    }
}

/// 32-bit counterpart of [`scale_nearest16`].
pub fn scale_nearest32(
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    dw: u32,
    dh: u32,
    dp: u32,
) {
    if sw == 0 || sh == 0 || dw == 0 || dh == 0 {
        return;
    }

    let (sw, sh, dw, dh) = (sw as usize, sh as usize, dw as usize, dh as usize);
    let sp = if sp == 0 { sw * 4 } else { sp as usize };
    let dp = if dp == 0 { dw * 4 } else { dp as usize };

    let step_x = (sw << 16) / dw;
    let step_y = (sh << 16) / dh;

    let mut src_y = 0_usize;
    for y in 0..dh {
        let row = (src_y >> 16).min(sh - 1) * sp;
        let mut src_x = 0_usize;
        let dst_off = y * dp;
        for x in 0..dw {
            let sx = (src_x >> 16).min(sw - 1);
            dst[dst_off + x * 4..dst_off + x * 4 + 4]
                .copy_from_slice(&src[row + sx * 4..row + sx * 4 + 4]);
            src_x += step_x;
        }
        src_y += step_y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixels(bytes: &[u8]) -> Vec<u16> {
        bytes.chunks_exact(2).map(|px| u16::from_ne_bytes([px[0], px[1]])).collect()
    }

    #[test]
    fn masked_averages_are_identities_on_equal_inputs() {
        for p in 0..=u16::MAX {
            assert_eq!(average_1_1(p, p), p, "average_1_1 broke at {p:#06X}");
            assert_eq!(average_3_1(p, p), p, "average_3_1 broke at {p:#06X}");
        }
    }

    #[test]
    fn half_average_has_no_channel_bleed() {
        // Averaging pure red with pure blue must not produce green
        let out = average_1_1(0xF800, 0x001F);
        assert_eq!(out & 0x07E0, 0);
    }

    #[test]
    fn gba_recipe_fills_full_output() {
        let src = vec![0xFF_u8; 240 * 160 * 2]; // all 0xFFFF pixels
        let mut dst = vec![0_u8; 320 * 213 * 2];
        scale_240x160_320x213(&src, &mut dst, 240, 160, 0, 320, 213, 0);

        // Uniform input stays uniform through every blend path
        assert!(pixels(&dst).iter().all(|&px| px == 0xFFFF));
    }

    #[test]
    fn gb_recipe_fills_full_output() {
        let src = vec![0xFF_u8; 160 * 144 * 2];
        let mut dst = vec![0_u8; 266 * 240 * 2];
        scale_160x144_266x240(&src, &mut dst, 160, 144, 0, 266, 240, 0);

        assert!(pixels(&dst).iter().all(|&px| px == 0xFFFF));
    }

    #[test]
    fn snes_recipe_fills_full_output() {
        let src = vec![0xFF_u8; 256 * 224 * 2];
        let mut dst = vec![0_u8; 320 * 238 * 2];
        scale_256x224_320x238(&src, &mut dst, 256, 224, 0, 320, 238, 0);

        assert!(pixels(&dst).iter().all(|&px| px == 0xFFFF));
    }

    #[test]
    fn nearest_matches_integer_scaling_when_ratio_is_integral() {
        let src: Vec<u8> = bytemuck::cast_slice(&[0x1111_u16, 0x2222, 0x3333, 0x4444]).to_vec();
        let mut nearest = vec![0_u8; 4 * 4 * 2];
        let mut integer = vec![0_u8; 4 * 4 * 2];

        scale_nearest16(&src, &mut nearest, 2, 2, 0, 4, 4, 0);
        crate::integer::scale2x2_c16(&src, &mut integer, 2, 2, 0, 4, 4, 0);

        assert_eq!(nearest, integer);
    }

    #[test]
    fn nearest_handles_downscale() {
        let src = vec![0xAB_u8; 8 * 8 * 2];
        let mut dst = vec![0_u8; 3 * 3 * 2];
        scale_nearest16(&src, &mut dst, 8, 8, 0, 3, 3, 0);
        assert!(dst.iter().all(|&b| b == 0xAB));
    }
}
