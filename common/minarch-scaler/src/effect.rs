//! CRT-style effect blitters, 16-bit only.
//!
//! The scanline variants darken a subset of each block's output rows toward
//! black; the grid variants additionally darken the block's first column for
//! a shadow-mask look. Brightness steps come from the weighted RGB565 blends
//! below rather than a straight shift so each channel rounds independently.

/// Extract the red channel (bits 15-11).
#[inline]
const fn c_r(p: u16) -> u16 {
    (p & 0xF800) >> 11
}

/// Extract the green channel (bits 10-5).
#[inline]
const fn c_g(p: u16) -> u16 {
    (p & 0x07E0) >> 5
}

/// Extract the blue channel (bits 4-0).
#[inline]
const fn c_b(p: u16) -> u16 {
    p & 0x001F
}

/// Per-channel 3/4 A + 1/4 B.
#[inline]
pub(crate) const fn weight3_1(a: u16, b: u16) -> u16 {
    (((c_r(b) + c_r(a) * 3) >> 2) << 11)
        | (((c_g(b) + c_g(a) * 3) >> 2) << 5)
        | ((c_b(b) + c_b(a) * 3) >> 2)
}

/// Per-channel 3/5 A + 2/5 B.
#[inline]
pub(crate) const fn weight3_2(a: u16, b: u16) -> u16 {
    ((((c_r(b) << 1) + c_r(a) * 3) / 5) << 11)
        | ((((c_g(b) << 1) + c_g(a) * 3) / 5) << 5)
        | (((c_b(b) << 1) + c_b(a) * 3) / 5)
}

/// Per-channel 2/5 A + 3/5 B.
#[inline]
pub(crate) const fn weight2_3(a: u16, b: u16) -> u16 {
    ((((c_r(a) << 1) + c_r(b) * 3) / 5) << 11)
        | ((((c_g(a) << 1) + c_g(b) * 3) / 5) << 5)
        | (((c_b(a) << 1) + c_b(b) * 3) / 5)
}

const BLACK: u16 = 0x0000;

#[inline]
fn read_px(src: &[u8], offset: usize) -> u16 {
    u16::from_ne_bytes([src[offset], src[offset + 1]])
}

#[inline]
fn write_px(dst: &mut [u8], offset: usize, pixel: u16) {
    dst[offset..offset + 2].copy_from_slice(&pixel.to_ne_bytes());
}

/// Row brightness patterns per scale factor. Each entry is the per-output-row
/// darkening applied within one source row's block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowShade {
    Full,
    ThreeFifths,
    ThreeQuarters,
}

#[inline]
fn shade(pixel: u16, shade: RowShade) -> u16 {
    match shade {
        RowShade::Full => pixel,
        RowShade::ThreeFifths => weight3_2(pixel, BLACK),
        RowShade::ThreeQuarters => weight3_1(pixel, BLACK),
    }
}

fn scale_line(
    xmul: usize,
    row_shades: &[RowShade],
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    dp: u32,
) {
    if sw == 0 || sh == 0 {
        return;
    }

    let (sw, sh) = (sw as usize, sh as usize);
    let sp = if sp == 0 { sw * 2 } else { sp as usize };
    let ymul = row_shades.len();
    let dp = if dp == 0 { sw * xmul * 2 } else { dp as usize };

    for y in 0..sh {
        let src_off = y * sp;
        let dst_off = y * ymul * dp;
        for x in 0..sw {
            let pixel = read_px(src, src_off + x * 2);
            for (row, &row_shade) in row_shades.iter().enumerate() {
                let shaded = shade(pixel, row_shade);
                for i in 0..xmul {
                    write_px(dst, dst_off + row * dp + (x * xmul + i) * 2, shaded);
                }
            }
        }
    }
}

/// 1x scanline effect: odd source rows are darkened to 3/4 brightness.
pub fn scale1x_line(
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
    let dp = if dp == 0 { sw * 2 } else { dp as usize };

    for y in 0..sh {
        let src_off = y * sp;
        let dst_off = y * dp;
        if y % 2 == 0 {
            dst[dst_off..dst_off + sw * 2].copy_from_slice(&src[src_off..src_off + sw * 2]);
        } else {
            for x in 0..sw {
                let pixel = read_px(src, src_off + x * 2);
                write_px(dst, dst_off + x * 2, weight3_1(pixel, BLACK));
            }
        }
    }
}

/// 2x scanline effect: rows alternate full and 3/5 brightness.
pub fn scale2x_line(
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    _dw: u32,
    _dh: u32,
    dp: u32,
) {
    scale_line(2, &[RowShade::Full, RowShade::ThreeFifths], src, dst, sw, sh, sp, dp);
}

/// 3x scanline effect: the block's first row is darkened, the rest full.
pub fn scale3x_line(
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    _dw: u32,
    _dh: u32,
    dp: u32,
) {
    scale_line(3, &[RowShade::ThreeFifths, RowShade::Full, RowShade::Full], src, dst, sw, sh, sp, dp);
}

/// 4x scanline effect: alternating full / darkened row pairs.
pub fn scale4x_line(
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    _dw: u32,
    _dh: u32,
    dp: u32,
) {
    scale_line(
        4,
        &[RowShade::Full, RowShade::ThreeFifths, RowShade::Full, RowShade::ThreeFifths],
        src,
        dst,
        sw,
        sh,
        sp,
        dp,
    );
}

/// 2x shadow-mask effect. Per 2x2 block: three darkened pixels, full
/// brightness in the lower-right.
pub fn scale2x_grid(
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
    let dp = if dp == 0 { sw * 2 * 2 } else { dp as usize };

    for y in 0..sh {
        let src_off = y * sp;
        let dst_off = y * 2 * dp;
        for x in 0..sw {
            let c1 = read_px(src, src_off + x * 2);
            let c2 = weight3_1(c1, BLACK);

            write_px(dst, dst_off + x * 4, c2);
            write_px(dst, dst_off + x * 4 + 2, c2);
            write_px(dst, dst_off + dp + x * 4, c2);
            write_px(dst, dst_off + dp + x * 4 + 2, c1);
        }
    }
}

/// 3x shadow-mask effect. Per 3x3 block: darkened first column, darker
/// still in the bottom row.
pub fn scale3x_grid(
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
    let dp = if dp == 0 { sw * 3 * 2 } else { dp as usize };

    for y in 0..sh {
        let src_off = y * sp;
        let dst_off = y * 3 * dp;
        for x in 0..sw {
            let c1 = read_px(src, src_off + x * 2);
            let c2 = weight3_2(c1, BLACK);
            let c3 = weight2_3(c1, BLACK);

            for row in 0..2 {
                write_px(dst, dst_off + row * dp + x * 6, c2);
                write_px(dst, dst_off + row * dp + x * 6 + 2, c1);
                write_px(dst, dst_off + row * dp + x * 6 + 4, c1);
            }
            write_px(dst, dst_off + 2 * dp + x * 6, c3);
            write_px(dst, dst_off + 2 * dp + x * 6 + 2, c2);
            write_px(dst, dst_off + 2 * dp + x * 6 + 4, c2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixels(bytes: &[u8]) -> Vec<u16> {
        bytes.chunks_exact(2).map(|px| u16::from_ne_bytes([px[0], px[1]])).collect()
    }

    #[test]
    fn weights_preserve_black_and_scale_white() {
        assert_eq!(weight3_1(0x0000, BLACK), 0x0000);
        // 3/4 of full white: R = 23, G = 47, B = 23
        assert_eq!(weight3_1(0xFFFF, BLACK), (23 << 11) | (47 << 5) | 23);
        // 3/5 of full white: R = 18, G = 37, B = 18
        assert_eq!(weight3_2(0xFFFF, BLACK), (18 << 11) | (37 << 5) | 18);
    }

    #[test]
    fn line2x_darkens_every_other_row() {
        let src: Vec<u8> = bytemuck::cast_slice(&[0xFFFF_u16]).to_vec();
        let mut dst = vec![0_u8; 2 * 2 * 2];
        scale2x_line(&src, &mut dst, 1, 1, 0, 2, 2, 0);

        let out = pixels(&dst);
        let dark = weight3_2(0xFFFF, BLACK);
        assert_eq!(out, vec![0xFFFF, 0xFFFF, dark, dark]);
    }

    #[test]
    fn line1x_keeps_even_rows_untouched() {
        let src: Vec<u8> = bytemuck::cast_slice(&[0xAAAA_u16, 0xAAAA]).to_vec();
        let mut dst = vec![0_u8; 2 * 2];
        scale1x_line(&src, &mut dst, 1, 2, 2, 1, 2, 2);

        let out = pixels(&dst);
        assert_eq!(out[0], 0xAAAA);
        assert_eq!(out[1], weight3_1(0xAAAA, BLACK));
    }

    #[test]
    fn grid2x_block_pattern() {
        let src: Vec<u8> = bytemuck::cast_slice(&[0xFFFF_u16]).to_vec();
        let mut dst = vec![0_u8; 2 * 2 * 2];
        scale2x_grid(&src, &mut dst, 1, 1, 0, 2, 2, 0);

        let out = pixels(&dst);
        let dark = weight3_1(0xFFFF, BLACK);
        assert_eq!(out, vec![dark, dark, dark, 0xFFFF]);
    }

    #[test]
    fn grid3x_block_pattern() {
        let src: Vec<u8> = bytemuck::cast_slice(&[0xFFFF_u16]).to_vec();
        let mut dst = vec![0_u8; 3 * 3 * 2];
        scale3x_grid(&src, &mut dst, 1, 1, 0, 3, 3, 0);

        let out = pixels(&dst);
        let c2 = weight3_2(0xFFFF, BLACK);
        let c3 = weight2_3(0xFFFF, BLACK);
        assert_eq!(out, vec![c2, 0xFFFF, 0xFFFF, c2, 0xFFFF, 0xFFFF, c3, c2, c2]);
    }
}
