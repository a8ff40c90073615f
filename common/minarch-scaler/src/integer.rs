//! Nearest-neighbor integer blitters.
//!
//! Each source pixel becomes an X-by-Y block of identical destination
//! pixels. The per-width kernels replicate horizontally into the first
//! output row of each block, then duplicate that row for vertical factors
//! greater than one, so each row's pixel work happens exactly once.

use crate::Scaler;

/// Horizontal replication at 16 bits per pixel with a runtime vertical
/// factor. Shared by all `scaleXxY_c16` specializations.
pub(crate) fn scale_cx16(
    xmul: usize,
    ymul: usize,
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    dp: u32,
) {
    if sw == 0 || sh == 0 || xmul == 0 || ymul == 0 {
        return;
    }

    let (sw, sh) = (sw as usize, sh as usize);
    let sp = if sp == 0 { sw * 2 } else { sp as usize };
    let row_len = sw * xmul * 2;
    let dp = if dp == 0 { row_len } else { dp as usize };

    if xmul == 1 && ymul == 1 && sp == sw * 2 && sp == dp {
        // Contiguous 1:1 copy collapses to one bulk copy
        dst[..sp * sh].copy_from_slice(&src[..sp * sh]);
        return;
    }

    for y in 0..sh {
        let src_row = &src[y * sp..y * sp + sw * 2];
        let dst_off = y * ymul * dp;
        let dst_row = &mut dst[dst_off..dst_off + row_len];
        for (src_px, dst_block) in src_row.chunks_exact(2).zip(dst_row.chunks_exact_mut(xmul * 2)) {
            for dst_px in dst_block.chunks_exact_mut(2) {
                dst_px.copy_from_slice(src_px);
            }
        }
        for i in 1..ymul {
            dst.copy_within(dst_off..dst_off + row_len, dst_off + i * dp);
        }
    }
}

/// Horizontal replication at 32 bits per pixel with a runtime vertical
/// factor. Shared by all `scaleXxY_c32` specializations.
pub(crate) fn scale_cx32(
    xmul: usize,
    ymul: usize,
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    dp: u32,
) {
    if sw == 0 || sh == 0 || xmul == 0 || ymul == 0 {
        return;
    }

    let (sw, sh) = (sw as usize, sh as usize);
    let sp = if sp == 0 { sw * 4 } else { sp as usize };
    let row_len = sw * xmul * 4;
    let dp = if dp == 0 { row_len } else { dp as usize };

    if xmul == 1 && ymul == 1 && sp == sw * 4 && sp == dp {
        dst[..sp * sh].copy_from_slice(&src[..sp * sh]);
        return;
    }

    for y in 0..sh {
        let src_row = &src[y * sp..y * sp + sw * 4];
        let dst_off = y * ymul * dp;
        let dst_row = &mut dst[dst_off..dst_off + row_len];
        for (src_px, dst_block) in src_row.chunks_exact(4).zip(dst_row.chunks_exact_mut(xmul * 4)) {
            for dst_px in dst_block.chunks_exact_mut(4) {
                dst_px.copy_from_slice(src_px);
            }
        }
        for i in 1..ymul {
            dst.copy_within(dst_off..dst_off + row_len, dst_off + i * dp);
        }
    }
}

macro_rules! c16_scaler {
    ($name:ident, $x:expr, $y:expr) => {
        pub fn $name(
            src: &[u8],
            dst: &mut [u8],
            sw: u32,
            sh: u32,
            sp: u32,
            _dw: u32,
            _dh: u32,
            dp: u32,
        ) {
            scale_cx16($x, $y, src, dst, sw, sh, sp, dp);
        }
    };
}

macro_rules! c32_scaler {
    ($name:ident, $x:expr, $y:expr) => {
        pub fn $name(
            src: &[u8],
            dst: &mut [u8],
            sw: u32,
            sh: u32,
            sp: u32,
            _dw: u32,
            _dh: u32,
            dp: u32,
        ) {
            scale_cx32($x, $y, src, dst, sw, sh, sp, dp);
        }
    };
}

c16_scaler!(scale1x1_c16, 1, 1);
c16_scaler!(scale1x2_c16, 1, 2);
c16_scaler!(scale1x3_c16, 1, 3);
c16_scaler!(scale1x4_c16, 1, 4);
c16_scaler!(scale1x5_c16, 1, 5);
c16_scaler!(scale1x6_c16, 1, 6);
c16_scaler!(scale2x1_c16, 2, 1);
c16_scaler!(scale2x2_c16, 2, 2);
c16_scaler!(scale2x3_c16, 2, 3);
c16_scaler!(scale2x4_c16, 2, 4);
c16_scaler!(scale2x5_c16, 2, 5);
c16_scaler!(scale2x6_c16, 2, 6);
c16_scaler!(scale3x1_c16, 3, 1);
c16_scaler!(scale3x2_c16, 3, 2);
c16_scaler!(scale3x3_c16, 3, 3);
c16_scaler!(scale3x4_c16, 3, 4);
c16_scaler!(scale3x5_c16, 3, 5);
c16_scaler!(scale3x6_c16, 3, 6);
c16_scaler!(scale4x1_c16, 4, 1);
c16_scaler!(scale4x2_c16, 4, 2);
c16_scaler!(scale4x3_c16, 4, 3);
c16_scaler!(scale4x4_c16, 4, 4);
c16_scaler!(scale4x5_c16, 4, 5);
c16_scaler!(scale4x6_c16, 4, 6);
c16_scaler!(scale5x1_c16, 5, 1);
c16_scaler!(scale5x2_c16, 5, 2);
c16_scaler!(scale5x3_c16, 5, 3);
c16_scaler!(scale5x4_c16, 5, 4);
c16_scaler!(scale5x5_c16, 5, 5);
c16_scaler!(scale5x6_c16, 5, 6);
c16_scaler!(scale6x1_c16, 6, 1);
c16_scaler!(scale6x2_c16, 6, 2);
c16_scaler!(scale6x3_c16, 6, 3);
c16_scaler!(scale6x4_c16, 6, 4);
c16_scaler!(scale6x5_c16, 6, 5);
c16_scaler!(scale6x6_c16, 6, 6);

c32_scaler!(scale1x1_c32, 1, 1);
c32_scaler!(scale1x2_c32, 1, 2);
c32_scaler!(scale1x3_c32, 1, 3);
c32_scaler!(scale1x4_c32, 1, 4);
c32_scaler!(scale1x5_c32, 1, 5);
c32_scaler!(scale1x6_c32, 1, 6);
c32_scaler!(scale2x1_c32, 2, 1);
c32_scaler!(scale2x2_c32, 2, 2);
c32_scaler!(scale2x3_c32, 2, 3);
c32_scaler!(scale2x4_c32, 2, 4);
c32_scaler!(scale2x5_c32, 2, 5);
c32_scaler!(scale2x6_c32, 2, 6);
c32_scaler!(scale3x1_c32, 3, 1);
c32_scaler!(scale3x2_c32, 3, 2);
c32_scaler!(scale3x3_c32, 3, 3);
c32_scaler!(scale3x4_c32, 3, 4);
c32_scaler!(scale3x5_c32, 3, 5);
c32_scaler!(scale3x6_c32, 3, 6);
c32_scaler!(scale4x1_c32, 4, 1);
c32_scaler!(scale4x2_c32, 4, 2);
c32_scaler!(scale4x3_c32, 4, 3);
c32_scaler!(scale4x4_c32, 4, 4);
c32_scaler!(scale4x5_c32, 4, 5);
c32_scaler!(scale4x6_c32, 4, 6);
c32_scaler!(scale5x1_c32, 5, 1);
c32_scaler!(scale5x2_c32, 5, 2);
c32_scaler!(scale5x3_c32, 5, 3);
c32_scaler!(scale5x4_c32, 5, 4);
c32_scaler!(scale5x5_c32, 5, 5);
c32_scaler!(scale5x6_c32, 5, 6);
c32_scaler!(scale6x1_c32, 6, 1);
c32_scaler!(scale6x2_c32, 6, 2);
c32_scaler!(scale6x3_c32, 6, 3);
c32_scaler!(scale6x4_c32, 6, 4);
c32_scaler!(scale6x5_c32, 6, 5);
c32_scaler!(scale6x6_c32, 6, 6);

// Indexed [xmul - 1][ymul - 1]
#[rustfmt::skip]
static TABLE_C16: [[Scaler; 6]; 6] = [
    [scale1x1_c16, scale1x2_c16, scale1x3_c16, scale1x4_c16, scale1x5_c16, scale1x6_c16],
    [scale2x1_c16, scale2x2_c16, scale2x3_c16, scale2x4_c16, scale2x5_c16, scale2x6_c16],
    [scale3x1_c16, scale3x2_c16, scale3x3_c16, scale3x4_c16, scale3x5_c16, scale3x6_c16],
    [scale4x1_c16, scale4x2_c16, scale4x3_c16, scale4x4_c16, scale4x5_c16, scale4x6_c16],
    [scale5x1_c16, scale5x2_c16, scale5x3_c16, scale5x4_c16, scale5x5_c16, scale5x6_c16],
    [scale6x1_c16, scale6x2_c16, scale6x3_c16, scale6x4_c16, scale6x5_c16, scale6x6_c16],
];

#[rustfmt::skip]
static TABLE_C32: [[Scaler; 6]; 6] = [
    [scale1x1_c32, scale1x2_c32, scale1x3_c32, scale1x4_c32, scale1x5_c32, scale1x6_c32],
    [scale2x1_c32, scale2x2_c32, scale2x3_c32, scale2x4_c32, scale2x5_c32, scale2x6_c32],
    [scale3x1_c32, scale3x2_c32, scale3x3_c32, scale3x4_c32, scale3x5_c32, scale3x6_c32],
    [scale4x1_c32, scale4x2_c32, scale4x3_c32, scale4x4_c32, scale4x5_c32, scale4x6_c32],
    [scale5x1_c32, scale5x2_c32, scale5x3_c32, scale5x4_c32, scale5x5_c32, scale5x6_c32],
    [scale6x1_c32, scale6x2_c32, scale6x3_c32, scale6x4_c32, scale6x5_c32, scale6x6_c32],
];

/// Fetch the 16-bit scalar blitter for a factor pair, or None when either
/// factor is outside 1..=6.
#[must_use]
pub fn lookup_c16(xmul: u32, ymul: u32) -> Option<Scaler> {
    if !(1..=6).contains(&xmul) || !(1..=6).contains(&ymul) {
        return None;
    }
    Some(TABLE_C16[xmul as usize - 1][ymul as usize - 1])
}

/// 32-bit counterpart of [`lookup_c16`].
#[must_use]
pub fn lookup_c32(xmul: u32, ymul: u32) -> Option<Scaler> {
    if !(1..=6).contains(&xmul) || !(1..=6).contains(&ymul) {
        return None;
    }
    Some(TABLE_C32[xmul as usize - 1][ymul as usize - 1])
}

/// Generic 16-bit dispatcher; out-of-range factor pairs are no-ops.
#[allow(clippy::too_many_arguments)]
pub fn scaler_c16(
    xmul: u32,
    ymul: u32,
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    dw: u32,
    dh: u32,
    dp: u32,
) {
    if let Some(blit) = lookup_c16(xmul, ymul) {
        blit(src, dst, sw, sh, sp, dw, dh, dp);
    }
}

/// Generic 32-bit dispatcher; out-of-range factor pairs are no-ops.
#[allow(clippy::too_many_arguments)]
pub fn scaler_c32(
    xmul: u32,
    ymul: u32,
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    dw: u32,
    dh: u32,
    dp: u32,
) {
    if let Some(blit) = lookup_c32(xmul, ymul) {
        blit(src, dst, sw, sh, sp, dw, dh, dp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn pixels16(bytes: &[u8]) -> Vec<u16> {
        bytes.chunks_exact(2).map(|px| u16::from_ne_bytes([px[0], px[1]])).collect()
    }

    fn bytes16(pixels: &[u16]) -> Vec<u8> {
        bytemuck::cast_slice(pixels).to_vec()
    }

    fn bytes32(pixels: &[u32]) -> Vec<u8> {
        bytemuck::cast_slice(pixels).to_vec()
    }

    #[test]
    fn every_factor_pair_replicates_16() {
        let src: Vec<u16> = vec![0x1111, 0x2222, 0x3333, 0x4444, 0x5555, 0x6666];
        let (sw, sh) = (3_u32, 2_u32);
        let src_bytes = bytes16(&src);

        for xmul in 1..=6_u32 {
            for ymul in 1..=6_u32 {
                let (dw, dh) = (sw * xmul, sh * ymul);
                let mut dst = vec![0_u8; (dw * dh * 2) as usize];
                scaler_c16(xmul, ymul, &src_bytes, &mut dst, sw, sh, 0, dw, dh, 0);

                let out = pixels16(&dst);
                for y in 0..dh as usize {
                    for x in 0..dw as usize {
                        let expected =
                            src[(y / ymul as usize) * sw as usize + x / xmul as usize];
                        assert_eq!(
                            out[y * dw as usize + x],
                            expected,
                            "mismatch at ({x},{y}) for {xmul}x{ymul}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn every_factor_pair_replicates_32() {
        let src: Vec<u32> = vec![0xFF112233, 0xFF445566, 0xFF778899, 0xFFAABBCC];
        let (sw, sh) = (2_u32, 2_u32);
        let src_bytes = bytes32(&src);

        for xmul in 1..=6_u32 {
            for ymul in 1..=6_u32 {
                let (dw, dh) = (sw * xmul, sh * ymul);
                let mut dst = vec![0_u8; (dw * dh * 4) as usize];
                scaler_c32(xmul, ymul, &src_bytes, &mut dst, sw, sh, 0, dw, dh, 0);

                let out: Vec<u32> =
                    dst.chunks_exact(4).map(|px| u32::from_ne_bytes(px.try_into().unwrap())).collect();
                for y in 0..dh as usize {
                    for x in 0..dw as usize {
                        let expected =
                            src[(y / ymul as usize) * sw as usize + x / xmul as usize];
                        assert_eq!(out[y * dw as usize + x], expected);
                    }
                }
            }
        }
    }

    #[test]
    fn zero_pitch_matches_explicit_tight_pitch() {
        let src = bytes16(&[0xDEAD, 0xBEEF, 0xCAFE, 0xF00D]);
        let (sw, sh) = (2_u32, 2_u32);

        let mut tight = vec![0_u8; 4 * 4 * 2];
        let mut explicit = vec![0_u8; 4 * 4 * 2];
        scale2x2_c16(&src, &mut tight, sw, sh, 0, 4, 4, 0);
        scale2x2_c16(&src, &mut explicit, sw, sh, sw * 2, 4, 4, 4 * 2);

        assert_eq!(tight, explicit);
    }

    #[test]
    fn strided_source_and_destination() {
        // 2x1 source with 8-byte pitch (2 padding pixels per row)
        let src = bytes16(&[0xAAAA, 0xBBBB, 0x0000, 0x0000]);
        let sp = 8_u32;
        let dp = 16_u32; // 4 output pixels + 4 bytes padding per row
        let mut dst = vec![0_u8; (dp * 2) as usize];
        scale2x2_c16(&src, &mut dst, 2, 1, sp, 4, 2, dp);

        let out = pixels16(&dst);
        assert_eq!(&out[0..4], &[0xAAAA, 0xAAAA, 0xBBBB, 0xBBBB]);
        assert_eq!(&out[8..12], &[0xAAAA, 0xAAAA, 0xBBBB, 0xBBBB]);
        // Padding bytes untouched
        assert_eq!(&out[4..8], &[0, 0, 0, 0]);
    }

    #[test]
    fn no_writes_outside_destination_rows() {
        let src = bytes16(&[0x1234; 4]);
        let dp = 3 * 4 * 2 + 6; // generous padding after each row
        let mut dst = vec![0xEE_u8; dp * 3 * 2];
        scale3x3_c16(&src, &mut dst, 2, 2, 0, 6, 6, dp as u32);

        // Bytes past each row's pixel data keep their fill value
        for y in 0..6 {
            let row = &dst[y * dp..y * dp + dp.min(dst.len() - y * dp)];
            assert!(row[6 * 2..].iter().all(|&b| b == 0xEE), "row {y} padding clobbered");
        }
    }

    #[test]
    fn out_of_range_factors_are_noops() {
        let src = bytes16(&[0xFFFF; 4]);
        let mut dst = vec![0_u8; 64];
        scaler_c16(7, 1, &src, &mut dst, 2, 2, 0, 2, 2, 0);
        scaler_c16(0, 1, &src, &mut dst, 2, 2, 0, 2, 2, 0);
        scaler_c16(1, 9, &src, &mut dst, 2, 2, 0, 2, 2, 0);
        assert!(dst.iter().all(|&b| b == 0));
    }

    #[test]
    fn zero_dimensions_are_noops() {
        let src = bytes16(&[0xFFFF; 4]);
        let mut dst = vec![0_u8; 64];
        scale2x2_c16(&src, &mut dst, 0, 2, 0, 0, 4, 0);
        scale2x2_c16(&src, &mut dst, 2, 0, 0, 4, 0, 0);
        assert!(dst.iter().all(|&b| b == 0));
    }
}
