//! NEON implementations of the integer blitters (aarch64 only).
//!
//! The hot loop loads 16 source bytes and produces the replicated output
//! with `TBL` lookups, one index vector per output vector; a scalar tail
//! finishes widths that are not a multiple of eight (16-bit) or four
//! (32-bit) pixels. Rows for vertical factors above one are duplicated with
//! a vector bulk copy.
//!
//! Every entry point validates 4-byte alignment of both buffers and both
//! pitches and delegates to the same-factor scalar kernel when any is
//! unaligned, so output is byte-identical to the scalar path either way.

use crate::Scaler;
use crate::integer::{scale_cx16, scale_cx32};
use core::arch::aarch64::{vld1q_u8, vqtbl1q_u8, vst1q_u8};

/// TBL index vector `v` for replicating 16-bit pixels `x` times.
const fn tbl16(x: usize, v: usize) -> [u8; 16] {
    let mut table = [0_u8; 16];
    let mut i = 0;
    while i < 16 {
        let out_byte = v * 16 + i;
        let src_px = (out_byte / 2) / x;
        table[i] = (src_px * 2 + out_byte % 2) as u8;
        i += 1;
    }
    table
}

/// TBL index vector `v` for replicating 32-bit pixels `x` times.
const fn tbl32(x: usize, v: usize) -> [u8; 16] {
    let mut table = [0_u8; 16];
    let mut i = 0;
    while i < 16 {
        let out_byte = v * 16 + i;
        let src_px = (out_byte / 4) / x;
        table[i] = (src_px * 4 + out_byte % 4) as u8;
        i += 1;
    }
    table
}

const fn tables16<const X: usize>() -> [[u8; 16]; X] {
    let mut tables = [[0_u8; 16]; X];
    let mut v = 0;
    while v < X {
        tables[v] = tbl16(X, v);
        v += 1;
    }
    tables
}

const fn tables32<const X: usize>() -> [[u8; 16]; X] {
    let mut tables = [[0_u8; 16]; X];
    let mut v = 0;
    while v < X {
        tables[v] = tbl32(X, v);
        v += 1;
    }
    tables
}

fn is_aligned(src: &[u8], dst: &[u8], sp: usize, dp: usize) -> bool {
    src.as_ptr() as usize % 4 == 0 && dst.as_ptr() as usize % 4 == 0 && sp % 4 == 0 && dp % 4 == 0
}

/// Vector bulk copy. Caller guarantees `dst` and `src` are disjoint ranges
/// of at least `len` bytes.
unsafe fn copy_rows(dst: *mut u8, src: *const u8, len: usize) {
    let mut offset = 0;
    while offset + 64 <= len {
        let a = vld1q_u8(src.add(offset));
        let b = vld1q_u8(src.add(offset + 16));
        let c = vld1q_u8(src.add(offset + 32));
        let d = vld1q_u8(src.add(offset + 48));
        vst1q_u8(dst.add(offset), a);
        vst1q_u8(dst.add(offset + 16), b);
        vst1q_u8(dst.add(offset + 32), c);
        vst1q_u8(dst.add(offset + 48), d);
        offset += 64;
    }
    while offset + 16 <= len {
        vst1q_u8(dst.add(offset), vld1q_u8(src.add(offset)));
        offset += 16;
    }
    while offset < len {
        *dst.add(offset) = *src.add(offset);
        offset += 1;
    }
}

fn scale_nx16<const X: usize>(
    ymul: usize,
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    dp: u32,
) {
    if sw == 0 || sh == 0 || ymul == 0 {
        return;
    }

    let (sw, sh) = (sw as usize, sh as usize);
    let sp_bytes = if sp == 0 { sw * 2 } else { sp as usize };
    let row_len = sw * X * 2;
    let dp_bytes = if dp == 0 { row_len } else { dp as usize };

    if !is_aligned(src, dst, sp_bytes, dp_bytes) {
        scale_cx16(X, ymul, src, dst, sw as u32, sh as u32, sp, dp);
        return;
    }

    let tables = const { tables16::<X>() };
    let wide_pixels = sw - sw % 8;

    for y in 0..sh {
        let src_row = &src[y * sp_bytes..y * sp_bytes + sw * 2];
        let dst_off = y * ymul * dp_bytes;
        let dst_row = &mut dst[dst_off..dst_off + row_len];

        // SAFETY: every load reads 16 bytes inside src_row and every store
        // writes 16 bytes inside dst_row; the loop bounds guarantee it.
        unsafe {
            let mut si = 0;
            let mut di = 0;
            while si + 16 <= wide_pixels * 2 {
                let pixels = vld1q_u8(src_row.as_ptr().add(si));
                for (v, table) in tables.iter().enumerate() {
                    let indices = vld1q_u8(table.as_ptr());
                    vst1q_u8(dst_row.as_mut_ptr().add(di + v * 16), vqtbl1q_u8(pixels, indices));
                }
                si += 16;
                di += X * 16;
            }
        }

        // Scalar tail for the remaining 0-7 pixels
        for x in wide_pixels..sw {
            let px = [src_row[x * 2], src_row[x * 2 + 1]];
            for i in 0..X {
                let off = (x * X + i) * 2;
                dst_row[off] = px[0];
                dst_row[off + 1] = px[1];
            }
        }

        for i in 1..ymul {
            // SAFETY: source and destination rows are disjoint slices of dst
            unsafe {
                let base = dst.as_mut_ptr().add(dst_off);
                copy_rows(base.add(i * dp_bytes), base, row_len);
            }
        }
    }
}

fn scale_nx32<const X: usize>(
    ymul: usize,
    src: &[u8],
    dst: &mut [u8],
    sw: u32,
    sh: u32,
    sp: u32,
    dp: u32,
) {
    if sw == 0 || sh == 0 || ymul == 0 {
        return;
    }

    let (sw, sh) = (sw as usize, sh as usize);
    let sp_bytes = if sp == 0 { sw * 4 } else { sp as usize };
    let row_len = sw * X * 4;
    let dp_bytes = if dp == 0 { row_len } else { dp as usize };

    if !is_aligned(src, dst, sp_bytes, dp_bytes) {
        scale_cx32(X, ymul, src, dst, sw as u32, sh as u32, sp, dp);
        return;
    }

    let tables = const { tables32::<X>() };
    let wide_pixels = sw - sw % 4;

    for y in 0..sh {
        let src_row = &src[y * sp_bytes..y * sp_bytes + sw * 4];
        let dst_off = y * ymul * dp_bytes;
        let dst_row = &mut dst[dst_off..dst_off + row_len];

        // SAFETY: bounds as in the 16-bit kernel
        unsafe {
            let mut si = 0;
            let mut di = 0;
            while si + 16 <= wide_pixels * 4 {
                let pixels = vld1q_u8(src_row.as_ptr().add(si));
                for (v, table) in tables.iter().enumerate() {
                    let indices = vld1q_u8(table.as_ptr());
                    vst1q_u8(dst_row.as_mut_ptr().add(di + v * 16), vqtbl1q_u8(pixels, indices));
                }
                si += 16;
                di += X * 16;
            }
        }

        for x in wide_pixels..sw {
            let mut px = [0_u8; 4];
            px.copy_from_slice(&src_row[x * 4..x * 4 + 4]);
            for i in 0..X {
                let off = (x * X + i) * 4;
                dst_row[off..off + 4].copy_from_slice(&px);
            }
        }

        for i in 1..ymul {
            // SAFETY: source and destination rows are disjoint slices of dst
            unsafe {
                let base = dst.as_mut_ptr().add(dst_off);
                copy_rows(base.add(i * dp_bytes), base, row_len);
            }
        }
    }
}

macro_rules! n16_scaler {
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
            scale_nx16::<$x>($y, src, dst, sw, sh, sp, dp);
        }
    };
}

macro_rules! n32_scaler {
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
            scale_nx32::<$x>($y, src, dst, sw, sh, sp, dp);
        }
    };
}

n16_scaler!(scale1x1_n16, 1, 1);
n16_scaler!(scale1x2_n16, 1, 2);
n16_scaler!(scale1x3_n16, 1, 3);
n16_scaler!(scale1x4_n16, 1, 4);
n16_scaler!(scale1x5_n16, 1, 5);
n16_scaler!(scale1x6_n16, 1, 6);
n16_scaler!(scale2x1_n16, 2, 1);
n16_scaler!(scale2x2_n16, 2, 2);
n16_scaler!(scale2x3_n16, 2, 3);
n16_scaler!(scale2x4_n16, 2, 4);
n16_scaler!(scale2x5_n16, 2, 5);
n16_scaler!(scale2x6_n16, 2, 6);
n16_scaler!(scale3x1_n16, 3, 1);
n16_scaler!(scale3x2_n16, 3, 2);
n16_scaler!(scale3x3_n16, 3, 3);
n16_scaler!(scale3x4_n16, 3, 4);
n16_scaler!(scale3x5_n16, 3, 5);
n16_scaler!(scale3x6_n16, 3, 6);
n16_scaler!(scale4x1_n16, 4, 1);
n16_scaler!(scale4x2_n16, 4, 2);
n16_scaler!(scale4x3_n16, 4, 3);
n16_scaler!(scale4x4_n16, 4, 4);
n16_scaler!(scale4x5_n16, 4, 5);
n16_scaler!(scale4x6_n16, 4, 6);
n16_scaler!(scale5x1_n16, 5, 1);
n16_scaler!(scale5x2_n16, 5, 2);
n16_scaler!(scale5x3_n16, 5, 3);
n16_scaler!(scale5x4_n16, 5, 4);
n16_scaler!(scale5x5_n16, 5, 5);
n16_scaler!(scale5x6_n16, 5, 6);
n16_scaler!(scale6x1_n16, 6, 1);
n16_scaler!(scale6x2_n16, 6, 2);
n16_scaler!(scale6x3_n16, 6, 3);
n16_scaler!(scale6x4_n16, 6, 4);
n16_scaler!(scale6x5_n16, 6, 5);
n16_scaler!(scale6x6_n16, 6, 6);

n32_scaler!(scale1x1_n32, 1, 1);
n32_scaler!(scale1x2_n32, 1, 2);
n32_scaler!(scale1x3_n32, 1, 3);
n32_scaler!(scale1x4_n32, 1, 4);
n32_scaler!(scale1x5_n32, 1, 5);
n32_scaler!(scale1x6_n32, 1, 6);
n32_scaler!(scale2x1_n32, 2, 1);
n32_scaler!(scale2x2_n32, 2, 2);
n32_scaler!(scale2x3_n32, 2, 3);
n32_scaler!(scale2x4_n32, 2, 4);
n32_scaler!(scale2x5_n32, 2, 5);
n32_scaler!(scale2x6_n32, 2, 6);
n32_scaler!(scale3x1_n32, 3, 1);
n32_scaler!(scale3x2_n32, 3, 2);
n32_scaler!(scale3x3_n32, 3, 3);
n32_scaler!(scale3x4_n32, 3, 4);
n32_scaler!(scale3x5_n32, 3, 5);
n32_scaler!(scale3x6_n32, 3, 6);
n32_scaler!(scale4x1_n32, 4, 1);
n32_scaler!(scale4x2_n32, 4, 2);
n32_scaler!(scale4x3_n32, 4, 3);
n32_scaler!(scale4x4_n32, 4, 4);
n32_scaler!(scale4x5_n32, 4, 5);
n32_scaler!(scale4x6_n32, 4, 6);
n32_scaler!(scale5x1_n32, 5, 1);
n32_scaler!(scale5x2_n32, 5, 2);
n32_scaler!(scale5x3_n32, 5, 3);
n32_scaler!(scale5x4_n32, 5, 4);
n32_scaler!(scale5x5_n32, 5, 5);
n32_scaler!(scale5x6_n32, 5, 6);
n32_scaler!(scale6x1_n32, 6, 1);
n32_scaler!(scale6x2_n32, 6, 2);
n32_scaler!(scale6x3_n32, 6, 3);
n32_scaler!(scale6x4_n32, 6, 4);
n32_scaler!(scale6x5_n32, 6, 5);
n32_scaler!(scale6x6_n32, 6, 6);

#[rustfmt::skip]
static TABLE_N16: [[Scaler; 6]; 6] = [
    [scale1x1_n16, scale1x2_n16, scale1x3_n16, scale1x4_n16, scale1x5_n16, scale1x6_n16],
    [scale2x1_n16, scale2x2_n16, scale2x3_n16, scale2x4_n16, scale2x5_n16, scale2x6_n16],
    [scale3x1_n16, scale3x2_n16, scale3x3_n16, scale3x4_n16, scale3x5_n16, scale3x6_n16],
    [scale4x1_n16, scale4x2_n16, scale4x3_n16, scale4x4_n16, scale4x5_n16, scale4x6_n16],
    [scale5x1_n16, scale5x2_n16, scale5x3_n16, scale5x4_n16, scale5x5_n16, scale5x6_n16],
    [scale6x1_n16, scale6x2_n16, scale6x3_n16, scale6x4_n16, scale6x5_n16, scale6x6_n16],
];

#[rustfmt::skip]
static TABLE_N32: [[Scaler; 6]; 6] = [
    [scale1x1_n32, scale1x2_n32, scale1x3_n32, scale1x4_n32, scale1x5_n32, scale1x6_n32],
    [scale2x1_n32, scale2x2_n32, scale2x3_n32, scale2x4_n32, scale2x5_n32, scale2x6_n32],
    [scale3x1_n32, scale3x2_n32, scale3x3_n32, scale3x4_n32, scale3x5_n32, scale3x6_n32],
    [scale4x1_n32, scale4x2_n32, scale4x3_n32, scale4x4_n32, scale4x5_n32, scale4x6_n32],
    [scale5x1_n32, scale5x2_n32, scale5x3_n32, scale5x4_n32, scale5x5_n32, scale5x6_n32],
    [scale6x1_n32, scale6x2_n32, scale6x3_n32, scale6x4_n32, scale6x5_n32, scale6x6_n32],
];

/// Fetch the 16-bit SIMD blitter for a factor pair, or None when either
/// factor is outside 1..=6.
#[must_use]
pub fn lookup_n16(xmul: u32, ymul: u32) -> Option<Scaler> {
    if !(1..=6).contains(&xmul) || !(1..=6).contains(&ymul) {
        return None;
    }
    Some(TABLE_N16[xmul as usize - 1][ymul as usize - 1])
}

/// 32-bit counterpart of [`lookup_n16`].
#[must_use]
pub fn lookup_n32(xmul: u32, ymul: u32) -> Option<Scaler> {
    if !(1..=6).contains(&xmul) || !(1..=6).contains(&ymul) {
        return None;
    }
    Some(TABLE_N32[xmul as usize - 1][ymul as usize - 1])
}

/// Generic 16-bit SIMD dispatcher; out-of-range factor pairs are no-ops.
#[allow(clippy::too_many_arguments)]
pub fn scaler_n16(
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
    if let Some(blit) = lookup_n16(xmul, ymul) {
        blit(src, dst, sw, sh, sp, dw, dh, dp);
    }
}

/// Generic 32-bit SIMD dispatcher; out-of-range factor pairs are no-ops.
#[allow(clippy::too_many_arguments)]
pub fn scaler_n32(
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
    if let Some(blit) = lookup_n32(xmul, ymul) {
        blit(src, dst, sw, sh, sp, dw, dh, dp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integer;

    fn checkerboard16(w: usize, h: usize) -> Vec<u8> {
        let pixels: Vec<u16> =
            (0..w * h).map(|i| if (i % w + i / w) % 2 == 0 { 0x0000 } else { 0xFFFF }).collect();
        bytemuck::cast_slice(&pixels).to_vec()
    }

    #[test]
    fn neon_matches_scalar_for_every_factor_pair_16() {
        let (sw, sh) = (17_u32, 5_u32); // odd width exercises the tail
        let src = checkerboard16(sw as usize, sh as usize);

        for xmul in 1..=6_u32 {
            for ymul in 1..=6_u32 {
                let size = (sw * xmul * 2 * sh * ymul) as usize;
                let mut simd = vec![0_u8; size];
                let mut scalar = vec![0_u8; size];
                scaler_n16(xmul, ymul, &src, &mut simd, sw, sh, 0, sw * xmul, sh * ymul, 0);
                integer::scaler_c16(xmul, ymul, &src, &mut scalar, sw, sh, 0, sw * xmul, sh * ymul, 0);
                assert_eq!(simd, scalar, "divergence at {xmul}x{ymul}");
            }
        }
    }

    #[test]
    fn neon_matches_scalar_for_every_factor_pair_32() {
        let (sw, sh) = (9_u32, 4_u32);
        let pixels: Vec<u32> = (0..sw * sh).map(|i| 0xFF000000 | i * 0x10203).collect();
        let src: Vec<u8> = bytemuck::cast_slice(&pixels).to_vec();

        for xmul in 1..=6_u32 {
            for ymul in 1..=6_u32 {
                let size = (sw * xmul * 4 * sh * ymul) as usize;
                let mut simd = vec![0_u8; size];
                let mut scalar = vec![0_u8; size];
                scaler_n32(xmul, ymul, &src, &mut simd, sw, sh, 0, sw * xmul, sh * ymul, 0);
                integer::scaler_c32(xmul, ymul, &src, &mut scalar, sw, sh, 0, sw * xmul, sh * ymul, 0);
                assert_eq!(simd, scalar, "divergence at {xmul}x{ymul}");
            }
        }
    }

    #[test]
    fn misaligned_input_falls_back_to_scalar_output() {
        let (sw, sh) = (8_u32, 4_u32);
        let backing = checkerboard16(sw as usize + 1, sh as usize);
        // Offset by 2 bytes so the slice start is not 4-byte aligned
        let src = &backing[2..2 + (sw * sh * 2) as usize];

        let size = (sw * 2 * 2 * sh * 2) as usize;
        let mut from_neon = vec![0_u8; size];
        let mut from_scalar = vec![0_u8; size];
        scale2x2_n16(src, &mut from_neon, sw, sh, 0, sw * 2, sh * 2, 0);
        integer::scale2x2_c16(src, &mut from_scalar, sw, sh, 0, sw * 2, sh * 2, 0);

        assert_eq!(from_neon, from_scalar);
    }

    #[test]
    fn tbl_indices_stay_within_one_vector() {
        for x in 1..=6 {
            for v in 0..x {
                assert!(tbl16(x, v).iter().all(|&i| i < 16));
                assert!(tbl32(x, v).iter().all(|&i| i < 16));
            }
        }
    }
}
