//! Pixel blitters for compositing emulator video onto device framebuffers.
//!
//! Every blitter in this crate shares one signature ([`Scaler`]) so that the
//! renderer can select one per frame and store it in its descriptor. Widths
//! and heights are in pixels, pitches in bytes, and a pitch of zero means
//! "tightly packed" (width times bytes per pixel). Blitters never allocate
//! and never fail; zero-sized inputs are no-ops.
//!
//! Layout:
//! - [`integer`] — nearest-neighbor X-by-Y block replication for every
//!   factor pair in 1..=6, at 16 and 32 bits per pixel, plus the
//!   table-driven dispatchers.
//! - [`convert`] — RGB565 sources onto RGBA8888 framebuffers.
//! - [`effect`] — CRT scanline and shadow-mask effect variants (16-bit).
//! - [`fractional`] — approximately-bilinear blitters for a few common
//!   non-integer ratios, plus a generic nearest-neighbor fallback.
//! - `neon` (aarch64 only) — SIMD implementations of the integer blitters,
//!   byte-identical to the scalar ones.

pub mod convert;
pub mod effect;
pub mod fractional;
pub mod integer;
#[cfg(target_arch = "aarch64")]
pub mod neon;

/// The uniform blit signature: `(src, dst, sw, sh, sp, dw, dh, dp)`.
///
/// `sw`/`sh` are the source size in pixels and `sp` the source pitch in
/// bytes; `dw`/`dh`/`dp` describe the destination. Several blitters derive
/// their output geometry entirely from the source and scale factor and only
/// consume `dp`; the unused parameters exist so every blitter is storable in
/// a [`Scaler`].
///
/// Callers must hand in slices that cover the full pitched extent of both
/// images. Source and destination must not overlap (enforced by `&`/`&mut`).
pub type Scaler =
    fn(src: &[u8], dst: &mut [u8], sw: u32, sh: u32, sp: u32, dw: u32, dh: u32, dp: u32);

/// Look up the integer blitter for a factor pair at 16 bits per pixel,
/// preferring the SIMD implementation where one exists. Returns None for
/// factors outside 1..=6.
#[must_use]
pub fn lookup16(xmul: u32, ymul: u32) -> Option<Scaler> {
    #[cfg(target_arch = "aarch64")]
    {
        neon::lookup_n16(xmul, ymul)
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        integer::lookup_c16(xmul, ymul)
    }
}

/// 32-bit counterpart of [`lookup16`].
#[must_use]
pub fn lookup32(xmul: u32, ymul: u32) -> Option<Scaler> {
    #[cfg(target_arch = "aarch64")]
    {
        neon::lookup_n32(xmul, ymul)
    }
    #[cfg(not(target_arch = "aarch64"))]
    {
        integer::lookup_c32(xmul, ymul)
    }
}
