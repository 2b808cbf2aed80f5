//! Platform-dependent bucket geometry.
//!
//! Mirrors the `#if SIZE_MAX == UINT64_MAX` / `#elif SIZE_MAX == UINT32_MAX`
//! split in Valkey's `hashtab.c`: the fill factor after an expansion is
//! chosen so it never exceeds `MAX_FILL_PERCENT_SOFT` (77%) regardless of
//! word size.

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        mod geometry {
            /// Element slots per 64-byte bucket on a 64-bit host.
            pub const ELEMENTS_PER_BUCKET: usize = 7;
            pub const BUCKET_FACTOR: usize = 3;
            pub const BUCKET_DIVISOR: usize = 16;
            /// Control word holding `everfull` (bit 7) and `presence` (bits 0..=6).
            pub type CtrlWord = u8;
            pub const BITS_FOR_POS_IN_BUCKET: u32 = 3;
        }
    } else {
        mod geometry {
            /// Element slots per 64-byte bucket on a 32-bit host.
            pub const ELEMENTS_PER_BUCKET: usize = 12;
            pub const BUCKET_FACTOR: usize = 7;
            pub const BUCKET_DIVISOR: usize = 64;
            /// Control word holding `everfull` (bit 12) and `presence` (bits 0..=11).
            pub type CtrlWord = u16;
            pub const BITS_FOR_POS_IN_BUCKET: u32 = 4;
        }
    }
}

pub(crate) use geometry::*;

// 16 / 3 / 7 == 76.19%, 64 / 7 / 12 == 76.19%: both below the soft max.
const _: () = assert!(
    100 * BUCKET_DIVISOR / BUCKET_FACTOR / ELEMENTS_PER_BUCKET <= super::resize::MAX_FILL_PERCENT_SOFT as usize,
    "expansion must land below the soft max fill factor"
);
