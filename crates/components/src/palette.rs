//! Immutable, process-wide default palette for 4-bit (tier-2) GPU/Screen
//! pairs.
//!
//! Grounded on SPEC_FULL.md §9's "global state in the form of palette
//! tables" note: treated as an immutable table initialized once via
//! `once_cell::sync::Lazy`, matching `nn-core::crc32`'s table.

use once_cell::sync::Lazy;

pub const PALETTE_SIZE: usize = 16;

/// A plausible, visually-distinct 16-color default palette (not a literal
/// transcription of any single upstream mod's table, which ships its
/// colors as opaque bytecode resources outside this pack's source).
pub static DEFAULT_PALETTE: Lazy<[i32; PALETTE_SIZE]> = Lazy::new(|| {
    [
        0x000000, 0x3F3F3F, 0x7F7F7F, 0xBFBFBF, 0xFFFFFF, 0xFF0000, 0xFF8000, 0xFFFF00, 0x80FF00,
        0x00FF00, 0x00FF80, 0x00FFFF, 0x0080FF, 0x0000FF, 0x8000FF, 0xFF00FF,
    ]
});

/// Nearest default-palette index for an arbitrary 24-bit RGB color, by
/// Euclidean distance in channel space.
pub fn nearest_index(color: i32) -> usize {
    let (r, g, b) = split(color);
    DEFAULT_PALETTE
        .iter()
        .enumerate()
        .min_by_key(|(_, &candidate)| {
            let (cr, cg, cb) = split(candidate);
            let dr = r - cr;
            let dg = g - cg;
            let db = b - cb;
            dr * dr + dg * dg + db * db
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn split(color: i32) -> (i32, i32, i32) {
    ((color >> 16) & 0xFF, (color >> 8) & 0xFF, color & 0xFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn black_and_white_map_to_their_own_slots() {
        assert_eq!(nearest_index(0x000000), 0);
        assert_eq!(nearest_index(0xFFFFFF), 4);
    }
}
