//! Orientation tag scanner.
//!
//! Encoded images may carry an EXIF orientation entry near the start of the
//! file. Rather than parsing the container, the scanner looks for the
//! big-endian TIFF IFD entry of tag 0x0112 (Orientation), type SHORT, count 1
//! within a fixed prefix of the stream.
//!
//! # Grammar
//!
//! Render every byte of the window in decimal, join with single spaces, and
//! take the leftmost match of
//!
//! ```text
//! 1 18 0 3 0 0 0 1 0 D
//! ```
//!
//! where `D` is one decimal digit. Two consequences of matching over the
//! decimal rendering are part of the contract:
//!
//! - the leading `1` can be the last digit of a longer number, so the first
//!   byte of the entry matches any value ending in 1 (1, 11, ..., 251);
//! - `D` is the leading digit of the value byte, so 0x06 gives 6 and 0x3C
//!   (60) also gives 6.
//!
//! A `D` of zero, or no match at all, yields the default orientation 1.

/// Number of leading bytes examined.
pub const ORIENTATION_SCAN_WINDOW: usize = 500;

/// Orientation reported when no usable tag is found ("normal").
pub const DEFAULT_ORIENTATION: u8 = 1;

/// Entry bytes following the first tag byte: tag low byte, type SHORT, count 1,
/// high byte of the value.
const ENTRY_TAIL: [u8; 8] = [18, 0, 3, 0, 0, 0, 1, 0];

/// Scan the first [`ORIENTATION_SCAN_WINDOW`] bytes for an orientation tag.
pub fn scan_orientation(bytes: &[u8]) -> u8 {
    find_tag_digit(bytes)
        .filter(|&digit| digit != 0)
        .unwrap_or(DEFAULT_ORIENTATION)
}

/// Leading digit of the value byte of the leftmost tag match, if any.
fn find_tag_digit(bytes: &[u8]) -> Option<u8> {
    let window = &bytes[..bytes.len().min(ORIENTATION_SCAN_WINDOW)];
    window
        .windows(ENTRY_TAIL.len() + 2)
        .find(|w| w[0] % 10 == 1 && w[1..=ENTRY_TAIL.len()] == ENTRY_TAIL)
        .map(|w| leading_digit(w[ENTRY_TAIL.len() + 1]))
}

fn leading_digit(mut value: u8) -> u8 {
    while value >= 10 {
        value /= 10;
    }
    value
}
