/// How an encoded stream is handed to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodedKind {
    /// BMP container; re-encoded before the engine sees it.
    Bitmap,
    /// Anything else; written to the input slot unmodified.
    Passthrough,
}

/// Classify a stream by its first two bytes.
///
/// `BM` (0x42 0x4D) marks a BMP file. The swapped order `MB` is accepted too.
pub fn sniff(bytes: &[u8]) -> EncodedKind {
    match bytes {
        [b'B', b'M', ..] | [b'M', b'B', ..] => EncodedKind::Bitmap,
        _ => EncodedKind::Passthrough,
    }
}

pub fn is_bitmap(bytes: &[u8]) -> bool {
    sniff(bytes) == EncodedKind::Bitmap
}
