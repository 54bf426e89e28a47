//! Opaque connection cursors.
//!
//! A cursor is `base64("arrayconnection:<offset>")`, where offset is the
//! zero-based ordinal of the edge in the sorted result.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

const CURSOR_PREFIX: &str = "arrayconnection:";

pub fn offset_to_cursor(offset: usize) -> String {
    BASE64.encode(format!("{}{}", CURSOR_PREFIX, offset))
}

/// Decode a cursor back into its offset. Returns `None` for anything that
/// was not produced by [`offset_to_cursor`].
pub fn cursor_to_offset(cursor: &str) -> Option<usize> {
    let bytes = BASE64.decode(cursor).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    text.strip_prefix(CURSOR_PREFIX)?.parse().ok()
}
