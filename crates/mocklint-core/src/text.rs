//! Byte offset to line:column conversion for diagnostic locations.
//!
//! Lines and columns are **1-indexed**, columns count Unicode scalar values.
//! Byte offsets are **0-indexed**.

/// Convert a byte offset to 1-indexed line and column (Unicode-aware).
///
/// An offset past the end of `content` yields the position just after the
/// last character. An offset inside a multi-byte character resolves to that
/// character's column.
pub fn byte_offset_to_position(content: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;

    for (index, ch) in content.char_indices() {
        if index + ch.len_utf8() > offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_of_content() {
        assert_eq!(byte_offset_to_position("mock.Setup()", 0), (1, 1));
    }

    #[test]
    fn later_line() {
        let content = "var mock = x;\nmock.Verify();";
        assert_eq!(byte_offset_to_position(content, 14), (2, 1));
        assert_eq!(byte_offset_to_position(content, 19), (2, 6));
    }

    #[test]
    fn multibyte_characters_count_once() {
        // "é" is two bytes
        let content = "é = 1;";
        assert_eq!(byte_offset_to_position(content, 2), (1, 2));
    }

    #[test]
    fn offset_past_end_clamps() {
        assert_eq!(byte_offset_to_position("ab", 99), (1, 3));
    }
}
