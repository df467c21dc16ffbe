//! Small shared helpers.

/// Largest char-boundary index at or below `index`.
pub(crate) fn floor_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char-boundary index at or above `index`.
pub(crate) fn ceil_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

/// Stable hex digest of text content, used for change detection metadata.
pub(crate) fn content_hash(text: &str) -> String {
    format!("{:08x}", crc32fast::hash(text.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_never_split_multibyte_chars() {
        let s = "aé漢";
        for i in 0..=s.len() {
            let f = floor_char_boundary(s, i);
            let c = ceil_char_boundary(s, i);
            assert!(s.is_char_boundary(f));
            assert!(s.is_char_boundary(c));
            assert!(f <= i && i <= c);
        }
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }
}
