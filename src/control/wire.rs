//! Reply convention shared by every variable-length query.
//!
//! The guest cannot know the reply size up front. The host computes the full
//! encoded length `L` (terminator included). If the guest buffer holds fewer
//! than `L` units nothing is written and `-L` is returned, telling the guest
//! to retry with at least `L`. Otherwise exactly `L` units are written and
//! `L` is returned. `0` means an absent value, written as an empty string.

fn as_reply_len(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

/// Encoded length of `s` as a NUL-terminated string.
pub fn string_reply_len(s: &str) -> usize {
    s.len() + 1
}

/// Reply with a NUL-terminated string, or with an empty string for `None`.
pub fn write_string_reply(s: Option<&str>, buf: &mut [u8]) -> i32 {
    let Some(s) = s else {
        if let Some(first) = buf.first_mut() {
            *first = 0;
        }
        return 0;
    };

    let len = string_reply_len(s);
    if len > buf.len() {
        return -as_reply_len(len);
    }
    buf[..s.len()].copy_from_slice(s.as_bytes());
    buf[s.len()] = 0;
    as_reply_len(len)
}

/// Reply with an array of words (e.g. packed framebuffer configs).
pub fn write_words_reply(words: &[u32], buf: &mut [u32]) -> i32 {
    let len = words.len();
    if len == 0 {
        return 0;
    }
    if len > buf.len() {
        return -as_reply_len(len);
    }
    buf[..len].copy_from_slice(words);
    as_reply_len(len)
}

/// Read back a string written by [`write_string_reply`].
pub fn read_string_reply(buf: &[u8]) -> &str {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end]).unwrap_or_default()
}

#[cfg(test)]
#[path = "../../tests/unit/control/wire.rs"]
mod tests;
