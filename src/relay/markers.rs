//! Sentinel markers framing a streamed reply, and their removal.
//!
//! The server writes [`STREAM_START`] before the first fragment and
//! [`STREAM_END`] after the last, or [`STREAM_ERROR`] when the upstream
//! fails. Readers strip them before display.

/// Written before the first fragment.
pub const STREAM_START: &str = "[STREAM-START]\n";

/// Written after the last fragment.
pub const STREAM_END: &str = "\n[STREAM-END]\n";

/// Written when the upstream fails.
pub const STREAM_ERROR: &str = "[STREAM-ERROR]\n";

/// Marker tokens, each optionally followed by a newline that goes with it.
pub const MARKER_TOKENS: [&str; 3] = ["[STREAM-START]", "[STREAM-END]", "[STREAM-ERROR]"];

/// Remove every marker token together with one newline directly after it.
///
/// Repeats until nothing changes, so a marker assembled by removing
/// another one is removed too. This makes the operation idempotent.
pub fn strip_markers(text: &str) -> String {
    let mut current = strip_once(text);
    loop {
        let next = strip_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_once(text: &str) -> String {
    MARKER_TOKENS
        .iter()
        .fold(text.to_string(), |acc, token| remove_token(&acc, token))
}

fn remove_token(text: &str, token: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(token) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + token.len()..];
        rest = rest.strip_prefix('\n').unwrap_or(rest);
    }
    out.push_str(rest);
    out
}

/// Which markers a [`MarkerStripper`] has seen so far.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MarkersSeen {
    pub start: bool,
    pub end: bool,
    pub error: bool,
}

/// Strips markers from text that arrives in arbitrary chunks.
///
/// Text that might be the beginning of a marker is held back until the
/// next chunk decides it, so a marker split across chunks is still removed.
#[derive(Debug, Default)]
pub struct MarkerStripper {
    pending: String,
    seen: MarkersSeen,
}

impl MarkerStripper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk; returns the text that is now safe to display.
    pub fn push(&mut self, chunk: &str) -> String {
        self.pending.push_str(chunk);
        let hold = held_suffix_start(&self.pending);
        let ready: String = self.pending.drain(..hold).collect();
        self.clean(&ready)
    }

    /// End of input: release whatever was held back.
    pub fn finish(&mut self) -> String {
        let rest = std::mem::take(&mut self.pending);
        self.clean(&rest)
    }

    pub fn seen(&self) -> MarkersSeen {
        self.seen
    }

    fn clean(&mut self, text: &str) -> String {
        self.seen.start |= text.contains(MARKER_TOKENS[0]);
        self.seen.end |= text.contains(MARKER_TOKENS[1]);
        self.seen.error |= text.contains(MARKER_TOKENS[2]);
        strip_markers(text)
    }
}

/// Byte index where a possibly incomplete marker (with its optional
/// newline) starts at the end of `text`, or `text.len()` if none does.
fn held_suffix_start(text: &str) -> usize {
    let longest = MARKER_TOKENS.iter().map(|t| t.len() + 1).max().unwrap_or(0);
    let window_start = text.len().saturating_sub(longest);

    text.char_indices()
        .filter(|&(i, c)| i >= window_start && c == '[')
        .map(|(i, _)| i)
        .find(|&i| {
            let tail = &text[i..];
            MARKER_TOKENS
                .iter()
                .any(|token| tail.len() <= token.len() && token.starts_with(tail))
        })
        .unwrap_or(text.len())
}
