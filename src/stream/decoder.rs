//! Incremental UTF-8 decoding.
//!
//! Network chunks can end in the middle of a multi-byte character. The
//! decoder keeps those trailing bytes and prepends them to the next chunk.

/// Replacement for byte sequences that can never become valid UTF-8.
const REPLACEMENT: char = '\u{FFFD}';

/// Stateful UTF-8 decoder carried across chunks of one byte stream.
#[derive(Debug, Clone, Default)]
pub struct Utf8Decoder {
    /// Bytes of an incomplete trailing sequence from the previous chunk
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Creates a decoder with no carried-over bytes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a chunk, holding back an incomplete trailing sequence.
    ///
    /// Invalid sequences in the middle of the input decode to U+FFFD.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(chunk);

        let mut out = String::with_capacity(input.len());
        let mut rest = input.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));

                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated sequence at the end: wait for more bytes.
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flushes the decoder at end of stream.
    ///
    /// A sequence still incomplete here can never be completed and becomes U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        REPLACEMENT.to_string()
    }

    /// Returns the number of bytes held back for the next chunk.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
