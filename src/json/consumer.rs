//! Destinations for emitted JSON text.

/// Receives JSON text in fragments.
///
/// Fragments are valid UTF-8 and arrive in document order. `terminate` is
/// called once, after the last fragment.
pub trait JsonConsumer {
    fn consume(&mut self, text: &[u8]);

    fn terminate(&mut self);
}

/// Counts bytes instead of storing them.
///
/// `terminate` counts one more byte for the terminator, so `len()` after a
/// finished document is the buffer size a `JsonPrinter` needs to hold it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonLengthCounter {
    len: usize,
}

impl JsonLengthCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl JsonConsumer for JsonLengthCounter {
    fn consume(&mut self, text: &[u8]) {
        self.len += text.len();
    }

    fn terminate(&mut self) {
        self.len += 1;
    }
}

/// Prints into a caller-owned buffer that never grows.
///
/// The last byte of the buffer is kept for the NUL written by `terminate`.
/// Text past that point is dropped and `overflowed()` turns true.
#[derive(Debug)]
pub struct JsonPrinter<'a> {
    buffer: &'a mut [u8],
    written: usize,
    overflowed: bool,
}

impl<'a> JsonPrinter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            written: 0,
            overflowed: false,
        }
    }

    /// Bytes of text stored, terminator excluded.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// The stored text, terminator excluded. After an overflow this may end
    /// inside a multi-byte character.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..self.written]
    }

    fn text_capacity(&self) -> usize {
        self.buffer.len().saturating_sub(1)
    }
}

impl JsonConsumer for JsonPrinter<'_> {
    fn consume(&mut self, text: &[u8]) {
        let room = self.text_capacity() - self.written;
        let take = text.len().min(room);
        self.buffer[self.written..self.written + take].copy_from_slice(&text[..take]);
        self.written += take;
        if take < text.len() {
            self.overflowed = true;
        }
    }

    fn terminate(&mut self) {
        if let Some(slot) = self.buffer.get_mut(self.written) {
            *slot = 0;
        }
    }
}

impl JsonConsumer for Vec<u8> {
    fn consume(&mut self, text: &[u8]) {
        self.extend_from_slice(text);
    }

    fn terminate(&mut self) {}
}

impl JsonConsumer for String {
    fn consume(&mut self, text: &[u8]) {
        self.push_str(&String::from_utf8_lossy(text));
    }

    fn terminate(&mut self) {}
}
