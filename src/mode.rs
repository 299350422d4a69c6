use portable_atomic::{AtomicU32, Ordering};

/// The most recent mode character received from any input. Writers overwrite it whole; the
/// scheduler only ever reads it, once per evaluation.
pub struct CurrentMode(AtomicU32);

impl CurrentMode {
    pub const fn new(mode: char) -> Self {
        Self(AtomicU32::new(mode as u32))
    }

    pub fn get(&self) -> char {
        // Only valid chars are ever stored
        char::from_u32(self.0.load(Ordering::Acquire)).unwrap_or(char::REPLACEMENT_CHARACTER)
    }

    pub fn set(&self, mode: char) {
        self.0.store(mode as u32, Ordering::Release);
    }
}

/// Decode one input byte into a mode character.
///
/// Newlines and bytes that are not a complete single-byte UTF-8 character are ignored.
pub fn mode_from_byte(byte: u8) -> Option<char> {
    match byte {
        b'\n' => None,
        b if b.is_ascii() => Some(b as char),
        _ => None,
    }
}
