//! Bounded views over the fixed-width fields of a ROM header.
//!
//! Both the game code and the title are copied out of a header where they are
//! not NUL-terminated, so nothing here ever reads past the field width.

use std::borrow::Cow;
use std::ffi::OsString;
use std::fmt;

pub const GAME_ID_LEN: usize = 4;
pub const GAME_TITLE_LEN: usize = 20;

/// Four-byte game code, the key of a game's catalog directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GameId([u8; GAME_ID_LEN]);

impl GameId {
    /// Copies at most four bytes from `raw`, padding shorter input with NUL.
    pub fn from_bytes(raw: &[u8]) -> Self {
        let mut code = [0u8; GAME_ID_LEN];
        let len = raw.len().min(GAME_ID_LEN);
        code[..len].copy_from_slice(&raw[..len]);
        Self(code)
    }

    pub fn as_bytes(&self) -> &[u8; GAME_ID_LEN] {
        &self.0
    }

    /// The code for display and logs. Bytes that are not UTF-8 show as U+FFFD,
    /// so two codes can look alike here; use [`GameId::path_component`] as a key.
    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(until_nul(&self.0))
    }

    /// The code as a directory name, byte for byte up to the first NUL.
    #[cfg(unix)]
    pub fn path_component(&self) -> OsString {
        use std::os::unix::ffi::OsStrExt;

        std::ffi::OsStr::from_bytes(until_nul(&self.0)).to_os_string()
    }

    /// The code as a directory name. Printable ASCII is kept and every other
    /// byte, and `%` itself, is written as `%XX`, so distinct codes never share
    /// a name.
    #[cfg(not(unix))]
    pub fn path_component(&self) -> OsString {
        let mut name = String::new();
        for byte in until_nul(&self.0).iter().copied() {
            let plain = (byte.is_ascii_graphic() || byte == b' ')
                && !matches!(byte, b'%' | b'/' | b'\\');
            if plain {
                name.push(byte as char);
            } else {
                name.push_str(&format!("%{byte:02X}"));
            }
        }
        name.into()
    }
}

impl From<&str> for GameId {
    fn from(value: &str) -> Self {
        Self::from_bytes(value.as_bytes())
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// The title bytes of a fixed-width header field: at most twenty, stopping at NUL.
pub fn title_bytes(raw: &[u8]) -> &[u8] {
    until_nul(&raw[..raw.len().min(GAME_TITLE_LEN)])
}

pub(crate) fn until_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_only_four_bytes_of_unterminated_code() {
        let header = b"NSMEextra bytes that are not part of the code";
        let id = GameId::from_bytes(header);
        assert_eq!(id.as_bytes(), b"NSME");
        assert_eq!(id.to_string(), "NSME");
    }

    #[test]
    fn short_code_is_padded() {
        let id = GameId::from("AB");
        assert_eq!(id.as_bytes(), b"AB\0\0");
        assert_eq!(id.as_str(), "AB");
    }

    #[test]
    fn code_is_case_and_byte_exact() {
        assert_ne!(GameId::from("nsme"), GameId::from("NSME"));
    }

    #[test]
    fn codes_differing_in_a_high_byte_keep_distinct_directories() {
        let first = GameId::from_bytes(&[b'N', 0xFE, b'M', b'E']);
        let second = GameId::from_bytes(&[b'N', 0xFF, b'M', b'E']);

        assert_eq!(first.as_str(), second.as_str());
        assert_ne!(first.path_component(), second.path_component());
        assert_eq!(GameId::from("NSME").path_component(), "NSME");
    }

    #[test]
    fn title_stops_at_field_width_or_nul() {
        assert_eq!(title_bytes(b"SUPER MARIO 64      trailing"), b"SUPER MARIO 64      ");
        assert_eq!(title_bytes(b"ZELDA\0garbage"), b"ZELDA");
        assert_eq!(title_bytes(b""), b"");
    }
}
