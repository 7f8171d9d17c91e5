use crate::errors::JournalError;

/// Ledger journal magic bytes: `b"SPL1"`.
pub const MAGIC: &[u8; 4] = b"SPL1";

/// Current journal format version.
pub const VERSION: u16 = 0x0001;

/// File header size in bytes.
pub const HEADER_SIZE: usize = 16;

/// Frame header size in bytes.
pub const FRAME_HEADER_SIZE: usize = 8;

/// Maximum payload size of a single frame: 16 MiB.
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Frame kind byte for a ledger entry.
pub const FRAME_KIND_ENTRY_JSON: u8 = 0x01;

/// File header: magic, version, flags, then reserved zeros.
///
/// ```text
/// 0..4   magic "SPL1"
/// 4..6   version (u16 LE)
/// 6..8   flags (u16 LE, must be 0)
/// 8..16  reserved (must be 0)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalHeader {
    /// Format version.
    pub version: u16,
}

impl Default for JournalHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl JournalHeader {
    /// Header for the current format version.
    pub fn new() -> Self {
        Self { version: VERSION }
    }

    /// Encodes the header.
    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(MAGIC);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes
    }

    /// Decodes and validates a header.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, JournalError> {
        let invalid = |reason: String| JournalError::InvalidHeader(reason);

        if bytes.len() < HEADER_SIZE {
            return Err(invalid(format!("header too short: {} bytes", bytes.len())));
        }
        if &bytes[0..4] != MAGIC {
            return Err(invalid(format!(
                "invalid magic: {:?}, expected {:?}",
                &bytes[0..4],
                MAGIC
            )));
        }
        let version = u16::from_le_bytes([bytes[4], bytes[5]]);
        if version != VERSION {
            return Err(invalid(format!(
                "unsupported version: 0x{:04x}, expected 0x{:04x}",
                version, VERSION
            )));
        }
        let flags = u16::from_le_bytes([bytes[6], bytes[7]]);
        if flags != 0 {
            return Err(invalid(format!("non-zero flags: 0x{:04x}", flags)));
        }
        if bytes[8..HEADER_SIZE].iter().any(|b| *b != 0) {
            return Err(invalid("non-zero reserved bytes".to_string()));
        }
        Ok(Self { version })
    }
}

/// Record frame kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// UTF-8 JSON object holding one ledger entry.
    EntryJson,
    /// Kind this build does not understand; readers skip it.
    Unknown(u8),
}

impl FrameKind {
    /// Decodes a kind byte.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            FRAME_KIND_ENTRY_JSON => FrameKind::EntryJson,
            other => FrameKind::Unknown(other),
        }
    }

    /// Encodes this kind.
    pub fn to_byte(self) -> u8 {
        match self {
            FrameKind::EntryJson => FRAME_KIND_ENTRY_JSON,
            FrameKind::Unknown(b) => b,
        }
    }
}

/// Frame header preceding every payload.
///
/// ```text
/// 0      kind
/// 1..4   reserved (must be 0)
/// 4..8   payload length (u32 LE)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFrame {
    /// Frame kind.
    pub kind: FrameKind,
    /// Payload length in bytes.
    pub len: u32,
}

impl RecordFrame {
    /// Creates a frame header, enforcing the payload limit.
    pub fn new(kind: FrameKind, len: u32) -> Result<Self, JournalError> {
        if len > MAX_PAYLOAD_SIZE {
            return Err(JournalError::PayloadTooLarge {
                size: u64::from(len),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Self { kind, len })
    }

    /// Encodes the frame header.
    pub fn to_bytes(self) -> [u8; FRAME_HEADER_SIZE] {
        let mut bytes = [0u8; FRAME_HEADER_SIZE];
        bytes[0] = self.kind.to_byte();
        bytes[4..8].copy_from_slice(&self.len.to_le_bytes());
        bytes
    }

    /// Decodes a frame header that starts at byte `offset` of the file.
    pub fn from_bytes(bytes: &[u8], offset: u64) -> Result<Self, JournalError> {
        let invalid = |reason: String| JournalError::InvalidFrame { offset, reason };

        if bytes.len() < FRAME_HEADER_SIZE {
            return Err(invalid(format!(
                "frame header too short: {} bytes",
                bytes.len()
            )));
        }
        if bytes[1..4].iter().any(|b| *b != 0) {
            return Err(invalid("non-zero reserved bytes".to_string()));
        }
        let len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if len > MAX_PAYLOAD_SIZE {
            return Err(invalid(format!(
                "payload size {} exceeds maximum {}",
                len, MAX_PAYLOAD_SIZE
            )));
        }
        Ok(Self {
            kind: FrameKind::from_byte(bytes[0]),
            len,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_bytes_start_with_magic() {
        let bytes = JournalHeader::new().to_bytes();
        assert_eq!(&bytes[0..4], b"SPL1");
        assert_eq!(JournalHeader::from_bytes(&bytes).unwrap(), JournalHeader::new());
    }

    #[test]
    fn header_rejects_invalid_magic() {
        let mut bytes = JournalHeader::new().to_bytes();
        bytes[0] = b'X';
        assert!(JournalHeader::from_bytes(&bytes).is_err());
    }

    #[test]
    fn header_rejects_invalid_version() {
        let mut bytes = JournalHeader::new().to_bytes();
        bytes[4] = 0x02;
        let err = JournalHeader::from_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("version"));
    }

    #[test]
    fn header_rejects_flags_and_reserved() {
        let mut flagged = JournalHeader::new().to_bytes();
        flagged[6] = 0x01;
        assert!(JournalHeader::from_bytes(&flagged).is_err());

        let mut reserved = JournalHeader::new().to_bytes();
        reserved[15] = 0x01;
        assert!(JournalHeader::from_bytes(&reserved).is_err());
    }

    #[test]
    fn frame_length_is_little_endian() {
        let bytes = RecordFrame::new(FrameKind::EntryJson, 0x0102).unwrap().to_bytes();
        assert_eq!(bytes, [0x01, 0, 0, 0, 0x02, 0x01, 0, 0]);
    }

    #[test]
    fn frame_rejects_oversized_payload() {
        match RecordFrame::new(FrameKind::EntryJson, MAX_PAYLOAD_SIZE + 1) {
            Err(JournalError::PayloadTooLarge { size, max }) => {
                assert_eq!(size, u64::from(MAX_PAYLOAD_SIZE) + 1);
                assert_eq!(max, MAX_PAYLOAD_SIZE);
            }
            other => panic!("expected PayloadTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn frame_error_carries_offset() {
        let mut bytes = RecordFrame::new(FrameKind::EntryJson, 10).unwrap().to_bytes();
        bytes[2] = 0x01;
        match RecordFrame::from_bytes(&bytes, 4096) {
            Err(JournalError::InvalidFrame { offset, .. }) => assert_eq!(offset, 4096),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn unknown_kind_keeps_its_byte() {
        assert_eq!(FrameKind::from_byte(0xFF).to_byte(), 0xFF);
    }
}
