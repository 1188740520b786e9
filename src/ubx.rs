use crate::RelayError;

/// First preamble byte of every UBX message
pub const SYNC_CHAR_1: u8 = 0xb5;
/// Second preamble byte of every UBX message
pub const SYNC_CHAR_2: u8 = 0x62;
/// Bytes surrounding the payload: preamble, class, id, length and checksum
pub const FRAME_OVERHEAD: usize = 8;

/// Running 8-bit Fletcher checksum over class, id, length and payload
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct UbxChecksum(pub u8, pub u8);

impl UbxChecksum {
    /// Empty checksum
    pub fn new() -> Self {
        Self(0, 0)
    }

    /// Fold one more byte into the checksum
    pub fn next(self, byte: u8) -> Self {
        let Self(a, b) = self;
        let a = a.wrapping_add(byte);
        Self(a, b.wrapping_add(a))
    }

    /// Checksum over a whole byte sequence
    pub fn over(bytes: &[u8]) -> Self {
        bytes.iter().fold(Self::new(), |ck, &b| ck.next(b))
    }
}

impl PartialEq<(u8, u8)> for UbxChecksum {
    fn eq(&self, (other_a, other_b): &(u8, u8)) -> bool {
        let Self(a, b) = self;
        a == other_a && b == other_b
    }
}

/// A UBX message before encoding.
///
/// The preamble, length field and checksum are derived from the other
/// fields by [`UbxFrame::to_bytes`], so a frame can never carry a stale
/// checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UbxFrame {
    /// Message class
    pub class: u8,
    /// Message id within the class
    pub id: u8,
    /// Message body
    pub payload: Vec<u8>,
}

impl UbxFrame {
    /// Build a frame from its class, id and payload
    pub fn new(class: u8, id: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            class,
            id,
            payload: payload.into(),
        }
    }

    /// Total encoded length in bytes
    pub fn encoded_len(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// Checksum covering class, id, length and payload
    pub fn checksum(&self) -> UbxChecksum {
        let len = (self.payload.len() as u16).to_le_bytes();
        [self.class, self.id, len[0], len[1]]
            .iter()
            .chain(self.payload.iter())
            .fold(UbxChecksum::new(), |ck, &b| ck.next(b))
    }

    /// Encode to the wire format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        let len = (self.payload.len() as u16).to_le_bytes();
        out.extend_from_slice(&[SYNC_CHAR_1, SYNC_CHAR_2, self.class, self.id, len[0], len[1]]);
        out.extend_from_slice(&self.payload);
        let UbxChecksum(ck_a, ck_b) = self.checksum();
        out.push(ck_a);
        out.push(ck_b);
        out
    }

    /// Decode a pre-encoded frame, checking it against its declared length.
    ///
    /// Rejects literals whose byte count differs from `declared_len`, whose
    /// preamble or length field is wrong, or whose trailing checksum does
    /// not match the content.
    pub fn from_literal(bytes: &[u8], declared_len: usize) -> Result<Self, RelayError> {
        if bytes.len() != declared_len {
            return Err(RelayError::InvalidFrame(format!(
                "declared {} bytes, literal has {}",
                declared_len,
                bytes.len()
            )));
        }
        if bytes.len() < FRAME_OVERHEAD {
            return Err(RelayError::InvalidFrame(format!(
                "{} bytes is shorter than a UBX header",
                bytes.len()
            )));
        }
        if bytes[0] != SYNC_CHAR_1 || bytes[1] != SYNC_CHAR_2 {
            return Err(RelayError::InvalidFrame(format!(
                "bad preamble {:02X} {:02X}",
                bytes[0], bytes[1]
            )));
        }
        let payload_len = u16::from_le_bytes([bytes[4], bytes[5]]) as usize;
        if payload_len + FRAME_OVERHEAD != bytes.len() {
            return Err(RelayError::InvalidFrame(format!(
                "length field says {} payload bytes, frame carries {}",
                payload_len,
                bytes.len() - FRAME_OVERHEAD
            )));
        }
        let frame = Self::new(bytes[2], bytes[3], &bytes[6..6 + payload_len]);
        let expect = frame.checksum();
        let saw = (bytes[bytes.len() - 2], bytes[bytes.len() - 1]);
        if expect != saw {
            log::warn!(
                "Checksum mismatch for class {:02X} id {:02X}: expected {:02X} {:02X}, saw {:02X} {:02X}",
                frame.class,
                frame.id,
                expect.0,
                expect.1,
                saw.0,
                saw.1
            );
            return Err(RelayError::InvalidFrame(format!(
                "checksum {:02X} {:02X} should be {:02X} {:02X}",
                saw.0, saw.1, expect.0, expect.1
            )));
        }
        Ok(frame)
    }
}
