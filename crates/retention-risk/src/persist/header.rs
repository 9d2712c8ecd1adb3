//! Fixed-size header of the native model format.

use crate::error::ArtifactError;

/// Magic bytes identifying a retention model file.
pub const MAGIC: &[u8; 4] = b"RRSK";

pub const CURRENT_VERSION_MAJOR: u8 = 1;
pub const CURRENT_VERSION_MINOR: u8 = 0;

/// Size of the format header in bytes.
pub const HEADER_SIZE: usize = 24;

// ============================================================================
// Format Flags
// ============================================================================

/// Bitfield flags describing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatFlags(u16);

impl FormatFlags {
    /// The model records the last training snapshot date.
    pub const HAS_TRAINING_CUTOFF: u16 = 1 << 0;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, flag: u16) -> bool {
        (self.0 & flag) != 0
    }

    pub fn set(&mut self, flag: u16) {
        self.0 |= flag;
    }
}

// ============================================================================
// Format Header
// ============================================================================

/// 24-byte header.
///
/// # Layout
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     Magic ("RRSK")
/// 4       1     Version major
/// 5       1     Version minor
/// 6       2     Flags (bitfield)
/// 8       4     Payload size (bytes)
/// 12      4     CRC32 checksum of payload
/// 16      4     Number of features
/// 20      4     Reserved
/// ```
///
/// Multi-byte fields are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHeader {
    pub version_major: u8,
    pub version_minor: u8,
    pub flags: FormatFlags,
    pub payload_size: u32,
    pub checksum: u32,
    pub num_features: u32,
}

impl FormatHeader {
    /// Header for the current version; size and checksum are filled in by the writer.
    pub fn new(num_features: u32, flags: FormatFlags) -> Self {
        Self {
            version_major: CURRENT_VERSION_MAJOR,
            version_minor: CURRENT_VERSION_MINOR,
            flags,
            payload_size: 0,
            checksum: 0,
            num_features,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(MAGIC);
        buf[4] = self.version_major;
        buf[5] = self.version_minor;
        buf[6..8].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[8..12].copy_from_slice(&self.payload_size.to_le_bytes());
        buf[12..16].copy_from_slice(&self.checksum.to_le_bytes());
        buf[16..20].copy_from_slice(&self.num_features.to_le_bytes());
        buf
    }

    /// Parse and check magic and version. Does not verify the checksum.
    pub fn from_bytes(buf: &[u8; HEADER_SIZE]) -> Result<Self, ArtifactError> {
        if &buf[0..4] != MAGIC {
            return Err(ArtifactError::NotAModel);
        }
        let (version_major, version_minor) = (buf[4], buf[5]);
        if version_major != CURRENT_VERSION_MAJOR {
            return Err(ArtifactError::UnsupportedVersion {
                major: version_major,
                minor: version_minor,
            });
        }
        let u32_at = |i: usize| u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
        Ok(Self {
            version_major,
            version_minor,
            flags: FormatFlags::from_bits(u16::from_le_bytes([buf[6], buf[7]])),
            payload_size: u32_at(8),
            checksum: u32_at(12),
            num_features: u32_at(16),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let mut flags = FormatFlags::empty();
        flags.set(FormatFlags::HAS_TRAINING_CUTOFF);
        let header = FormatHeader {
            payload_size: 1234,
            checksum: 0xDEAD_BEEF,
            ..FormatHeader::new(8, flags)
        };
        let bytes = header.to_bytes();

        assert_eq!(&bytes[0..4], b"RRSK");
        assert_eq!(bytes[4], CURRENT_VERSION_MAJOR);
        assert_eq!(&bytes[12..16], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(&bytes[20..24], &[0, 0, 0, 0]);
        assert_eq!(FormatHeader::from_bytes(&bytes).unwrap(), header);
    }

    #[test]
    fn rejects_foreign_and_future_files() {
        let mut bytes = FormatHeader::new(8, FormatFlags::empty()).to_bytes();
        bytes[4] = CURRENT_VERSION_MAJOR + 1;
        assert!(matches!(
            FormatHeader::from_bytes(&bytes),
            Err(ArtifactError::UnsupportedVersion { .. })
        ));
        bytes[0] = b'X';
        assert!(matches!(FormatHeader::from_bytes(&bytes), Err(ArtifactError::NotAModel)));
    }
}
