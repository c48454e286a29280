use tracing::{debug, warn};

/// Highest checksum protocol revision this host understands.
pub const MAX_CHECKSUM_VERSION: u32 = 1;

/// Token appended to `GL_EXTENSIONS` so guests can discover checksum support.
pub const MAX_VERSION_STRING: &str = "ANDROID_EMU_CHECKSUM_HELPER_v1";

const V1_CHECKSUM_BYTES: usize = 8;

/// Per-worker checksum protocol state.
///
/// Version 0 applies no checksum. Version 1 appends 8 bytes to every packet:
/// the little-endian total length of the buffers that made up the packet,
/// followed by a little-endian packet sequence number. Reads and writes keep
/// independent sequence counters.
#[derive(Clone, Debug, Default)]
pub struct ChecksumCalculator {
    version: u32,
    pending_len: u32,
    num_write: u32,
    num_read: u32,
}

impl ChecksumCalculator {
    /// Version 0 state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Active protocol version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Switch to `version`. Unsupported versions leave the current state
    /// untouched and return `false`.
    pub fn set_version(&mut self, version: u32) -> bool {
        if version > MAX_CHECKSUM_VERSION {
            warn!(
                version,
                max = MAX_CHECKSUM_VERSION,
                "guest selected unsupported checksum protocol"
            );
            return false;
        }
        debug!(from = self.version, to = version, "checksum protocol selected");
        *self = Self {
            version,
            ..Self::default()
        };
        true
    }

    /// Trailer bytes per packet for the active version.
    pub fn checksum_byte_size(&self) -> usize {
        match self.version {
            1 => V1_CHECKSUM_BYTES,
            _ => 0,
        }
    }

    /// Account one buffer of the packet currently being checksummed.
    pub fn add_buffer(&mut self, buf: &[u8]) {
        if self.version == 1 {
            let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
            self.pending_len = self.pending_len.wrapping_add(len);
        }
    }

    /// Write the checksum of the pending packet into `out` and start a new one.
    /// Returns `false` if `out` is shorter than [`Self::checksum_byte_size`].
    pub fn write_checksum(&mut self, out: &mut [u8]) -> bool {
        let size = self.checksum_byte_size();
        if out.len() < size {
            return false;
        }
        if self.version == 1 {
            out[..4].copy_from_slice(&self.pending_len.to_le_bytes());
            out[4..8].copy_from_slice(&self.num_write.to_le_bytes());
            self.num_write = self.num_write.wrapping_add(1);
        }
        self.pending_len = 0;
        true
    }

    /// Check `expected` against the pending packet and start a new one.
    pub fn validate(&mut self, expected: &[u8]) -> bool {
        let ok = match self.version {
            1 => {
                let mut want = [0u8; V1_CHECKSUM_BYTES];
                want[..4].copy_from_slice(&self.pending_len.to_le_bytes());
                want[4..].copy_from_slice(&self.num_read.to_le_bytes());
                self.num_read = self.num_read.wrapping_add(1);
                expected == &want[..]
            }
            _ => expected.is_empty(),
        };
        self.pending_len = 0;
        ok
    }
}

#[cfg(test)]
#[path = "../../tests/unit/checksum/calculator.rs"]
mod tests;
