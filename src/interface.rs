use thiserror::Error;

/// Returned by every user hook to signal failure. The stack never retries:
/// the failure is mapped to the calling layer's error and surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("user callback failed")]
pub struct CallbackError;

/// CRC-32 engine used to seal and verify frame headers.
///
/// The implementation must match the peer's variant; the frame format uses
/// the normal form polynomial `0x04C11DB7` without reflection or final XOR
/// (see [`SoftCrc32`](crate::SoftCrc32) for a software implementation).
pub trait Crc32Provider {
    /// Compute the CRC-32 of `data` starting from `seed`.
    fn compute(&mut self, seed: u32, data: &[u8]) -> Result<u32, CallbackError>;
}

/// Outgoing half of the byte line.
pub trait ByteTx {
    /// Push up to `data.len()` bytes to the line, blocking at most
    /// `max_time_ms`. Returns how many bytes the line accepted; reporting
    /// more than it was offered is treated as a corrupted hook.
    fn send(&mut self, data: &[u8], max_time_ms: u32) -> Result<usize, CallbackError>;
}

/// Incoming half of the byte line.
pub trait ByteRx {
    /// Read up to `dest.len()` bytes from the line, blocking at most
    /// `max_time_ms`. Returns how many bytes were placed at the start of
    /// `dest`; reporting more than requested is treated as a corrupted hook.
    fn receive(&mut self, dest: &mut [u8], max_time_ms: u32) -> Result<usize, CallbackError>;
}

/// One shot millisecond down-counter.
pub trait FrameTimer {
    /// Arm the counter with `timeout_ms`.
    fn start(&mut self, timeout_ms: u32) -> Result<(), CallbackError>;
    /// Milliseconds left before expiry. Must be monotonically non increasing
    /// between two `start` calls; running backwards is treated as a
    /// corrupted hook.
    fn remaining(&mut self) -> Result<u32, CallbackError>;
}
