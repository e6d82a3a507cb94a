use crate::interface::Crc32Provider;
use crate::unstuffer::{UnstuffChunk, UnstuffState};
use crate::{CRC_SEED, HEADER_LEN};
use thiserror::Error;

/// Outcome of one [`MsgDecoder::insert_enc_chunk`] feed. Every variant
/// carrying a count reports the encoded bytes consumed, trigger byte
/// included; unconsumed bytes belong to the next frame and must be fed
/// again after [`MsgDecoder::new_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeChunk {
    /// Every byte of `src` was consumed, the frame is not complete yet.
    Pending,
    /// A whole frame was unstuffed and its CRC verified.
    Decoded(usize),
    /// Stuffing violation, length mismatch, zero declared length or CRC
    /// mismatch. Latched until `new_frame`.
    BadFrame(usize),
    /// A SOF arrived mid frame; collected bytes were dropped and parsing
    /// restarted. Not latched, parsing simply continues.
    Restarted(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("the working buffer must hold the header plus at least one payload byte")]
    BufferTooSmall,
    #[error("declared payload length does not fit the working buffer")]
    OutOfMem(usize),
    #[error("crc callback failed")]
    CrcCallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameVerdict {
    Decoded,
    Bad,
    OutOfMem,
    CrcFailed,
}

/// Rebuilds a frame into a caller supplied working buffer, parsing the
/// header on the fly, refusing lengths the buffer cannot hold before a
/// single excess byte is stored, and verifying the CRC at EOF.
pub struct MsgDecoder<'a, C: Crc32Provider> {
    buf: &'a mut [u8],
    unstuff: UnstuffState,
    crc: C,
    /// Declared length parsed and validated for the current frame.
    header_ok: bool,
    /// Terminal verdict; idempotent until `new_frame`.
    verdict: Option<FrameVerdict>,
}

impl<'a, C: Crc32Provider> MsgDecoder<'a, C> {
    pub fn new(buf: &'a mut [u8], crc: C) -> Result<Self, DecodeError> {
        if buf.len() < HEADER_LEN + 1 {
            return Err(DecodeError::BufferTooSmall);
        }
        Ok(MsgDecoder {
            buf,
            unstuff: UnstuffState::new(),
            crc,
            header_ok: false,
            verdict: None,
        })
    }

    /// Drop the current frame, verdict included, and hunt for the next SOF.
    pub fn new_frame(&mut self) {
        self.unstuff.new_frame();
        self.header_ok = false;
        self.verdict = None;
    }

    pub fn is_waiting_sof(&self) -> bool {
        self.unstuff.is_waiting_sof()
    }

    pub fn is_msg_decoded(&self) -> bool {
        self.verdict == Some(FrameVerdict::Decoded)
    }

    pub fn is_frame_bad(&self) -> bool {
        self.verdict == Some(FrameVerdict::Bad)
    }

    /// The decoded payload, header stripped. Empty until a frame has been
    /// fully decoded and verified.
    pub fn decoded_data(&self) -> &[u8] {
        if self.is_msg_decoded() {
            &self.buf[HEADER_LEN..HEADER_LEN + self.declared_len()]
        } else {
            &[]
        }
    }

    /// Length of the decoded payload, 0 until a frame has been decoded.
    pub fn decoded_len(&self) -> usize {
        if self.is_msg_decoded() {
            self.declared_len()
        } else {
            0
        }
    }

    /// Encoded bytes worth feeding next: enough to finish the header (also
    /// while still hunting for SOF), then enough to finish the declared
    /// payload, then 1 for the closing EOF. 0 once the frame is done or
    /// broken.
    pub fn most_eff_data_len(&self) -> usize {
        if self.verdict.is_some() {
            return 0;
        }
        let collected = self.unstuff.len();
        if collected < HEADER_LEN {
            return HEADER_LEN - collected;
        }
        let expected = HEADER_LEN + self.declared_len();
        if collected < expected {
            expected - collected
        } else {
            1
        }
    }

    fn declared_len(&self) -> usize {
        let mut len_le = [0u8; 4];
        len_le.copy_from_slice(&self.buf[4..HEADER_LEN]);
        u32::from_le_bytes(len_le) as usize
    }

    /// Feed encoded bytes. The unstuffer is driven in slices no longer than
    /// the distance to the next decision point, so a corrupted length field
    /// is rejected before any byte it would claim is ingested.
    pub fn insert_enc_chunk(&mut self, src: &[u8]) -> Result<DecodeChunk, DecodeError> {
        match self.verdict {
            Some(FrameVerdict::Decoded) => return Ok(DecodeChunk::Decoded(0)),
            Some(FrameVerdict::Bad) => return Ok(DecodeChunk::BadFrame(0)),
            Some(FrameVerdict::OutOfMem) => return Err(DecodeError::OutOfMem(0)),
            Some(FrameVerdict::CrcFailed) => return Err(DecodeError::CrcCallback),
            None => {}
        }

        let mut used = 0;
        while used < src.len() {
            let budget = self.most_eff_data_len();
            let take = budget.min(src.len() - used);
            match self.unstuff.insert(self.buf, &src[used..used + take]) {
                UnstuffChunk::Pending => used += take,
                UnstuffChunk::Restarted(consumed) => {
                    used += consumed;
                    self.header_ok = false;
                    return Ok(DecodeChunk::Restarted(used));
                }
                UnstuffChunk::Bad(consumed) => {
                    used += consumed;
                    self.verdict = Some(FrameVerdict::Bad);
                    return Ok(DecodeChunk::BadFrame(used));
                }
                UnstuffChunk::OutOfMem(consumed) => {
                    used += consumed;
                    self.verdict = Some(FrameVerdict::OutOfMem);
                    return Err(DecodeError::OutOfMem(used));
                }
                UnstuffChunk::Ended(consumed) => {
                    used += consumed;
                    return self.close_frame(used);
                }
            }

            let collected = self.unstuff.len();
            if !self.header_ok && collected >= HEADER_LEN {
                let declared = self.declared_len();
                if declared == 0 {
                    self.verdict = Some(FrameVerdict::Bad);
                    return Ok(DecodeChunk::BadFrame(used));
                }
                if declared > self.buf.len() - HEADER_LEN {
                    self.verdict = Some(FrameVerdict::OutOfMem);
                    return Err(DecodeError::OutOfMem(used));
                }
                self.header_ok = true;
            }
            if self.header_ok && collected > HEADER_LEN + self.declared_len() {
                // More payload than the header declared.
                self.verdict = Some(FrameVerdict::Bad);
                return Ok(DecodeChunk::BadFrame(used));
            }
        }
        Ok(DecodeChunk::Pending)
    }

    fn close_frame(&mut self, used: usize) -> Result<DecodeChunk, DecodeError> {
        let collected = self.unstuff.len();
        if collected < HEADER_LEN || collected != HEADER_LEN + self.declared_len() {
            self.verdict = Some(FrameVerdict::Bad);
            return Ok(DecodeChunk::BadFrame(used));
        }
        let declared = self.declared_len();
        let computed = match self
            .crc
            .compute(CRC_SEED, &self.buf[4..HEADER_LEN + declared])
        {
            Ok(value) => value,
            Err(_) => {
                self.verdict = Some(FrameVerdict::CrcFailed);
                return Err(DecodeError::CrcCallback);
            }
        };
        let mut crc_le = [0u8; 4];
        crc_le.copy_from_slice(&self.buf[0..4]);
        if computed == u32::from_le_bytes(crc_le) {
            self.verdict = Some(FrameVerdict::Decoded);
            Ok(DecodeChunk::Decoded(used))
        } else {
            self.verdict = Some(FrameVerdict::Bad);
            Ok(DecodeChunk::BadFrame(used))
        }
    }
}
