use crate::interface::Crc32Provider;
use crate::stuffer::{StuffChunk, StuffState};
use crate::{CRC_SEED, HEADER_LEN};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("the working buffer must hold the header plus at least one payload byte")]
    BufferTooSmall,
    #[error("payload length must be between 1 and the working buffer capacity minus the header")]
    BadPayloadLen,
    #[error("no message armed, call new_message first")]
    NoMessage,
    #[error("crc callback failed")]
    CrcCallback,
}

/// Wraps a payload with the `[crc32 le][len le]` header and streams the
/// whole thing out through the byte stuffer.
///
/// The caller writes the payload in place through [`payload_mut`] and then
/// arms the frame with [`new_message`]; header, CRC input and stuffer all
/// share the same working buffer, so nothing is copied.
///
/// [`payload_mut`]: MsgEncoder::payload_mut
/// [`new_message`]: MsgEncoder::new_message
pub struct MsgEncoder<'a, C: Crc32Provider> {
    buf: &'a mut [u8],
    /// Payload length of the armed message, 0 when no message is armed.
    msg_len: usize,
    stuff: StuffState,
    crc: C,
}

impl<'a, C: Crc32Provider> MsgEncoder<'a, C> {
    pub fn new(buf: &'a mut [u8], crc: C) -> Result<Self, EncodeError> {
        if buf.len() < HEADER_LEN + 1 {
            return Err(EncodeError::BufferTooSmall);
        }
        Ok(MsgEncoder {
            buf,
            msg_len: 0,
            stuff: StuffState::new(),
            crc,
        })
    }

    /// Largest payload this encoder can frame.
    pub fn max_payload_len(&self) -> usize {
        self.buf.len() - HEADER_LEN
    }

    /// The payload slot of the working buffer. Fill it, then call
    /// [`new_message`](MsgEncoder::new_message) with the length used.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buf[HEADER_LEN..]
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.msg_len != 0
    }

    /// Seal the header over the payload already present in the working
    /// buffer and arm the stuffer. On a CRC hook failure the encoder is
    /// left unarmed.
    pub fn new_message(&mut self, len: usize) -> Result<(), EncodeError> {
        if len == 0 || len > self.buf.len() - HEADER_LEN {
            return Err(EncodeError::BadPayloadLen);
        }
        self.msg_len = 0;
        self.buf[4..HEADER_LEN].copy_from_slice(&(len as u32).to_le_bytes());
        let crc = self
            .crc
            .compute(CRC_SEED, &self.buf[4..HEADER_LEN + len])
            .map_err(|_| EncodeError::CrcCallback)?;
        self.buf[0..4].copy_from_slice(&crc.to_le_bytes());
        self.msg_len = len;
        self.stuff.restart();
        Ok(())
    }

    /// Rewind the armed message so the same frame is emitted again, without
    /// recomputing the CRC.
    pub fn restart_message(&mut self) -> Result<(), EncodeError> {
        if self.msg_len == 0 {
            return Err(EncodeError::NoMessage);
        }
        self.stuff.restart();
        Ok(())
    }

    /// Pull the next slice of the encoded frame into `dest`.
    pub fn get_enc_chunk(&mut self, dest: &mut [u8]) -> Result<StuffChunk, EncodeError> {
        if self.msg_len == 0 {
            return Err(EncodeError::NoMessage);
        }
        let frame = &self.buf[..HEADER_LEN + self.msg_len];
        Ok(self.stuff.next_chunk(frame, dest))
    }

    /// Exact number of encoded bytes still to be pulled for the armed
    /// message, 0 when none is armed.
    pub fn remaining_enc_len(&self) -> usize {
        if self.msg_len == 0 {
            return 0;
        }
        self.stuff.remaining_len(&self.buf[..HEADER_LEN + self.msg_len])
    }
}
