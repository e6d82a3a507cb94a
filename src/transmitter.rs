use crate::encoder::{EncodeError, MsgEncoder};
use crate::interface::{ByteTx, Crc32Provider, FrameTimer};
use crate::stuffer::StuffChunk;
use log::{debug, trace, warn};
use thiserror::Error;

/// Outcome of one [`MsgTransmitter::send_chunk`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The per call budget ran out with encoded bytes still to ship. Call
    /// again.
    Pending,
    /// The whole frame was handed to the line.
    Sent,
    /// The overall frame deadline expired first. Repeats until a new
    /// message is armed.
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("the send scratch buffer must hold at least one byte")]
    EmptyIoBuffer,
    #[error("deadlines must be at least 1ms and the chunk time must not exceed the frame timeout")]
    BadTiming,
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("tx callback failed")]
    TxCallback,
    #[error("timer callback failed")]
    TimerCallback,
    #[error("callback broke its contract (bytes over-reported or timer ran backwards)")]
    CorruptCallback,
}

enum TxStep {
    CheckBuffer,
    Retrieve,
    Send,
    CheckTimeout,
}

/// Pulls encoded bytes from a [`MsgEncoder`] into a small scratch buffer
/// and hands them to the line, spending at most `time_per_chunk_ms` of wall
/// clock per call and `frame_timeout_ms` per frame overall.
pub struct MsgTransmitter<'a, C, T, M>
where
    C: Crc32Provider,
    T: ByteTx,
    M: FrameTimer,
{
    name: String,
    encoder: MsgEncoder<'a, C>,
    send_buf: &'a mut [u8],
    fill: usize,
    cntr: usize,
    tx: T,
    timer: M,
    frame_timeout_ms: u32,
    time_per_chunk_ms: u32,
}

impl<'a, C, T, M> MsgTransmitter<'a, C, T, M>
where
    C: Crc32Provider,
    T: ByteTx,
    M: FrameTimer,
{
    /// Bind the working buffer, the send scratch buffer, the user hooks and
    /// the two deadlines. `msg_buf` must hold the header plus at least one
    /// payload byte, `send_buf` at least one byte, and
    /// `1 <= time_per_chunk_ms <= frame_timeout_ms`.
    pub fn new(
        name: String,
        msg_buf: &'a mut [u8],
        send_buf: &'a mut [u8],
        crc: C,
        tx: T,
        timer: M,
        frame_timeout_ms: u32,
        time_per_chunk_ms: u32,
    ) -> Result<Self, SendError> {
        if send_buf.is_empty() {
            return Err(SendError::EmptyIoBuffer);
        }
        if frame_timeout_ms < 1 || time_per_chunk_ms < 1 || time_per_chunk_ms > frame_timeout_ms {
            return Err(SendError::BadTiming);
        }
        let encoder = MsgEncoder::new(msg_buf, crc)?;
        Ok(MsgTransmitter {
            name,
            encoder,
            send_buf,
            fill: 0,
            cntr: 0,
            tx,
            timer,
            frame_timeout_ms,
            time_per_chunk_ms,
        })
    }

    /// Largest payload this transmitter can frame.
    pub fn max_payload_len(&self) -> usize {
        self.encoder.max_payload_len()
    }

    /// The payload slot of the working buffer. Fill it, then call
    /// [`new_message`](MsgTransmitter::new_message) with the length used.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        self.encoder.payload_mut()
    }

    /// Seal and arm a frame over the payload already written into the
    /// working buffer, and start the overall deadline.
    pub fn new_message(&mut self, len: usize) -> Result<(), SendError> {
        self.fill = 0;
        self.cntr = 0;
        self.encoder.new_message(len)?;
        self.timer
            .start(self.frame_timeout_ms)
            .map_err(|_| SendError::TimerCallback)?;
        debug!(target: self.name.as_str(), "message armed: payload len={}", len);
        Ok(())
    }

    /// Rewind the armed frame and restart the overall deadline; the CRC is
    /// not recomputed.
    pub fn restart_message(&mut self) -> Result<(), SendError> {
        self.fill = 0;
        self.cntr = 0;
        self.encoder.restart_message()?;
        self.timer
            .start(self.frame_timeout_ms)
            .map_err(|_| SendError::TimerCallback)?;
        debug!(target: self.name.as_str(), "message restarted");
        Ok(())
    }

    /// Advance the transmission by at most `time_per_chunk_ms`. A line that
    /// keeps accepting 0 bytes makes this return [`SendStatus::Pending`] on
    /// the chunk budget and [`SendStatus::Timeout`] once the frame deadline
    /// drains.
    pub fn send_chunk(&mut self) -> Result<SendStatus, SendError> {
        if !self.encoder.is_armed() {
            return Err(EncodeError::NoMessage.into());
        }

        let start_remaining = self
            .timer
            .remaining()
            .map_err(|_| SendError::TimerCallback)?;
        if start_remaining == 0 {
            warn!(target: self.name.as_str(), "frame deadline expired");
            return Ok(SendStatus::Timeout);
        }
        let mut session = start_remaining.min(self.time_per_chunk_ms);

        let mut step = TxStep::CheckBuffer;
        loop {
            match step {
                TxStep::CheckBuffer => {
                    if self.cntr < self.fill {
                        step = TxStep::Send;
                    } else {
                        self.fill = 0;
                        self.cntr = 0;
                        step = TxStep::Retrieve;
                    }
                }
                TxStep::Retrieve => {
                    match self.encoder.get_enc_chunk(self.send_buf)? {
                        StuffChunk::Filled(filled) => {
                            self.fill = filled;
                            step = TxStep::Send;
                        }
                        StuffChunk::Ended(filled) => {
                            if filled == 0 {
                                trace!(target: self.name.as_str(), "frame fully sent");
                                return Ok(SendStatus::Sent);
                            }
                            self.fill = filled;
                            step = TxStep::Send;
                        }
                    }
                }
                TxStep::Send => {
                    let data = &self.send_buf[self.cntr..self.fill];
                    let sent = self
                        .tx
                        .send(data, session)
                        .map_err(|_| SendError::TxCallback)?;
                    if sent > data.len() {
                        warn!(target: self.name.as_str(), "tx hook over-reported: {} of {}", sent, data.len());
                        return Err(SendError::CorruptCallback);
                    }
                    trace!(target: self.name.as_str(), "txd {} of {} bytes", sent, data.len());
                    self.cntr += sent;
                    step = TxStep::CheckTimeout;
                }
                TxStep::CheckTimeout => {
                    let now_remaining = self
                        .timer
                        .remaining()
                        .map_err(|_| SendError::TimerCallback)?;
                    if now_remaining > start_remaining {
                        warn!(target: self.name.as_str(), "timer ran backwards");
                        return Err(SendError::CorruptCallback);
                    }
                    if now_remaining == 0 {
                        warn!(target: self.name.as_str(), "frame deadline expired");
                        return Ok(SendStatus::Timeout);
                    }
                    if start_remaining >= self.time_per_chunk_ms {
                        let elapsed = start_remaining - now_remaining;
                        if elapsed >= self.time_per_chunk_ms {
                            return Ok(SendStatus::Pending);
                        }
                        session = self.time_per_chunk_ms - elapsed;
                    } else {
                        // The call started with less than a full slice, the
                        // frame deadline is the only bound left.
                        session = now_remaining;
                    }
                    step = TxStep::CheckBuffer;
                }
            }
        }
    }
}
