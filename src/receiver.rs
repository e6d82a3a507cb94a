use crate::decoder::{DecodeChunk, DecodeError, MsgDecoder};
use crate::interface::{ByteRx, Crc32Provider, FrameTimer};
use log::{debug, trace, warn};
use thiserror::Error;

/// Outcome of one [`MsgReceiver::receive_chunk`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStatus {
    /// The per call budget ran out with the frame still incomplete. Call
    /// again.
    Pending,
    /// A whole frame was decoded and verified; fetch it with
    /// [`MsgReceiver::decoded_data`].
    Received,
    /// The frame was rejected (stuffing violation, length mismatch, CRC
    /// mismatch). Arm a new frame to continue.
    BadFrame,
    /// A SOF arrived mid frame; the decoder already restarted, reception
    /// simply continues on the next call.
    FrameRestart,
    /// The overall frame deadline expired first. Repeats until a new frame
    /// is armed.
    Timeout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReceiveError {
    #[error("the receive scratch buffer must hold at least one byte")]
    EmptyIoBuffer,
    #[error("deadlines must be at least 1ms and the chunk time must not exceed the frame timeout")]
    BadTiming,
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("rx callback failed")]
    RxCallback,
    #[error("timer callback failed")]
    TimerCallback,
    #[error("callback broke its contract (bytes over-reported or timer ran backwards)")]
    CorruptCallback,
}

enum RxStep {
    HowManyData,
    CheckBuffer,
    Receive,
    Insert,
    CheckTimeout,
}

/// Reads the line through a user hook into a small scratch buffer and feeds
/// a [`MsgDecoder`], spending at most `time_per_chunk_ms` per call and
/// `frame_timeout_ms` per frame overall.
///
/// With `wait_for_sof` the overall deadline only starts counting once a
/// frame start is seen: while the decoder is still hunting for SOF the
/// timer is re-armed on every pass, so a silent line keeps the receiver in
/// [`ReceiveStatus::Pending`] forever - bounding that wait is the caller's
/// policy.
pub struct MsgReceiver<'a, C, R, M>
where
    C: Crc32Provider,
    R: ByteRx,
    M: FrameTimer,
{
    name: String,
    decoder: MsgDecoder<'a, C>,
    recv_buf: &'a mut [u8],
    fill: usize,
    cntr: usize,
    rx: R,
    timer: M,
    frame_timeout_ms: u32,
    time_per_chunk_ms: u32,
    wait_for_sof: bool,
}

impl<'a, C, R, M> MsgReceiver<'a, C, R, M>
where
    C: Crc32Provider,
    R: ByteRx,
    M: FrameTimer,
{
    /// Bind the working buffer, the receive scratch buffer, the user hooks,
    /// the two deadlines and the wait-for-SOF policy. `msg_buf` must hold
    /// the header plus at least one payload byte, `recv_buf` at least one
    /// byte, and `1 <= time_per_chunk_ms <= frame_timeout_ms`.
    pub fn new(
        name: String,
        msg_buf: &'a mut [u8],
        recv_buf: &'a mut [u8],
        crc: C,
        rx: R,
        timer: M,
        frame_timeout_ms: u32,
        time_per_chunk_ms: u32,
        wait_for_sof: bool,
    ) -> Result<Self, ReceiveError> {
        if recv_buf.is_empty() {
            return Err(ReceiveError::EmptyIoBuffer);
        }
        if frame_timeout_ms < 1 || time_per_chunk_ms < 1 || time_per_chunk_ms > frame_timeout_ms {
            return Err(ReceiveError::BadTiming);
        }
        let decoder = MsgDecoder::new(msg_buf, crc)?;
        Ok(MsgReceiver {
            name,
            decoder,
            recv_buf,
            fill: 0,
            cntr: 0,
            rx,
            timer,
            frame_timeout_ms,
            time_per_chunk_ms,
            wait_for_sof,
        })
    }

    /// Arm reception of the next frame and start the overall deadline.
    /// Scratch bytes received past the previous frame's EOF are kept and
    /// parsed into the new frame, so back to back frames need no gap.
    pub fn new_frame(&mut self) -> Result<(), ReceiveError> {
        self.decoder.new_frame();
        self.timer
            .start(self.frame_timeout_ms)
            .map_err(|_| ReceiveError::TimerCallback)?;
        debug!(target: self.name.as_str(), "new frame armed");
        Ok(())
    }

    /// Like [`new_frame`](MsgReceiver::new_frame) but also discards any
    /// scratch bytes still pending from the line.
    pub fn new_frame_and_clean(&mut self) -> Result<(), ReceiveError> {
        self.fill = 0;
        self.cntr = 0;
        self.new_frame()
    }

    /// The decoded payload of the last received frame, header stripped.
    /// Empty until [`receive_chunk`](MsgReceiver::receive_chunk) reported
    /// [`ReceiveStatus::Received`].
    pub fn decoded_data(&self) -> &[u8] {
        self.decoder.decoded_data()
    }

    /// Length of the decoded payload, 0 until a frame has been received.
    pub fn decoded_len(&self) -> usize {
        self.decoder.decoded_len()
    }

    /// Advance reception by at most `time_per_chunk_ms`. An RX hook that
    /// keeps delivering 0 bytes makes this return
    /// [`ReceiveStatus::Pending`] on the chunk budget and
    /// [`ReceiveStatus::Timeout`] once the frame deadline drains (unless
    /// `wait_for_sof` holds the deadline back, see the type docs).
    pub fn receive_chunk(&mut self) -> Result<ReceiveStatus, ReceiveError> {
        let mut start_remaining = self
            .timer
            .remaining()
            .map_err(|_| ReceiveError::TimerCallback)?;
        let mut session_budget;
        if self.wait_for_sof && self.decoder.is_waiting_sof() {
            // Still hunting for SOF: the overall deadline starts over.
            self.timer
                .start(self.frame_timeout_ms)
                .map_err(|_| ReceiveError::TimerCallback)?;
            start_remaining = self.frame_timeout_ms;
            session_budget = self.time_per_chunk_ms;
        } else if start_remaining == 0 {
            warn!(target: self.name.as_str(), "frame deadline expired");
            return Ok(ReceiveStatus::Timeout);
        } else {
            session_budget = start_remaining.min(self.time_per_chunk_ms);
        }
        let mut session = session_budget;

        let mut status = ReceiveStatus::Pending;
        let mut need = 0;
        let mut step = RxStep::HowManyData;
        loop {
            match step {
                RxStep::HowManyData => {
                    need = self.decoder.most_eff_data_len();
                    if need == 0 {
                        // Frame over: either decoded or latched broken.
                        return if self.decoder.is_msg_decoded() {
                            Ok(ReceiveStatus::Received)
                        } else {
                            warn!(target: self.name.as_str(), "frame rejected");
                            Ok(ReceiveStatus::BadFrame)
                        };
                    }
                    need = need.min(self.recv_buf.len());
                    step = RxStep::CheckBuffer;
                }
                RxStep::CheckBuffer => {
                    if self.cntr < self.fill {
                        step = RxStep::Insert;
                    } else {
                        self.fill = 0;
                        self.cntr = 0;
                        step = RxStep::Receive;
                    }
                }
                RxStep::Receive => {
                    let dest = &mut self.recv_buf[..need];
                    let got = self
                        .rx
                        .receive(dest, session)
                        .map_err(|_| ReceiveError::RxCallback)?;
                    if got > need {
                        warn!(target: self.name.as_str(), "rx hook over-reported: {} of {}", got, need);
                        return Err(ReceiveError::CorruptCallback);
                    }
                    trace!(target: self.name.as_str(), "rxd {} of {} bytes", got, need);
                    self.fill = got;
                    self.cntr = 0;
                    step = RxStep::Insert;
                }
                RxStep::Insert => {
                    if self.cntr < self.fill {
                        let chunk = &self.recv_buf[self.cntr..self.fill];
                        match self.decoder.insert_enc_chunk(chunk) {
                            Ok(DecodeChunk::Pending) => {
                                self.fill = 0;
                                self.cntr = 0;
                                status = ReceiveStatus::Pending;
                            }
                            Ok(DecodeChunk::Decoded(used)) => {
                                self.cntr += used;
                                status = ReceiveStatus::Received;
                            }
                            Ok(DecodeChunk::BadFrame(used)) => {
                                self.cntr += used;
                                status = ReceiveStatus::BadFrame;
                            }
                            Ok(DecodeChunk::Restarted(used)) => {
                                self.cntr += used;
                                status = ReceiveStatus::FrameRestart;
                            }
                            Err(DecodeError::OutOfMem(used)) => {
                                self.cntr += used;
                                warn!(target: self.name.as_str(), "declared length over working buffer");
                                return Err(DecodeError::OutOfMem(used).into());
                            }
                            Err(err) => return Err(err.into()),
                        }
                    } else {
                        // The line had nothing for us, fall through to the
                        // deadline bookkeeping.
                        status = ReceiveStatus::Pending;
                    }
                    step = RxStep::CheckTimeout;
                }
                RxStep::CheckTimeout => {
                    let now_remaining = self
                        .timer
                        .remaining()
                        .map_err(|_| ReceiveError::TimerCallback)?;
                    if now_remaining > start_remaining {
                        warn!(target: self.name.as_str(), "timer ran backwards");
                        return Err(ReceiveError::CorruptCallback);
                    }
                    let elapsed = start_remaining - now_remaining;

                    if self.wait_for_sof && status == ReceiveStatus::FrameRestart {
                        // The restart SOF opens a fresh frame, give it the
                        // full deadline.
                        self.timer
                            .start(self.frame_timeout_ms)
                            .map_err(|_| ReceiveError::TimerCallback)?;
                        return Ok(ReceiveStatus::FrameRestart);
                    }
                    if self.wait_for_sof
                        && self.decoder.is_waiting_sof()
                        && status == ReceiveStatus::Pending
                    {
                        // Still no SOF: hold the overall deadline back, only
                        // the per call budget keeps counting.
                        self.timer
                            .start(self.frame_timeout_ms)
                            .map_err(|_| ReceiveError::TimerCallback)?;
                        start_remaining = self.frame_timeout_ms;
                        if elapsed >= session_budget {
                            return Ok(ReceiveStatus::Pending);
                        }
                        session_budget -= elapsed;
                        session = session_budget;
                        step = RxStep::HowManyData;
                        continue;
                    }

                    if now_remaining == 0 {
                        warn!(target: self.name.as_str(), "frame deadline expired");
                        return Ok(ReceiveStatus::Timeout);
                    }
                    if elapsed >= session_budget {
                        return Ok(status);
                    }
                    session = session_budget - elapsed;
                    match status {
                        ReceiveStatus::Pending => step = RxStep::HowManyData,
                        other => return Ok(other),
                    }
                }
            }
        }
    }
}
