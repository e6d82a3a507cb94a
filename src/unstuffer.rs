use crate::{EOF_BYTE, ESC_BYTE, ESC_XOR, SOF_BYTE};
use thiserror::Error;

/// Outcome of one [`ByteUnstuffer::insert_chunk`] feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnstuffChunk {
    /// Every byte of `src` was consumed and the frame is still open.
    Pending,
    /// Closing EOF seen; the destination holds a complete frame. The count
    /// is the bytes consumed, EOF included.
    Ended(usize),
    /// Stuffing rule violated (EOF on an empty frame, ESC before EOF or
    /// ESC). The count includes the offending byte.
    Bad(usize),
    /// A SOF arrived mid frame: previously unstuffed bytes were dropped and
    /// the frame starts over. The count includes the SOF.
    Restarted(usize),
    /// The destination is full and a data byte arrived. The offending byte
    /// was not consumed and will trigger again on the next feed.
    OutOfMem(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnstuffError {
    #[error("the destination buffer must hold at least one byte")]
    EmptyBuffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnstuffPhase {
    WaitingSof,
    InsideFrame,
    AfterEsc,
    FrameEnded,
    FrameBad,
}

/// Cursor half of the unstuffer, kept separate from the destination borrow
/// so that the message decoder can run the same machine over its own
/// working buffer.
#[derive(Debug, Clone)]
pub(crate) struct UnstuffState {
    len: usize,
    phase: UnstuffPhase,
}

impl UnstuffState {
    pub(crate) fn new() -> Self {
        UnstuffState {
            len: 0,
            phase: UnstuffPhase::WaitingSof,
        }
    }

    pub(crate) fn new_frame(&mut self) {
        self.len = 0;
        self.phase = UnstuffPhase::WaitingSof;
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_waiting_sof(&self) -> bool {
        self.phase == UnstuffPhase::WaitingSof
    }

    pub(crate) fn is_ended(&self) -> bool {
        self.phase == UnstuffPhase::FrameEnded
    }

    pub(crate) fn is_bad(&self) -> bool {
        self.phase == UnstuffPhase::FrameBad
    }

    pub(crate) fn most_efficient_len(&self, capacity: usize) -> usize {
        match self.phase {
            UnstuffPhase::InsideFrame | UnstuffPhase::AfterEsc => capacity - self.len,
            _ => 0,
        }
    }

    pub(crate) fn insert(&mut self, dest: &mut [u8], src: &[u8]) -> UnstuffChunk {
        // Terminal states reject everything until a frame reset.
        match self.phase {
            UnstuffPhase::FrameEnded => return UnstuffChunk::Ended(0),
            UnstuffPhase::FrameBad => return UnstuffChunk::Bad(0),
            _ => {}
        }

        let mut used = 0;
        while used < src.len() {
            let byte = src[used];
            match self.phase {
                UnstuffPhase::WaitingSof => {
                    used += 1;
                    if byte == SOF_BYTE {
                        self.phase = UnstuffPhase::InsideFrame;
                    }
                    // Anything else before SOF is line noise, discard.
                }
                UnstuffPhase::InsideFrame => match byte {
                    SOF_BYTE => {
                        used += 1;
                        self.len = 0;
                        return UnstuffChunk::Restarted(used);
                    }
                    EOF_BYTE => {
                        used += 1;
                        return if self.len > 0 {
                            self.phase = UnstuffPhase::FrameEnded;
                            UnstuffChunk::Ended(used)
                        } else {
                            self.phase = UnstuffPhase::FrameBad;
                            UnstuffChunk::Bad(used)
                        };
                    }
                    ESC_BYTE => {
                        used += 1;
                        self.phase = UnstuffPhase::AfterEsc;
                    }
                    _ => {
                        if self.len == dest.len() {
                            return UnstuffChunk::OutOfMem(used);
                        }
                        dest[self.len] = byte;
                        self.len += 1;
                        used += 1;
                    }
                },
                UnstuffPhase::AfterEsc => match byte {
                    SOF_BYTE => {
                        used += 1;
                        self.len = 0;
                        self.phase = UnstuffPhase::InsideFrame;
                        return UnstuffChunk::Restarted(used);
                    }
                    EOF_BYTE | ESC_BYTE => {
                        used += 1;
                        self.phase = UnstuffPhase::FrameBad;
                        return UnstuffChunk::Bad(used);
                    }
                    _ => {
                        if self.len == dest.len() {
                            return UnstuffChunk::OutOfMem(used);
                        }
                        dest[self.len] = byte ^ ESC_XOR;
                        self.len += 1;
                        used += 1;
                        self.phase = UnstuffPhase::InsideFrame;
                    }
                },
                UnstuffPhase::FrameEnded | UnstuffPhase::FrameBad => break,
            }
        }
        UnstuffChunk::Pending
    }
}

/// Consumes an escaped byte stream and rebuilds the raw frame into a caller
/// supplied buffer, reporting frame boundaries and protocol violations.
pub struct ByteUnstuffer<'a> {
    dest: &'a mut [u8],
    state: UnstuffState,
}

impl<'a> ByteUnstuffer<'a> {
    pub fn new(dest: &'a mut [u8]) -> Result<Self, UnstuffError> {
        if dest.is_empty() {
            return Err(UnstuffError::EmptyBuffer);
        }
        Ok(ByteUnstuffer {
            dest,
            state: UnstuffState::new(),
        })
    }

    /// Drop everything collected so far and hunt for the next SOF.
    pub fn new_frame(&mut self) {
        self.state.new_frame();
    }

    pub fn is_waiting_sof(&self) -> bool {
        self.state.is_waiting_sof()
    }

    pub fn is_frame_ended(&self) -> bool {
        self.state.is_ended()
    }

    pub fn is_frame_bad(&self) -> bool {
        self.state.is_bad()
    }

    /// Number of raw bytes collected so far.
    pub fn unstuffed_len(&self) -> usize {
        self.state.len()
    }

    /// The raw bytes collected so far.
    pub fn unstuffed_data(&self) -> &[u8] {
        &self.dest[..self.state.len()]
    }

    /// Room left in the destination while a frame is open, 0 otherwise.
    pub fn most_efficient_len(&self) -> usize {
        self.state.most_efficient_len(self.dest.len())
    }

    /// Feed escaped bytes, left to right, until `src` is exhausted or the
    /// frame ends, breaks or restarts.
    pub fn insert_chunk(&mut self, src: &[u8]) -> UnstuffChunk {
        self.state.insert(self.dest, src)
    }
}
