use crate::{is_marker, EOF_BYTE, ESC_BYTE, ESC_XOR, SOF_BYTE};
use thiserror::Error;

/// Outcome of one [`ByteStuffer::get_chunk`] pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StuffChunk {
    /// The destination was filled completely and more encoded bytes remain.
    Filled(usize),
    /// The closing EOF has been emitted; the frame is complete. Further
    /// pulls return `Ended(0)` until a restart.
    Ended(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StuffError {
    #[error("the raw frame must contain at least one byte")]
    EmptyFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StuffPhase {
    /// SOF not emitted yet.
    Sof,
    /// Emitting raw bytes, possibly opening escape pairs.
    Data,
    /// The ESC of a pair went out, this literal is still owed.
    EscTail(u8),
    /// All raw bytes out, EOF still owed.
    Eof,
    Done,
}

/// Cursor half of the stuffer, kept separate from the frame borrow so that
/// the message encoder can run the same machine over its own working buffer.
#[derive(Debug, Clone)]
pub(crate) struct StuffState {
    cursor: usize,
    phase: StuffPhase,
}

impl StuffState {
    pub(crate) fn new() -> Self {
        StuffState {
            cursor: 0,
            phase: StuffPhase::Sof,
        }
    }

    pub(crate) fn restart(&mut self) {
        self.cursor = 0;
        self.phase = StuffPhase::Sof;
    }

    pub(crate) fn is_waiting_start(&self) -> bool {
        self.phase == StuffPhase::Sof
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.phase == StuffPhase::Done
    }

    /// Exact number of output bytes still to be emitted for `raw`.
    pub(crate) fn remaining_len(&self, raw: &[u8]) -> usize {
        let (mut count, data_from) = match self.phase {
            StuffPhase::Done => return 0,
            StuffPhase::Eof => return 1,
            StuffPhase::Sof => (1, self.cursor),
            // The pending literal costs one byte, its ESC is already out.
            StuffPhase::EscTail(_) => (1, self.cursor + 1),
            StuffPhase::Data => (0, self.cursor),
        };
        for byte in &raw[data_from..] {
            count += if is_marker(*byte) { 2 } else { 1 };
        }
        count + 1
    }

    pub(crate) fn next_chunk(&mut self, raw: &[u8], dest: &mut [u8]) -> StuffChunk {
        let mut filled = 0;
        while filled < dest.len() {
            let out = match self.phase {
                StuffPhase::Sof => {
                    self.phase = StuffPhase::Data;
                    SOF_BYTE
                }
                StuffPhase::Data => {
                    if self.cursor == raw.len() {
                        self.phase = StuffPhase::Eof;
                        continue;
                    }
                    let byte = raw[self.cursor];
                    if is_marker(byte) {
                        self.phase = StuffPhase::EscTail(byte ^ ESC_XOR);
                        ESC_BYTE
                    } else {
                        self.cursor += 1;
                        byte
                    }
                }
                StuffPhase::EscTail(literal) => {
                    self.cursor += 1;
                    self.phase = StuffPhase::Data;
                    literal
                }
                StuffPhase::Eof => {
                    self.phase = StuffPhase::Done;
                    EOF_BYTE
                }
                StuffPhase::Done => break,
            };
            dest[filled] = out;
            filled += 1;
        }
        if self.phase == StuffPhase::Done {
            StuffChunk::Ended(filled)
        } else {
            StuffChunk::Filled(filled)
        }
    }
}

/// Streams a raw byte sequence out as `SOF, escaped bytes, EOF`, in chunks
/// of whatever size the caller has room for. Splitting the pulls in any way
/// yields the same concatenated output; the total is between `N + 2` and
/// `2N + 2` bytes for `N` raw bytes.
pub struct ByteStuffer<'a> {
    raw: &'a [u8],
    state: StuffState,
}

impl<'a> ByteStuffer<'a> {
    pub fn new(raw: &'a [u8]) -> Result<Self, StuffError> {
        if raw.is_empty() {
            return Err(StuffError::EmptyFrame);
        }
        Ok(ByteStuffer {
            raw,
            state: StuffState::new(),
        })
    }

    /// Rewind and emit the same frame again.
    pub fn restart(&mut self) {
        self.state.restart();
    }

    /// True until the first byte has been emitted.
    pub fn is_waiting_start(&self) -> bool {
        self.state.is_waiting_start()
    }

    /// True once EOF has been emitted.
    pub fn is_finished(&self) -> bool {
        self.state.is_finished()
    }

    /// Exact number of encoded bytes still to be pulled.
    pub fn most_efficient_len(&self) -> usize {
        self.state.remaining_len(self.raw)
    }

    /// Append encoded bytes to `dest`.
    pub fn get_chunk(&mut self, dest: &mut [u8]) -> StuffChunk {
        self.state.next_chunk(self.raw, dest)
    }
}
