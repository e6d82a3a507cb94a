//! # eFSP
//! eFSP(embedded Frame Streaming Protocol) packages application payloads into
//! self delimited frames and recovers them on the far side of an unreliable
//! byte stream (UART, USB-CDC, virtual COM, ...). It is meant for small
//! targets: caller supplied buffers, no heap on the data path, and strictly
//! bounded work per call so it can be driven from a main loop.
//!
//! A frame on the wire is `SOF, stuffed(header || payload), EOF` where the
//! header is a little endian CRC-32 followed by the little endian payload
//! length, and stuffing escapes the three marker bytes with `ESC, byte ^ 0x20`.
//!
//! The stack is layered bottom up:
//! * [`ByteStuffer`] / [`ByteUnstuffer`] - the escaping codec.
//! * [`MsgEncoder`] / [`MsgDecoder`] - header handling and CRC validation.
//! * [`MsgTransmitter`] / [`MsgReceiver`] - chunked drivers that move bytes
//!   through user supplied line and timer hooks under two deadlines.
//!
//! ## Example
//! ```
//! use efsp_rs::{DecodeChunk, MsgDecoder, MsgEncoder, SoftCrc32, StuffChunk};
//!
//! let mut enc_area = [0u8; 32];
//! let mut dec_area = [0u8; 32];
//!
//! // Write the payload straight into the encoder workspace and arm it.
//! let mut encoder = MsgEncoder::new(&mut enc_area, SoftCrc32).unwrap();
//! encoder.payload_mut()[..3].copy_from_slice(&[0x01, 0x02, 0x03]);
//! encoder.new_message(3).unwrap();
//!
//! // Pull the whole encoded frame in one go.
//! let mut wire = [0u8; 64];
//! let sent = match encoder.get_enc_chunk(&mut wire).unwrap() {
//!     StuffChunk::Ended(n) => n,
//!     StuffChunk::Filled(n) => n,
//! };
//!
//! // Feed it to a decoder on the "other side".
//! let mut decoder = MsgDecoder::new(&mut dec_area, SoftCrc32).unwrap();
//! match decoder.insert_enc_chunk(&wire[..sent]).unwrap() {
//!     DecodeChunk::Decoded(_) => {}
//!     other => panic!("decode failed: {:?}", other),
//! }
//! assert_eq!(decoder.decoded_data(), &[0x01, 0x02, 0x03]);
//! ```

mod crc;
mod decoder;
mod encoder;
mod interface;
mod receiver;
mod stuffer;
mod transmitter;
mod unstuffer;

pub use crate::crc::{Crc32Context, SoftCrc32};
pub use crate::decoder::{DecodeChunk, DecodeError, MsgDecoder};
pub use crate::encoder::{EncodeError, MsgEncoder};
pub use crate::interface::{ByteRx, ByteTx, CallbackError, Crc32Provider, FrameTimer};
pub use crate::receiver::{MsgReceiver, ReceiveError, ReceiveStatus};
pub use crate::stuffer::{ByteStuffer, StuffChunk, StuffError};
pub use crate::transmitter::{MsgTransmitter, SendError, SendStatus};
pub use crate::unstuffer::{ByteUnstuffer, UnstuffChunk, UnstuffError};

/// Start Of Frame marker.
pub const SOF_BYTE: u8 = 0xa1;
/// End Of Frame marker.
pub const EOF_BYTE: u8 = 0xa2;
/// Escape byte; the next byte on the wire is the literal XORed with [`ESC_XOR`].
pub const ESC_BYTE: u8 = 0xa3;
/// Value XORed with an escaped literal.
pub const ESC_XOR: u8 = 0x20;
/// Frame header size: 4 bytes CRC-32 LE followed by 4 bytes payload length LE.
pub const HEADER_LEN: usize = 8;
/// Seed the frame CRC-32 is computed with.
pub const CRC_SEED: u32 = 0xffffffff;

pub(crate) fn is_marker(byte: u8) -> bool {
    byte == SOF_BYTE || byte == EOF_BYTE || byte == ESC_BYTE
}
