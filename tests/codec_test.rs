#[cfg(test)]
mod tests {
    extern crate efsp_rs as efsp;

    use efsp::{
        CallbackError, Crc32Provider, DecodeChunk, DecodeError, EncodeError, MsgDecoder,
        MsgEncoder, SoftCrc32, StuffChunk,
    };

    /// CRC hook that always refuses, for fault injection.
    struct BrokenCrc;

    impl Crc32Provider for BrokenCrc {
        fn compute(&mut self, _seed: u32, _data: &[u8]) -> Result<u32, CallbackError> {
            Err(CallbackError)
        }
    }

    // Payload [0x01, 0x02]: crc32(02 00 00 00 01 02) = 0xD7B15C30.
    const TWO_BYTE_WIRE: [u8; 12] = [
        0xa1, 0x30, 0x5c, 0xb1, 0xd7, 0x02, 0x00, 0x00, 0x00, 0x01, 0x02, 0xa2,
    ];

    fn encode_all(encoder: &mut MsgEncoder<SoftCrc32>, chunk_size: usize) -> Vec<u8> {
        let mut out = Vec::new();
        let mut chunk = vec![0u8; chunk_size];
        loop {
            match encoder.get_enc_chunk(&mut chunk).unwrap() {
                StuffChunk::Filled(filled) => out.extend_from_slice(&chunk[..filled]),
                StuffChunk::Ended(filled) => {
                    out.extend_from_slice(&chunk[..filled]);
                    break;
                }
            }
        }
        out
    }

    #[test]
    fn encode_two_byte_payload() {
        let mut area = [0u8; 32];
        let mut encoder = MsgEncoder::new(&mut area, SoftCrc32).unwrap();
        encoder.payload_mut()[..2].copy_from_slice(&[0x01, 0x02]);
        encoder.new_message(2).unwrap();
        assert_eq!(encoder.remaining_enc_len(), TWO_BYTE_WIRE.len());
        assert_eq!(encode_all(&mut encoder, 16), TWO_BYTE_WIRE.to_vec());
    }

    #[test]
    fn encode_escapes_payload_markers() {
        // Payload [0xA1, 0x31]: crc32(02 00 00 00 A1 31) = 0xACEFF9C7.
        let mut area = [0u8; 32];
        let mut encoder = MsgEncoder::new(&mut area, SoftCrc32).unwrap();
        encoder.payload_mut()[..2].copy_from_slice(&[0xa1, 0x31]);
        encoder.new_message(2).unwrap();
        assert_eq!(
            encode_all(&mut encoder, 16),
            vec![0xa1, 0xc7, 0xf9, 0xef, 0xac, 0x02, 0x00, 0x00, 0x00, 0xa3, 0x81, 0x31, 0xa2]
        );
    }

    #[test]
    fn encode_escapes_crc_header_bytes() {
        // Payload [0x06]: crc32(01 00 00 00 06) = 0x149B91A3, whose LE low
        // byte 0xA3 must itself be escaped.
        let mut area = [0u8; 32];
        let mut encoder = MsgEncoder::new(&mut area, SoftCrc32).unwrap();
        encoder.payload_mut()[0] = 0x06;
        encoder.new_message(1).unwrap();
        assert_eq!(
            encode_all(&mut encoder, 16),
            vec![0xa1, 0xa3, 0x83, 0x91, 0x9b, 0x14, 0x01, 0x00, 0x00, 0x00, 0x06, 0xa2]
        );
    }

    #[test]
    fn encode_chunked_output_matches_bulk() {
        let mut payload = [0u8; 11];
        payload.copy_from_slice(&[0xa1, 0xa2, 0xa3, 0x00, 0x7f, 0x80, 0xff, 0x01, 0xa1, 0x20, 0x31]);
        let mut reference = Vec::new();
        for chunk_size in &[1usize, 2, 3, 5, 64] {
            let mut area = [0u8; 32];
            let mut encoder = MsgEncoder::new(&mut area, SoftCrc32).unwrap();
            encoder.payload_mut()[..payload.len()].copy_from_slice(&payload);
            encoder.new_message(payload.len()).unwrap();
            let wire = encode_all(&mut encoder, *chunk_size);
            if reference.is_empty() {
                reference = wire;
            } else {
                assert_eq!(wire, reference);
            }
        }
    }

    #[test]
    fn encode_restart_replays_same_frame() {
        let mut area = [0u8; 32];
        let mut encoder = MsgEncoder::new(&mut area, SoftCrc32).unwrap();
        encoder.payload_mut()[..2].copy_from_slice(&[0x01, 0x02]);
        encoder.new_message(2).unwrap();
        let first = encode_all(&mut encoder, 4);
        assert_eq!(encoder.remaining_enc_len(), 0);
        encoder.restart_message().unwrap();
        assert_eq!(encode_all(&mut encoder, 7), first);
    }

    #[test]
    fn encode_parameter_checks() {
        let mut small = [0u8; 8];
        assert_eq!(
            MsgEncoder::new(&mut small, SoftCrc32).err(),
            Some(EncodeError::BufferTooSmall)
        );

        let mut area = [0u8; 12];
        let mut encoder = MsgEncoder::new(&mut area, SoftCrc32).unwrap();
        assert_eq!(encoder.max_payload_len(), 4);
        assert_eq!(encoder.new_message(0), Err(EncodeError::BadPayloadLen));
        assert_eq!(encoder.new_message(5), Err(EncodeError::BadPayloadLen));
        let mut chunk = [0u8; 4];
        assert_eq!(
            encoder.get_enc_chunk(&mut chunk),
            Err(EncodeError::NoMessage)
        );
        assert_eq!(encoder.restart_message(), Err(EncodeError::NoMessage));
    }

    #[test]
    fn encode_crc_fault_leaves_encoder_unarmed() {
        let mut area = [0u8; 32];
        let mut encoder = MsgEncoder::new(&mut area, BrokenCrc).unwrap();
        encoder.payload_mut()[..2].copy_from_slice(&[0x01, 0x02]);
        assert_eq!(encoder.new_message(2), Err(EncodeError::CrcCallback));
        let mut chunk = [0u8; 4];
        assert_eq!(
            encoder.get_enc_chunk(&mut chunk),
            Err(EncodeError::NoMessage)
        );
    }

    #[test]
    fn decode_two_byte_payload() {
        let mut area = [0u8; 32];
        let mut decoder = MsgDecoder::new(&mut area, SoftCrc32).unwrap();
        assert!(decoder.is_waiting_sof());
        assert_eq!(
            decoder.insert_enc_chunk(&TWO_BYTE_WIRE),
            Ok(DecodeChunk::Decoded(12))
        );
        assert!(decoder.is_msg_decoded());
        assert_eq!(decoder.decoded_data(), &[0x01, 0x02]);
        assert_eq!(decoder.decoded_len(), 2);
        assert_eq!(decoder.most_eff_data_len(), 0);
    }

    #[test]
    fn decode_byte_by_byte() {
        let mut area = [0u8; 32];
        let mut decoder = MsgDecoder::new(&mut area, SoftCrc32).unwrap();
        for byte in TWO_BYTE_WIRE[..11].iter() {
            assert_eq!(decoder.insert_enc_chunk(&[*byte]), Ok(DecodeChunk::Pending));
        }
        assert_eq!(
            decoder.insert_enc_chunk(&[TWO_BYTE_WIRE[11]]),
            Ok(DecodeChunk::Decoded(1))
        );
        assert_eq!(decoder.decoded_data(), &[0x01, 0x02]);
    }

    #[test]
    fn decode_mid_frame_sof_restarts_then_succeeds() {
        // An extra SOF right after the real one.
        let mut stream = vec![0xa1];
        stream.extend_from_slice(&TWO_BYTE_WIRE);
        let mut area = [0u8; 32];
        let mut decoder = MsgDecoder::new(&mut area, SoftCrc32).unwrap();
        assert_eq!(
            decoder.insert_enc_chunk(&stream),
            Ok(DecodeChunk::Restarted(2))
        );
        assert_eq!(
            decoder.insert_enc_chunk(&stream[2..]),
            Ok(DecodeChunk::Decoded(11))
        );
        assert_eq!(decoder.decoded_data(), &[0x01, 0x02]);
    }

    #[test]
    fn decode_declared_length_over_capacity() {
        // mem area of 10 caps the payload at 2, the header declares 3.
        let wire: [u8; 13] = [
            0xa1, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00, 0xcc, 0xcc, 0xcc, 0xa2,
        ];
        let mut area = [0u8; 10];
        let mut decoder = MsgDecoder::new(&mut area, SoftCrc32).unwrap();
        assert_eq!(
            decoder.insert_enc_chunk(&wire),
            Err(DecodeError::OutOfMem(9))
        );
        // Latched until a new frame; no payload byte was ingested.
        assert_eq!(
            decoder.insert_enc_chunk(&wire[9..]),
            Err(DecodeError::OutOfMem(0))
        );
        assert_eq!(decoder.most_eff_data_len(), 0);
        assert!(!decoder.is_msg_decoded());
    }

    #[test]
    fn decode_esc_before_eof_is_bad() {
        let wire: [u8; 12] = [
            0xa1, 0x30, 0x5c, 0xb1, 0xd7, 0x02, 0x00, 0x00, 0x00, 0xcc, 0xa3, 0xa2,
        ];
        let mut area = [0u8; 32];
        let mut decoder = MsgDecoder::new(&mut area, SoftCrc32).unwrap();
        assert_eq!(
            decoder.insert_enc_chunk(&wire),
            Ok(DecodeChunk::BadFrame(12))
        );
        assert!(decoder.is_frame_bad());
        assert_eq!(decoder.most_eff_data_len(), 0);
    }

    #[test]
    fn decode_crc_mismatch_is_bad() {
        // Valid framing, zeroed CRC field.
        let wire: [u8; 12] = [
            0xa1, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0xcc, 0xcc, 0xa2,
        ];
        let mut area = [0u8; 32];
        let mut decoder = MsgDecoder::new(&mut area, SoftCrc32).unwrap();
        assert_eq!(
            decoder.insert_enc_chunk(&wire),
            Ok(DecodeChunk::BadFrame(12))
        );
        assert!(decoder.is_frame_bad());
    }

    #[test]
    fn decode_zero_declared_length_is_bad() {
        let wire: [u8; 10] = [0xa1, 0x11, 0x22, 0x33, 0x44, 0x00, 0x00, 0x00, 0x00, 0xa2];
        let mut area = [0u8; 32];
        let mut decoder = MsgDecoder::new(&mut area, SoftCrc32).unwrap();
        // Rejected the moment the header is complete, before the EOF.
        assert_eq!(decoder.insert_enc_chunk(&wire), Ok(DecodeChunk::BadFrame(9)));
    }

    #[test]
    fn decode_short_frame_is_bad() {
        // EOF after three header bytes.
        let wire: [u8; 5] = [0xa1, 0x30, 0x5c, 0xb1, 0xa2];
        let mut area = [0u8; 32];
        let mut decoder = MsgDecoder::new(&mut area, SoftCrc32).unwrap();
        assert_eq!(decoder.insert_enc_chunk(&wire), Ok(DecodeChunk::BadFrame(5)));
    }

    #[test]
    fn decode_overlong_payload_is_bad() {
        // Header declares 1 byte, two arrive before the EOF.
        let wire: [u8; 12] = [
            0xa1, 0x11, 0x97, 0x19, 0x33, 0x01, 0x00, 0x00, 0x00, 0x42, 0x43, 0xa2,
        ];
        let mut area = [0u8; 32];
        let mut decoder = MsgDecoder::new(&mut area, SoftCrc32).unwrap();
        assert_eq!(
            decoder.insert_enc_chunk(&wire),
            Ok(DecodeChunk::BadFrame(11))
        );
    }

    #[test]
    fn decode_terminal_state_is_idempotent() {
        let mut area = [0u8; 32];
        let mut decoder = MsgDecoder::new(&mut area, SoftCrc32).unwrap();
        assert_eq!(
            decoder.insert_enc_chunk(&TWO_BYTE_WIRE),
            Ok(DecodeChunk::Decoded(12))
        );
        // More input changes nothing.
        assert_eq!(
            decoder.insert_enc_chunk(&TWO_BYTE_WIRE),
            Ok(DecodeChunk::Decoded(0))
        );
        assert_eq!(decoder.decoded_data(), &[0x01, 0x02]);

        decoder.new_frame();
        assert!(decoder.is_waiting_sof());
        assert_eq!(decoder.decoded_len(), 0);
        assert_eq!(
            decoder.insert_enc_chunk(&TWO_BYTE_WIRE),
            Ok(DecodeChunk::Decoded(12))
        );
    }

    #[test]
    fn decode_crc_fault_surfaces_and_latches() {
        let mut area = [0u8; 32];
        let mut decoder = MsgDecoder::new(&mut area, BrokenCrc).unwrap();
        assert_eq!(
            decoder.insert_enc_chunk(&TWO_BYTE_WIRE),
            Err(DecodeError::CrcCallback)
        );
        assert_eq!(
            decoder.insert_enc_chunk(&[0x00]),
            Err(DecodeError::CrcCallback)
        );
        decoder.new_frame();
        assert!(decoder.is_waiting_sof());
    }

    #[test]
    fn decode_most_eff_data_len_walks_the_frame() {
        let mut area = [0u8; 32];
        let mut decoder = MsgDecoder::new(&mut area, SoftCrc32).unwrap();
        // Hunting SOF: a header's worth.
        assert_eq!(decoder.most_eff_data_len(), 8);
        assert_eq!(
            decoder.insert_enc_chunk(&TWO_BYTE_WIRE[..5]),
            Ok(DecodeChunk::Pending)
        );
        // Four header bytes in, four to go.
        assert_eq!(decoder.most_eff_data_len(), 4);
        assert_eq!(
            decoder.insert_enc_chunk(&TWO_BYTE_WIRE[5..9]),
            Ok(DecodeChunk::Pending)
        );
        // Header complete, two payload bytes to go.
        assert_eq!(decoder.most_eff_data_len(), 2);
        assert_eq!(
            decoder.insert_enc_chunk(&TWO_BYTE_WIRE[9..11]),
            Ok(DecodeChunk::Pending)
        );
        // Only the EOF left.
        assert_eq!(decoder.most_eff_data_len(), 1);
        assert_eq!(
            decoder.insert_enc_chunk(&TWO_BYTE_WIRE[11..]),
            Ok(DecodeChunk::Decoded(1))
        );
    }

    #[test]
    fn decode_buffer_capacity_check() {
        let mut small = [0u8; 8];
        assert_eq!(
            MsgDecoder::new(&mut small, SoftCrc32).err(),
            Some(DecodeError::BufferTooSmall)
        );
    }

    #[test]
    fn roundtrip_max_payload() {
        let mut enc_area = [0u8; 24];
        let mut encoder = MsgEncoder::new(&mut enc_area, SoftCrc32).unwrap();
        let cap = encoder.max_payload_len();
        for (index, slot) in encoder.payload_mut().iter_mut().enumerate() {
            *slot = index as u8;
        }
        encoder.new_message(cap).unwrap();
        let wire = encode_all(&mut encoder, 8);

        let mut dec_area = [0u8; 24];
        let mut decoder = MsgDecoder::new(&mut dec_area, SoftCrc32).unwrap();
        match decoder.insert_enc_chunk(&wire).unwrap() {
            DecodeChunk::Decoded(used) => assert_eq!(used, wire.len()),
            other => panic!("decode failed: {:?}", other),
        }
        let expected: Vec<u8> = (0..cap as u8).collect();
        assert_eq!(decoder.decoded_data(), expected.as_slice());
    }
}
