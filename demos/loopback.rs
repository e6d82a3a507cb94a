extern crate efsp_rs as efsp;

use efsp::{DecodeChunk, MsgDecoder, MsgEncoder, SoftCrc32, StuffChunk};

fn main() {
    env_logger::init();

    let payload: [u8; 5] = [0x01, 0x02, 0xa1, 0xa2, 0xa3];
    let mut enc_area = [0u8; 64];
    let mut dec_area = [0u8; 64];

    let mut encoder = match MsgEncoder::new(&mut enc_area, SoftCrc32) {
        Ok(encoder) => encoder,
        Err(_) => panic!("Opps!"),
    };
    encoder.payload_mut()[..payload.len()].copy_from_slice(&payload);
    encoder.new_message(payload.len()).unwrap();

    print!("The data to be sent: [");
    for item in payload.iter() {
        print!(" 0x{:02x}", item);
    }
    println!(" ]");

    // Pull the frame in deliberately tiny chunks to show the streaming API.
    let mut wire: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 3];
    loop {
        match encoder.get_enc_chunk(&mut chunk).unwrap() {
            StuffChunk::Filled(filled) => wire.extend_from_slice(&chunk[..filled]),
            StuffChunk::Ended(filled) => {
                wire.extend_from_slice(&chunk[..filled]);
                break;
            }
        }
    }

    print!("eFSP Frame: [ ");
    for byte in wire.iter() {
        print!("0x{:02x} ", byte);
    }
    println!("]");

    let mut decoder = match MsgDecoder::new(&mut dec_area, SoftCrc32) {
        Ok(decoder) => decoder,
        Err(_) => panic!("Opps!"),
    };
    match decoder.insert_enc_chunk(&wire).unwrap() {
        DecodeChunk::Decoded(used) => println!("Frame decoded, {} wire bytes used.", used),
        other => panic!("decode failed: {:?}", other),
    }

    print!("The data received: [ ");
    for byte in decoder.decoded_data().iter() {
        print!("0x{:02x} ", byte);
    }
    println!("]");

    assert_eq!(decoder.decoded_data(), &payload);
}
