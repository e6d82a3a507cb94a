extern crate efsp_rs as efsp;

use efsp::{
    ByteRx, ByteTx, CallbackError, FrameTimer, MsgReceiver, MsgTransmitter, ReceiveStatus,
    SendStatus, SoftCrc32,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// In-memory byte line shared by the two ends.
struct Line {
    fifo: Rc<RefCell<VecDeque<u8>>>,
    /// Bytes moved per hook call, to force chunked progress.
    per_call: usize,
}

impl ByteTx for Line {
    fn send(&mut self, data: &[u8], _max_time_ms: u32) -> Result<usize, CallbackError> {
        let count = data.len().min(self.per_call);
        let mut fifo = self.fifo.borrow_mut();
        for byte in &data[..count] {
            fifo.push_back(*byte);
        }
        Ok(count)
    }
}

impl ByteRx for Line {
    fn receive(&mut self, dest: &mut [u8], _max_time_ms: u32) -> Result<usize, CallbackError> {
        let mut fifo = self.fifo.borrow_mut();
        let count = dest.len().min(self.per_call).min(fifo.len());
        for slot in dest[..count].iter_mut() {
            *slot = fifo.pop_front().unwrap();
        }
        Ok(count)
    }
}

/// Down-counter that loses one millisecond per query.
struct TickTimer {
    remaining: u32,
}

impl FrameTimer for TickTimer {
    fn start(&mut self, timeout_ms: u32) -> Result<(), CallbackError> {
        self.remaining = timeout_ms;
        Ok(())
    }

    fn remaining(&mut self) -> Result<u32, CallbackError> {
        self.remaining = self.remaining.saturating_sub(1);
        Ok(self.remaining)
    }
}

fn main() {
    env_logger::init();

    let fifo = Rc::new(RefCell::new(VecDeque::new()));
    let payload: [u8; 4] = [0xde, 0xad, 0xbe, 0xef];

    let mut tx_area = [0u8; 64];
    let mut tx_scratch = [0u8; 4];
    let mut transmitter = MsgTransmitter::new(
        String::from("tx"),
        &mut tx_area,
        &mut tx_scratch,
        SoftCrc32,
        Line {
            fifo: Rc::clone(&fifo),
            per_call: 3,
        },
        TickTimer { remaining: 0 },
        1000,
        10,
    )
    .unwrap();

    let mut rx_area = [0u8; 64];
    let mut rx_scratch = [0u8; 4];
    let mut receiver = MsgReceiver::new(
        String::from("rx"),
        &mut rx_area,
        &mut rx_scratch,
        SoftCrc32,
        Line {
            fifo: Rc::clone(&fifo),
            per_call: 3,
        },
        TickTimer { remaining: 0 },
        1000,
        10,
        true,
    )
    .unwrap();

    transmitter.payload_mut()[..payload.len()].copy_from_slice(&payload);
    transmitter.new_message(payload.len()).unwrap();
    receiver.new_frame().unwrap();

    // Cooperative main loop: one chunk of each side per turn.
    let mut sent = false;
    loop {
        if !sent {
            match transmitter.send_chunk().unwrap() {
                SendStatus::Sent => {
                    println!("Frame fully handed to the line.");
                    sent = true;
                }
                SendStatus::Pending => {}
                SendStatus::Timeout => panic!("tx deadline"),
            }
        }
        match receiver.receive_chunk().unwrap() {
            ReceiveStatus::Received => break,
            ReceiveStatus::Pending | ReceiveStatus::FrameRestart => {}
            other => panic!("rx failed: {:?}", other),
        }
    }

    print!("The data received: [ ");
    for byte in receiver.decoded_data().iter() {
        print!("0x{:02x} ", byte);
    }
    println!("]");

    assert_eq!(receiver.decoded_data(), &payload);
}
