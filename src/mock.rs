//! Scripted channel and manual clock for tests.

extern crate alloc;

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::convert::Infallible;

use crate::frame::Frame;
use crate::serial::{Clock, SerialChannel};
use crate::Encode;

/// Each queued chunk becomes visible on one call to `available`.
#[derive(Debug, Default)]
pub struct MockSerial {
    pub chunks: VecDeque<Vec<u8>>,
    pub pending: VecDeque<u8>,
    pub sent: Vec<u8>,
    /// Replies queued as chunks, one per write, like a device answering
    pub replies: VecDeque<Vec<u8>>,
    /// Polls to sit idle before each chunk shows up
    pub delay_polls: usize,
    idle: usize,
}

impl MockSerial {
    pub fn new() -> MockSerial {
        MockSerial::default()
    }

    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.chunks.push_back(chunk.to_vec());
    }

    pub fn push_frame(&mut self, payload: &[u8]) {
        self.push_chunk(&frame_bytes(payload));
    }

    pub fn reply_with(&mut self, bytes: &[u8]) {
        self.replies.push_back(bytes.to_vec());
    }
}

impl SerialChannel for MockSerial {
    type Error = Infallible;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        self.sent.extend_from_slice(data);
        if let Some(reply) = self.replies.pop_front() {
            self.chunks.push_back(reply);
        }
        Ok(data.len())
    }

    fn available(&mut self) -> Result<usize, Self::Error> {
        if self.idle < self.delay_polls {
            self.idle += 1;
        } else if let Some(chunk) = self.chunks.pop_front() {
            self.idle = 0;
            self.pending.extend(chunk);
        }
        Ok(self.pending.len())
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let n = buf.len().min(self.pending.len());
        for (slot, b) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = b;
        }
        Ok(n)
    }
}

/// Time only moves when something pauses.
#[derive(Debug, Default)]
pub struct MockClock {
    pub now: u64,
    pub paused: Vec<u32>,
}

impl Clock for MockClock {
    fn now_millis(&mut self) -> u64 {
        self.now
    }

    fn pause(&mut self, ms: u32) {
        self.now += ms as u64;
        self.paused.push(ms);
    }
}

pub fn frame_bytes(payload: &[u8]) -> Vec<u8> {
    let frame = Frame::new(payload).unwrap();
    let mut buf = alloc::vec![0; frame.len()];
    frame.encode(&mut buf).unwrap();
    buf
}
