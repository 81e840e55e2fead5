//! Assembles one frame from the serial channel under a deadline.
//!
//! The reader waits for a header, works out where the frame must end from the
//! advertised payload length and then keeps polling until the terminator shows
//! up at that offset or time runs out.

use log::{trace, warn};

use crate::error::ExchangeError;
use crate::frame::{Frame, FrameError, FrameHeader, FrameKind, TERMINATOR};
use crate::serial::{Clock, SerialChannel};
use crate::Decode;

/// Largest frame the reader will accept, header and trailer included
pub const RX_BUFFER_SIZE: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitingForHeader,
    AccumulatingPayload(FrameHeader),
}

/// Bytes of one complete frame with the terminator where the header said.
#[derive(Debug, Clone)]
pub struct RawFrame {
    buf: [u8; RX_BUFFER_SIZE],
    header: FrameHeader,
}

impl RawFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.header.frame_len()]
    }

    pub fn header(&self) -> FrameHeader {
        self.header
    }

    pub fn payload_len(&self) -> usize {
        self.header.payload_len
    }

    /// Checks the CRC and hands back the payload.
    pub fn decode(&self) -> Result<Frame<'_>, FrameError> {
        Frame::decode(self.as_bytes())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FrameReader {
    timeout_ms: u64,
    poll_interval_ms: u32,
}

impl FrameReader {
    pub fn new(timeout_ms: u64, poll_interval_ms: u32) -> FrameReader {
        FrameReader {
            timeout_ms,
            poll_interval_ms,
        }
    }

    /// Reads exactly one frame. Bytes past the end of the frame are left in
    /// the channel.
    pub fn read<S, C>(
        &self,
        serial: &mut S,
        clock: &mut C,
    ) -> Result<RawFrame, ExchangeError<S::Error>>
    where
        S: SerialChannel,
        C: Clock,
    {
        let deadline = clock.now_millis().saturating_add(self.timeout_ms);
        let mut buf = [0; RX_BUFFER_SIZE];
        let mut len = 0;
        let mut state = State::WaitingForHeader;

        loop {
            let target = match state {
                State::WaitingForHeader => FrameKind::Long.header_size(),
                State::AccumulatingPayload(header) => header.frame_len(),
            };
            let mut progressed = false;
            if len < target {
                let available = serial.available().map_err(ExchangeError::Channel)?;
                if available > 0 {
                    let end = target.min(len + available);
                    let n = serial
                        .read_bytes(&mut buf[len..end])
                        .map_err(ExchangeError::Channel)?;
                    len += n;
                    progressed = n > 0;
                }
            }

            if state == State::WaitingForHeader {
                if let Some(header) = FrameHeader::parse(&buf[..len])? {
                    if header.frame_len() > RX_BUFFER_SIZE {
                        warn!(
                            "frame of {} bytes does not fit the {} byte receive buffer",
                            header.frame_len(),
                            RX_BUFFER_SIZE
                        );
                        return Err(FrameError::MalformedHeader { found: buf[0] }.into());
                    }
                    trace!("{:?} frame header, {} byte payload", header.kind, header.payload_len);
                    state = State::AccumulatingPayload(header);
                }
            }

            if let State::AccumulatingPayload(header) = state {
                if len >= header.frame_len() && buf[header.end_index()] == TERMINATOR {
                    trace!("frame complete: {:02x?}", &buf[..len]);
                    return Ok(RawFrame { buf, header });
                }
            }

            if clock.now_millis() >= deadline {
                warn!("no complete frame within {} ms, {} bytes received", self.timeout_ms, len);
                return Err(ExchangeError::Timeout);
            }
            if !progressed {
                clock.pause(self.poll_interval_ms);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;

    use alloc::vec;

    use super::*;
    use crate::mock::{MockClock, MockSerial, frame_bytes};

    fn reader() -> FrameReader {
        FrameReader::new(100, 1)
    }

    #[test]
    fn reads_frame_in_one_chunk() {
        let mut serial = MockSerial::new();
        serial.push_frame(&[4, 1, 2, 3]);
        let mut clock = MockClock::default();

        let raw = reader().read(&mut serial, &mut clock).unwrap();
        assert_eq!(raw.payload_len(), 4);
        assert_eq!(raw.as_bytes(), frame_bytes(&[4, 1, 2, 3]).as_slice());
        assert_eq!(raw.decode().unwrap().payload, &[4, 1, 2, 3]);
    }

    #[test]
    fn accumulates_across_polls() {
        let bytes = frame_bytes(&[4, 10, 20, 30, 40, 50, 60]);
        let mut serial = MockSerial::new();
        serial.delay_polls = 3;
        for chunk in bytes.chunks(2) {
            serial.push_chunk(chunk);
        }
        let mut clock = MockClock::default();

        let raw = reader().read(&mut serial, &mut clock).unwrap();
        assert_eq!(raw.as_bytes(), bytes.as_slice());
        assert!(clock.now < 100);
    }

    #[test]
    fn leaves_trailing_bytes_in_channel() {
        let mut bytes = frame_bytes(&[4, 1]);
        bytes.extend_from_slice(&[0xEE, 0xEE]);
        let mut serial = MockSerial::new();
        serial.push_chunk(&bytes);
        let mut clock = MockClock::default();

        reader().read(&mut serial, &mut clock).unwrap();
        assert_eq!(serial.pending.len(), 2);
    }

    #[test]
    fn silence_times_out() {
        let mut serial = MockSerial::new();
        let mut clock = MockClock::default();

        let err = reader().read(&mut serial, &mut clock).unwrap_err();
        assert!(matches!(err, ExchangeError::Timeout));
        assert_eq!(clock.now, 100);
        assert!(clock.paused.iter().all(|ms| *ms == 1));
    }

    #[test]
    fn partial_frame_times_out() {
        let bytes = frame_bytes(&[4, 1, 2, 3]);
        let mut serial = MockSerial::new();
        serial.push_chunk(&bytes[..bytes.len() - 1]);
        let mut clock = MockClock::default();

        let err = reader().read(&mut serial, &mut clock).unwrap_err();
        assert!(matches!(err, ExchangeError::Timeout));
    }

    #[test]
    fn wrong_terminator_times_out() {
        let mut bytes = frame_bytes(&[4, 1, 2, 3]);
        let end = bytes.len() - 1;
        bytes[end] = 0x7F;
        let mut serial = MockSerial::new();
        serial.push_chunk(&bytes);
        let mut clock = MockClock::default();

        let err = reader().read(&mut serial, &mut clock).unwrap_err();
        assert!(matches!(err, ExchangeError::Timeout));
    }

    #[test]
    fn unknown_marker_is_malformed() {
        let mut serial = MockSerial::new();
        serial.push_chunk(&[0x55, 2, 4, 1, 0, 0, 3]);
        let mut clock = MockClock::default();

        let err = reader().read(&mut serial, &mut clock).unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Frame(FrameError::MalformedHeader { found: 0x55 })
        ));
    }

    #[test]
    fn reads_long_frame() {
        let payload = vec![0x11; 300];
        let mut serial = MockSerial::new();
        serial.push_frame(&payload);
        let mut clock = MockClock::default();

        let raw = reader().read(&mut serial, &mut clock).unwrap();
        assert_eq!(raw.header().kind, FrameKind::Long);
        assert_eq!(raw.decode().unwrap().payload, payload.as_slice());
    }

    #[test]
    fn oversized_length_is_malformed() {
        let mut serial = MockSerial::new();
        // 0x0400 payload bytes would overrun the receive buffer
        serial.push_chunk(&[3, 0x04, 0x00, 4, 4, 4]);
        let mut clock = MockClock::default();

        let err = reader().read(&mut serial, &mut clock).unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Frame(FrameError::MalformedHeader { found: 3 })
        ));
    }

    #[test]
    fn each_read_starts_fresh() {
        let mut serial = MockSerial::new();
        let mut clock = MockClock::default();
        assert!(reader().read(&mut serial, &mut clock).is_err());

        serial.push_frame(&[4, 9]);
        let raw = reader().read(&mut serial, &mut clock).unwrap();
        assert_eq!(raw.decode().unwrap().payload, &[4, 9]);
    }
}
