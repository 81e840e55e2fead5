//! Frames consist of a marker byte, a length prefix, the payload, a CRC16 of
//! the payload and a terminator byte.
//!
//! Short: `[0x02][len][payload..][crc_hi][crc_lo][0x03]`
//! Long:  `[0x03][len_hi][len_lo][payload..][crc_hi][crc_lo][0x03]`

use core::fmt;
use core::ops::Range;

use crate::{Decode, Encode, checksum::crc16};

/// Marker of a frame whose payload length fits in one byte
pub const SHORT_MARKER: u8 = 2;
/// Marker of a frame with a two byte, big-endian payload length
pub const LONG_MARKER: u8 = 3;
/// Last byte of every frame
pub const TERMINATOR: u8 = 3;
/// Largest payload a short frame carries
pub const MAX_SHORT_PAYLOAD: usize = u8::MAX as usize;
/// Largest payload the two byte length prefix can describe
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;
/// CRC: 2, Terminator: 1
const TRAILER_SIZE: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Short,
    Long,
}

impl FrameKind {
    pub fn for_payload(len: usize) -> FrameKind {
        if len <= MAX_SHORT_PAYLOAD {
            FrameKind::Short
        } else {
            FrameKind::Long
        }
    }

    pub fn marker(&self) -> u8 {
        match self {
            FrameKind::Short => SHORT_MARKER,
            FrameKind::Long => LONG_MARKER,
        }
    }

    /// Marker plus length prefix
    pub const fn header_size(&self) -> usize {
        match self {
            FrameKind::Short => 2,
            FrameKind::Long => 3,
        }
    }

    /// Bytes a frame of this kind adds around its payload
    pub const fn overhead(&self) -> usize {
        self.header_size() + TRAILER_SIZE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: FrameKind,
    pub payload_len: usize,
}

impl FrameHeader {
    /// Parses the header at the start of `data`.
    ///
    /// `Ok(None)` means more bytes are needed before the header is known.
    pub fn parse(data: &[u8]) -> Result<Option<FrameHeader>, FrameError> {
        let Some(&marker) = data.first() else {
            return Ok(None);
        };
        let kind = match marker {
            SHORT_MARKER => FrameKind::Short,
            LONG_MARKER => FrameKind::Long,
            found => return Err(FrameError::MalformedHeader { found }),
        };
        if data.len() < kind.header_size() {
            return Ok(None);
        }
        let payload_len = match kind {
            FrameKind::Short => data[1] as usize,
            FrameKind::Long => u16::from_be_bytes([data[1], data[2]]) as usize,
        };
        Ok(Some(FrameHeader { kind, payload_len }))
    }

    /// Total length on the wire including header, CRC and terminator
    pub fn frame_len(&self) -> usize {
        self.kind.overhead() + self.payload_len
    }

    pub fn payload_range(&self) -> Range<usize> {
        let start = self.kind.header_size();
        start..start + self.payload_len
    }

    /// Position of the terminator byte
    pub fn end_index(&self) -> usize {
        self.frame_len() - 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// First byte is not a known marker
    MalformedHeader { found: u8 },
    PayloadTooLarge { len: usize, max: usize },
    EncodeBufferTooSmall { expected: usize, found: usize },
    DecodeBufferTooSmall { expected_at_least: usize, found: usize },
    MissingTerminator { index: usize, found: u8 },
    /// CRC carried by the frame disagrees with its payload
    CrcMismatch { calculated: u16, found: u16 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::MalformedHeader { found } => {
                write!(f, "unsupported frame marker {found:#04x}")
            }
            FrameError::PayloadTooLarge { len, max } => {
                write!(f, "payload of {len} bytes exceeds maximum of {max}")
            }
            FrameError::EncodeBufferTooSmall { expected, found } => {
                write!(f, "encode buffer holds {found} bytes, frame needs {expected}")
            }
            FrameError::DecodeBufferTooSmall {
                expected_at_least,
                found,
            } => write!(f, "frame needs at least {expected_at_least} bytes, got {found}"),
            FrameError::MissingTerminator { index, found } => {
                write!(f, "expected terminator at {index}, found {found:#04x}")
            }
            FrameError::CrcMismatch { calculated, found } => {
                write!(f, "crc mismatch: calculated {calculated:#06x}, frame carries {found:#06x}")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub kind: FrameKind,
    pub payload: &'a [u8],
    pub crc: u16,
}

impl<'a> Frame<'a> {
    pub fn new(payload: &'a [u8]) -> Result<Frame<'a>, FrameError> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(FrameError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        Ok(Frame {
            kind: FrameKind::for_payload(payload.len()),
            payload,
            crc: crc16(payload),
        })
    }

    /// Length in a slice this frame occupies
    pub fn len(&self) -> usize {
        self.kind.overhead() + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl Encode for Frame<'_> {
    type Error = FrameError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        let size = self.len();
        if buffer.len() < size {
            return Err(FrameError::EncodeBufferTooSmall {
                expected: size,
                found: buffer.len(),
            });
        }
        let len = self.payload.len();
        buffer[0] = self.kind.marker();
        match self.kind {
            FrameKind::Short => buffer[1] = len as u8,
            FrameKind::Long => buffer[1..3].copy_from_slice(&(len as u16).to_be_bytes()),
        }
        let start = self.kind.header_size();
        buffer[start..start + len].copy_from_slice(self.payload);
        buffer[start + len..start + len + 2].copy_from_slice(&self.crc.to_be_bytes());
        buffer[start + len + 2] = TERMINATOR;
        Ok(size)
    }
}

impl<'a> Decode<'a> for Frame<'a> {
    type Error = FrameError;

    /// Decodes a frame whose end the caller has already located. Bytes past
    /// the advertised length are ignored.
    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        let header = FrameHeader::parse(data)?.ok_or(FrameError::DecodeBufferTooSmall {
            expected_at_least: FrameKind::Short.overhead(),
            found: data.len(),
        })?;
        let end = header.end_index();
        if data.len() <= end {
            return Err(FrameError::DecodeBufferTooSmall {
                expected_at_least: header.frame_len(),
                found: data.len(),
            });
        }
        if data[end] != TERMINATOR {
            return Err(FrameError::MissingTerminator {
                index: end,
                found: data[end],
            });
        }

        let payload = &data[header.payload_range()];
        let found = u16::from_be_bytes([data[end - 2], data[end - 1]]);
        let calculated = crc16(payload);
        if calculated != found {
            return Err(FrameError::CrcMismatch { calculated, found });
        }

        Ok(Frame {
            kind: header.kind,
            payload,
            crc: found,
        })
    }
}
