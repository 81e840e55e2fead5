use core::fmt;

use crate::{frame::FrameError, packet::PacketError};

/// Failure of one request/response exchange with the controller.
///
/// None of these are fatal; the caller may start a fresh exchange.
#[derive(Debug)]
pub enum ExchangeError<E> {
    /// No terminated frame arrived before the deadline
    Timeout,
    Frame(FrameError),
    Packet(PacketError),
    /// Reply was valid but too small to be a telemetry record
    ShortResponse { len: usize, min: usize },
    Channel(E),
}

impl<E> From<FrameError> for ExchangeError<E> {
    fn from(value: FrameError) -> Self {
        ExchangeError::Frame(value)
    }
}

impl<E> From<PacketError> for ExchangeError<E> {
    fn from(value: PacketError) -> Self {
        ExchangeError::Packet(value)
    }
}

impl<E: fmt::Debug> fmt::Display for ExchangeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::Timeout => write!(f, "timed out waiting for a reply"),
            ExchangeError::Frame(e) => write!(f, "bad frame: {e}"),
            ExchangeError::Packet(e) => write!(f, "bad packet: {e}"),
            ExchangeError::ShortResponse { len, min } => {
                write!(f, "reply of {len} bytes, expected more than {min}")
            }
            ExchangeError::Channel(e) => write!(f, "serial channel error: {e:?}"),
        }
    }
}
