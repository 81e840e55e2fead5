//! Host side of the VESC serial protocol: framing, CRC checking and the
//! request/response cycle for telemetry and motor commands.

#![cfg_attr(not(test), no_std)]

pub mod buffer;
pub mod checksum;
pub mod client;
pub mod config;
pub mod error;
pub mod frame;
pub mod packet;
pub mod reader;
pub mod serial;

#[cfg(test)]
mod mock;

pub trait Encode {
    type Error;

    /// Writes self into `buffer`, returning how many bytes were used.
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Decode<'a>
where
    Self: Sized,
{
    type Error;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error>;
}

pub use client::VescUart;
pub use config::Config;
pub use error::ExchangeError;
pub use frame::{Frame, FrameError, FrameHeader, FrameKind};
pub use packet::{Command, PacketError, PacketId, Response, TelemetrySnapshot};
pub use reader::{FrameReader, RawFrame};
pub use serial::{Clock, IoSerial, NbSerial, SerialChannel};
