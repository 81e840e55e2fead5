//! Request/response exchanges with a motor controller.
//!
//! The client owns the channel, so only one exchange can be in flight at a
//! time. The protocol has no message ids to tell interleaved replies apart.

use log::{debug, trace, warn};

use crate::config::Config;
use crate::error::ExchangeError;
use crate::frame::{Frame, FrameKind};
use crate::packet::{Command, Response, TelemetrySnapshot};
use crate::reader::{FrameReader, RX_BUFFER_SIZE};
use crate::serial::{Clock, SerialChannel};
use crate::{Decode, Encode};

const COMMAND_FRAME_SIZE: usize = Command::MAX_SIZE + FrameKind::Short.overhead();

#[derive(Debug)]
pub struct VescUart<S, C> {
    serial: S,
    clock: C,
    config: Config,
    reader: FrameReader,
    telemetry: TelemetrySnapshot,
}

impl<S, C> VescUart<S, C>
where
    S: SerialChannel,
    C: Clock,
{
    pub fn new(serial: S, clock: C) -> VescUart<S, C> {
        VescUart::with_config(serial, clock, Config::default())
    }

    pub fn with_config(serial: S, clock: C, config: Config) -> VescUart<S, C> {
        VescUart {
            serial,
            clock,
            config,
            reader: FrameReader::new(config.timeout_ms, config.poll_interval_ms),
            telemetry: TelemetrySnapshot::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Values from the last successful `request_telemetry`
    pub fn telemetry(&self) -> &TelemetrySnapshot {
        &self.telemetry
    }

    pub fn release(self) -> (S, C) {
        (self.serial, self.clock)
    }

    /// Frames and writes `command` without waiting for any reply.
    /// Returns the number of bytes put on the wire.
    pub fn send_command(&mut self, command: Command) -> Result<usize, ExchangeError<S::Error>> {
        let mut payload = [0; Command::MAX_SIZE];
        let len = command.encode(&mut payload)?;
        let frame = Frame::new(&payload[..len])?;
        let mut buf = [0; COMMAND_FRAME_SIZE];
        let size = frame.encode(&mut buf)?;
        trace!("sending {:?}: {:02x?}", command, &buf[..size]);
        self.serial.write(&buf[..size]).map_err(ExchangeError::Channel)
    }

    pub fn set_current(&mut self, amps: f32) -> Result<(), ExchangeError<S::Error>> {
        self.send_command(Command::SetCurrent(amps)).map(|_| ())
    }

    pub fn set_brake_current(&mut self, amps: f32) -> Result<(), ExchangeError<S::Error>> {
        self.send_command(Command::SetBrakeCurrent(amps)).map(|_| ())
    }

    pub fn set_rpm(&mut self, rpm: i32) -> Result<(), ExchangeError<S::Error>> {
        self.send_command(Command::SetRpm(rpm)).map(|_| ())
    }

    pub fn set_duty(&mut self, duty: f32) -> Result<(), ExchangeError<S::Error>> {
        self.send_command(Command::SetDuty(duty)).map(|_| ())
    }

    /// Asks the controller for its current values and waits for the reply.
    ///
    /// The cached snapshot is replaced only when a complete, valid reply
    /// arrives; on any error it keeps the previous values.
    pub fn request_telemetry(&mut self) -> Result<&TelemetrySnapshot, ExchangeError<S::Error>> {
        self.discard_input()?;
        self.send_command(Command::GetValues)?;
        self.clock.pause(self.config.settle_ms);

        let raw = self.reader.read(&mut self.serial, &mut self.clock)?;
        let frame = raw.decode().inspect_err(|e| warn!("dropping reply: {e}"))?;

        let len = frame.payload.len();
        if len <= self.config.min_telemetry_len {
            debug!("reply of {} bytes is too short for telemetry", len);
            return Err(ExchangeError::ShortResponse {
                len,
                min: self.config.min_telemetry_len,
            });
        }

        match Response::decode(frame.payload)? {
            Response::Values(values) => self.telemetry = values,
        }
        debug!(
            "telemetry: {} rpm, {:.1} V, {:.2} A",
            self.telemetry.rpm, self.telemetry.input_voltage, self.telemetry.avg_input_current
        );
        Ok(&self.telemetry)
    }

    /// Drops bytes left over from an earlier exchange so they cannot be
    /// mistaken for the next reply.
    fn discard_input(&mut self) -> Result<(), ExchangeError<S::Error>> {
        let mut scratch = [0; 64];
        let mut dropped = 0;
        while dropped < RX_BUFFER_SIZE {
            if self.serial.available().map_err(ExchangeError::Channel)? == 0 {
                break;
            }
            let n = self
                .serial
                .read_bytes(&mut scratch)
                .map_err(ExchangeError::Channel)?;
            if n == 0 {
                break;
            }
            dropped += n;
        }
        if dropped > 0 {
            debug!("discarded {} stale bytes", dropped);
        }
        Ok(())
    }
}
