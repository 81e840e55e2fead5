//! Packet payloads: the first byte identifies the packet, the rest are
//! big-endian fixed-point fields.

use core::fmt;

use crate::buffer::{self, OutOfBounds};
use crate::{Decode, Encode};

/// Packet identifiers understood by the controller firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketId {
    GetValues = 4,
    SetDuty = 5,
    SetCurrent = 6,
    SetCurrentBrake = 7,
    SetRpm = 8,
}

impl TryFrom<u8> for PacketId {
    type Error = PacketError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(PacketId::GetValues),
            5 => Ok(PacketId::SetDuty),
            6 => Ok(PacketId::SetCurrent),
            7 => Ok(PacketId::SetCurrentBrake),
            8 => Ok(PacketId::SetRpm),
            x => Err(PacketError::UnknownPacket(x)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    Empty,
    UnknownPacket(u8),
    /// Known identifier without a reply layout
    UnexpectedPacket(PacketId),
    Truncated(OutOfBounds),
    EncodeBufferTooSmall { expected: usize, found: usize },
}

impl From<OutOfBounds> for PacketError {
    fn from(value: OutOfBounds) -> Self {
        PacketError::Truncated(value)
    }
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::Empty => write!(f, "empty payload"),
            PacketError::UnknownPacket(id) => write!(f, "unknown packet id {id}"),
            PacketError::UnexpectedPacket(id) => write!(f, "no reply layout for {id:?}"),
            PacketError::Truncated(e) => write!(f, "truncated payload: {e}"),
            PacketError::EncodeBufferTooSmall { expected, found } => {
                write!(f, "encode buffer holds {found} bytes, packet needs {expected}")
            }
        }
    }
}

pub const CURRENT_SCALE: f32 = 1000.0;
pub const DUTY_SCALE: f32 = 100_000.0;

/// Outbound instruction to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    GetValues,
    /// Motor current in amps
    SetCurrent(f32),
    /// Brake current in amps
    SetBrakeCurrent(f32),
    /// Electrical RPM
    SetRpm(i32),
    /// Duty cycle, -1.0 to 1.0
    SetDuty(f32),
}

impl Command {
    /// Identifier plus one i32 parameter
    pub const MAX_SIZE: usize = 5;

    pub fn id(&self) -> PacketId {
        match self {
            Command::GetValues => PacketId::GetValues,
            Command::SetCurrent(_) => PacketId::SetCurrent,
            Command::SetBrakeCurrent(_) => PacketId::SetCurrentBrake,
            Command::SetRpm(_) => PacketId::SetRpm,
            Command::SetDuty(_) => PacketId::SetDuty,
        }
    }

    /// Parameter as it travels on the wire, truncated toward zero. Scaled
    /// values outside the i32 range saturate at `i32::MIN`/`i32::MAX`.
    pub fn raw_value(&self) -> Option<i32> {
        match *self {
            Command::GetValues => None,
            Command::SetCurrent(amps) | Command::SetBrakeCurrent(amps) => {
                Some((amps * CURRENT_SCALE) as i32)
            }
            Command::SetRpm(rpm) => Some(rpm),
            Command::SetDuty(duty) => Some((duty * DUTY_SCALE) as i32),
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Command::GetValues => 1,
            _ => Self::MAX_SIZE,
        }
    }
}

impl Encode for Command {
    type Error = PacketError;

    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        if buffer.len() < self.size() {
            return Err(PacketError::EncodeBufferTooSmall {
                expected: self.size(),
                found: buffer.len(),
            });
        }
        let mut ind = 0;
        buffer[ind] = self.id() as u8;
        ind += 1;
        if let Some(value) = self.raw_value() {
            buffer::append_i32(buffer, value, &mut ind)?;
        }
        Ok(ind)
    }
}

/// Reserved fields the controller sends that we do not interpret
const RESERVED_BLOCK: usize = 8;

/// Decoded `GetValues` reply.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// MOSFET temperature, °C
    pub temp_fet: f32,
    /// Motor temperature, °C
    pub temp_motor: f32,
    /// Amps
    pub avg_motor_current: f32,
    /// Amps
    pub avg_input_current: f32,
    /// Duty cycle as a ratio
    pub duty_cycle_now: f32,
    pub rpm: i32,
    /// Volts
    pub input_voltage: f32,
    pub amp_hours: f32,
    pub amp_hours_charged: f32,
    pub tachometer: i32,
    pub tachometer_abs: i32,
}

impl TelemetrySnapshot {
    /// Identifier plus the fields up to and including the absolute tachometer.
    /// Newer firmware appends more fields after these.
    pub const ENCODED_SIZE: usize = 53;

    /// Walks the fields following the packet identifier. Nothing is returned
    /// unless every field was present.
    fn decode_fields(data: &[u8]) -> Result<TelemetrySnapshot, OutOfBounds> {
        let mut ind = 0;
        let temp_fet = buffer::get_f16(data, 10.0, &mut ind)?;
        let temp_motor = buffer::get_f16(data, 10.0, &mut ind)?;
        let avg_motor_current = buffer::get_f32(data, 100.0, &mut ind)?;
        let avg_input_current = buffer::get_f32(data, 100.0, &mut ind)?;
        buffer::skip(data, RESERVED_BLOCK, &mut ind)?;
        let duty_cycle_now = buffer::get_f16(data, 1000.0, &mut ind)?;
        let rpm = buffer::get_i32(data, &mut ind)?;
        let input_voltage = buffer::get_f16(data, 10.0, &mut ind)?;
        let amp_hours = buffer::get_f32(data, 10000.0, &mut ind)?;
        let amp_hours_charged = buffer::get_f32(data, 10000.0, &mut ind)?;
        buffer::skip(data, RESERVED_BLOCK, &mut ind)?;
        let tachometer = buffer::get_i32(data, &mut ind)?;
        let tachometer_abs = buffer::get_i32(data, &mut ind)?;
        Ok(TelemetrySnapshot {
            temp_fet,
            temp_motor,
            avg_motor_current,
            avg_input_current,
            duty_cycle_now,
            rpm,
            input_voltage,
            amp_hours,
            amp_hours_charged,
            tachometer,
            tachometer_abs,
        })
    }
}

impl Encode for TelemetrySnapshot {
    type Error = PacketError;

    /// Writes a full `GetValues` reply payload, reserved blocks zeroed.
    fn encode(&self, buffer: &mut [u8]) -> Result<usize, Self::Error> {
        if buffer.len() < Self::ENCODED_SIZE {
            return Err(PacketError::EncodeBufferTooSmall {
                expected: Self::ENCODED_SIZE,
                found: buffer.len(),
            });
        }
        let mut ind = 0;
        buffer[ind] = PacketId::GetValues as u8;
        ind += 1;
        buffer::append_f16(buffer, self.temp_fet, 10.0, &mut ind)?;
        buffer::append_f16(buffer, self.temp_motor, 10.0, &mut ind)?;
        buffer::append_f32(buffer, self.avg_motor_current, 100.0, &mut ind)?;
        buffer::append_f32(buffer, self.avg_input_current, 100.0, &mut ind)?;
        buffer[ind..ind + RESERVED_BLOCK].fill(0);
        ind += RESERVED_BLOCK;
        buffer::append_f16(buffer, self.duty_cycle_now, 1000.0, &mut ind)?;
        buffer::append_i32(buffer, self.rpm, &mut ind)?;
        buffer::append_f16(buffer, self.input_voltage, 10.0, &mut ind)?;
        buffer::append_f32(buffer, self.amp_hours, 10000.0, &mut ind)?;
        buffer::append_f32(buffer, self.amp_hours_charged, 10000.0, &mut ind)?;
        buffer[ind..ind + RESERVED_BLOCK].fill(0);
        ind += RESERVED_BLOCK;
        buffer::append_i32(buffer, self.tachometer, &mut ind)?;
        buffer::append_i32(buffer, self.tachometer_abs, &mut ind)?;
        Ok(ind)
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--------------- Motor Readings -------------")?;
        writeln!(f, "Avg Motor Current:     {:.3}", self.avg_motor_current)?;
        writeln!(f, "Avg Input Current:     {:.3}", self.avg_input_current)?;
        writeln!(f, "Duty Cycle Now:        {:.3}", self.duty_cycle_now)?;
        writeln!(f, "Rpm:                   {}", self.rpm)?;
        writeln!(f, "Input Voltage:         {:.1}", self.input_voltage)?;
        writeln!(f, "AmpHours:              {:.4}", self.amp_hours)?;
        writeln!(f, "AmpHoursCharged:       {:.4}", self.amp_hours_charged)?;
        writeln!(f, "Tachometer:            {}", self.tachometer)?;
        writeln!(f, "Tachometer Abs:        {}", self.tachometer_abs)?;
        writeln!(f, "Temperature of FETs:   {:.1}", self.temp_fet)?;
        write!(f, "Motor Temperature:     {:.1}", self.temp_motor)
    }
}

/// Replies the controller sends back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Response {
    Values(TelemetrySnapshot),
}

impl<'a> Decode<'a> for Response {
    type Error = PacketError;

    fn decode(data: &'a [u8]) -> Result<Self, Self::Error> {
        let (&id, rest) = data.split_first().ok_or(PacketError::Empty)?;
        match PacketId::try_from(id)? {
            PacketId::GetValues => Ok(Response::Values(TelemetrySnapshot::decode_fields(rest)?)),
            other => Err(PacketError::UnexpectedPacket(other)),
        }
    }
}
