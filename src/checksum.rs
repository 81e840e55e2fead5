use crc::{CRC_16_XMODEM, Crc};

/// CRC16 used by the motor controller firmware: poly 0x1021, init 0.
pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}
