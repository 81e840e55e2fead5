//! Big-endian fixed-point helpers.
//!
//! Every function takes a cursor `index` into the buffer, reads or writes one
//! field at that position and advances the cursor by the field width. Scaled
//! floats travel as integers multiplied by a known factor.

use core::fmt;

/// A field access would run past the end of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds {
    pub index: usize,
    pub width: usize,
    pub len: usize,
}

impl fmt::Display for OutOfBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} byte field at index {} exceeds buffer of {} bytes",
            self.width, self.index, self.len
        )
    }
}

fn take<const N: usize>(buf: &[u8], index: &mut usize) -> Result<[u8; N], OutOfBounds> {
    let bounds = OutOfBounds {
        index: *index,
        width: N,
        len: buf.len(),
    };
    let end = index.checked_add(N).ok_or(bounds)?;
    let field = buf.get(*index..end).ok_or(bounds)?;
    let mut out = [0; N];
    out.copy_from_slice(field);
    *index = end;
    Ok(out)
}

fn put<const N: usize>(
    buf: &mut [u8],
    bytes: [u8; N],
    index: &mut usize,
) -> Result<(), OutOfBounds> {
    let bounds = OutOfBounds {
        index: *index,
        width: N,
        len: buf.len(),
    };
    let end = index.checked_add(N).ok_or(bounds)?;
    let field = buf.get_mut(*index..end).ok_or(bounds)?;
    field.copy_from_slice(&bytes);
    *index = end;
    Ok(())
}

pub fn get_i16(buf: &[u8], index: &mut usize) -> Result<i16, OutOfBounds> {
    take::<2>(buf, index).map(i16::from_be_bytes)
}

pub fn get_i32(buf: &[u8], index: &mut usize) -> Result<i32, OutOfBounds> {
    take::<4>(buf, index).map(i32::from_be_bytes)
}

/// Reads a 16 bit field and divides it by `scale`.
pub fn get_f16(buf: &[u8], scale: f32, index: &mut usize) -> Result<f32, OutOfBounds> {
    get_i16(buf, index).map(|v| v as f32 / scale)
}

/// Reads a 32 bit field and divides it by `scale`.
pub fn get_f32(buf: &[u8], scale: f32, index: &mut usize) -> Result<f32, OutOfBounds> {
    get_i32(buf, index).map(|v| v as f32 / scale)
}

/// Steps the cursor over `amount` bytes that must still lie inside the buffer.
pub fn skip(buf: &[u8], amount: usize, index: &mut usize) -> Result<(), OutOfBounds> {
    let bounds = OutOfBounds {
        index: *index,
        width: amount,
        len: buf.len(),
    };
    match index.checked_add(amount) {
        Some(end) if end <= buf.len() => {
            *index = end;
            Ok(())
        }
        _ => Err(bounds),
    }
}

pub fn append_i16(buf: &mut [u8], value: i16, index: &mut usize) -> Result<(), OutOfBounds> {
    put(buf, value.to_be_bytes(), index)
}

pub fn append_i32(buf: &mut [u8], value: i32, index: &mut usize) -> Result<(), OutOfBounds> {
    put(buf, value.to_be_bytes(), index)
}

/// Multiplies by `scale` and writes the result truncated to 16 bits.
/// Out of range values saturate at `i16::MIN`/`i16::MAX`, NaN becomes 0.
pub fn append_f16(
    buf: &mut [u8],
    value: f32,
    scale: f32,
    index: &mut usize,
) -> Result<(), OutOfBounds> {
    append_i16(buf, (value * scale) as i16, index)
}

/// Multiplies by `scale` and writes the result truncated to 32 bits.
/// Out of range values saturate at `i32::MIN`/`i32::MAX`, NaN becomes 0.
pub fn append_f32(
    buf: &mut [u8],
    value: f32,
    scale: f32,
    index: &mut usize,
) -> Result<(), OutOfBounds> {
    append_i32(buf, (value * scale) as i32, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance_cursor() {
        let buf = [0x01, 0xC2, 0xFF, 0xFF, 0xFF, 0xFE];
        let mut ind = 0;
        assert_eq!(get_f16(&buf, 1000.0, &mut ind), Ok(0.45));
        assert_eq!(ind, 2);
        assert_eq!(get_i32(&buf, &mut ind), Ok(-2));
        assert_eq!(ind, 6);
    }

    #[test]
    fn read_past_end_fails_without_moving() {
        let buf = [0x00, 0x01, 0x02];
        let mut ind = 1;
        let err = get_i32(&buf, &mut ind).unwrap_err();
        assert_eq!(
            err,
            OutOfBounds {
                index: 1,
                width: 4,
                len: 3
            }
        );
        assert_eq!(ind, 1);
        assert!(skip(&buf, 3, &mut ind).is_err());
        assert!(skip(&buf, 2, &mut ind).is_ok());
        assert_eq!(ind, 3);
    }

    #[test]
    fn append_writes_big_endian() {
        let mut buf = [0; 5];
        let mut ind = 1;
        append_i32(&mut buf, 25_000, &mut ind).unwrap();
        assert_eq!(buf, [0x00, 0x00, 0x00, 0x61, 0xA8]);
        assert_eq!(ind, 5);
        assert!(append_i16(&mut buf, 1, &mut ind).is_err());
    }

    #[test]
    fn out_of_range_floats_saturate() {
        let mut buf = [0; 6];
        let mut ind = 0;
        append_f16(&mut buf, 5000.0, 10.0, &mut ind).unwrap();
        append_f32(&mut buf, -3.0e6, 1000.0, &mut ind).unwrap();
        let mut ind = 0;
        assert_eq!(get_i16(&buf, &mut ind), Ok(i16::MAX));
        assert_eq!(get_i32(&buf, &mut ind), Ok(i32::MIN));
    }

    #[test]
    fn scaled_value_survives_within_one_step() {
        let mut buf = [0; 4];
        for (value, scale) in [(12.345_f32, 1000.0), (-3.21, 100.0), (0.257, 100_000.0)] {
            let mut ind = 0;
            append_f32(&mut buf, value, scale, &mut ind).unwrap();
            let mut ind = 0;
            let back = get_f32(&buf, scale, &mut ind).unwrap();
            assert!((back - value).abs() <= 1.0 / scale, "{value} came back as {back}");
        }
    }
}
