//! Delta codec (§4.A): fixed-width unsigned integer I/O plus the small set
//! of transforms used to map a raw delta into a one-byte sample.

use std::io::{self, Read, Write};

use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::errors::{DecimateError, DecimateResult};

/// Byte order of a fixed-width delta on disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
  Little,
  Big,
}

/// A pure, deterministic mapping from a raw delta to a value representable
/// in `output_delta_bytes`. The four named transforms required for
/// conformance are provided as free functions below; callers may supply any
/// `Fn(u64) -> u64`.
pub type Transform = fn(u64) -> u64;

/// Leaves the delta unchanged.
pub fn identity(delta: u64) -> u64 {
  delta
}

/// Keeps the least significant 8 bits of the delta.
pub fn mod_256(delta: u64) -> u64 {
  delta % 256
}

/// Drops the least significant bit, then keeps the result modulo 256.
pub fn shr1_mod256(delta: u64) -> u64 {
  (delta >> 1) % 256
}

/// Drops the least significant bit, then keeps the result modulo 255.
pub fn shr1_mod255(delta: u64) -> u64 {
  (delta >> 1) % 255
}

/// Reads one fixed-width unsigned integer of `width` bytes (`1..=8`) from
/// `reader` in the given byte order.
///
/// Returns `Ok(None)` on a clean end-of-stream (zero bytes read before the
/// first byte of the delta). A partial read (some but not all of `width`
/// bytes available) is an `io::ErrorKind::UnexpectedEof` error, since it can
/// never be completed by further reads of the same stream.
pub fn read_delta<R: Read>(reader: &mut R, width: usize, order: Endian) -> io::Result<Option<u64>> {
  debug_assert!((1..=8).contains(&width));
  let mut buf = [0u8; 8];
  let mut filled = 0;
  while filled < width {
    match reader.read(&mut buf[filled..width])? {
      0 => break,
      n => filled += n,
    }
  }
  if filled == 0 {
    return Ok(None);
  }
  if filled < width {
    return Err(io::Error::new(
      io::ErrorKind::UnexpectedEof,
      "delta file ended mid-delta",
    ));
  }
  let value = match order {
    Endian::Little => LittleEndian::read_uint(&buf[..width], width),
    Endian::Big => BigEndian::read_uint(&buf[..width], width),
  };
  Ok(Some(value))
}

/// Writes `value` as a fixed-width unsigned integer of `width` bytes.
///
/// `value` must fit in `width` bytes; a value that doesn't is a programming
/// error (the caller is expected to have validated the transform's output
/// range via `InvalidArgument` before ever reaching this call).
pub fn write_delta<W: Write>(writer: &mut W, value: u64, width: usize, order: Endian) -> io::Result<()> {
  debug_assert!((1..=8).contains(&width));
  assert!(
    width == 8 || value < (1u64 << (8 * width)),
    "value {value} does not fit in {width} bytes"
  );
  let mut buf = [0u8; 8];
  match order {
    Endian::Little => LittleEndian::write_uint(&mut buf[..width], value, width),
    Endian::Big => BigEndian::write_uint(&mut buf[..width], value, width),
  }
  writer.write_all(&buf[..width])
}

/// Validates that `transform` never produces a value wider than
/// `output_delta_bytes` for any input representable in `input_delta_bytes`,
/// by checking the transform's documented range. Named transforms are
/// recognized by pointer identity; a custom transform is accepted as-is
/// (its range is the caller's responsibility, enforced lazily by
/// `write_delta`'s fit assertion).
pub fn max_transform_output(transform: Transform) -> Option<u64> {
  if transform as usize == identity as usize {
    None
  } else if transform as usize == mod_256 as usize
    || transform as usize == shr1_mod256 as usize
  {
    Some(255)
  } else if transform as usize == shr1_mod255 as usize {
    Some(254)
  } else {
    None
  }
}

pub(crate) fn validate_width(width: usize) -> DecimateResult<()> {
  if (1..=8).contains(&width) {
    Ok(())
  } else {
    Err(DecimateError::invalid_argument(format!(
      "delta width must be between 1 and 8 bytes, got {width}"
    )))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn roundtrip_widths_and_orders() {
    for width in 1..=8usize {
      for &order in &[Endian::Little, Endian::Big] {
        let max_value = if width == 8 {
          u64::MAX
        } else {
          (1u64 << (8 * width)) - 1
        };
        for value in [0, 1, max_value / 2, max_value] {
          let mut buf = Vec::new();
          write_delta(&mut buf, value, width, order).unwrap();
          assert_eq!(buf.len(), width);
          let mut cursor = &buf[..];
          let read_back = read_delta(&mut cursor, width, order).unwrap();
          assert_eq!(read_back, Some(value));
        }
      }
    }
  }

  #[test]
  fn clean_eof_returns_none() {
    let mut cursor: &[u8] = &[];
    assert_eq!(read_delta(&mut cursor, 4, Endian::Little).unwrap(), None);
  }

  #[test]
  fn partial_delta_is_error() {
    let mut cursor: &[u8] = &[1, 2];
    let err = read_delta(&mut cursor, 4, Endian::Little).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
  }

  #[test]
  fn named_transforms() {
    assert_eq!(identity(12345), 12345);
    assert_eq!(mod_256(300), 44);
    assert_eq!(shr1_mod256(7), 3);
    assert_eq!(shr1_mod255(511), (511u64 >> 1) % 255);
  }

  #[test]
  fn transform_output_bounds() {
    assert_eq!(max_transform_output(identity), None);
    assert_eq!(max_transform_output(mod_256), Some(255));
    assert_eq!(max_transform_output(shr1_mod256), Some(255));
    assert_eq!(max_transform_output(shr1_mod255), Some(254));
  }
}
