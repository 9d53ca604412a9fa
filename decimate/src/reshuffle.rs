//! Decimating reshuffler (§4.B) and its simpler delete-filter sibling
//! (§4.B').

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::codec::{read_delta, write_delta, Endian, Transform};
use crate::errors::{DecimateError, DecimateResult};

/// `rounds = ceil(numSets / d)`.
pub fn rounds_for(num_sets: u64, d: u64) -> u64 {
  (num_sets + d - 1) / d
}

/// `dataNeeded = d * rounds * setSize`.
pub fn data_needed(d: u64, rounds: u64, set_size: u64) -> u64 {
  d * rounds * set_size
}

/// Maps input position `i` to its output slot for decimation level `d` with
/// the given `rounds` and `setSize`: `(i mod d) * rounds * setSize + (i div d)`.
pub fn output_index(i: u64, d: u64, rounds: u64, set_size: u64) -> u64 {
  (i % d) * rounds * set_size + (i / d)
}

/// Re-arranges deltas from `in_path` into a decimated layout at `out_path`,
/// ready for round-by-round IID testing.
///
/// See §4.B: block `c` of the output (0-indexed, each `rounds * setSize`
/// bytes long) contains, in order, the transformed deltas at input
/// positions `c, c+d, c+2d, ...`.
#[allow(clippy::too_many_arguments)]
pub fn reshuffle(
  in_path: impl AsRef<Path>,
  out_path: impl AsRef<Path>,
  d: u64,
  num_sets: u64,
  set_size: u64,
  transform: Transform,
  input_delta_bytes: usize,
  output_delta_bytes: usize,
  order: Endian,
) -> DecimateResult<()> {
  if d < 1 {
    return Err(DecimateError::invalid_argument("decimation level must be >= 1"));
  }
  if set_size < 1 {
    return Err(DecimateError::invalid_argument("setSize must be >= 1"));
  }
  crate::codec::validate_width(input_delta_bytes)?;
  crate::codec::validate_width(output_delta_bytes)?;

  let rounds = rounds_for(num_sets, d);
  let needed = data_needed(d, rounds, set_size);

  // Buffer of `needed` transformed samples, each `output_delta_bytes` wide,
  // indexed by output position so input can be scattered directly into it.
  let mut buffer = vec![0u8; (needed as usize) * output_delta_bytes];

  let in_file = File::open(in_path.as_ref()).map_err(DecimateError::from)?;
  let mut reader = BufReader::new(in_file);

  let mut i = 0u64;
  while i < needed {
    let value = read_delta(&mut reader, input_delta_bytes, order).map_err(DecimateError::from)?;
    let value = match value {
      Some(v) => v,
      None => {
        return Err(DecimateError::insufficient_input(format!(
          "reshuffle needed {needed} deltas but input ended after {i}"
        )))
      }
    };
    let transformed = transform(value);
    let slot = output_index(i, d, rounds, set_size) as usize;
    let start = slot * output_delta_bytes;
    let mut cursor = &mut buffer[start..start + output_delta_bytes];
    write_delta(&mut cursor, transformed, output_delta_bytes, order).map_err(DecimateError::from)?;
    i += 1;
  }

  let out_file = File::create(out_path.as_ref()).map_err(DecimateError::from)?;
  let mut writer = BufWriter::new(out_file);
  writer.write_all(&buffer).map_err(DecimateError::from)?;
  writer.flush().map_err(DecimateError::from)?;
  Ok(())
}

/// Streams deltas from `in_path` to `out_path`, dropping any delta whose
/// 0-based input position modulo `dec` falls in `delete_classes`.
///
/// Returns `(samples_written, samples_read)`.
pub fn delete_filter(
  in_path: impl AsRef<Path>,
  out_path: impl AsRef<Path>,
  dec: u64,
  delete_classes: &HashSet<u64>,
  delta_bytes: usize,
  order: Endian,
) -> DecimateResult<(u64, u64)> {
  if dec < 1 {
    return Err(DecimateError::invalid_argument("dec must be >= 1"));
  }
  crate::codec::validate_width(delta_bytes)?;

  let in_file = File::open(in_path.as_ref()).map_err(DecimateError::from)?;
  let mut reader = BufReader::new(in_file);
  let out_file = File::create(out_path.as_ref()).map_err(DecimateError::from)?;
  let mut writer = BufWriter::new(out_file);

  let mut read = 0u64;
  let mut written = 0u64;
  while let Some(value) = read_delta(&mut reader, delta_bytes, order).map_err(DecimateError::from)? {
    if !delete_classes.contains(&(read % dec)) {
      write_delta(&mut writer, value, delta_bytes, order).map_err(DecimateError::from)?;
      written += 1;
    }
    read += 1;
  }
  writer.flush().map_err(DecimateError::from)?;
  Ok((written, read))
}
