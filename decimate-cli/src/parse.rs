use std::collections::HashSet;

use anyhow::anyhow;

use decimate::codec::{identity, mod_256, shr1_mod255, shr1_mod256, Endian, Transform};

pub fn transform(s: &str) -> anyhow::Result<Transform> {
  let f: Transform = match s.to_lowercase().as_str() {
    "identity" => identity,
    "mod256" => mod_256,
    "shr1mod256" => shr1_mod256,
    "shr1mod255" => shr1_mod255,
    other => {
      return Err(anyhow!(
        "invalid transform: {}. Expected one of: identity, mod256, shr1mod256, shr1mod255",
        other
      ))
    }
  };
  Ok(f)
}

pub fn byte_order(s: &str) -> anyhow::Result<Endian> {
  match s.to_lowercase().as_str() {
    "little" => Ok(Endian::Little),
    "big" => Ok(Endian::Big),
    other => Err(anyhow!(
      "invalid byte order: {}. Expected one of: little, big",
      other
    )),
  }
}

/// Parses a comma-separated list of non-negative class indices, e.g. `"2,3"`.
pub fn class_list(s: &str) -> anyhow::Result<HashSet<u64>> {
  if s.is_empty() {
    return Ok(HashSet::new());
  }
  s.split(',')
    .map(|part| {
      part
        .trim()
        .parse::<u64>()
        .map_err(|e| anyhow!("invalid class index {:?}: {}", part, e))
    })
    .collect()
}
