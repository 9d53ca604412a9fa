//! Result store (§4.C): persistence, append/overwrite-last, sort, and
//! date-range filtering over a list of test-outcome records.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cutoff::max_fails;
use crate::errors::{DecimateError, DecimateResult};

/// One test-outcome record, matching the §3 data model exactly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
  pub dec: u64,
  /// test name -> (passes, totals). A `BTreeMap` keeps serialization and
  /// iteration order deterministic without depending on insertion order.
  pub pass_list: BTreeMap<String, (u32, u32)>,
  pub round_pass: u64,
  pub round_total: u64,
  pub platform: String,
  pub filename: String,
  pub datestamp: String,
}

impl TestRecord {
  /// Whether this record counts as passing: the worst test's own
  /// `totals - passes` must not exceed the cutoff for *that test's*
  /// `totals`, not `roundTotal` — a test first observed mid-run has fewer
  /// totals than the round as a whole, and the cutoff tracks the rounds it
  /// actually ran.
  pub fn outcome(&self) -> bool {
    if self.round_total == 0 {
      return false;
    }
    match self.worst_test() {
      Some((_, passes, totals)) => totals - passes <= max_fails(totals as u64),
      None => false,
    }
  }

  /// The individual test with the fewest passes, ties broken by the most
  /// totals, then by (deterministic) name order.
  pub fn worst_test(&self) -> Option<(&str, u32, u32)> {
    self
      .pass_list
      .iter()
      .map(|(name, &(passes, totals))| (name.as_str(), passes, totals))
      .min_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)).then(a.0.cmp(b.0)))
  }
}

/// The on-disk wrapper: an ordered list of records, serialized as
/// human-readable structured text (TOML) with deterministic field order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct ResultFile {
  #[serde(default)]
  records: Vec<TestRecord>,
}

/// Opens the result store at `path`. If `overwrite`, any existing content is
/// ignored (treated as empty) rather than read. A missing file also yields
/// the empty list. A malformed file, or a record missing a required field,
/// is `CorruptStore`.
pub fn open(path: impl AsRef<Path>, overwrite: bool) -> DecimateResult<Vec<TestRecord>> {
  if overwrite {
    return Ok(Vec::new());
  }
  let path = path.as_ref();
  if !path.exists() {
    return Ok(Vec::new());
  }
  let text = fs::read_to_string(path).map_err(DecimateError::from)?;
  if text.trim().is_empty() {
    return Ok(Vec::new());
  }
  let parsed: ResultFile = toml::from_str(&text)
    .map_err(|e| DecimateError::corrupt_store(format!("failed to parse result store: {e}")))?;
  Ok(parsed.records)
}

/// Writes the complete list to `path`. Not fully atomic: a crash mid-write
/// may truncate the file, losing the most recently appended record, but
/// never an older, previously-committed one (since each call rewrites the
/// whole list from scratch in memory first).
pub fn write(list: &[TestRecord], path: impl AsRef<Path>) -> DecimateResult<()> {
  let wrapper = ResultFile {
    records: list.to_vec(),
  };
  let text = toml::to_string_pretty(&wrapper)
    .map_err(|e| DecimateError::corrupt_store(format!("failed to serialize result store: {e}")))?;
  fs::write(path, text).map_err(DecimateError::from)
}

/// Pushes a new record onto the list.
pub fn append(list: &mut Vec<TestRecord>, record: TestRecord) {
  list.push(record);
}

/// Replaces the last record in `list` with `record`. The caller (the round
/// driver) is responsible for ensuring `record` shares `(dec, platform,
/// filename)` with the previous tail; the store itself doesn't check. An
/// empty list has no tail to overwrite and is an `InvalidArgument` error
/// (Open Question #3: the original leaves this undefined).
pub fn overwrite_last(list: &mut Vec<TestRecord>, record: TestRecord) -> DecimateResult<()> {
  match list.last_mut() {
    Some(slot) => {
      *slot = record;
      Ok(())
    }
    None => Err(DecimateError::invalid_argument(
      "overwrite_last called on an empty result list",
    )),
  }
}

/// Stable sort by `(platform, dec, roundTotal, sum of passes)`.
///
/// The original implementation's sort key mixes string concatenation with
/// numeric fields; we use the tuple directly (Open Question #2), which
/// produces an equivalent but clearer total order.
pub fn sort(list: &mut [TestRecord]) {
  list.sort_by(|a, b| {
    let sum_passes = |r: &TestRecord| -> u64 { r.pass_list.values().map(|&(p, _)| p as u64).sum() };
    a.platform
      .cmp(&b.platform)
      .then(a.dec.cmp(&b.dec))
      .then(a.round_total.cmp(&b.round_total))
      .then(sum_passes(a).cmp(&sum_passes(b)))
  });
}

/// A date bound for `filter_by_date`: an explicit stamp, or one of the
/// unbounded sentinels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateBound<'a> {
  Earliest,
  Latest,
  Stamp(&'a str),
}

impl<'a> DateBound<'a> {
  fn from_str(s: &'a str) -> Self {
    match s {
      "" | "earliest" => DateBound::Earliest,
      "latest" => DateBound::Latest,
      other => DateBound::Stamp(other),
    }
  }
}

/// Filters `list` to records whose `datestamp` lies in the inclusive
/// lexicographic range `[start, end]`. `""` and the sentinels `"earliest"`/
/// `"latest"` bound to +-infinity on the respective side.
pub fn filter_by_date<'a>(list: &'a [TestRecord], start: &str, end: &str) -> Vec<&'a TestRecord> {
  let start = DateBound::from_str(start);
  let end = DateBound::from_str(end);
  list
    .iter()
    .filter(|r| {
      let after_start = match start {
        DateBound::Earliest => true,
        DateBound::Latest => false,
        DateBound::Stamp(s) => r.datestamp.as_str() >= s,
      };
      let before_end = match end {
        DateBound::Latest => true,
        DateBound::Earliest => false,
        DateBound::Stamp(s) => r.datestamp.as_str() <= s,
      };
      after_start && before_end
    })
    .collect()
}

/// The minimum passing level report (§4.F): scans records for `platform`
/// within `[start, end]` and returns `(passLevel, passStarLevel)`.
///
/// `passLevel` requires `roundTotal >= num_tests_requested`; `passStarLevel`
/// does not. Both are `None` if no record for this platform passes under
/// the respective rule.
pub fn min_pass_level(
  list: &[TestRecord],
  platform: &str,
  start: &str,
  end: &str,
  num_tests_requested: u64,
) -> (Option<u64>, Option<u64>) {
  let candidates: Vec<&TestRecord> = filter_by_date(list, start, end)
    .into_iter()
    .filter(|r| r.platform == platform && r.outcome())
    .collect();

  let pass_star = candidates.iter().map(|r| r.dec).min();
  let pass = candidates
    .iter()
    .filter(|r| r.round_total >= num_tests_requested)
    .map(|r| r.dec)
    .min();

  (pass, pass_star)
}
