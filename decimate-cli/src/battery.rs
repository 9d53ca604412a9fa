use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use decimate::errors::{DecimateError, DecimateResult};
use decimate::round::IidBattery;

/// Shells out to an external NIST SP 800-90B IID battery binary, per §6.1:
/// the battery is invoked with `-q <iid_tests_args> <scratch_path>` and is
/// expected to print a line per test of the form `test_name: pass` (or any
/// other value for a failure) on stdout.
pub struct ProcessBattery {
  pub command: String,
}

impl IidBattery for ProcessBattery {
  fn run(&mut self, path: &Path, iid_tests_args: &str) -> DecimateResult<BTreeMap<String, bool>> {
    let output = Command::new(&self.command)
      .arg("-q")
      .args(iid_tests_args.split_whitespace())
      .arg(path)
      .output()
      .map_err(|e| {
        DecimateError::battery_protocol(format!("failed to launch IID battery {}: {}", self.command, e))
      })?;

    if !output.status.success() {
      return Err(DecimateError::battery_protocol(format!(
        "IID battery {} exited with status {}",
        self.command, output.status
      )));
    }

    parse_battery_output(&output.stdout)
  }
}

fn parse_battery_output(stdout: &[u8]) -> DecimateResult<BTreeMap<String, bool>> {
  let text = String::from_utf8(stdout.to_vec())
    .map_err(|e| DecimateError::battery_protocol(format!("non-utf8 battery output: {e}")))?;

  let mut outcomes = BTreeMap::new();
  for line in text.lines() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    let (name, verdict) = line
      .split_once(':')
      .ok_or_else(|| DecimateError::battery_protocol(format!("undecodable battery line: {line:?}")))?;
    outcomes.insert(name.trim().to_string(), verdict.trim().eq_ignore_ascii_case("pass"));
  }

  if outcomes.is_empty() {
    return Err(DecimateError::battery_protocol(
      "IID battery produced no decodable test outcomes",
    ));
  }
  Ok(outcomes)
}
