use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use decimate::round::{run_rounds, RoundConfig};

use crate::battery::ProcessBattery;
use crate::utils::now_timestamp;

/// Run a fixed number of IID-battery rounds against an already-decimated
/// file, persisting outcomes to the result store after every round.
#[derive(Clone, Debug, Parser)]
pub struct TestOpt {
  pub decimated_path: PathBuf,
  pub results_path: PathBuf,
  #[arg(long)]
  pub platform: String,
  #[arg(long)]
  pub dec: u64,
  #[arg(long, default_value = "100")]
  pub num_tests: u64,
  #[arg(long, default_value = "1000000")]
  pub set_size: u64,
  #[arg(long)]
  pub overwrite: bool,
  #[arg(long)]
  pub fail_early: bool,
  #[arg(long, default_value = "")]
  pub iid_tests_args: String,
  #[arg(long)]
  pub battery_command: String,
}

pub fn run(opt: TestOpt) -> Result<()> {
  let mut battery = ProcessBattery {
    command: opt.battery_command,
  };
  let config = RoundConfig {
    platform: opt.platform,
    dec: opt.dec,
    num_tests: opt.num_tests,
    set_size: opt.set_size,
    fail_early: opt.fail_early,
    iid_tests_args: opt.iid_tests_args,
    filename: opt.decimated_path.to_string_lossy().into_owned(),
  };
  let outcome = run_rounds(
    &mut battery,
    &opt.decimated_path,
    &opt.results_path,
    opt.overwrite,
    &config,
    now_timestamp,
  )?;
  println!("{}", toml::to_string_pretty(&outcome.record)?);
  if outcome.failed {
    log::warn!("decimation {} failed", config.dec);
  }
  Ok(())
}
