use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use decimate::codec::{Endian, Transform};
use decimate::search::{decimated_binary_search, decimated_range_test, SearchConfig};

use crate::battery::ProcessBattery;
use crate::parse;
use crate::utils::now_timestamp;

#[derive(Clone, Debug, Parser)]
pub struct SearchArgs {
  pub delta_path: PathBuf,
  pub results_path: PathBuf,
  #[arg(long)]
  pub platform: String,
  #[arg(long)]
  pub max_dec: u64,
  #[arg(long, default_value = "1")]
  pub min_dec: u64,
  #[arg(long, default_value = "100")]
  pub num_tests_requested: u64,
  #[arg(long, default_value = "1000000")]
  pub set_size: u64,
  #[arg(long, default_value = "1")]
  pub dec_multiplier: u64,
  #[arg(long, default_value = "8")]
  pub input_delta_bytes: usize,
  #[arg(long, value_parser = parse::transform, default_value = "identity")]
  pub transform: Transform,
  #[arg(long, value_parser = parse::byte_order, default_value = "little")]
  pub byte_order: Endian,
  #[arg(long)]
  pub overwrite: bool,
  #[arg(long)]
  pub fail_early: bool,
  #[arg(long, default_value = "")]
  pub iid_tests_args: String,
  #[arg(long)]
  pub battery_command: String,
}

/// Tree-based `decimated_binary_search` (§4.F): the minimum number of test
/// invocations needed to locate a passing level.
#[derive(Clone, Debug, Parser)]
pub struct SearchOpt {
  #[command(flatten)]
  pub args: SearchArgs,
}

/// Exhaustive `decimated_range_test` (§4.F alternative mode): a full sweep
/// from `maxDec` down to `minDec`.
#[derive(Clone, Debug, Parser)]
pub struct RangeOpt {
  #[command(flatten)]
  pub args: SearchArgs,
}

fn config_from(args: &SearchArgs) -> SearchConfig {
  SearchConfig {
    platform: args.platform.clone(),
    max_dec: args.max_dec,
    min_dec: args.min_dec,
    num_tests_requested: args.num_tests_requested,
    set_size: args.set_size,
    dec_multiplier: args.dec_multiplier,
    input_delta_bytes: args.input_delta_bytes,
    transform: args.transform,
    byte_order: args.byte_order,
    fail_early: args.fail_early,
    iid_tests_args: args.iid_tests_args.clone(),
  }
}

pub fn run_search(opt: SearchOpt) -> Result<()> {
  let args = &opt.args;
  let mut battery = ProcessBattery {
    command: args.battery_command.clone(),
  };
  let filename = args.delta_path.to_string_lossy().into_owned();
  let report = decimated_binary_search(
    &mut battery,
    &args.delta_path,
    &args.results_path,
    args.overwrite,
    config_from(args),
    &filename,
    now_timestamp,
  )?;
  report_summary(&report);
  Ok(())
}

pub fn run_range(opt: RangeOpt) -> Result<()> {
  let args = &opt.args;
  let mut battery = ProcessBattery {
    command: args.battery_command.clone(),
  };
  let filename = args.delta_path.to_string_lossy().into_owned();
  let report = decimated_range_test(
    &mut battery,
    &args.delta_path,
    &args.results_path,
    args.overwrite,
    config_from(args),
    &filename,
    now_timestamp,
  )?;
  report_summary(&report);
  Ok(())
}

fn report_summary(report: &decimate::search::SearchReport) {
  println!(
    "search window [{}, {}]",
    report.start_date, report.end_date
  );
  match report.pass_level {
    Some(dec) => println!("passLevel: {dec}"),
    None => println!("passLevel: none"),
  }
  match report.pass_star_level {
    Some(dec) => println!("passStarLevel: {dec}"),
    None => println!("passStarLevel: none"),
  }
}
