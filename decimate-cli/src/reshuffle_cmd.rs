use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use decimate::codec::{Endian, Transform};
use decimate::reshuffle::reshuffle;

use crate::parse;

/// Re-arrange a raw delta file into the decimated layout a single round
/// driver invocation expects, without running any IID tests.
#[derive(Clone, Debug, Parser)]
pub struct ReshuffleOpt {
  pub in_path: PathBuf,
  pub out_path: PathBuf,
  #[arg(long, default_value = "1")]
  pub dec: u64,
  #[arg(long, default_value = "1")]
  pub num_sets: u64,
  #[arg(long, default_value = "1000000")]
  pub set_size: u64,
  #[arg(long, default_value = "8")]
  pub input_delta_bytes: usize,
  #[arg(long, default_value = "1")]
  pub output_delta_bytes: usize,
  #[arg(long, value_parser = parse::byte_order, default_value = "little")]
  pub byte_order: Endian,
  #[arg(long, value_parser = parse::transform, default_value = "identity")]
  pub transform: Transform,
}

pub fn run(opt: ReshuffleOpt) -> Result<()> {
  reshuffle(
    &opt.in_path,
    &opt.out_path,
    opt.dec,
    opt.num_sets,
    opt.set_size,
    opt.transform,
    opt.input_delta_bytes,
    opt.output_delta_bytes,
    opt.byte_order,
  )?;
  log::info!(
    "wrote decimated layout for dec={} to {}",
    opt.dec,
    opt.out_path.display()
  );
  Ok(())
}
