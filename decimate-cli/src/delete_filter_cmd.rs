use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use decimate::codec::Endian;
use decimate::reshuffle::delete_filter;

use crate::parse;

/// Drop deltas whose position modulo `dec` falls in `delete_classes`,
/// preserving the order of the kept deltas.
#[derive(Clone, Debug, Parser)]
pub struct DeleteFilterOpt {
  pub in_path: PathBuf,
  pub out_path: PathBuf,
  #[arg(long, default_value = "4")]
  pub dec: u64,
  /// Comma-separated list of class indices (0-based, modulo `dec`) to drop.
  #[arg(long, value_parser = parse::class_list, default_value = "")]
  pub delete_classes: std::collections::HashSet<u64>,
  #[arg(long, default_value = "8")]
  pub delta_bytes: usize,
  #[arg(long, value_parser = parse::byte_order, default_value = "little")]
  pub byte_order: Endian,
}

pub fn run(opt: DeleteFilterOpt) -> Result<()> {
  let (written, read) = delete_filter(
    &opt.in_path,
    &opt.out_path,
    opt.dec,
    &opt.delete_classes,
    opt.delta_bytes,
    opt.byte_order,
  )?;
  log::info!("wrote {} out of {} samples", written, read);
  Ok(())
}
