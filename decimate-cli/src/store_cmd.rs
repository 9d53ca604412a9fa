use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use decimate::store;

#[derive(Clone, Debug, Parser)]
pub struct StoreOpt {
  #[command(subcommand)]
  pub cmd: StoreCmd,
}

#[derive(Clone, Debug, Subcommand)]
pub enum StoreCmd {
  /// Re-sort a result store in place by `(platform, dec, roundTotal, sum of passes)`.
  Sort { path: PathBuf },
  /// Print the records whose `datestamp` falls within `[start, end]`.
  Filter {
    path: PathBuf,
    #[arg(long, default_value = "earliest")]
    start: String,
    #[arg(long, default_value = "latest")]
    end: String,
  },
  /// Report `passLevel`/`passStarLevel` for a platform from an existing store.
  MinPassLevel {
    path: PathBuf,
    #[arg(long)]
    platform: String,
    #[arg(long, default_value = "earliest")]
    start: String,
    #[arg(long, default_value = "latest")]
    end: String,
    #[arg(long)]
    num_tests_requested: u64,
  },
}

pub fn run(opt: StoreOpt) -> Result<()> {
  match opt.cmd {
    StoreCmd::Sort { path } => {
      let mut list = store::open(&path, false)?;
      store::sort(&mut list);
      store::write(&list, &path)?;
      println!("sorted {} records", list.len());
      Ok(())
    }
    StoreCmd::Filter { path, start, end } => {
      let list = store::open(&path, false)?;
      let filtered = store::filter_by_date(&list, &start, &end);
      for record in filtered {
        println!("{}", toml::to_string_pretty(record)?);
      }
      Ok(())
    }
    StoreCmd::MinPassLevel {
      path,
      platform,
      start,
      end,
      num_tests_requested,
    } => {
      let list = store::open(&path, false)?;
      let (pass_level, pass_star_level) =
        store::min_pass_level(&list, &platform, &start, &end, num_tests_requested);
      println!(
        "passLevel: {}",
        pass_level.map_or("none".to_string(), |d| d.to_string())
      );
      println!(
        "passStarLevel: {}",
        pass_star_level.map_or("none".to_string(), |d| d.to_string())
      );
      Ok(())
    }
  }
}
