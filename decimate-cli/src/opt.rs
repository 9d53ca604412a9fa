use clap::{Parser, Subcommand};

use crate::delete_filter_cmd::DeleteFilterOpt;
use crate::reshuffle_cmd::ReshuffleOpt;
use crate::search_cmd::{RangeOpt, SearchOpt};
use crate::store_cmd::StoreOpt;
use crate::test_cmd::TestOpt;

#[derive(Clone, Debug, Parser)]
#[command(about = "search for the minimum decimation level at which a sample stream passes the NIST SP 800-90B IID test battery")]
pub struct OptWrapper {
  #[command(subcommand)]
  pub opt: Opt,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Opt {
  Reshuffle(ReshuffleOpt),
  DeleteFilter(DeleteFilterOpt),
  Test(TestOpt),
  Search(SearchOpt),
  Range(RangeOpt),
  Store(StoreOpt),
}
