use anyhow::Result;
use clap::Parser;

use crate::opt::{Opt, OptWrapper};

mod battery;
mod delete_filter_cmd;
mod opt;
mod parse;
mod reshuffle_cmd;
mod search_cmd;
mod store_cmd;
mod test_cmd;
mod utils;

fn main() -> Result<()> {
  env_logger::init();

  let opt = OptWrapper::parse().opt;
  match opt {
    Opt::Reshuffle(reshuffle_opt) => reshuffle_cmd::run(reshuffle_opt),
    Opt::DeleteFilter(delete_filter_opt) => delete_filter_cmd::run(delete_filter_opt),
    Opt::Test(test_opt) => test_cmd::run(test_opt),
    Opt::Search(search_opt) => search_cmd::run_search(search_opt),
    Opt::Range(range_opt) => search_cmd::run_range(range_opt),
    Opt::Store(store_opt) => store_cmd::run(store_opt),
  }
}
