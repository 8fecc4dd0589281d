use std::path;

use env_logger;
use log;

use ext_line_sort::{ExternalSorter, ExternalSorterBuilder};

fn main() {
    env_logger::Builder::new().filter_level(log::LevelFilter::Debug).init();

    let sorter: ExternalSorter = ExternalSorterBuilder::new()
        .with_tmp_dir(path::Path::new("./"))
        .with_memory_budget(100_000)
        .build()
        .unwrap();

    let stats = sorter
        .sort_file(path::Path::new("input.txt"), path::Path::new("output.txt"))
        .unwrap();

    log::info!("{} records sorted in {} merge passes", stats.records, stats.merge_passes);
}
