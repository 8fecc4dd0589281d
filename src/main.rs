use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use ext_line_sort::{ExternalSorterBuilder, LineCodec, RmpCodec, RunCodec, SortStats};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let format: RunFormat = arg_parser.value_of_t_or_exit("format");
    let memory_budget: Option<usize> = arg_parser
        .is_present("memory_budget")
        .then(|| arg_parser.value_of_t_or_exit("memory_budget"));
    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");
    let keep_tmp_dir = arg_parser.is_present("keep_tmp_dir");
    let rw_buf_size: Option<usize> = arg_parser.value_of("rw_buf_size").map(|value| {
        value.parse::<ByteSize>().expect("value is pre-validated").as_u64() as usize
    });

    let input = path::Path::new(arg_parser.value_of("input").expect("value is required"));
    let output = path::Path::new(arg_parser.value_of("output").expect("value is required"));

    let mut sorter_builder = ExternalSorterBuilder::new().with_retained_tmp_dir(keep_tmp_dir);
    if let Some(memory_budget) = memory_budget {
        sorter_builder = sorter_builder.with_memory_budget(memory_budget);
    }

    if let Some(tmp_dir) = tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    if let Some(rw_buf_size) = rw_buf_size {
        sorter_builder = sorter_builder.with_rw_buf_size(rw_buf_size);
    }

    let stats = match format {
        RunFormat::Text => sort_file::<LineCodec>(sorter_builder, input, output),
        RunFormat::Msgpack => sort_file::<RmpCodec>(sorter_builder.with_codec(), input, output),
    };

    log::info!(
        "{} records sorted ({} runs, {} merge passes, {} intermediate runs)",
        stats.records,
        stats.initial_runs,
        stats.merge_passes,
        stats.intermediate_runs
    );
}

fn sort_file<C: RunCodec>(
    sorter_builder: ExternalSorterBuilder<C>,
    input: &path::Path,
    output: &path::Path,
) -> SortStats {
    let sorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    match sorter.sort_file(input, output) {
        Ok(stats) => stats,
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum RunFormat {
    Text,
    Msgpack,
}

impl RunFormat {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        RunFormat::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for RunFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <RunFormat as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("ext-line-sort")
        .about("external merge sort for text files")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("file to be sorted")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result file")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("memory_budget")
                .short('m')
                .long("memory-budget")
                .help("maximum number of records kept in memory, bounds both run length and merge fan-in")
                .takes_value(true)
                .validator(|v| match v.parse::<usize>() {
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("Memory budget format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("keep_tmp_dir")
                .short('k')
                .long("keep-tmp-dir")
                .help("keep temporary data after sorting"),
        )
        .arg(
            clap::Arg::new("rw_buf_size")
                .short('b')
                .long("rw-buf-size")
                .help("temporary files read/write buffer size")
                .takes_value(true)
                .validator(|v| match v.parse::<ByteSize>() {
                    Ok(_) => Ok(()),
                    Err(err) => Err(format!("Buffer size format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("format")
                .short('f')
                .long("format")
                .help("temporary files format")
                .takes_value(true)
                .default_value("text")
                .possible_values(RunFormat::possible_values()),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
