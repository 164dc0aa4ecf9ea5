/**
 * itemcf
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use std::env;
use std::error::Error;
use std::io::stderr;
use std::process;

use getopts::{Matches, Options};
use tracing::Level;

use itemcf::config::Config;
use itemcf::index::Duplicates;
use itemcf::io;
use itemcf::predict::Weighting;

fn main() {

    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("i", "inputfile", "Ratings file name (required). The first line is a header, \
        every other line holds a user, an item and a rating between 0 and 10. Ratings of 0 are \
        implicit and will be ignored.", "PATH");
    opts.optopt("o", "outputfile", "Output file name for the JSON report (optional, output will \
        be written to stdout by default).", "PATH");
    opts.optopt("k", "folds", "Number of folds (optional, defaults to 5, must be at least 2).",
        "NUMBER");
    opts.optopt("m", "min-ratings", "Minimum number of items a user must have rated for a \
        prediction (optional, defaults to 1).", "NUMBER");
    opts.optopt("s", "seed", "Seed for shuffling the ratings (optional, random by default).",
        "NUMBER");
    opts.optopt("t", "threads", "Number of threads to use (optional, defaults to the number of \
        CPUs).", "NUMBER");
    opts.optopt("d", "delimiter", "Field delimiter of the ratings file (optional, defaults to \
        ';', use 'tab' for tab-separated files).", "CHAR");
    opts.optopt("l", "log-level", "One of trace, debug, info, warn, error (optional, defaults to \
        info).", "LEVEL");
    opts.optflag("", "positive-only", "Only let items with positive similarity contribute to a \
        prediction.");
    opts.optflag("", "clamp", "Clamp predictions to the rating scale [1,10].");
    opts.optflag("", "round", "Round predictions to the nearest integral rating.");
    opts.optflag("", "reject-duplicates", "Abort if a user rated the same item twice.");
    opts.optflag("", "parallel-folds", "Evaluate the folds concurrently.");
    opts.optflag("h", "help", "Print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(matches) => matches,
        Err(failure) => {
            let hint = failure.to_string();
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    if matches.opt_present("h") {
        return print_usage_and_exit(&program, opts, None);
    }

    let log_level: Level = match matches.opt_get_default("l", Level::INFO) {
        Ok(level) => level,
        Err(failure) => {
            let hint = format!("Problem with option 'l': {}", failure);
            return print_usage_and_exit(&program, opts, Some(&hint))
        },
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(stderr)
        .init();

    let config = match config_from(&matches) {
        Ok(config) => config,
        Err(hint) => return print_usage_and_exit(&program, opts, Some(&hint)),
    };

    if let Err(failure) = validate(&config, matches.opt_str("o")) {
        eprintln!("\n{}\n", failure);
        process::exit(1);
    }
}

fn config_from(matches: &Matches) -> Result<Config, String> {

    let ratings_file_path = match matches.opt_str("i") {
        Some(path) => path,
        None => return Err("Please specify an inputfile via --inputfile.".to_string()),
    };

    let number_of_folds: usize = matches.opt_get_default("k", 5)
        .map_err(|failure| format!("Problem with option 'k': {}", failure))?;

    let min_ratings_count: usize = matches.opt_get_default("m", 1)
        .map_err(|failure| format!("Problem with option 'm': {}", failure))?;

    let mut config = Config::new(&ratings_file_path, number_of_folds, min_ratings_count);

    config.seed = matches.opt_get("s")
        .map_err(|failure| format!("Problem with option 's': {}", failure))?;

    config.num_threads = matches.opt_get_default("t", config.num_threads)
        .map_err(|failure| format!("Problem with option 't': {}", failure))?;

    if let Some(delimiter) = matches.opt_str("d") {
        config.reader.delimiter = parse_delimiter(&delimiter)
            .ok_or_else(|| format!("Problem with option 'd': '{}' is not a single byte", delimiter))?;
    }

    if matches.opt_present("positive-only") {
        config.weighting = Weighting::Positive;
    }
    if matches.opt_present("reject-duplicates") {
        config.duplicates = Duplicates::Reject;
    }

    config.clamp = matches.opt_present("clamp");
    config.round = matches.opt_present("round");
    config.parallel_folds = matches.opt_present("parallel-folds");

    Ok(config)
}

fn parse_delimiter(delimiter: &str) -> Option<u8> {
    match delimiter {
        "tab" | "\\t" => Some(b'\t'),
        _ if delimiter.len() == 1 => delimiter.bytes().next(),
        _ => None,
    }
}

fn print_usage_and_exit(
    program: &str,
    opts: Options,
    hint: Option<&str>
) {

    if let Some(hint) = hint {
        eprintln!("\n{}\n", hint);
    }

    let brief = format!("Usage: {} [options]", program);
    eprint!("{}", opts.usage(&brief));
    process::exit(2);
}

fn validate(config: &Config, report_path: Option<String>) -> Result<(), Box<dyn Error>> {

    println!(
        "Running {}-fold validation on {} (minimum of {} ratings per user)",
        config.number_of_folds, config.ratings_file_path, config.min_ratings_count,
    );

    let report = itemcf::run(config)?;

    println!(
        "Kept {} of {} ratings after removing implicit ratings, shuffled with seed {}.",
        report.num_ratings_kept, report.num_ratings_read, report.seed,
    );

    for fold in report.folds.iter() {
        println!(
            "Fold {}: meanAbsoluteError={} rootMeanSquaredError={} #predictions={} #skipped={}",
            fold.fold_index + 1,
            format_error(fold.mean_absolute_error),
            format_error(fold.root_mean_squared_error),
            fold.prediction_count,
            fold.skipped_count,
        );
    }

    let summary = &report.summary;
    println!(
        "{}-fold validation: average meanAbsoluteError={} average rootMeanSquaredError={} \
         total #predictions={} total #skipped={}",
        summary.num_folds,
        format_error(summary.mean_absolute_error),
        format_error(summary.root_mean_squared_error),
        summary.prediction_count,
        summary.skipped_count,
    );

    println!("Writing report...");
    io::write_report(&report, report_path)?;

    Ok(())
}

fn format_error(error: Option<f64>) -> String {
    match error {
        Some(error) => format!("{:.4}", error),
        None => "n/a".to_string(),
    }
}
