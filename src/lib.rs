use std::time::Instant;

use tracing::info;

pub mod config;
pub mod dictionary;
pub mod error;
pub mod index;
pub mod io;
pub mod metrics;
pub mod predict;
pub mod similarity;
pub mod types;
pub mod utils;
pub mod validation;


use config::Config;
use error::Result;
use validation::Report;

/// Reads the ratings file named in the configuration and cross-validates item-based
/// collaborative filtering on it.
pub fn run(config: &Config) -> Result<Report> {

    config.validate()?;

    let start = Instant::now();
    info!("reading ratings from {}", config.ratings_file_path);

    let ratings = io::read_ratings(&config.ratings_file_path, &config.reader)?;

    info!(
        "read {} ratings from {} ({}ms)",
        ratings.len(),
        config.ratings_file_path,
        utils::to_millis(start.elapsed()),
    );

    validation::cross_validate(ratings, config)
}
