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

use crate::error::{Error, Result};
use crate::index::Duplicates;
use crate::io::ReaderOptions;
use crate::predict::{PredictionPolicy, Weighting};

/// Settings for one validation run. Only `ratings_file_path`, `number_of_folds` and
/// `min_ratings_count` are required, everything else has a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub ratings_file_path: String,
    pub number_of_folds: usize,
    /// Minimum number of items a user must have rated in the training set to get a prediction.
    /// The higher this threshold, the fewer predictions we make.
    pub min_ratings_count: usize,
    /// Seed for shuffling the ratings before partitioning, drawn at random if absent.
    pub seed: Option<u64>,
    pub num_threads: usize,
    /// Evaluate folds concurrently instead of parallelising the similarity computation per fold.
    pub parallel_folds: bool,
    pub weighting: Weighting,
    pub clamp: bool,
    pub round: bool,
    pub duplicates: Duplicates,
    pub reader: ReaderOptions,
}

impl Config {

    pub fn new(ratings_file_path: &str, number_of_folds: usize, min_ratings_count: usize) -> Self {
        Config {
            ratings_file_path: ratings_file_path.to_string(),
            number_of_folds,
            min_ratings_count,
            seed: None,
            num_threads: num_cpus::get(),
            parallel_folds: false,
            weighting: Weighting::Absolute,
            clamp: false,
            round: false,
            duplicates: Duplicates::default(),
            reader: ReaderOptions::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ratings_file_path.is_empty() {
            return Err(Error::InvalidConfiguration {
                option: "ratingsFilePath",
                value: String::new(),
                constraint: "a path to a ratings file",
            });
        }

        if self.number_of_folds <= 1 {
            return Err(Error::InvalidConfiguration {
                option: "numberOfFolds",
                value: self.number_of_folds.to_string(),
                constraint: "an integer > 1",
            });
        }

        if self.num_threads == 0 {
            return Err(Error::InvalidConfiguration {
                option: "numThreads",
                value: self.num_threads.to_string(),
                constraint: "an integer >= 1",
            });
        }

        Ok(())
    }

    pub fn prediction_policy(&self) -> PredictionPolicy {
        PredictionPolicy {
            min_ratings_count: self.min_ratings_count,
            weighting: self.weighting,
            clamp: self.clamp,
            round: self.round,
        }
    }
}
