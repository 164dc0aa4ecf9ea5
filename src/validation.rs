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

use std::sync::Mutex;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use scoped_pool::Pool;
use serde_derive::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::{Duplicates, RatingIndex};
use crate::metrics;
use crate::predict::{self, Prediction, PredictionPolicy};
use crate::similarity::SimilarityMatrix;
use crate::types::RatingRecord;
use crate::utils;

/// Errors and counts for a single held-out fold. The errors are absent if not a single rating
/// of the fold could be predicted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldResult {
    pub fold_index: usize,
    pub mean_absolute_error: Option<f64>,
    pub root_mean_squared_error: Option<f64>,
    pub prediction_count: usize,
    pub skipped_count: usize,
}

/// Errors averaged over the folds which produced predictions, counts summed over all folds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub num_folds: usize,
    pub evaluated_folds: usize,
    pub mean_absolute_error: Option<f64>,
    pub root_mean_squared_error: Option<f64>,
    pub prediction_count: usize,
    pub skipped_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Seed used for shuffling, rerun with it to reproduce the folds.
    pub seed: u64,
    pub num_ratings_read: usize,
    pub num_ratings_kept: usize,
    pub folds: Vec<FoldResult>,
    pub summary: Summary,
}

/// Discards implicit ratings, which are expressed by a 0 on the rating scale.
pub fn remove_implicit_ratings(records: Vec<RatingRecord>) -> Vec<RatingRecord> {
    records.into_iter()
        .filter(|record| !record.is_implicit())
        .collect()
}

pub fn shuffle<T>(records: &mut [T], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    records.shuffle(&mut rng);
}

/// Splits `records` into `num_folds` contiguous folds of equal size, the last fold additionally
/// holds the remainder of the division.
pub fn partition<T>(records: &[T], num_folds: usize) -> Vec<&[T]> {
    debug_assert!(num_folds > 0);

    let size = records.len() / num_folds;

    (0..num_folds)
        .map(|fold| {
            let start = fold * size;
            let end = if fold == num_folds - 1 { records.len() } else { start + size };
            &records[start..end]
        })
        .collect()
}

/// Union of all folds except `test_fold`.
pub fn training_set<'a, T>(
    folds: &'a [&'a [T]],
    test_fold: usize,
) -> impl Iterator<Item=&'a T> + 'a {
    folds.iter()
        .enumerate()
        .filter(move |(fold, _)| *fold != test_fold)
        .flat_map(|(_, records)| records.iter())
}

/// Trains on `training`, predicts every rating in `test` and measures the errors. The index and
/// similarities only live for the duration of this call.
pub fn evaluate_fold<'a, I>(
    fold_index: usize,
    training: I,
    test: &[RatingRecord],
    policy: &PredictionPolicy,
    duplicates: Duplicates,
    pool: Option<(&Pool, usize)>,
) -> Result<FoldResult>
    where I: IntoIterator<Item=&'a RatingRecord> {

    let start = Instant::now();
    info!("fold {}: started...", fold_index + 1);

    let index = RatingIndex::build_with(training, duplicates)?;

    let similarities = match pool {
        Some((pool, num_workers)) => SimilarityMatrix::compute_in(pool, num_workers, &index),
        None => SimilarityMatrix::compute(&index),
    };

    let mut predictions: Vec<f64> = Vec::with_capacity(test.len());
    let mut actuals: Vec<f64> = Vec::with_capacity(test.len());
    let mut skipped_count = 0;

    for record in test.iter() {
        match predict::predict(&record.user, &record.item, &index, &similarities, policy) {
            Prediction::Estimate(estimate) => {
                debug!("a={}, p={}", record.rating, estimate);
                predictions.push(estimate);
                actuals.push(f64::from(record.rating));
            }
            Prediction::Unavailable(reason) => {
                debug!("skipped user={} item={}: {:?}", record.user, record.item, reason);
                skipped_count += 1;
            }
        }
    }

    let (mean_absolute_error, root_mean_squared_error) = if predictions.is_empty() {
        warn!("fold {}: no rating could be predicted", fold_index + 1);
        (None, None)
    } else {
        (
            Some(metrics::mean_absolute_error(&predictions, &actuals)?),
            Some(metrics::root_mean_squared_error(&predictions, &actuals)?),
        )
    };

    info!("fold {}: completed ({}ms)", fold_index + 1, utils::to_millis(start.elapsed()));

    Ok(FoldResult {
        fold_index,
        mean_absolute_error,
        root_mean_squared_error,
        prediction_count: predictions.len(),
        skipped_count,
    })
}

/// Reduces the per-fold results, errors are averaged unweighted by prediction counts.
pub fn aggregate(folds: &[FoldResult]) -> Summary {

    let mut sum_mae = 0.0;
    let mut sum_rmse = 0.0;
    let mut evaluated_folds = 0;
    let mut prediction_count = 0;
    let mut skipped_count = 0;

    for fold in folds.iter() {
        if let (Some(mae), Some(rmse)) = (fold.mean_absolute_error, fold.root_mean_squared_error) {
            sum_mae += mae;
            sum_rmse += rmse;
            evaluated_folds += 1;
        }
        prediction_count += fold.prediction_count;
        skipped_count += fold.skipped_count;
    }

    let average = |sum: f64| {
        if evaluated_folds == 0 { None } else { Some(sum / evaluated_folds as f64) }
    };

    Summary {
        num_folds: folds.len(),
        evaluated_folds,
        mean_absolute_error: average(sum_mae),
        root_mean_squared_error: average(sum_rmse),
        prediction_count,
        skipped_count,
    }
}

/// Runs k-fold cross-validation over raw ratings: drops implicit ratings, shuffles, partitions
/// into folds and evaluates every fold against the union of the others.
pub fn cross_validate(records: Vec<RatingRecord>, config: &Config) -> Result<Report> {

    config.validate()?;

    let start = Instant::now();
    let num_folds = config.number_of_folds;
    let num_ratings_read = records.len();

    info!("ratings size={}, before removing implicit ratings", num_ratings_read);
    let mut ratings = remove_implicit_ratings(records);
    info!("ratings size={}, after removing implicit ratings", ratings.len());

    if ratings.len() < num_folds {
        return Err(Error::InvalidConfiguration {
            option: "numberOfFolds",
            value: num_folds.to_string(),
            constraint: "at most the number of explicit ratings",
        });
    }

    let seed = config.seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!("shuffling ratings with seed {}", seed);
    shuffle(&mut ratings, seed);

    let folds = partition(&ratings, num_folds);
    let policy = config.prediction_policy();

    let pool = Pool::new(config.num_threads);

    let results: Result<Vec<FoldResult>> = if config.parallel_folds {
        evaluate_folds_concurrently(&pool, &folds, &policy, config.duplicates)
    } else {
        (0..num_folds)
            .map(|fold| {
                evaluate_fold(
                    fold,
                    training_set(&folds, fold),
                    folds[fold],
                    &policy,
                    config.duplicates,
                    Some((&pool, config.num_threads)),
                )
            })
            .collect()
    };

    pool.shutdown();
    let results = results?;

    for result in results.iter() {
        info!(
            "results for k={}: meanAbsoluteError={:?} rootMeanSquaredError={:?} \
             #predictions={} #skipped={}",
            result.fold_index + 1,
            result.mean_absolute_error,
            result.root_mean_squared_error,
            result.prediction_count,
            result.skipped_count,
        );
    }

    let summary = aggregate(&results);

    info!(
        "{}-fold validation completed ({}ms)",
        num_folds,
        utils::to_millis(start.elapsed()),
    );

    Ok(Report {
        seed,
        num_ratings_read,
        num_ratings_kept: ratings.len(),
        folds: results,
        summary,
    })
}

/// Evaluates each fold in its own job on the pool. Every job builds its own index and
/// similarities, the only shared state are the result slots, one per fold.
fn evaluate_folds_concurrently(
    pool: &Pool,
    folds: &[&[RatingRecord]],
    policy: &PredictionPolicy,
    duplicates: Duplicates,
) -> Result<Vec<FoldResult>> {

    let slots: Vec<Mutex<Option<Result<FoldResult>>>> = (0..folds.len())
        .map(|_| Mutex::new(None))
        .collect();

    pool.scoped(|scope| {
        for (fold, slot) in slots.iter().enumerate() {
            scope.execute(move || {
                let result = evaluate_fold(
                    fold,
                    training_set(folds, fold),
                    folds[fold],
                    policy,
                    duplicates,
                    None,
                );

                if let Ok(mut slot) = slot.lock() {
                    *slot = Some(result);
                }
            });
        }
    });

    slots.into_iter()
        .enumerate()
        .map(|(fold, slot)| {
            slot.into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .unwrap_or_else(|| Err(Error::FoldNotEvaluated(fold)))
        })
        .collect()
}


#[cfg(test)]
mod tests {

    use crate::config::Config;
    use crate::error::Error;
    use crate::index::Duplicates;
    use crate::predict::PredictionPolicy;
    use crate::types::RatingRecord;
    use crate::validation::{self, FoldResult};

    fn close_enough_to(value: f64, expected: f64) -> bool {
        (value - expected).abs() < 0.001
    }

    fn dataset() -> Vec<RatingRecord> {
        let mut records = Vec::new();
        for user in 0..12 {
            for item in 0..8 {
                if (user + item) % 3 != 0 {
                    let rating = 1 + ((user * 7 + item * 3) % 10) as u8;
                    records.push(RatingRecord::new(
                        &format!("user{}", user),
                        &format!("item{}", item),
                        rating,
                    ));
                }
            }
        }
        records.push(RatingRecord::new("user0", "item0", 0));
        records.push(RatingRecord::new("user3", "item3", 0));
        records
    }

    fn fold(fold_index: usize, errors: Option<(f64, f64)>, predictions: usize, skipped: usize)
        -> FoldResult {

        FoldResult {
            fold_index,
            mean_absolute_error: errors.map(|(mae, _)| mae),
            root_mean_squared_error: errors.map(|(_, rmse)| rmse),
            prediction_count: predictions,
            skipped_count: skipped,
        }
    }

    #[test]
    fn implicit_ratings_are_removed() {
        let records = vec![
            RatingRecord::new("u1", "i1", 5),
            RatingRecord::new("u1", "i2", 3),
            RatingRecord::new("u2", "i1", 4),
            RatingRecord::new("u2", "i2", 2),
            RatingRecord::new("u1", "i3", 0),
        ];

        let explicit = validation::remove_implicit_ratings(records);

        assert_eq!(explicit.len(), 4);
        assert!(explicit.iter().all(|record| record.rating >= 1 && record.rating <= 10));
        assert!(!explicit.contains(&RatingRecord::new("u1", "i3", 0)));
    }

    #[test]
    fn folds_partition_the_records() {
        let records: Vec<usize> = (0..10).collect();
        let folds = validation::partition(&records, 3);

        assert_eq!(folds.len(), 3);
        assert_eq!(folds[0].len(), 3);
        assert_eq!(folds[1].len(), 3);
        assert_eq!(folds[2].len(), 4);

        let total: usize = folds.iter().map(|fold| fold.len()).sum();
        assert_eq!(total, records.len());

        let concatenated: Vec<usize> = folds.iter().flat_map(|fold| fold.iter().cloned()).collect();
        assert_eq!(concatenated, records);
    }

    #[test]
    fn even_partition() {
        let records: Vec<usize> = (0..12).collect();
        let folds = validation::partition(&records, 4);

        assert!(folds.iter().all(|fold| fold.len() == 3));
    }

    #[test]
    fn training_set_is_the_union_of_the_other_folds() {
        let records: Vec<usize> = (0..10).collect();
        let folds = validation::partition(&records, 3);

        let training: Vec<usize> = validation::training_set(&folds, 1).cloned().collect();

        assert_eq!(training, vec![0, 1, 2, 6, 7, 8, 9]);
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let mut first: Vec<usize> = (0..100).collect();
        let mut second: Vec<usize> = (0..100).collect();

        validation::shuffle(&mut first, 42);
        validation::shuffle(&mut second, 42);

        assert_eq!(first, second);

        first.sort();
        assert_eq!(first, (0..100).collect::<Vec<usize>>());
    }

    #[test]
    fn aggregate_averages_errors_and_sums_counts() {
        let folds = vec![
            fold(0, Some((0.5, 1.0)), 10, 2),
            fold(1, Some((1.5, 2.0)), 30, 0),
            fold(2, None, 0, 5),
        ];

        let summary = validation::aggregate(&folds);

        assert_eq!(summary.num_folds, 3);
        assert_eq!(summary.evaluated_folds, 2);
        assert!(close_enough_to(summary.mean_absolute_error.unwrap(), 1.0));
        assert!(close_enough_to(summary.root_mean_squared_error.unwrap(), 1.5));
        assert_eq!(summary.prediction_count, 40);
        assert_eq!(summary.skipped_count, 7);
    }

    #[test]
    fn aggregate_without_predictions() {
        let summary = validation::aggregate(&[fold(0, None, 0, 3), fold(1, None, 0, 1)]);

        assert_eq!(summary.evaluated_folds, 0);
        assert_eq!(summary.mean_absolute_error, None);
        assert_eq!(summary.root_mean_squared_error, None);
        assert_eq!(summary.skipped_count, 4);
    }

    #[test]
    fn fold_evaluation() {
        let training = vec![
            RatingRecord::new("u1", "i1", 5),
            RatingRecord::new("u1", "i2", 3),
            RatingRecord::new("u2", "i1", 4),
            RatingRecord::new("u2", "i2", 2),
            RatingRecord::new("u3", "i1", 6),
        ];
        let test = vec![
            RatingRecord::new("u3", "i2", 5),
            RatingRecord::new("u3", "i9", 5),
            RatingRecord::new("u9", "i1", 5),
        ];

        let result = validation::evaluate_fold(
            0,
            &training,
            &test,
            &PredictionPolicy::new(1),
            Duplicates::Overwrite,
            None,
        ).unwrap();

        // u3 only rated i1, so the estimate for i2 is exactly u3's rating of i1
        assert_eq!(result.prediction_count, 1);
        assert_eq!(result.skipped_count, 2);
        assert!(close_enough_to(result.mean_absolute_error.unwrap(), 1.0));
        assert!(close_enough_to(result.root_mean_squared_error.unwrap(), 1.0));
    }

    #[test]
    fn fold_without_predictions_has_no_errors() {
        let training = vec![RatingRecord::new("u1", "i1", 5)];
        let test = vec![RatingRecord::new("u2", "i2", 5)];

        let result = validation::evaluate_fold(
            3,
            &training,
            &test,
            &PredictionPolicy::new(0),
            Duplicates::Overwrite,
            None,
        ).unwrap();

        assert_eq!(result.fold_index, 3);
        assert_eq!(result.prediction_count, 0);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.mean_absolute_error, None);
        assert_eq!(result.root_mean_squared_error, None);
    }

    #[test]
    fn cross_validation_accounts_for_every_explicit_rating() {
        let mut config = Config::new("unused.csv", 4, 2);
        config.seed = Some(7);
        config.num_threads = 2;

        let report = validation::cross_validate(dataset(), &config).unwrap();

        assert_eq!(report.seed, 7);
        assert_eq!(report.num_ratings_read, dataset().len());
        assert_eq!(report.num_ratings_kept, dataset().len() - 2);
        assert_eq!(report.folds.len(), 4);

        let summary = &report.summary;
        assert_eq!(summary.num_folds, 4);
        assert_eq!(summary.prediction_count + summary.skipped_count, report.num_ratings_kept);
        assert!(summary.prediction_count > 0);

        let mae = summary.mean_absolute_error.unwrap();
        let rmse = summary.root_mean_squared_error.unwrap();
        assert!(mae >= 0.0);
        assert!(rmse >= 0.0);

        for (index, fold) in report.folds.iter().enumerate() {
            assert_eq!(fold.fold_index, index);
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let mut config = Config::new("unused.csv", 3, 1);
        config.seed = Some(1234);
        config.num_threads = 2;

        let first = validation::cross_validate(dataset(), &config).unwrap();
        let second = validation::cross_validate(dataset(), &config).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn concurrent_folds_match_sequential_folds() {
        let mut config = Config::new("unused.csv", 3, 1);
        config.seed = Some(99);
        config.num_threads = 3;

        let sequential = validation::cross_validate(dataset(), &config).unwrap();

        config.parallel_folds = true;
        let concurrent = validation::cross_validate(dataset(), &config).unwrap();

        assert_eq!(sequential, concurrent);
    }

    #[test]
    fn more_folds_than_ratings_is_a_configuration_error() {
        let records = vec![
            RatingRecord::new("u1", "i1", 5),
            RatingRecord::new("u1", "i2", 3),
            RatingRecord::new("u1", "i3", 0),
        ];

        match validation::cross_validate(records, &Config::new("unused.csv", 3, 0)) {
            Err(Error::InvalidConfiguration { option, .. }) => assert_eq!(option, "numberOfFolds"),
            other => panic!("expected InvalidConfiguration, got {:?}", other),
        }
    }

    #[test]
    fn single_fold_is_rejected() {
        let result = validation::cross_validate(dataset(), &Config::new("unused.csv", 1, 0));
        assert!(result.is_err());
    }
}
