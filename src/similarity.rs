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

use std::iter::FromIterator;
use std::sync::Mutex;
use std::time::Instant;

use fnv::FnvHashMap;
use scoped_pool::Pool;
use tracing::{debug, info};

use crate::index::RatingIndex;
use crate::metrics;
use crate::types::{ItemPair, SparseVector};
use crate::utils;

const PROGRESS_INTERVAL: usize = 1_000_000;

/// Sparse item-item cosine similarities. Only pairs of items with at least one common rater are
/// present, a missing pair means the similarity is unknown, not zero. Pairs refer to the item ids
/// of the `RatingIndex` the matrix was computed from.
#[derive(Debug, Default, PartialEq)]
pub struct SimilarityMatrix {
    similarities: FnvHashMap<ItemPair, f32>,
}

/// Output of one pass over a subset of the rows of the upper triangle.
#[derive(Default)]
struct Partial {
    similarities: FnvHashMap<ItemPair, f32>,
    num_degenerate: usize,
}

impl SimilarityMatrix {

    pub fn compute(index: &RatingIndex) -> Self {
        let start = Instant::now();

        let partial = compute_rows(index, 0, 1);
        let num_degenerate = partial.num_degenerate;
        let matrix = SimilarityMatrix { similarities: partial.similarities };

        matrix.log_completion(index, num_degenerate, start);
        matrix
    }

    /// Splits the rows of the upper triangle over `num_workers` jobs on the pool. Worker `w` owns
    /// the rows `i` with `i % num_workers == w`, so the partial results never share a pair and
    /// merge without conflicts.
    pub fn compute_in(pool: &Pool, num_workers: usize, index: &RatingIndex) -> Self {

        if num_workers <= 1 {
            return SimilarityMatrix::compute(index);
        }

        let start = Instant::now();

        let partials: Vec<Mutex<Partial>> = (0..num_workers)
            .map(|_| Mutex::new(Partial::default()))
            .collect();

        pool.scoped(|scope| {
            for (worker, partial) in partials.iter().enumerate() {
                scope.execute(move || {
                    let result = compute_rows(index, worker, num_workers);
                    if let Ok(mut slot) = partial.lock() {
                        *slot = result;
                    }
                });
            }
        });

        let mut similarities = FnvHashMap::default();
        let mut num_degenerate = 0;

        for partial in partials.into_iter() {
            let partial = partial.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
            num_degenerate += partial.num_degenerate;
            similarities.extend(partial.similarities);
        }

        let matrix = SimilarityMatrix { similarities };
        matrix.log_completion(index, num_degenerate, start);
        matrix
    }

    pub fn len(&self) -> usize {
        self.similarities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.similarities.is_empty()
    }

    pub fn get(&self, pair: ItemPair) -> Option<f32> {
        self.similarities.get(&pair).cloned()
    }

    /// Similarity between two items given by name, `None` if unknown.
    pub fn between(&self, index: &RatingIndex, item_a: &str, item_b: &str) -> Option<f32> {
        let item_a = index.item_index(item_a)?;
        let item_b = index.item_index(item_b)?;

        if item_a == item_b {
            return None;
        }

        self.get(ItemPair::new(item_a, item_b))
    }

    pub fn iter(&self) -> impl Iterator<Item=(&ItemPair, &f32)> {
        self.similarities.iter()
    }

    fn log_completion(&self, index: &RatingIndex, num_degenerate: usize, start: Instant) {
        info!(
            "similarity matrix: {} similarities among {} items, {} degenerate pairs skipped ({}ms)",
            self.len(),
            index.num_items(),
            num_degenerate,
            utils::to_millis(start.elapsed()),
        );
    }
}

impl FromIterator<(ItemPair, f32)> for SimilarityMatrix {
    fn from_iter<T: IntoIterator<Item=(ItemPair, f32)>>(pairs: T) -> Self {
        SimilarityMatrix { similarities: pairs.into_iter().collect() }
    }
}

/// Computes the similarities for rows `offset, offset + step, ...` of the upper triangle of the
/// item-item matrix. Pairs without common raters are skipped, as are pairs whose rating vectors
/// have zero magnitude.
fn compute_rows(index: &RatingIndex, offset: usize, step: usize) -> Partial {

    let num_items = index.num_items();

    let mut partial = Partial::default();
    let mut ratings_a: Vec<f64> = Vec::new();
    let mut ratings_b: Vec<f64> = Vec::new();

    for item_a in (offset..num_items).step_by(step) {

        let raters_a = index.item_ratings(item_a as u32);

        for item_b in (item_a + 1)..num_items {

            let raters_b = index.item_ratings(item_b as u32);

            common_ratings(raters_a, raters_b, &mut ratings_a, &mut ratings_b);

            if ratings_a.is_empty() {
                continue;
            }

            let pair = ItemPair::new(item_a as u32, item_b as u32);

            match metrics::cosine_similarity(&ratings_a, &ratings_b) {
                Ok(similarity) => {
                    debug!(
                        "sim={} item={} other_item={}",
                        similarity,
                        index.item_name(pair.first()),
                        index.item_name(pair.second()),
                    );

                    partial.similarities.insert(pair, similarity as f32);

                    if partial.similarities.len() % PROGRESS_INTERVAL == 0 {
                        info!(
                            "{}M similarities computed by worker {}",
                            partial.similarities.len() / PROGRESS_INTERVAL,
                            offset,
                        );
                    }
                }
                Err(err) => {
                    debug!(
                        "no similarity for item={} other_item={}: {}",
                        index.item_name(pair.first()),
                        index.item_name(pair.second()),
                        err,
                    );
                    partial.num_degenerate += 1;
                }
            }
        }
    }

    partial
}

/// Fills two equal-length vectors with the ratings of the common raters of both items, in
/// matching order. We probe the larger row with the keys of the smaller one.
fn common_ratings(
    raters_a: &SparseVector,
    raters_b: &SparseVector,
    ratings_a: &mut Vec<f64>,
    ratings_b: &mut Vec<f64>,
) {
    ratings_a.clear();
    ratings_b.clear();

    if raters_a.len() <= raters_b.len() {
        for (user, rating_a) in raters_a.iter() {
            if let Some(rating_b) = raters_b.get(user) {
                ratings_a.push(f64::from(*rating_a));
                ratings_b.push(f64::from(*rating_b));
            }
        }
    } else {
        for (user, rating_b) in raters_b.iter() {
            if let Some(rating_a) = raters_a.get(user) {
                ratings_a.push(f64::from(*rating_a));
                ratings_b.push(f64::from(*rating_b));
            }
        }
    }
}
