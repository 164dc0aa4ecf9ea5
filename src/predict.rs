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

use crate::index::RatingIndex;
use crate::similarity::SimilarityMatrix;
use crate::types::{ItemPair, MAX_RATING};

/// How the similarities of the neighbouring items enter the weighted average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weighting {
    /// All known similarities, normalised by the sum of their absolute values.
    Absolute,
    /// Only strictly positive similarities.
    Positive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionPolicy {
    /// Users with fewer rated items than this get no prediction.
    pub min_ratings_count: usize,
    pub weighting: Weighting,
    /// Restrict estimates to the rating scale [1,10].
    pub clamp: bool,
    /// Round estimates to the nearest integral rating.
    pub round: bool,
}

impl PredictionPolicy {

    pub fn new(min_ratings_count: usize) -> Self {
        PredictionPolicy {
            min_ratings_count,
            weighting: Weighting::Absolute,
            clamp: false,
            round: false,
        }
    }
}

/// Why no estimate could be made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unavailable {
    TooFewRatings,
    UnknownItem,
    NoSimilarItems,
    ZeroWeight,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prediction {
    Estimate(f64),
    Unavailable(Unavailable),
}

impl Prediction {

    pub fn estimate(&self) -> Option<f64> {
        match self {
            Prediction::Estimate(estimate) => Some(*estimate),
            Prediction::Unavailable(_) => None,
        }
    }
}

/// Estimates the rating of `user` for `item` as the similarity-weighted average of the user's
/// ratings on items with a known similarity to `item`.
pub fn predict(
    user: &str,
    item: &str,
    index: &RatingIndex,
    similarities: &SimilarityMatrix,
    policy: &PredictionPolicy,
) -> Prediction {

    let user_ratings = index.user_index(user).map(|user| index.user_ratings(user));
    let num_rated_items = user_ratings.map_or(0, |ratings| ratings.len());

    if num_rated_items < policy.min_ratings_count {
        return Prediction::Unavailable(Unavailable::TooFewRatings);
    }

    let user_ratings = match user_ratings {
        Some(ratings) => ratings,
        None => return Prediction::Unavailable(Unavailable::NoSimilarItems),
    };

    let item = match index.item_index(item) {
        Some(item) => item,
        None => return Prediction::Unavailable(Unavailable::UnknownItem),
    };

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    let mut num_neighbours = 0;

    for (other_item, rating) in user_ratings.iter() {

        if *other_item == item {
            continue;
        }

        let similarity = match similarities.get(ItemPair::new(item, *other_item)) {
            Some(similarity) => f64::from(similarity),
            None => continue,
        };

        if policy.weighting == Weighting::Positive && similarity <= 0.0 {
            continue;
        }

        weighted_sum += similarity * f64::from(*rating);
        total_weight += similarity.abs();
        num_neighbours += 1;
    }

    if num_neighbours == 0 {
        return Prediction::Unavailable(Unavailable::NoSimilarItems);
    }

    if total_weight == 0.0 {
        return Prediction::Unavailable(Unavailable::ZeroWeight);
    }

    let mut estimate = weighted_sum / total_weight;

    if policy.clamp {
        estimate = estimate.max(1.0).min(f64::from(MAX_RATING));
    }

    if policy.round {
        estimate = estimate.round();
    }

    Prediction::Estimate(estimate)
}
