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

/// Both sequences must be non-empty and of equal length for any of the pairwise measures below.
fn check_pair(first: &[f64], second: &[f64]) -> Result<()> {
    if first.is_empty() || second.is_empty() {
        return Err(Error::EmptyInput("values"));
    }
    if first.len() != second.len() {
        return Err(Error::LengthMismatch { first: first.len(), second: second.len() });
    }
    Ok(())
}

pub fn mean_absolute_error(predictions: &[f64], actuals: &[f64]) -> Result<f64> {
    check_pair(predictions, actuals)?;

    let sum: f64 = predictions.iter()
        .zip(actuals.iter())
        .map(|(predicted, actual)| (predicted - actual).abs())
        .sum();

    Ok(sum / predictions.len() as f64)
}

pub fn root_mean_squared_error(predictions: &[f64], actuals: &[f64]) -> Result<f64> {
    check_pair(predictions, actuals)?;

    let sum: f64 = predictions.iter()
        .zip(actuals.iter())
        .map(|(predicted, actual)| (predicted - actual).powi(2))
        .sum();

    Ok((sum / predictions.len() as f64).sqrt())
}

pub fn dot_product(first: &[f64], second: &[f64]) -> Result<f64> {
    check_pair(first, second)?;
    Ok(first.iter().zip(second.iter()).map(|(a, b)| a * b).sum())
}

pub fn magnitude(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::EmptyInput("values"));
    }
    Ok(values.iter().map(|value| value * value).sum::<f64>().sqrt())
}

/// Cosine of the angle between two rating vectors. We refuse to divide by a zero magnitude
/// instead of handing back NaN, callers decide what an undefined similarity means for them.
pub fn cosine_similarity(first: &[f64], second: &[f64]) -> Result<f64> {
    let dot = dot_product(first, second)?;
    let norms = magnitude(first)? * magnitude(second)?;

    if norms == 0.0 {
        return Err(Error::ZeroMagnitude);
    }

    Ok(dot / norms)
}
