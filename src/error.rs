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

use std::error;
use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a validation run. Insufficient data for a single prediction is not
/// an error, see `predict::Prediction`.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),

    /// A configuration option violates its constraint.
    InvalidConfiguration {
        option: &'static str,
        value: String,
        constraint: &'static str,
    },

    /// A ratings line with fewer than three non-empty fields.
    MalformedRecord { line: u64, num_fields: usize },

    /// A rating field that is not an integer in [0,10].
    InvalidRating { line: u64, value: String },

    /// A computation received no input where at least one element is required.
    EmptyInput(&'static str),

    /// Two sequences which must be of equal length are not.
    LengthMismatch { first: usize, second: usize },

    /// Cosine similarity over a vector of magnitude zero.
    ZeroMagnitude,

    /// The same (user, item) pair was rated twice within one training set.
    DuplicateRating { user: String, item: String },

    /// A fold did not report a result, which happens if its worker panicked.
    FoldNotEvaluated(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Csv(err) => write!(f, "CSV error: {}", err),
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::InvalidConfiguration { option, value, constraint } => write!(
                f,
                "invalid configuration: {}={} (expected {})",
                option, value, constraint
            ),
            Error::MalformedRecord { line, num_fields } => write!(
                f,
                "malformed record on line {}: expected user, item and rating, found {} fields",
                line, num_fields
            ),
            Error::InvalidRating { line, value } => write!(
                f,
                "invalid rating '{}' on line {}: expected an integer between 0 and 10",
                value, line
            ),
            Error::EmptyInput(what) => write!(f, "{} must not be empty", what),
            Error::LengthMismatch { first, second } => write!(
                f,
                "both sequences must be of equal length, found {} and {}",
                first, second
            ),
            Error::ZeroMagnitude => write!(f, "cosine similarity is undefined for zero vectors"),
            Error::DuplicateRating { user, item } => {
                write!(f, "user '{}' rated item '{}' more than once", user, item)
            }
            Error::FoldNotEvaluated(fold) => write!(f, "fold {} was not evaluated", fold),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Csv(err) => Some(err),
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Csv(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
