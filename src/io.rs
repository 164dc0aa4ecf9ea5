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

use std::borrow::Cow;
use std::fs::File;
use std::io::prelude::*;
use std::io::stdout;
use std::path::Path;

use serde_derive::Serialize;

use crate::error::{Error, Result};
use crate::types::{Rating, RatingRecord, MAX_RATING};
use crate::validation::{Report, Summary};

/// Layout of the ratings file. The defaults match the Book-Crossing dump, where every field is
/// quoted and separated by semicolons: `"276725";"034545104X";"0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    pub delimiter: u8,
    pub quote: u8,
    pub escape: Option<u8>,
    pub has_headers: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions {
            delimiter: b';',
            quote: b'"',
            escape: Some(b'\\'),
            has_headers: true,
        }
    }
}

fn reader_builder(options: &ReaderOptions) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();

    builder
        .delimiter(options.delimiter)
        .quote(options.quote)
        .escape(options.escape)
        .has_headers(options.has_headers)
        .trim(csv::Trim::All)
        .flexible(true);

    if options.escape.is_some() {
        builder.double_quote(false);
    }

    builder
}

pub fn csv_reader<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<csv::Reader<File>> {
    Ok(reader_builder(options).from_path(path)?)
}

pub fn csv_reader_from<R: Read>(input: R, options: &ReaderOptions) -> csv::Reader<R> {
    reader_builder(options).from_reader(input)
}

/// Decodes `user, item, rating` triples. Empty fields are dropped before we pick the first three,
/// and bytes which are not valid UTF-8 are replaced, as older dumps are latin-1 encoded.
pub fn ratings_from_csv<'a, R>(
    reader: &'a mut csv::Reader<R>
) -> impl Iterator<Item=Result<RatingRecord>> + 'a
    where R: Read {

    reader.byte_records()
        .map(|result| {
            let record = result?;
            let line = record.position().map_or(0, |position| position.line());

            let fields: Vec<Cow<str>> = record.iter()
                .filter(|field| !field.is_empty())
                .map(String::from_utf8_lossy)
                .collect();

            if fields.len() < 3 {
                return Err(Error::MalformedRecord { line, num_fields: fields.len() });
            }

            let rating = parse_rating(&fields[2], line)?;

            Ok(RatingRecord::new(&fields[0], &fields[1], rating))
        })
}

fn parse_rating(value: &str, line: u64) -> Result<Rating> {
    match value.parse::<Rating>() {
        Ok(rating) if rating <= MAX_RATING => Ok(rating),
        _ => Err(Error::InvalidRating { line, value: value.to_string() }),
    }
}

pub fn read_ratings<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Vec<RatingRecord>> {
    let mut reader = csv_reader(path, options)?;
    let ratings: Result<Vec<RatingRecord>> = ratings_from_csv(&mut reader).collect();
    ratings
}

/// Last line of the report. Field names will be used in JSON.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Totals<'a> {
    seed: u64,
    num_ratings_read: usize,
    num_ratings_kept: usize,
    summary: &'a Summary,
}

/// Output the per-fold results and the summary as one JSON object per line. If a `report_path`
/// is supplied, we write to a file at the specified path, otherwise, we output to stdout.
pub fn write_report(report: &Report, report_path: Option<String>) -> Result<()> {

    let mut out: Box<dyn Write> = match report_path {
        Some(path) => Box::new(File::create(&Path::new(&path))?),
        _ => Box::new(stdout())
    };

    for fold in report.folds.iter() {
        writeln!(out, "{}", serde_json::to_string(fold)?)?;
    }

    let totals = Totals {
        seed: report.seed,
        num_ratings_read: report.num_ratings_read,
        num_ratings_kept: report.num_ratings_kept,
        summary: &report.summary,
    };

    writeln!(out, "{}", serde_json::to_string(&totals)?)?;

    Ok(())
}


#[cfg(test)]
mod tests {

    use std::env;
    use std::fs;
    use std::process;

    use serde_json::Value;

    use crate::error::Error;
    use crate::io::{self, ReaderOptions};
    use crate::types::RatingRecord;
    use crate::validation::{self, FoldResult, Report};

    fn read(input: &str, options: &ReaderOptions) -> Result<Vec<RatingRecord>, Error> {
        let mut reader = io::csv_reader_from(input.as_bytes(), options);
        let ratings: Result<Vec<RatingRecord>, Error> = io::ratings_from_csv(&mut reader).collect();
        ratings
    }

    #[test]
    fn book_crossing_layout() {
        let input = "\"User-ID\";\"ISBN\";\"Book-Rating\"\n\
                     \"276725\";\"034545104X\";\"0\"\n\
                     \"276726\";\"0155061224\";\"5\"\n";

        let records = read(input, &ReaderOptions::default()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], RatingRecord::new("276725", "034545104x", 0));
        assert_eq!(records[1].user, "276726");
        assert_eq!(records[1].rating, 5);
    }

    #[test]
    fn empty_fields_are_omitted() {
        let input = "user;item;rating\nalice;;apple;;7\n";

        let records = read(input, &ReaderOptions::default()).unwrap();

        assert_eq!(records, vec![RatingRecord::new("alice", "apple", 7)]);
    }

    #[test]
    fn configurable_delimiter() {
        let options = ReaderOptions { delimiter: b'\t', ..ReaderOptions::default() };
        let input = "user\titem\trating\nBob\tPony\t10\n";

        let records = read(input, &options).unwrap();

        assert_eq!(records, vec![RatingRecord::new("bob", "pony", 10)]);
    }

    #[test]
    fn non_numeric_rating_is_an_error() {
        let input = "user;item;rating\nalice;apple;7\nbob;pony;great\n";

        match read(input, &ReaderOptions::default()) {
            Err(Error::InvalidRating { line, value }) => {
                assert_eq!(line, 3);
                assert_eq!(value, "great");
            }
            other => panic!("expected InvalidRating, got {:?}", other),
        }
    }

    #[test]
    fn out_of_scale_rating_is_an_error() {
        let input = "user;item;rating\nalice;apple;11\n";
        assert!(read(input, &ReaderOptions::default()).is_err());

        let input = "user;item;rating\nalice;apple;-1\n";
        assert!(read(input, &ReaderOptions::default()).is_err());
    }

    #[test]
    fn missing_fields_are_an_error() {
        let input = "user;item;rating\nalice;apple\n";

        match read(input, &ReaderOptions::default()) {
            Err(Error::MalformedRecord { num_fields: 2, .. }) => {}
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn report_is_written_as_json_lines() {
        let folds = vec![
            FoldResult {
                fold_index: 0,
                mean_absolute_error: Some(0.5),
                root_mean_squared_error: Some(0.75),
                prediction_count: 4,
                skipped_count: 1,
            },
            FoldResult {
                fold_index: 1,
                mean_absolute_error: None,
                root_mean_squared_error: None,
                prediction_count: 0,
                skipped_count: 5,
            },
        ];
        let summary = validation::aggregate(&folds);
        let report = Report { seed: 3, num_ratings_read: 12, num_ratings_kept: 10, folds, summary };

        let path = env::temp_dir().join(format!("itemcf-report-{}.json", process::id()));
        io::write_report(&report, Some(path.to_string_lossy().into_owned())).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).unwrap();

        let lines: Vec<Value> = written.lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["foldIndex"], 0);
        assert_eq!(lines[0]["meanAbsoluteError"], 0.5);
        assert!(lines[1]["rootMeanSquaredError"].is_null());
        assert_eq!(lines[2]["seed"], 3);
        assert_eq!(lines[2]["numRatingsKept"], 10);
        assert_eq!(lines[2]["summary"]["evaluatedFolds"], 1);
        assert_eq!(lines[2]["summary"]["skippedCount"], 6);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = io::read_ratings("/nonexistent/ratings.csv", &ReaderOptions::default());
        assert!(result.is_err());
    }
}
