//! # Log-Likelihood Input
//!
//! Reads pointwise log-likelihood draws from delimited text, in the layout
//! written by Stan and most other samplers: one row per posterior draw, one
//! column per quantity, a header row, and optional `#` comment lines. Only the
//! columns whose name starts with a given prefix (`log_lik` by default, matching
//! `log_lik.1`, `log_lik.2`, ...) are kept, in file order.

use ndarray::Array2;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Column prefix used by the conventional `log_lik` generated quantity.
pub const DEFAULT_LOG_LIK_PREFIX: &str = "log_lik";

/// Error type for reading log-likelihood draws.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Malformed CSV input: {0}")]
    CsvError(#[from] csv::Error),
    #[error("No column whose name starts with '{0}' was found in the input.")]
    MissingColumns(String),
    #[error("Could not parse '{value}' in column '{column}' of draw {draw} as a number.")]
    InvalidValue {
        draw: usize,
        column: String,
        value: String,
    },
    #[error("At least two posterior draws are required, but the input contains {0}.")]
    TooFewDraws(usize),
    #[error("The draws do not form a draws × observations matrix: {0}")]
    ShapeError(#[from] ndarray::ShapeError),
}

/// Loads a draws × observations log-likelihood matrix from a CSV file.
pub fn load_log_lik_csv(path: impl AsRef<Path>, prefix: &str) -> Result<Array2<f64>, DataError> {
    let file = File::open(path)?;
    read_log_lik_csv(file, prefix)
}

/// Reads a draws × observations log-likelihood matrix from CSV text.
pub fn read_log_lik_csv<R: Read>(reader: R, prefix: &str) -> Result<Array2<f64>, DataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let selected: Vec<(usize, String)> = csv_reader
        .headers()?
        .iter()
        .enumerate()
        .filter(|(_, name)| name.starts_with(prefix))
        .map(|(index, name)| (index, name.to_string()))
        .collect();
    if selected.is_empty() {
        return Err(DataError::MissingColumns(prefix.to_string()));
    }

    let mut values = Vec::new();
    let mut n_draws = 0;
    for record in csv_reader.records() {
        let record = record?;
        n_draws += 1;
        for (index, name) in &selected {
            // Records have the header's length; the reader rejects ragged rows.
            let raw = &record[*index];
            let value = raw.parse::<f64>().map_err(|_| DataError::InvalidValue {
                draw: n_draws,
                column: name.clone(),
                value: raw.to_string(),
            })?;
            values.push(value);
        }
    }

    if n_draws <= 1 {
        return Err(DataError::TooFewDraws(n_draws));
    }
    log::debug!(
        "Read {n_draws} draws of {} '{prefix}' columns",
        selected.len()
    );
    Ok(Array2::from_shape_vec((n_draws, selected.len()), values)?)
}
