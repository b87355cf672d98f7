//! Type definitions specific to the loader module.

use serde::Deserialize;
use std::fmt;
use std::num::ParseFloatError;
use std::path::PathBuf;
use thiserror::Error;

/// Number of pyramid levels written per block.
pub const LEVEL_COUNT: usize = 3;

/// One resolution tier of the coarse-to-fine solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum PyramidLevel {
    Level0,
    Level1,
    Level2,
}

impl PyramidLevel {
    pub const ALL: [PyramidLevel; LEVEL_COUNT] = [PyramidLevel::Level0, PyramidLevel::Level1, PyramidLevel::Level2];

    pub fn index(self) -> usize {
        match self {
            PyramidLevel::Level0 => 0,
            PyramidLevel::Level1 => 1,
            PyramidLevel::Level2 => 2,
        }
    }

    /// Line offset of this level's data line inside a 4-line block.
    pub fn block_offset(self) -> usize {
        self.index() + 1
    }
}

impl TryFrom<u8> for PyramidLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PyramidLevel::Level0),
            1 => Ok(PyramidLevel::Level1),
            2 => Ok(PyramidLevel::Level2),
            other => Err(format!("pyramid level {} out of range (0-{})", other, LEVEL_COUNT - 1)),
        }
    }
}

impl fmt::Display for PyramidLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "level {}", self.index())
    }
}

/// Errors raised while loading a losses log.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Log file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("Failed to read log file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Line {line_number}: invalid loss value {token:?}: {source}")]
    Parse {
        /// 1-based line number in the log.
        line_number: usize,
        token: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("No rows of the expected width were found for pyramid {level}")]
    EmptyLevel { level: PyramidLevel },
}

/// Losses of one pyramid level: rows are solver runs, columns are iterations.
#[derive(Debug, Clone, PartialEq)]
pub struct LossMatrix {
    data: Vec<f64>,
    rows: usize,
    columns: usize,
}

impl LossMatrix {
    /// Stack equally sized rows into a row-major matrix.
    ///
    /// Returns `None` when `rows` is empty or ragged.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Option<Self> {
        let columns = rows.first()?.len();
        if rows.iter().any(|row| row.len() != columns) {
            return None;
        }

        let row_count = rows.len();
        let data = rows.into_iter().flatten().collect();
        Some(Self {
            data,
            rows: row_count,
            columns,
        })
    }

    /// `(rows, columns)`, i.e. `(runs, iterations)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.columns)
    }

    pub fn row_count(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.columns == 0
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if index >= self.rows {
            return None;
        }
        let start = index * self.columns;
        Some(&self.data[start..start + self.columns])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks_exact(self.columns.max(1)).take(self.rows)
    }

    /// Mean of the last iteration's loss over all runs.
    pub fn mean_final_loss(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let sum: f64 = self.rows().filter_map(|row| row.last()).sum();
        Some(sum / self.rows as f64)
    }
}

/// Loss matrices of all three pyramid levels from one log.
#[derive(Debug, Clone)]
pub struct PyramidLosses {
    levels: [LossMatrix; LEVEL_COUNT],
    /// Per level, data lines dropped for having the wrong number of values.
    rejected_rows: [usize; LEVEL_COUNT],
}

impl PyramidLosses {
    pub fn new(levels: [LossMatrix; LEVEL_COUNT], rejected_rows: [usize; LEVEL_COUNT]) -> Self {
        Self { levels, rejected_rows }
    }

    pub fn level(&self, level: PyramidLevel) -> &LossMatrix {
        &self.levels[level.index()]
    }

    pub fn rejected_rows(&self, level: PyramidLevel) -> usize {
        self.rejected_rows[level.index()]
    }
}
