//! Read a losses log and split it into per-level loss matrices.
//!
//! The log is a sequence of 4-line blocks, one block per solver invocation:
//!
//! ```text
//! <header line, ignored>
//! <level 0 losses>
//! <level 1 losses>
//! <level 2 losses>
//! ```

use std::io::ErrorKind;
use std::path::Path;

use crate::config::{BlockBoundary, LoaderConfig};

use super::row_parser::{is_accepted_row, parse_loss_row};
use super::types::{LEVEL_COUNT, LoadError, LossMatrix, PyramidLevel, PyramidLosses};

/// Lines per block: one header plus one data line per level.
const BLOCK_LINES: usize = LEVEL_COUNT + 1;

/// Load a losses log from disk.
///
/// # Parameters
///
/// * `path` - Path to the log file
/// * `config` - Row width and block boundary rules
///
/// # Returns
///
/// The three loss matrices, or the first error encountered.
pub fn load_losses_log(path: &Path, config: &LoaderConfig) -> Result<PyramidLosses, LoadError> {
    let content = read_log(path)?;
    log::debug!("Read {} bytes from {}", content.len(), path.display());

    let losses = parse_losses_log(&content, config)?;
    for level in PyramidLevel::ALL {
        let matrix = losses.level(level);
        let (rows, columns) = matrix.shape();
        log::info!(
            "Pyramid {}: {} runs x {} iterations ({} rows dropped), mean final loss {:.6}",
            level,
            rows,
            columns,
            losses.rejected_rows(level),
            matrix.mean_final_loss().unwrap_or(f64::NAN)
        );
    }
    Ok(losses)
}

/// Start indices of the blocks that are parsed for a log of `line_count` lines.
pub fn block_starts(line_count: usize, boundary: BlockBoundary) -> impl Iterator<Item = usize> {
    let end = match boundary {
        // Starts strictly below `line_count - 4`, which leaves the last block unread.
        BlockBoundary::Legacy => line_count.saturating_sub(BLOCK_LINES),
        BlockBoundary::Inclusive => (line_count + 1).saturating_sub(BLOCK_LINES),
    };
    (0..end).step_by(BLOCK_LINES)
}

fn read_log(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => LoadError::FileNotFound { path: path.to_path_buf() },
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Parse losses log text that is already in memory.
pub fn parse_losses_log(content: &str, config: &LoaderConfig) -> Result<PyramidLosses, LoadError> {
    let lines: Vec<&str> = content.lines().collect();
    let mut accepted: [Vec<Vec<f64>>; LEVEL_COUNT] = Default::default();
    let mut rejected = [0usize; LEVEL_COUNT];

    for start in block_starts(lines.len(), config.block_boundary) {
        for level in PyramidLevel::ALL {
            let line_index = start + level.block_offset();
            let row = parse_loss_row(lines[line_index]).map_err(|invalid| LoadError::Parse {
                line_number: line_index + 1,
                token: invalid.token,
                source: invalid.source,
            })?;

            if is_accepted_row(&row, config.row_width) {
                accepted[level.index()].push(row);
            } else {
                log::trace!("Dropping {} row at line {} with {} values", level, line_index + 1, row.len());
                rejected[level.index()] += 1;
            }
        }
    }

    let [level0, level1, level2] = accepted;
    let levels = [
        stack_level(PyramidLevel::Level0, level0)?,
        stack_level(PyramidLevel::Level1, level1)?,
        stack_level(PyramidLevel::Level2, level2)?,
    ];
    Ok(PyramidLosses::new(levels, rejected))
}

fn stack_level(level: PyramidLevel, rows: Vec<Vec<f64>>) -> Result<LossMatrix, LoadError> {
    LossMatrix::from_rows(rows).ok_or(LoadError::EmptyLevel { level })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use test_case::test_case;

    fn data_line(values: &[f64]) -> String {
        let mut line = String::new();
        for value in values {
            line.push_str(&value.to_string());
            line.push(' ');
        }
        line
    }

    fn block(level0: &[f64], level1: &[f64], level2: &[f64]) -> String {
        format!(
            "--- frame ---\n{}\n{}\n{}\n",
            data_line(level0),
            data_line(level1),
            data_line(level2)
        )
    }

    fn uniform_block(value: f64, width: usize) -> String {
        let row = vec![value; width];
        block(&row, &row, &row)
    }

    fn inclusive() -> LoaderConfig {
        LoaderConfig {
            block_boundary: BlockBoundary::Inclusive,
            ..LoaderConfig::default()
        }
    }

    #[test_case(0, BlockBoundary::Legacy, vec![] ; "legacy empty")]
    #[test_case(4, BlockBoundary::Legacy, vec![] ; "legacy one block")]
    #[test_case(8, BlockBoundary::Legacy, vec![0] ; "legacy two blocks")]
    #[test_case(9, BlockBoundary::Legacy, vec![0, 4] ; "legacy two blocks plus one line")]
    #[test_case(10, BlockBoundary::Legacy, vec![0, 4] ; "legacy two blocks plus two lines")]
    #[test_case(3, BlockBoundary::Inclusive, vec![] ; "inclusive partial")]
    #[test_case(4, BlockBoundary::Inclusive, vec![0] ; "inclusive one block")]
    #[test_case(11, BlockBoundary::Inclusive, vec![0, 4] ; "inclusive partial tail")]
    #[test_case(12, BlockBoundary::Inclusive, vec![0, 4, 8] ; "inclusive three blocks")]
    fn test_block_starts(line_count: usize, boundary: BlockBoundary, expected: Vec<usize>) {
        let starts: Vec<usize> = block_starts(line_count, boundary).collect();
        assert_eq!(starts, expected);
    }

    #[test]
    fn test_single_block_inclusive() {
        let losses = parse_losses_log(&uniform_block(0.5, 60), &inclusive()).unwrap();
        for level in PyramidLevel::ALL {
            assert_eq!(losses.level(level).shape(), (1, 60));
        }
    }

    #[test]
    fn test_single_block_legacy_is_never_parsed() {
        let result = parse_losses_log(&uniform_block(0.5, 60), &LoaderConfig::default());
        assert!(matches!(
            result,
            Err(LoadError::EmptyLevel {
                level: PyramidLevel::Level0
            })
        ));
    }

    #[test]
    fn test_levels_follow_line_position() {
        let content = block(&[1.0; 60], &[2.0; 60], &[3.0; 60]);
        let losses = parse_losses_log(&content, &inclusive()).unwrap();
        assert_eq!(losses.level(PyramidLevel::Level0).row(0).unwrap()[0], 1.0);
        assert_eq!(losses.level(PyramidLevel::Level1).row(0).unwrap()[0], 2.0);
        assert_eq!(losses.level(PyramidLevel::Level2).row(0).unwrap()[0], 3.0);
    }

    #[test]
    fn test_short_row_is_dropped() {
        let mut content = uniform_block(1.0, 60);
        content.push_str(&block(&[2.0; 59], &[2.0; 60], &[2.0; 60]));
        content.push_str(&uniform_block(3.0, 60));

        let losses = parse_losses_log(&content, &inclusive()).unwrap();
        let level0 = losses.level(PyramidLevel::Level0);
        assert_eq!(level0.shape(), (2, 60));
        assert_eq!(level0.row(0).unwrap()[0], 1.0);
        assert_eq!(level0.row(1).unwrap()[0], 3.0);
        assert_eq!(losses.rejected_rows(PyramidLevel::Level0), 1);
        assert_eq!(losses.level(PyramidLevel::Level1).shape(), (3, 60));
        assert_eq!(losses.rejected_rows(PyramidLevel::Level1), 0);
    }

    #[test]
    fn test_non_numeric_token_fails() {
        let mut content = uniform_block(1.0, 60);
        let mut tokens: Vec<String> = (0..60).map(|_| "0.5".to_string()).collect();
        tokens[17] = "nope".to_string();
        content.push_str(&format!("header\n{} \n{}\n{}\n", tokens.join(" "), data_line(&[1.0; 60]), data_line(&[1.0; 60])));

        let result = parse_losses_log(&content, &inclusive());
        match result {
            Err(LoadError::Parse { line_number, token, .. }) => {
                assert_eq!(line_number, 6);
                assert_eq!(token, "nope");
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_token_fails_even_in_wrong_width_row() {
        let content = format!("{}{}", block(&[1.0; 60], &[1.0; 60], &[1.0; 60]), "h\n1.0 x \n1.0 \n1.0 \n");
        let result = parse_losses_log(&content, &inclusive());
        assert!(matches!(result, Err(LoadError::Parse { line_number: 6, .. })));
    }

    #[test]
    fn test_empty_level_is_reported() {
        let content = block(&[1.0; 60], &[1.0; 60], &[1.0; 12]);
        let result = parse_losses_log(&content, &inclusive());
        assert!(matches!(
            result,
            Err(LoadError::EmptyLevel {
                level: PyramidLevel::Level2
            })
        ));
    }

    #[test]
    fn test_legacy_boundary_with_trailing_lines() {
        // Three full blocks plus two extra lines: starts 0, 4, 8 are all below 14 - 4.
        let mut content = String::new();
        for value in [1.0, 2.0, 3.0] {
            content.push_str(&uniform_block(value, 60));
        }
        content.push_str("header\n");
        content.push_str(&data_line(&[4.0; 60]));
        content.push('\n');

        let losses = parse_losses_log(&content, &LoaderConfig::default()).unwrap();
        let level0 = losses.level(PyramidLevel::Level0);
        assert_eq!(level0.row_count(), 3);
        assert_eq!(level0.row(2).unwrap()[0], 3.0);
    }

    #[test]
    fn test_legacy_boundary_skips_last_block_on_exact_multiple() {
        let mut content = String::new();
        for value in [1.0, 2.0, 3.0] {
            content.push_str(&uniform_block(value, 60));
        }

        let losses = parse_losses_log(&content, &LoaderConfig::default()).unwrap();
        let level0 = losses.level(PyramidLevel::Level0);
        assert_eq!(level0.row_count(), 2);
        assert_eq!(level0.row(1).unwrap()[0], 2.0);
    }

    #[test]
    fn test_every_row_has_configured_width() {
        let mut content = String::new();
        for width in [60, 58, 60, 61, 60, 0, 60] {
            content.push_str(&uniform_block(0.75, width));
        }
        let losses = parse_losses_log(&content, &LoaderConfig::default()).unwrap();
        for level in PyramidLevel::ALL {
            let matrix = losses.level(level);
            assert!(matrix.row_count() <= 6);
            assert!(matrix.rows().all(|row| row.len() == 60));
        }
        assert_eq!(losses.level(PyramidLevel::Level0).row_count(), 3);
        assert_eq!(losses.rejected_rows(PyramidLevel::Level0), 3);
    }

    #[test]
    fn test_constant_level_over_120_blocks() {
        let c = 0.031_25;
        let mut content = String::new();
        for i in 0..120 {
            content.push_str(&block(&[c; 60], &[i as f64; 60], &[1.0; 60]));
        }

        let losses = parse_losses_log(&content, &inclusive()).unwrap();
        let level0 = losses.level(PyramidLevel::Level0);
        assert_eq!(level0.shape(), (120, 60));
        assert!(level0.rows().flatten().all(|&v| v == c));

        // The legacy boundary needs one more line to reach the 120th block.
        content.push_str("end\n");
        let losses = parse_losses_log(&content, &LoaderConfig::default()).unwrap();
        assert_eq!(losses.level(PyramidLevel::Level0).shape(), (120, 60));
    }

    #[test]
    fn test_crlf_line_endings() {
        let content = uniform_block(2.0, 60).replace('\n', "\r\n");
        let losses = parse_losses_log(&content, &inclusive()).unwrap();
        assert_eq!(losses.level(PyramidLevel::Level2).shape(), (1, 60));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for value in [1.0, 2.0, 3.0] {
            file.write_all(uniform_block(value, 60).as_bytes()).unwrap();
        }
        file.flush().unwrap();

        let losses = load_losses_log(file.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(losses.level(PyramidLevel::Level1).shape(), (2, 60));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_losses_log(&dir.path().join("missing.log"), &LoaderConfig::default());
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }
}
