//! Input sequence loading
//!
//! Values are whitespace-separated integers, one or more per line. `#`
//! starts a comment that runs to the end of the line. The whole source is
//! parsed before anything touches the device.

use crate::error::InputError;
use std::fs;
use std::path::Path;

/// Read and parse a value file.
pub fn read_values(path: &Path) -> Result<Vec<i64>, InputError> {
    let content = fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    parse_values(&content, &path.display().to_string())
}

/// Parse value text; `origin` names the source in error messages.
pub fn parse_values(content: &str, origin: &str) -> Result<Vec<i64>, InputError> {
    let mut values = Vec::new();

    for (line_idx, line) in content.lines().enumerate() {
        let data = line.split('#').next().unwrap_or("");
        for token in data.split_whitespace() {
            let value = token.parse::<i64>().map_err(|_| InputError::Parse {
                origin: origin.to_string(),
                line: line_idx + 1,
                token: token.to_string(),
            })?;
            values.push(value);
        }
    }

    if values.is_empty() {
        return Err(InputError::Empty {
            origin: origin.to_string(),
        });
    }

    log::debug!("{}: {} values", origin, values.len());
    Ok(values)
}

/// Validate values supplied directly on the command line.
pub fn inline_values(values: &[i64]) -> Result<Vec<i64>, InputError> {
    if values.is_empty() {
        return Err(InputError::Empty {
            origin: "command line".to_string(),
        });
    }
    Ok(values.to_vec())
}
