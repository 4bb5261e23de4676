// Copyright (c) 2025, Tom Ouellette
// Licensed under the BSD 3-Clause License

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::SlideSegError;

/// Read an `option: value  # comment` parameter file
///
/// # Arguments
///
/// * `path` - Path to the parameter file
///
/// ```no_run
/// use slideseg_core::io::read_parameters;
/// let params = read_parameters("Parameters.txt").unwrap();
/// ```
pub fn read_parameters<P: AsRef<Path>>(
    path: P,
) -> Result<BTreeMap<String, String>, SlideSegError> {
    let path = path.as_ref();

    let text = std::fs::read_to_string(path)
        .map_err(|err| SlideSegError::IoError(format!("{}: {}", path.display(), err)))?;

    Ok(parse_parameters(&text))
}

/// Parse parameter file text into option/value pairs
///
/// Everything after the first `:` is the value, up to an optional `#`
/// comment. Blank lines and comment lines are skipped and later options
/// replace earlier ones.
///
/// # Examples
///
/// ```
/// use slideseg_core::io::parse_parameters;
///
/// let params = parse_parameters("size: 256  # chip size\n# ignored\nformat: jpg\n");
///
/// assert_eq!(params["size"], "256");
/// assert_eq!(params["format"], "jpg");
/// assert_eq!(params.len(), 2);
/// ```
pub fn parse_parameters(text: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (option, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.split('#').next().unwrap_or("").trim();

        params.insert(option.trim().to_string(), value.to_string());
    }

    params
}

/// Parse a yes/no style flag
///
/// Accepts `yes`, `true`, `t`, `y`, `1` and `no`, `false`, `f`, `n`, `0`
/// in any case.
pub fn parse_bool(value: &str) -> Result<bool, SlideSegError> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "true" | "t" | "y" | "1" => Ok(true),
        "no" | "false" | "f" | "n" | "0" => Ok(false),
        other => Err(SlideSegError::ConfigError(format!(
            "Expected a boolean but found \"{}\".",
            other
        ))),
    }
}
