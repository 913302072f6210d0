//! Safety utilities to prevent accidental overwrites.
//!
//! Reports are written next to the albums they describe, so a mistyped
//! `--output` could clobber an input file. These checks run before any
//! report is written.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

/// Validates that an output path is safe to overwrite.
///
/// Checks:
/// - Output must have a `.json` extension
/// - Output cannot be the same file as any of the provided source paths
///
/// # Arguments
/// * `output` - The report path that will be created/overwritten
/// * `source_paths` - Album files that must not match the output
///
/// # Returns
/// * `Ok(())` if the output path is safe
/// * `Err` with a descriptive message if the check fails
pub fn validate_output_path(output: &Path, source_paths: &[&Path]) -> Result<()> {
    let is_json = output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        bail!(
            "Safety check failed: output file '{}' must have a .json extension",
            output.display()
        );
    }

    let output_abs = absolute(output);
    for source in source_paths {
        if output == *source || output_abs == absolute(source) {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}

/// Validates that batch reports will not land in the input directory
/// under an album's own name.
pub fn validate_output_dir(output_dir: &Path, input_dir: &Path) -> Result<()> {
    if output_dir.exists() && !output_dir.is_dir() {
        bail!(
            "Safety check failed: output '{}' exists and is not a directory",
            output_dir.display()
        );
    }
    if absolute(output_dir) == absolute(input_dir) {
        bail!(
            "Safety check failed: output directory '{}' cannot be the input directory",
            output_dir.display()
        );
    }
    Ok(())
}

// Canonical path when the file exists, otherwise the path as given.
fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
