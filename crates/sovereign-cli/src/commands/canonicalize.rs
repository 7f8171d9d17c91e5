//! Canonicalize command implementation.

use serde_json::Value;
use sovereign_canonical::Canonicalizer;
use std::io::{self, Read};
use std::path::PathBuf;

pub fn run(input: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let json_str = match input {
        Some(path) => std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read file {}: {}", path.display(), e))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let value: Value =
        serde_json::from_str(&json_str).map_err(|e| format!("Invalid JSON: {}", e))?;

    let canonical = Canonicalizer::new()
        .canonicalize_to_string(&value)
        .map_err(|e| format!("Canonicalization failed: {}", e))?;

    println!("{}", canonical);
    Ok(())
}
