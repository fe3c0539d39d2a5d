use std::path::{Path, PathBuf};

use crate::config::BatchConfig;
use crate::error::Result;
use crate::record::MapRecord;

/// Regular files in the input directory with the configured extension, sorted by path.
pub fn collect_inputs(config: &BatchConfig) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();
    for entry in std::fs::read_dir(&config.input_dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && config.matches_extension(&path) {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// `<output_dir>/<input stem>.json`
pub fn output_path(output_dir: &Path, input: &Path) -> PathBuf {
    let mut name = input.file_stem().unwrap_or(input.as_os_str()).to_os_string();
    name.push(".json");
    output_dir.join(name)
}

pub fn write_record(path: &Path, record: &MapRecord) -> Result<()> {
    let json = serde_json::to_string(record)?;
    std::fs::write(path, json)?;
    Ok(())
}
