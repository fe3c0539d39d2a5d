use std::path::{Path, PathBuf};

/// How the container's declared size field is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SizeField {
    /// The field is the exact length of the inflated payload.
    #[default]
    Payload,
    /// The field is the total file length including the 8-byte header (SWF `FileLength`).
    FileLength,
}

/// What the walker does with a byte that has no row in the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum UnknownOpcodePolicy {
    /// Treat it as a 1-byte opcode and continue.
    #[default]
    Skip,
    /// Abort the file with `UnknownOpcode`.
    Strict,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    pub size_field: SizeField,
    pub unknown_opcodes: UnknownOpcodePolicy,
    /// Upper bound on the declared size accepted before inflating.
    pub max_decoded_size: usize,
}

impl DecodeOptions {
    pub const DEFAULT_MAX_DECODED_SIZE: usize = 64 * 1024 * 1024;
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            size_field: SizeField::default(),
            unknown_opcodes: UnknownOpcodePolicy::default(),
            max_decoded_size: Self::DEFAULT_MAX_DECODED_SIZE,
        }
    }
}

/// Settings for one batch run over a directory.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Input file extension, without the dot; compared case-insensitively.
    pub extension: String,
    pub workers: usize,
    pub decode: DecodeOptions,
}

impl BatchConfig {
    pub const DEFAULT_EXTENSION: &'static str = "swf";
    pub const OUTPUT_DIR_NAME: &'static str = "output";
    pub const ERROR_LOG_NAME: &'static str = "errors.log";

    /// Defaults: `<input>/output`, `.swf` files, one worker per core.
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        let input_dir = input_dir.into();
        let output_dir = input_dir.join(Self::OUTPUT_DIR_NAME);
        Self {
            input_dir,
            output_dir,
            extension: Self::DEFAULT_EXTENSION.to_string(),
            workers: default_workers(),
            decode: DecodeOptions::default(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.output_dir.join(Self::ERROR_LOG_NAME)
    }

    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension))
    }
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
