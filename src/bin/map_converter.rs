use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing_subscriber::EnvFilter;

use map_converter::{
    batch, walk_file, BatchConfig, BatchEvent, DecodeOptions, FileOutcome, SizeField,
    UnknownOpcodePolicy, REQUIRED_FIELDS,
};

#[derive(Parser)]
#[command(name = "map-converter")]
#[command(about = "Extract map metadata from compiled map containers into JSON")]
struct Args {
    /// Directory containing the map containers
    input: PathBuf,

    /// Output directory (default: <INPUT>/output)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Extension of input files
    #[arg(long, default_value = BatchConfig::DEFAULT_EXTENSION)]
    extension: String,

    /// Worker count (default: available cores)
    #[arg(long, short)]
    jobs: Option<usize>,

    /// Fail a file on any opcode the walker does not know instead of skipping it
    #[arg(long)]
    strict_opcodes: bool,

    /// How the container's size field is read
    #[arg(long, value_enum, default_value_t = SizeField::Payload)]
    size_field: SizeField,

    /// Print the raw assignments of a single file instead of running a batch
    #[arg(long, value_name = "FILE")]
    dump: Option<PathBuf>,
}

impl Args {
    fn decode_options(&self) -> DecodeOptions {
        DecodeOptions {
            size_field: self.size_field,
            unknown_opcodes: if self.strict_opcodes {
                UnknownOpcodePolicy::Strict
            } else {
                UnknownOpcodePolicy::Skip
            },
            ..Default::default()
        }
    }

    fn batch_config(&self) -> BatchConfig {
        let mut config = BatchConfig::new(&self.input);
        if let Some(output) = &self.output {
            config = config.with_output_dir(output);
        }
        if let Some(jobs) = self.jobs {
            config = config.with_workers(jobs);
        }
        config.extension = self.extension.trim_start_matches('.').to_string();
        config.decode = self.decode_options();
        config
    }
}

fn dump(path: &Path, options: &DecodeOptions) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = walk_file(path, options)?;
    println!("{}", serde_json::to_string_pretty(&outcome.assignments)?);
    eprintln!("{:?}", outcome.stats);
    for (name, kind) in REQUIRED_FIELDS {
        match outcome.assignments.get(name) {
            None => eprintln!("missing: {name}"),
            Some(v) if v.kind() != kind => eprintln!("wrong type: {name} is {}, expected {kind}", v.kind()),
            Some(_) => {}
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Some(path) = &args.dump {
        return dump(path, &args.decode_options());
    }

    let config = args.batch_config();
    let found = batch::collect_inputs(&config)
        .map_err(|e| format!("cannot read {}: {}", args.input.display(), e))?
        .len();
    println!("--------------------------");
    println!("Found {:>4} files to export", found);
    println!("--------------------------");

    let (event_tx, mut event_rx) = mpsc::channel(256);
    let (cancel_tx, cancel_rx) = watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, finishing files in progress...");
            let _ = cancel_tx.send(true);
        }
    });

    let run = tokio::spawn(batch::run_batch(config, event_tx, cancel_rx));

    let mut total = 0;
    let mut done = 0;
    while let Some(event) = event_rx.recv().await {
        match event {
            BatchEvent::Started { total: n } => total = n,
            BatchEvent::FileDone { input, outcome, .. } => {
                done += 1;
                if let FileOutcome::Failed(e) = outcome {
                    eprint!("\r");
                    println!("[ERROR] {}: {}", input.display(), e);
                }
                eprint!("\r[{done}/{total}]");
                let _ = std::io::stderr().flush();
            }
            BatchEvent::Finished(summary) => {
                eprintln!();
                println!("{summary}");
            }
        }
    }

    run.await??;
    Ok(())
}
