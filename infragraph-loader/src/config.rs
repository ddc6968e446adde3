use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use infragraph_rs::{StoreConfig, WriterConfig};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Text,
}

/// Load a structured inventory export into the graph store.
#[derive(Debug, Clone, Parser)]
#[command(name = "infragraph-loader", version, about)]
pub struct Args {
    /// Inventory file, one row per server: CSV, or a workbook (`.xlsx` and friends).
    #[arg(env = "STRUCTURED_DATA_PATH")]
    pub input: PathBuf,

    /// Rows per transaction. Overrides `BATCH_SIZE`.
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Write to an in-memory graph instead of Neo4j.
    #[arg(long)]
    pub dry_run: bool,

    /// Do not create unique constraints before writing.
    #[arg(long)]
    pub skip_constraints: bool,

    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    pub summary_json: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

/// Loader configuration: command-line arguments plus environment settings.
#[derive(Debug, Clone)]
pub struct Config {
    /// Inventory file. Canonical after [`Config::validate_input`].
    pub input: PathBuf,
    pub writer: WriterConfig,
    /// `None` for dry runs, which never touch the store.
    pub store: Option<StoreConfig>,
    pub skip_constraints: bool,
    pub summary_json: bool,
}

impl Config {
    /// Merge parsed arguments with `WriterConfig` / `StoreConfig` from the
    /// environment.
    ///
    /// # Errors
    /// Returns an error if an environment setting is invalid, if `--batch-size` is
    /// zero, or if store credentials are missing outside a dry run.
    pub fn from_args(args: Args) -> anyhow::Result<Self> {
        let mut writer = WriterConfig::from_env()?;
        if let Some(batch_size) = args.batch_size {
            writer.batch_size = batch_size;
            writer = writer.checked()?;
        }

        let store = if args.dry_run {
            None
        } else {
            Some(StoreConfig::from_env()?)
        };

        Ok(Config {
            input: args.input,
            writer,
            store,
            skip_constraints: args.skip_constraints,
            summary_json: args.summary_json,
        })
    }

    pub fn dry_run(&self) -> bool {
        self.store.is_none()
    }

    /// Validate that the input path exists and is a regular file, then
    /// canonicalize it.
    pub async fn validate_input(&mut self) -> anyhow::Result<()> {
        let meta = tokio::fs::metadata(&self.input).await.map_err(|e| {
            anyhow::anyhow!("Cannot access input file '{}': {}", self.input.display(), e)
        })?;

        if !meta.is_file() {
            anyhow::bail!("Input path is not a file: {}", self.input.display());
        }

        self.input = tokio::fs::canonicalize(&self.input).await.map_err(|e| {
            anyhow::anyhow!(
                "Cannot canonicalize input path '{}': {}",
                self.input.display(),
                e
            )
        })?;

        Ok(())
    }
}
