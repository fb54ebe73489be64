//! contackgen command line: generate, decode and schema subcommands

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use contackgen_capture::{AssemblyStats, CaptureStart, OutputFormat};
use contackgen_core::{GeneratorConfig, PcapGenerator};
use contackgen_schema::{AddressEncoding, Dataset, Disposition};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "contackgen", version, about = "Containerized attack capture to packet-feature datasets")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the attack scenario, retrieve the capture and write the dataset
    Generate {
        #[command(flatten)]
        options: DatasetOptions,

        /// Environment image
        #[arg(long)]
        image: Option<String>,

        /// Scenario window in seconds
        #[arg(long)]
        window_secs: Option<u64>,

        /// Host path for the retrieved capture
        #[arg(long)]
        artifact_path: Option<PathBuf>,
    },
    /// Decode an existing capture file
    Decode {
        /// Capture file to decode
        artifact: PathBuf,

        #[command(flatten)]
        options: DatasetOptions,

        /// Elapsed-time origin (RFC 3339); the first packet when omitted
        #[arg(long)]
        start_at: Option<DateTime<Utc>>,
    },
    /// Print the dataset attributes
    Schema {
        /// Configuration file (TOML, YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Encode addresses as concatenated octets
        #[arg(long)]
        concat_addresses: bool,
    },
}

#[derive(Debug, Args)]
struct DatasetOptions {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Maximum dataset rows
    #[arg(long)]
    max_rows: Option<usize>,

    /// Drop rows with absent fields instead of filling sentinels
    #[arg(long)]
    drop_incomplete: bool,

    /// Encode addresses as concatenated octets
    #[arg(long)]
    concat_addresses: bool,

    /// Output format: arff or jsonl
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Output file; stdout when omitted
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<GeneratorConfig> {
    match path {
        Some(path) => GeneratorConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(GeneratorConfig::new()),
    }
}

impl DatasetOptions {
    fn apply(&self, mut config: GeneratorConfig) -> GeneratorConfig {
        if let Some(max_rows) = self.max_rows {
            config = config.with_max_rows(max_rows);
        }
        if self.drop_incomplete {
            config = config.with_disposition(Disposition::DropRow);
        }
        if self.concat_addresses {
            config = config.with_address_encoding(AddressEncoding::ConcatenatedOctets);
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        config
    }

    fn sink(&self) -> anyhow::Result<Box<dyn Write>> {
        Ok(match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("creating {}", path.display()))?,
            )),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        })
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn emit(
    generator: &PcapGenerator,
    options: &DatasetOptions,
    dataset: &Dataset,
    stats: AssemblyStats,
) -> anyhow::Result<()> {
    generator.write(dataset, generator.config().format, options.sink()?)?;
    tracing::info!(
        rows = dataset.len(),
        dropped = stats.dropped,
        fingerprint = %dataset.fingerprint(),
        "dataset written"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Generate {
            options,
            image,
            window_secs,
            artifact_path,
        } => {
            let mut config = options.apply(load_config(options.config.as_ref())?);
            if let Some(image) = image {
                config = config.with_image(image);
            }
            if let Some(secs) = window_secs {
                config = config.with_window_secs(secs);
            }
            if let Some(path) = artifact_path {
                config = config.with_artifact_path(path);
            }

            let mut generator = PcapGenerator::new(config);
            generator.define_schema()?;
            let generated = match generator.generate().await {
                Ok(generated) => generated,
                Err(err) => {
                    let stage = err.stage();
                    return Err(anyhow::Error::new(err).context(format!("{stage} failed")));
                }
            };
            tracing::info!(
                run_id = %generated.session.run_id,
                artifact = %generated.session.artifact_path.display(),
                "capture session complete"
            );
            emit(&generator, &options, &generated.dataset, generated.stats)?;
        }
        Command::Decode {
            artifact,
            options,
            start_at,
        } => {
            let config = options.apply(load_config(options.config.as_ref())?);
            let mut generator = PcapGenerator::new(config);
            generator.define_schema()?;

            let start = start_at.map_or(CaptureStart::FirstPacket, CaptureStart::At);
            let decoded = generator
                .decode(&artifact, start)
                .with_context(|| format!("decoding {}", artifact.display()))?;
            emit(&generator, &options, &decoded.dataset, decoded.stats)?;
        }
        Command::Schema {
            config,
            concat_addresses,
        } => {
            let mut config = load_config(config.as_ref())?;
            if concat_addresses {
                config = config.with_address_encoding(AddressEncoding::ConcatenatedOctets);
            }
            let schema = config.schema()?;
            let mut out = io::stdout().lock();
            for field in schema.fields() {
                writeln!(out, "{}\t{}", field.name(), field.domain())?;
            }
        }
    }

    Ok(())
}
