use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use wavejoin::{
    config::StudyConfig,
    discover::Waves,
    merge::JoinKind,
    output::{self, OutputFormat},
    pipeline,
    process::{utils::Delimiter, DuplicatePolicy},
    report,
};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Join multi-wave survey files on a respondent id"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discover, load and join every wave, then write the joined table
    Run {
        #[command(flatten)]
        study: StudyArgs,
        /// Print the exploratory summary after writing
        #[arg(long)]
        summary: bool,
    },
    /// Print the wave → file mapping without loading anything
    Discover {
        #[command(flatten)]
        study: StudyArgs,
    },
    /// Summarize a previously written table (TSV or Parquet)
    Summary {
        #[arg(long)]
        input: PathBuf,
        /// Token written for missing cells
        #[arg(long, default_value = "")]
        null_token: String,
    },
}

/// Study settings; flags override the YAML file given with `--config`.
#[derive(Args, Debug)]
struct StudyArgs {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    root: Option<PathBuf>,
    /// File stem shared by every wave, e.g. `indresp`
    #[arg(long)]
    pattern: Option<String>,
    /// Substring every input path must contain, matched below `--root`
    #[arg(long)]
    include: Option<String>,
    #[arg(long)]
    key: Option<String>,
    /// Wave letters in order, e.g. `abcdefg`
    #[arg(long)]
    waves: Option<Waves>,
    /// Base variable names, comma separated
    #[arg(long, value_delimiter = ',')]
    vars: Vec<String>,
    /// Numeric missing codes, comma separated
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    missing_codes: Option<Vec<f64>>,
    #[arg(long, value_enum)]
    join: Option<JoinKind>,
    #[arg(long, value_enum)]
    on_duplicate: Option<DuplicatePolicy>,
    #[arg(long, value_enum)]
    delimiter: Option<Delimiter>,
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    #[arg(long)]
    null_token: Option<String>,
}

impl StudyArgs {
    fn resolve(self) -> Result<StudyConfig> {
        let mut cfg = match &self.config {
            Some(path) => StudyConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => StudyConfig::default(),
        };
        if let Some(v) = self.root {
            cfg.root = v;
        }
        if let Some(v) = self.pattern {
            cfg.pattern = v;
        }
        if let Some(v) = self.include {
            cfg.include = v;
        }
        if let Some(v) = self.key {
            cfg.key = v;
        }
        if let Some(v) = self.waves {
            cfg.waves = v;
        }
        if !self.vars.is_empty() {
            cfg.variables = self.vars;
        }
        if let Some(v) = self.missing_codes {
            cfg.missing_codes = v;
        }
        if let Some(v) = self.join {
            cfg.join = v;
        }
        if let Some(v) = self.on_duplicate {
            cfg.on_duplicate = v;
        }
        if let Some(v) = self.delimiter {
            cfg.delimiter = v;
        }
        if let Some(v) = self.output {
            cfg.output = v;
        }
        if let Some(v) = self.format {
            cfg.format = v;
        }
        if let Some(v) = self.null_token {
            cfg.null_token = v;
        }
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    // ─── init logging ────────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run { study, summary } => {
            let cfg = study.resolve()?;
            let done = pipeline::run(&cfg)?;
            info!(
                output = %done.output.display(),
                manifest = %done.manifest.display(),
                "wrote joined table"
            );
            if summary {
                let s = report::summarize(&done.table, &cfg.waves)?;
                print!("{}", s.render());
            }
        }
        Command::Discover { study } => {
            let cfg = study.resolve()?;
            for f in pipeline::discover(&cfg)? {
                println!("{}\t{}\t{}", f.index, f.letter, f.path.display());
            }
        }
        Command::Summary { input, null_token } => {
            let table = output::read_table(&input, &null_token)
                .with_context(|| format!("reading {}", input.display()))?;
            let waves = report::waves_in(&table).unwrap_or_default();
            let s = report::summarize(&table, &waves)?;
            print!("{}", s.render());
        }
    }
    Ok(())
}
