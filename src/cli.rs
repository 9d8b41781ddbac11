use crate::consensus::{CoverageFallback, Strategy};
use crate::utils::Result;
use clap::{ArgAction, Parser, Subcommand};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use once_cell::sync::Lazy;
use std::{
    io::Write,
    path::{Path, PathBuf},
};

pub static FULL_VERSION: Lazy<String> = Lazy::new(|| {
    format!(
        "{}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("VERGEN_GIT_DESCRIBE")
    )
});

#[derive(Parser)]
#[command(name="bamcons",
          version=&**FULL_VERSION,
          about="Consensus sequences from aligned reads",
          long_about = None,
          disable_help_subcommand = true,
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          )]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Command {
    #[clap(about = "Call a consensus sequence from a BAM file")]
    Consensus(ConsensusArgs),
    #[clap(about = "Convert BTOP strings to CIGAR strings")]
    Btop(BtopArgs),
}

#[derive(Parser, Debug)]
#[command(arg_required_else_help(true))]
pub struct ConsensusArgs {
    #[clap(required = true)]
    #[clap(short = 'b')]
    #[clap(long = "bam")]
    #[clap(help = "Indexed BAM file with aligned reads")]
    #[clap(value_name = "BAM")]
    #[arg(value_parser = check_file_exists)]
    pub bam_path: PathBuf,

    #[clap(short = 'r')]
    #[clap(long = "reference")]
    #[clap(help = "Indexed FASTA file with the reference sequence")]
    #[clap(value_name = "FASTA")]
    #[arg(value_parser = check_file_exists)]
    pub reference_path: Option<PathBuf>,

    #[clap(short = 'i')]
    #[clap(long = "reference-id")]
    #[clap(help = "Id of the BAM reference to call a consensus for")]
    #[clap(value_name = "ID")]
    pub reference_id: Option<String>,

    #[clap(short = 'o')]
    #[clap(long = "output")]
    #[clap(help = "Output FASTA path [default: stdout]")]
    #[clap(value_name = "FASTA")]
    #[arg(value_parser = check_prefix_path)]
    pub output_path: Option<String>,

    #[clap(long = "id")]
    #[clap(help = "Id of the consensus in the output FASTA [default: <reference-id>-consensus]")]
    #[clap(value_name = "ID")]
    #[arg(value_parser = check_id_nonempty)]
    pub consensus_id: Option<String>,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "threshold")]
    #[clap(value_name = "FRAC")]
    #[clap(help = "Fraction of summed base quality the called bases must reach")]
    #[clap(default_value = "0.8")]
    #[arg(value_parser = ensure_unit_float)]
    pub threshold: f64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "min-coverage")]
    #[clap(value_name = "READS")]
    #[clap(help = "Minimum number of reads covering a site to call a base")]
    #[clap(default_value = "1")]
    pub min_coverage: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "low-coverage")]
    #[clap(value_name = "SYMBOL")]
    #[clap(help = "Symbol for sites with fewer than --min-coverage reads, or 'reference'")]
    #[clap(default_value = "reference")]
    #[arg(value_parser = coverage_fallback_from_string)]
    pub low_coverage: CoverageFallback,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "no-coverage")]
    #[clap(value_name = "SYMBOL")]
    #[clap(help = "Symbol for sites no read covers, or 'reference'")]
    #[clap(default_value = "reference")]
    #[arg(value_parser = coverage_fallback_from_string)]
    pub no_coverage: CoverageFallback,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "deletion-symbol")]
    #[clap(value_name = "SYMBOL")]
    #[clap(help = "Symbol for deleted sites; empty to drop them")]
    #[clap(default_value = "-")]
    pub deletion_symbol: String,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "deletion-threshold")]
    #[clap(value_name = "FRAC")]
    #[clap(help = "Deleting reads per read with a base needed to call a deletion")]
    #[clap(default_value = "0.5")]
    #[arg(value_parser = ensure_unit_float)]
    pub deletion_threshold: f64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "insertion-count-threshold")]
    #[clap(value_name = "READS")]
    #[clap(help = "Minimum number of reads with an insertion to call it")]
    #[clap(default_value = "5")]
    pub insertion_count_threshold: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "ignore-quality")]
    #[clap(help = "Give every base a quality of 1")]
    pub ignore_quality: bool,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "include-soft-clipped")]
    #[clap(help = "Use soft-clipped bases as evidence")]
    pub include_soft_clipped: bool,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "strategy")]
    #[clap(value_name = "STRATEGY")]
    #[clap(help = "Consensus strategy (fetch or majority)")]
    #[clap(default_value = "fetch")]
    #[arg(value_parser = strategy_from_string)]
    pub strategy: Strategy,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "min-mapq")]
    #[clap(value_name = "MAPQ")]
    #[clap(help = "Minimum mapping quality of reads to use")]
    #[clap(default_value = "0")]
    pub min_mapq: u8,

    #[clap(help_heading("Diagnostics"))]
    #[clap(long = "compare-report")]
    #[clap(value_name = "PATH")]
    #[clap(help = "Compare read evidence against a pileup and write the differences to PATH")]
    #[arg(value_parser = check_prefix_path)]
    pub compare_report: Option<String>,

    #[clap(help_heading("Diagnostics"))]
    #[clap(long = "progress")]
    #[clap(help = "Log the number of processed reads periodically")]
    pub progress: bool,
}

#[derive(Parser, Debug)]
#[command(arg_required_else_help(true))]
pub struct BtopArgs {
    #[clap(required = true)]
    #[clap(help = "BTOP strings to convert")]
    #[clap(value_name = "BTOP")]
    pub btops: Vec<String>,

    #[clap(long = "concise")]
    #[clap(help = "Use 'M' for matches and mismatches instead of '=' and 'X'")]
    pub concise: bool,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .format(|buf, record| {
            let level = record.level();
            let mut style = buf.style();
            match record.level() {
                Level::Error => style.set_color(Color::Red),
                Level::Warn => style.set_color(Color::Yellow),
                Level::Info => style.set_color(Color::Green),
                Level::Debug => style.set_color(Color::Blue),
                Level::Trace => style.set_color(Color::Cyan),
            };

            writeln!(
                buf,
                "{} [{}] - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                style.value(level),
                record.args()
            )
        })
        .filter_level(filter_level)
        .init();
}

fn check_prefix_path(s: &str) -> Result<String> {
    let path = Path::new(s);
    if let Some(parent_dir) = path.parent() {
        if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
            return Err(format!("Path does not exist: {}", parent_dir.display()));
        }
    }
    Ok(s.to_string())
}

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        Err(format!("File does not exist: {}", path.display()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn check_id_nonempty(s: &str) -> Result<String> {
    if s.trim().is_empty() || s.contains(char::is_whitespace) {
        Err("Consensus id must be non-empty and contain no whitespace".to_string())
    } else {
        Ok(s.to_string())
    }
}

fn ensure_unit_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !(0.0..=1.0).contains(&value) {
        Err(format!(
            "The value must be between 0.0 and 1.0, got: {}",
            value
        ))
    } else {
        Ok(value)
    }
}

fn coverage_fallback_from_string(s: &str) -> Result<CoverageFallback> {
    s.parse()
}

fn strategy_from_string(s: &str) -> Result<Strategy> {
    s.parse().map_err(|e: crate::consensus::ConsensusError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_float_bounds() {
        assert_eq!(ensure_unit_float("0.5"), Ok(0.5));
        assert!(ensure_unit_float("1.01").is_err());
        assert!(ensure_unit_float("abc").is_err());
    }

    #[test]
    fn consensus_id_without_whitespace() {
        assert!(check_id_nonempty("cons1").is_ok());
        assert!(check_id_nonempty("  ").is_err());
        assert!(check_id_nonempty("a b").is_err());
    }

    #[test]
    fn strategy_names() {
        assert_eq!(strategy_from_string("majority"), Ok(Strategy::Majority));
        assert_eq!(
            strategy_from_string("mode"),
            Err("Unknown consensus strategy 'mode'. Options are: fetch, majority".to_string())
        );
    }

    #[test]
    fn consensus_args_parse_with_defaults() {
        let cli = Cli::try_parse_from(["bamcons", "consensus", "--bam", "Cargo.toml"]).unwrap();
        let Command::Consensus(args) = cli.command else {
            panic!("Expected the consensus command");
        };
        assert_eq!(args.threshold, 0.8);
        assert_eq!(args.min_coverage, 1);
        assert_eq!(args.low_coverage, CoverageFallback::Reference);
        assert_eq!(args.deletion_symbol, "-");
        assert_eq!(args.insertion_count_threshold, 5);
        assert_eq!(args.strategy, Strategy::Fetch);
        assert!(!args.include_soft_clipped);
    }

    #[test]
    fn unknown_strategy_fails_parsing() {
        let result = Cli::try_parse_from([
            "bamcons",
            "consensus",
            "--bam",
            "Cargo.toml",
            "--strategy",
            "mode",
        ]);
        assert!(result.is_err());
    }
}
