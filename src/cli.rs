use crate::utils::{AlignScoring, Result};
use chrono::Datelike;
use clap::{ArgAction, Parser};
use env_logger::fmt::Color;
use log::{Level, LevelFilter};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "svgt",
          author = "svgt developers",
          version,
          about = "Structural variant genotyper for long-read alignments",
          long_about = None,
          after_help = format!("Copyright (C) {}     svgt developers
This program comes with ABSOLUTELY NO WARRANTY; it is intended for
Research Use Only and not for use in diagnostic procedures.", chrono::Utc::now().year()),
          help_template = "{name} {version}\n{about-section}\n{usage-heading}\n    {usage}\n\n{all-args}{after-help}",
          arg_required_else_help = true)]
pub struct Cli {
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = ArgAction::Count, help = "Specify multiple times to increase verbosity level (e.g., -vv for more verbosity)")]
    pub verbosity: u8,

    #[clap(required = true)]
    #[clap(short = 'g')]
    #[clap(long = "genome")]
    #[clap(help = "Path to the indexed reference genome FASTA")]
    #[clap(value_name = "FASTA")]
    #[arg(value_parser = check_file_exists)]
    pub genome_path: PathBuf,

    #[clap(required = true)]
    #[clap(short = 'r')]
    #[clap(long = "reads")]
    #[clap(help = "Indexed BAM/CRAM files with aligned long reads, one per sample")]
    #[clap(value_name = "READS")]
    #[clap(num_args = 1..)]
    #[arg(value_parser = check_file_exists)]
    pub reads_paths: Vec<PathBuf>,

    #[clap(required = true)]
    #[clap(short = 'c')]
    #[clap(long = "candidates")]
    #[clap(help = "SV candidates: CHROM START END TYPE CONSENSUS [INSLEN] [CHROM2]")]
    #[clap(value_name = "CANDIDATES")]
    #[arg(value_parser = check_file_exists)]
    pub candidates_path: PathBuf,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "sample-names")]
    #[clap(value_name = "SAMPLE")]
    #[clap(help = "Sample names, one per alignment file (defaults to BAM read groups)")]
    #[clap(num_args = 1..)]
    pub sample_names: Option<Vec<String>>,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "min-flank")]
    #[clap(value_name = "MIN_FLANK")]
    #[clap(help = "Minimum flanking sequence around breakpoints")]
    #[clap(default_value = "13")]
    #[arg(value_parser = flank_in_range)]
    pub min_flank_size: usize,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "min-geno-qual")]
    #[clap(value_name = "QUAL")]
    #[clap(help = "Minimum genotyping quality of a counted vote")]
    #[clap(default_value = "5")]
    pub min_geno_qual: u32,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "flank-quality")]
    #[clap(value_name = "PERC")]
    #[clap(help = "Required fraction of matches in probe flanks")]
    #[clap(default_value = "0.9")]
    #[arg(value_parser = ensure_unit_float)]
    pub flank_quality: f64,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "aln-scoring")]
    #[clap(value_name = "SCORING")]
    #[clap(
        help = "Scoring function for probe alignment (non-negative values): MATCH,MISM,GAPO,GAPE,KMERLEN,BANDWIDTH"
    )]
    #[clap(default_value = "5,4,4,4,9,20")]
    #[arg(value_parser = scoring_from_string)]
    pub aln_scoring: AlignScoring,

    #[clap(help_heading("Advanced"))]
    #[clap(long = "dump")]
    #[clap(value_name = "DUMP")]
    #[clap(help = "Gzipped output file for alt-supporting split reads")]
    pub dump_path: Option<PathBuf>,
}

pub fn init_verbose(args: &Cli) {
    let filter_level: LevelFilter = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
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

fn check_file_exists(s: &str) -> Result<PathBuf> {
    let path = Path::new(s);
    if !path.exists() {
        return Err(format!("File does not exist: {}", path.display()));
    }
    Ok(path.to_path_buf())
}

fn ensure_unit_float(s: &str) -> Result<f64> {
    let value = s
        .parse::<f64>()
        .map_err(|e| format!("Could not parse float: {}", e))?;
    if !(0.0..1.0).contains(&value) {
        return Err(format!("The value {} is not in range [0.0, 1.0)", value));
    }
    Ok(value)
}

fn flank_in_range(s: &str) -> Result<usize> {
    let value = s
        .parse::<usize>()
        .map_err(|e| format!("Could not parse integer: {}", e))?;
    if value == 0 {
        return Err("Minimum flank size must be positive".to_string());
    }
    Ok(value)
}

fn scoring_from_string(s: &str) -> Result<AlignScoring> {
    const NUM_EXPECTED_VALUES: usize = 6;
    let values: Vec<&str> = s.split(',').collect();
    if values.len() != NUM_EXPECTED_VALUES {
        return Err(format!(
            "Expected {} comma-separated values MATCH,MISM,GAPO,GAPE,KMERLEN,BANDWIDTH, got {}",
            NUM_EXPECTED_VALUES,
            values.len()
        ));
    }
    let parse_i32 = |field: &str, name: &str| -> Result<i32> {
        let value = field
            .parse::<i32>()
            .map_err(|_| format!("Could not parse {}: {}", name, field))?;
        if value < 0 {
            return Err(format!("{} must be non-negative, got {}", name, value));
        }
        Ok(value)
    };
    let parse_usize = |field: &str, name: &str| -> Result<usize> {
        field
            .parse::<usize>()
            .map_err(|_| format!("Could not parse {}: {}", name, field))
    };
    let scoring = AlignScoring {
        match_scr: parse_i32(values[0], "MATCH")?,
        mism_scr: parse_i32(values[1], "MISM")?,
        gapo_scr: parse_i32(values[2], "GAPO")?,
        gape_scr: parse_i32(values[3], "GAPE")?,
        kmer_len: parse_usize(values[4], "KMERLEN")?,
        bandwidth: parse_usize(values[5], "BANDWIDTH")?,
    };
    if scoring.match_scr == 0 {
        return Err("MATCH must be positive".to_string());
    }
    if scoring.kmer_len == 0 || scoring.bandwidth == 0 {
        return Err("KMERLEN and BANDWIDTH must be positive".to_string());
    }
    Ok(scoring)
}
