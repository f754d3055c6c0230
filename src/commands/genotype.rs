use crate::cli::Cli;
use crate::svgt::{annotate_svs, read_catalog, stats, ContigLayout, GenotypeConfig};
use crate::utils::Result;
use itertools::Itertools;
use rust_htslib::bam::{self, Read};
use std::io::{self, Write};
use std::path::Path;

pub fn run(args: Cli) -> Result<()> {
    // The FASTA index is required up front; failing late inside the contig
    // loop wastes a probe-building pass.
    check_genome_index(&args.genome_path)?;

    let sample_names = resolve_sample_names(&args)?;
    let layout = {
        let reader = bam::IndexedReader::from_path(&args.reads_paths[0])
            .map_err(|e| format!("Failed to open {}: {}", args.reads_paths[0].display(), e))?;
        ContigLayout::from_header(reader.header())?
    };

    let mut svs = read_catalog(&args.candidates_path, &layout)?;
    if svs.is_empty() {
        log::warn!("No usable SV candidates, only sample statistics will be reported");
    }
    log::info!(
        "Genotyping {} candidates across {} samples",
        svs.len(),
        sample_names.len()
    );

    let mut config = GenotypeConfig {
        files: args.reads_paths.clone(),
        sample_names,
        genome: args.genome_path.clone(),
        min_flank_size: args.min_flank_size,
        min_geno_qual: args.min_geno_qual,
        flank_quality: args.flank_quality,
        aliscore: args.aln_scoring,
        dump_path: args.dump_path.clone(),
        is_haplotagged: false,
    };

    let genotypes = annotate_svs(&mut config, &mut svs)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    stats::report(&config.sample_names, &genotypes.tallies, &mut out).map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())?;

    if config.is_haplotagged {
        log::info!("Input alignments are haplotagged");
    }
    for (sample, junctions) in config.sample_names.iter().zip(genotypes.junctions.iter()) {
        let supported = junctions.iter().filter(|j| !j.alt_quals.is_empty()).count();
        log::info!("{}: {} SVs with read support", sample, supported);
    }
    Ok(())
}

/// The reference must come with a `samtools faidx` index so contigs can be
/// fetched by range.
fn check_genome_index(path: &Path) -> Result<()> {
    let mut fai = path.as_os_str().to_owned();
    fai.push(".fai");
    let fai = Path::new(&fai);
    if !fai.exists() {
        return Err(format!(
            "Reference index file not found: {}. Create it using 'samtools faidx {}'",
            fai.display(),
            path.display()
        ));
    }
    Ok(())
}

/// Sample names for the report columns: the explicit CLI list when given,
/// otherwise one name per alignment file from its read groups. Collisions
/// between files are disambiguated so that per-sample output lines stay
/// distinguishable.
fn resolve_sample_names(args: &Cli) -> Result<Vec<String>> {
    if let Some(names) = &args.sample_names {
        if names.len() != args.reads_paths.len() {
            return Err(format!(
                "Got {} sample names for {} alignment files",
                names.len(),
                args.reads_paths.len()
            ));
        }
        return Ok(names.clone());
    }
    let mut names = args
        .reads_paths
        .iter()
        .map(|path| sample_name_from_header(path))
        .collect::<Result<Vec<_>>>()?;
    let mut counts = std::collections::HashMap::new();
    for name in names.iter_mut() {
        let seen = counts.entry(name.clone()).or_insert(0u32);
        *seen += 1;
        if *seen > 1 {
            let renamed = format!("{}_{}", name, seen);
            log::warn!("Duplicate sample name {}, renaming to {}", name, renamed);
            *name = renamed;
        }
    }
    Ok(names)
}

/// A single unique `SM` value across the file's `@RG` lines names the
/// sample; anything else falls back to the file stem.
fn sample_name_from_header(path: &Path) -> Result<String> {
    let reader = bam::Reader::from_path(path)
        .map_err(|e| format!("Failed to open {}: {}", path.display(), e))?;
    let header = bam::Header::from_template(reader.header());
    let text = String::from_utf8_lossy(&header.to_bytes()).into_owned();
    let sm_values = text
        .lines()
        .filter(|line| line.starts_with("@RG"))
        .filter_map(|line| line.split('\t').find_map(|field| field.strip_prefix("SM:")))
        .unique()
        .collect_vec();

    match sm_values.as_slice() {
        [single] => Ok((*single).to_string()),
        [] => {
            log::warn!("No read-group sample name in {}", path.display());
            file_stem_name(path)
        }
        _ => {
            log::warn!(
                "Conflicting read-group sample names in {}: {}",
                path.display(),
                sm_values.iter().join(", ")
            );
            file_stem_name(path)
        }
    }
}

fn file_stem_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string)
        .ok_or_else(|| format!("Invalid alignment file name: {}", path.display()))
}
