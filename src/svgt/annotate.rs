use super::aggregate::{self, JunctionCount, SvCoverage};
use super::breakpoints::BreakpointIndex;
use super::catalog::ContigLayout;
use super::dump::{DumpRecord, DumpWriter};
use super::probe::{self, Probe};
use super::scan::{self, get_hp_tag};
use super::scorer::{score_crossing, BreakpointSide};
use super::stats::SampleTally;
use super::sv::StructuralVariantRecord;
use crate::utils::{banded_aligner, AlignScoring, BandedAligner, Result};
use itertools::Itertools;
use rust_htslib::bam::{self, Read};
use rust_htslib::faidx;
use std::path::PathBuf;

/// Configuration of one genotyping run. `is_haplotagged` is an output flag:
/// it flips when any counted vote carries an HP tag.
pub struct GenotypeConfig {
    pub files: Vec<PathBuf>,
    pub sample_names: Vec<String>,
    pub genome: PathBuf,
    pub min_flank_size: usize,
    pub min_geno_qual: u32,
    pub flank_quality: f64,
    pub aliscore: AlignScoring,
    pub dump_path: Option<PathBuf>,
    pub is_haplotagged: bool,
}

/// Genotyping output: vote records, coverage sums and run-wide sample
/// statistics, each indexed `[sample][sv id]` or `[sample]`.
pub struct SvGenotypes {
    pub junctions: Vec<Vec<JunctionCount>>,
    pub coverage: Vec<Vec<SvCoverage>>,
    pub tallies: Vec<SampleTally>,
}

impl SvGenotypes {
    fn new(num_samples: usize, num_svs: usize) -> SvGenotypes {
        SvGenotypes {
            junctions: (0..num_samples)
                .map(|_| vec![JunctionCount::default(); num_svs])
                .collect(),
            coverage: (0..num_samples)
                .map(|_| vec![SvCoverage::default(); num_svs])
                .collect(),
            tallies: vec![SampleTally::new(); num_samples],
        }
    }
}

/// Scalar knobs of the scoring path, copied out of the config so the hot
/// loop does not borrow it.
#[derive(Clone, Copy)]
pub(crate) struct ScoreParams {
    pub min_flank: usize,
    pub min_geno_qual: u32,
    pub flank_quality: f64,
    pub scoring: AlignScoring,
}

impl ScoreParams {
    fn new(config: &GenotypeConfig) -> ScoreParams {
        ScoreParams {
            min_flank: config.min_flank_size,
            min_geno_qual: config.min_geno_qual,
            flank_quality: config.flank_quality,
            scoring: config.aliscore,
        }
    }
}

pub(crate) struct DumpContext<'a> {
    pub file: &'a str,
    pub layout: &'a ContigLayout,
}

fn accepted(rec: &bam::Record) -> bool {
    !(rec.is_secondary()
        || rec.is_quality_check_failed()
        || rec.is_duplicate()
        || rec.is_supplementary()
        || rec.is_unmapped())
}

/// Runs one record through the scan-score-aggregate pipeline.
#[allow(clippy::too_many_arguments)]
pub(crate) fn process_record(
    record: &bam::Record,
    svs: &[StructuralVariantRecord],
    probes: &[Probe],
    bpi: &BreakpointIndex,
    cov: &mut [u16],
    tally: &mut SampleTally,
    junctions: &mut [JunctionCount],
    aligner: &mut BandedAligner,
    params: ScoreParams,
    is_haplotagged: &mut bool,
    mut dump: Option<(&mut DumpWriter, &DumpContext)>,
) -> Result<()> {
    if !accepted(record) {
        return Ok(());
    }
    let crossings = scan::scan_record(record, bpi, cov, tally);
    if crossings.is_empty() {
        return Ok(());
    }

    let sequence = record.seq().as_bytes();
    let readlen = record.seq_len() as i64;
    let hp = get_hp_tag(record);
    let qname = String::from_utf8_lossy(record.qname()).into_owned();

    for (svid, (rp_hit, sp_hit)) in crossings {
        let jct = &mut junctions[svid];
        if !jct.under_vote_cap() {
            continue;
        }
        let probe = &probes[svid];
        let side = if Some(rp_hit) == probe.sv_start {
            BreakpointSide::Start
        } else {
            BreakpointSide::End
        };
        let vote = match score_crossing(
            probe,
            side,
            &sequence,
            readlen,
            sp_hit,
            record.is_reverse(),
            params.min_flank,
            params.flank_quality,
            &params.scoring,
            aligner,
        ) {
            Some(vote) => vote,
            None => continue,
        };
        let dump_pair = dump.as_mut().map(|(writer, ctx)| {
            let mate_chr = if record.mtid() < 0 {
                "*"
            } else {
                ctx.layout.names[record.mtid() as usize].as_str()
            };
            let rec = DumpRecord {
                svid,
                svt: svs[svid].svt,
                bam: ctx.file,
                qname: &qname,
                chr: ctx.layout.names[record.tid() as usize].as_str(),
                pos: record.pos(),
                mate_chr,
                mate_pos: record.mpos(),
                mapq: record.mapq(),
            };
            (&mut **writer, rec)
        });
        aggregate::apply_vote(
            jct,
            vote,
            record.mapq(),
            hp,
            params.min_geno_qual,
            is_haplotagged,
            dump_pair,
        )?;
    }
    Ok(())
}

fn open_readers(config: &GenotypeConfig) -> Result<Vec<bam::IndexedReader>> {
    let mut readers = Vec::with_capacity(config.files.len());
    for path in &config.files {
        let mut reader = bam::IndexedReader::from_path(path)
            .map_err(|e| format!("Failed to open alignment file {}: {}", path.display(), e))?;
        reader
            .set_reference(&config.genome)
            .map_err(|e| e.to_string())?;
        readers.push(reader);
    }
    Ok(readers)
}

/// Per-contig mapped-read counts from the index, used to skip contigs a
/// sample has no data for. CRAM indices do not carry usable counts, so CRAM
/// files are always scanned.
fn mapped_per_contig(reader: &mut bam::IndexedReader, num_targets: usize) -> Result<Vec<u64>> {
    let mut mapped = vec![0u64; num_targets];
    for (tid, _len, count, _unmapped) in reader.index_stats().map_err(|e| e.to_string())? {
        if tid >= 0 && (tid as usize) < mapped.len() {
            mapped[tid as usize] = count;
        }
    }
    Ok(mapped)
}

fn is_cram(path: &std::path::Path) -> bool {
    path.extension().is_some_and(|ext| ext == "cram")
}

/// Genotypes every candidate SV against every input file: builds per-contig
/// probes, streams primary alignments, scores breakpoint crossings and
/// aggregates votes, coverage and sample statistics.
pub fn annotate_svs(
    config: &mut GenotypeConfig,
    svs: &mut [StructuralVariantRecord],
) -> Result<SvGenotypes> {
    let num_samples = config.files.len();
    let mut genotypes = SvGenotypes::new(num_samples, svs.len());
    if svs.is_empty() {
        return Ok(genotypes);
    }

    let mut readers = open_readers(config)?;
    let layout = ContigLayout::from_header(readers[0].header())?;
    for (path, reader) in config.files.iter().zip(readers.iter()).skip(1) {
        if ContigLayout::from_header(reader.header())? != layout {
            return Err(format!(
                "Alignment header of {} disagrees with {}",
                path.display(),
                config.files[0].display()
            ));
        }
    }

    let mut mapped = Vec::with_capacity(num_samples);
    for reader in readers.iter_mut() {
        mapped.push(mapped_per_contig(reader, layout.names.len())?);
    }

    let fai = faidx::Reader::from_path(&config.genome)
        .map_err(|e| format!("Failed to open reference {}: {}", config.genome.display(), e))?;
    let mut dump = match &config.dump_path {
        Some(path) => Some(DumpWriter::create(path)?),
        None => None,
    };
    let file_names = config
        .files
        .iter()
        .map(|p| p.display().to_string())
        .collect_vec();
    let params = ScoreParams::new(config);

    log::info!("SV annotation");
    let mut mate_parts = vec![String::new(); svs.len()];
    for ref_index in 0..layout.names.len() {
        log::debug!("Processing {}", layout.names[ref_index]);
        let contig_len = layout.lens[ref_index] as usize;
        let probes = probe::build_probes(
            svs,
            ref_index,
            &layout,
            &fai,
            &mut mate_parts,
            &config.aliscore,
            config.min_flank_size,
            config.flank_quality,
        )?;
        let bpi = BreakpointIndex::new(&probes, contig_len);

        for (file_c, reader) in readers.iter_mut().enumerate() {
            if !is_cram(&config.files[file_c]) && mapped[file_c][ref_index] == 0 {
                continue;
            }
            let mut cov = vec![0u16; contig_len];
            let mut aligner = banded_aligner(&config.aliscore);
            let dump_ctx = DumpContext {
                file: &file_names[file_c],
                layout: &layout,
            };
            reader
                .fetch((ref_index as i32, 0i64, contig_len as i64))
                .map_err(|e| e.to_string())?;
            let mut record = bam::Record::new();
            while let Some(result) = reader.read(&mut record) {
                result.map_err(|e| e.to_string())?;
                process_record(
                    &record,
                    svs,
                    &probes,
                    &bpi,
                    &mut cov,
                    &mut genotypes.tallies[file_c],
                    &mut genotypes.junctions[file_c],
                    &mut aligner,
                    params,
                    &mut config.is_haplotagged,
                    dump.as_mut().map(|w| (w, &dump_ctx)),
                )?;
            }
            genotypes.tallies[file_c].accumulate_coverage(&cov);
            aggregate::coverage_sums(svs, ref_index, &cov, &mut genotypes.coverage[file_c]);
        }
    }
    if let Some(writer) = dump {
        writer.finish()?;
    }
    Ok(genotypes)
}
