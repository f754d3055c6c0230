use super::catalog::ContigLayout;
use super::sv::{precise_alleles, symbolic_alleles, StructuralVariantRecord, SvType};
use crate::utils::{consensus_columns, revcomp, AlignScoring, Result};
use rust_htslib::faidx;

/// Haplotype probes for one SV on the current contig. `sv_start`/`sv_end`
/// are set only when the respective breakpoint lies on this contig and the
/// probe could be built; prefix/suffix are the alt-probe lengths on either
/// side of the breakpoint.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    pub sv_start: Option<i64>,
    pub sv_end: Option<i64>,
    pub sv_start_prefix: usize,
    pub sv_start_suffix: usize,
    pub sv_end_prefix: usize,
    pub sv_end_suffix: usize,
    pub ref_seq: String,
    pub alt_seq: String,
    pub svt: Option<SvType>,
}

impl Probe {
    pub fn is_set(&self) -> bool {
        self.sv_start.is_some() || self.sv_end.is_some()
    }
}

struct BreakpointWindows {
    start_beg: i64,
    start_end: i64,
    end_beg: i64,
    end_end: i64,
}

fn breakpoint_windows(
    sv: &StructuralVariantRecord,
    buffer: i64,
    layout: &ContigLayout,
) -> BreakpointWindows {
    let mut w = BreakpointWindows {
        start_beg: (sv.sv_start - buffer).max(0),
        start_end: (sv.sv_start + buffer).min(layout.lens[sv.chr]),
        end_beg: (sv.sv_end - buffer).max(0),
        end_end: (sv.sv_end + buffer).min(layout.lens[sv.chr2]),
    };
    // Keep the two windows of junction-style intra-chromosomal probes from
    // running into each other.
    if sv.svt.is_inversion() || sv.svt == SvType::Dup {
        let mid = (sv.sv_start + sv.sv_end) / 2;
        w.start_end = w.start_end.min(mid);
        w.end_beg = w.end_beg.max(mid);
    }
    w
}

fn segment(seq: &[u8], beg: i64, end: i64) -> &[u8] {
    let beg = beg.clamp(0, seq.len() as i64) as usize;
    let end = end.clamp(beg as i64, seq.len() as i64) as usize;
    &seq[beg..end]
}

fn segment_string(seq: &[u8], beg: i64, end: i64) -> String {
    String::from_utf8_lossy(segment(seq, beg, end)).into_owned()
}

fn segment_revcomp(seq: &[u8], beg: i64, end: i64) -> String {
    String::from_utf8_lossy(&revcomp(segment(seq, beg, end))).into_owned()
}

/// The mate-side half of a translocation reference probe, built while the
/// contig loop visits `chr2` and cached until `chr` is visited.
fn mate_reference_part(
    seq: &[u8],
    sv: &StructuralVariantRecord,
    layout: &ContigLayout,
) -> String {
    let w = breakpoint_windows(sv, sv.consensus.len() as i64, layout);
    match sv.svt {
        SvType::Bnd3to5 | SvType::Bnd5to5 => segment_string(seq, sv.sv_end, w.end_end),
        SvType::Bnd3to3 | SvType::Bnd5to3 => segment_revcomp(seq, w.end_beg, sv.sv_end),
        _ => String::new(),
    }
}

/// Assembles the reference sequence the consensus is aligned against.
/// Deletions and insertions take the contiguous span; junction-style events
/// join the two breakpoint flanks in junction orientation.
fn reference_probe(
    seq: &[u8],
    sv: &StructuralVariantRecord,
    w: &BreakpointWindows,
    mate_part: &str,
) -> String {
    match sv.svt {
        SvType::Del | SvType::Ins => segment_string(seq, w.start_beg, w.end_end),
        SvType::Dup => {
            segment_string(seq, w.end_beg, sv.sv_end) + &segment_string(seq, sv.sv_start, w.start_end)
        }
        SvType::Inv3to3 => {
            segment_string(seq, w.start_beg, sv.sv_start)
                + &segment_revcomp(seq, w.end_beg, sv.sv_end)
        }
        SvType::Inv5to5 => {
            segment_revcomp(seq, sv.sv_start, w.start_end)
                + &segment_string(seq, sv.sv_end, w.end_end)
        }
        SvType::Bnd3to3 | SvType::Bnd3to5 => {
            segment_string(seq, w.start_beg, sv.sv_start) + mate_part
        }
        SvType::Bnd5to5 | SvType::Bnd5to3 => {
            segment_revcomp(seq, sv.sv_start, w.start_end) + mate_part
        }
    }
}

struct SplitPoint {
    c_start: usize,
    c_end: usize,
    r_start: usize,
    r_end: usize,
    col_start: usize,
    col_end: usize,
}

/// Locates the SV-specific stretch of the consensus-to-reference alignment:
/// the best internal gap run, ranked by consensus extent for insertions and
/// reference extent otherwise. Anchor coordinates are 1-based letter counts.
fn find_split(
    cols: &[(u8, u8)],
    svt: SvType,
    min_flank: usize,
    flank_quality: f64,
    cons_len: usize,
    ref_len: usize,
) -> Option<SplitPoint> {
    let mut best: Option<SplitPoint> = None;
    let mut best_extent = 0;
    let (mut ci, mut ri) = (0usize, 0usize);
    let mut in_gap = false;
    let (mut gap_c, mut gap_r, mut gap_col) = (0usize, 0usize, 0usize);
    for (j, &(c, r)) in cols.iter().enumerate() {
        if c != b'-' {
            ci += 1;
        }
        if r != b'-' {
            ri += 1;
        }
        if (c == b'-' || r == b'-') && ci > 0 && ri > 0 {
            if !in_gap {
                gap_c = if c != b'-' { ci - 1 } else { ci };
                gap_r = if r != b'-' { ri - 1 } else { ri };
                gap_col = j;
                in_gap = true;
            }
        } else {
            if in_gap {
                let extent = if svt == SvType::Ins { ci - gap_c } else { ri - gap_r };
                if extent > best_extent {
                    best_extent = extent;
                    best = Some(SplitPoint {
                        c_start: gap_c,
                        c_end: ci,
                        r_start: gap_r,
                        r_end: ri,
                        col_start: gap_col,
                        col_end: j,
                    });
                }
            }
            in_gap = false;
        }
    }
    let split = best?;
    if split.r_end <= split.r_start {
        return None;
    }
    if flank_identity(&cols[..split.col_start]) < flank_quality {
        return None;
    }
    if flank_identity(&cols[split.col_end..]) < flank_quality {
        return None;
    }
    if split.c_start < min_flank || cons_len - split.c_end < min_flank {
        return None;
    }
    if split.r_start < min_flank || ref_len - split.r_end < min_flank {
        return None;
    }
    Some(split)
}

fn flank_identity(cols: &[(u8, u8)]) -> f64 {
    let (mut matches, mut total) = (0usize, 0usize);
    for &(c, r) in cols {
        if c != b'-' && r != b'-' {
            total += 1;
            if c == r {
                matches += 1;
            }
        }
    }
    if total == 0 {
        0.0
    } else {
        matches as f64 / total as f64
    }
}

/// Exact VCF-style allele strings for deletions and insertions: letters of
/// either row between the split anchors, anchor base included.
fn indel_alleles(cols: &[(u8, u8)], c_start: usize, c_end: usize) -> (String, String) {
    let mut cpos = 0usize;
    let mut in_sv = false;
    let mut ref_vcf = String::new();
    let mut alt_vcf = String::new();
    for &(c, r) in cols {
        if c != b'-' {
            cpos += 1;
            if cpos == c_start {
                in_sv = true;
            } else if cpos == c_end {
                in_sv = false;
            }
        }
        if in_sv {
            if c != b'-' {
                alt_vcf.push(c as char);
            }
            if r != b'-' {
                ref_vcf.push(r as char);
            }
        }
    }
    (ref_vcf, alt_vcf)
}

/// Crops leading/trailing columns where either row is a gap and returns the
/// gap-stripped alt/ref sequences plus the number of consensus letters lost
/// at the front.
fn trim_columns(cols: &[(u8, u8)]) -> (String, String, usize) {
    let first = cols
        .iter()
        .position(|&(c, r)| c != b'-' && r != b'-')
        .unwrap_or(cols.len());
    let last = cols
        .iter()
        .rposition(|&(c, r)| c != b'-' && r != b'-')
        .map_or(0, |i| i + 1);
    let lead_crop = cols[..first].iter().filter(|&&(c, _)| c != b'-').count();
    let mut alt_seq = String::new();
    let mut ref_seq = String::new();
    for &(c, r) in &cols[first..last.max(first)] {
        if c != b'-' {
            alt_seq.push(c as char);
        }
        if r != b'-' {
            ref_seq.push(r as char);
        }
    }
    (alt_seq, ref_seq, lead_crop)
}

fn build_sv_probe(
    sv: &mut StructuralVariantRecord,
    sv_ref: &str,
    ref_index: usize,
    scoring: &AlignScoring,
    min_flank: usize,
    flank_quality: f64,
) -> Option<Probe> {
    let cols = consensus_columns(sv.consensus.as_bytes(), sv_ref.as_bytes(), scoring)?;
    let split = find_split(
        &cols,
        sv.svt,
        min_flank,
        flank_quality,
        sv.consensus.len(),
        sv_ref.len(),
    )?;
    if matches!(sv.svt, SvType::Del | SvType::Ins) {
        let (ref_vcf, alt_vcf) = indel_alleles(&cols, split.c_start, split.c_end);
        if !ref_vcf.is_empty() && !alt_vcf.is_empty() {
            sv.alleles = precise_alleles(&ref_vcf, &alt_vcf);
        }
    }
    let (alt_seq, ref_seq, lead_crop) = trim_columns(&cols);
    if alt_seq.is_empty() || ref_seq.is_empty() {
        return None;
    }
    let sv_start_prefix = split.c_start.saturating_sub(lead_crop).min(alt_seq.len());
    let mut probe = Probe {
        sv_start: Some(sv.sv_start),
        sv_start_prefix,
        sv_start_suffix: alt_seq.len() - sv_start_prefix,
        svt: Some(sv.svt),
        ..Probe::default()
    };
    if sv.chr2 == ref_index {
        let sv_end_prefix = split.c_end.saturating_sub(lead_crop).min(alt_seq.len());
        probe.sv_end = Some(sv.sv_end);
        probe.sv_end_prefix = sv_end_prefix;
        probe.sv_end_suffix = alt_seq.len() - sv_end_prefix;
    }
    probe.alt_seq = alt_seq;
    probe.ref_seq = ref_seq;
    Some(probe)
}

/// Builds the probe table for one contig from an already loaded reference
/// sequence. Fills in allele tags as a side effect and caches mate-side
/// probe parts for translocations.
pub(crate) fn build_probes_from_seq(
    svs: &mut [StructuralVariantRecord],
    ref_index: usize,
    seq: &[u8],
    layout: &ContigLayout,
    mate_parts: &mut [String],
    scoring: &AlignScoring,
    min_flank: usize,
    flank_quality: f64,
) -> Vec<Probe> {
    let mut probes = vec![Probe::default(); svs.len()];
    for sv in svs.iter_mut() {
        if sv.chr != ref_index && sv.chr2 != ref_index {
            continue;
        }
        if sv.chr == ref_index {
            let ref_base = seq
                .get(sv.sv_start as usize)
                .map_or('N', |&b| b.to_ascii_uppercase() as char);
            sv.alleles = symbolic_alleles(ref_base, &layout.names[sv.chr2], sv);
        }
        if !sv.precise {
            continue;
        }
        if sv.chr != sv.chr2 && sv.chr2 == ref_index {
            mate_parts[sv.id] = mate_reference_part(seq, sv, layout);
        }
        if sv.chr == ref_index {
            let buffer = if sv.svt == SvType::Ins {
                ((sv.consensus.len() as i64 - sv.ins_len) / 3).max(min_flank as i64)
            } else {
                sv.consensus.len() as i64
            };
            let w = breakpoint_windows(sv, buffer, layout);
            let sv_ref = reference_probe(seq, sv, &w, &mate_parts[sv.id]);
            match build_sv_probe(sv, &sv_ref, ref_index, scoring, min_flank, flank_quality) {
                Some(probe) => probes[sv.id] = probe,
                None => log::debug!(
                    "No usable probe for SV {} on {}",
                    sv.id,
                    layout.names[ref_index]
                ),
            }
        }
    }
    probes
}

/// Builds the probe table for one contig, lazily fetching the reference
/// sequence only when an SV touches this contig.
pub fn build_probes(
    svs: &mut [StructuralVariantRecord],
    ref_index: usize,
    layout: &ContigLayout,
    fai: &faidx::Reader,
    mate_parts: &mut [String],
    scoring: &AlignScoring,
    min_flank: usize,
    flank_quality: f64,
) -> Result<Vec<Probe>> {
    let contig_len = layout.lens[ref_index];
    let touched = svs
        .iter()
        .any(|sv| sv.chr == ref_index || sv.chr2 == ref_index);
    if !touched || contig_len == 0 {
        return Ok(vec![Probe::default(); svs.len()]);
    }
    let name = &layout.names[ref_index];
    let fetched = fai
        .fetch_seq(name, 0, (contig_len - 1) as usize)
        .map_err(|e| format!("Failed to fetch reference sequence for {}: {}", name, e))?;
    let mut seq = fetched.to_vec();
    seq.make_ascii_uppercase();
    Ok(build_probes_from_seq(
        svs,
        ref_index,
        &seq,
        layout,
        mate_parts,
        scoring,
        min_flank,
        flank_quality,
    ))
}
