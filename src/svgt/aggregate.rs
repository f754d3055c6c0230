use super::dump::{DumpRecord, DumpWriter};
use super::scorer::Vote;
use super::sv::{StructuralVariantRecord, SvType};
use crate::utils::Result;

/// Hard cap on combined ref+alt votes per SV per sample.
pub const MAX_GENO_READ_COUNT: usize = 500;

/// Half-window used for coverage sums around point-like events
/// (translocations and insertions).
const POINT_EVENT_HALF_SIZE: i64 = 500;

/// Per-sample, per-SV vote record. `ref_observed` counts every raw
/// reference vote so that reference bias can be corrected by keeping only
/// every second one.
#[derive(Debug, Clone, Default)]
pub struct JunctionCount {
    pub ref_quals: Vec<u8>,
    pub alt_quals: Vec<u8>,
    pub refh1: u32,
    pub refh2: u32,
    pub alth1: u32,
    pub alth2: u32,
    pub ref_observed: u32,
}

impl JunctionCount {
    pub fn under_vote_cap(&self) -> bool {
        self.ref_quals.len() + self.alt_quals.len() < MAX_GENO_READ_COUNT
    }
}

/// Per-sample, per-SV coverage sums over the left flank, the SV body and the
/// right flank.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvCoverage {
    pub left_rc: u64,
    pub rc: u64,
    pub right_rc: u64,
}

/// Applies one vote. Ties go to the reference. Reference votes are halved
/// for reference bias; qualities are capped by the mapping quality and
/// dropped below `min_geno_qual`. Accepted alt votes are appended to the
/// dump file when one is active.
pub fn apply_vote(
    jct: &mut JunctionCount,
    vote: Vote,
    mapq: u8,
    hp: Option<i64>,
    min_geno_qual: u32,
    is_haplotagged: &mut bool,
    dump: Option<(&mut DumpWriter, DumpRecord<'_>)>,
) -> Result<()> {
    if vote.score_alt > vote.score_ref {
        let aq = (vote.score_alt * 35.0).round() as u32;
        if aq >= min_geno_qual {
            if let Some((writer, rec)) = dump {
                writer.write_record(&rec)?;
            }
            jct.alt_quals.push(aq.min(u32::from(mapq)) as u8);
            if let Some(hap) = hp {
                *is_haplotagged = true;
                if hap == 1 {
                    jct.alth1 += 1;
                } else {
                    jct.alth2 += 1;
                }
            }
        }
    } else {
        jct.ref_observed += 1;
        if jct.ref_observed % 2 == 1 {
            let rq = (vote.score_ref * 35.0).round() as u32;
            if rq >= min_geno_qual {
                jct.ref_quals.push(rq.min(u32::from(mapq)) as u8);
                if let Some(hap) = hp {
                    *is_haplotagged = true;
                    if hap == 1 {
                        jct.refh1 += 1;
                    } else {
                        jct.refh2 += 1;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Sums the per-base coverage of each SV on this contig over the left
/// flank, the SV body and the right flank. Translocations and insertions
/// use fixed windows centred on the start breakpoint.
pub fn coverage_sums(
    svs: &[StructuralVariantRecord],
    ref_index: usize,
    cov: &[u16],
    cov_map: &mut [SvCoverage],
) {
    let contig_len = cov.len() as i64;
    let window_sum = |beg: i64, end: i64| -> u64 {
        let beg = beg.clamp(0, contig_len) as usize;
        let end = end.clamp(beg as i64, contig_len) as usize;
        cov[beg..end].iter().map(|&c| u64::from(c)).sum()
    };
    for sv in svs {
        if sv.chr != ref_index {
            continue;
        }
        let point_event = sv.svt.is_translocation() || sv.svt == SvType::Ins;
        let half_size = if point_event {
            POINT_EVENT_HALF_SIZE
        } else {
            (sv.sv_end - sv.sv_start) / 2
        };

        let entry = &mut cov_map[sv.id];
        entry.left_rc = window_sum(sv.sv_start - half_size, sv.sv_start);
        if point_event {
            entry.rc = window_sum(sv.sv_start - half_size, sv.sv_start + half_size);
            entry.right_rc = window_sum(sv.sv_start, sv.sv_start + half_size);
        } else {
            entry.rc = window_sum(sv.sv_start, sv.sv_end);
            entry.right_rc = window_sum(sv.sv_end, sv.sv_end + half_size);
        }
    }
}
