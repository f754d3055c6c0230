use super::probe::Probe;
use crate::utils::{overlap_score, AlignScoring, BandedAligner};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointSide {
    Start,
    End,
}

/// Normalized support scores of one spanning read against the two haplotype
/// probes of an SV.
#[derive(Debug, Clone, Copy)]
pub struct Vote {
    pub score_ref: f64,
    pub score_alt: f64,
}

/// Scores a breakpoint crossing. Returns `None` when the read does not span
/// the breakpoint with a full probe flank on both sides, or when neither
/// normalized score clears 1.
#[allow(clippy::too_many_arguments)]
pub fn score_crossing(
    probe: &Probe,
    side: BreakpointSide,
    sequence: &[u8],
    readlen: i64,
    sp_hit: i64,
    is_reverse: bool,
    min_flank: usize,
    flank_quality: f64,
    scoring: &AlignScoring,
    aligner: &mut BandedAligner,
) -> Option<Vote> {
    if probe.alt_seq.is_empty() || probe.ref_seq.is_empty() {
        return None;
    }
    let (prefix, suffix) = match side {
        BreakpointSide::Start => (probe.sv_start_prefix as i64, probe.sv_start_suffix as i64),
        BreakpointSide::End => (probe.sv_end_prefix as i64, probe.sv_end_suffix as i64),
    };
    let start = if is_reverse {
        if sp_hit < suffix {
            return None;
        }
        if readlen < prefix + sp_hit {
            return None;
        }
        ((readlen - sp_hit) - prefix - min_flank as i64).max(0)
    } else {
        if sp_hit < prefix {
            return None;
        }
        if readlen < suffix + sp_hit {
            return None;
        }
        (sp_hit - prefix - min_flank as i64).max(0)
    } as usize;
    let want = (prefix + suffix) as usize + 2 * min_flank;
    let end = (start + want).min(sequence.len());
    if start >= end {
        return None;
    }
    let subseq = &sequence[start..end];

    let score_alt = f64::from(overlap_score(aligner, probe.alt_seq.as_bytes(), subseq))
        / scoring.expected_score(probe.alt_seq.len(), flank_quality);
    let score_ref = f64::from(overlap_score(aligner, probe.ref_seq.as_bytes(), subseq))
        / scoring.expected_score(probe.ref_seq.len(), flank_quality);

    if score_ref > 1.0 || score_alt > 1.0 {
        Some(Vote {
            score_ref,
            score_alt,
        })
    } else {
        None
    }
}
