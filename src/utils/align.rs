use bio::alignment::pairwise::{banded, Aligner, MatchParams, Scoring};
use bio::alignment::AlignmentOperation;

pub type BandedAligner = banded::Aligner<MatchParams>;

/// Gap parameters of the consensus-to-reference track. Extension is cheap so
/// that the SV-length gap is aligned through rather than clipped away.
const CONS_GAP_OPEN: i32 = 10;
const CONS_GAP_EXTEND: i32 = 1;

/// Alignment scoring used both for consensus-to-reference alignment and for
/// scoring read flanks against haplotype probes. Penalties are stored as
/// non-negative numbers and negated where the aligner expects them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignScoring {
    pub match_scr: i32,
    pub mism_scr: i32,
    pub gapo_scr: i32,
    pub gape_scr: i32,
    pub kmer_len: usize,
    pub bandwidth: usize,
}

impl Default for AlignScoring {
    /// Simple scoring track: gap open and extend both cost the mismatch
    /// penalty.
    fn default() -> Self {
        AlignScoring {
            match_scr: 5,
            mism_scr: 4,
            gapo_scr: 4,
            gape_scr: 4,
            kmer_len: 9,
            bandwidth: 20,
        }
    }
}

impl AlignScoring {
    fn match_params(&self) -> MatchParams {
        MatchParams::new(self.match_scr, -self.mism_scr)
    }

    /// Expected score of a probe-length alignment at the given flank quality.
    /// Normalizing a raw score by this value yields > 1 only for alignments
    /// that cover the probe better than the quality threshold.
    pub fn expected_score(&self, probe_len: usize, flank_quality: f64) -> f64 {
        let len = probe_len as f64;
        flank_quality * len * f64::from(self.match_scr)
            + (1.0 - flank_quality) * len * f64::from(-self.mism_scr)
    }
}

/// Banded aligner for probe-vs-read scoring with free end gaps on both
/// sequences, so that whichever of probe and window is longer overhangs
/// without penalty.
pub fn banded_aligner(scoring: &AlignScoring) -> BandedAligner {
    let overlap = Scoring::new(
        -scoring.gapo_scr,
        -scoring.gape_scr,
        scoring.match_params(),
    )
    .xclip(0)
    .yclip(0);
    banded::Aligner::with_capacity_and_scoring(
        512,
        1024,
        overlap,
        scoring.kmer_len,
        scoring.bandwidth,
    )
}

/// Best overlap score of `probe` against `read`.
pub fn overlap_score(aligner: &mut BandedAligner, probe: &[u8], read: &[u8]) -> i32 {
    aligner.custom(probe, read).score
}

/// Aligns a consensus against a reference window with free end gaps on both
/// sides and returns the aligned column pairs with `-` for gaps. Unaligned
/// sequence at either end is kept as gap columns so that coordinate
/// bookkeeping sees both sequences in full. Returns `None` when no usable
/// alignment was found.
pub fn consensus_columns(
    cons: &[u8],
    svref: &[u8],
    scoring: &AlignScoring,
) -> Option<Vec<(u8, u8)>> {
    if cons.is_empty() || svref.is_empty() {
        return None;
    }
    let overlap = Scoring::new(-CONS_GAP_OPEN, -CONS_GAP_EXTEND, scoring.match_params())
        .xclip(0)
        .yclip(0);
    let mut aligner = Aligner::with_capacity_and_scoring(cons.len(), svref.len(), overlap);
    let aln = aligner.custom(cons, svref);
    if aln.score <= 0 {
        return None;
    }
    let mut cols = Vec::with_capacity(svref.len() + cons.len());
    for xi in 0..aln.xstart {
        cols.push((cons[xi], b'-'));
    }
    for yi in 0..aln.ystart {
        cols.push((b'-', svref[yi]));
    }
    let (mut xi, mut yi) = (aln.xstart, aln.ystart);
    for op in &aln.operations {
        match op {
            AlignmentOperation::Match | AlignmentOperation::Subst => {
                cols.push((cons[xi], svref[yi]));
                xi += 1;
                yi += 1;
            }
            AlignmentOperation::Ins => {
                cols.push((cons[xi], b'-'));
                xi += 1;
            }
            AlignmentOperation::Del => {
                cols.push((b'-', svref[yi]));
                yi += 1;
            }
            AlignmentOperation::Xclip(_) | AlignmentOperation::Yclip(_) => {}
        }
    }
    for xi in aln.xend..cons.len() {
        cols.push((cons[xi], b'-'));
    }
    for yi in aln.yend..svref.len() {
        cols.push((b'-', svref[yi]));
    }
    Some(cols)
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    bio::alphabets::dna::revcomp(seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_scoring() -> AlignScoring {
        AlignScoring {
            kmer_len: 4,
            bandwidth: 10,
            ..AlignScoring::default()
        }
    }

    #[test]
    fn test_overlap_score_exact_match() {
        let scoring = test_scoring();
        let mut aligner = banded_aligner(&scoring);
        let probe = b"ACGTACGTTGCATGCA";
        let read = b"TTTTTACGTACGTTGCATGCATTTTT";
        let score = overlap_score(&mut aligner, probe, read);
        assert_eq!(score, probe.len() as i32 * scoring.match_scr);
    }

    #[test]
    fn test_overlap_score_allows_probe_overhang() {
        let scoring = test_scoring();
        let mut aligner = banded_aligner(&scoring);
        // only the probe prefix is present in the read; the rest overhangs
        let probe = b"ACGTACGTTGCATGCAGGGGGGGG";
        let read = b"TTTTTACGTACGTTGCATGCA";
        let score = overlap_score(&mut aligner, probe, read);
        assert_eq!(score, 16 * scoring.match_scr);
    }

    #[test]
    fn test_expected_score_gate() {
        let scoring = test_scoring();
        let probe_len = 100;
        let norm = scoring.expected_score(probe_len, 0.9);
        // 0.9 * 100 * 5 - 0.1 * 100 * 4
        assert_eq!(norm, 410.0);
        let perfect = (probe_len as i32 * scoring.match_scr) as f64;
        assert!(perfect / norm > 1.0);
    }

    #[test]
    fn test_consensus_columns_with_deletion() {
        let scoring = test_scoring();
        let left = "ACGTTGCAACGGATCC";
        let right = "GGATTCCAGATTACAG";
        let deleted = "TTGACCAGATTGCCAT";
        let cons = format!("{}{}", left, right);
        let svref = format!("AAAACCCC{}{}{}TTTTGGGG", left, deleted, right);
        let cols = consensus_columns(cons.as_bytes(), svref.as_bytes(), &scoring).unwrap();
        let cons_letters = cols.iter().filter(|&&(c, _)| c != b'-').count();
        let ref_letters = cols.iter().filter(|&&(_, r)| r != b'-').count();
        assert_eq!(cons_letters, cons.len());
        assert_eq!(ref_letters, svref.len());
        // consensus-side gaps: the deleted stretch plus both reference overhangs
        let gap_cols = cols.iter().filter(|&&(c, _)| c == b'-').count();
        assert_eq!(gap_cols, deleted.len() + 16);
    }

    #[test]
    fn test_consensus_columns_rejects_empty() {
        let scoring = test_scoring();
        assert!(consensus_columns(b"", b"ACGT", &scoring).is_none());
        assert!(consensus_columns(b"ACGT", b"", &scoring).is_none());
    }

    #[test]
    fn test_revcomp() {
        assert_eq!(revcomp(b"ACGT"), b"ACGT".to_vec());
        assert_eq!(revcomp(b"AACC"), b"GGTT".to_vec());
    }
}
