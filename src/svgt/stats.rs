use itertools::izip;
use std::io::{self, Write};

/// Bin width of the read-length histogram.
pub const RL_BIN_SIZE: usize = 100;

/// Coverage values saturate at u16::MAX - 1, so the histogram needs one
/// bucket per representable value.
const COV_BUCKETS: usize = u16::MAX as usize;
const RL_BUCKETS: usize = u16::MAX as usize;

const PERCENTILES: [f64; 5] = [0.05, 0.25, 0.5, 0.75, 0.95];
const PERCENTILE_LABELS: [&str; 5] = ["95", "75", "50", "25", "5"];

/// Per-sample coverage and read-length histograms plus aligned-base error
/// tallies, accumulated over the whole run.
#[derive(Debug, Clone)]
pub struct SampleTally {
    pub cov_dist: Vec<u64>,
    pub rl_dist: Vec<u64>,
    pub match_count: u64,
    pub mismatch_count: u64,
    pub del_count: u64,
    pub ins_count: u64,
}

impl SampleTally {
    pub fn new() -> SampleTally {
        SampleTally {
            cov_dist: vec![0; COV_BUCKETS],
            rl_dist: vec![0; RL_BUCKETS],
            match_count: 0,
            mismatch_count: 0,
            del_count: 0,
            ins_count: 0,
        }
    }

    pub fn record_read_len(&mut self, len: usize) {
        let bin = len / RL_BIN_SIZE;
        if bin < self.rl_dist.len() {
            self.rl_dist[bin] += 1;
        }
    }

    pub fn accumulate_coverage(&mut self, cov: &[u16]) {
        for &c in cov {
            self.cov_dist[c as usize] += 1;
        }
    }
}

impl Default for SampleTally {
    fn default() -> SampleTally {
        SampleTally::new()
    }
}

/// Walks the cumulative histogram; the reported value for percentile `p` is
/// `i + 1` at the last index where the cumulative fraction is still below
/// `p`. An empty histogram reports zeroes.
fn dist_percentiles(dist: &[u64]) -> [usize; 5] {
    let total: u64 = dist.iter().sum();
    let mut values = [0usize; 5];
    let mut cum = 0u64;
    for (i, &n) in dist.iter().enumerate() {
        cum += n;
        let frac = cum as f64 / total as f64;
        for (value, &p) in values.iter_mut().zip(PERCENTILES.iter()) {
            if frac < p {
                *value = i + 1;
            }
        }
    }
    values
}

pub fn report<W: Write>(
    sample_names: &[String],
    tallies: &[SampleTally],
    out: &mut W,
) -> io::Result<()> {
    writeln!(out, "Coverage distribution (^COV)")?;
    for (name, tally) in izip!(sample_names, tallies) {
        let values = dist_percentiles(&tally.cov_dist);
        for (label, value) in PERCENTILE_LABELS.iter().zip(values.iter()) {
            writeln!(out, "COV\t{}\t{}% of bases are >= {}x", name, label, value)?;
        }
    }

    writeln!(out, "Read-length distribution (^RL)")?;
    for (name, tally) in izip!(sample_names, tallies) {
        let values = dist_percentiles(&tally.rl_dist);
        for (label, value) in PERCENTILE_LABELS.iter().zip(values.iter()) {
            writeln!(
                out,
                "RL\t{}\t{}% of reads are >= {}bp",
                name,
                label,
                value * RL_BIN_SIZE
            )?;
        }
    }

    writeln!(out, "Sequencing error rates (^ERR)")?;
    for (name, tally) in izip!(sample_names, tallies) {
        let aligned = tally.match_count + tally.mismatch_count + tally.del_count + tally.ins_count;
        let rate = |count: u64| count as f64 / aligned as f64;
        if tally.mismatch_count > 0 {
            writeln!(out, "ERR\t{}\tMatchRate\t{}", name, rate(tally.match_count))?;
            writeln!(
                out,
                "ERR\t{}\tMismatchRate\t{}",
                name,
                rate(tally.mismatch_count)
            )?;
        }
        writeln!(out, "ERR\t{}\tDeletionRate\t{}", name, rate(tally.del_count))?;
        writeln!(
            out,
            "ERR\t{}\tInsertionRate\t{}",
            name,
            rate(tally.ins_count)
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_walk() {
        let mut dist = vec![0u64; 20];
        dist[0] = 100; // half the bases uncovered
        dist[10] = 100; // half at 10x
        let values = dist_percentiles(&dist);
        // cumulative fraction is 0.5 from index 0 through 9, then 1.0
        assert_eq!(values, [0, 0, 0, 10, 10]);
    }

    #[test]
    fn test_percentiles_uniform() {
        let dist = vec![1u64; 100];
        let values = dist_percentiles(&dist);
        assert_eq!(values, [4, 24, 49, 74, 94]);
    }

    #[test]
    fn test_percentiles_empty() {
        let dist = vec![0u64; 100];
        assert_eq!(dist_percentiles(&dist), [0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_cumulative_totals_monotone() {
        let mut tally = SampleTally::new();
        tally.record_read_len(150);
        tally.record_read_len(250);
        tally.record_read_len(250);
        tally.record_read_len(10_000_000); // beyond the histogram, dropped
        let total: u64 = tally.rl_dist.iter().sum();
        assert_eq!(total, 3);
        assert_eq!(tally.rl_dist[1], 1);
        assert_eq!(tally.rl_dist[2], 2);
    }

    #[test]
    fn test_coverage_accumulation() {
        let mut tally = SampleTally::new();
        tally.accumulate_coverage(&[0, 0, 1, 2, u16::MAX - 1]);
        assert_eq!(tally.cov_dist[0], 2);
        assert_eq!(tally.cov_dist[1], 1);
        assert_eq!(tally.cov_dist[2], 1);
        assert_eq!(tally.cov_dist[(u16::MAX - 1) as usize], 1);
    }

    #[test]
    fn test_report_lines() {
        let mut tally = SampleTally::new();
        tally.match_count = 90;
        tally.mismatch_count = 2;
        tally.del_count = 5;
        tally.ins_count = 3;
        for _ in 0..100 {
            tally.record_read_len(950);
        }
        tally.accumulate_coverage(&vec![10u16; 100]);

        let mut out = Vec::new();
        report(&["s1".to_string()], &[tally], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Coverage distribution (^COV)");
        assert_eq!(lines[1], "COV\ts1\t95% of bases are >= 10x");
        assert_eq!(lines[5], "COV\ts1\t5% of bases are >= 10x");
        assert_eq!(lines[6], "Read-length distribution (^RL)");
        assert_eq!(lines[7], "RL\ts1\t95% of reads are >= 900bp");
        assert_eq!(lines[12], "Sequencing error rates (^ERR)");
        assert_eq!(lines[13], "ERR\ts1\tMatchRate\t0.9");
        assert_eq!(lines[14], "ERR\ts1\tMismatchRate\t0.02");
        assert_eq!(lines[15], "ERR\ts1\tDeletionRate\t0.05");
        assert_eq!(lines[16], "ERR\ts1\tInsertionRate\t0.03");
    }

    #[test]
    fn test_match_lines_suppressed_without_mismatch_ops() {
        let mut tally = SampleTally::new();
        tally.match_count = 90;
        tally.del_count = 5;
        tally.ins_count = 5;
        let mut out = Vec::new();
        report(&["s1".to_string()], &[tally], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("MatchRate"));
        assert!(!text.contains("MismatchRate"));
        assert!(text.contains("ERR\ts1\tDeletionRate\t0.05"));
    }
}
