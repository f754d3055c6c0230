use super::breakpoints::BreakpointIndex;
use super::stats::SampleTally;
use rust_htslib::bam::record::{Aux, Cigar};
use rust_htslib::bam::Record;
use std::collections::BTreeMap;

/// Breakpoint crossings of one read: SV id to the reference position of the
/// hit and the read coordinate at which it happens. For reverse-strand
/// records the read coordinate is stored as `readlen - sp` so that the
/// prefix/suffix checks of the scorer see a consistent orientation.
pub type Crossings = BTreeMap<usize, (i64, i64)>;

/// Walks the CIGAR of an accepted record: updates the coverage track, the
/// read-length histogram and the per-base error tallies, and collects the
/// first crossing per SV.
pub fn scan_record(
    rec: &Record,
    bpi: &BreakpointIndex,
    cov: &mut [u16],
    tally: &mut SampleTally,
) -> Crossings {
    let readlen = rec.seq_len() as i64;
    tally.record_read_len(rec.seq_len());
    let reverse = rec.is_reverse();
    let mut rp = rec.pos();
    let mut sp: i64 = 0;
    let mut crossings = Crossings::new();

    let record_hit = |crossings: &mut Crossings, rp: i64, sp: i64| {
        if bpi.is_breakpoint(rp) {
            for svid in bpi.ids_at(rp) {
                crossings
                    .entry(svid)
                    .or_insert_with(|| if reverse { (rp, readlen - sp) } else { (rp, sp) });
            }
        }
    };

    for op in rec.cigar().iter() {
        match *op {
            Cigar::Match(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
                let diff = matches!(*op, Cigar::Diff(_));
                for _ in 0..len {
                    if (rp as usize) < cov.len() && cov[rp as usize] < u16::MAX - 1 {
                        cov[rp as usize] += 1;
                    }
                    record_hit(&mut crossings, rp, sp);
                    if diff {
                        tally.mismatch_count += 1;
                    } else {
                        tally.match_count += 1;
                    }
                    sp += 1;
                    rp += 1;
                }
            }
            Cigar::Del(len) | Cigar::RefSkip(len) => {
                tally.del_count += 1;
                for _ in 0..len {
                    record_hit(&mut crossings, rp, sp);
                    rp += 1;
                }
            }
            Cigar::Ins(len) => {
                tally.ins_count += 1;
                sp += i64::from(len);
            }
            Cigar::SoftClip(len) => {
                sp += i64::from(len);
            }
            Cigar::HardClip(_) => {}
            _ => log::warn!("Unknown CIGAR operation: {}", op.char()),
        }
    }
    crossings
}

/// HP haplotype tag of a record, if present. Accepts any integer encoding.
pub fn get_hp_tag(rec: &Record) -> Option<i64> {
    match rec.aux(b"HP") {
        Ok(Aux::U8(v)) => Some(i64::from(v)),
        Ok(Aux::I8(v)) => Some(i64::from(v)),
        Ok(Aux::U16(v)) => Some(i64::from(v)),
        Ok(Aux::I16(v)) => Some(i64::from(v)),
        Ok(Aux::U32(v)) => Some(i64::from(v)),
        Ok(Aux::I32(v)) => Some(i64::from(v)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::svgt::probe::Probe;
    use crate::svgt::sv::SvType;
    use rust_htslib::bam::record::CigarString;

    fn make_record(pos: i64, cigar: CigarString, seq_len: usize, reverse: bool) -> Record {
        let mut rec = Record::new();
        let seq = vec![b'A'; seq_len];
        let qual = vec![40u8; seq_len];
        rec.set(b"read", Some(&cigar), &seq, &qual);
        rec.set_pos(pos);
        if reverse {
            rec.set_flags(0x10);
        }
        rec
    }

    fn index_with_breakpoint(pos: i64, contig_len: usize) -> BreakpointIndex {
        let probe = Probe {
            sv_start: Some(pos),
            ref_seq: "A".to_string(),
            alt_seq: "A".to_string(),
            svt: Some(SvType::Del),
            ..Probe::default()
        };
        BreakpointIndex::new(&[probe], contig_len)
    }

    #[test]
    fn test_coverage_and_match_counts() {
        let bpi = index_with_breakpoint(5000, 10_000);
        let mut cov = vec![0u16; 10_000];
        let mut tally = SampleTally::new();
        let rec = make_record(100, CigarString(vec![Cigar::Match(100)]), 100, false);
        let crossings = scan_record(&rec, &bpi, &mut cov, &mut tally);
        assert!(crossings.is_empty());
        assert_eq!(cov[100], 1);
        assert_eq!(cov[199], 1);
        assert_eq!(cov[99], 0);
        assert_eq!(cov[200], 0);
        assert_eq!(tally.match_count, 100);
        assert_eq!(tally.mismatch_count, 0);
        assert_eq!(tally.rl_dist[1], 1);
    }

    #[test]
    fn test_forward_crossing_coordinates() {
        let bpi = index_with_breakpoint(180, 10_000);
        let mut cov = vec![0u16; 10_000];
        let mut tally = SampleTally::new();
        let rec = make_record(100, CigarString(vec![Cigar::Match(100)]), 100, false);
        let crossings = scan_record(&rec, &bpi, &mut cov, &mut tally);
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[&0], (180, 80));
    }

    #[test]
    fn test_reverse_crossing_flips_read_coordinate() {
        let bpi = index_with_breakpoint(180, 10_000);
        let mut cov = vec![0u16; 10_000];
        let mut tally = SampleTally::new();
        let rec = make_record(100, CigarString(vec![Cigar::Match(100)]), 100, true);
        let crossings = scan_record(&rec, &bpi, &mut cov, &mut tally);
        assert_eq!(crossings[&0], (180, 20));
    }

    #[test]
    fn test_soft_clip_advances_read_pointer() {
        let bpi = index_with_breakpoint(180, 10_000);
        let mut cov = vec![0u16; 10_000];
        let mut tally = SampleTally::new();
        let cigar = CigarString(vec![Cigar::SoftClip(10), Cigar::Match(90)]);
        let rec = make_record(100, cigar, 100, false);
        let crossings = scan_record(&rec, &bpi, &mut cov, &mut tally);
        assert_eq!(crossings[&0], (180, 90));
        assert_eq!(tally.match_count, 90);
    }

    #[test]
    fn test_deletion_crossing_keeps_read_pointer() {
        let bpi = index_with_breakpoint(155, 10_000);
        let mut cov = vec![0u16; 10_000];
        let mut tally = SampleTally::new();
        let cigar = CigarString(vec![Cigar::Match(50), Cigar::Del(10), Cigar::Match(50)]);
        let rec = make_record(100, cigar, 100, false);
        let crossings = scan_record(&rec, &bpi, &mut cov, &mut tally);
        // the crossing falls inside the deletion: rp advanced, sp did not
        assert_eq!(crossings[&0], (155, 50));
        assert_eq!(tally.del_count, 1);
        assert_eq!(cov[155], 0);
        assert_eq!(cov[149], 1);
        assert_eq!(cov[160], 1);
    }

    #[test]
    fn test_insertion_counts_once() {
        let bpi = index_with_breakpoint(5000, 10_000);
        let mut cov = vec![0u16; 10_000];
        let mut tally = SampleTally::new();
        let cigar = CigarString(vec![Cigar::Match(40), Cigar::Ins(20), Cigar::Match(40)]);
        let rec = make_record(100, cigar, 100, false);
        scan_record(&rec, &bpi, &mut cov, &mut tally);
        assert_eq!(tally.ins_count, 1);
        assert_eq!(tally.match_count, 80);
    }

    #[test]
    fn test_unknown_op_is_skipped() {
        let bpi = index_with_breakpoint(5000, 10_000);
        let mut cov = vec![0u16; 10_000];
        let mut tally = SampleTally::new();
        let cigar = CigarString(vec![Cigar::Match(50), Cigar::Pad(5), Cigar::Match(50)]);
        let rec = make_record(100, cigar, 100, false);
        scan_record(&rec, &bpi, &mut cov, &mut tally);
        // pad advances neither pointer; both match blocks still count
        assert_eq!(tally.match_count, 100);
        assert_eq!(cov[100], 1);
        assert_eq!(cov[199], 1);
    }

    #[test]
    fn test_coverage_saturates() {
        let bpi = index_with_breakpoint(5000, 10_000);
        let mut cov = vec![0u16; 10_000];
        cov[100] = u16::MAX - 1;
        let mut tally = SampleTally::new();
        let rec = make_record(100, CigarString(vec![Cigar::Match(10)]), 10, false);
        scan_record(&rec, &bpi, &mut cov, &mut tally);
        assert_eq!(cov[100], u16::MAX - 1);
        assert_eq!(cov[101], 1);
    }

    #[test]
    fn test_hp_tag_decoding() {
        let mut rec = make_record(0, CigarString(vec![Cigar::Match(4)]), 4, false);
        assert_eq!(get_hp_tag(&rec), None);
        rec.push_aux(b"HP", Aux::U8(1)).unwrap();
        assert_eq!(get_hp_tag(&rec), Some(1));

        let mut rec = make_record(0, CigarString(vec![Cigar::Match(4)]), 4, false);
        rec.push_aux(b"HP", Aux::I32(2)).unwrap();
        assert_eq!(get_hp_tag(&rec), Some(2));
    }
}
