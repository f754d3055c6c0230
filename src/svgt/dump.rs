use super::sv::SvType;
use crate::utils::Result;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// One row of the split-read dump: an accepted alt vote.
pub struct DumpRecord<'a> {
    pub svid: usize,
    pub svt: SvType,
    pub bam: &'a str,
    pub qname: &'a str,
    pub chr: &'a str,
    pub pos: i64,
    pub mate_chr: &'a str,
    pub mate_pos: i64,
    pub mapq: u8,
}

/// Gzip-compressed text dump of alt-supporting reads, one line per vote.
pub struct DumpWriter {
    out: GzEncoder<BufWriter<File>>,
}

fn format_record(rec: &DumpRecord) -> String {
    format!(
        "{}{:08}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\tSR",
        rec.svt.code(),
        rec.svid,
        rec.bam,
        rec.qname,
        rec.chr,
        rec.pos,
        rec.mate_chr,
        rec.mate_pos,
        rec.mapq
    )
}

impl DumpWriter {
    pub fn create(path: &Path) -> Result<DumpWriter> {
        let file = File::create(path)
            .map_err(|e| format!("Failed to create dump file {}: {}", path.display(), e))?;
        let mut out = GzEncoder::new(BufWriter::new(file), Compression::default());
        writeln!(out, "#svid\tbam\tqname\tchr\tpos\tmatechr\tmatepos\tmapq\ttype")
            .map_err(|e| e.to_string())?;
        Ok(DumpWriter { out })
    }

    pub fn write_record(&mut self, rec: &DumpRecord) -> Result<()> {
        writeln!(self.out, "{}", format_record(rec)).map_err(|e| e.to_string())
    }

    pub fn finish(self) -> Result<()> {
        self.out.finish().map(|_| ()).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_format() {
        let rec = DumpRecord {
            svid: 37,
            svt: SvType::Del,
            bam: "sample1.bam",
            qname: "read/1",
            chr: "chr1",
            pos: 11000,
            mate_chr: "chr1",
            mate_pos: 11500,
            mapq: 60,
        };
        assert_eq!(
            format_record(&rec),
            "DEL00000037\tsample1.bam\tread/1\tchr1\t11000\tchr1\t11500\t60\tSR"
        );
    }

    #[test]
    fn test_record_format_mateless() {
        let rec = DumpRecord {
            svid: 1,
            svt: SvType::Bnd3to5,
            bam: "s.bam",
            qname: "q",
            chr: "chr2",
            pos: 5,
            mate_chr: "*",
            mate_pos: -1,
            mapq: 0,
        };
        assert_eq!(format_record(&rec), "BND00000001\ts.bam\tq\tchr2\t5\t*\t-1\t0\tSR");
    }
}
