use super::sv::{StructuralVariantRecord, SvType};
use crate::utils::Result;
use flate2::read::MultiGzDecoder;
use rust_htslib::bam::HeaderView;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Target names and lengths shared by all alignment files of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct ContigLayout {
    pub names: Vec<String>,
    pub lens: Vec<i64>,
}

impl ContigLayout {
    pub fn from_header(header: &HeaderView) -> Result<ContigLayout> {
        let mut names = Vec::new();
        let mut lens = Vec::new();
        for tid in 0..header.target_count() {
            names.push(String::from_utf8_lossy(header.tid2name(tid)).to_string());
            let len = header
                .target_len(tid)
                .ok_or_else(|| format!("Missing length for target {}", tid))?;
            lens.push(len as i64);
        }
        Ok(ContigLayout { names, lens })
    }

    pub fn tid(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

/// Opens a candidate catalog, sniffing the gzip magic bytes rather than
/// trusting the file name.
fn open_candidate_reader(path: &Path) -> Result<Box<dyn BufRead>> {
    let mut file = File::open(path)
        .map_err(|e| format!("Failed to open candidate file {}: {}", path.display(), e))?;
    let mut magic = [0u8; 2];
    let is_gzip = file.read(&mut magic).map_err(|e| e.to_string())? == 2 && magic == GZIP_MAGIC;
    file.seek(SeekFrom::Start(0)).map_err(|e| e.to_string())?;
    if is_gzip {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Reads a tab-delimited candidate catalog:
/// `CHROM  START  END  TYPE  CONSENSUS  [INSLEN]  [CHROM2]`
///
/// Positions are 0-based; `CHROM2` applies to translocations, where `END` is
/// the position on the mate contig. Malformed rows are dropped with a
/// warning. Ids are assigned densely in input order.
pub fn read_catalog(path: &Path, layout: &ContigLayout) -> Result<Vec<StructuralVariantRecord>> {
    let reader = open_candidate_reader(path)?;
    let tid_of: HashMap<&str, usize> = layout
        .names
        .iter()
        .enumerate()
        .map(|(tid, name)| (name.as_str(), tid))
        .collect();

    let mut svs = Vec::new();
    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| e.to_string())?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_line(&line, &tid_of, &layout.lens) {
            Ok(sv) => svs.push(sv),
            Err(msg) => log::warn!(
                "Skipping candidate on line {} of {}: {}",
                line_number + 1,
                path.display(),
                msg
            ),
        }
    }
    for (id, sv) in svs.iter_mut().enumerate() {
        sv.id = id;
    }
    log::debug!("Read {} SV candidates from {}", svs.len(), path.display());
    Ok(svs)
}

fn parse_line(
    line: &str,
    tid_of: &HashMap<&str, usize>,
    lens: &[i64],
) -> Result<StructuralVariantRecord> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 5 {
        return Err(format!("expected at least 5 fields, got {}", fields.len()));
    }
    let chr = *tid_of
        .get(fields[0])
        .ok_or_else(|| format!("unknown contig {}", fields[0]))?;
    let sv_start: i64 = fields[1]
        .parse()
        .map_err(|_| format!("invalid start {}", fields[1]))?;
    let sv_end: i64 = fields[2]
        .parse()
        .map_err(|_| format!("invalid end {}", fields[2]))?;
    let svt: SvType = fields[3].parse()?;
    let consensus = if fields[4] == "*" {
        String::new()
    } else {
        fields[4].to_ascii_uppercase()
    };
    let ins_len: i64 = match fields.get(5) {
        Some(f) if !f.is_empty() => f
            .parse()
            .map_err(|_| format!("invalid insertion length {}", f))?,
        _ => 0,
    };

    let chr2 = if svt.is_translocation() {
        let name = fields
            .get(6)
            .filter(|f| !f.is_empty())
            .ok_or("translocations require a CHROM2 field")?;
        *tid_of
            .get(*name)
            .ok_or_else(|| format!("unknown contig {}", name))?
    } else {
        chr
    };

    let mut sv = StructuralVariantRecord {
        id: 0,
        chr,
        chr2,
        sv_start,
        sv_end,
        svt,
        consensus: consensus.clone(),
        ins_len,
        precise: !consensus.is_empty(),
        alleles: String::new(),
    };

    // The mate contig must come first in the contig loop so that its probe
    // part is cached before the primary side is assembled.
    if sv.svt.is_translocation() && sv.chr2 > sv.chr {
        std::mem::swap(&mut sv.chr, &mut sv.chr2);
        std::mem::swap(&mut sv.sv_start, &mut sv.sv_end);
        sv.svt = sv.svt.swapped_sides();
    }

    if sv.sv_start < 0 || sv.sv_start >= lens[sv.chr] {
        return Err(format!("start {} outside contig bounds", sv.sv_start));
    }
    if sv.sv_end < 0 || sv.sv_end > lens[sv.chr2] {
        return Err(format!("end {} outside contig bounds", sv.sv_end));
    }
    if !sv.svt.is_translocation() && sv.sv_end < sv.sv_start {
        return Err(format!("end {} before start {}", sv.sv_end, sv.sv_start));
    }
    Ok(sv)
}
