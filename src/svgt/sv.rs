use std::fmt;
use std::str::FromStr;

/// Structural variant classes, including junction orientations for
/// inversions and translocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SvType {
    Inv3to3,
    Inv5to5,
    Del,
    Dup,
    Ins,
    Bnd3to3,
    Bnd5to5,
    Bnd3to5,
    Bnd5to3,
}

impl SvType {
    pub fn is_translocation(&self) -> bool {
        matches!(
            self,
            SvType::Bnd3to3 | SvType::Bnd5to5 | SvType::Bnd3to5 | SvType::Bnd5to3
        )
    }

    pub fn is_inversion(&self) -> bool {
        matches!(self, SvType::Inv3to3 | SvType::Inv5to5)
    }

    /// Type letters used in allele tags and dump-file ids.
    pub fn code(&self) -> &'static str {
        match self {
            SvType::Inv3to3 | SvType::Inv5to5 => "INV",
            SvType::Del => "DEL",
            SvType::Dup => "DUP",
            SvType::Ins => "INS",
            SvType::Bnd3to3 | SvType::Bnd5to5 | SvType::Bnd3to5 | SvType::Bnd5to3 => "BND",
        }
    }

    /// Orientation with the two breakpoint sides swapped, used when a
    /// translocation record is normalized to mate-first contig order.
    pub fn swapped_sides(&self) -> SvType {
        match self {
            SvType::Bnd3to5 => SvType::Bnd5to3,
            SvType::Bnd5to3 => SvType::Bnd3to5,
            other => *other,
        }
    }
}

impl FromStr for SvType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEL" => Ok(SvType::Del),
            "INS" => Ok(SvType::Ins),
            "DUP" => Ok(SvType::Dup),
            "INV" | "INV3to3" => Ok(SvType::Inv3to3),
            "INV5to5" => Ok(SvType::Inv5to5),
            "BND" | "BND3to3" => Ok(SvType::Bnd3to3),
            "BND5to5" => Ok(SvType::Bnd5to5),
            "BND3to5" => Ok(SvType::Bnd3to5),
            "BND5to3" => Ok(SvType::Bnd5to3),
            _ => Err(format!("Unknown SV type: {}", s)),
        }
    }
}

impl fmt::Display for SvType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A candidate structural variant. Positions are 0-based reference
/// coordinates; `sv_start` lies on `chr` and `sv_end` on `chr2` (equal to
/// `chr` for everything but translocations).
#[derive(Debug, Clone)]
pub struct StructuralVariantRecord {
    pub id: usize,
    pub chr: usize,
    pub chr2: usize,
    pub sv_start: i64,
    pub sv_end: i64,
    pub svt: SvType,
    pub consensus: String,
    pub ins_len: i64,
    pub precise: bool,
    pub alleles: String,
}

/// Symbolic `ref,alt` allele tag from the reference base at the start
/// breakpoint. Translocations get the VCF breakend form pointing at the
/// mate contig.
pub fn symbolic_alleles(ref_base: char, chr2_name: &str, sv: &StructuralVariantRecord) -> String {
    let r = ref_base;
    let p = sv.sv_end;
    match sv.svt {
        SvType::Bnd3to3 => format!("{r},{r}]{chr2_name}:{p}]"),
        SvType::Bnd5to5 => format!("{r},[{chr2_name}:{p}[{r}"),
        SvType::Bnd3to5 => format!("{r},{r}[{chr2_name}:{p}["),
        SvType::Bnd5to3 => format!("{r},]{chr2_name}:{p}]{r}"),
        _ => format!("{},<{}>", r, sv.svt.code()),
    }
}

/// Exact allele tag for consensus-resolved deletions and insertions.
pub fn precise_alleles(ref_vcf: &str, alt_vcf: &str) -> String {
    format!("{},{}", ref_vcf, alt_vcf)
}
