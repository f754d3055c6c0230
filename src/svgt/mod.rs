pub mod aggregate;
pub mod annotate;
pub mod breakpoints;
pub mod catalog;
pub mod dump;
pub mod probe;
pub mod scan;
pub mod scorer;
pub mod stats;
pub mod sv;

pub use annotate::{annotate_svs, GenotypeConfig, SvGenotypes};
pub use catalog::{read_catalog, ContigLayout};
pub use sv::{StructuralVariantRecord, SvType};
