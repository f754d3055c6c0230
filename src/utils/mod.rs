pub mod align;
mod util;

pub use align::{banded_aligner, consensus_columns, overlap_score, revcomp, AlignScoring, BandedAligner};
pub use util::{handle_error_and_exit, Result};
