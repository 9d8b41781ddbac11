mod bam_utils;
pub use bam_utils::{get_bam_references, open_bam_reader, BamReference};

mod readers;
pub use readers::open_genome_reader;

mod reference;
pub use reference::Reference;

mod util;
pub use util::{handle_error_and_exit, Result};
