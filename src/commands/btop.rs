use crate::cli::BtopArgs;
use crate::reads::btop::{btop_to_cigar, count_gaps};
use crate::utils::Result;

pub fn btop(args: BtopArgs) -> Result<()> {
    for btop in &args.btops {
        let (query_gaps, subject_gaps) = count_gaps(btop)?;
        log::debug!(
            "BTOP {} has {} query gaps and {} subject gaps",
            btop,
            query_gaps,
            subject_gaps
        );
        println!("{}", btop_to_cigar(btop, args.concise)?);
    }
    Ok(())
}
