use crate::cli::ConsensusArgs;
use crate::consensus::{consensus_from_bam, Consensus, ConsensusParams, ReadFilter};
use crate::utils::{Reference, Result};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    time::Instant,
};

const FASTA_LINE_WIDTH: usize = 60;

pub fn consensus(args: ConsensusArgs) -> Result<()> {
    let start_timer = Instant::now();

    let reference = match &args.reference_path {
        Some(path) => Some(Reference::from_fasta(path, args.reference_id.as_deref())?),
        None => None,
    };

    let params = ConsensusParams {
        threshold: args.threshold,
        min_coverage: args.min_coverage,
        low_coverage: args.low_coverage,
        no_coverage: args.no_coverage,
        deletion_symbol: args.deletion_symbol.clone(),
        deletion_threshold: args.deletion_threshold,
        insertion_count_threshold: args.insertion_count_threshold,
        ignore_quality: args.ignore_quality,
        include_soft_clipped: args.include_soft_clipped,
        strategy: args.strategy,
        progress: args.progress,
    };
    log::debug!(
        "Strategy {:?}, low coverage '{}', no coverage '{}'",
        params.strategy,
        params.low_coverage,
        params.no_coverage
    );
    let filter = ReadFilter {
        min_mapq: args.min_mapq,
    };

    let consensus = consensus_from_bam(
        &args.bam_path,
        args.reference_id.as_deref(),
        reference.as_ref(),
        &params,
        &filter,
        args.compare_report.as_deref().map(Path::new),
    )
    .map_err(|e| e.to_string())?;

    let id = args
        .consensus_id
        .clone()
        .unwrap_or_else(|| format!("{}-consensus", consensus.reference_id));

    let written = match &args.output_path {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| format!("Failed to create {}: {}", path, e))?;
            write_fasta(&mut BufWriter::new(file), &id, &consensus)
        }
        None => write_fasta(&mut BufWriter::new(io::stdout().lock()), &id, &consensus),
    };
    written.map_err(|e| format!("Failed to write consensus: {}", e))?;

    log::info!("Total execution time: {:.2?}", start_timer.elapsed());
    Ok(())
}

fn write_fasta<W: Write>(out: &mut W, id: &str, consensus: &Consensus) -> io::Result<()> {
    writeln!(out, ">{}", id)?;
    for line in consensus.sequence.as_bytes().chunks(FASTA_LINE_WIDTH) {
        out.write_all(line)?;
        out.write_all(b"\n")?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consensus(sequence: &str) -> Consensus {
        Consensus {
            reference_id: "ref1".to_string(),
            sequence: sequence.to_string(),
            read_count: 1,
        }
    }

    #[test]
    fn fasta_lines_are_wrapped() {
        let mut out = Vec::new();
        write_fasta(&mut out, "ref1-consensus", &consensus(&"A".repeat(61))).unwrap();
        let expected = format!(">ref1-consensus\n{}\nA\n", "A".repeat(60));
        assert_eq!(String::from_utf8(out).unwrap(), expected);
    }

    #[test]
    fn empty_consensus_has_only_a_header() {
        let mut out = Vec::new();
        write_fasta(&mut out, "c", &consensus("")).unwrap();
        assert_eq!(out, b">c\n");
    }
}
