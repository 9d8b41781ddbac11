use super::{open_genome_reader, Result};
use std::path::Path;

/// A named reference sequence held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub id: String,
    pub sequence: Vec<u8>,
}

impl Reference {
    pub fn new(id: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        let mut sequence = sequence.into();
        sequence.make_ascii_uppercase();
        Self {
            id: id.into(),
            sequence,
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Loads one sequence from an indexed FASTA file.
    ///
    /// Without an `id` the FASTA must hold exactly one sequence.
    pub fn from_fasta(path: &Path, id: Option<&str>) -> Result<Self> {
        let reader = open_genome_reader(path)?;
        let name = match id {
            Some(id) => id.to_string(),
            None => {
                let num_seqs = reader.n_seqs();
                if num_seqs != 1 {
                    return Err(format!(
                        "FASTA file {} contains {} sequences; specify which one to use with --reference-id",
                        path.display(),
                        num_seqs
                    ));
                }
                reader.seq_name(0).map_err(|e| e.to_string())?
            }
        };

        let len = reader.fetch_seq_len(&name) as usize;
        if len == 0 {
            return Err(format!(
                "FASTA file {} does not contain a non-empty sequence named '{}'",
                path.display(),
                name
            ));
        }
        let sequence = reader
            .fetch_seq_string(&name, 0, len - 1)
            .map_err(|e| format!("Error fetching sequence {}: {}", name, e))?;
        log::debug!("Loaded reference {} ({} bp)", name, len);
        Ok(Self::new(name, sequence.into_bytes()))
    }
}
