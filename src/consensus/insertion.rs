use super::bases::{BaseCall, Bases};

/// Inserted bases from all reads that insert before the same reference offset.
#[derive(Debug, Clone)]
pub struct Insertion {
    /// Reference offset the insertion precedes.
    offset: i64,
    /// Per read: where the run is pinned to the reference, `None` if it floats
    /// against the following matched position.
    anchors: Vec<Option<i64>>,
    /// Per read: the inserted bases.
    runs: Vec<Vec<BaseCall>>,
}

impl Insertion {
    pub fn new(offset: i64) -> Self {
        Self {
            offset,
            anchors: Vec::new(),
            runs: Vec::new(),
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Opens the run of a new read.
    pub fn start(&mut self, anchor: Option<i64>) {
        self.anchors.push(anchor);
        self.runs.push(Vec::new());
    }

    /// Adds a base to the most recently started run.
    ///
    /// # Panics
    /// If no run has been started.
    pub fn append(&mut self, base: u8, quality: u32) {
        self.runs
            .last_mut()
            .unwrap_or_else(|| panic!("Insertion at {} has no open run", self.offset))
            .push(BaseCall { base, quality });
    }

    /// Number of reads with evidence for this insertion.
    pub fn read_count(&self) -> usize {
        self.runs.len()
    }

    /// Merges the runs of all reads into one accumulator per inserted position.
    ///
    /// The window is as long as the longest run, widened to fit the end of every
    /// anchored run measured from its anchor. Anchored runs fill the window from
    /// its start; floating runs are right-aligned against the following base.
    pub fn resolve(self) -> Vec<Bases> {
        let longest = self.runs.iter().map(Vec::len).max().unwrap_or(0);
        let length = self
            .anchors
            .iter()
            .zip(&self.runs)
            .filter_map(|(anchor, run)| {
                anchor.map(|anchor| (anchor - self.offset).max(0) as usize + run.len())
            })
            .fold(longest, usize::max);

        let mut window = vec![Bases::new(); length];
        for (anchor, run) in self.anchors.into_iter().zip(self.runs) {
            let start = match anchor {
                Some(_) => 0,
                None => length - run.len(),
            };
            for (bases, call) in window[start..].iter_mut().zip(run) {
                bases.append(call.base, call.quality);
            }
        }
        window
    }
}
