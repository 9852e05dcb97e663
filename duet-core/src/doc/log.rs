use crate::doc::id::{OpId, Stamp};

#[derive(Debug, Clone)]
struct Epoch {
    id: OpId,
    stamp: Stamp,
    entries: Vec<String>,
}

/// Replicated output log.
///
/// A replace opens a new epoch carrying its full contents in one operation,
/// so peers never observe a half-cleared log. Appends name the epoch they
/// extend and are ordered by stamp inside it; appends aimed at a superseded
/// epoch are dropped.
#[derive(Debug, Clone, Default)]
pub(crate) struct EpochLog {
    current: Option<Epoch>,
    appended: Vec<(Stamp, String)>,
}

impl EpochLog {
    pub fn epoch(&self) -> Option<OpId> {
        self.current.as_ref().map(|epoch| epoch.id)
    }

    /// Returns true when the winning epoch changed.
    pub fn replace(&mut self, id: OpId, stamp: Stamp, entries: Vec<String>) -> bool {
        if self
            .current
            .as_ref()
            .is_some_and(|current| current.stamp >= stamp)
        {
            return false;
        }
        self.current = Some(Epoch { id, stamp, entries });
        self.appended.clear();
        true
    }

    /// Returns true when the entry became visible.
    pub fn append(&mut self, epoch: Option<OpId>, stamp: Stamp, entry: String) -> bool {
        if epoch != self.epoch() {
            return false;
        }
        let at = self.appended.partition_point(|(existing, _)| *existing < stamp);
        self.appended.insert(at, (stamp, entry));
        true
    }

    pub fn entries(&self) -> Vec<String> {
        let base = self
            .current
            .as_ref()
            .map(|epoch| epoch.entries.as_slice())
            .unwrap_or_default();
        base.iter()
            .cloned()
            .chain(self.appended.iter().map(|(_, entry)| entry.clone()))
            .collect()
    }
}
