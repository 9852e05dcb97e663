use std::collections::{BTreeMap, BTreeSet};

use tracing::{trace, warn};

use crate::doc::id::{OpId, ReplicaId, VersionVector};
use crate::doc::log::EpochLog;
use crate::doc::op::{DocUpdate, Op, OpKind};
use crate::doc::register::LwwRegister;
use crate::doc::text::TextSequence;
use crate::doc::{Applied, Change, DocumentBackend, DocumentError, LocalOp, TextSplice};

enum Readiness {
    Duplicate,
    Ready,
    Blocked,
}

/// Accumulates the effects of one batch and folds them into `Change`s.
#[derive(Default)]
struct ChangeSet {
    splices: Vec<TextSplice>,
    last_insert_len: usize,
    registers: BTreeSet<String>,
    output: bool,
}

impl ChangeSet {
    fn inserted(&mut self, index: usize, ch: char) {
        if let Some(last) = self.splices.last_mut() {
            if last.index + self.last_insert_len == index {
                last.insert.push(ch);
                self.last_insert_len += 1;
                return;
            }
        }
        self.splices.push(TextSplice {
            index,
            delete: 0,
            insert: ch.to_string(),
        });
        self.last_insert_len = 1;
    }

    fn deleted(&mut self, index: usize) {
        if let Some(last) = self.splices.last_mut() {
            if last.insert.is_empty() && last.index == index {
                last.delete += 1;
                return;
            }
        }
        self.splices.push(TextSplice {
            index,
            delete: 1,
            insert: String::new(),
        });
        self.last_insert_len = 0;
    }

    fn finish(self, replica: &Replica) -> Vec<Change> {
        let mut changes: Vec<Change> = self.splices.into_iter().map(Change::Text).collect();
        changes.extend(self.registers.into_iter().map(|name| Change::Register {
            value: replica.register(&name),
            name,
        }));
        if self.output {
            changes.push(Change::Output(replica.output()));
        }
        changes
    }
}

/// In-memory document replica.
#[derive(Debug, Clone)]
pub struct Replica {
    id: ReplicaId,
    clock: u64,
    version: VersionVector,
    history: Vec<Op>,
    pending: Vec<Op>,
    text: TextSequence,
    registers: BTreeMap<String, LwwRegister>,
    output: EpochLog,
}

impl Replica {
    pub fn new(id: ReplicaId) -> Self {
        Self {
            id,
            clock: 0,
            version: VersionVector::default(),
            history: Vec::new(),
            pending: Vec::new(),
            text: TextSequence::default(),
            registers: BTreeMap::new(),
            output: EpochLog::default(),
        }
    }

    pub fn version(&self) -> &VersionVector {
        &self.version
    }

    /// Number of received operations still waiting for a dependency.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.len() == 0
    }

    fn next_op(&mut self, kind: OpKind) -> Op {
        self.clock += 1;
        Op {
            id: OpId {
                replica: self.id,
                seq: self.version.get(self.id) + 1,
            },
            lamport: self.clock,
            kind,
        }
    }

    fn readiness(&self, op: &Op) -> Readiness {
        let known = self.version.get(op.id.replica);
        if op.id.seq <= known {
            return Readiness::Duplicate;
        }
        if op.id.seq != known + 1 {
            return Readiness::Blocked;
        }
        match op.dependency() {
            Some(dep) if !self.version.contains(dep) => Readiness::Blocked,
            _ => Readiness::Ready,
        }
    }

    /// Integrates a ready operation. An operation whose dependency is not a
    /// text item has no effect but still advances the version, so every
    /// replica skips it the same way and later operations are not held up.
    fn integrate(&mut self, op: Op, changes: &mut ChangeSet) {
        let stamp = op.stamp();
        match &op.kind {
            OpKind::Insert { origin, ch } => {
                match self.text.integrate_insert(op.id, stamp, *origin, *ch) {
                    Ok(index) => changes.inserted(index, *ch),
                    Err(e) => warn!(replica = %self.id, "ignoring malformed insert: {}", e),
                }
            }
            OpKind::Delete { target } => match self.text.integrate_delete(*target) {
                Ok(Some(index)) => changes.deleted(index),
                Ok(None) => {}
                Err(e) => warn!(replica = %self.id, "ignoring malformed delete: {}", e),
            },
            OpKind::Assign { register, value } => {
                let cell = self.registers.entry(register.clone()).or_default();
                if cell.assign(stamp, value.clone()) {
                    changes.registers.insert(register.clone());
                }
            }
            OpKind::ReplaceLog { entries } => {
                changes.output |= self.output.replace(op.id, stamp, entries.clone());
            }
            OpKind::AppendLog { epoch, entry } => {
                changes.output |= self.output.append(*epoch, stamp, entry.clone());
            }
        }
        self.clock = self.clock.max(op.lamport);
        self.version.advance(op.id);
        self.history.push(op);
    }

    /// Integrates every held-back operation that became ready, until no
    /// progress is made.
    fn drain_pending(&mut self, changes: &mut ChangeSet) {
        loop {
            let mut progressed = false;
            let mut i = 0;
            while i < self.pending.len() {
                match self.readiness(&self.pending[i]) {
                    Readiness::Duplicate => {
                        self.pending.swap_remove(i);
                    }
                    Readiness::Ready => {
                        let op = self.pending.swap_remove(i);
                        self.integrate(op, changes);
                        progressed = true;
                    }
                    Readiness::Blocked => i += 1,
                }
            }
            if !progressed {
                return;
            }
        }
    }

    fn local_ops(&mut self, op: LocalOp) -> Result<Vec<OpKind>, DocumentError> {
        Ok(match op {
            LocalOp::Insert { index, text } => {
                let origin = self.text.origin_for(index)?;
                // Origins of all but the first char are filled in by `apply`.
                text.chars()
                    .map(|ch| OpKind::Insert { origin, ch })
                    .collect()
            }
            LocalOp::Delete { index, len } => self
                .text
                .visible_range(index, len)?
                .into_iter()
                .map(|target| OpKind::Delete { target })
                .collect(),
            LocalOp::Assign { register, value } => vec![OpKind::Assign { register, value }],
            LocalOp::AppendOutput(entry) => vec![OpKind::AppendLog {
                epoch: self.output.epoch(),
                entry,
            }],
            LocalOp::ReplaceOutput(entries) => vec![OpKind::ReplaceLog { entries }],
        })
    }
}

impl DocumentBackend for Replica {
    fn replica_id(&self) -> ReplicaId {
        self.id
    }

    fn apply(&mut self, op: LocalOp) -> Result<Applied, DocumentError> {
        let kinds = self.local_ops(op)?;
        let mut changes = ChangeSet::default();
        let mut ops = Vec::with_capacity(kinds.len());
        let mut previous: Option<OpId> = None;

        for mut kind in kinds {
            if let (OpKind::Insert { origin, .. }, Some(prev)) = (&mut kind, previous) {
                *origin = Some(prev);
            }
            let op = self.next_op(kind);
            if matches!(op.kind, OpKind::Insert { .. }) {
                previous = Some(op.id);
            }
            self.integrate(op.clone(), &mut changes);
            ops.push(op);
        }

        let update = if ops.is_empty() {
            None
        } else {
            Some(DocUpdate { ops }.encode()?)
        };
        Ok(Applied {
            update,
            changes: changes.finish(self),
        })
    }

    fn merge(&mut self, update: &[u8]) -> Result<Vec<Change>, DocumentError> {
        let update = DocUpdate::decode(update)?;
        let mut changes = ChangeSet::default();
        let mut held = 0usize;

        for op in update.ops {
            match self.readiness(&op) {
                Readiness::Duplicate => {}
                Readiness::Ready => self.integrate(op, &mut changes),
                Readiness::Blocked => {
                    if !self.pending.iter().any(|p| p.id == op.id) {
                        self.pending.push(op);
                        held += 1;
                    }
                }
            }
        }
        self.drain_pending(&mut changes);

        if held > 0 {
            trace!(replica = %self.id, held, pending = self.pending.len(), "holding back operations");
        }
        Ok(changes.finish(self))
    }

    fn state_vector(&self) -> Result<Vec<u8>, DocumentError> {
        self.version.encode()
    }

    fn diff(&self, state_vector: &[u8]) -> Result<Vec<u8>, DocumentError> {
        let remote = VersionVector::decode(state_vector)?;
        let ops = self
            .history
            .iter()
            .filter(|op| !remote.contains(op.id))
            .cloned()
            .collect();
        DocUpdate { ops }.encode()
    }

    fn text(&self) -> String {
        self.text.text()
    }

    fn register(&self, name: &str) -> Option<String> {
        self.registers
            .get(name)
            .and_then(|cell| cell.get())
            .map(str::to_owned)
    }

    fn output(&self) -> Vec<String> {
        self.output.entries()
    }
}
