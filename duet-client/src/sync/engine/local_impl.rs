use crate::SyncError;
use crate::sync::EditRange;
use crate::sync::engine::{DocState, SyncInner};
use duet_core::SyncPacket;
use duet_core::doc::{Change, DocumentError, LocalOp, TextSplice};
use duet_core::utils::LANGUAGE_REGISTER;
use tracing::{debug, warn};

impl SyncInner {
    pub(crate) fn apply_local(&self, op: LocalOp) -> Result<(), SyncError> {
        let mut state = self.state.lock();
        let doc = state.doc.as_mut().ok_or(SyncError::Detached)?;
        let applied = doc.apply(op)?;
        if let Some(update) = applied.update {
            self.broadcast(SyncPacket::Update { update });
        }
        self.project(&mut state, applied.changes);
        Ok(())
    }

    /// Assigns `register` only if no participant has set it yet, checked and
    /// written under one lock.
    pub(crate) fn assign_if_unset(&self, register: &str, value: &str) -> Result<bool, SyncError> {
        let mut state = self.state.lock();
        let doc = state.doc.as_mut().ok_or(SyncError::Detached)?;
        if doc.register(register).is_some() {
            return Ok(false);
        }
        let applied = doc.apply(LocalOp::Assign {
            register: register.to_owned(),
            value: value.to_owned(),
        })?;
        if let Some(update) = applied.update {
            self.broadcast(SyncPacket::Update { update });
        }
        self.project(&mut state, applied.changes);
        Ok(true)
    }

    /// Applies a view edit to the replica and writes it to the bound buffer,
    /// under the replica lock so that no remote edit lands in between.
    pub(crate) fn local_text_edit(
        &self,
        binding: u64,
        splice: &TextSplice,
        range: EditRange,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock();
        let DocState { doc, binding: bound } = &mut *state;
        let doc = doc.as_mut().ok_or(SyncError::Detached)?;
        let bound = match bound {
            Some(bound) if bound.id == binding => bound,
            _ => return Err(SyncError::Released),
        };

        let len = doc.text().chars().count();
        let splice = match range {
            EditRange::Strict => {
                let end = splice
                    .index
                    .checked_add(splice.delete)
                    .filter(|end| *end <= len)
                    .ok_or(DocumentError::IndexOutOfBounds {
                        index: splice.index.saturating_add(splice.delete),
                        len,
                    })?;
                TextSplice {
                    index: splice.index,
                    delete: end - splice.index,
                    insert: splice.insert.clone(),
                }
            }
            EditRange::Clamp => {
                let index = splice.index.min(len);
                let end = index.saturating_add(splice.delete).min(len);
                TextSplice {
                    index,
                    delete: end - index,
                    insert: splice.insert.clone(),
                }
            }
        };
        if splice.delete == 0 && splice.insert.is_empty() {
            return Ok(());
        }

        let mut ops = Vec::with_capacity(2);
        if splice.delete > 0 {
            ops.push(LocalOp::Delete {
                index: splice.index,
                len: splice.delete,
            });
        }
        if !splice.insert.is_empty() {
            ops.push(LocalOp::Insert {
                index: splice.index,
                text: splice.insert.clone(),
            });
        }

        for op in ops {
            let applied = doc.apply(op)?;
            if let Some(update) = applied.update {
                self.broadcast(SyncPacket::Update { update });
            }
        }
        bound.buffer.apply_splice(&splice);
        Ok(())
    }

    /// Integrates a remote update and projects its effects, all under the
    /// replica lock.
    pub(crate) fn merge_remote(&self, update: &[u8]) {
        let mut state = self.state.lock();
        let Some(doc) = state.doc.as_mut() else {
            return;
        };
        match doc.merge(update) {
            Ok(changes) => self.project(&mut state, changes),
            Err(e) => warn!("Dropped undecodable update in room {}: {}", self.room, e),
        }
    }

    fn project(&self, state: &mut DocState, changes: Vec<Change>) {
        for change in changes {
            match change {
                Change::Text(splice) => {
                    if let Some(bound) = state.binding.as_mut() {
                        bound.buffer.apply_splice(&splice);
                    }
                }
                Change::Register { name, value } if name == LANGUAGE_REGISTER => {
                    debug!("Language of room {} is now {:?}", self.room, value);
                    self.language.send_replace(value);
                }
                Change::Register { .. } => {}
                Change::Output(lines) => {
                    self.output.send_replace(lines);
                }
            }
        }
    }

    pub(crate) fn is_bound(&self, binding: u64) -> bool {
        self.state
            .lock()
            .binding
            .as_ref()
            .is_some_and(|b| b.id == binding)
    }

    pub(crate) fn unbind(&self, binding: u64) {
        let mut state = self.state.lock();
        if state.binding.as_ref().is_some_and(|b| b.id == binding) {
            state.binding = None;
            debug!("Released editor binding in room {}", self.room);
        }
    }
}
