use crate::SyncError;
use crate::sync::engine::SyncInner;
use duet_core::doc::TextSplice;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Text surface of an editor view.
///
/// While bound, the buffer and the shared text only change together under
/// the replica lock: remote edits arrive through [`TextBuffer::apply_splice`]
/// and the buffer's own edits go out through the [`EditRoute`] it was given.
pub trait TextBuffer: Send + 'static {
    fn text(&self) -> String;

    /// Writes an edit that is already part of the shared text. It must not
    /// be reported back through the route.
    fn apply_splice(&mut self, splice: &TextSplice);

    /// Receives the route for edits made in the view itself. Buffers that
    /// are only edited through [`EditorBinding::edit`] can ignore it.
    fn attach_route(&mut self, _route: EditRoute) {}
}

/// How an edit's range is checked against the shared text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EditRange {
    /// Out of range is an error.
    Strict,
    /// The range is clamped to the text, the way a view clamps its cursor.
    Clamp,
}

/// Two-way link between a view buffer and the shared text.
///
/// Dropping the binding releases it.
pub struct EditorBinding {
    pub(crate) id: u64,
    pub(crate) inner: Weak<SyncInner>,
}

impl EditorBinding {
    /// Applies an edit to the buffer and the shared text in one step.
    pub fn edit(&self, splice: TextSplice) -> Result<(), SyncError> {
        let inner = self.inner.upgrade().ok_or(SyncError::Detached)?;
        inner.local_text_edit(self.id, &splice, EditRange::Strict)
    }

    pub fn is_bound(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.is_bound(self.id))
    }
}

impl Drop for EditorBinding {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.unbind(self.id);
        }
    }
}

/// Way back from a bound buffer into the shared text. Stops working once
/// its binding is released.
#[derive(Clone)]
pub struct EditRoute {
    pub(crate) id: u64,
    pub(crate) inner: Weak<SyncInner>,
}

impl EditRoute {
    /// Applies a view edit to the shared text and writes it into the bound
    /// buffer, clamped to the current text.
    pub fn edit(&self, splice: &TextSplice) -> Result<(), SyncError> {
        let inner = self.inner.upgrade().ok_or(SyncError::Detached)?;
        inner.local_text_edit(self.id, splice, EditRange::Clamp)
    }
}

type ChangeListener = Arc<dyn Fn(&TextSplice) + Send + Sync>;

/// Thread-safe text buffer that fires a change notification for every edit,
/// the way editor widgets do. Once bound, its edits go through the binding.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    chars: Arc<Mutex<Vec<char>>>,
    listener: Arc<Mutex<Option<ChangeListener>>>,
    route: Arc<Mutex<Option<EditRoute>>>,
}

impl SharedBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            chars: Arc::new(Mutex::new(text.chars().collect())),
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        self.chars.lock().iter().collect()
    }

    /// Observes every change, local or remote.
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&TextSplice) + Send + Sync + 'static,
    {
        *self.listener.lock() = Some(Arc::new(listener));
    }

    /// Edits the buffer, clamping the range to its length.
    pub fn edit(&self, splice: &TextSplice) {
        let route = self.route.lock().clone();
        if let Some(route) = route {
            match route.edit(splice) {
                Ok(()) => return,
                Err(e) => debug!("Editing unbound buffer locally: {}", e),
            }
        }
        self.write(splice);
    }

    pub fn insert(&self, index: usize, text: &str) {
        self.edit(&TextSplice {
            index,
            delete: 0,
            insert: text.to_owned(),
        });
    }

    pub fn delete(&self, index: usize, len: usize) {
        self.edit(&TextSplice {
            index,
            delete: len,
            insert: String::new(),
        });
    }

    fn write(&self, splice: &TextSplice) {
        let applied = {
            let mut chars = self.chars.lock();
            let index = splice.index.min(chars.len());
            let end = index.saturating_add(splice.delete).min(chars.len());
            let _removed: Vec<char> = chars.splice(index..end, splice.insert.chars()).collect();
            TextSplice {
                index,
                delete: end - index,
                insert: splice.insert.clone(),
            }
        };
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(&applied);
        }
    }
}

impl TextBuffer for SharedBuffer {
    fn text(&self) -> String {
        SharedBuffer::text(self)
    }

    fn apply_splice(&mut self, splice: &TextSplice) {
        self.write(splice);
    }

    fn attach_route(&mut self, route: EditRoute) {
        *self.route.lock() = Some(route);
    }
}
