//! Replicated shared document: one text sequence, named last-writer-wins
//! registers and an output log, merged without coordination.
//!
//! Operations carry a per-replica sequence number, so a replica can tell a
//! duplicate from a gap. Updates may arrive in any order and any number of
//! times; replicas that integrated the same set of operations hold the same
//! state.

mod error;
mod id;
mod log;
mod op;
mod register;
mod replica;
mod text;

pub use error::DocumentError;
pub use id::{OpId, ReplicaId, Stamp, VersionVector};
pub use op::{DocUpdate, Op, OpKind};
pub use replica::Replica;

/// Local edit against the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOp {
    Insert { index: usize, text: String },
    Delete { index: usize, len: usize },
    Assign { register: String, value: String },
    AppendOutput(String),
    ReplaceOutput(Vec<String>),
}

/// Contiguous text edit in character offsets: remove `delete` characters at
/// `index`, then insert `insert` there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSplice {
    pub index: usize,
    pub delete: usize,
    pub insert: String,
}

/// Observable effect of applying or merging operations. Text splices are
/// ordered and meant to be applied one after another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Text(TextSplice),
    Register { name: String, value: Option<String> },
    Output(Vec<String>),
}

/// Result of a local edit: the encoded update to broadcast (if any
/// operation was produced) and the changes it caused.
#[derive(Debug, Clone, Default)]
pub struct Applied {
    pub update: Option<Vec<u8>>,
    pub changes: Vec<Change>,
}

/// Storage seam of the sync engine.
pub trait DocumentBackend: Send + 'static {
    fn replica_id(&self) -> ReplicaId;

    fn apply(&mut self, op: LocalOp) -> Result<Applied, DocumentError>;

    /// Integrates an encoded update. Duplicates are ignored; operations whose
    /// dependencies are missing are held back until they arrive.
    fn merge(&mut self, update: &[u8]) -> Result<Vec<Change>, DocumentError>;

    fn state_vector(&self) -> Result<Vec<u8>, DocumentError>;

    /// Encoded update with everything the holder of `state_vector` lacks.
    fn diff(&self, state_vector: &[u8]) -> Result<Vec<u8>, DocumentError>;

    fn text(&self) -> String;

    fn register(&self, name: &str) -> Option<String>;

    fn output(&self) -> Vec<String>;
}
