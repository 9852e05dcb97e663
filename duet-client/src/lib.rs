//! Client side of duet: the session negotiation engine, the shared document
//! synchronization engine and their collaborators.

mod config;
mod error;
pub mod exec;
pub mod relay;
pub mod session;
pub mod sync;

pub use config::*;
pub use error::*;
pub use exec::{CodeExecutor, ExecutionOutcome, ExecutionRequest, HttpExecutor};
pub use relay::{RelayClient, Signaling};
pub use session::{SessionEngine, SessionHandle, SessionState};
pub use sync::{EditorBinding, SyncEngine, SyncHandle, SyncStatus};
