use thiserror::Error;

use crate::doc::id::OpId;
use crate::model::CodecError;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("index {index} is out of bounds for text of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("operation refers to unknown item {0:?}")]
    UnknownItem(OpId),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
