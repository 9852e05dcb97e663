pub mod doc;
pub mod model;
pub mod utils;

pub use model::*;
