mod awareness;
mod binding;
mod engine;
mod memory;
mod transport;

pub use awareness::*;
pub use binding::*;
pub use engine::*;
pub use memory::*;
pub use transport::*;
