mod candidates;
mod engine;
mod media;
mod peer;
mod rtc_peer;
mod state;

pub use candidates::*;
pub use engine::*;
pub use media::*;
pub use peer::*;
pub use rtc_peer::*;
pub use state::*;
