mod relay_client;
mod signaling;

pub use relay_client::*;
pub use signaling::*;
