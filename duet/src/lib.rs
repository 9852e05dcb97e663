pub use duet_core::{PeerId, RoomId};

pub mod model {
    pub use duet_core::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use duet_relay::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use duet_client::*;
}
