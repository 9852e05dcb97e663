use std::fmt;

/// Negotiation state of a session, as observed by the view.
///
/// `HaveLocalOffer`/`HaveRemoteOffer` hold until the transport reports
/// connectivity; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    New,
    HaveLocalOffer,
    HaveRemoteOffer,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

impl SessionState {
    pub fn is_closed(self) -> bool {
        self == SessionState::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::New => "new",
            SessionState::HaveLocalOffer => "have-local-offer",
            SessionState::HaveRemoteOffer => "have-remote-offer",
            SessionState::Connected => "connected",
            SessionState::Disconnected => "disconnected",
            SessionState::Failed => "failed",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Connectivity reported by a peer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}
