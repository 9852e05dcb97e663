use async_trait::async_trait;
use duet_client::NegotiationError;
use duet_client::session::{LocalMedia, PeerConnector, PeerEventSink, PeerLink};
use duet_core::{IceCandidate, IceServerConfig, SdpKind, SessionDescription};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// What the engine asked a link to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCall {
    CreateOffer,
    CreateAnswer,
    SetLocal(SdpKind),
    SetRemote(SdpKind),
    AddCandidate(String),
    Close,
}

/// Mock PeerConnector that hands out scripted links and records every call
/// together with the generation of the link it was made on.
#[derive(Clone, Default)]
pub struct MockPeerConnector {
    inner: Arc<ConnectorInner>,
}

#[derive(Default)]
struct ConnectorInner {
    calls: Mutex<Vec<(u64, LinkCall)>>,
    sinks: Mutex<Vec<PeerEventSink>>,
    ice_servers: Mutex<Vec<Vec<IceServerConfig>>>,
    fail_remote: AtomicBool,
}

impl MockPeerConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(u64, LinkCall)> {
        self.inner.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, generation: u64) -> Vec<LinkCall> {
        self.calls()
            .into_iter()
            .filter(|(g, _)| *g == generation)
            .map(|(_, call)| call)
            .collect()
    }

    pub fn link_count(&self) -> usize {
        self.inner.sinks.lock().unwrap().len()
    }

    /// Event sink of the n-th link created (0-based).
    pub fn sink(&self, index: usize) -> PeerEventSink {
        self.inner.sinks.lock().unwrap()[index].clone()
    }

    pub fn ice_servers_used(&self) -> Vec<Vec<IceServerConfig>> {
        self.inner.ice_servers.lock().unwrap().clone()
    }

    /// Makes every `set_remote_description` fail from now on.
    pub fn fail_remote_descriptions(&self) {
        self.inner.fail_remote.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PeerConnector for MockPeerConnector {
    async fn connect(
        &self,
        ice_servers: &[IceServerConfig],
        _media: &LocalMedia,
        events: PeerEventSink,
    ) -> Result<Arc<dyn PeerLink>, NegotiationError> {
        let generation = events.generation();
        self.inner.sinks.lock().unwrap().push(events);
        self.inner
            .ice_servers
            .lock()
            .unwrap()
            .push(ice_servers.to_vec());
        Ok(Arc::new(MockPeerLink {
            generation,
            inner: self.inner.clone(),
        }))
    }
}

struct MockPeerLink {
    generation: u64,
    inner: Arc<ConnectorInner>,
}

impl MockPeerLink {
    fn record(&self, call: LinkCall) {
        tracing::debug!("[MockPeerLink #{}] {:?}", self.generation, call);
        self.inner
            .calls
            .lock()
            .unwrap()
            .push((self.generation, call));
    }
}

#[async_trait]
impl PeerLink for MockPeerLink {
    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        self.record(LinkCall::CreateOffer);
        Ok(SessionDescription::offer(format!("offer-{}", self.generation)))
    }

    async fn create_answer(&self) -> Result<SessionDescription, NegotiationError> {
        self.record(LinkCall::CreateAnswer);
        Ok(SessionDescription::answer(format!("answer-{}", self.generation)))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), NegotiationError> {
        self.record(LinkCall::SetLocal(desc.kind));
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), NegotiationError> {
        self.record(LinkCall::SetRemote(desc.kind));
        if self.inner.fail_remote.load(Ordering::SeqCst) {
            return Err(NegotiationError::Sdp("scripted failure".to_owned()));
        }
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), NegotiationError> {
        self.record(LinkCall::AddCandidate(candidate.candidate));
        Ok(())
    }

    async fn close(&self) -> Result<(), NegotiationError> {
        self.record(LinkCall::Close);
        Ok(())
    }
}
