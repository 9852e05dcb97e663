use crate::MediaAccessError;
use crate::config::MediaConstraints;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => f.write_str("audio"),
            MediaKind::Video => f.write_str("video"),
        }
    }
}

/// One captured track. Disabling it keeps the track negotiated but
/// suppresses its samples, which the remote renders as silence or black.
pub struct LocalTrack {
    id: String,
    kind: MediaKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
    rtp: Option<Arc<TrackLocalStaticSample>>,
}

impl LocalTrack {
    /// Track without an RTP sender attached.
    pub fn new(id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
            rtp: None,
        }
    }

    pub fn with_rtp(kind: MediaKind, rtp: Arc<TrackLocalStaticSample>) -> Self {
        Self {
            id: rtp.id().to_owned(),
            rtp: Some(rtp),
            ..Self::new(String::new(), kind)
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Flips the enabled flag and returns the new value.
    pub fn toggle(&self) -> bool {
        !self.enabled.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn stop(&self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            debug!("Stopped local {} track {}", self.kind, self.id);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn rtp_track(&self) -> Option<Arc<TrackLocalStaticSample>> {
        self.rtp.clone()
    }

    /// Hands an encoded sample to the RTP sender. Returns `false` when the
    /// sample was dropped because the track is disabled, stopped or detached.
    pub async fn write_sample(&self, sample: &Sample) -> Result<bool, webrtc::Error> {
        if !self.is_enabled() || self.is_stopped() {
            return Ok(false);
        }
        match &self.rtp {
            Some(rtp) => {
                rtp.write_sample(sample).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("enabled", &self.is_enabled())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// The local capture of a session: zero or more audio and video tracks.
#[derive(Debug, Default)]
pub struct LocalMedia {
    tracks: Vec<Arc<LocalTrack>>,
}

impl LocalMedia {
    pub fn new(tracks: Vec<Arc<LocalTrack>>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Arc<LocalTrack>] {
        &self.tracks
    }

    pub fn tracks_of(&self, kind: MediaKind) -> impl Iterator<Item = &Arc<LocalTrack>> {
        self.tracks.iter().filter(move |t| t.kind() == kind)
    }

    /// Flips every track of `kind`. Returns the new state of the first one,
    /// or `None` when there is no such track.
    pub fn toggle(&self, kind: MediaKind) -> Option<bool> {
        let mut first = None;
        for track in self.tracks_of(kind) {
            let enabled = track.toggle();
            first.get_or_insert(enabled);
        }
        if let Some(enabled) = first {
            info!("Local {} {}", kind, if enabled { "enabled" } else { "disabled" });
        }
        first
    }

    pub fn is_enabled(&self, kind: MediaKind) -> Option<bool> {
        self.tracks_of(kind).next().map(|t| t.is_enabled())
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// Access to capture devices.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn open(&self, constraints: &MediaConstraints) -> Result<LocalMedia, MediaAccessError>;
}

/// Devices backed by sample-fed RTP tracks: Opus audio and VP8 video. The
/// embedding capture pipeline feeds encoded frames through
/// [`LocalTrack::write_sample`].
#[derive(Debug, Clone)]
pub struct SampleMediaDevices {
    stream_id: String,
}

impl SampleMediaDevices {
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
        }
    }
}

impl Default for SampleMediaDevices {
    fn default() -> Self {
        Self::new("duet-local")
    }
}

#[async_trait]
impl MediaDevices for SampleMediaDevices {
    async fn open(&self, constraints: &MediaConstraints) -> Result<LocalMedia, MediaAccessError> {
        let mut tracks = Vec::new();

        if constraints.audio {
            let rtp = Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: "audio/opus".to_owned(),
                    clock_rate: 48000,
                    channels: 1,
                    sdp_fmtp_line: String::new(),
                    rtcp_feedback: vec![],
                },
                "audio".to_owned(),
                self.stream_id.clone(),
            ));
            tracks.push(Arc::new(LocalTrack::with_rtp(MediaKind::Audio, rtp)));
        }

        if constraints.video {
            let rtp = Arc::new(TrackLocalStaticSample::new(
                RTCRtpCodecCapability {
                    mime_type: "video/VP8".to_owned(),
                    clock_rate: 90000,
                    channels: 0,
                    sdp_fmtp_line: String::new(),
                    rtcp_feedback: vec![],
                },
                "video".to_owned(),
                self.stream_id.clone(),
            ));
            tracks.push(Arc::new(LocalTrack::with_rtp(MediaKind::Video, rtp)));
        }

        debug!(
            "Opened {} local tracks ({}x{} @ {} fps ideal)",
            tracks.len(),
            constraints.ideal_width,
            constraints.ideal_height,
            constraints.max_frame_rate
        );
        Ok(LocalMedia::new(tracks))
    }
}
