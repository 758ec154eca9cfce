use crate::Result;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    /// `None` for `Unspecified`: such a track carries nothing we can use.
    pub fn from_codec_type(t: RTPCodecType) -> Option<Self> {
        match t {
            RTPCodecType::Audio => Some(TrackKind::Audio),
            RTPCodecType::Video => Some(TrackKind::Video),
            _ => None,
        }
    }
}

struct LocalTrack {
    kind: TrackKind,
    track: Arc<TrackLocalStaticSample>,
    enabled: AtomicBool,
}

struct LocalMediaInner {
    stream_id: String,
    tracks: Vec<LocalTrack>,
}

/// Shared by every peer link. Links attach the same tracks and never change
/// them; only [`LocalMedia::enable`] flips state, and only locally.
#[derive(Clone)]
pub struct LocalMedia {
    inner: Arc<LocalMediaInner>,
}

impl LocalMedia {
    /// No tracks at all: the participant only receives.
    pub fn empty() -> Self {
        Self::with_tracks("huddle", &[])
    }

    /// One Opus audio track and one VP8 video track.
    pub fn audio_video(stream_id: impl Into<String>) -> Self {
        Self::with_tracks(stream_id, &[TrackKind::Audio, TrackKind::Video])
    }

    pub fn with_tracks(stream_id: impl Into<String>, kinds: &[TrackKind]) -> Self {
        let stream_id = stream_id.into();
        let tracks = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let (mime_type, label) = match kind {
                    TrackKind::Audio => (MIME_TYPE_OPUS, "audio"),
                    TrackKind::Video => (MIME_TYPE_VP8, "video"),
                };
                let track = TrackLocalStaticSample::new(
                    RTCRtpCodecCapability {
                        mime_type: mime_type.to_owned(),
                        ..Default::default()
                    },
                    format!("{}-{}", label, i),
                    stream_id.clone(),
                );
                LocalTrack {
                    kind: *kind,
                    track: Arc::new(track),
                    enabled: AtomicBool::new(true),
                }
            })
            .collect();

        Self {
            inner: Arc::new(LocalMediaInner { stream_id, tracks }),
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.inner.stream_id
    }

    pub fn tracks(&self) -> impl Iterator<Item = (TrackKind, Arc<TrackLocalStaticSample>)> + '_ {
        self.inner.tracks.iter().map(|t| (t.kind, t.track.clone()))
    }

    pub fn track_count(&self) -> usize {
        self.inner.tracks.len()
    }

    /// Mute (audio) or camera-off (video). Never signaled to peers: disabled
    /// tracks just stop carrying samples.
    pub fn enable(&self, kind: TrackKind, enabled: bool) {
        for track in self.inner.tracks.iter().filter(|t| t.kind == kind) {
            track.enabled.store(enabled, Ordering::Relaxed);
        }
    }

    /// False when there is no track of `kind`.
    pub fn is_enabled(&self, kind: TrackKind) -> bool {
        self.inner
            .tracks
            .iter()
            .filter(|t| t.kind == kind)
            .any(|t| t.enabled.load(Ordering::Relaxed))
    }

    /// Feeds one captured sample to every enabled track of `kind`.
    /// Returns how many tracks took it.
    pub async fn write_sample(&self, kind: TrackKind, sample: &Sample) -> Result<usize> {
        let mut written = 0;
        for track in self.inner.tracks.iter().filter(|t| t.kind == kind) {
            if !track.enabled.load(Ordering::Relaxed) {
                continue;
            }
            track.track.write_sample(sample).await?;
            written += 1;
        }
        Ok(written)
    }
}
