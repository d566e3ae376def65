use std::{
    ops::Deref,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::AccentKind;

/// Every oscillator is stopped this long after it starts.
pub const VOICE_LENGTH_SECS: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// Synth parameters for a single percussive hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub waveform: Waveform,
    pub frequency_hz: f64,
    /// Initial gain; an exponential ramp takes it to near silence over
    /// `decay_secs`.
    pub gain: f64,
    pub decay_secs: f64,
    /// Whether the pitch also ramps down over the decay.
    pub pitch_drop: bool,
}

impl Voice {
    pub fn for_accent(accent: AccentKind) -> Self {
        match accent {
            AccentKind::Kick => Self {
                waveform: Waveform::Square,
                frequency_hz: 150.0,
                gain: 1.0,
                decay_secs: 0.5,
                pitch_drop: true,
            },
            AccentKind::Snare => Self {
                waveform: Waveform::Triangle,
                frequency_hz: 200.0,
                gain: 0.7,
                decay_secs: 0.2,
                pitch_drop: false,
            },
            AccentKind::Hat => Self {
                waveform: Waveform::Sawtooth,
                frequency_hz: 800.0,
                gain: 0.3,
                decay_secs: 0.05,
                pitch_drop: false,
            },
            AccentKind::Plain => Self {
                waveform: Waveform::Sine,
                frequency_hz: 0.0,
                gain: 0.0,
                decay_secs: 0.0,
                pitch_drop: false,
            },
        }
    }

    pub fn is_silent(&self) -> bool {
        self.gain <= 0.0 || self.frequency_hz <= 0.0
    }
}

/// A request for the audio backend to play a voice at a clock timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderRequest {
    pub scheduled_time: f64,
    pub accent: AccentKind,
    pub voice: Voice,
}

impl RenderRequest {
    pub fn new(scheduled_time: f64, accent: AccentKind) -> Self {
        Self {
            scheduled_time,
            accent,
            voice: Voice::for_accent(accent),
        }
    }

    pub fn stop_time(&self) -> f64 {
        self.scheduled_time + VOICE_LENGTH_SECS
    }
}

/// Destination for scheduled percussion. Implementations must return
/// immediately; the scheduler never waits on audio.
pub trait AudioSink: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    fn schedule(&self, request: RenderRequest);
}

/// Sink that forwards requests over a bounded channel to an audio backend
/// thread. A full queue drops the request rather than blocking.
#[derive(Debug)]
pub struct ChannelSink {
    sender: Sender<RenderRequest>,
    connected: Arc<AtomicBool>,
}

impl ChannelSink {
    /// Creates the sink together with the receiving end for the backend.
    pub fn bounded(capacity: usize) -> (Self, RenderQueue) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        let connected = Arc::new(AtomicBool::new(true));
        let sink = Self {
            sender,
            connected: Arc::clone(&connected),
        };
        (
            sink,
            RenderQueue {
                receiver,
                connected,
            },
        )
    }
}

/// Backend end of a [`ChannelSink`]. Dropping it marks the sink unavailable
/// straight away, before anything else is sent.
#[derive(Debug)]
pub struct RenderQueue {
    receiver: Receiver<RenderRequest>,
    connected: Arc<AtomicBool>,
}

impl Deref for RenderQueue {
    type Target = Receiver<RenderRequest>;

    fn deref(&self) -> &Self::Target {
        &self.receiver
    }
}

impl<'a> IntoIterator for &'a RenderQueue {
    type Item = RenderRequest;
    type IntoIter = crossbeam_channel::Iter<'a, RenderRequest>;

    fn into_iter(self) -> Self::IntoIter {
        self.receiver.iter()
    }
}

impl Drop for RenderQueue {
    fn drop(&mut self) {
        self.connected.store(false, Ordering::Release);
    }
}

impl AudioSink for ChannelSink {
    fn is_available(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn schedule(&self, request: RenderRequest) {
        match self.sender.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(request)) => {
                tracing::warn!(
                    at = request.scheduled_time,
                    accent = ?request.accent,
                    "audio queue full, dropping render request"
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                if self.connected.swap(false, Ordering::AcqRel) {
                    tracing::warn!("audio backend disconnected");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwards_requests_in_order() {
        let (sink, receiver) = ChannelSink::bounded(4);
        sink.schedule(RenderRequest::new(0.5, AccentKind::Kick));
        sink.schedule(RenderRequest::new(0.75, AccentKind::Hat));

        let received: Vec<_> = receiver.try_iter().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[0].voice.frequency_hz, 150.0);
        assert_eq!(received[1].accent, AccentKind::Hat);
        assert_eq!(received[1].stop_time(), 1.25);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let (sink, receiver) = ChannelSink::bounded(1);
        sink.schedule(RenderRequest::new(0.5, AccentKind::Kick));
        sink.schedule(RenderRequest::new(0.75, AccentKind::Snare));

        assert_eq!(receiver.len(), 1);
        assert!(sink.is_available());
    }

    #[test]
    fn dropped_queue_marks_sink_unavailable_without_a_send() {
        let (sink, queue) = ChannelSink::bounded(1);
        assert!(sink.is_available());
        drop(queue);
        assert!(!sink.is_available());

        // sending afterwards is still a silent no-op
        sink.schedule(RenderRequest::new(0.5, AccentKind::Plain));
        assert!(!sink.is_available());
    }

    #[test]
    fn queue_drains_by_reference() {
        let (sink, queue) = ChannelSink::bounded(4);
        sink.schedule(RenderRequest::new(0.5, AccentKind::Snare));
        drop(sink);

        let accents: Vec<_> = (&queue).into_iter().map(|r| r.accent).collect();
        assert_eq!(accents, vec![AccentKind::Snare]);
    }

    #[test]
    fn plain_beats_are_silent() {
        assert!(Voice::for_accent(AccentKind::Plain).is_silent());
        assert!(!Voice::for_accent(AccentKind::Snare).is_silent());
    }
}
