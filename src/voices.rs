//! Voice Lifecycle Management
//!
//! At most one generation of voices is alive at a time: a primary voice
//! playing the loaded sample, plus an unmodulated duplicate while the pedal is
//! in chorus mode. A new play request stops the whole previous generation
//! first; there is no overlap or crossfade.
//!
//! Voice ids come from a generational slot map. When a voice is stopped its
//! key is removed, so a late "ended" notification for it can never be
//! confused with a newer voice reusing the slot.

use crate::error::{Error, Result};
use crate::host::{AudioHost, SampleBuffer, VoiceId};
use log::{debug, info};
use slotmap::SlotMap;

/// Role of a tracked voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceRole {
    /// Carries the modulation; its natural end ends the generation
    Primary,
    /// Unmodulated chorus double
    Duplicate,
}

/// Bookkeeping for one started voice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedVoice {
    pub role: VoiceRole,
    /// Host time the voice was started
    pub started_at: f64,
    /// Position in the sample it was started from
    pub offset: f64,
}

/// Outcome of an end-of-playback notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndedVoice {
    /// The primary ended; the whole generation was stopped
    Generation,
    /// The duplicate ended on its own
    Duplicate,
    /// The voice was already gone
    Stale,
}

/// Tracks and owns the active voices
#[derive(Debug, Clone, Default)]
pub struct VoiceManager {
    voices: SlotMap<VoiceId, TrackedVoice>,
    primary: Option<VoiceId>,
    duplicate: Option<VoiceId>,
    buffer: Option<SampleBuffer>,
}

impl VoiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer: SampleBuffer) -> Self {
        Self {
            buffer: Some(buffer),
            ..Self::default()
        }
    }

    /// Install the decoded sample used by subsequent plays
    pub fn set_buffer(&mut self, buffer: SampleBuffer) {
        self.buffer = Some(buffer);
    }

    pub fn buffer(&self) -> Option<&SampleBuffer> {
        self.buffer.as_ref()
    }

    /// Stop the current generation and start a new primary voice.
    ///
    /// With `with_duplicate` a chorus double is started alongside it. Any
    /// creation failure stops whatever part of the new generation started
    /// and is returned to the caller.
    pub fn play<H: AudioHost>(&mut self, host: &mut H, with_duplicate: bool) -> Result<VoiceId> {
        self.stop_all(host);

        let buffer = self.buffer.clone().ok_or(Error::SampleNotReady)?;
        let now = host.current_time();

        let id = self.start_voice(host, &buffer, VoiceRole::Primary, now, 0.0)?;
        self.primary = Some(id);

        if with_duplicate {
            if let Err(e) = self.sync_duplicate(host, true) {
                self.stop_all(host);
                return Err(e);
            }
        }

        info!(
            "playing {} ({:.2}s) at {:.3}{}",
            buffer.label.as_deref().unwrap_or("sample"),
            buffer.duration,
            now,
            if with_duplicate { " with chorus double" } else { "" }
        );
        Ok(id)
    }

    /// Add or remove the chorus double to match `want`.
    ///
    /// A late double starts at the primary's current playback position so the
    /// two stay aligned.
    pub fn sync_duplicate<H: AudioHost>(&mut self, host: &mut H, want: bool) -> Result<()> {
        let now = host.current_time();
        match (want, self.duplicate) {
            (true, None) => {
                let primary = match self.primary.and_then(|id| self.voices.get(id).copied()) {
                    Some(voice) => voice,
                    None => return Ok(()),
                };
                let buffer = self.buffer.clone().ok_or(Error::SampleNotReady)?;
                let offset = primary.offset + (now - primary.started_at).max(0.0);
                if offset >= buffer.duration {
                    return Ok(());
                }
                let id = self.start_voice(host, &buffer, VoiceRole::Duplicate, now, offset)?;
                self.duplicate = Some(id);
                debug!("chorus double started at offset {:.3}", offset);
            }
            (false, Some(id)) => {
                host.stop_voice(id, now);
                self.voices.remove(id);
                self.duplicate = None;
                debug!("chorus double stopped");
            }
            _ => {}
        }
        Ok(())
    }

    fn start_voice<H: AudioHost>(
        &mut self,
        host: &mut H,
        buffer: &SampleBuffer,
        role: VoiceRole,
        when: f64,
        offset: f64,
    ) -> Result<VoiceId> {
        let id = self.voices.insert(TrackedVoice {
            role,
            started_at: when,
            offset,
        });
        if let Err(e) = host.create_voice(id, buffer) {
            self.voices.remove(id);
            return Err(e);
        }
        host.start_voice(id, when, offset);
        Ok(id)
    }

    /// Stop every tracked voice immediately. Returns how many were stopped.
    pub fn stop_all<H: AudioHost>(&mut self, host: &mut H) -> usize {
        if self.voices.is_empty() {
            return 0;
        }
        let now = host.current_time();
        let stopped = self.voices.len();
        for (id, _) in self.voices.drain() {
            host.stop_voice(id, now);
        }
        self.primary = None;
        self.duplicate = None;
        debug!("stopped {} voice(s)", stopped);
        stopped
    }

    /// Handle the host reporting that `id` finished on its own
    pub fn handle_ended<H: AudioHost>(&mut self, host: &mut H, id: VoiceId) -> EndedVoice {
        if self.primary == Some(id) {
            self.stop_all(host);
            EndedVoice::Generation
        } else if self.duplicate == Some(id) {
            self.voices.remove(id);
            self.duplicate = None;
            EndedVoice::Duplicate
        } else {
            EndedVoice::Stale
        }
    }

    pub fn primary(&self) -> Option<VoiceId> {
        self.primary
    }

    /// The primary voice, or `Error::NoActiveVoice`
    pub fn require_primary(&self) -> Result<VoiceId> {
        self.primary.ok_or(Error::NoActiveVoice)
    }

    pub fn duplicate(&self) -> Option<VoiceId> {
        self.duplicate
    }

    pub fn is_active(&self) -> bool {
        self.primary.is_some()
    }

    pub fn active_count(&self) -> usize {
        self.voices.len()
    }

    pub fn get(&self, id: VoiceId) -> Option<&TrackedVoice> {
        self.voices.get(id)
    }

    /// `(anchor, end)` of the primary voice on the host clock.
    ///
    /// The anchor is where sample position zero falls; the end is where the
    /// sample runs out.
    pub fn playback_window(&self) -> Option<(f64, f64)> {
        let voice = self.voices.get(self.primary?)?;
        let duration = self.buffer.as_ref()?.duration;
        let anchor = voice.started_at - voice.offset;
        Some((anchor, anchor + duration))
    }
}
