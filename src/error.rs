//! Error types
//!
//! Modulation errors (`UnsupportedWaveform`) are pure and deterministic; the
//! engine logs them and keeps playing unmodulated. Playback errors
//! (`SampleNotReady`, `VoiceCreation`) abort the play request and are returned
//! to the caller.

use crate::waveform::WaveformKind;

/// Errors produced by the modulation engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The waveform has no formula (random and envelope shapes)
    #[error("unsupported waveform: {0:?}")]
    UnsupportedWaveform(WaveformKind),

    /// Re-apply or stop requested with nothing playing
    #[error("no active voice")]
    NoActiveVoice,

    /// Play requested before the sample finished loading
    #[error("sample not ready")]
    SampleNotReady,

    /// The host refused to create a voice
    #[error("voice creation failed: {reason}")]
    VoiceCreation { reason: String },

    /// A configuration value is out of range
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Configuration JSON could not be parsed or written
    #[error(transparent)]
    Config(#[from] serde_json::Error),
}

/// Crate result alias
pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    /// True for errors the engine treats as benign no-ops
    pub fn is_benign(&self) -> bool {
        matches!(self, Error::NoActiveVoice)
    }
}
