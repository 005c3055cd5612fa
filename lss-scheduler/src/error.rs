//! Error types for lss-scheduler
//!
//! The `Display` text of the command-facing variants is the exact message
//! returned to remote control surfaces, so changing it is a protocol change.

use thiserror::Error;

/// Playlist state machine errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaylistError {
    /// Start requested on a playlist with zero steps
    #[error("Playlist has no steps.")]
    NoSteps,

    /// No step with the given name
    #[error("Step '{0}' not found.")]
    StepNotFound(String),

    /// Operation requires a running playlist
    #[error("Playlist is not running.")]
    NotRunning,
}

/// Output sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    /// Sink cannot accept a frame right now (queue full, worker gone)
    #[error("Output sink unavailable: {0}")]
    Unavailable(String),

    /// Network send failure
    #[error("Output I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Step rendering faults
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Step names a renderer that is not registered
    #[error("Unknown renderer '{0}'")]
    UnknownRenderer(String),

    /// Renderer failed while painting
    #[error("Render failed: {0}")]
    Failed(String),
}

/// Main error type for lss-scheduler
#[derive(Error, Debug)]
pub enum Error {
    /// Named playlist absent
    #[error("Playlist '{0}' not found.")]
    PlaylistNotFound(String),

    /// Named step absent
    #[error("Step '{0}' not found.")]
    StepNotFound(String),

    /// Wrong arity or format of command parameters
    #[error("Parameters format incorrect.")]
    InvalidParameters,

    /// Command needs a running playlist and none exists
    #[error("No playlist currently playing.")]
    NoActivePlaylist,

    /// Same condition, as worded by the end-steps command
    #[error("No playlist currently running.")]
    NoPlaylistRunning,

    /// "Selected playlist" command issued without a selection
    #[error("No playlist selected.")]
    NoPlaylistSelected,

    /// Start requested on a playlist with zero steps
    #[error("Unable to start playlist.")]
    EmptyPlaylist,

    /// A playlist with this name already exists
    #[error("Playlist '{0}' already exists.")]
    DuplicatePlaylist(String),

    /// Named operator button absent
    #[error("Button '{0}' not found.")]
    ButtonNotFound(String),

    /// Playlist has no schedule window to extend
    #[error("Playlist '{0}' has no schedule.")]
    NotScheduled(String),

    /// Command name not in the dispatch table
    #[error("Unknown command.")]
    UnknownCommand,

    /// Query name not recognised
    #[error("Unknown query.")]
    UnknownQuery,

    /// Stash key is not filename-safe
    #[error("Invalid key '{0}'.")]
    InvalidKey(String),

    /// Stash key has no stored data
    #[error("Key '{0}' not found.")]
    KeyNotFound(String),

    /// Output sink cannot accept a frame
    #[error(transparent)]
    SinkUnavailable(#[from] SinkError),

    /// Schedule file could not be parsed
    #[error("Schedule parse error: {0}")]
    ScheduleParse(#[from] toml::de::Error),

    /// Schedule could not be serialized
    #[error("Schedule serialize error: {0}")]
    ScheduleSerialize(#[from] toml::ser::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Shared configuration helpers failed
    #[error(transparent)]
    Common(#[from] lss_common::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PlaylistError> for Error {
    fn from(err: PlaylistError) -> Self {
        match err {
            PlaylistError::NoSteps => Error::EmptyPlaylist,
            PlaylistError::StepNotFound(name) => Error::StepNotFound(name),
            PlaylistError::NotRunning => Error::NoActivePlaylist,
        }
    }
}

/// Convenience Result type using lss-scheduler Error
pub type Result<T> = std::result::Result<T, Error>;
