use thiserror::Error;

/// Violations of the text wire protocol. A frame that fails to parse is
/// logged and dropped; the connection stays up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty frame")]
    EmptyFrame,

    #[error("unknown verb `{0}`")]
    UnknownVerb(String),

    #[error("`{verb}` frame is missing the `{field}` field")]
    MissingField {
        verb: &'static str,
        field: &'static str,
    },

    #[error("`{verb}` frame has invalid `{field}` value `{value}`")]
    InvalidField {
        verb: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("unknown queue policy `{0}`")]
    UnknownPolicy(String),

    #[error("invalid subscription: stride {stride}, offset {offset}")]
    InvalidSubscription { stride: u64, offset: u64 },

    #[error("`{verb}` frame has trailing input")]
    TrailingInput { verb: &'static str },

    #[error("invalid item id `{0}`")]
    InvalidItemId(String),

    #[error("frame is not valid UTF-8")]
    NotText,
}

/// Failure to hand a frame to a peer. Transmits are non-blocking; a full
/// outbound queue or a vanished peer surfaces here and the send is abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("peer outbound queue is full")]
    QueueFull,

    #[error("peer is disconnected")]
    Disconnected,
}

/// Violations of the multipart envelope framing on the byte stream.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("envelope declares {0} parts, limit is {1}")]
    TooManyParts(usize, usize),

    #[error("envelope part of {0} bytes exceeds limit of {1}")]
    OversizedPart(usize, usize),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config file `{path}`: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}
