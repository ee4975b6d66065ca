use thiserror::Error;

/// A `ContentRef` that violates its shape invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContentRefError {
    #[error("native id must not be empty")]
    EmptyNativeId,

    #[error("episode content requires both season and episode")]
    MissingEpisodeCoordinates,

    #[error("movie content must not carry season or episode")]
    UnexpectedEpisodeCoordinates,

    #[error("season and episode must be positive (got S{season}E{episode})")]
    NonPositiveCoordinates { season: u32, episode: u32 },
}

/// Failure to turn a play route into a `ContentRef`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("not a play route: {0}")]
    NotAPlayRoute(String),

    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("invalid {param} value: {value}")]
    InvalidParam { param: &'static str, value: String },

    #[error(transparent)]
    Content(#[from] ContentRefError),
}

impl RouteError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAPlayRoute(_) => "not_a_play_route",
            Self::UnsupportedType(_) => "unsupported_type",
            Self::InvalidParam { .. } => "invalid_param",
            Self::Content(_) => "invalid_content",
        }
    }
}
