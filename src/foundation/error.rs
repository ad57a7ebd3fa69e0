pub type MarkerResult<T> = Result<T, MarkerError>;

#[derive(thiserror::Error, Debug)]
pub enum MarkerError {
    #[error("image decode error: {0}")]
    ImageDecode(String),

    #[error("invalid color: {0}")]
    InvalidColor(String),

    #[error("canvas unavailable: {0}")]
    CanvasUnavailable(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MarkerError {
    pub fn image_decode(msg: impl Into<String>) -> Self {
        Self::ImageDecode(msg.into())
    }

    pub fn invalid_color(msg: impl Into<String>) -> Self {
        Self::InvalidColor(msg.into())
    }

    pub fn canvas_unavailable(msg: impl Into<String>) -> Self {
        Self::CanvasUnavailable(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}
