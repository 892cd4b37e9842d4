use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("y_min ({min}) must be less than y_max ({max})")]
    InvalidYBounds { min: f32, max: f32 },
    #[error("y_smooth must be in [0.0, 1.0], got {0}")]
    InvalidSmoothing(f32),
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("{field} must be greater than zero")]
    InvalidDimension { field: &'static str },
    #[error("sink already closed")]
    SinkClosed,
    #[error("video encoder error: {0}")]
    Encoder(String),
    #[error("failed to render frame: {0}")]
    Render(String),
    #[error("signal filter error: {0}")]
    Filter(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for ScopeError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        ScopeError::Render(format!("{value:?}"))
    }
}

impl From<image::ImageError> for ScopeError {
    fn from(value: image::ImageError) -> Self {
        ScopeError::Render(value.to_string())
    }
}
