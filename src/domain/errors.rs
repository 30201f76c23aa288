/// Errors surfaced by the price history provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider answered with an error payload.
    Api { code: Option<i64>, message: String },
    NetworkError(String),
    /// No answer within the configured timeout (milliseconds).
    Timeout(u32),
    ParseError(String),
}

/// Error taxonomy of the chart engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartError {
    InvalidGranularity(String),
    InvalidParameter(String),
    Provider(ProviderError),
    /// Non-monotonic timestamps reached the series. Fatal to the current generation.
    SeriesCorruption(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Api { code: Some(code), message } => {
                write!(f, "Provider error {}: {}", code, message)
            }
            ProviderError::Api { code: None, message } => write!(f, "Provider error: {}", message),
            ProviderError::NetworkError(msg) => write!(f, "Network Error: {}", msg),
            ProviderError::Timeout(ms) => write!(f, "Request timed out after {} ms", ms),
            ProviderError::ParseError(msg) => write!(f, "Parse Error: {}", msg),
        }
    }
}

impl std::fmt::Display for ChartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChartError::InvalidGranularity(code) => write!(f, "Not a valid granularity: {}", code),
            ChartError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            ChartError::Provider(e) => write!(f, "{}", e),
            ChartError::SeriesCorruption(msg) => write!(f, "Series corruption: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl std::error::Error for ChartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChartError::Provider(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProviderError> for ChartError {
    fn from(error: ProviderError) -> Self {
        ChartError::Provider(error)
    }
}

impl ChartError {
    /// Short label used as the notification category.
    pub fn kind(&self) -> &'static str {
        match self {
            ChartError::InvalidGranularity(_) => "InvalidGranularity",
            ChartError::InvalidParameter(_) => "InvalidParameter",
            ChartError::Provider(_) => "ProviderError",
            ChartError::SeriesCorruption(_) => "SeriesCorruption",
        }
    }
}

pub type ChartResult<T> = Result<T, ChartError>;
pub type ProviderResult<T> = Result<T, ProviderError>;
