use serde::{Deserialize, Serialize};

/// Severity tier of a status code, decided by its leading digit.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    /// 1xx-3xx
    Success,
    /// 4xx
    ClientError,
    /// 5xx and above
    ServerError,
}

impl SeverityTier {
    #[must_use]
    pub fn classify(code: u16) -> Self {
        match code / 100 {
            0..=3 => Self::Success,
            4 => Self::ClientError,
            _ => Self::ServerError,
        }
    }

    /// Description attached to the sink record for this tier.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Success => "response",
            Self::ClientError => "client error response",
            Self::ServerError => "internal error response",
        }
    }
}
