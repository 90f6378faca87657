use super::*;

#[derive(Debug, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub error_code: i32,
    pub message: String,
    pub traceback: Option<Value>,
}

impl Serialize for JsonRpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (&self.error_code, &self.message, &self.traceback).serialize(serializer)
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.traceback {
            Some(traceback) => write!(
                f,
                "Stratum error {}: {} (traceback: {})",
                self.error_code,
                self.message,
                serde_json::to_string(traceback).unwrap_or_else(|_| "<invalid traceback>".into())
            ),
            None => write!(f, "Stratum error {}: {}", self.error_code, self.message),
        }
    }
}

pub type Result<T, E = InternalError> = std::result::Result<T, E>;

/// Errors raised while parsing or constructing wire types, independent of any
/// particular connection or share. Never sent to a miner directly.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum InternalError {
    #[snafu(display("{message}"))]
    Parse { message: String },

    #[snafu(display("invalid value: {reason}"))]
    InvalidValue { reason: String },

    #[snafu(display("username carries no address component"))]
    EmptyUsername,

    #[snafu(display("invalid address: {source}"), context(false))]
    InvalidAddress { source: bitcoin::address::ParseError },

    #[snafu(display("address does not belong to network {expected:?}: {address}"))]
    NetworkMismatch { expected: Network, address: String },

    #[snafu(display("could not infer a network for this address"))]
    UnknownNetwork,

    #[snafu(display("hex decode error: {source}"), context(false))]
    Hex { source: hex::FromHexError },
}

/// The coarse failure category the miner sees on the wire, per the stratum
/// error-response convention (an error code, a short message, optional
/// traceback).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StratumErrorResponse {
    Unknown,
    NotSubscribed,
    UnauthorizedWorker,
    Stale,
    Duplicate,
    LowDifficulty,
    BadJob,
    BadNtime,
    BadVersionBits,
}

impl StratumErrorResponse {
    pub fn code(&self) -> i32 {
        match self {
            Self::Unknown => 20,
            Self::Stale => 21,
            Self::Duplicate => 22,
            Self::LowDifficulty => 23,
            Self::UnauthorizedWorker => 24,
            Self::NotSubscribed => 25,
            Self::BadJob => 26,
            Self::BadNtime => 27,
            Self::BadVersionBits => 28,
        }
    }
}

impl fmt::Display for StratumErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Self::Unknown => "Unknown",
            Self::NotSubscribed => "Not subscribed",
            Self::UnauthorizedWorker => "Unauthorized worker",
            Self::Stale => "Stale",
            Self::Duplicate => "Duplicate",
            Self::LowDifficulty => "Low difficulty",
            Self::BadJob => "Bad job",
            Self::BadNtime => "Bad ntime",
            Self::BadVersionBits => "Bad version bits",
        };
        f.write_str(message)
    }
}

/// Errors raised while handling a single connection's stratum requests.
/// Every variant has a corresponding wire-visible [`StratumErrorResponse`].
#[derive(Debug, Snafu, Clone, Copy, PartialEq, Eq)]
#[snafu(visibility(pub))]
pub enum StratumError {
    #[snafu(display("method not allowed in current connection state"))]
    MethodNotAllowed,
    #[snafu(display("worker is not authorized"))]
    Unauthorized,
    #[snafu(display("requested extension is not supported"))]
    UnsupportedExtension,
    #[snafu(display("submitted worker does not match authorized worker"))]
    WorkerMismatch,
    #[snafu(display("job is stale or unknown"))]
    Stale,
    #[snafu(display("extranonce2 has the wrong length"))]
    InvalidNonce2Length,
    #[snafu(display("ntime is outside the allowed range"))]
    NtimeOutOfRange,
    #[snafu(display("version bits are not permitted by the negotiated mask"))]
    InvalidVersionMask,
    #[snafu(display("share hash does not meet the client's target"))]
    AboveTarget,
    #[snafu(display("duplicate share"))]
    Duplicate,
}

impl StratumError {
    pub fn response(&self) -> StratumErrorResponse {
        match self {
            Self::MethodNotAllowed => StratumErrorResponse::NotSubscribed,
            Self::Unauthorized | Self::WorkerMismatch => StratumErrorResponse::UnauthorizedWorker,
            Self::UnsupportedExtension => StratumErrorResponse::Unknown,
            Self::Stale => StratumErrorResponse::Stale,
            Self::InvalidNonce2Length => StratumErrorResponse::BadJob,
            Self::NtimeOutOfRange => StratumErrorResponse::BadNtime,
            Self::InvalidVersionMask => StratumErrorResponse::BadVersionBits,
            Self::AboveTarget => StratumErrorResponse::LowDifficulty,
            Self::Duplicate => StratumErrorResponse::Duplicate,
        }
    }

    /// Builds the [`JsonRpcError`] sent back to the miner for this failure.
    pub fn into_response(self, traceback: Option<Value>) -> JsonRpcError {
        let response = self.response();
        JsonRpcError {
            error_code: response.code(),
            message: response.to_string(),
            traceback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_match_expected_categories() {
        assert_eq!(StratumError::AboveTarget.response().to_string(), "Low difficulty");
        assert_eq!(StratumError::Stale.response().to_string(), "Stale");
        assert_eq!(StratumError::Duplicate.response().to_string(), "Duplicate");
        assert_eq!(StratumError::InvalidNonce2Length.response().to_string(), "Bad job");
        assert_eq!(StratumError::NtimeOutOfRange.response().to_string(), "Bad ntime");
        assert_eq!(
            StratumError::InvalidVersionMask.response().to_string(),
            "Bad version bits"
        );
    }

    #[test]
    fn into_response_carries_traceback() {
        let traceback = serde_json::json!({"hint": "resend job"});
        let response = StratumError::Stale.into_response(Some(traceback.clone()));
        assert_eq!(response.error_code, 21);
        assert_eq!(response.message, "Stale");
        assert_eq!(response.traceback, Some(traceback));
    }
}
