use std::error::Error as StdError;

/// Crate-wide result type for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Remote operation a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetAccessToken,
    SendText,
    SendMiniProgramCard,
    SendTemplateMessage,
    GetUserList,
    GetUserInfo,
    WebAuthAccessToken,
    DownloadMedia,
    AddMaterial,
    CreateMenu,
    DeleteMenu,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetAccessToken => "get access_token",
            Self::SendText => "send customer-service text",
            Self::SendMiniProgramCard => "send mini program card",
            Self::SendTemplateMessage => "send template message",
            Self::GetUserList => "get user list",
            Self::GetUserInfo => "get user info",
            Self::WebAuthAccessToken => "exchange web OAuth code",
            Self::DownloadMedia => "download temporary media",
            Self::AddMaterial => "add permanent material",
            Self::CreateMenu => "create menu",
            Self::DeleteMenu => "delete menu",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider error codes meaning the access token is invalid or expired.
const AUTH_ERROR_CODES: &[i64] = &[40001, 40014, 41001, 42001];

/// Typed SDK errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The provider answered with a non-zero `errcode`.
    #[error("{operation} failed: {message} (errcode {code})")]
    Api {
        operation: Operation,
        code: i64,
        message: String,
    },

    /// A non-API fetch (e.g. a material source URL) returned a non-success status.
    #[error("{operation} failed: HTTP {status} from {url}")]
    Status {
        operation: Operation,
        status: reqwest::StatusCode,
        url: String,
    },

    /// Caller supplied an unusable argument.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Inbound webhook body could not be decoded.
    #[error("malformed inbound message: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapped source error from an external dependency.
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn api(operation: Operation, code: i64, message: impl Into<String>) -> Self {
        Self::Api {
            operation,
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Provider error code, if this error came from a decoded envelope.
    pub fn code(&self) -> Option<i64> {
        match self {
            Self::Api { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether the provider rejected the access token (stale or missing).
    pub fn is_auth_failure(&self) -> bool {
        self.code().is_some_and(|code| AUTH_ERROR_CODES.contains(&code))
    }
}
