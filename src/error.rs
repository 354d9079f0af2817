use snafu::{Backtrace, ErrorCompat, IntoError, Snafu};
use std::fmt::{self, Display, Formatter};

/// An underlying failure wrapped by an [Error].
pub type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The closed set of failure categories.
///
/// Every [Error] belongs to exactly one category. Callers are expected to branch on
/// [ErrorCode::NotFound] (for instance to recreate a remote object that disappeared) and
/// [ErrorCode::Unauthorized]; the other codes are mostly diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Undefined,
    Namespace,
    Endpoint,
    Values,
    NilValue,
    OverwriteValue,
    MissingTitle,
    MissingUrl,
    HttpClient,
    ResponseBody,
    SplunkMessage,
    Unauthorized,
    NotFound,
    Pointer,
    Slice,
    Id,
    Sharing,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Undefined => "undefined error",
            ErrorCode::Namespace => "namespace error",
            ErrorCode::Endpoint => "endpoint error",
            ErrorCode::Values => "values error",
            ErrorCode::NilValue => "nil value error",
            ErrorCode::OverwriteValue => "overwrite value error",
            ErrorCode::MissingTitle => "missing title error",
            ErrorCode::MissingUrl => "missing URL error",
            ErrorCode::HttpClient => "HTTP client error",
            ErrorCode::ResponseBody => "response body error",
            ErrorCode::SplunkMessage => "Splunk message error",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::NotFound => "not found",
            ErrorCode::Pointer => "pointer error",
            ErrorCode::Slice => "slice error",
            ErrorCode::Id => "ID error",
            ErrorCode::Sharing => "sharing error",
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised anywhere in the client.
///
/// Each variant records a human readable message and a backtrace captured where the error was
/// constructed, so a failure that travels up through several pipeline stages still points at its
/// origin. Variants which wrap a lower level failure expose it through
/// [std::error::Error::source].
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("undefined error: {}", message))]
    Undefined { message: String, backtrace: Backtrace },

    #[snafu(display("namespace error: {}", message))]
    Namespace { message: String, backtrace: Backtrace },

    #[snafu(display("endpoint error: {}", message))]
    Endpoint {
        message: String,
        source: Cause,
        backtrace: Backtrace,
    },

    #[snafu(display("values error: {}", message))]
    Values { message: String, backtrace: Backtrace },

    #[snafu(display("nil value error: {}", message))]
    NilValue { message: String, backtrace: Backtrace },

    #[snafu(display("overwrite value error: {}", message))]
    OverwriteValue { message: String, backtrace: Backtrace },

    #[snafu(display("missing title error: {}", message))]
    MissingTitle { message: String, backtrace: Backtrace },

    #[snafu(display("missing URL error: {}", message))]
    MissingUrl { message: String, backtrace: Backtrace },

    #[snafu(display("HTTP client error: {}", message))]
    HttpClient {
        message: String,
        source: Cause,
        backtrace: Backtrace,
    },

    #[snafu(display("response body error: {}", message))]
    ResponseBody {
        message: String,
        source: Cause,
        backtrace: Backtrace,
    },

    #[snafu(display("Splunk message error: {}", message))]
    SplunkMessage { message: String, backtrace: Backtrace },

    #[snafu(display("unauthorized: {}", message))]
    Unauthorized { message: String, backtrace: Backtrace },

    #[snafu(display("not found: {}", message))]
    NotFound { message: String, backtrace: Backtrace },

    #[snafu(display("pointer error: {}", message))]
    Pointer { message: String, backtrace: Backtrace },

    #[snafu(display("slice error: {}", message))]
    Slice { message: String, backtrace: Backtrace },

    #[snafu(display("ID error: {}", message))]
    Id { message: String, backtrace: Backtrace },

    #[snafu(display("sharing error: {}", message))]
    Sharing { message: String, backtrace: Backtrace },
}

impl Error {
    /// Construct an error of an arbitrary category.
    ///
    /// This is how response handlers tag a decoded API message with the code chosen by the
    /// caller. Categories which normally wrap a lower level failure use the message itself as
    /// the cause.
    pub fn with_code(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            ErrorCode::Undefined => UndefinedSnafu { message }.build(),
            ErrorCode::Namespace => NamespaceSnafu { message }.build(),
            ErrorCode::Endpoint => {
                let cause = Cause::from(message.clone());
                EndpointSnafu { message }.into_error(cause)
            }
            ErrorCode::Values => ValuesSnafu { message }.build(),
            ErrorCode::NilValue => NilValueSnafu { message }.build(),
            ErrorCode::OverwriteValue => OverwriteValueSnafu { message }.build(),
            ErrorCode::MissingTitle => MissingTitleSnafu { message }.build(),
            ErrorCode::MissingUrl => MissingUrlSnafu { message }.build(),
            ErrorCode::HttpClient => {
                let cause = Cause::from(message.clone());
                HttpClientSnafu { message }.into_error(cause)
            }
            ErrorCode::ResponseBody => {
                let cause = Cause::from(message.clone());
                ResponseBodySnafu { message }.into_error(cause)
            }
            ErrorCode::SplunkMessage => SplunkMessageSnafu { message }.build(),
            ErrorCode::Unauthorized => UnauthorizedSnafu { message }.build(),
            ErrorCode::NotFound => NotFoundSnafu { message }.build(),
            ErrorCode::Pointer => PointerSnafu { message }.build(),
            ErrorCode::Slice => SliceSnafu { message }.build(),
            ErrorCode::Id => IdSnafu { message }.build(),
            ErrorCode::Sharing => SharingSnafu { message }.build(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Undefined { .. } => ErrorCode::Undefined,
            Error::Namespace { .. } => ErrorCode::Namespace,
            Error::Endpoint { .. } => ErrorCode::Endpoint,
            Error::Values { .. } => ErrorCode::Values,
            Error::NilValue { .. } => ErrorCode::NilValue,
            Error::OverwriteValue { .. } => ErrorCode::OverwriteValue,
            Error::MissingTitle { .. } => ErrorCode::MissingTitle,
            Error::MissingUrl { .. } => ErrorCode::MissingUrl,
            Error::HttpClient { .. } => ErrorCode::HttpClient,
            Error::ResponseBody { .. } => ErrorCode::ResponseBody,
            Error::SplunkMessage { .. } => ErrorCode::SplunkMessage,
            Error::Unauthorized { .. } => ErrorCode::Unauthorized,
            Error::NotFound { .. } => ErrorCode::NotFound,
            Error::Pointer { .. } => ErrorCode::Pointer,
            Error::Slice { .. } => ErrorCode::Slice,
            Error::Id { .. } => ErrorCode::Id,
            Error::Sharing { .. } => ErrorCode::Sharing,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Undefined { message, .. }
            | Error::Namespace { message, .. }
            | Error::Endpoint { message, .. }
            | Error::Values { message, .. }
            | Error::NilValue { message, .. }
            | Error::OverwriteValue { message, .. }
            | Error::MissingTitle { message, .. }
            | Error::MissingUrl { message, .. }
            | Error::HttpClient { message, .. }
            | Error::ResponseBody { message, .. }
            | Error::SplunkMessage { message, .. }
            | Error::Unauthorized { message, .. }
            | Error::NotFound { message, .. }
            | Error::Pointer { message, .. }
            | Error::Slice { message, .. }
            | Error::Id { message, .. }
            | Error::Sharing { message, .. } => message,
        }
    }

    pub fn is(&self, code: ErrorCode) -> bool {
        self.code() == code
    }

    /// The stack trace captured when this error was constructed, if backtraces are enabled.
    pub fn stack_trace(&self) -> Option<String> {
        ErrorCompat::backtrace(self).map(|trace| format!("{:?}", trace))
    }
}

/// Convert a failed round trip from the transport into a boxed cause.
pub(crate) fn transport_cause(err: surf::Error) -> Cause {
    err.into_inner().into()
}
