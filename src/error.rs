use std::fmt::{self, Debug, Display, Formatter};

use derive_more::Display;

/// A boxed error as returned by delegates and source streams.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while constructing the parser, feeding it,
/// or collecting parts.
#[derive(Display)]
#[non_exhaustive]
pub enum Error {
    /// The delegate was asked for the request headers but had none to give.
    #[display(fmt = "request headers are unavailable")]
    HeadersUnavailable,

    /// The headers carry no `Content-Type`.
    #[display(fmt = "Content-Type header is missing")]
    NoContentType,

    /// The `Content-Type` header is not `multipart/form-data`.
    #[display(fmt = "Content-Type is not multipart/form-data")]
    NoMultipart,

    /// No boundary found in `Content-Type` header.
    #[display(fmt = "multipart boundary not found in Content-Type")]
    NoBoundary,

    /// The bytes at a part boundary are neither the delimiter nor the
    /// terminator.
    #[display(fmt = "invalid multipart/form-data: malformed boundary")]
    InvalidBoundary,

    /// A part's header block is empty.
    #[display(fmt = "multipart/form-data missing headers")]
    MissingHeaders,

    /// Failed to read a part's header block.
    #[display(fmt = "failed to read headers: {}", _0)]
    ReadHeaderFailed(httparse::Error),

    /// Failed to decode a part's raw header name to
    /// [`HeaderName`](http::header::HeaderName) type.
    #[display(fmt = "failed to decode part's raw header name: {:?} {}", name, cause)]
    DecodeHeaderName { name: String, cause: BoxError },

    /// Failed to decode a part's raw header value to
    /// [`HeaderValue`](http::header::HeaderValue) type.
    #[display(fmt = "failed to decode part's raw header value: {}", cause)]
    DecodeHeaderValue { value: Vec<u8>, cause: BoxError },

    /// A part's `Content-Disposition` is something other than `form-data`.
    #[display(fmt = "invalid multipart/form-data: disposition {:?}", disposition)]
    InvalidDisposition { disposition: String },

    /// A delegate callback reported a failure.
    #[display(fmt = "delegate failed: {}", _0)]
    DelegateFailed(BoxError),

    /// The parser was fed again after it halted.
    #[display(fmt = "parser already terminated")]
    Terminated,

    /// Reading from the source stream failed.
    #[display(fmt = "stream read failed: {}", _0)]
    StreamReadFailed(BoxError),

    /// The incoming field size exceeded the maximum limit.
    #[display(
        fmt = "field '{}' exceeded the maximum size limit: {} bytes",
        "field_name.as_deref().unwrap_or(\"<unknown>\")",
        limit
    )]
    FieldSizeExceeded { limit: u64, field_name: Option<String> },

    /// The incoming stream size exceeded the maximum limit.
    #[display(fmt = "stream size exceeded the maximum limit: {} bytes", limit)]
    StreamSizeExceeded { limit: u64 },

    /// Failed to decode the collected part data as `JSON` in
    /// [`part.json()`](crate::CollectedPart::json) method.
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    #[display(fmt = "failed to decode field data as JSON: {}", _0)]
    DecodeJson(serde_json::Error),
}

impl Error {
    /// Returns `true` when the request headers could not provide a boundary
    /// source at all.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::HeadersUnavailable | Error::NoContentType)
    }

    /// Returns `true` when the `Content-Type` is present but is not a usable
    /// `multipart/form-data` value.
    pub fn is_format(&self) -> bool {
        matches!(self, Error::NoMultipart | Error::NoBoundary)
    }

    /// Returns `true` for malformed-body errors found while feeding.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Error::InvalidBoundary
                | Error::MissingHeaders
                | Error::ReadHeaderFailed(_)
                | Error::DecodeHeaderName { .. }
                | Error::DecodeHeaderValue { .. }
                | Error::InvalidDisposition { .. }
        )
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ReadHeaderFailed(err) => Some(err),
            Error::DecodeHeaderName { cause, .. }
            | Error::DecodeHeaderValue { cause, .. }
            | Error::DelegateFailed(cause)
            | Error::StreamReadFailed(cause) => Some(cause.as_ref()),
            #[cfg(feature = "json")]
            Error::DecodeJson(err) => Some(err),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}
