use crate::{Completion, Delegate, DispositionParams, SizeLimit};
use bytes::{Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use http::header::{self, HeaderMap};
#[cfg(feature = "json")]
use serde::de::DeserializeOwned;

/// A part buffered in memory by a [`FormCollector`].
#[derive(Debug, Clone)]
pub struct CollectedPart {
    headers: HeaderMap,
    params: DispositionParams,
    content_type: Option<mime::Mime>,
    index: usize,
    data: Bytes,
}

impl CollectedPart {
    /// The field name found in the `Content-Disposition` header.
    pub fn name(&self) -> Option<&str> {
        self.params.name()
    }

    /// The file name found in the `Content-Disposition` header.
    pub fn file_name(&self) -> Option<&str> {
        self.params.filename()
    }

    /// Get the content type of the part.
    pub fn content_type(&self) -> Option<&mime::Mime> {
        self.content_type.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn params(&self) -> &DispositionParams {
        &self.params
    }

    /// Position of the part in the body, starting at zero.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// The part content decoded as text, using the charset of its
    /// `Content-Type` and UTF-8 otherwise.
    pub fn text(&self) -> String {
        self.text_with_charset("utf-8")
    }

    /// The part content decoded as text, using the charset of its
    /// `Content-Type` and `default_encoding` otherwise.
    pub fn text_with_charset(&self, default_encoding: &str) -> String {
        let encoding_name = self
            .content_type()
            .and_then(|mime| mime.get_param(mime::CHARSET))
            .map(|charset| charset.as_str())
            .unwrap_or(default_encoding);

        let encoding = Encoding::for_label(encoding_name.as_bytes()).unwrap_or(UTF_8);

        let (text, _, _) = encoding.decode(&self.data);
        text.into_owned()
    }

    /// Deserializes the part content as `JSON`.
    ///
    /// # Optional
    ///
    /// This requires the optional `json` feature to be enabled.
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    pub fn json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_slice(&self.data).map_err(crate::Error::DecodeJson)
    }
}

#[derive(Debug)]
struct OpenPart {
    headers: HeaderMap,
    params: DispositionParams,
    content_type: Option<mime::Mime>,
    data: BytesMut,
    limit: u64,
}

/// A [`Delegate`] that buffers every part in memory, enforcing a
/// [`SizeLimit`].
///
/// Only suitable for bodies known to be small, such as plain form fields.
///
/// # Examples
///
/// ```
/// use multipart_push::{FormCollector, SizeLimit, StreamingParser};
///
/// # async fn run() {
/// let collector = FormCollector::with_size_limit(SizeLimit::new().per_field(1024));
/// let mut parser = StreamingParser::with_boundary(collector, "X-BOUNDARY");
///
/// parser
///     .feed("--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"greeting\"\r\n\r\nhello\r\n--X-BOUNDARY--\r\n")
///     .await
///     .unwrap();
///
/// let parts = parser.into_delegate().into_parts();
/// assert_eq!(parts[0].name(), Some("greeting"));
/// assert_eq!(parts[0].text(), "hello");
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(run());
/// ```
#[derive(Debug, Default)]
pub struct FormCollector {
    parts: Vec<CollectedPart>,
    current: Option<OpenPart>,
    size_limit: SizeLimit,
    stream_size: u64,
}

impl FormCollector {
    pub fn new() -> FormCollector {
        FormCollector::default()
    }

    pub fn with_size_limit(size_limit: SizeLimit) -> FormCollector {
        FormCollector {
            size_limit,
            ..FormCollector::default()
        }
    }

    /// The parts completed so far.
    pub fn parts(&self) -> &[CollectedPart] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<CollectedPart> {
        self.parts
    }

    fn close_current(&mut self) {
        if let Some(open) = self.current.take() {
            let index = self.parts.len();

            self.parts.push(CollectedPart {
                headers: open.headers,
                params: open.params,
                content_type: open.content_type,
                index,
                data: open.data.freeze(),
            });
        }
    }
}

impl Delegate for FormCollector {
    fn start_file(&mut self, headers: HeaderMap, params: DispositionParams) -> Completion<'_> {
        self.close_current();

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<mime::Mime>().ok());

        let limit = self.size_limit.extract_size_limit_for(params.name());

        self.current = Some(OpenPart {
            headers,
            params,
            content_type,
            data: BytesMut::new(),
            limit,
        });

        Completion::ready()
    }

    fn file_data_received(&mut self, data: Bytes) -> Completion<'_> {
        self.stream_size += data.len() as u64;

        if self.stream_size > self.size_limit.whole_stream {
            return Completion::fail(crate::Error::StreamSizeExceeded {
                limit: self.size_limit.whole_stream,
            });
        }

        let open = match self.current.as_mut() {
            Some(open) => open,
            None => {
                log::debug!("dropping {} bytes received outside of a part", data.len());
                return Completion::ready();
            }
        };

        if open.data.len() as u64 + data.len() as u64 > open.limit {
            return Completion::fail(crate::Error::FieldSizeExceeded {
                limit: open.limit,
                field_name: open.params.name().map(str::to_owned),
            });
        }

        open.data.extend_from_slice(&data);
        Completion::ready()
    }

    fn finish_file(&mut self) -> Completion<'_> {
        self.close_current();
        Completion::ready()
    }
}
