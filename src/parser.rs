use crate::boundary::Boundary;
use crate::content_disposition::DispositionParams;
use crate::delegate::{Delegate, LocalDelegate, RequestHeaders};
use crate::error::BoxError;
use crate::state::{ParserState, Step, StreamingStage};
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use http::header::{self, HeaderMap};
#[cfg(feature = "tokio-io")]
use tokio::io::AsyncRead;
#[cfg(feature = "tokio-io")]
use tokio_util::io::ReaderStream;

/// Parses a `multipart/form-data` body that is pushed to it chunk by chunk.
///
/// Chunks may be split anywhere, even in the middle of a boundary or a header
/// line. As parts are found, the [`Delegate`] is told about them; part content
/// is handed over as soon as it is known not to belong to a boundary, so an
/// upload is never buffered as a whole.
///
/// Malformed input does not fail [`feed`](StreamingParser::feed): the parser
/// logs a warning, stops making progress and keeps the cause in
/// [`error`](StreamingParser::error).
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use http::header::HeaderMap;
/// use multipart_push::{Completion, Delegate, DispositionParams, StreamingParser};
///
/// #[derive(Default)]
/// struct Print(Vec<u8>);
///
/// impl Delegate for Print {
///     fn start_file(&mut self, _: HeaderMap, params: DispositionParams) -> Completion<'_> {
///         println!("part: {:?}", params.name());
///         Completion::ready()
///     }
///
///     fn file_data_received(&mut self, data: Bytes) -> Completion<'_> {
///         self.0.extend_from_slice(&data);
///         Completion::ready()
///     }
/// }
///
/// # async fn run() {
/// let mut parser = StreamingParser::with_boundary(Print::default(), "X-BOUNDARY");
///
/// parser.feed("--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nab").await.unwrap();
/// parser.feed("cd\r\n--X-BOUNDARY--\r\n").await.unwrap();
///
/// assert!(parser.is_finished());
/// assert_eq!(parser.delegate().0, b"abcd");
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(run());
/// ```
#[derive(Debug)]
pub struct StreamingParser<D> {
    state: ParserState,
    delegate: D,
    error: Option<crate::Error>,
}

impl<D> StreamingParser<D> {
    /// Construct a new `StreamingParser` whose boundary comes from the
    /// `Content-Type` of the given request headers.
    pub fn new(delegate: D, headers: &HeaderMap) -> crate::Result<StreamingParser<D>> {
        let boundary = boundary_from_headers(headers)?;
        Ok(StreamingParser::with_boundary(delegate, boundary))
    }

    /// Construct a new `StreamingParser` from a delegate that knows the
    /// request headers itself.
    pub fn from_delegate(delegate: D) -> crate::Result<StreamingParser<D>>
    where
        D: RequestHeaders,
    {
        let boundary = {
            let headers = delegate.request_headers().ok_or(crate::Error::HeadersUnavailable)?;
            boundary_from_headers(headers)?
        };

        Ok(StreamingParser::with_boundary(delegate, boundary))
    }

    /// Construct a new `StreamingParser` with an already known boundary.
    pub fn with_boundary<B: Into<String>>(delegate: D, boundary: B) -> StreamingParser<D> {
        StreamingParser {
            state: ParserState::new(Boundary::new(boundary)),
            delegate,
            error: None,
        }
    }

    fn accept(&mut self, chunk: &[u8]) -> crate::Result<bool> {
        match self.state.stage {
            StreamingStage::Eof => {
                if !chunk.is_empty() {
                    log::debug!("ignoring {} bytes after the closing boundary", chunk.len());
                }
                Ok(false)
            }
            StreamingStage::Halted => Err(crate::Error::Terminated),
            _ => {
                self.state.buffer.extend(chunk);
                Ok(true)
            }
        }
    }

    /// The callbacks due for the next step, or `None` once more bytes are
    /// needed or the parser stopped.
    fn next_calls(&mut self) -> Option<Vec<Call>> {
        match self.state.next_step() {
            Step::Suspend => None,
            Step::Halt(err) => {
                log::warn!("{}", err);
                self.error = Some(err);
                None
            }
            Step::StartFile { headers, params } => Some(vec![Call::StartFile(headers, params)]),
            Step::Data(data) => Some(vec![Call::Data(data)]),
            Step::EndPart(data) => Some(vec![Call::Data(data), Call::Finish]),
            Step::EndBody(data) => {
                log::debug!("multipart body complete after {} part(s)", self.state.parts_started);

                let mut calls: Vec<Call> = data.into_iter().map(Call::Data).collect();
                calls.push(Call::Finish);
                Some(calls)
            }
        }
    }

    fn check(&mut self, res: Result<(), BoxError>) -> crate::Result<()> {
        res.map_err(|err| {
            log::warn!("delegate failed, abandoning the multipart body: {}", err);
            self.state.stage = StreamingStage::Halted;
            crate::Error::DelegateFailed(err)
        })
    }
}

impl<D: Delegate> StreamingParser<D> {
    /// Pushes the next chunk of the body.
    ///
    /// Resolves once every callback the chunk made possible has completed.
    ///
    /// Bytes fed after the closing boundary are ignored. Feeding a parser that
    /// halted, because of malformed input or a failed delegate, returns
    /// [`Error::Terminated`](crate::Error::Terminated).
    pub async fn feed<C: AsRef<[u8]>>(&mut self, chunk: C) -> crate::Result<()> {
        if !self.accept(chunk.as_ref())? {
            return Ok(());
        }

        while let Some(calls) = self.next_calls() {
            for call in calls {
                let res = match call {
                    Call::StartFile(headers, params) => {
                        Delegate::start_file(&mut self.delegate, headers, params).resolve().await
                    }
                    Call::Data(data) => Delegate::file_data_received(&mut self.delegate, data).resolve().await,
                    Call::Finish => Delegate::finish_file(&mut self.delegate).resolve().await,
                };
                self.check(res)?;
            }
        }

        Ok(())
    }

    /// Feeds every chunk of `stream` in order, until the stream ends or the
    /// parser reaches the closing boundary or halts.
    ///
    /// Like [`feed`](StreamingParser::feed), malformed input is not an error
    /// here; check [`error`](StreamingParser::error) afterwards.
    pub async fn feed_stream<S, O, E>(&mut self, stream: S) -> crate::Result<()>
    where
        S: Stream<Item = Result<O, E>>,
        O: Into<Bytes>,
        E: Into<BoxError>,
    {
        futures_util::pin_mut!(stream);

        while let Some(chunk) = stream.next().await {
            let chunk: Bytes = chunk.map_err(|err| crate::Error::StreamReadFailed(err.into()))?.into();

            self.feed(&chunk).await?;

            if self.is_finished() || self.is_halted() {
                break;
            }
        }

        Ok(())
    }

    /// Feeds everything read from `reader`.
    ///
    /// # Optional
    ///
    /// This requires the optional `tokio-io` feature to be enabled.
    ///
    /// # Examples
    ///
    /// ```
    /// use multipart_push::{FormCollector, StreamingParser};
    ///
    /// # async fn run() {
    /// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
    /// let reader = data.as_bytes();
    ///
    /// let mut parser = StreamingParser::with_boundary(FormCollector::new(), "X-BOUNDARY");
    /// parser.feed_reader(reader).await.unwrap();
    ///
    /// let parts = parser.into_delegate().into_parts();
    /// assert_eq!(parts[0].text(), "abcd");
    /// # }
    /// # tokio::runtime::Runtime::new().unwrap().block_on(run());
    /// ```
    #[cfg(feature = "tokio-io")]
    #[cfg_attr(nightly, doc(cfg(feature = "tokio-io")))]
    pub async fn feed_reader<R: AsyncRead>(&mut self, reader: R) -> crate::Result<()> {
        self.feed_stream(ReaderStream::new(reader)).await
    }
}

impl<D: LocalDelegate> StreamingParser<D> {
    /// Like [`feed`](StreamingParser::feed), for delegates whose callbacks
    /// return futures that are not `Send`. The returned future is not `Send`
    /// either, so it suits a single-threaded executor such as a tokio
    /// `LocalSet`.
    pub async fn feed_local<C: AsRef<[u8]>>(&mut self, chunk: C) -> crate::Result<()> {
        if !self.accept(chunk.as_ref())? {
            return Ok(());
        }

        while let Some(calls) = self.next_calls() {
            for call in calls {
                let res = match call {
                    Call::StartFile(headers, params) => {
                        LocalDelegate::start_file(&mut self.delegate, headers, params).resolve().await
                    }
                    Call::Data(data) => LocalDelegate::file_data_received(&mut self.delegate, data).resolve().await,
                    Call::Finish => LocalDelegate::finish_file(&mut self.delegate).resolve().await,
                };
                self.check(res)?;
            }
        }

        Ok(())
    }
}

impl<D> StreamingParser<D> {
    /// Whether the closing boundary has been consumed.
    pub fn is_finished(&self) -> bool {
        self.state.stage == StreamingStage::Eof
    }

    /// Whether the parser stopped because of malformed input or a failed
    /// delegate.
    pub fn is_halted(&self) -> bool {
        self.state.stage == StreamingStage::Halted
    }

    /// The malformed-input error that halted the parser, if any.
    pub fn error(&self) -> Option<&crate::Error> {
        self.error.as_ref()
    }

    /// The boundary token, without quotes.
    pub fn boundary(&self) -> &str {
        self.state.boundary.token()
    }

    /// How many parts have been announced through `start_file`.
    pub fn parts_started(&self) -> usize {
        self.state.parts_started
    }

    /// Total number of bytes passed to `feed` before the body ended. Bytes that
    /// arrived in the same chunk as the closing boundary are counted.
    pub fn bytes_fed(&self) -> u64 {
        self.state.buffer.total_fed
    }

    /// Number of bytes fed but not consumed yet.
    pub fn buffered_len(&self) -> usize {
        self.state.buffer.len()
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn delegate_mut(&mut self) -> &mut D {
        &mut self.delegate
    }

    pub fn into_delegate(self) -> D {
        self.delegate
    }
}

/// A delegate callback that is due.
enum Call {
    StartFile(HeaderMap, DispositionParams),
    Data(Bytes),
    Finish,
}

fn boundary_from_headers(headers: &HeaderMap) -> crate::Result<String> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .ok_or(crate::Error::NoContentType)?
        .to_str()
        .map_err(|_| crate::Error::NoMultipart)?;

    crate::parse_boundary(content_type)
}
