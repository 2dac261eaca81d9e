use crate::error::BoxError;
use crate::DispositionParams;
use bytes::Bytes;
use futures_util::future::{BoxFuture, LocalBoxFuture};
use http::header::HeaderMap;
use std::fmt::{self, Debug, Formatter};
use std::future::Future;

/// The outcome of a delegate callback: either finished already, or a future
/// the parser awaits before it touches the buffer again.
///
/// # Examples
///
/// ```
/// use multipart_push::Completion;
///
/// let done = Completion::ready();
/// let later = Completion::pending(async { Ok::<(), std::io::Error>(()) });
/// # drop((done, later));
/// ```
#[must_use = "a completion does nothing unless returned to the parser"]
pub enum Completion<'a> {
    Ready(Result<(), BoxError>),
    Pending(BoxFuture<'a, Result<(), BoxError>>),
}

impl<'a> Completion<'a> {
    /// A callback that completed successfully.
    pub fn ready() -> Completion<'a> {
        Completion::Ready(Ok(()))
    }

    /// A callback that failed; the parser halts and `feed` returns
    /// [`Error::DelegateFailed`](crate::Error::DelegateFailed).
    pub fn fail<E: Into<BoxError>>(err: E) -> Completion<'a> {
        Completion::Ready(Err(err.into()))
    }

    /// A callback that finishes when `fut` resolves.
    pub fn pending<F, E>(fut: F) -> Completion<'a>
    where
        F: Future<Output = Result<(), E>> + Send + 'a,
        E: Into<BoxError> + 'a,
    {
        Completion::Pending(Box::pin(async move { fut.await.map_err(Into::into) }))
    }

    pub(crate) async fn resolve(self) -> Result<(), BoxError> {
        match self {
            Completion::Ready(res) => res,
            Completion::Pending(fut) => fut.await,
        }
    }
}

impl Default for Completion<'_> {
    fn default() -> Self {
        Completion::ready()
    }
}

impl From<Result<(), BoxError>> for Completion<'_> {
    fn from(res: Result<(), BoxError>) -> Self {
        Completion::Ready(res)
    }
}

impl Debug for Completion<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Ready(res) => f.debug_tuple("Ready").field(res).finish(),
            Completion::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Receives the parts found by a [`StreamingParser`](crate::StreamingParser).
///
/// Callbacks never overlap: when one returns [`Completion::Pending`], the
/// parser waits for it before doing anything else. Every method defaults to a
/// no-op.
///
/// `finish_file` can arrive without a preceding `start_file` when the body
/// holds no parts at all.
pub trait Delegate {
    /// A new part begins.
    fn start_file(&mut self, headers: HeaderMap, params: DispositionParams) -> Completion<'_> {
        let _ = (headers, params);
        Completion::ready()
    }

    /// The next chunk of the current part's content. Concatenating every chunk
    /// of a part in order yields the exact content.
    fn file_data_received(&mut self, data: Bytes) -> Completion<'_> {
        let _ = data;
        Completion::ready()
    }

    /// The current part ended.
    fn finish_file(&mut self) -> Completion<'_> {
        Completion::ready()
    }
}

/// The outcome of a [`LocalDelegate`] callback. Unlike [`Completion`], the
/// pending future does not have to be `Send`, so it may hold `Rc` state or
/// run on a single-threaded executor.
#[must_use = "a completion does nothing unless returned to the parser"]
pub enum LocalCompletion<'a> {
    Ready(Result<(), BoxError>),
    Pending(LocalBoxFuture<'a, Result<(), BoxError>>),
}

impl<'a> LocalCompletion<'a> {
    pub fn ready() -> LocalCompletion<'a> {
        LocalCompletion::Ready(Ok(()))
    }

    pub fn fail<E: Into<BoxError>>(err: E) -> LocalCompletion<'a> {
        LocalCompletion::Ready(Err(err.into()))
    }

    /// A callback that finishes when `fut` resolves.
    pub fn pending<F, E>(fut: F) -> LocalCompletion<'a>
    where
        F: Future<Output = Result<(), E>> + 'a,
        E: Into<BoxError> + 'a,
    {
        LocalCompletion::Pending(Box::pin(async move { fut.await.map_err(Into::into) }))
    }

    pub(crate) async fn resolve(self) -> Result<(), BoxError> {
        match self {
            LocalCompletion::Ready(res) => res,
            LocalCompletion::Pending(fut) => fut.await,
        }
    }
}

impl Default for LocalCompletion<'_> {
    fn default() -> Self {
        LocalCompletion::ready()
    }
}

impl<'a> From<Completion<'a>> for LocalCompletion<'a> {
    fn from(completion: Completion<'a>) -> Self {
        match completion {
            Completion::Ready(res) => LocalCompletion::Ready(res),
            Completion::Pending(fut) => LocalCompletion::Pending(fut),
        }
    }
}

impl Debug for LocalCompletion<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            LocalCompletion::Ready(res) => f.debug_tuple("Ready").field(res).finish(),
            LocalCompletion::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// [`Delegate`] for callbacks whose futures are not `Send`, driven through
/// [`StreamingParser::feed_local`](crate::StreamingParser::feed_local).
///
/// Every [`Delegate`] is also a `LocalDelegate`.
pub trait LocalDelegate {
    fn start_file(&mut self, headers: HeaderMap, params: DispositionParams) -> LocalCompletion<'_> {
        let _ = (headers, params);
        LocalCompletion::ready()
    }

    fn file_data_received(&mut self, data: Bytes) -> LocalCompletion<'_> {
        let _ = data;
        LocalCompletion::ready()
    }

    fn finish_file(&mut self) -> LocalCompletion<'_> {
        LocalCompletion::ready()
    }
}

impl<D: Delegate + ?Sized> LocalDelegate for D {
    fn start_file(&mut self, headers: HeaderMap, params: DispositionParams) -> LocalCompletion<'_> {
        Delegate::start_file(self, headers, params).into()
    }

    fn file_data_received(&mut self, data: Bytes) -> LocalCompletion<'_> {
        Delegate::file_data_received(self, data).into()
    }

    fn finish_file(&mut self) -> LocalCompletion<'_> {
        Delegate::finish_file(self).into()
    }
}

/// A delegate that also knows the headers of the request it is handling.
///
/// Enables [`StreamingParser::from_delegate`](crate::StreamingParser::from_delegate).
pub trait RequestHeaders {
    fn request_headers(&self) -> Option<&HeaderMap>;
}

impl<D: Delegate + ?Sized> Delegate for &mut D {
    fn start_file(&mut self, headers: HeaderMap, params: DispositionParams) -> Completion<'_> {
        Delegate::start_file(&mut **self, headers, params)
    }

    fn file_data_received(&mut self, data: Bytes) -> Completion<'_> {
        Delegate::file_data_received(&mut **self, data)
    }

    fn finish_file(&mut self) -> Completion<'_> {
        Delegate::finish_file(&mut **self)
    }
}

impl<D: Delegate + ?Sized> Delegate for Box<D> {
    fn start_file(&mut self, headers: HeaderMap, params: DispositionParams) -> Completion<'_> {
        Delegate::start_file(&mut **self, headers, params)
    }

    fn file_data_received(&mut self, data: Bytes) -> Completion<'_> {
        Delegate::file_data_received(&mut **self, data)
    }

    fn finish_file(&mut self) -> Completion<'_> {
        Delegate::finish_file(&mut **self)
    }
}

impl<R: RequestHeaders + ?Sized> RequestHeaders for &mut R {
    fn request_headers(&self) -> Option<&HeaderMap> {
        (**self).request_headers()
    }
}

impl<R: RequestHeaders + ?Sized> RequestHeaders for Box<R> {
    fn request_headers(&self) -> Option<&HeaderMap> {
        (**self).request_headers()
    }
}

impl RequestHeaders for HeaderMap {
    fn request_headers(&self) -> Option<&HeaderMap> {
        Some(self)
    }
}

impl<B> RequestHeaders for http::Request<B> {
    fn request_headers(&self) -> Option<&HeaderMap> {
        Some(self.headers())
    }
}
