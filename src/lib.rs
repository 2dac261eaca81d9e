//! A push-driven `multipart/form-data` parser.
//!
//! Instead of pulling fields out of a body stream, the body is pushed into a
//! [`StreamingParser`] in chunks of any size, as they arrive from the network.
//! The parser calls back into a [`Delegate`] when a part starts, when part
//! content is available and when a part ends. Callbacks may finish
//! asynchronously, which gives the caller natural backpressure when part
//! content is written to slow storage.
//!
//! # Examples
//!
//! ```
//! use bytes::Bytes;
//! use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
//! use multipart_push::{Completion, Delegate, DispositionParams, StreamingParser};
//!
//! #[derive(Default)]
//! struct Upload {
//!     files: Vec<(String, Vec<u8>)>,
//! }
//!
//! impl Delegate for Upload {
//!     fn start_file(&mut self, _: HeaderMap, params: DispositionParams) -> Completion<'_> {
//!         let name = params.filename().unwrap_or("unnamed").to_owned();
//!         self.files.push((name, Vec::new()));
//!         Completion::ready()
//!     }
//!
//!     fn file_data_received(&mut self, data: Bytes) -> Completion<'_> {
//!         if let Some((_, content)) = self.files.last_mut() {
//!             content.extend_from_slice(&data);
//!         }
//!         Completion::ready()
//!     }
//! }
//!
//! # async fn run() -> multipart_push::Result<()> {
//! let mut headers = HeaderMap::new();
//! headers.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data; boundary=X-BOUNDARY"));
//!
//! let mut parser = StreamingParser::new(Upload::default(), &headers)?;
//!
//! parser.feed("--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"doc\"; filename=\"a.txt\"\r\n").await?;
//! parser.feed("\r\nHello, wor").await?;
//! parser.feed("ld!\r\n--X-BOUNDARY--\r\n").await?;
//!
//! assert!(parser.is_finished());
//! assert_eq!(parser.delegate().files, vec![("a.txt".to_owned(), b"Hello, world!".to_vec())]);
//! # Ok(())
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(run()).unwrap();
//! ```
//!
//! For small forms, [`FormCollector`] is a ready-made delegate that keeps
//! every part in memory within a [`SizeLimit`].
//!
//! ## Optional features
//!
//! * `json`: adds [`CollectedPart::json`] to deserialize part content.
//! * `tokio-io`: adds [`StreamingParser::feed_reader`] to feed a parser from
//!   an [`AsyncRead`](tokio::io::AsyncRead).

#![cfg_attr(nightly, feature(doc_cfg))]

pub use bytes;

pub use boundary::parse_boundary;
pub use collect::{CollectedPart, FormCollector};
pub use content_disposition::{ContentDisposition, DispositionParams};
pub use delegate::{Completion, Delegate, LocalCompletion, LocalDelegate, RequestHeaders};
pub use error::{BoxError, Error};
pub use parser::StreamingParser;
pub use size_limit::SizeLimit;

mod boundary;
mod buffer;
mod collect;
mod constants;
mod content_disposition;
mod delegate;
mod error;
mod helpers;
mod parser;
mod size_limit;
mod state;

/// A Result type often returned from methods that can have `multipart-push`
/// errors.
pub type Result<T> = std::result::Result<T, Error>;
