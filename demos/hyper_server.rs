use std::{convert::Infallible, net::SocketAddr, path::PathBuf};

use bytes::Bytes;
use futures_util::StreamExt;
use http_body_util::{BodyStream, Full};
use hyper::{body::Incoming, header::HeaderMap, Request, Response, StatusCode};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
// Import the parser types.
use multipart_push::{Completion, Delegate, DispositionParams, StreamingParser};

// Writes every uploaded file to a directory as its content arrives.
struct DiskWriter {
    dir: PathBuf,
    current: Option<File>,
    saved: Vec<(String, u64)>,
}

impl Delegate for DiskWriter {
    fn start_file(&mut self, _: HeaderMap, params: DispositionParams) -> Completion<'_> {
        let file_name = params
            .filename()
            .or_else(|| params.name())
            .unwrap_or("unnamed")
            .replace(|c: char| c == '/' || c == '\\', "_");
        let path = self.dir.join(&file_name);

        // The parser waits for the file to be created before it goes on.
        Completion::pending(async move {
            self.current = Some(File::create(&path).await?);
            self.saved.push((file_name, 0));
            Ok::<(), std::io::Error>(())
        })
    }

    fn file_data_received(&mut self, data: Bytes) -> Completion<'_> {
        Completion::pending(async move {
            if let Some(file) = self.current.as_mut() {
                file.write_all(&data).await?;
            }
            if let Some((_, len)) = self.saved.last_mut() {
                *len += data.len() as u64;
            }
            Ok::<(), std::io::Error>(())
        })
    }

    fn finish_file(&mut self) -> Completion<'_> {
        Completion::pending(async move {
            if let Some(mut file) = self.current.take() {
                file.flush().await?;
            }
            Ok::<(), std::io::Error>(())
        })
    }
}

fn respond(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder().status(status).body(Full::from(body)).unwrap()
}

// A handler for incoming requests.
async fn handle(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();

    let writer = DiskWriter {
        dir: std::env::temp_dir(),
        current: None,
        saved: Vec::new(),
    };

    // Send `BAD_REQUEST` status if the content-type is not multipart/form-data.
    let mut parser = match StreamingParser::new(writer, &parts.headers) {
        Ok(parser) => parser,
        Err(err) => return Ok(respond(StatusCode::BAD_REQUEST, format!("BAD REQUEST: {}", err))),
    };

    // Convert the body into a stream of data frames.
    let body_stream = BodyStream::new(body)
        .filter_map(|result| async move { result.map(|frame| frame.into_data().ok()).transpose() });

    // Push every frame into the parser as it arrives.
    if let Err(err) = parser.feed_stream(body_stream).await {
        return Ok(respond(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("INTERNAL SERVER ERROR: {}", err),
        ));
    }

    if let Some(err) = parser.error() {
        return Ok(respond(StatusCode::BAD_REQUEST, format!("BAD REQUEST: {}", err)));
    }

    if !parser.is_finished() {
        return Ok(respond(StatusCode::BAD_REQUEST, "BAD REQUEST: truncated body".to_owned()));
    }

    Ok(respond(StatusCode::OK, format!("Saved: {:?}", parser.delegate().saved)))
}

#[tokio::main]
async fn main() {
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    println!("Server running at: {}", addr);

    let service = hyper::service::service_fn(handle);

    loop {
        let (socket, _remote_addr) = listener.accept().await.unwrap();
        let socket = hyper_util::rt::TokioIo::new(socket);
        tokio::spawn(async move {
            if let Err(e) = hyper::server::conn::http1::Builder::new()
                .serve_connection(socket, service)
                .await
            {
                eprintln!("server error: {}", e);
            }
        });
    }
}
