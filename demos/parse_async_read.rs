use tokio::io::AsyncRead;
// Import the parser types.
use multipart_push::{FormCollector, SizeLimit, StreamingParser};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate an `AsyncRead` and the boundary from somewhere e.g. server request body.
    let (reader, boundary) = get_async_reader_from_somewhere().await;

    // Keep every part in memory, but no more than 1 KiB of each.
    let collector = FormCollector::with_size_limit(SizeLimit::new().per_field(1024));
    let mut parser = StreamingParser::with_boundary(collector, boundary);

    // Push everything the reader yields into the parser.
    parser.feed_reader(reader).await?;

    if let Some(err) = parser.error() {
        return Err(err.to_string().into());
    }

    for part in parser.into_delegate().into_parts() {
        println!("Name: {:?}, File Name: {:?}", part.name(), part.file_name());
        println!("Content: {:?}", part.text());
    }

    Ok(())
}

// Generate an `AsyncRead` and the boundary from somewhere e.g. server request body.
async fn get_async_reader_from_somewhere() -> (impl AsyncRead, &'static str) {
    let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"My Field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"File Field\"; filename=\"a-text-file.txt\"\r\nContent-Type: text/plain\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";

    (data.as_bytes(), "X-BOUNDARY")
}
