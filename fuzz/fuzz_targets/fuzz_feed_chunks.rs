#![no_main]

use libfuzzer_sys::fuzz_target;
use multipart_push::bytes::Bytes;
use multipart_push::{Completion, Delegate, DispositionParams, StreamingParser};
use http::header::HeaderMap;
use tokio::runtime;

#[derive(Default)]
struct Tally {
    open: bool,
    received: usize,
}

impl Delegate for Tally {
    fn start_file(&mut self, _: HeaderMap, _: DispositionParams) -> Completion<'_> {
        self.open = true;
        Completion::ready()
    }

    fn file_data_received(&mut self, data: Bytes) -> Completion<'_> {
        assert!(self.open, "data outside of a part");
        self.received += data.len();
        Completion::ready()
    }

    fn finish_file(&mut self) -> Completion<'_> {
        self.open = false;
        Completion::ready()
    }
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // The first byte picks the chunk size, the rest is the body.
    let chunk_size = data[0] as usize + 1;
    let body = &data[1..];

    let rt = runtime::Builder::new_current_thread().build().expect("runtime");
    rt.block_on(async {
        let mut parser = StreamingParser::with_boundary(Tally::default(), "X-BOUNDARY");

        for chunk in body.chunks(chunk_size) {
            if parser.feed(chunk).await.is_err() {
                break;
            }
        }

        assert!(parser.delegate().received <= body.len());
    })
});
