use crate::boundary::Boundary;
use crate::buffer::FeedBuffer;
use crate::content_disposition::{ContentDisposition, DispositionParams};
use crate::{constants, helpers};
use bytes::Bytes;
use http::header::HeaderMap;

#[derive(Debug)]
pub(crate) struct ParserState {
    pub(crate) buffer: FeedBuffer,
    pub(crate) boundary: Boundary,
    pub(crate) stage: StreamingStage,
    pub(crate) parts_started: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamingStage {
    AwaitingBoundary,
    AwaitingHeaders,
    InBody,
    Eof,
    Halted,
}

/// What the driver has to do next.
#[derive(Debug)]
pub(crate) enum Step {
    /// Not enough bytes buffered to make progress.
    Suspend,
    /// The body is malformed; the parser stops for good.
    Halt(crate::Error),
    StartFile {
        headers: HeaderMap,
        params: DispositionParams,
    },
    /// Provisional data of the current part.
    Data(Bytes),
    /// The last data of the current part, which ends at a delimiter.
    EndPart(Bytes),
    /// The terminator was reached, with the last data of the current part if
    /// one was open.
    EndBody(Option<Bytes>),
}

impl ParserState {
    pub(crate) fn new(boundary: Boundary) -> ParserState {
        ParserState {
            buffer: FeedBuffer::new(),
            boundary,
            stage: StreamingStage::AwaitingBoundary,
            parts_started: 0,
        }
    }

    /// Runs the buffered bytes through the phase machine until a delegate
    /// callback is due or more bytes are needed.
    pub(crate) fn next_step(&mut self) -> Step {
        loop {
            let step = match self.stage {
                StreamingStage::AwaitingBoundary => self.read_boundary(),
                StreamingStage::AwaitingHeaders => self.read_headers(),
                StreamingStage::InBody => self.read_body(),
                StreamingStage::Eof | StreamingStage::Halted => Some(Step::Suspend),
            };

            if let Some(step) = step {
                return step;
            }
        }
    }

    fn read_boundary(&mut self) -> Option<Step> {
        let delimiter = self.boundary.delimiter();

        // One byte past the delimiter length is needed to tell it apart from a
        // terminator prefix.
        if self.buffer.len() <= delimiter.len() {
            return Some(Step::Suspend);
        }

        if self.buffer.starts_with(delimiter) {
            let delimiter_len = delimiter.len();
            self.buffer.advance(delimiter_len);
            self.stage = StreamingStage::AwaitingHeaders;

            log::debug!("found part delimiter, reading part headers");
            return None;
        }

        let terminator = self.boundary.terminator();

        if self.buffer.starts_with(terminator) {
            let terminator_len = terminator.len();
            self.buffer.advance(terminator_len);
            self.stage = StreamingStage::Eof;

            log::debug!("found closing boundary before any part");
            return Some(Step::EndBody(None));
        }

        if self.buffer.is_prefix_of(terminator) {
            return Some(Step::Suspend);
        }

        Some(self.halt(crate::Error::InvalidBoundary))
    }

    fn read_headers(&mut self) -> Option<Step> {
        let idx = match self.buffer.find(constants::CRLF_CRLF.as_bytes()) {
            Some(idx) => idx,
            None => return Some(Step::Suspend),
        };

        if idx == 0 {
            return Some(self.halt(crate::Error::MissingHeaders));
        }

        let block_len = idx + constants::CRLF_CRLF.len();

        let headers = match helpers::parse_header_block(&self.buffer.as_slice()[..block_len]) {
            Ok(headers) => headers,
            Err(err) => return Some(self.halt(err)),
        };

        let content_disposition = ContentDisposition::from_headers(&headers);

        if content_disposition.disposition != constants::FORM_DATA {
            return Some(self.halt(crate::Error::InvalidDisposition {
                disposition: content_disposition.disposition,
            }));
        }

        self.buffer.advance(block_len);
        self.stage = StreamingStage::InBody;
        self.parts_started += 1;

        log::debug!(
            "starting part #{} {:?}",
            self.parts_started,
            content_disposition.params.name().unwrap_or("<unnamed>")
        );

        Some(Step::StartFile {
            headers,
            params: content_disposition.params,
        })
    }

    fn read_body(&mut self) -> Option<Step> {
        let haystack = self.buffer.as_slice();
        let terminator_idx = self.boundary.find_terminator(haystack);
        let delimiter_idx = self
            .boundary
            .find_delimiter(haystack)
            .filter(|&idx| terminator_idx.map_or(true, |t_idx| idx < t_idx));

        if let Some(idx) = delimiter_idx {
            let data = self.buffer.split_to(idx);
            self.buffer.advance(self.boundary.delimiter().len());
            self.stage = StreamingStage::AwaitingHeaders;

            // The CRLF in front of the delimiter belongs to the boundary.
            let data = data.slice(..data.len().saturating_sub(constants::CRLF.len()));

            log::debug!("part ended at delimiter");
            return Some(Step::EndPart(data));
        }

        if let Some(idx) = terminator_idx {
            let data = self.buffer.split_to(idx);
            self.buffer.advance(self.boundary.terminator().len());
            self.stage = StreamingStage::Eof;

            if !self.buffer.is_empty() {
                log::debug!("{} bytes left after the closing boundary", self.buffer.len());
            }

            return Some(Step::EndBody(Some(data)));
        }

        let ready = haystack.len() - self.boundary.partial_tail_len(haystack);

        if ready == 0 {
            return Some(Step::Suspend);
        }

        log::trace!("emitting {} provisional bytes", ready);
        Some(Step::Data(self.buffer.split_to(ready)))
    }

    fn halt(&mut self, err: crate::Error) -> Step {
        self.stage = StreamingStage::Halted;
        Step::Halt(err)
    }
}
