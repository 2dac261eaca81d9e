use crate::constants;
use bytes::Bytes;
use memchr::memmem::Finder;

/// The boundary markers derived once from the boundary token.
#[derive(Debug, Clone)]
pub(crate) struct Boundary {
    token: String,
    /// `--{boundary}\r\n`
    delimiter: Bytes,
    /// `\r\n--{boundary}\r\n`
    line_delimiter: Bytes,
    /// `\r\n--{boundary}--\r\n`
    terminator: Bytes,
    delimiter_finder: Finder<'static>,
    terminator_finder: Finder<'static>,
}

impl Boundary {
    pub(crate) fn new<B: Into<String>>(token: B) -> Boundary {
        let token = token.into();

        let delimiter = Bytes::from(format!("{}{}{}", constants::BOUNDARY_EXT, token, constants::CRLF));
        let line_delimiter = Bytes::from([constants::CRLF.as_bytes(), &delimiter[..]].concat());
        let terminator = Bytes::from(format!(
            "{}{}{}{}{}",
            constants::CRLF,
            constants::BOUNDARY_EXT,
            token,
            constants::BOUNDARY_EXT,
            constants::CRLF
        ));

        let delimiter_finder = Finder::new(&delimiter[..]).into_owned();
        let terminator_finder = Finder::new(&terminator[..]).into_owned();

        Boundary {
            token,
            delimiter,
            line_delimiter,
            terminator,
            delimiter_finder,
            terminator_finder,
        }
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    pub(crate) fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }

    pub(crate) fn terminator(&self) -> &[u8] {
        &self.terminator
    }

    pub(crate) fn find_delimiter(&self, haystack: &[u8]) -> Option<usize> {
        self.delimiter_finder.find(haystack)
    }

    pub(crate) fn find_terminator(&self, haystack: &[u8]) -> Option<usize> {
        self.terminator_finder.find(haystack)
    }

    /// Length of the longest suffix of `haystack` that could still grow into a
    /// CRLF-led delimiter or the terminator once more bytes arrive.
    pub(crate) fn partial_tail_len(&self, haystack: &[u8]) -> usize {
        let window = haystack.len().saturating_sub(self.terminator.len() - 1);

        // Both markers start with CR, so only CR positions can begin a partial match.
        memchr::memchr_iter(b'\r', &haystack[window..])
            .map(|idx| window + idx)
            .find(|&idx| {
                let tail = &haystack[idx..];
                (tail.len() < self.line_delimiter.len() && self.line_delimiter.starts_with(tail))
                    || (tail.len() < self.terminator.len() && self.terminator.starts_with(tail))
            })
            .map(|idx| haystack.len() - idx)
            .unwrap_or(0)
    }
}

/// Parses the `Content-Type` header to extract the boundary value.
///
/// The media type must be `multipart/form-data`. The first `boundary=`
/// attribute with a non-empty value wins, and one layer of surrounding double
/// quotes is removed from it.
///
/// # Examples
///
/// ```
/// let boundary = multipart_push::parse_boundary("multipart/form-data; boundary=\"X-BOUNDARY\"");
/// assert_eq!(boundary, Ok("X-BOUNDARY".to_owned()));
/// ```
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> crate::Result<String> {
    let mut fields = content_type.as_ref().split(';').map(str::trim);

    let essence = fields
        .next()
        .and_then(|essence| essence.parse::<mime::Mime>().ok())
        .ok_or(crate::Error::NoMultipart)?;

    if !(essence.type_() == mime::MULTIPART_FORM_DATA.type_()
        && essence.subtype() == mime::MULTIPART_FORM_DATA.subtype())
    {
        return Err(crate::Error::NoMultipart);
    }

    let value = fields
        .filter_map(|field| field.split_once('='))
        .find(|(key, value)| *key == constants::BOUNDARY_PARAM && !value.is_empty())
        .map(|(_, value)| value)
        .ok_or(crate::Error::NoBoundary)?;

    let value = if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    };

    if value.is_empty() {
        return Err(crate::Error::NoBoundary);
    }

    Ok(value.to_owned())
}
