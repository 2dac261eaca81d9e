use encoding_rs::{Encoding, UTF_8};
use http::header::{self, HeaderMap};
use std::collections::hash_map::{self, HashMap};
use std::iter::FromIterator;

/// The parameters of a part's `Content-Disposition` header, e.g. `name` and
/// `filename`.
///
/// Keys are lower-cased. Values are unquoted and unescaped, and RFC 2231
/// extended values (`filename*=UTF-8''...`) are decoded and take precedence
/// over their plain counterparts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispositionParams {
    params: HashMap<String, String>,
}

impl DispositionParams {
    /// Creates an empty parameter set.
    pub fn new() -> DispositionParams {
        DispositionParams::default()
    }

    /// Returns the value of the parameter `key`; lookups are case-insensitive.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .or_else(|| self.params.get(&key.to_ascii_lowercase()))
            .map(String::as_str)
    }

    /// The `name` parameter.
    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    /// The `filename` parameter.
    pub fn filename(&self) -> Option<&str> {
        self.get("filename")
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.params.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub(crate) fn insert(&mut self, key: String, value: String) {
        self.params.insert(key, value);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DispositionParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        DispositionParams {
            params: iter
                .into_iter()
                .map(|(key, value)| (key.into().to_ascii_lowercase(), value.into()))
                .collect(),
        }
    }
}

/// Iterator over `(key, value)` pairs of [`DispositionParams`].
pub struct Iter<'a> {
    inner: hash_map::Iter<'a, String, String>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a> IntoIterator for &'a DispositionParams {
    type Item = (&'a str, &'a str);
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// A tokenized `Content-Disposition` header value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDisposition {
    /// The disposition type, e.g. `form-data`. Compared case-sensitively.
    pub disposition: String,
    pub params: DispositionParams,
}

impl ContentDisposition {
    /// Tokenizes a header value such as `form-data; name="f"; filename="a.txt"`.
    ///
    /// `;` inside a quoted string does not split. Parameters without `=` are
    /// skipped.
    pub fn parse(value: &str) -> ContentDisposition {
        let mut fields = split_fields(value).into_iter();
        let disposition = fields.next().unwrap_or_default().trim().to_owned();

        let mut params = DispositionParams::new();
        let mut extended = Vec::new();

        for field in fields {
            let (key, value) = match field.split_once('=') {
                Some(pair) => pair,
                None => continue,
            };

            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.strip_suffix('*') {
                Some(base) => match decode_extended_value(&unquote(value)) {
                    Some(decoded) => extended.push((base.to_owned(), decoded)),
                    None => log::debug!("skipping undecodable extended parameter {:?}", key),
                },
                None => params.insert(key, unquote(value)),
            }
        }

        for (key, value) in extended {
            params.insert(key, value);
        }

        ContentDisposition { disposition, params }
    }

    /// Tokenizes the `Content-Disposition` header of a part, treating a missing
    /// header as an empty value.
    pub fn from_headers(headers: &HeaderMap) -> ContentDisposition {
        let value = headers
            .get(header::CONTENT_DISPOSITION)
            .map(|val| String::from_utf8_lossy(val.as_bytes()).into_owned())
            .unwrap_or_default();

        ContentDisposition::parse(&value)
    }
}

fn split_fields(value: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (idx, ch) in value.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                fields.push(&value[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }

    fields.push(&value[start..]);
    fields
}

fn unquote(value: &str) -> String {
    if !(value.len() >= 2 && value.starts_with('"') && value.ends_with('"')) {
        return value.to_owned();
    }

    let inner = &value[1..value.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();

    while let Some(ch) = chars.next() {
        match (ch, chars.peek()) {
            ('\\', Some(&next)) if next == '\\' || next == '"' => {
                out.push(next);
                chars.next();
            }
            _ => out.push(ch),
        }
    }

    out
}

/// Decodes an RFC 2231 `charset'language'percent-encoded` value.
fn decode_extended_value(value: &str) -> Option<String> {
    let mut pieces = value.splitn(3, '\'');
    let charset = pieces.next()?;
    let _language = pieces.next()?;
    let encoded = pieces.next()?;

    let bytes = percent_decode(encoded.as_bytes())?;
    let encoding = if charset.is_empty() {
        UTF_8
    } else {
        Encoding::for_label(charset.as_bytes())?
    };

    let (text, _, _) = encoding.decode(&bytes);
    Some(text.into_owned())
}

fn percent_decode(input: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    let mut idx = 0;

    while idx < input.len() {
        if input[idx] == b'%' {
            let hex = input.get(idx + 1..idx + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            idx += 3;
        } else {
            out.push(input[idx]);
            idx += 1;
        }
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::HeaderValue;

    fn params(pairs: Vec<(&str, &str)>) -> DispositionParams {
        pairs.into_iter().collect()
    }

    #[test]
    fn test_parse_form_data() {
        let cd = ContentDisposition::parse(r#"form-data; name="files"; filename="ab.txt""#);
        assert_eq!(cd.disposition, "form-data");
        assert_eq!(cd.params, params(vec![("name", "files"), ("filename", "ab.txt")]));
        assert_eq!(cd.params.name(), Some("files"));
        assert_eq!(cd.params.filename(), Some("ab.txt"));
        assert_eq!(cd.params.len(), 2);
    }

    #[test]
    fn test_parse_special_filenames() {
        let filenames = vec!["a;b.txt", "a\"b.txt", "a\";b.txt", "a;\"b.txt", "a\";\";.txt", "a\\\"b.txt", "a\\b.txt"];

        for filename in filenames {
            let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
            let value = format!("form-data; name=\"files\"; filename=\"{}\"", escaped);

            let cd = ContentDisposition::parse(&value);
            assert_eq!(cd.disposition, "form-data");
            assert_eq!(cd.params.filename(), Some(filename), "value: {}", value);
            assert_eq!(cd.params.name(), Some("files"));
        }
    }

    #[test]
    fn test_parse_unusual_shapes() {
        let cd = ContentDisposition::parse("");
        assert_eq!(cd.disposition, "");
        assert!(cd.params.is_empty());

        let cd = ContentDisposition::parse(r#"invalid; name="files""#);
        assert_eq!(cd.disposition, "invalid");

        let cd = ContentDisposition::parse(r#" form-data ;NAME=field; flag; filename = plain.txt "#);
        assert_eq!(cd.disposition, "form-data");
        assert_eq!(cd.params, params(vec![("name", "field"), ("filename", "plain.txt")]));
        assert_eq!(cd.params.get("Name"), Some("field"));

        let cd = ContentDisposition::parse(r#"form-data; name="a\x""#);
        assert_eq!(cd.params.name(), Some("a\\x"));
    }

    #[test]
    fn test_parse_extended_values() {
        let cd = ContentDisposition::parse(
            "form-data; name=\"f\"; filename=\"fallback.txt\"; filename*=UTF-8''na%C3%AFve%20file.txt",
        );
        assert_eq!(cd.params.filename(), Some("naïve file.txt"));

        let cd = ContentDisposition::parse("form-data; filename*=iso-8859-1'en'caf%E9.txt");
        assert_eq!(cd.params.filename(), Some("café.txt"));

        let cd = ContentDisposition::parse("form-data; filename=\"kept.txt\"; filename*=UTF-8''bad%2");
        assert_eq!(cd.params.filename(), Some("kept.txt"));
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        assert_eq!(ContentDisposition::from_headers(&headers), ContentDisposition::default());

        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static(r#"form-data; name="my field"; filename="file abc.txt""#),
        );
        let cd = ContentDisposition::from_headers(&headers);
        assert_eq!(cd.params.name(), Some("my field"));
        assert_eq!(cd.params.filename(), Some("file abc.txt"));

        let mut collected: Vec<_> = cd.params.iter().collect();
        collected.sort();
        assert_eq!(collected, vec![("filename", "file abc.txt"), ("name", "my field")]);
    }
}
