//! `multipart/form-data` body encoder.

use axum::http::{header, HeaderMap, HeaderValue};
use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::http::form::UploadedFile;

const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

/// Content of a single part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartBody {
    Text(String),
    File(UploadedFile),
}

/// A named part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub body: PartBody,
}

impl Part {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: PartBody::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, file: UploadedFile) -> Self {
        Self {
            name: name.into(),
            body: PartBody::File(file),
        }
    }
}

/// An encoded multipart body together with its boundary.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    parts: Vec<Part>,
}

impl MultipartBody {
    /// Creates a body with a random boundary.
    pub fn new(parts: Vec<Part>) -> Self {
        Self::with_boundary(Uuid::new_v4().simple().to_string(), parts)
    }

    pub fn with_boundary(boundary: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            boundary: boundary.into(),
            parts,
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Headers the outbound request needs to carry this body.
    pub fn prepared_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        // the boundary is alphanumeric, so this cannot fail
        if let Ok(value) =
            HeaderValue::from_str(&format!("multipart/form-data; boundary={}", self.boundary))
        {
            headers.insert(header::CONTENT_TYPE, value);
        }
        headers
    }

    /// Renders the full body.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            match &part.body {
                PartBody::Text(value) => {
                    buf.put_slice(b"Content-Type: text/plain; charset=utf-8\r\n");
                    buf.put_slice(b"Content-Transfer-Encoding: 8bit\r\n");
                    buf.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                            escape(&part.name)
                        )
                        .as_bytes(),
                    );
                    buf.put_slice(value.as_bytes());
                }
                PartBody::File(file) => {
                    let content_type = file.content_type.as_deref().unwrap_or(DEFAULT_FILE_TYPE);
                    buf.put_slice(format!("Content-Type: {}\r\n", content_type).as_bytes());
                    buf.put_slice(b"Content-Transfer-Encoding: 8bit\r\n");
                    buf.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\r\n",
                            escape(&part.name),
                            escape(&file.file_name)
                        )
                        .as_bytes(),
                    );
                    buf.put_slice(&file.data);
                }
            }
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");
        buf.freeze()
    }
}

fn escape(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_carries_boundary() {
        let body = MultipartBody::with_boundary("abc123", vec![]);
        let headers = body.prepared_headers();
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            "multipart/form-data; boundary=abc123"
        );
    }

    #[test]
    fn test_text_and_file_parts() {
        let body = MultipartBody::with_boundary(
            "b",
            vec![
                Part::text("key", "value"),
                Part::file("doc", UploadedFile::new("test.txt", Some("text/plain"), "hello")),
            ],
        );

        let expected = "--b\r\n\
            Content-Type: text/plain; charset=utf-8\r\n\
            Content-Transfer-Encoding: 8bit\r\n\
            Content-Disposition: form-data; name=\"key\"\r\n\r\n\
            value\r\n\
            --b\r\n\
            Content-Type: text/plain\r\n\
            Content-Transfer-Encoding: 8bit\r\n\
            Content-Disposition: form-data; name=\"doc\"; filename=\"test.txt\"\r\n\r\n\
            hello\r\n\
            --b--\r\n";
        assert_eq!(body.to_bytes(), Bytes::from(expected));
    }

    #[test]
    fn test_empty_body_is_terminated() {
        let body = MultipartBody::with_boundary("b", vec![]);
        assert_eq!(body.to_bytes(), Bytes::from_static(b"--b--\r\n"));
    }

    #[test]
    fn test_names_are_escaped() {
        let body = MultipartBody::with_boundary("b", vec![Part::text("a\"b\r\n", "v")]);
        let rendered = String::from_utf8(body.to_bytes().to_vec()).unwrap();
        assert!(rendered.contains("name=\"a%22b%0D%0A\""));
    }

    #[test]
    fn test_random_boundaries_differ() {
        assert_ne!(MultipartBody::new(vec![]).boundary(), MultipartBody::new(vec![]).boundary());
    }
}
