//! POST body encoding.
//!
//! A body is `multipart/form-data` as soon as any value is a file, and
//! `application/x-www-form-urlencoded` otherwise.

mod multipart;
mod urlencoded;

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

pub use multipart::{build_multipart, content_type_for_name, new_boundary};
pub use urlencoded::build_urlencoded;

use crate::error::TriggerError;

/// A file to upload as a form part.
pub trait FileRef: Send + Sync {
    /// File name sent in the part's `filename=` attribute.
    fn name(&self) -> String;
    /// Fresh reader over the file's contents.
    fn open(&self) -> io::Result<Box<dyn Read + Send>>;
}

/// A file on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FileRef for LocalFile {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn open(&self) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(&self.path)?))
    }
}

/// One POST parameter value.
#[derive(Clone)]
pub enum PostValue {
    Text(String),
    File(Arc<dyn FileRef>),
}

impl PostValue {
    pub fn file(file: impl FileRef + 'static) -> Self {
        PostValue::File(Arc::new(file))
    }

    pub fn is_file(&self) -> bool {
        matches!(self, PostValue::File(_))
    }
}

impl fmt::Debug for PostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostValue::Text(s) => f.debug_tuple("Text").field(s).finish(),
            PostValue::File(file) => f.debug_tuple("File").field(&file.name()).finish(),
        }
    }
}

impl From<&str> for PostValue {
    fn from(s: &str) -> Self {
        PostValue::Text(s.to_string())
    }
}

impl From<String> for PostValue {
    fn from(s: String) -> Self {
        PostValue::Text(s)
    }
}

/// POST parameters, in a stable order.
pub type PostParams = BTreeMap<String, PostValue>;

/// True if any value must be sent as a file part.
pub fn has_file(params: &PostParams) -> bool {
    params.values().any(PostValue::is_file)
}

/// An encoded body and the `Content-Type` that describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Encode `params` for a POST, choosing multipart when a file is present.
pub fn encode_body(params: &PostParams) -> Result<EncodedBody, TriggerError> {
    if has_file(params) {
        let boundary = new_boundary();
        Ok(EncodedBody {
            content_type: format!("multipart/form-data; boundary={boundary}"),
            bytes: build_multipart(params, &boundary)?,
        })
    } else {
        Ok(EncodedBody {
            content_type: "application/x-www-form-urlencoded".to_string(),
            bytes: build_urlencoded(params).into_bytes(),
        })
    }
}
