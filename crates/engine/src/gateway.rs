use model::ExamResult;
use std::{future::Future, sync::Arc};

pub const APPLICATION_PDF: &str = "application/pdf";
pub const APPLICATION_JSON: &str = "application/json";

/// A document handed to the extraction gateway. Type and size limits are the caller's job.
#[derive(Clone, Debug)]
pub struct Document {
    /// File name, for logs only.
    pub name: Box<str>,
    pub mime: Box<str>,
    pub bytes: Box<[u8]>,
}

impl Document {
    pub fn new(name: impl Into<Box<str>>, mime: impl Into<Box<str>>, bytes: impl Into<Box<[u8]>>) -> Self {
        Self { name: name.into(), mime: mime.into(), bytes: bytes.into() }
    }

    pub fn pdf(name: impl Into<Box<str>>, bytes: impl Into<Box<[u8]>>) -> Self {
        Self::new(name, APPLICATION_PDF, bytes)
    }

    pub fn is_pdf(&self) -> bool {
        &*self.mime == APPLICATION_PDF
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Turns a document into the JSON text of a [`model::RawExam`].
pub trait ExtractionGateway: Send + Sync + 'static {
    fn extract(&self, document: Document) -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// Receives every finished exam. Failures are logged and otherwise ignored.
pub trait ResultSink: Send + Sync + 'static {
    fn store(&self, result: &ExamResult) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl<T: ResultSink> ResultSink for Arc<T> {
    fn store(&self, result: &ExamResult) -> impl Future<Output = anyhow::Result<()>> + Send {
        T::store(self, result)
    }
}
