//! Content pipeline
//!
//! Providers enumerate [`ContentEntry`] values, the merger fans them into
//! one stream, the transformer chain rewrites them, and the materializer
//! writes them into the staging tree.

pub mod filesystem;
pub mod materialize;
pub mod merge;
pub mod node_modules;
pub mod npm_pack;
pub mod transform;

use futures::stream::BoxStream;
use std::path::PathBuf;
use tokio::sync::mpsc;

use crate::core::context::ExpansionContext;
use crate::error::ProviderError;

/// Stream of entries produced by a provider or the merger
pub type EntryStream = BoxStream<'static, Result<ContentEntry, ProviderError>>;

/// Deferred byte source of an entry.
///
/// `File` paths are opened only at materialization time; `Bytes` holds
/// synthesized content such as a rewritten control file.
#[derive(Debug, Clone)]
pub enum EntrySource {
    /// Read lazily from a file on disk
    File(PathBuf),
    /// In-memory content
    Bytes(Vec<u8>),
    /// No content; materializes as an empty file
    Empty,
}

/// One named unit of content flowing through the pipeline.
///
/// `name` is the slash-separated relative path and the identity key within
/// one materialization. The byte source is consumed at most once; after an
/// entry has been materialized or rewritten it is discarded.
#[derive(Debug, Clone)]
pub struct ContentEntry {
    /// Slash-separated relative path
    pub name: String,
    /// Destination sub-path prefix inside the staging tree
    pub destination: Option<String>,
    /// POSIX permission bits, if the source carries any
    pub mode: Option<u32>,
    source: EntrySource,
}

impl ContentEntry {
    /// Entry backed by a file on disk
    pub fn from_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            destination: None,
            mode: None,
            source: EntrySource::File(path.into()),
        }
    }

    /// Entry backed by in-memory bytes
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            destination: None,
            mode: None,
            source: EntrySource::Bytes(bytes.into()),
        }
    }

    /// Entry with no content, e.g. a control file synthesized from nothing
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            destination: None,
            mode: None,
            source: EntrySource::Empty,
        }
    }

    /// Set the destination sub-path prefix
    #[must_use]
    pub fn with_destination(mut self, destination: Option<String>) -> Self {
        self.destination = destination;
        self
    }

    /// Set the permission bits
    #[must_use]
    pub fn with_mode(mut self, mode: Option<u32>) -> Self {
        self.mode = mode;
        self
    }

    /// The entry's byte source
    pub fn source(&self) -> &EntrySource {
        &self.source
    }

    /// Read the entry content as UTF-8 text.
    ///
    /// Consumes the entry's single read: callers rewrite the content into a
    /// fresh entry afterwards.
    pub async fn text(&self) -> Result<String, std::io::Error> {
        match &self.source {
            EntrySource::File(path) => tokio::fs::read_to_string(path).await,
            EntrySource::Bytes(bytes) => String::from_utf8(bytes.clone()).map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
            }),
            EntrySource::Empty => Ok(String::new()),
        }
    }
}

/// Produces a lazy, finite sequence of entries from one source kind.
///
/// Each `entries` call starts a fresh underlying scan; patterns are
/// expanded against the context at iteration time, never earlier.
pub trait ContentProvider: Send + Sync {
    /// Enumerate this provider's entries
    fn entries(&self, ctx: &ExpansionContext) -> EntryStream;
}

/// Sender half handed to a blocking scan task
pub(crate) struct EntrySink {
    tx: mpsc::Sender<Result<ContentEntry, ProviderError>>,
}

impl EntrySink {
    /// Send one item; returns false once the consumer is gone
    pub(crate) fn send(&self, item: Result<ContentEntry, ProviderError>) -> bool {
        self.tx.blocking_send(item).is_ok()
    }
}

/// Run a blocking scan on the blocking pool and expose its output as an
/// entry stream. The channel is bounded, so a slow consumer applies
/// backpressure instead of buffering a whole scan.
pub(crate) fn spawn_scan<F>(scan: F) -> EntryStream
where
    F: FnOnce(EntrySink) + Send + 'static,
{
    let (tx, rx) = mpsc::channel(64);
    tokio::task::spawn_blocking(move || scan(EntrySink { tx }));
    Box::pin(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_text_from_bytes() {
        let entry = ContentEntry::from_bytes("a.txt", b"hello".to_vec());
        assert_eq!(entry.text().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_text_from_empty() {
        assert_eq!(ContentEntry::empty("x").text().await.unwrap(), "");
    }

    #[test]
    fn test_builder_style_setters() {
        let entry = ContentEntry::empty("run.sh")
            .with_destination(Some("usr/bin".into()))
            .with_mode(Some(0o755));
        assert_eq!(entry.destination.as_deref(), Some("usr/bin"));
        assert_eq!(entry.mode, Some(0o755));
    }
}
