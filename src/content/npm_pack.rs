//! npm pack archive provider
//!
//! Enumerates the members of an npm-style gzipped tarball (as produced by
//! `npm pack`), strips the leading `package/` component, and carries each
//! member's mode. Member bytes are read during the scan since pack
//! archives only stream forward.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use tar::Archive;

use crate::config::defaults::NPM_PACK_PREFIX;
use crate::content::{spawn_scan, ContentEntry, ContentProvider, EntrySink, EntryStream};
use crate::core::context::ExpansionContext;
use crate::error::ProviderError;

/// Content extracted from an npm pack tarball
#[derive(Debug, Clone)]
pub struct NpmPackProvider {
    archive: PathBuf,
    destination: Option<String>,
}

impl NpmPackProvider {
    /// Provider over the given `.tgz` archive path, relative to the
    /// context directory unless absolute
    pub fn new(archive: impl Into<PathBuf>) -> Self {
        Self {
            archive: archive.into(),
            destination: None,
        }
    }

    /// Set the destination sub-path prefix for all members
    #[must_use]
    pub fn with_destination(mut self, destination: Option<String>) -> Self {
        self.destination = destination;
        self
    }
}

impl ContentProvider for NpmPackProvider {
    fn entries(&self, ctx: &ExpansionContext) -> EntryStream {
        let path = if self.archive.is_absolute() {
            self.archive.clone()
        } else {
            ctx.dir()
                .join(ctx.expand(&self.archive.to_string_lossy()))
        };
        let destination = self.destination.clone();
        spawn_scan(move |sink| scan_archive(&path, destination.as_deref(), &sink))
    }
}

fn scan_archive(path: &PathBuf, destination: Option<&str>, sink: &EntrySink) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            sink.send(Err(ProviderError::ArchiveUnreadable {
                path: path.clone(),
                error: e.to_string(),
            }));
            return;
        }
    };

    let mut archive = Archive::new(GzDecoder::new(file));
    let members = match archive.entries() {
        Ok(m) => m,
        Err(e) => {
            sink.send(Err(ProviderError::ArchiveUnreadable {
                path: path.clone(),
                error: e.to_string(),
            }));
            return;
        }
    };

    for member in members {
        let mut member = match member {
            Ok(m) => m,
            Err(e) => {
                sink.send(Err(ProviderError::ArchiveUnreadable {
                    path: path.clone(),
                    error: e.to_string(),
                }));
                return;
            }
        };
        if !member.header().entry_type().is_file() {
            continue;
        }

        let name = match member.path() {
            Ok(p) => p.to_string_lossy().into_owned(),
            Err(e) => {
                sink.send(Err(ProviderError::ArchiveUnreadable {
                    path: path.clone(),
                    error: e.to_string(),
                }));
                return;
            }
        };
        let name = name
            .strip_prefix(NPM_PACK_PREFIX)
            .unwrap_or(&name)
            .to_string();

        let mut bytes = Vec::new();
        if let Err(e) = member.read_to_end(&mut bytes) {
            sink.send(Err(ProviderError::Io {
                path: path.clone(),
                error: e.to_string(),
            }));
            return;
        }

        let mode = member.header().mode().ok();
        let entry = ContentEntry::from_bytes(name, bytes)
            .with_destination(destination.map(str::to_string))
            .with_mode(mode);
        if !sink.send(Ok(entry)) {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::io::Write;

    fn write_pack(dir: &std::path::Path) -> PathBuf {
        let path = dir.join("abc-1.0.0.tgz");
        let file = File::create(&path).unwrap();
        let gz = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(gz);

        let mut header = tar::Header::new_gnu();
        header.set_size(2);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "package/index.js", &b"ok"[..])
            .unwrap();

        let mut header = tar::Header::new_gnu();
        header.set_size(9);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "package/bin/run.sh", &b"#!/bin/sh"[..])
            .unwrap();

        builder.into_inner().unwrap().finish().unwrap().flush().unwrap();
        path
    }

    #[tokio::test]
    async fn test_members_stripped_of_package_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let pack = write_pack(dir.path());
        let ctx = ExpansionContext::new(dir.path());
        let provider = NpmPackProvider::new(pack).with_destination(Some("usr/lib/abc".into()));

        let entries: Vec<ContentEntry> = provider
            .entries(&ctx)
            .map(|r| r.unwrap())
            .collect()
            .await;
        let mut names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["bin/run.sh", "index.js"]);

        let script = entries.iter().find(|e| e.name == "bin/run.sh").unwrap();
        assert_eq!(script.mode, Some(0o755));
        assert_eq!(script.destination.as_deref(), Some("usr/lib/abc"));
        assert_eq!(script.text().await.unwrap(), "#!/bin/sh");
    }

    #[tokio::test]
    async fn test_missing_archive_is_a_provider_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ExpansionContext::new(dir.path());
        let provider = NpmPackProvider::new("missing.tgz");
        let results: Vec<_> = provider.entries(&ctx).collect().await;
        assert!(matches!(
            results.first(),
            Some(Err(ProviderError::ArchiveUnreadable { .. }))
        ));
    }
}
