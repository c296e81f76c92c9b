use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter, Serializer};
use serde_json::Value;

/// Segmented on-disk map from path-like keys to JSON values.
///
/// Keys are sequences of segments; a `/` inside a segment is rewritten to
/// `__` so GitHub slugs and the like cannot escape the cache root. Files are
/// pretty-printed with sorted keys and ASCII escaping so cached metadata
/// diffs cleanly. Not concurrency-safe: one resolver process per root.
pub struct MetadataCache {
    root: PathBuf,
}

fn sanitize(segment: &str) -> String {
    segment.replace('/', "__")
}

impl MetadataCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create cache root {}", self.root.display()))
    }

    fn path_for(&self, segments: &[&str]) -> PathBuf {
        let mut path = self.root.clone();
        for segment in segments {
            path.push(sanitize(segment));
        }
        path
    }

    /// Load a cached value. Missing and unreadable entries both come back as
    /// `None`; a corrupt file is treated as absent so it gets refetched.
    pub fn load(&self, segments: &[&str]) -> Option<Value> {
        let path = self.path_for(segments);
        let content = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Persist a value under the given segments. The file is written next to
    /// its final location and renamed into place so readers never observe a
    /// partial write.
    pub fn store(&self, value: &Value, segments: &[&str]) -> Result<()> {
        let path = self.path_for(segments);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut buffer = Vec::new();
        let mut serializer = Serializer::with_formatter(&mut buffer, AsciiPrettyFormatter::new());
        value
            .serialize(&mut serializer)
            .context("failed to serialize cache entry")?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .context("cache key resolves to an empty path")?;
        let staging = path.with_file_name(format!("{file_name}.tmp"));
        fs::write(&staging, &buffer)
            .with_context(|| format!("failed to write {}", staging.display()))?;
        fs::rename(&staging, &path)
            .with_context(|| format!("failed to move cache entry into {}", path.display()))?;
        Ok(())
    }

    pub fn exists(&self, segments: &[&str]) -> bool {
        self.path_for(segments).exists()
    }

    pub fn drop(&self, segments: &[&str]) -> Result<()> {
        let path = self.path_for(segments);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

/// Two-space pretty printer that escapes everything outside ASCII, matching
/// the persisted-state contract regardless of what upstream metadata holds.
struct AsciiPrettyFormatter {
    inner: PrettyFormatter<'static>,
}

impl AsciiPrettyFormatter {
    fn new() -> Self {
        Self {
            inner: PrettyFormatter::new(),
        }
    }
}

impl Formatter for AsciiPrettyFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut utf16 = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut utf16) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }

    fn begin_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_array(writer)
    }

    fn end_array<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_array(writer)
    }

    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_array_value(writer, first)
    }

    fn end_array_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_array_value(writer)
    }

    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_object(writer)
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_object(writer)
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_object_key(writer, first)
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.begin_object_value(writer)
    }

    fn end_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        self.inner.end_object_value(writer)
    }
}
