use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub const DEFAULT_SLOT_KEY: &str = "chatAppData";

/// A single string-valued entry in some durable key-value store.
///
/// The store reads it once at startup and overwrites it wholesale after every mutation.
pub trait SnapshotSlot {
    fn key(&self) -> &str;

    /// Returns `Ok(None)` if nothing has been written yet.
    fn read(&self) -> io::Result<Option<String>>;

    /// Replaces the stored value. Either the whole value is written or none of it is.
    fn write(&mut self, contents: &str) -> io::Result<()>;
}

/// Slot backed by `<dir>/<key>.json`.
#[derive(Clone, Debug)]
pub struct FileSlot {
    key: String,
    path: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl AsRef<Path>, key: impl Into<String>) -> Self {
        let key = key.into();
        let path = dir.as_ref().join(format!("{key}.json"));
        Self { key, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSlot for FileSlot {
    fn key(&self) -> &str {
        &self.key
    }

    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write(&mut self, contents: &str) -> io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        // write-then-rename so a crash mid-write never leaves a truncated snapshot
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)
    }
}

/// Slot that lives only as long as the process.
#[derive(Clone, Debug, Default)]
pub struct MemorySlot {
    key: String,
    contents: Option<String>,
}

impl MemorySlot {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            contents: None,
        }
    }

    pub fn with_contents(key: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            contents: Some(contents.into()),
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl SnapshotSlot for MemorySlot {
    fn key(&self) -> &str {
        &self.key
    }

    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.contents.clone())
    }

    fn write(&mut self, contents: &str) -> io::Result<()> {
        self.contents = Some(contents.to_owned());
        Ok(())
    }
}
