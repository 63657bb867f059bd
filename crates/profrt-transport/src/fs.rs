use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Result, Transport, TransportError, TransportHandle};

/// Files on the host filesystem, created (or truncated) under `dir`.
#[derive(Debug)]
pub struct FsTransport {
    dir: PathBuf,
    files: Vec<Option<File>>,
}

impl FsTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
        }
    }

    /// Transport rooted at the process working directory.
    pub fn current_dir() -> Self {
        Self::new(".")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Transport for FsTransport {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn open(&mut self, path: &str) -> Result<TransportHandle> {
        let full = self.dir.join(path);
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        let file = options.open(&full).map_err(|err| TransportError::Open {
            path: full.display().to_string(),
            reason: err.to_string(),
        })?;
        debug!(path = %full.display(), "opened profile output");

        self.files.push(Some(file));
        Ok(TransportHandle(self.files.len() - 1))
    }

    fn write(&mut self, handle: TransportHandle, buf: &[u8]) -> usize {
        let Some(Some(file)) = self.files.get_mut(handle.0) else {
            return 0;
        };

        let mut done = 0;
        while done < buf.len() {
            match file.write(&buf[done..]) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!("profile write failed: {err}");
                    break;
                }
            }
        }
        done
    }

    fn close(&mut self, handle: TransportHandle) {
        if let Some(slot) = self.files.get_mut(handle.0) {
            if let Some(mut file) = slot.take() {
                let _ = file.flush();
            }
        }
    }
}
