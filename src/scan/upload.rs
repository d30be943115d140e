use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::warn;
use uuid::Uuid;

/// Uploaded image spooled to disk for the duration of one scan request.
/// Dropping the guard removes the file, so cleanup holds on success,
/// rejection, and error paths alike.
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    pub fn spool(dir: &Path, body: &Bytes) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("scan-{}.img", Uuid::new_v4()));
        std::fs::write(&path, body)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "upload cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spool_writes_and_drop_removes() {
        let dir = tempfile::tempdir().unwrap();
        let body = Bytes::from_static(b"\xff\xd8fakejpeg");
        let path = {
            let upload = TempUpload::spool(dir.path(), &body).unwrap();
            assert_eq!(std::fs::read(upload.path()).unwrap(), body.as_ref());
            upload.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn cleanup_happens_on_early_return() {
        fn scan_like(dir: &Path, fail: bool) -> (PathBuf, anyhow::Result<()>) {
            let upload = TempUpload::spool(dir, &Bytes::from_static(b"img")).unwrap();
            let path = upload.path().to_path_buf();
            if fail {
                return (path, Err(anyhow::anyhow!("provider exploded")));
            }
            (path, Ok(()))
        }

        let dir = tempfile::tempdir().unwrap();
        for fail in [false, true] {
            let (path, result) = scan_like(dir.path(), fail);
            assert_eq!(result.is_err(), fail);
            assert!(!path.exists());
        }
    }
}
