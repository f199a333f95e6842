//! Update sinks: a staging-file sink and an in-memory recorder.
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::rc::Rc;

use powder_traits::{UpdateKind, UpdateSink};

use crate::error::HwError;

type BoxErr = Box<dyn std::error::Error + Send + Sync>;

const fn staging_name(kind: UpdateKind) -> &'static str {
    match kind {
        UpdateKind::Firmware => "firmware.bin",
        UpdateKind::Filesystem => "filesystem.bin",
    }
}

/// Streams an update image into `<dir>/<kind>.bin.part` and renames it on finish.
#[derive(Debug)]
pub struct StagingUpdateSink {
    dir: PathBuf,
    open: Option<(File, PathBuf, usize)>,
    written: usize,
}

impl StagingUpdateSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            open: None,
            written: 0,
        }
    }
}

impl UpdateSink for StagingUpdateSink {
    fn begin(&mut self, kind: UpdateKind, size: usize) -> Result<(), BoxErr> {
        if self.open.is_some() {
            return Err(HwError::Update("update already open".into()).into());
        }
        fs::create_dir_all(&self.dir).map_err(HwError::Io)?;
        let final_path = self.dir.join(staging_name(kind));
        let part = final_path.with_extension("bin.part");
        let file = File::create(&part).map_err(HwError::Io)?;
        self.open = Some((file, final_path, size));
        self.written = 0;
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<usize, BoxErr> {
        let Some((file, _, _)) = self.open.as_mut() else {
            return Err(HwError::Update("no update in progress".into()).into());
        };
        file.write_all(chunk).map_err(HwError::Io)?;
        self.written += chunk.len();
        Ok(chunk.len())
    }

    fn finish(&mut self) -> Result<(), BoxErr> {
        let Some((mut file, final_path, size)) = self.open.take() else {
            return Err(HwError::Update("no update in progress".into()).into());
        };
        file.flush().map_err(HwError::Io)?;
        drop(file);
        let part = final_path.with_extension("bin.part");
        if self.written != size {
            let _ = fs::remove_file(&part);
            return Err(HwError::Update(format!(
                "image truncated: {} of {} bytes",
                self.written, size
            ))
            .into());
        }
        fs::rename(&part, &final_path).map_err(HwError::Io)?;
        tracing::info!(path = %final_path.display(), bytes = size, "update image staged");
        Ok(())
    }

    fn abort(&mut self) {
        if let Some((file, final_path, _)) = self.open.take() {
            drop(file);
            let _ = fs::remove_file(final_path.with_extension("bin.part"));
        }
    }
}

#[derive(Debug, Default)]
struct MemoryUpdate {
    kind: Option<UpdateKind>,
    expected: usize,
    bytes: Vec<u8>,
    finished: bool,
    aborted: bool,
    fail_finish: bool,
    write_limit: Option<usize>,
}

/// Records an update image in memory; clones share the recording.
#[derive(Debug, Clone, Default)]
pub struct MemoryUpdateSink {
    inner: Rc<RefCell<MemoryUpdate>>,
}

impl MemoryUpdateSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `finish` report a verification failure.
    pub fn set_fail_finish(&self, fail: bool) {
        self.inner.borrow_mut().fail_finish = fail;
    }

    /// Accept at most `limit` bytes per `write` call.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.inner.borrow_mut().write_limit = limit;
    }

    pub fn kind(&self) -> Option<UpdateKind> {
        self.inner.borrow().kind
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.inner.borrow().bytes.clone()
    }

    pub fn finished(&self) -> bool {
        self.inner.borrow().finished
    }

    pub fn aborted(&self) -> bool {
        self.inner.borrow().aborted
    }
}

impl UpdateSink for MemoryUpdateSink {
    fn begin(&mut self, kind: UpdateKind, size: usize) -> Result<(), BoxErr> {
        let mut u = self.inner.borrow_mut();
        u.kind = Some(kind);
        u.expected = size;
        u.bytes.clear();
        u.finished = false;
        u.aborted = false;
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<usize, BoxErr> {
        let mut u = self.inner.borrow_mut();
        let n = u.write_limit.map_or(chunk.len(), |l| l.min(chunk.len()));
        u.bytes.extend_from_slice(&chunk[..n]);
        Ok(n)
    }

    fn finish(&mut self) -> Result<(), BoxErr> {
        let mut u = self.inner.borrow_mut();
        if u.fail_finish || u.bytes.len() != u.expected {
            return Err(HwError::Update("image verification failed".into()).into());
        }
        u.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.inner.borrow_mut().aborted = true;
    }
}
