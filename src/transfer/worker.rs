use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use crossbeam_channel::{Receiver, Sender};
use indicatif::ProgressBar;

use super::remote::{RemoteFs, RemoteKind, Ssh2Remote};
use crate::UploadError;
use crate::credentials::Credentials;
use crate::parse::ConnectParams;

/// One pending file put, fully resolved: local absolute path plus the
/// remote destination path.
#[derive(Clone, Debug)]
pub(super) struct FileJob {
    pub(super) rel: String,
    pub(super) local: PathBuf,
    pub(super) remote: String,
}

#[derive(Clone, Default, Debug)]
pub(super) struct WorkerMetrics {
    pub(super) bytes: u64,
    pub(super) files: u64,
}

pub(super) struct UploadWorkersCtx {
    pub(super) workers: usize,
    pub(super) params: ConnectParams,
    pub(super) credentials: Credentials,
    pub(super) buf_size: usize,
    pub(super) rx: Receiver<FileJob>,
    pub(super) failure_tx: Sender<UploadError>,
    pub(super) metrics_tx: Sender<WorkerMetrics>,
    pub(super) total_pb: ProgressBar,
}

/// Execute the per-file transfer algorithm against an already classified
/// remote path:
/// - absent or regular file: streamed overwrite put
/// - directory: conflict, the engine never deletes remote directories
/// - anything else: unsupported
pub(super) fn put_file(
    remote: &dyn RemoteFs,
    job: &FileJob,
    buf: &mut [u8],
    total_pb: &ProgressBar,
) -> Result<u64, UploadError> {
    let rpath = std::path::Path::new(&job.remote);
    match remote.kind(rpath) {
        None | Some(RemoteKind::File) => {}
        Some(RemoteKind::Dir) => {
            return Err(UploadError::RemoteConflict(
                job.local.to_string_lossy().to_string(),
                job.remote.clone(),
            ));
        }
        Some(RemoteKind::Other) => {
            return Err(UploadError::UnsupportedRemoteType(job.remote.clone()));
        }
    }

    let mut local_file = File::open(&job.local).map_err(|e| {
        UploadError::Transfer(job.local.to_string_lossy().to_string(), format!("本地打开失败: {}", e))
    })?;
    let mut remote_file = remote
        .create(rpath)
        .map_err(|e| UploadError::Transfer(job.remote.clone(), format!("远端创建文件失败: {}", e)))?;

    let mut bytes: u64 = 0;
    loop {
        match local_file.read(buf) {
            Ok(0) => break,
            Ok(n) => {
                remote_file.write_all(&buf[..n]).map_err(|e| {
                    UploadError::Transfer(job.remote.clone(), format!("远端写入失败: {}", e))
                })?;
                bytes += n as u64;
                total_pb.inc(n as u64);
            }
            Err(e) => {
                return Err(UploadError::Transfer(
                    job.local.to_string_lossy().to_string(),
                    format!("本地读取失败: {}", e),
                ));
            }
        }
    }
    Ok(bytes)
}

/// Bounded worker pool: each worker owns its session and SFTP channel,
/// drains the shared job queue and reports failures without aborting its
/// siblings. Returns after all workers joined.
pub(super) fn run_upload_workers(ctx: UploadWorkersCtx) {
    let UploadWorkersCtx { workers, params, credentials, buf_size, rx, failure_tx, metrics_tx, total_pb } =
        ctx;
    let mut handles = Vec::new();
    for worker_id in 0..workers {
        let rx = rx.clone();
        let failure_tx = failure_tx.clone();
        let metrics_tx = metrics_tx.clone();
        let total_pb = total_pb.clone();
        let params = params.clone();
        let credentials = credentials.clone();
        let handle = std::thread::spawn(move || {
            let mut buf = vec![0u8; buf_size];
            let mut metrics = WorkerMetrics::default();
            // 会话惰性建立：首个任务到来时才握手
            let mut maybe_sess: Option<ssh2::Session> = None;
            let mut maybe_remote: Option<Ssh2Remote> = None;
            while let Ok(job) = rx.recv() {
                if maybe_remote.is_none() {
                    match crate::session::connect(&params, &credentials) {
                        Ok(sess) => match sess.sftp() {
                            Ok(sftp) => {
                                maybe_remote = Some(Ssh2Remote(sftp));
                                maybe_sess = Some(sess);
                                tracing::debug!("[up] worker_id={} created session", worker_id);
                            }
                            Err(e) => {
                                let _ = failure_tx.send(UploadError::Transfer(
                                    job.rel.clone(),
                                    format!("SFTP 通道创建失败: {}", e),
                                ));
                                continue;
                            }
                        },
                        Err(e) => {
                            tracing::debug!(
                                "[up] worker_id={} session failed: {}",
                                worker_id,
                                e
                            );
                            let _ = failure_tx.send(e);
                            continue;
                        }
                    }
                }
                let Some(remote) = maybe_remote.as_ref() else {
                    continue;
                };
                match put_file(remote, &job, &mut buf, &total_pb) {
                    Ok(bytes) => {
                        metrics.bytes += bytes;
                        metrics.files += 1;
                    }
                    Err(e) => {
                        tracing::debug!("[up] transfer failed for {}: {}", job.rel, e);
                        let _ = failure_tx.send(e);
                        // 放弃当前 SFTP，下一个任务重建，避免半死通道
                        maybe_remote = None;
                        if let Some(sess) = maybe_sess.take() {
                            crate::session::disconnect(&sess);
                        }
                    }
                }
            }
            if let Some(sess) = maybe_sess.take() {
                crate::session::disconnect(&sess);
            }
            let _ = metrics_tx.send(metrics);
        });
        handles.push(handle);
    }
    for h in handles {
        let _ = h.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    // In-memory RemoteFs double: preseeded path kinds plus captured writes.
    struct MockRemote {
        kinds: HashMap<String, RemoteKind>,
        written: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    struct MockWriter {
        path: String,
        sink: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Write for MockWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let mut guard = self.sink.lock().unwrap();
            guard.entry(self.path.clone()).or_default().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl RemoteFs for MockRemote {
        fn kind(&self, path: &Path) -> Option<RemoteKind> {
            self.kinds.get(&path.to_string_lossy().to_string()).copied()
        }
        fn create(&self, path: &Path) -> Result<Box<dyn Write + Send>, String> {
            Ok(Box::new(MockWriter {
                path: path.to_string_lossy().to_string(),
                sink: self.written.clone(),
            }))
        }
    }

    fn temp_file(content: &[u8]) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "uplink_worker_test_{}_{}.bin",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        let mut f = File::create(&p).expect("create temp file");
        f.write_all(content).expect("write temp file");
        p
    }

    fn job(local: PathBuf, remote: &str) -> FileJob {
        FileJob { rel: "f.bin".to_string(), local, remote: remote.to_string() }
    }

    #[test]
    fn absent_remote_path_is_created() {
        let local = temp_file(b"hello uplink");
        let written = Arc::new(Mutex::new(HashMap::new()));
        let remote = MockRemote { kinds: HashMap::new(), written: written.clone() };
        let pb = ProgressBar::hidden();
        let mut buf = vec![0u8; 4];

        let n = put_file(&remote, &job(local.clone(), "/dst/f.bin"), &mut buf, &pb).unwrap();
        assert_eq!(n, 12);
        let guard = written.lock().unwrap();
        assert_eq!(guard.get("/dst/f.bin").map(|v| v.as_slice()), Some(&b"hello uplink"[..]));
        let _ = std::fs::remove_file(&local);
    }

    #[test]
    fn existing_remote_file_is_overwritten() {
        let local = temp_file(b"v2");
        let written = Arc::new(Mutex::new(HashMap::new()));
        let mut kinds = HashMap::new();
        kinds.insert("/dst/f.bin".to_string(), RemoteKind::File);
        let remote = MockRemote { kinds, written: written.clone() };
        let pb = ProgressBar::hidden();
        let mut buf = vec![0u8; 64];

        put_file(&remote, &job(local.clone(), "/dst/f.bin"), &mut buf, &pb).unwrap();
        assert_eq!(written.lock().unwrap().get("/dst/f.bin").unwrap(), b"v2");
        let _ = std::fs::remove_file(&local);
    }

    #[test]
    fn remote_directory_collision_is_conflict() {
        let local = temp_file(b"data");
        let mut kinds = HashMap::new();
        kinds.insert("/dst/f.bin".to_string(), RemoteKind::Dir);
        let remote = MockRemote { kinds, written: Arc::new(Mutex::new(HashMap::new())) };
        let pb = ProgressBar::hidden();
        let mut buf = vec![0u8; 64];

        let err = put_file(&remote, &job(local.clone(), "/dst/f.bin"), &mut buf, &pb).unwrap_err();
        assert!(matches!(err, UploadError::RemoteConflict(_, _)));
        // 目录未被写入任何数据
        assert!(remote.written.lock().unwrap().is_empty());
        let _ = std::fs::remove_file(&local);
    }

    #[test]
    fn remote_symlink_is_unsupported() {
        let local = temp_file(b"data");
        let mut kinds = HashMap::new();
        kinds.insert("/dst/link".to_string(), RemoteKind::Other);
        let remote = MockRemote { kinds, written: Arc::new(Mutex::new(HashMap::new())) };
        let pb = ProgressBar::hidden();
        let mut buf = vec![0u8; 64];

        let err = put_file(&remote, &job(local.clone(), "/dst/link"), &mut buf, &pb).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedRemoteType(_)));
        let _ = std::fs::remove_file(&local);
    }

    #[test]
    fn missing_local_file_is_transfer_error() {
        let remote = MockRemote { kinds: HashMap::new(), written: Arc::new(Mutex::new(HashMap::new())) };
        let pb = ProgressBar::hidden();
        let mut buf = vec![0u8; 64];
        let missing = PathBuf::from("/definitely/not/here.bin");

        let err = put_file(&remote, &job(missing, "/dst/here.bin"), &mut buf, &pb).unwrap_err();
        assert!(matches!(err, UploadError::Transfer(_, _)));
    }
}
