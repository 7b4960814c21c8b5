// transfer module: upload orchestration over one planned SSH run
mod remote;
mod worker;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use crossbeam_channel::{bounded, unbounded};
use serde::Serialize;

use self::remote::Ssh2Remote;
use self::worker::{FileJob, UploadWorkersCtx, WorkerMetrics, put_file, run_upload_workers};
use crate::UploadError;
use crate::credentials::{AuthOptions, EnvCreds, resolve_credentials};
use crate::fileset;
use crate::parse::SftpTarget;
use crate::plan;
use crate::session;
use crate::util::{init_progress, set_startup_header};

/// 默认工作线程数；可用 -c 覆盖，上限 8
pub const DEFAULT_WORKERS: usize = 4;
const MAX_WORKERS: usize = 8;
const BUF_SIZE: usize = 1024 * 1024;

/// Arguments for `handle_upload` grouped to avoid too-many-arguments lint.
#[derive(Clone)]
pub struct UploadArgs {
    pub source: PathBuf,
    pub sftp_url: String,
    pub auth: AuthOptions,
    pub concurrency: Option<usize>,
    pub verbose: bool,
    pub json: bool,
    pub quiet: bool,
}

/// Machine-readable run summary, printed as one JSON line in `--json` mode.
#[derive(Serialize)]
struct TransferSummary {
    total_bytes: u64,
    elapsed_secs: f64,
    files: u64,
    failures: usize,
    failures_path: Option<String>,
}

/// 上传子命令主入口。
///
/// 概览:
/// - URL/凭据解析与本地校验全部发生在建连之前，失败不会留下半开会话。
/// - 远端目录按计划一次性 `mkdir -p` 创建完毕后，文件传输才开始。
/// - 单文件源直接传输到 `目标/<文件名>`，不经过工作线程池。
/// - 目录源由有界工作线程池并发上传；任一失败不会中止兄弟任务，
///   汇总后以首个失败作为本次运行的错误返回。
/// - 控制会话在所有退出路径上显式断开。
pub fn handle_upload(args: UploadArgs) -> Result<()> {
    let target = crate::parse::parse_sftp_url(&args.sftp_url)?;
    let credentials =
        resolve_credentials(target.password.clone(), &args.auth, &EnvCreds::from_process())?;

    // 本地校验先行，未通过则不产生任何网络活动
    fileset::check_source(&args.source)?;
    let files = fileset::list_files(&args.source)?;
    let tree = plan::build_tree(&files)?;
    let mkdir_plan = plan::plan_mkdirs(&tree, &target.remote_path);

    let sess = session::connect(&target.params, &credentials)?;
    let result = run_upload(&sess, &target, &credentials, files, mkdir_plan, &args);
    session::disconnect(&sess);
    result
}

fn run_upload(
    sess: &ssh2::Session,
    target: &SftpTarget,
    credentials: &crate::credentials::Credentials,
    files: fileset::FileSet,
    mkdir_plan: Vec<String>,
    args: &UploadArgs,
) -> Result<()> {
    // 远端目录保证在任何文件传输前就绪（退出码已检查）
    let command_line = plan::mkdir_command_line(&mkdir_plan);
    session::exec_remote(sess, &command_line)?;
    tracing::debug!("远端目录就绪: {}", command_line);

    let total_size = fileset::total_size(&files);
    let total_entries = files.len();
    let start = Instant::now();

    // 单文件源：直接传输到 目标/<文件名>，复用控制会话
    let source_is_file = std::fs::metadata(&args.source).map(|m| m.is_file()).unwrap_or(false);
    if total_entries == 1 && source_is_file {
        if let Some((rel, local)) = files.into_iter().next() {
            let (mp, total_pb, header) = init_progress(args.verbose, total_size);
            set_startup_header(&header, "Upload", 1, BUF_SIZE);
            let job = FileJob {
                rel: rel.clone(),
                local,
                remote: format!("{}/{}", target.remote_path.trim_end_matches('/'), rel),
            };
            let sftp = sess.sftp().map_err(|e| {
                UploadError::Connection(
                    session::remote_addr(&target.params),
                    format!("SFTP 通道创建失败: {}", e),
                )
            })?;
            let remote = Ssh2Remote(sftp);
            let mut buf = vec![0u8; BUF_SIZE];
            let (bytes, failures) = match put_file(&remote, &job, &mut buf, &total_pb) {
                Ok(b) => (b, Vec::new()),
                Err(e) => (0, vec![e]),
            };
            let files_done = if failures.is_empty() { 1 } else { 0 };
            return finalize(&mp, &header, &total_pb, start, bytes, files_done, failures, args);
        }
        return Ok(());
    }

    let workers = args
        .concurrency
        .unwrap_or(DEFAULT_WORKERS)
        .clamp(1, MAX_WORKERS)
        .min(std::cmp::max(1, total_entries));
    let (mp, total_pb, header) = init_progress(args.verbose, total_size);
    set_startup_header(&header, "Upload", workers, BUF_SIZE);

    // 先启动 worker 再生产，避免生产者在有界队列上阻塞
    let cap = std::cmp::max(4, workers * 4);
    let (tx, rx) = bounded::<FileJob>(cap);
    let (failure_tx, failure_rx) = unbounded::<UploadError>();
    let (metrics_tx, metrics_rx) = bounded::<WorkerMetrics>(workers);
    let ctx = UploadWorkersCtx {
        workers,
        params: target.params.clone(),
        credentials: credentials.clone(),
        buf_size: BUF_SIZE,
        rx,
        failure_tx: failure_tx.clone(),
        metrics_tx: metrics_tx.clone(),
        total_pb: total_pb.clone(),
    };
    let worker_thread = std::thread::spawn(move || {
        run_upload_workers(ctx);
    });

    let dest = target.remote_path.trim_end_matches('/');
    let dest = if dest.is_empty() { "." } else { dest };
    for (rel, local) in files {
        let job = FileJob { remote: format!("{}/{}", dest, rel), rel, local };
        // 有界队列上的阻塞发送即背压
        let _ = tx.send(job);
    }
    drop(tx);
    let _ = worker_thread.join();
    drop(failure_tx);
    drop(metrics_tx);

    let mut agg = WorkerMetrics::default();
    for m in metrics_rx.into_iter() {
        agg.bytes += m.bytes;
        agg.files += m.files;
    }
    let failures: Vec<UploadError> = failure_rx.into_iter().collect();
    finalize(&mp, &header, &total_pb, start, agg.bytes, agg.files, failures, args)
}

/// Clear the progress UI, emit the human and optional JSON summaries,
/// persist the failure list and convert it into the run's result: the
/// first failure observed wins, the full list goes to the JSONL log.
#[allow(clippy::too_many_arguments)]
fn finalize(
    mp: &indicatif::MultiProgress,
    header: &indicatif::ProgressBar,
    total_pb: &indicatif::ProgressBar,
    start: Instant,
    total_bytes: u64,
    files: u64,
    failures: Vec<UploadError>,
    args: &UploadArgs,
) -> Result<()> {
    let _ = mp.clear();
    header.finish_and_clear();
    total_pb.finish_and_clear();
    let elapsed = start.elapsed().as_secs_f64();

    if !args.quiet {
        crate::util::print_summary(total_bytes, elapsed, files, failures.len());
    }
    let failures_path = crate::util::write_failures_jsonl(&failures);
    if !args.quiet
        && let Some(ref p) = failures_path
    {
        println!("失败清单已写入: {}", p.display());
    }
    if args.json {
        let summary = TransferSummary {
            total_bytes,
            elapsed_secs: elapsed,
            files,
            failures: failures.len(),
            failures_path: failures_path.as_ref().map(|p| p.to_string_lossy().to_string()),
        };
        if let Ok(line) = serde_json::to_string(&summary) {
            println!("{}", line);
        }
    }

    match failures.into_iter().next() {
        Some(first) => Err(first.into()),
        None => Ok(()),
    }
}
