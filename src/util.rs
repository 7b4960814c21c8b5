use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;

use crate::UploadError;

/// Try to enable ANSI escape sequence support on Windows consoles.
/// Returns true if enabling succeeded (or platform likely already supports ANSI), false otherwise.
#[cfg(windows)]
pub fn try_enable_ansi_on_windows() -> bool {
    enable_ansi_support::enable_ansi_support().is_ok()
}

#[cfg(not(windows))]
pub fn try_enable_ansi_on_windows() -> bool {
    false
}

/// Convert a byte count into a human readable string using IEC units (KiB/MiB/GiB).
pub fn human_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GiB", b / GB)
    } else if b >= MB {
        format!("{:.2} MiB", b / MB)
    } else if b >= KB {
        format!("{:.2} KiB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

pub fn total_progress_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
    )
    .expect("valid total progress template")
    .progress_chars("=> ")
}

/// Initialize a MultiProgress with a header spinner line plus the total
/// progress bar. The header shows a one-line startup summary.
pub fn init_progress(verbose: bool, total: u64) -> (Arc<MultiProgress>, ProgressBar, ProgressBar) {
    let mp = Arc::new(if verbose {
        MultiProgress::with_draw_target(ProgressDrawTarget::stdout())
    } else {
        MultiProgress::new()
    });
    let header = mp.add(ProgressBar::new_spinner());
    header.set_style(ProgressStyle::with_template("{msg}").expect("valid header template"));
    let total_pb = mp.add(ProgressBar::new(total));
    total_pb.set_style(total_progress_style());
    let _ = try_enable_ansi_on_windows();
    (mp, total_pb, header)
}

/// Populate the startup header message: Action, Worker and Buf fields,
/// aligned and separated by 4 spaces.
pub fn set_startup_header(header: &ProgressBar, action: &str, worker_count: usize, buf_size: usize) {
    let buf_hr = human_bytes(buf_size as u64);
    let action_field = format!("{:<10}", format!("Action:{}", action));
    let conc_field = format!("{:<12}", format!("Worker:{}", worker_count));
    let buffer_field = format!("{:<12}", format!("Buf:{}", buf_hr));
    let mut msg = format!("{}    {}    {}", action_field, conc_field, buffer_field);
    if try_enable_ansi_on_windows() {
        msg = format!(
            "{}    {}    {}",
            action_field.green(),
            conc_field.cyan(),
            buffer_field.magenta()
        );
    }
    header.set_message(msg);
}

/// Print the one-line human summary after a run.
pub fn print_summary(total_bytes: u64, elapsed_secs: f64, files: u64, failures: usize) {
    if elapsed_secs > 0.0 {
        let mb = total_bytes as f64 / 1024.0 / 1024.0;
        println!(
            "平均速率: {:.2} MB/s (传输 {} 字节, 耗时 {:.2} 秒, {} 文件) | 失败: {}",
            mb / elapsed_secs,
            total_bytes,
            elapsed_secs,
            files,
            failures
        );
    } else {
        println!("平均速率: 0.00 MB/s (0 文件)");
    }
}

/// Append structured failures as JSON Lines into the canonical logs dir.
/// Returns the path written to, None when no logs dir is available.
pub fn write_failures_jsonl(failures: &[UploadError]) -> Option<PathBuf> {
    if failures.is_empty() {
        return None;
    }
    let dir = crate::config::logs_dir()?;
    let path = dir.join("failures.jsonl");
    let mut f = std::fs::OpenOptions::new().create(true).append(true).open(&path).ok()?;
    let stamp = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    for err in failures {
        let obj = serde_json::json!({
            "ts": stamp,
            "variant": err.variant(),
            "message": err.to_string(),
        });
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(f, "{}", line);
        }
    }
    Some(path)
}

/// `--verbose` wiring: debug-level tracing into a file under the logs dir.
/// The returned guard must stay alive for the duration of the process so
/// buffered lines get flushed.
pub fn init_verbose_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let dir = crate::config::logs_dir()?;
    let file_name = format!("ul-{}.log", Utc::now().format("%Y%m%d"));
    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Some(guard)
}
