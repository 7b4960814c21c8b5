use std::io::Read;

use anyhow::Result;

use crate::UploadError;
use crate::credentials::{AuthOptions, EnvCreds, resolve_credentials};
use crate::session;

/// `ul exec ssh` 入口：在远端逐条执行命令，透传输出。
/// 任一命令退出码非零即终止并返回该命令的错误。
pub fn handle_exec(ssh_url: &str, commands: &[String], auth: &AuthOptions) -> Result<()> {
    let target = crate::parse::parse_ssh_url(ssh_url)?;
    let credentials =
        resolve_credentials(target.password.clone(), auth, &EnvCreds::from_process())?;

    let sess = session::connect(&target.params, &credentials)?;
    let result = run_commands(&sess, commands);
    session::disconnect(&sess);
    result
}

fn run_commands(sess: &ssh2::Session, commands: &[String]) -> Result<()> {
    for command in commands {
        tracing::debug!("[exec] {}", command);
        exec_streaming(sess, command)?;
    }
    Ok(())
}

/// 与 `session::exec_remote` 不同：这里把远端 stdout/stderr 原样打印出来。
fn exec_streaming(sess: &ssh2::Session, command: &str) -> Result<(), UploadError> {
    let mut channel = sess
        .channel_session()
        .map_err(|e| UploadError::RemoteCommand(format!("{}: 通道创建失败: {}", command, e), -1))?;
    channel
        .exec(command)
        .map_err(|e| UploadError::RemoteCommand(format!("{}: 执行失败: {}", command, e), -1))?;

    let mut stdout = String::new();
    let _ = channel.read_to_string(&mut stdout);
    let mut stderr = String::new();
    let _ = channel.stderr().read_to_string(&mut stderr);
    if !stdout.is_empty() {
        print!("{}", stdout);
    }
    if !stderr.is_empty() {
        eprint!("{}", stderr);
    }

    let _ = channel.wait_close();
    let code = channel.exit_status().unwrap_or(-1);
    if code != 0 {
        return Err(UploadError::RemoteCommand(command.to_string(), code));
    }
    Ok(())
}
