use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::UploadError;
use crate::credentials::Credentials;
use crate::parse::ConnectParams;

/// 建连超时；读写超时放宽给慢速链路
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const IO_TIMEOUT: Duration = Duration::from_secs(30);

pub fn remote_addr(params: &ConnectParams) -> String {
    if params.host.contains(':') {
        // IPv6 字面量需要括号才能作为 socket 地址解析
        format!("[{}]:{}", params.host, params.port)
    } else {
        format!("{}:{}", params.host, params.port)
    }
}

fn create_tcp_connection(addr: &str) -> Result<TcpStream, UploadError> {
    let mut addrs = addr
        .to_socket_addrs()
        .map_err(|e| UploadError::Connection(addr.to_string(), e.to_string()))?;
    let sock = addrs
        .next()
        .ok_or_else(|| UploadError::Connection(addr.to_string(), "无法解析地址".to_string()))?;
    let tcp = TcpStream::connect_timeout(&sock, CONNECT_TIMEOUT)
        .map_err(|e| UploadError::Connection(addr.to_string(), e.to_string()))?;
    let _ = tcp.set_read_timeout(Some(IO_TIMEOUT));
    let _ = tcp.set_write_timeout(Some(IO_TIMEOUT));
    Ok(tcp)
}

fn authenticate(
    sess: &ssh2::Session,
    addr: &str,
    username: &str,
    credentials: &Credentials,
) -> Result<(), UploadError> {
    let res = match credentials {
        Credentials::Password(pw) => sess.userauth_password(username, pw),
        Credentials::PrivateKey(key) => sess.userauth_pubkey_memory(username, None, key, None),
    };
    if let Err(e) = res {
        return Err(UploadError::Connection(addr.to_string(), format!("认证失败: {}", e)));
    }
    if !sess.authenticated() {
        return Err(UploadError::Connection(addr.to_string(), "认证失败".to_string()));
    }
    Ok(())
}

/// Open one SSH session against `params` and authenticate it. No retry:
/// a socket or auth failure is terminal for the invocation.
pub fn connect(params: &ConnectParams, credentials: &Credentials) -> Result<ssh2::Session, UploadError> {
    let addr = remote_addr(params);
    let username = params
        .username
        .clone()
        .or_else(|| std::env::var("USER").ok())
        .ok_or_else(|| UploadError::Connection(addr.clone(), "缺少用户名".to_string()))?;

    let tcp = create_tcp_connection(&addr)?;
    let mut sess = ssh2::Session::new()
        .map_err(|e| UploadError::Connection(addr.clone(), format!("无法创建会话: {}", e)))?;
    sess.set_tcp_stream(tcp);
    sess.handshake()
        .map_err(|e| UploadError::Connection(addr.clone(), format!("握手失败: {}", e)))?;
    authenticate(&sess, &addr, &username, credentials)?;
    tracing::debug!("已建立 SSH 会话: {}@{}", username, addr);
    Ok(sess)
}

/// Run one command line on the remote host, draining its output, and
/// return the exit code. Non-zero exit is a `RemoteCommand` error naming
/// the full command line.
pub fn exec_remote(sess: &ssh2::Session, command_line: &str) -> Result<i32, UploadError> {
    let mut channel = sess.channel_session().map_err(|e| {
        UploadError::RemoteCommand(format!("{} (无法打开通道: {})", command_line, e), -1)
    })?;
    channel
        .exec(command_line)
        .map_err(|e| UploadError::RemoteCommand(format!("{} ({})", command_line, e), -1))?;
    let mut out = String::new();
    let _ = channel.read_to_string(&mut out);
    let _ = channel.wait_close();
    let code = channel.exit_status().unwrap_or(-1);
    if code != 0 {
        return Err(UploadError::RemoteCommand(command_line.to_string(), code));
    }
    Ok(code)
}

/// Best-effort explicit teardown; safe to call on every exit path, the
/// underlying transport also closes on drop.
pub fn disconnect(sess: &ssh2::Session) {
    let _ = sess.disconnect(None, "bye", None);
}
