/// Repository-wide structured errors for upload/exec operations.
///
/// Every variant is terminal for the current invocation; nothing is retried
/// internally. Local validation variants (URL/path/credentials) are raised
/// before any socket is opened.
#[derive(Debug, Clone)]
pub enum UploadError {
    /// URL 不符合 sftp://[user[:password]@]host[:port]/path 语法
    UrlFormat(String),
    /// URL 缺少远端路径段
    PathFormat(String),
    /// 五种认证来源全部缺失
    CredentialsMissing,
    /// 私钥文件不存在或不可读，携带解析后的路径
    KeyFile(std::path::PathBuf),
    /// socket/握手/认证失败
    Connection(String, String),
    /// 远端命令退出码非零，携带完整命令行
    RemoteCommand(String, i32),
    /// 远端已有同名目录（本地是文件），不会自动删除远端目录
    RemoteConflict(String, String),
    /// 远端路径既不是文件也不是目录（例如符号链接）
    UnsupportedRemoteType(String),
    /// 本地源根路径是符号链接
    SymlinkSource(std::path::PathBuf),
    /// 某一路径段同时是文件名与目录前缀
    ConflictingPath(String),
    /// 单文件传输失败（读/写/权限等）
    Transfer(String, String),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use UploadError::*;
        match self {
            UrlFormat(raw) => {
                write!(f, "无效的 URL: {}，期望 sftp://[user[:password]@]host[:port]/path 或 ssh://...", raw)
            }
            PathFormat(raw) => write!(f, "URL 缺少远端路径: {}", raw),
            CredentialsMissing => write!(
                f,
                "缺少认证信息，请提供 --key/--key-path/URL 密码，或设置环境变量 \
                 UPLINK_SSH_KEY、UPLINK_SSH_KEY_PATH、UPLINK_SSH_PASSWORD 之一"
            ),
            KeyFile(p) => write!(f, "私钥文件不存在或不可读: {}", display_path(p)),
            Connection(addr, msg) => write!(f, "连接失败: {}: {}", addr, msg),
            RemoteCommand(cmdline, code) => {
                write!(f, "远端命令退出码 {}: {}", code, cmdline)
            }
            RemoteConflict(local, remote) => write!(
                f,
                "远端目录 {} 与本地文件 {} 同名，不会用文件覆盖目录，请先手动移除远端目录",
                remote, local
            ),
            UnsupportedRemoteType(p) => {
                write!(f, "远端路径类型不支持（既非文件也非目录）: {}", p)
            }
            SymlinkSource(p) => write!(f, "源路径是符号链接，不支持上传: {}", display_path(p)),
            ConflictingPath(seg) => {
                write!(f, "路径冲突: '{}' 既是文件又是其它条目的目录前缀", seg)
            }
            Transfer(path, msg) => write!(f, "传输失败: {}: {}", path, msg),
        }
    }
}

impl std::error::Error for UploadError {}

impl UploadError {
    /// Stable variant tag used by the structured failure log.
    pub fn variant(&self) -> &'static str {
        use UploadError::*;
        match self {
            UrlFormat(_) => "UrlFormat",
            PathFormat(_) => "PathFormat",
            CredentialsMissing => "CredentialsMissing",
            KeyFile(_) => "KeyFile",
            Connection(_, _) => "Connection",
            RemoteCommand(_, _) => "RemoteCommand",
            RemoteConflict(_, _) => "RemoteConflict",
            UnsupportedRemoteType(_) => "UnsupportedRemoteType",
            SymlinkSource(_) => "SymlinkSource",
            ConflictingPath(_) => "ConflictingPath",
            Transfer(_, _) => "Transfer",
        }
    }

    /// Process exit code the CLI maps this error to. Mirrors the historical
    /// contract of the deployment scripts: every SSH-path failure exits 127.
    pub fn exit_code(&self) -> i32 {
        127
    }
}

fn display_path(p: &std::path::Path) -> String {
    let s = p.to_string_lossy().to_string();
    if s.contains('\\') { s.replace('\\', "/") } else { s }
}
