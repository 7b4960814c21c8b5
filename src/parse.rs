use crate::UploadError;

/// Connection coordinates extracted from a URL. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
}

pub const DEFAULT_SSH_PORT: u16 = 22;

/// Parsed `sftp://` upload target: where to connect plus the normalized
/// remote destination path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpTarget {
    pub params: ConnectParams,
    /// Password embedded in the URL, if any. Wins over every other
    /// credential source.
    pub password: Option<String>,
    /// Destination root, already normalized: absolute (`/`-prefixed) or
    /// home-relative (tilde stripped, no leading `/`), trailing slashes
    /// trimmed.
    pub remote_path: String,
}

/// Parsed `ssh://` exec target. Same authority grammar, path is optional
/// and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub params: ConnectParams,
    pub password: Option<String>,
}

/// Parse `sftp://[user[:password]@]host[:port]/path`.
///
/// `host` may be a hostname, an IPv4 literal, or a bracketed IPv6 literal.
/// The path segment is mandatory and is transformed per the tilde/absolute
/// rule (see [`normalize_destination`]).
pub fn parse_sftp_url(raw: &str) -> Result<SftpTarget, UploadError> {
    let rest = raw
        .strip_prefix("sftp://")
        .ok_or_else(|| UploadError::UrlFormat(raw.to_string()))?;
    let (authority, path) = match rest.split_once('/') {
        Some((a, p)) => (a, Some(p)),
        None => (rest, None),
    };
    let (username, password, host, port) = parse_authority(raw, authority)?;
    let raw_path = path.ok_or_else(|| UploadError::PathFormat(raw.to_string()))?;
    let remote_path = normalize_destination(raw_path);
    if remote_path.is_empty() {
        return Err(UploadError::PathFormat(raw.to_string()));
    }
    Ok(SftpTarget { params: ConnectParams { host, port, username }, password, remote_path })
}

/// Parse `ssh://[user[:password]@]host[:port]`; a path segment, when
/// present, is tolerated and discarded.
pub fn parse_ssh_url(raw: &str) -> Result<SshTarget, UploadError> {
    let rest =
        raw.strip_prefix("ssh://").ok_or_else(|| UploadError::UrlFormat(raw.to_string()))?;
    let authority = rest.split_once('/').map(|(a, _)| a).unwrap_or(rest);
    let (username, password, host, port) = parse_authority(raw, authority)?;
    Ok(SshTarget { params: ConnectParams { host, port, username }, password })
}

/// Split `[user[:password]@]host[:port]` into its pieces. Pure function,
/// no shared matcher state between calls.
fn parse_authority(
    raw: &str,
    authority: &str,
) -> Result<(Option<String>, Option<String>, String, u16), UploadError> {
    if authority.is_empty() {
        return Err(UploadError::UrlFormat(raw.to_string()));
    }
    // 密码中允许出现 '@'，因此取最后一个 '@' 作为 userinfo 分隔符
    let (userinfo, hostport) = match authority.rfind('@') {
        Some(pos) => (Some(&authority[..pos]), &authority[pos + 1..]),
        None => (None, authority),
    };
    let (username, password) = match userinfo {
        Some(ui) => match ui.split_once(':') {
            Some((u, p)) => (Some(u.to_string()), Some(p.to_string())),
            None => (Some(ui.to_string()), None),
        },
        None => (None, None),
    };
    if let Some(u) = &username
        && u.is_empty()
    {
        return Err(UploadError::UrlFormat(raw.to_string()));
    }

    let (host, port_str) = if let Some(stripped) = hostport.strip_prefix('[') {
        // 带括号的 IPv6 字面量，例如 [2001:db8::5]:222
        let close = stripped.find(']').ok_or_else(|| UploadError::UrlFormat(raw.to_string()))?;
        let host = &stripped[..close];
        let tail = &stripped[close + 1..];
        let port_str = match tail.strip_prefix(':') {
            Some(p) => Some(p),
            None if tail.is_empty() => None,
            None => return Err(UploadError::UrlFormat(raw.to_string())),
        };
        (host, port_str)
    } else {
        match hostport.rsplit_once(':') {
            Some((h, p)) => (h, Some(p)),
            None => (hostport, None),
        }
    };
    if host.is_empty() {
        return Err(UploadError::UrlFormat(raw.to_string()));
    }
    let port = match port_str {
        Some(p) => p.parse::<u16>().map_err(|_| UploadError::UrlFormat(raw.to_string()))?,
        None => DEFAULT_SSH_PORT,
    };
    Ok((username, password, host.to_string(), port))
}

/// Apply the destination path rule to the raw URL path (the part after the
/// authority's `/`):
/// - `~`-prefixed paths are home-relative: tilde stripped, no leading `/`;
///   a bare `~` becomes `.` (the remote home directory itself).
/// - anything else is absolute: `/` is prefixed even when the raw path
///   omitted it.
/// - trailing slashes are trimmed.
pub fn normalize_destination(raw_path: &str) -> String {
    let trimmed = raw_path.trim_end_matches('/');
    if let Some(rel) = trimmed.strip_prefix('~') {
        let rel = rel.trim_start_matches('/');
        if rel.is_empty() { ".".to_string() } else { rel.to_string() }
    } else if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_tilde_stripped() {
        assert_eq!(normalize_destination("~/app"), "app");
        assert_eq!(normalize_destination("~"), ".");
        assert_eq!(normalize_destination("~/"), ".");
    }

    #[test]
    fn destination_absolute_prefixed() {
        assert_eq!(normalize_destination("app"), "/app");
        assert_eq!(normalize_destination("tmp/test/"), "/tmp/test");
        assert_eq!(normalize_destination("/opt/file"), "/opt/file");
    }

    #[test]
    fn password_may_contain_at() {
        let t = parse_sftp_url("sftp://deploy:p@ss@example.com/srv").unwrap();
        assert_eq!(t.params.username.as_deref(), Some("deploy"));
        assert_eq!(t.password.as_deref(), Some("p@ss"));
        assert_eq!(t.params.host, "example.com");
    }

    #[test]
    fn bad_port_is_url_format_error() {
        let err = parse_sftp_url("sftp://example.com:abc/tmp").unwrap_err();
        assert!(matches!(err, UploadError::UrlFormat(_)));
    }

    #[test]
    fn unbalanced_ipv6_bracket_rejected() {
        let err = parse_sftp_url("sftp://root@[2001:db8::5/opt/file").unwrap_err();
        assert!(matches!(err, UploadError::UrlFormat(_)));
    }
}
