use std::path::{Path, PathBuf};

use anyhow::Result;

/// `~/.uplink` 配置目录；不存在时创建
pub fn app_dir() -> Option<PathBuf> {
    let dir = dirs::home_dir()?.join(".".to_owned() + env!("CARGO_PKG_NAME"));
    if !dir.exists() {
        std::fs::create_dir_all(&dir).ok()?;
    }
    Some(dir)
}

/// Logs directory under the app dir; failure lists and `--verbose` logs
/// land here.
pub fn logs_dir() -> Option<PathBuf> {
    let dir = app_dir()?.join("logs");
    if !dir.exists() {
        std::fs::create_dir_all(&dir).ok()?;
    }
    Some(dir)
}

/// Parse a properties-style environment file: one `key=value` per line,
/// `#` comments and blank lines skipped, optional single/double quotes
/// around the value stripped.
pub fn parse_env_file(path: &Path) -> Result<Vec<(String, String)>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("无法读取环境文件 {}: {}", path.display(), e))?;
    let mut pairs = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let mut value = value.trim();
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            value = &value[1..value.len() - 1];
        }
        if !key.is_empty() {
            pairs.push((key.to_string(), value.to_string()));
        }
    }
    Ok(pairs)
}

/// Load an env file into the process environment. Variables already set in
/// the environment win over file values.
///
/// Called from `main` before any worker thread exists, which is what makes
/// the `set_var` call sound.
pub fn load_env_file(path: &Path) -> Result<()> {
    for (key, value) in parse_env_file(path)? {
        if std::env::var_os(&key).is_none() {
            unsafe { std::env::set_var(key, value) };
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_env_file_skips_comments_and_strips_quotes() {
        let mut p = std::env::temp_dir();
        p.push(format!("uplink_env_test_{}.env", std::process::id()));
        let mut f = std::fs::File::create(&p).expect("create temp env file");
        writeln!(f, "# comment").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "PLAIN=value").unwrap();
        writeln!(f, "QUOTED=\"hello world\"").unwrap();
        writeln!(f, "SINGLE='x'").unwrap();
        writeln!(f, "novalueline").unwrap();
        drop(f);

        let pairs = parse_env_file(&p).expect("parse");
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0], ("PLAIN".to_string(), "value".to_string()));
        assert_eq!(pairs[1], ("QUOTED".to_string(), "hello world".to_string()));
        assert_eq!(pairs[2], ("SINGLE".to_string(), "x".to_string()));
        let _ = std::fs::remove_file(&p);
    }
}
