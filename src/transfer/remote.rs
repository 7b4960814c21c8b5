use std::path::Path;

/// Remote path classification, derived from `lstat` so symlinks are not
/// silently followed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteKind {
    File,
    Dir,
    Other,
}

/// Trait abstracting the few SFTP operations the transfer engine needs.
/// Boxed writers let tests inject mock remote file-like objects; implementors
/// must be Send so they can live inside worker threads.
pub trait RemoteFs: Send {
    /// `None` means the path does not exist (any stat failure is treated as
    /// absent, matching the overwrite-or-create put semantics).
    fn kind(&self, path: &Path) -> Option<RemoteKind>;
    fn create(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>, String>;
}

/// Adapter owning an `ssh2::Sftp` channel.
pub struct Ssh2Remote(pub ssh2::Sftp);

impl RemoteFs for Ssh2Remote {
    fn kind(&self, path: &Path) -> Option<RemoteKind> {
        match self.0.lstat(path) {
            Ok(st) if st.is_dir() => Some(RemoteKind::Dir),
            Ok(st) if st.is_file() => Some(RemoteKind::File),
            Ok(_) => Some(RemoteKind::Other),
            Err(_) => None,
        }
    }

    fn create(&self, path: &Path) -> Result<Box<dyn std::io::Write + Send>, String> {
        match self.0.create(path) {
            Ok(f) => Ok(Box::new(f)),
            Err(e) => Err(e.to_string()),
        }
    }
}
