use std::io;
use std::path::Path;

/// Writes `contents` to `path`, creating missing parent directories
///
/// An existing file at `path` is replaced.
pub async fn write_file(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}
