/*
 * Responsibility
 * - アプリケーションのディレクトリ構成 (accounts / routes / views)
 * - ディレクトリ内ファイルの列挙 (拡張子で絞り込み)
 */
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Finder {
    pub root: PathBuf,
    pub app: PathBuf,
    pub accounts: PathBuf,
    pub routes: PathBuf,
    pub views: PathBuf,
}

impl Finder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let app = root.join("app");

        Self {
            accounts: app.join("accounts"),
            routes: app.join("routes"),
            views: app.join("views"),
            app,
            root,
        }
    }

    /// Files directly inside `dir` with the given extension, sorted by name.
    ///
    /// A missing directory yields an empty list.
    pub async fn scan(&self, dir: &Path, ext: &str) -> io::Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(ext)
            {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}
