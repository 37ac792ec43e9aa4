//! Filesystem utilities.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Every `*.py` file under `dir`, sorted, skipping ignored directory names.
pub fn python_files(dir: &Path, ignore_dirs: &BTreeSet<String>) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(dir).sort_by_file_name().into_iter();
    for entry in walker.filter_entry(|e| {
        e.depth() == 0
            || !e.file_type().is_dir()
            || !ignore_dirs.contains(e.file_name().to_string_lossy().as_ref())
    }) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().is_some_and(|ext| ext == "py")
        {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Immediate subdirectories of `dir`, sorted by name. A missing `dir` yields none.
pub fn subdirectories(dir: &Path) -> io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Directories matching a glob pattern relative to `base`, sorted.
pub fn glob_dirs(base: &Path, pattern: &str) -> io::Result<Vec<PathBuf>> {
    let full_pattern = base.join(pattern);
    let pattern_str = full_pattern.to_string_lossy();
    let entries = glob(&pattern_str).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid glob pattern {}: {}", pattern, e),
        )
    })?;

    let mut results = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => {
                if path.is_dir() {
                    results.push(path);
                }
            }
            Err(e) => {
                tracing::warn!("glob error: {}", e);
            }
        }
    }

    results.sort();
    Ok(results)
}

/// Repository-relative path of `path` joined with `/`, used for target keys.
pub fn relative_key(root: &Path, path: &Path) -> String {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_python_files_skips_ignored_dirs() {
        let tmp = TempDir::new().unwrap();
        let pkg = tmp.path().join("pkg");
        fs::create_dir_all(pkg.join("__pycache__")).unwrap();
        fs::create_dir_all(pkg.join("sub")).unwrap();
        fs::write(pkg.join("b.py"), "").unwrap();
        fs::write(pkg.join("a.py"), "").unwrap();
        fs::write(pkg.join("notes.txt"), "").unwrap();
        fs::write(pkg.join("sub").join("c.py"), "").unwrap();
        fs::write(pkg.join("__pycache__").join("a.py"), "").unwrap();

        let ignore: BTreeSet<String> = ["__pycache__".to_string()].into_iter().collect();
        let files = python_files(&pkg, &ignore).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| relative_key(&pkg, p))
            .collect();

        assert_eq!(names, vec!["a.py", "b.py", "sub/c.py"]);
    }

    #[test]
    fn test_subdirectories_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("zeta")).unwrap();
        fs::create_dir_all(tmp.path().join("alpha")).unwrap();
        fs::write(tmp.path().join("file.py"), "").unwrap();

        let dirs = subdirectories(tmp.path()).unwrap();
        let names: Vec<_> = dirs
            .iter()
            .map(|d| d.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        assert!(subdirectories(&tmp.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_glob_dirs() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("tasks/fetch/src/fetcher")).unwrap();
        fs::create_dir_all(tmp.path().join("tasks/store/src/storer")).unwrap();
        fs::write(tmp.path().join("tasks/store/src/setup.cfg"), "").unwrap();

        let dirs = glob_dirs(tmp.path(), "tasks/*/src/*").unwrap();
        assert_eq!(dirs.len(), 2);
        assert!(dirs[0].ends_with("fetcher"));
    }

    #[test]
    fn test_relative_key() {
        let root = Path::new("/repo");
        assert_eq!(
            relative_key(root, &root.join("lib").join("core").join("src")),
            "lib/core/src"
        );
    }
}
