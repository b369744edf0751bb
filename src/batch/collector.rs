//! # 计算目录收集器
//!
//! 根目录下含有标记文件的目录即为一个计算目录。
//!
//! ## 依赖关系
//! - 被 `commands/parse.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob::Pattern` 匹配标记文件名

use glob::Pattern;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{DftkitError, Result};

const DEFAULT_MARKER: &str = "OUTCAR";

/// 计算目录收集器
pub struct CalcDirCollector {
    root: PathBuf,
    /// 标记文件名模式，为空时只认 OUTCAR
    markers: Vec<Pattern>,
    recursive: bool,
}

impl CalcDirCollector {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            markers: Vec::new(),
            recursive: false,
        }
    }

    /// 设置标记文件模式（逗号分隔，如 "OUTCAR,vasprun.xml"）
    pub fn with_markers(mut self, markers: &str) -> Result<Self> {
        let patterns = markers
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Pattern::new(s).map_err(|e| {
                    DftkitError::InvalidArgument(format!("bad marker pattern '{}': {}", s, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.markers = patterns;
        Ok(self)
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有计算目录（排序、去重）
    ///
    /// 非递归时只看根目录本身和它的直接子目录。
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(DftkitError::DirectoryNotFound {
                path: self.root.display().to_string(),
            });
        }

        // 标记文件位于 root/ 或 root/<sub>/ 时深度为 1 或 2
        let max_depth = if self.recursive { usize::MAX } else { 2 };

        let dirs: BTreeSet<PathBuf> = WalkDir::new(&self.root)
            .max_depth(max_depth)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_marker(e.path()))
            .filter_map(|e| e.path().parent().map(Path::to_path_buf))
            .collect();

        log::debug!(
            "found {} calculation directories under {}",
            dirs.len(),
            self.root.display()
        );
        Ok(dirs.into_iter().collect())
    }

    fn is_marker(&self, path: &Path) -> bool {
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if self.markers.is_empty() => name == DEFAULT_MARKER,
            Some(name) => self.markers.iter().any(|p| p.matches(name)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_collect_depth() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("a/OUTCAR"));
        touch(&root.path().join("b/POSCAR"));
        touch(&root.path().join("c/deep/OUTCAR"));

        let shallow = CalcDirCollector::new(root.path()).collect().unwrap();
        assert_eq!(shallow, vec![root.path().join("a")]);

        let deep = CalcDirCollector::new(root.path())
            .recursive(true)
            .collect()
            .unwrap();
        assert_eq!(deep, vec![root.path().join("a"), root.path().join("c/deep")]);
    }

    #[test]
    fn test_marker_patterns() {
        let root = tempfile::tempdir().unwrap();
        touch(&root.path().join("x/vasprun.xml"));
        touch(&root.path().join("y/OUTCAR.gz"));

        let dirs = CalcDirCollector::new(root.path())
            .with_markers("vasprun.xml, OUTCAR*")
            .unwrap()
            .collect()
            .unwrap();
        assert_eq!(dirs.len(), 2);
    }

    #[test]
    fn test_missing_root() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(
            CalcDirCollector::new(root.path().join("nope")).collect(),
            Err(DftkitError::DirectoryNotFound { .. })
        ));
    }
}
