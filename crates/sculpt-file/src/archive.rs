//! 归档基础设施
//!
//! - [`ArchiveFormat`]：目录 / 兼容（DEFLATE）/ 优化（ZSTD）三种格式
//! - [`ArchiveRegistry`]：进程内已打开归档的登记表，同一规范化路径同时只能打开一次
//! - [`Archive`]：登记表中的一项，析构时自动注销

use crate::error::ArchiveError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

/// 归档格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ArchiveFormat {
    /// 普通目录，不压缩
    Filesystem,
    /// 传统 DEFLATE 压缩容器
    Compatible,
    /// ZSTD 压缩容器
    #[default]
    Optimized,
    /// 无法识别的格式名
    Invalid,
}

impl ArchiveFormat {
    /// 所有有效格式
    pub const ALL: [ArchiveFormat; 3] = [
        ArchiveFormat::Filesystem,
        ArchiveFormat::Compatible,
        ArchiveFormat::Optimized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Filesystem => "filesystem",
            ArchiveFormat::Compatible => "compatible",
            ArchiveFormat::Optimized => "optimized",
            ArchiveFormat::Invalid => "invalid",
        }
    }

    pub fn is_valid(&self) -> bool {
        *self != ArchiveFormat::Invalid
    }

    /// 是否为压缩容器（非目录）
    pub fn is_container(&self) -> bool {
        matches!(self, ArchiveFormat::Compatible | ArchiveFormat::Optimized)
    }
}

impl From<&str> for ArchiveFormat {
    /// 只接受小写名称；空字符串与 `default` 表示默认格式
    fn from(name: &str) -> Self {
        match name {
            "" | "default" | "optimized" => ArchiveFormat::Optimized,
            "filesystem" => ArchiveFormat::Filesystem,
            "compatible" => ArchiveFormat::Compatible,
            _ => ArchiveFormat::Invalid,
        }
    }
}

impl From<String> for ArchiveFormat {
    fn from(name: String) -> Self {
        ArchiveFormat::from(name.as_str())
    }
}

impl From<ArchiveFormat> for String {
    fn from(format: ArchiveFormat) -> Self {
        format.as_str().to_string()
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 规范化为绝对路径并在字面上消去 `.` 与 `..`（不访问文件系统）
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// 已打开归档的登记表
#[derive(Debug, Default)]
pub struct ArchiveRegistry {
    open: Mutex<HashSet<PathBuf>>,
}

impl ArchiveRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 进程级登记表（首次使用时创建）
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ArchiveRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(ArchiveRegistry::new).clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<PathBuf>> {
        // 集合本身不会处于中间状态，中毒后继续使用
        self.open.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.lock().contains(&normalize_path(path))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn register(&self, path: PathBuf) -> bool {
        self.lock().insert(path)
    }

    fn release(&self, path: &Path) {
        self.lock().remove(path);
    }
}

/// 一个已登记的归档路径
///
/// 析构（包括 panic 展开）时从登记表中注销。
#[derive(Debug)]
pub struct Archive {
    registry: Arc<ArchiveRegistry>,
    path: PathBuf,
}

impl Archive {
    /// 登记路径；同一路径已打开时返回 [`ArchiveError::AlreadyOpen`]
    pub fn open(registry: &Arc<ArchiveRegistry>, path: &Path) -> Result<Self, ArchiveError> {
        let path = normalize_path(path);
        if !registry.register(path.clone()) {
            tracing::error!("Archive already open: {}", path.display());
            return Err(ArchiveError::AlreadyOpen(path));
        }

        tracing::debug!("Registered archive {}", path.display());
        Ok(Self {
            registry: registry.clone(),
            path,
        })
    }

    /// 规范化后的绝对路径
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for Archive {
    fn drop(&mut self) {
        self.registry.release(&self.path);
        tracing::debug!("Released archive {}", self.path.display());
    }
}
