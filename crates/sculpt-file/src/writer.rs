//! 归档写入
//!
//! zip 后端按格式确定容器默认参数：
//! - `compatible`：DEFLATE，经典 32 位记录
//! - `optimized`：ZSTD，启用 ZIP64 扩展
//!
//! 每个条目可以单独指定压缩方法、等级与密码（AES-256）。条目写入器析构时把写入器恢复到容器默认状态，
//! 上一个条目的参数不会影响下一个条目。

use crate::archive::{Archive, ArchiveFormat, ArchiveRegistry};
use crate::compression::{legacy_compression, resolve_compression, Level, Method};
use crate::error::{ArchiveError, StatusCode, WriteError};
use crate::reader::entry_relative_path;
use chrono::{Datelike, Timelike};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::write::{FileOptions, SimpleFileOptions};
use zip::{AesMode, ZipWriter};

/// 当前本地时间（DOS 时间戳，2 秒精度）
fn current_dos_time() -> zip::DateTime {
    let now = chrono::Local::now();
    zip::DateTime::from_date_and_time(
        now.year().clamp(1980, 2107) as u16,
        now.month() as u8,
        now.day() as u8,
        now.hour() as u8,
        now.minute() as u8,
        now.second() as u8,
    )
    .unwrap_or_default()
}

fn create_parent_dirs(archive: &Path, entry: &str, path: &Path) -> Result<(), WriteError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .map_err(|e| WriteError::from_io(archive, entry, e, StatusCode::OpenError)),
        _ => Ok(()),
    }
}

/// 目录后端
#[derive(Debug)]
pub struct FilesystemWriter {
    archive: Archive,
}

impl FilesystemWriter {
    fn root(&self) -> &Path {
        self.archive.path()
    }

    fn open_file(&self, entry: &str) -> Result<Box<dyn Write + '_>, WriteError> {
        let relative = entry_relative_path(entry).ok_or_else(|| {
            WriteError::new(self.root(), entry, "Invalid entry name", StatusCode::ParamError)
        })?;
        let path = self.root().join(relative);
        create_parent_dirs(self.root(), entry, &path)?;

        let file = File::create(&path)
            .map_err(|e| WriteError::from_io(self.root(), entry, e, StatusCode::OpenError))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// 当前打开的条目
#[derive(Debug)]
struct OpenEntry {
    name: String,
    written: u64,
}

/// zip 后端
pub struct ZipArchiveWriter {
    /// `None` 表示已经关闭
    zip: Option<ZipWriter<File>>,
    format: ArchiveFormat,
    default_method: Method,
    large_file: bool,
    legacy: bool,
    current: Option<OpenEntry>,
    archive: Archive,
}

impl std::fmt::Debug for ZipArchiveWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArchiveWriter")
            .field("path", &self.archive.path())
            .field("format", &self.format)
            .field("closed", &self.zip.is_none())
            .field("current", &self.current)
            .finish()
    }
}

impl ZipArchiveWriter {
    fn new(archive: Archive, format: ArchiveFormat, zip: ZipWriter<File>) -> Self {
        let (default_method, large_file) = match format {
            ArchiveFormat::Compatible => (Method::Deflate, false),
            _ => (Method::Zstd, true),
        };

        Self {
            zip: Some(zip),
            format,
            default_method,
            large_file,
            legacy: legacy_compression(),
            current: None,
            archive,
        }
    }

    fn create(archive: Archive, format: ArchiveFormat) -> Result<Self, WriteError> {
        let file = File::create(archive.path())
            .map_err(|e| WriteError::from_io(archive.path(), "", e, StatusCode::OpenError))?;
        Ok(Self::new(archive, format, ZipWriter::new(file)))
    }

    fn append(archive: Archive, format: ArchiveFormat) -> Result<Self, WriteError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(archive.path())
            .map_err(|e| WriteError::from_io(archive.path(), "", e, StatusCode::OpenError))?;
        let zip = ZipWriter::new_append(file)
            .map_err(|e| WriteError::from_zip(archive.path(), "", e, StatusCode::OpenError))?;
        Ok(Self::new(archive, format, zip))
    }

    fn open_file(
        &mut self,
        entry: &str,
        password: &str,
        method: Method,
        level: Level,
    ) -> Result<Box<dyn Write + '_>, WriteError> {
        let archive = self.archive.path();
        let compression = resolve_compression(method, level, self.default_method, self.legacy);

        let base: SimpleFileOptions = SimpleFileOptions::default()
            .compression_method(compression.method)
            .compression_level(compression.level)
            .last_modified_time(current_dos_time())
            .large_file(self.large_file);
        let options: FileOptions<'_, ()> = if password.is_empty() {
            base
        } else {
            base.with_aes_encryption(AesMode::Aes256, password)
        };

        let zip = self
            .zip
            .as_mut()
            .ok_or_else(|| WriteError::new(archive, entry, "Archive is closed", StatusCode::ParamError))?;
        zip.start_file(entry, options)
            .map_err(|e| WriteError::from_zip(archive, entry, e, StatusCode::OpenError))?;

        tracing::debug!(
            "Opened entry {} ({:?}, level {:?}, encrypted: {})",
            entry,
            compression.method,
            compression.level,
            !password.is_empty()
        );

        self.current = Some(OpenEntry {
            name: entry.to_string(),
            written: 0,
        });

        Ok(Box::new(ZipEntryWriter { writer: self }))
    }

    fn close(&mut self) -> Result<(), WriteError> {
        let Some(zip) = self.zip.take() else {
            return Ok(());
        };

        zip.finish()
            .map_err(|e| WriteError::from_zip(self.archive.path(), "", e, StatusCode::CloseError))?;
        tracing::debug!("Closed archive {}", self.archive.path().display());
        Ok(())
    }
}

impl Drop for ZipArchiveWriter {
    fn drop(&mut self) {
        if self.zip.is_some() {
            // 错误已由 WriteError 记录
            let _ = self.close();
        }
    }
}

/// zip 条目写入器，析构时恢复容器默认状态
struct ZipEntryWriter<'a> {
    writer: &'a mut ZipArchiveWriter,
}

impl Write for ZipEntryWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let zip = self
            .writer
            .zip
            .as_mut()
            .ok_or_else(|| std::io::Error::other("archive is closed"))?;
        let count = zip.write(buf)?;
        if let Some(current) = self.writer.current.as_mut() {
            current.written += count as u64;
        }
        Ok(count)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.writer.zip.as_mut() {
            Some(zip) => zip.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for ZipEntryWriter<'_> {
    fn drop(&mut self) {
        if let Some(entry) = self.writer.current.take() {
            tracing::debug!("Closed entry {} ({} bytes)", entry.name, entry.written);
        }
    }
}

/// 归档写入器
#[derive(Debug)]
pub enum ArchiveWriter {
    Filesystem(FilesystemWriter),
    Zip(ZipArchiveWriter),
}

impl ArchiveWriter {
    /// 使用全局登记表创建归档（父目录按需创建）
    pub fn get(path: &Path, format: ArchiveFormat) -> Result<Self, ArchiveError> {
        Self::get_in(&ArchiveRegistry::global(), path, format)
    }

    /// 使用指定登记表创建归档
    pub fn get_in(
        registry: &Arc<ArchiveRegistry>,
        path: &Path,
        format: ArchiveFormat,
    ) -> Result<Self, ArchiveError> {
        if !format.is_valid() {
            return Err(ArchiveError::InvalidFormat(format.to_string()));
        }

        let archive = Archive::open(registry, path)?;
        create_parent_dirs(archive.path(), "", archive.path())?;

        let writer = match format {
            ArchiveFormat::Filesystem => {
                fs::create_dir_all(archive.path())
                    .map_err(|e| WriteError::from_io(archive.path(), "", e, StatusCode::OpenError))?;
                ArchiveWriter::Filesystem(FilesystemWriter { archive })
            }
            _ => ArchiveWriter::Zip(ZipArchiveWriter::create(archive, format)?),
        };

        tracing::debug!("Created {} archive {}", format, writer.path().display());
        Ok(writer)
    }

    /// 打开已有归档并追加条目
    pub fn append(path: &Path, format: ArchiveFormat) -> Result<Self, ArchiveError> {
        Self::append_in(&ArchiveRegistry::global(), path, format)
    }

    pub fn append_in(
        registry: &Arc<ArchiveRegistry>,
        path: &Path,
        format: ArchiveFormat,
    ) -> Result<Self, ArchiveError> {
        if !format.is_valid() {
            return Err(ArchiveError::InvalidFormat(format.to_string()));
        }

        if format == ArchiveFormat::Filesystem {
            return Self::get_in(registry, path, format);
        }

        let archive = Archive::open(registry, path)?;
        Ok(ArchiveWriter::Zip(ZipArchiveWriter::append(archive, format)?))
    }

    pub fn path(&self) -> &Path {
        match self {
            ArchiveWriter::Filesystem(writer) => writer.archive.path(),
            ArchiveWriter::Zip(writer) => writer.archive.path(),
        }
    }

    pub fn format(&self) -> ArchiveFormat {
        match self {
            ArchiveWriter::Filesystem(_) => ArchiveFormat::Filesystem,
            ArchiveWriter::Zip(writer) => writer.format,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, ArchiveWriter::Filesystem(_))
    }

    /// 打开一个条目用于流式写入
    ///
    /// 方法与等级为 `Default` 时使用容器默认值；密码非空时条目以 AES-256 加密。
    /// 目录后端忽略压缩参数与密码。
    pub fn open_file(
        &mut self,
        entry: &str,
        password: &str,
        method: Method,
        level: Level,
    ) -> Result<Box<dyn Write + '_>, WriteError> {
        match self {
            ArchiveWriter::Filesystem(writer) => writer.open_file(entry),
            ArchiveWriter::Zip(writer) => writer.open_file(entry, password, method, level),
        }
    }

    /// 写入整个条目
    pub fn write_file(
        &mut self,
        entry: &str,
        data: &[u8],
        password: &str,
        method: Method,
        level: Level,
    ) -> Result<(), WriteError> {
        let archive = self.path().to_path_buf();
        let mut stream = self.open_file(entry, password, method, level)?;
        stream
            .write_all(data)
            .and_then(|_| stream.flush())
            .map_err(|e| WriteError::from_io(&archive, entry, e, StatusCode::WriteError))
    }

    /// 完成归档并释放路径
    pub fn close(mut self) -> Result<(), WriteError> {
        match &mut self {
            ArchiveWriter::Filesystem(_) => Ok(()),
            ArchiveWriter::Zip(writer) => writer.close(),
        }
    }
}

/// 收集目录下的所有文件（相对路径以 `/` 分隔）
pub fn collect_files(root: &Path) -> std::io::Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for item in fs::read_dir(&dir)? {
            let path = item?.path();
            if path.is_dir() {
                pending.push(path);
            } else if let Ok(relative) = path.strip_prefix(root) {
                let name: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                files.push((name.join("/"), path.clone()));
            }
        }
    }

    files.sort();
    Ok(files)
}
