//! 归档读取
//!
//! [`ArchiveReader`] 在打开时按 [`ArchiveFormat`] 选定后端：
//! - 目录后端：条目就是根目录下的普通文件
//! - zip 后端：条目按名称定位，可选 AES 解密，流式解压
//!
//! `open_file` 返回的流可变借用读取器，因此同一时刻只能有一个条目处于打开状态，
//! 且条目流一定先于容器关闭。

use crate::archive::{Archive, ArchiveFormat, ArchiveRegistry};
use crate::error::{ArchiveError, ReadError, StatusCode};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use zip::ZipArchive;

/// 把条目名解析为根目录下的相对路径，拒绝绝对路径与 `..`
pub(crate) fn entry_relative_path(entry: &str) -> Option<PathBuf> {
    let path = Path::new(entry);
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

/// 给文件加上属主读写权限
fn ensure_owner_read_write(path: &Path) -> std::io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o600);
    }

    #[cfg(not(unix))]
    {
        permissions.set_readonly(false);
    }

    fs::set_permissions(path, permissions)
}

/// 目录后端
#[derive(Debug)]
pub struct FilesystemReader {
    archive: Archive,
}

impl FilesystemReader {
    fn root(&self) -> &Path {
        self.archive.path()
    }

    fn resolve(&self, entry: &str) -> Result<PathBuf, ReadError> {
        entry_relative_path(entry)
            .map(|relative| self.root().join(relative))
            .ok_or_else(|| {
                ReadError::failed(self.root(), entry, "Invalid entry name", StatusCode::ParamError)
            })
    }

    fn open_file(&self, entry: &str) -> Result<Box<dyn Read + '_>, ReadError> {
        let path = self.resolve(entry)?;
        let file = File::open(&path).map_err(|e| ReadError::from_io(self.root(), entry, e))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn read_file(&self, entry: &str) -> Result<Vec<u8>, ReadError> {
        let path = self.resolve(entry)?;
        fs::read(&path).map_err(|e| ReadError::from_io(self.root(), entry, e))
    }

    fn entries(&self) -> Result<Vec<String>, ReadError> {
        let mut entries = Vec::new();
        let mut pending = vec![self.root().to_path_buf()];

        while let Some(dir) = pending.pop() {
            let listing = fs::read_dir(&dir).map_err(|e| ReadError::from_io(self.root(), "", e))?;
            for item in listing {
                let item = item.map_err(|e| ReadError::from_io(self.root(), "", e))?;
                let path = item.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(self.root()) {
                    let name: Vec<String> = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    entries.push(name.join("/"));
                }
            }
        }

        entries.sort();
        Ok(entries)
    }

    fn extract_all_to(&self, output_dir: &Path) -> Result<Vec<PathBuf>, ReadError> {
        let mut extracted = Vec::new();
        for entry in self.entries()? {
            let source = self.resolve(&entry)?;
            let target = output_dir.join(entry_relative_path(&entry).unwrap_or_default());

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| ReadError::from_io(self.root(), &entry, e))?;
            }
            fs::copy(&source, &target).map_err(|e| ReadError::from_io(self.root(), &entry, e))?;
            extracted.push(target);
        }
        Ok(extracted)
    }
}

/// zip 后端
pub struct ZipReader {
    zip: ZipArchive<BufReader<File>>,
    format: ArchiveFormat,
    archive: Archive,
}

impl std::fmt::Debug for ZipReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipReader")
            .field("path", &self.archive.path())
            .field("format", &self.format)
            .field("entries", &self.zip.len())
            .finish()
    }
}

/// 条目的原始信息（不解密、不解压）
struct EntryInfo {
    index: usize,
    encrypted: bool,
    size: u64,
}

impl ZipReader {
    fn open(archive: Archive, format: ArchiveFormat) -> Result<Self, ReadError> {
        let file = File::open(archive.path()).map_err(|e| ReadError::from_io(archive.path(), "", e))?;
        let zip = ZipArchive::new(BufReader::new(file))
            .map_err(|e| ReadError::from_zip(archive.path(), "", e))?;

        tracing::debug!(
            "Opened {} archive {} ({} entries)",
            format,
            archive.path().display(),
            zip.len()
        );

        Ok(Self {
            zip,
            format,
            archive,
        })
    }

    fn locate(&mut self, entry: &str) -> Result<EntryInfo, ReadError> {
        let archive = self.archive.path();
        let index = self
            .zip
            .index_for_name(entry)
            .ok_or_else(|| ReadError::failed(archive, entry, "Entry not found", StatusCode::EndOfList))?;

        let raw = self
            .zip
            .by_index_raw(index)
            .map_err(|e| ReadError::from_zip(archive, entry, e))?;

        Ok(EntryInfo {
            index,
            encrypted: raw.encrypted(),
            size: raw.size(),
        })
    }

    fn open_index(
        &mut self,
        info: &EntryInfo,
        entry: &str,
        password: &str,
    ) -> Result<Box<dyn Read + '_>, ReadError> {
        let archive = self.archive.path();

        if info.encrypted && password.is_empty() {
            return Err(ReadError::bad_password(archive, entry));
        }

        let file = if info.encrypted {
            self.zip.by_index_decrypt(info.index, password.as_bytes())
        } else {
            self.zip.by_index(info.index)
        }
        .map_err(|e| ReadError::from_zip(archive, entry, e))?;

        Ok(Box::new(file))
    }

    fn open_file(&mut self, entry: &str, password: &str) -> Result<Box<dyn Read + '_>, ReadError> {
        let info = self.locate(entry)?;
        self.open_index(&info, entry, password)
    }

    fn read_file(&mut self, entry: &str, password: &str) -> Result<Vec<u8>, ReadError> {
        let archive = self.archive.path().to_path_buf();
        let info = self.locate(entry)?;

        let size = usize::try_from(info.size).map_err(|_| {
            ReadError::failed(&archive, entry, "Entry is too large for memory", StatusCode::ParamError)
        })?;

        let mut stream = self.open_index(&info, entry, password)?;
        let mut data = vec![0u8; size];
        let mut filled = 0;

        while filled < size {
            let count = stream
                .read(&mut data[filled..])
                .map_err(|e| ReadError::from_io(&archive, entry, e))?;
            if count == 0 {
                break;
            }
            filled += count;
        }

        if filled < size {
            return Err(ReadError::failed(
                &archive,
                entry,
                format!("Unexpected end of entry, {} bytes missing", size - filled),
                StatusCode::ReadError,
            ));
        }

        // 末尾再读一次以触发 CRC / 认证码校验
        let mut probe = [0u8; 1];
        match stream.read(&mut probe) {
            Ok(0) => Ok(data),
            Ok(_) => Err(ReadError::failed(
                &archive,
                entry,
                "Entry is longer than its declared size",
                StatusCode::DataError,
            )),
            Err(e) => Err(ReadError::from_io(&archive, entry, e)),
        }
    }

    fn entries(&self) -> Vec<String> {
        self.zip.file_names().map(str::to_owned).collect()
    }

    fn extract_all_to(&mut self, output_dir: &Path, password: &str) -> Result<Vec<PathBuf>, ReadError> {
        let archive = self.archive.path().to_path_buf();
        let mut extracted = Vec::new();

        for index in 0..self.zip.len() {
            let (name, relative, encrypted, is_dir) = {
                let raw = self
                    .zip
                    .by_index_raw(index)
                    .map_err(|e| ReadError::from_zip(&archive, "", e))?;
                (raw.name().to_string(), raw.enclosed_name(), raw.encrypted(), raw.is_dir())
            };

            let relative = relative.ok_or_else(|| {
                ReadError::failed(&archive, &name, "Entry escapes the output directory", StatusCode::ParamError)
            })?;
            let target = output_dir.join(relative);

            if is_dir {
                fs::create_dir_all(&target).map_err(|e| ReadError::from_io(&archive, &name, e))?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| ReadError::from_io(&archive, &name, e))?;
            }

            let info = EntryInfo {
                index,
                encrypted,
                size: 0,
            };
            let mut stream = self.open_index(&info, &name, password)?;
            let mut output = File::create(&target).map_err(|e| ReadError::from_io(&archive, &name, e))?;
            std::io::copy(&mut stream, &mut output).map_err(|e| ReadError::from_io(&archive, &name, e))?;

            tracing::debug!("Extracted {} -> {}", name, target.display());
            extracted.push(target);
        }

        for path in &extracted {
            ensure_owner_read_write(path).map_err(|e| {
                ReadError::from_io(&archive, &path.to_string_lossy(), e)
            })?;
        }

        Ok(extracted)
    }
}

/// 归档读取器
#[derive(Debug)]
pub enum ArchiveReader {
    Filesystem(FilesystemReader),
    Zip(ZipReader),
}

impl ArchiveReader {
    /// 使用全局登记表打开归档
    pub fn get(path: &Path, format: ArchiveFormat) -> Result<Self, ArchiveError> {
        Self::get_in(&ArchiveRegistry::global(), path, format)
    }

    /// 使用指定登记表打开归档
    pub fn get_in(
        registry: &Arc<ArchiveRegistry>,
        path: &Path,
        format: ArchiveFormat,
    ) -> Result<Self, ArchiveError> {
        if !format.is_valid() {
            return Err(ArchiveError::InvalidFormat(format.to_string()));
        }

        let archive = Archive::open(registry, path)?;
        let reader = match format {
            ArchiveFormat::Filesystem => {
                if !archive.path().is_dir() {
                    return Err(ReadError::failed(
                        archive.path(),
                        "",
                        "Archive directory does not exist",
                        StatusCode::OpenError,
                    )
                    .into());
                }
                ArchiveReader::Filesystem(FilesystemReader { archive })
            }
            _ => ArchiveReader::Zip(ZipReader::open(archive, format)?),
        };

        Ok(reader)
    }

    /// 归档的规范化路径
    pub fn path(&self) -> &Path {
        match self {
            ArchiveReader::Filesystem(reader) => reader.archive.path(),
            ArchiveReader::Zip(reader) => reader.archive.path(),
        }
    }

    pub fn format(&self) -> ArchiveFormat {
        match self {
            ArchiveReader::Filesystem(_) => ArchiveFormat::Filesystem,
            ArchiveReader::Zip(reader) => reader.format,
        }
    }

    /// 条目是否以原始文件形式存放（目录后端）
    pub fn is_raw(&self) -> bool {
        matches!(self, ArchiveReader::Filesystem(_))
    }

    /// 打开一个条目用于流式读取
    ///
    /// 目录后端忽略密码；未加密的 zip 条目也忽略密码。
    pub fn open_file(&mut self, entry: &str, password: &str) -> Result<Box<dyn Read + '_>, ReadError> {
        match self {
            ArchiveReader::Filesystem(reader) => reader.open_file(entry),
            ArchiveReader::Zip(reader) => reader.open_file(entry, password),
        }
    }

    /// 读取并解压整个条目
    pub fn read_file(&mut self, entry: &str, password: &str) -> Result<Vec<u8>, ReadError> {
        match self {
            ArchiveReader::Filesystem(reader) => reader.read_file(entry),
            ArchiveReader::Zip(reader) => reader.read_file(entry, password),
        }
    }

    /// 解压所有条目，返回写出的文件路径
    pub fn extract_all_to(&mut self, output_dir: &Path, password: &str) -> Result<Vec<PathBuf>, ReadError> {
        fs::create_dir_all(output_dir).map_err(|e| ReadError::from_io(self.path(), "", e))?;

        let extracted = match self {
            ArchiveReader::Filesystem(reader) => reader.extract_all_to(output_dir)?,
            ArchiveReader::Zip(reader) => reader.extract_all_to(output_dir, password)?,
        };

        tracing::info!(
            "Extracted {} files from {} to {}",
            extracted.len(),
            self.path().display(),
            output_dir.display()
        );
        Ok(extracted)
    }

    /// 所有条目名（`/` 分隔）
    pub fn entries(&self) -> Result<Vec<String>, ReadError> {
        match self {
            ArchiveReader::Filesystem(reader) => reader.entries(),
            ArchiveReader::Zip(reader) => Ok(reader.entries()),
        }
    }

    pub fn contains(&self, entry: &str) -> bool {
        match self {
            ArchiveReader::Filesystem(reader) => {
                reader.resolve(entry).map(|path| path.is_file()).unwrap_or(false)
            }
            ArchiveReader::Zip(reader) => reader.zip.index_for_name(entry).is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_relative_path() {
        assert_eq!(entry_relative_path("a/b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(entry_relative_path("./a.txt"), Some(PathBuf::from("a.txt")));
        assert_eq!(entry_relative_path("../a.txt"), None);
        assert_eq!(entry_relative_path("/etc/passwd"), None);
        assert_eq!(entry_relative_path(""), None);
    }

    #[test]
    fn test_missing_container() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ArchiveRegistry::new();
        let path = dir.path().join("missing.zip");

        let error = ArchiveReader::get_in(&registry, &path, ArchiveFormat::Optimized).unwrap_err();
        match error {
            ArchiveError::Read(error) => assert_eq!(error.code(), StatusCode::OpenError),
            other => panic!("unexpected error: {}", other),
        }
        // 失败后不再占用路径
        assert!(registry.is_empty());
    }

    #[test]
    fn test_corrupt_container() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ArchiveRegistry::new();
        let path = dir.path().join("corrupt.zip");
        fs::write(&path, b"definitely not a zip file").unwrap();

        let error = ArchiveReader::get_in(&registry, &path, ArchiveFormat::Compatible).unwrap_err();
        assert!(matches!(error, ArchiveError::Read(ReadError::Failed { .. })));
    }

    #[test]
    fn test_invalid_format() {
        let registry = ArchiveRegistry::new();
        let error = ArchiveReader::get_in(&registry, Path::new("x.zip"), ArchiveFormat::Invalid).unwrap_err();
        assert!(matches!(error, ArchiveError::InvalidFormat(_)));
    }

    #[test]
    fn test_filesystem_reader() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("a.txt"), b"alpha").unwrap();
        fs::write(dir.path().join("sub/b.txt"), b"beta").unwrap();

        let registry = ArchiveRegistry::new();
        let mut reader = ArchiveReader::get_in(&registry, dir.path(), ArchiveFormat::Filesystem).unwrap();
        assert!(reader.is_raw());
        assert_eq!(reader.entries().unwrap(), vec!["a.txt", "sub/b.txt"]);
        assert!(reader.contains("sub/b.txt"));
        assert!(!reader.contains("sub"));
        assert_eq!(reader.read_file("sub/b.txt", "").unwrap(), b"beta");

        let mut content = String::new();
        reader.open_file("a.txt", "ignored").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "alpha");

        let error = reader.read_file("missing.txt", "").unwrap_err();
        assert_eq!(error.code(), StatusCode::OpenError);
        assert_eq!(reader.read_file("../escape", "").unwrap_err().code(), StatusCode::ParamError);

        let output = tempfile::tempdir().unwrap();
        let extracted = reader.extract_all_to(output.path(), "").unwrap();
        assert_eq!(extracted.len(), 2);
        assert_eq!(fs::read(output.path().join("sub/b.txt")).unwrap(), b"beta");
    }
}
