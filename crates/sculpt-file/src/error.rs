//! 归档与会话错误定义
//!
//! 读写失败都带有后端状态码 ([`StatusCode`])、归档路径与条目路径。
//! 密码错误单独成为一个变体，调用方可以据此重新询问密码而不必把它当作致命错误。

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 后端状态码（与常见 zip 库的数值保持一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StatusCode {
    StreamError = -1,
    DataError = -3,
    EndOfList = -100,
    ParamError = -102,
    FormatError = -103,
    CrcError = -105,
    PasswordError = -108,
    SupportError = -109,
    OpenError = -111,
    CloseError = -112,
    ReadError = -115,
    WriteError = -116,
}

impl StatusCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            StatusCode::StreamError => "stream error",
            StatusCode::DataError => "data error",
            StatusCode::EndOfList => "end of list",
            StatusCode::ParamError => "parameter error",
            StatusCode::FormatError => "format error",
            StatusCode::CrcError => "crc error",
            StatusCode::PasswordError => "password error",
            StatusCode::SupportError => "unsupported",
            StatusCode::OpenError => "open error",
            StatusCode::CloseError => "close error",
            StatusCode::ReadError => "read error",
            StatusCode::WriteError => "write error",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// 读取失败
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Wrong or missing password for '{entry}' in archive '{}' [{code}]", .archive.display())]
    BadPassword {
        archive: PathBuf,
        entry: String,
        code: StatusCode,
    },

    #[error("Cannot read '{entry}' in archive '{}': {message} [{code}]", .archive.display())]
    Failed {
        archive: PathBuf,
        entry: String,
        message: String,
        code: StatusCode,
    },
}

impl ReadError {
    /// 构造密码错误（可恢复，按 debug 级别记录）
    pub(crate) fn bad_password(archive: &Path, entry: &str) -> Self {
        tracing::debug!(
            "Wrong or missing password for '{}' in '{}'",
            entry,
            archive.display()
        );
        ReadError::BadPassword {
            archive: archive.to_path_buf(),
            entry: entry.to_string(),
            code: StatusCode::PasswordError,
        }
    }

    pub(crate) fn failed(archive: &Path, entry: &str, message: impl Into<String>, code: StatusCode) -> Self {
        let message = message.into();
        tracing::error!(
            "Cannot read '{}' in '{}': {} [{}]",
            entry,
            archive.display(),
            message,
            code
        );
        ReadError::Failed {
            archive: archive.to_path_buf(),
            entry: entry.to_string(),
            message,
            code,
        }
    }

    /// 把 zip 后端错误转换为读取错误
    pub(crate) fn from_zip(archive: &Path, entry: &str, error: zip::result::ZipError) -> Self {
        use zip::result::ZipError;

        match error {
            ZipError::InvalidPassword => Self::bad_password(archive, entry),
            ZipError::UnsupportedArchive(message) if message == ZipError::PASSWORD_REQUIRED => {
                Self::bad_password(archive, entry)
            }
            ZipError::FileNotFound => {
                Self::failed(archive, entry, "Entry not found", StatusCode::EndOfList)
            }
            ZipError::InvalidArchive(message) => {
                Self::failed(archive, entry, message.to_string(), StatusCode::FormatError)
            }
            ZipError::UnsupportedArchive(message) => {
                Self::failed(archive, entry, message.to_string(), StatusCode::SupportError)
            }
            ZipError::Io(error) => Self::from_io(archive, entry, error),
            other => Self::failed(archive, entry, other.to_string(), StatusCode::ReadError),
        }
    }

    pub(crate) fn from_io(archive: &Path, entry: &str, error: std::io::Error) -> Self {
        let code = match error.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                StatusCode::OpenError
            }
            std::io::ErrorKind::InvalidData => StatusCode::DataError,
            std::io::ErrorKind::UnexpectedEof => StatusCode::StreamError,
            _ => StatusCode::ReadError,
        };
        Self::failed(archive, entry, error.to_string(), code)
    }

    pub fn is_bad_password(&self) -> bool {
        matches!(self, ReadError::BadPassword { .. })
    }

    pub fn code(&self) -> StatusCode {
        match self {
            ReadError::BadPassword { code, .. } | ReadError::Failed { code, .. } => *code,
        }
    }

    pub fn archive(&self) -> &Path {
        match self {
            ReadError::BadPassword { archive, .. } | ReadError::Failed { archive, .. } => archive,
        }
    }

    pub fn entry(&self) -> &str {
        match self {
            ReadError::BadPassword { entry, .. } | ReadError::Failed { entry, .. } => entry,
        }
    }
}

/// 写入失败
#[derive(Error, Debug)]
#[error("Cannot write '{entry}' in archive '{}': {message} [{code}]", .archive.display())]
pub struct WriteError {
    pub archive: PathBuf,
    pub entry: String,
    pub message: String,
    pub code: StatusCode,
}

impl WriteError {
    pub(crate) fn new(archive: &Path, entry: &str, message: impl Into<String>, code: StatusCode) -> Self {
        let message = message.into();
        tracing::error!(
            "Cannot write '{}' in '{}': {} [{}]",
            entry,
            archive.display(),
            message,
            code
        );
        Self {
            archive: archive.to_path_buf(),
            entry: entry.to_string(),
            message,
            code,
        }
    }

    pub(crate) fn from_zip(archive: &Path, entry: &str, error: zip::result::ZipError, code: StatusCode) -> Self {
        let code = match &error {
            zip::result::ZipError::UnsupportedArchive(_) => StatusCode::SupportError,
            zip::result::ZipError::InvalidArchive(_) => StatusCode::FormatError,
            _ => code,
        };
        Self::new(archive, entry, error.to_string(), code)
    }

    pub(crate) fn from_io(archive: &Path, entry: &str, error: std::io::Error, code: StatusCode) -> Self {
        Self::new(archive, entry, error.to_string(), code)
    }
}

/// 打开归档时的错误
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// 同一路径已经有一个打开的归档（调用方的逻辑错误）
    #[error("Archive already open: {}", .0.display())]
    AlreadyOpen(PathBuf),

    #[error("Invalid archive format: {0}")]
    InvalidFormat(String),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl ArchiveError {
    pub fn is_bad_password(&self) -> bool {
        matches!(self, ArchiveError::Read(error) if error.is_bad_password())
    }
}

/// 会话读写错误
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MessagePack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    #[error("Invalid session content: {0}")]
    InvalidContent(String),
}

impl From<ReadError> for SessionError {
    fn from(error: ReadError) -> Self {
        SessionError::Archive(ArchiveError::Read(error))
    }
}

impl From<WriteError> for SessionError {
    fn from(error: WriteError) -> Self {
        SessionError::Archive(ArchiveError::Write(error))
    }
}

impl SessionError {
    pub fn is_bad_password(&self) -> bool {
        matches!(self, SessionError::Archive(error) if error.is_bad_password())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StatusCode::EndOfList.code(), -100);
        assert_eq!(StatusCode::PasswordError.code(), -108);
        assert_eq!(StatusCode::WriteError.code(), -116);
        assert_eq!(StatusCode::CrcError.to_string(), "crc error (-105)");
    }

    #[test]
    fn test_bad_password_is_distinguishable() {
        let path = Path::new("/tmp/archive.zip");
        let error = ReadError::from_zip(path, "secret.bin", zip::result::ZipError::InvalidPassword);
        assert!(error.is_bad_password());
        assert_eq!(error.code(), StatusCode::PasswordError);
        assert_eq!(error.entry(), "secret.bin");

        let error = ReadError::from_zip(path, "missing.bin", zip::result::ZipError::FileNotFound);
        assert!(!error.is_bad_password());
        assert_eq!(error.code(), StatusCode::EndOfList);

        let wrapped = SessionError::from(ReadError::bad_password(path, "index.json"));
        assert!(wrapped.is_bad_password());
    }

    #[test]
    fn test_messages_name_archive_and_entry() {
        let error = WriteError::new(
            Path::new("/data/out.zip"),
            "meshes/0.msgpack",
            "disk full",
            StatusCode::WriteError,
        );
        let message = error.to_string();
        assert!(message.contains("/data/out.zip"));
        assert!(message.contains("meshes/0.msgpack"));
        assert!(message.contains("-116"));
    }
}
