//! Sculpt 文件格式处理
//!
//! 支持：
//! - 目录归档与 zip 归档（STORE / DEFLATE / ZSTD，可选 AES-256 加密）
//! - 同一路径的归档在进程内只能同时打开一次
//! - 模型序列的会话文件（`index.json` + MessagePack 网格）

pub mod archive;
pub mod compression;
pub mod error;
pub mod reader;
pub mod session;
pub mod writer;

pub use archive::{normalize_path, Archive, ArchiveFormat, ArchiveRegistry};
pub use compression::{legacy_compression, resolve_compression, Compression, Level, Method};
pub use error::{ArchiveError, ReadError, SessionError, StatusCode, WriteError};
pub use reader::ArchiveReader;
pub use writer::{collect_files, ArchiveWriter};
