//! 压缩参数映射
//!
//! (方法, 等级) 到后端数值参数的映射是纯函数；遗留压缩开关只在进程内读取一次环境变量。

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use zip::CompressionMethod;

/// 强制使用 DEFLATE 的环境变量
pub const LEGACY_COMPRESSION_ENV: &str = "SCULPT_LEGACY_COMPRESSION";

/// 压缩方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// 使用容器默认方法
    #[default]
    Default,
    Store,
    Deflate,
    Zstd,
}

/// 压缩等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Default,
    Fast,
    Best,
    Ultra,
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Method::Default),
            "store" => Ok(Method::Store),
            "deflate" => Ok(Method::Deflate),
            "zstd" => Ok(Method::Zstd),
            other => Err(format!("unknown compression method '{}'", other)),
        }
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(Level::Default),
            "fast" => Ok(Level::Fast),
            "best" => Ok(Level::Best),
            "ultra" => Ok(Level::Ultra),
            other => Err(format!("unknown compression level '{}'", other)),
        }
    }
}

/// 解析后的后端参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compression {
    pub method: CompressionMethod,
    /// `None` 表示不设置等级（STORE）
    pub level: Option<i64>,
}

fn deflate_level(level: Level) -> i64 {
    match level {
        Level::Fast => 1,
        Level::Default => 6,
        Level::Best | Level::Ultra => 9,
    }
}

fn zstd_level(level: Level) -> i64 {
    match level {
        Level::Fast => 1,
        Level::Default => 3,
        Level::Best => 19,
        Level::Ultra => 22,
    }
}

/// 把 (方法, 等级) 映射到后端参数
///
/// `container_default` 是 `Method::Default` 时采用的方法，本身不能是 `Default`（按 ZSTD 处理）。
/// `legacy` 为真时 ZSTD 降级为 DEFLATE，STORE 不受影响。
pub fn resolve_compression(
    method: Method,
    level: Level,
    container_default: Method,
    legacy: bool,
) -> Compression {
    let mut method = match method {
        Method::Default => container_default,
        other => other,
    };
    if method == Method::Default {
        method = Method::Zstd;
    }
    if legacy && method == Method::Zstd {
        method = Method::Deflate;
    }

    match method {
        Method::Store => Compression {
            method: CompressionMethod::Stored,
            level: None,
        },
        Method::Deflate => Compression {
            method: CompressionMethod::Deflated,
            level: Some(deflate_level(level)),
        },
        Method::Zstd | Method::Default => Compression {
            method: CompressionMethod::Zstd,
            level: Some(zstd_level(level)),
        },
    }
}

fn parse_toggle(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// 遗留压缩开关（进程内只读取一次）
pub fn legacy_compression() -> bool {
    static LEGACY: OnceLock<bool> = OnceLock::new();
    *LEGACY.get_or_init(|| {
        let enabled = std::env::var(LEGACY_COMPRESSION_ENV)
            .map(|value| parse_toggle(&value))
            .unwrap_or(false);
        if enabled {
            tracing::info!("Legacy compression enabled, ZSTD entries are written as DEFLATE");
        }
        enabled
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zstd_levels() {
        let resolve = |level| resolve_compression(Method::Zstd, level, Method::Zstd, false);
        assert_eq!(resolve(Level::Fast).level, Some(1));
        assert_eq!(resolve(Level::Default).level, Some(3));
        assert_eq!(resolve(Level::Best).level, Some(19));
        assert_eq!(resolve(Level::Ultra).level, Some(22));
        assert_eq!(resolve(Level::Ultra).method, CompressionMethod::Zstd);
    }

    #[test]
    fn test_default_method_follows_container() {
        let compatible = resolve_compression(Method::Default, Level::Default, Method::Deflate, false);
        assert_eq!(compatible.method, CompressionMethod::Deflated);
        assert_eq!(compatible.level, Some(6));

        let optimized = resolve_compression(Method::Default, Level::Best, Method::Zstd, false);
        assert_eq!(optimized.method, CompressionMethod::Zstd);
        assert_eq!(optimized.level, Some(19));
    }

    #[test]
    fn test_store_has_no_level() {
        let store = resolve_compression(Method::Store, Level::Ultra, Method::Zstd, false);
        assert_eq!(store.method, CompressionMethod::Stored);
        assert_eq!(store.level, None);
    }

    #[test]
    fn test_legacy_override() {
        let zstd = resolve_compression(Method::Zstd, Level::Ultra, Method::Zstd, true);
        assert_eq!(zstd.method, CompressionMethod::Deflated);
        assert_eq!(zstd.level, Some(9));

        let store = resolve_compression(Method::Store, Level::Default, Method::Zstd, true);
        assert_eq!(store.method, CompressionMethod::Stored);
    }

    #[test]
    fn test_parse_toggle() {
        for value in ["1", "true", "YES", " on "] {
            assert!(parse_toggle(value), "{}", value);
        }
        for value in ["", "0", "false", "off", "maybe"] {
            assert!(!parse_toggle(value), "{}", value);
        }
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("zstd".parse::<Method>(), Ok(Method::Zstd));
        assert_eq!("ultra".parse::<Level>(), Ok(Level::Ultra));
        assert!("lzma".parse::<Method>().is_err());
    }
}
