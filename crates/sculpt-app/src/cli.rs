//! 命令行参数定义

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sculpt_file::{Level, Method};

#[derive(Parser)]
#[command(
    name = "sculpt",
    version,
    about = "Sculpt - lasso extrusion and archive tooling",
    long_about = "Pack and unpack STORE/DEFLATE/ZSTD archives with optional AES-256 encryption,\n\
                  and replay lasso scripts into extruded mesh sessions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file (archive, extruder and camera sections).
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Pack every file of a directory into an archive.
    Pack(PackArgs),

    /// Extract every entry of an archive into a directory.
    Unpack(UnpackArgs),

    /// List the entries of an archive.
    List(ListArgs),

    /// Replay a lasso script and save the extruded meshes as a session.
    Lasso(LassoArgs),
}

#[derive(Parser)]
pub struct PackArgs {
    /// Directory to pack.
    #[arg(value_name = "DIR")]
    pub source: PathBuf,

    /// Archive to create.
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Archive format (filesystem, compatible, optimized).
    #[arg(long)]
    pub format: Option<String>,

    /// Encrypt every entry with this password.
    #[arg(long)]
    pub password: Option<String>,

    /// Compression method (default, store, deflate, zstd).
    #[arg(long, default_value = "default")]
    pub method: Method,

    /// Compression level (default, fast, best, ultra).
    #[arg(long, default_value = "default")]
    pub level: Level,
}

#[derive(Parser)]
pub struct UnpackArgs {
    /// Archive to extract.
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Output directory.
    #[arg(value_name = "DIR")]
    pub output: PathBuf,

    /// Archive format (filesystem, compatible, optimized).
    #[arg(long)]
    pub format: Option<String>,

    /// Password of encrypted entries.
    #[arg(long)]
    pub password: Option<String>,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Archive to inspect.
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Archive format (filesystem, compatible, optimized).
    #[arg(long)]
    pub format: Option<String>,
}

#[derive(Parser)]
pub struct LassoArgs {
    /// Script with one interaction per line (click x,y / drag x,y / release / validate ...).
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Session archive to write.
    #[arg(value_name = "SESSION")]
    pub session: PathBuf,

    /// Encrypt the session with this password.
    #[arg(long)]
    pub password: Option<String>,
}
