//! 子命令实现

use std::fs::File;
use std::io;

use anyhow::{Context, Result};
use sculpt_core::model_series::ModelSeries;
use sculpt_file::{
    collect_files, session, ArchiveError, ArchiveReader, ArchiveWriter, ReadError, SessionError,
};
use sculpt_ui::{ActionContext, ShapeExtruder};
use tracing::info;

use crate::cli::{LassoArgs, ListArgs, PackArgs, UnpackArgs};
use crate::config::AppConfig;
use crate::script::{parse_script, replay};

pub fn run_pack(args: &PackArgs, config: &AppConfig) -> Result<()> {
    let format = config.format_or(args.format.as_deref());
    let password = config.password_or(args.password.as_deref());

    let files = collect_files(&args.source)
        .with_context(|| format!("Failed to scan {}", args.source.display()))?;
    let mut writer = ArchiveWriter::get(&args.archive, format)?;

    for (name, path) in &files {
        let mut source =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        let mut entry = writer.open_file(name, password, args.method, args.level)?;
        io::copy(&mut source, &mut entry).with_context(|| format!("Failed to pack {}", name))?;
    }
    writer.close()?;

    info!(
        "Packed {} files into {} ({})",
        files.len(),
        args.archive.display(),
        format
    );
    Ok(())
}

pub fn run_unpack(args: &UnpackArgs, config: &AppConfig) -> Result<()> {
    let format = config.format_or(args.format.as_deref());
    let password = config.password_or(args.password.as_deref());

    let mut reader = ArchiveReader::get(&args.archive, format)?;
    let extracted = reader.extract_all_to(&args.output, password)?;

    info!(
        "Extracted {} files to {}",
        extracted.len(),
        args.output.display()
    );
    Ok(())
}

pub fn run_list(args: &ListArgs, config: &AppConfig) -> Result<()> {
    let format = config.format_or(args.format.as_deref());
    let reader = ArchiveReader::get(&args.archive, format)?;

    for entry in reader.entries()? {
        println!("{}", entry);
    }
    Ok(())
}

pub fn run_lasso(args: &LassoArgs, config: &AppConfig) -> Result<()> {
    let text = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let steps = parse_script(&text)?;

    let mut models = ModelSeries::new();
    let mut extruder = ShapeExtruder::new(config.extruder.clone());
    let created = {
        let mut ctx = ActionContext::new(&config.camera, &mut models);
        replay(&steps, &mut extruder, &mut ctx)?
    };
    info!("Replayed {} steps, {} meshes created", steps.len(), created);

    let password = config.password_or(args.password.as_deref());
    session::save(&models, &args.session, config.archive.format, password)?;
    Ok(())
}

/// 错误链中是否有密码错误
pub fn is_bad_password(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<ReadError>()
            .is_some_and(ReadError::is_bad_password)
            || cause
                .downcast_ref::<ArchiveError>()
                .is_some_and(ArchiveError::is_bad_password)
            || cause
                .downcast_ref::<SessionError>()
                .is_some_and(SessionError::is_bad_password)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sculpt_file::{ArchiveFormat, Level, Method};
    use std::fs;

    fn pack_args(source: &std::path::Path, archive: &std::path::Path, password: Option<&str>) -> PackArgs {
        PackArgs {
            source: source.to_path_buf(),
            archive: archive.to_path_buf(),
            format: None,
            password: password.map(str::to_string),
            method: Method::Default,
            level: Level::Default,
        }
    }

    #[test]
    fn test_pack_unpack_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        fs::create_dir_all(source.join("nested")).unwrap();
        fs::write(source.join("a.txt"), b"alpha").unwrap();
        fs::write(source.join("nested/b.bin"), vec![7u8; 4096]).unwrap();

        let config = AppConfig::default();
        let archive = dir.path().join("packed.zip");
        run_pack(&pack_args(&source, &archive, None), &config).unwrap();

        let reader = ArchiveReader::get(&archive, ArchiveFormat::Optimized).unwrap();
        let mut entries = reader.entries().unwrap();
        entries.sort();
        assert_eq!(entries, vec!["a.txt", "nested/b.bin"]);
        drop(reader);

        let output = dir.path().join("output");
        let unpack = UnpackArgs {
            archive: archive.clone(),
            output: output.clone(),
            format: None,
            password: None,
        };
        run_unpack(&unpack, &config).unwrap();
        assert_eq!(fs::read(output.join("a.txt")).unwrap(), b"alpha");
        assert_eq!(fs::read(output.join("nested/b.bin")).unwrap(), vec![7u8; 4096]);
    }

    #[test]
    fn test_wrong_password_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("secret.txt"), b"hidden").unwrap();

        let config = AppConfig::default();
        let archive = dir.path().join("secret.zip");
        run_pack(&pack_args(&source, &archive, Some("secret")), &config).unwrap();

        let unpack = UnpackArgs {
            archive,
            output: dir.path().join("output"),
            format: None,
            password: None,
        };
        let error = run_unpack(&unpack, &config).unwrap_err();
        assert!(is_bad_password(&error));
    }

    #[test]
    fn test_lasso_session() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("square.lasso");
        fs::write(
            &script,
            "enable\nclick 0,0\nclick 10,0\nclick 10,10\nclick 0,10\nvalidate\n",
        )
        .unwrap();

        let args = LassoArgs {
            script,
            session: dir.path().join("session.zip"),
            password: None,
        };
        run_lasso(&args, &AppConfig::default()).unwrap();

        let loaded = session::load(&args.session, ArchiveFormat::Optimized, "").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.reconstructions()[0].mesh.cell_count(), 12);
    }
}
