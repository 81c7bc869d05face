//! 会话文件
//!
//! 把模型序列保存到一个归档中：
//! - `index.json`：版本号与重建结果列表（名称 + 网格条目）
//! - `meshes/<n>.msgpack`：MessagePack 编码的网格
//!
//! 密码（如果有）应用到每一个条目。

use crate::archive::ArchiveFormat;
use crate::compression::{Level, Method};
use crate::error::SessionError;
use crate::reader::ArchiveReader;
use crate::writer::ArchiveWriter;
use sculpt_core::mesh::Mesh;
use sculpt_core::model_series::{ModelSeries, Reconstruction};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// 索引条目名
pub const INDEX_ENTRY: &str = "index.json";

/// 当前会话格式版本
const SESSION_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SessionIndex {
    version: u32,
    reconstructions: Vec<IndexEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    organ_name: String,
    /// 网格条目名
    mesh: String,
}

fn mesh_entry(index: usize) -> String {
    format!("meshes/{}.msgpack", index)
}

/// 保存模型序列
pub fn save(
    series: &ModelSeries,
    path: &Path,
    format: ArchiveFormat,
    password: &str,
) -> Result<(), SessionError> {
    let mut writer = ArchiveWriter::get(path, format)?;

    let mut index = SessionIndex {
        version: SESSION_VERSION,
        reconstructions: Vec::with_capacity(series.len()),
    };

    for (n, reconstruction) in series.reconstructions().iter().enumerate() {
        let entry = mesh_entry(n);
        let data = rmp_serde::to_vec_named(reconstruction.mesh.as_ref())?;
        writer.write_file(&entry, &data, password, Method::Default, Level::Default)?;

        index.reconstructions.push(IndexEntry {
            organ_name: reconstruction.organ_name.clone(),
            mesh: entry,
        });
    }

    let index_data = serde_json::to_vec_pretty(&index)?;
    writer.write_file(INDEX_ENTRY, &index_data, password, Method::Default, Level::Default)?;
    writer.close()?;

    tracing::info!(
        "Saved {} reconstructions to {}",
        index.reconstructions.len(),
        path.display()
    );

    Ok(())
}

/// 加载模型序列
pub fn load(path: &Path, format: ArchiveFormat, password: &str) -> Result<ModelSeries, SessionError> {
    let mut reader = ArchiveReader::get(path, format)?;

    let index_data = reader.read_file(INDEX_ENTRY, password)?;
    let index: SessionIndex = serde_json::from_slice(&index_data)?;

    if index.version > SESSION_VERSION {
        return Err(SessionError::UnsupportedVersion(format!(
            "Session version {} is newer than supported version {}",
            index.version, SESSION_VERSION
        )));
    }

    let mut reconstructions = Vec::with_capacity(index.reconstructions.len());
    for entry in index.reconstructions {
        let data = reader.read_file(&entry.mesh, password)?;
        let mesh: Mesh = rmp_serde::from_slice(&data)?;
        validate_mesh(&entry.organ_name, &mesh)?;

        reconstructions.push(Arc::new(Reconstruction {
            organ_name: entry.organ_name,
            mesh: Arc::new(mesh),
        }));
    }

    let mut series = ModelSeries::new();
    series.set_reconstructions(reconstructions);

    tracing::info!(
        "Loaded {} reconstructions from {}",
        series.len(),
        path.display()
    );

    Ok(series)
}

fn validate_mesh(name: &str, mesh: &Mesh) -> Result<(), SessionError> {
    let point_count = mesh.points.len();
    if let Some(cell) = mesh
        .cells
        .iter()
        .find(|cell| cell.iter().any(|&index| index as usize >= point_count))
    {
        return Err(SessionError::InvalidContent(format!(
            "Mesh '{}' references point {:?} but has only {} points",
            name, cell, point_count
        )));
    }

    if !mesh.point_normals.is_empty() && mesh.point_normals.len() != point_count {
        return Err(SessionError::InvalidContent(format!(
            "Mesh '{}' has {} normals for {} points",
            name,
            mesh.point_normals.len(),
            point_count
        )));
    }

    Ok(())
}
