//! 套索拉伸
//!
//! 近平面与远平面上的两条等长折线分别剖分成端面，再用侧壁四边形（沿对角线拆成两个三角形）连接，
//! 得到一个棱柱状网格。非拉伸模式只生成近平面端面。

use crate::geometry::Triangle3;
use crate::math::{Matrix4, Point3};
use crate::mesh::Mesh;
use crate::model_series::{ModelSeries, Reconstruction};
use crate::triangulation::triangulate_planar;
use std::sync::Arc;

/// 新重建结果的名称前缀
pub const EXTRUDED_MESH_PREFIX: &str = "ExtrudedMesh_";

/// 一次拉伸的输入快照
#[derive(Debug, Clone, Copy)]
pub struct Extrusion<'a> {
    pub near: &'a [Point3],
    pub far: &'a [Point3],
    /// 点位被采样时的视图矩阵
    pub view: &'a Matrix4,
    pub extrude: bool,
}

impl<'a> Extrusion<'a> {
    pub fn new(near: &'a [Point3], far: &'a [Point3], view: &'a Matrix4, extrude: bool) -> Self {
        Self {
            near,
            far,
            view,
            extrude,
        }
    }

    /// 端面 + 侧壁三角形
    pub fn triangles(&self) -> Vec<Triangle3> {
        let size = self.near.len().min(self.far.len());
        if self.near.len() != self.far.len() {
            tracing::warn!(
                "Near and far outlines differ in length ({} / {}), truncating to {}",
                self.near.len(),
                self.far.len(),
                size
            );
        }

        let near = &self.near[..size];
        let far = &self.far[..size];

        let mut triangles = Vec::new();
        match size {
            0..=2 => return triangles,
            3 => {
                triangles.push(Triangle3::new(near[0], near[1], near[2]));
                if self.extrude {
                    triangles.push(Triangle3::new(far[0], far[1], far[2]));
                }
            }
            _ => {
                triangles.extend(triangulate_planar(near, self.view));
                if self.extrude {
                    triangles.extend(triangulate_planar(far, self.view));
                }
            }
        }

        if self.extrude {
            for i0 in 0..size {
                let i1 = (i0 + 1) % size;
                triangles.push(Triangle3::new(near[i0], far[i0], far[i1]));
                triangles.push(Triangle3::new(near[i0], far[i1], near[i1]));
            }
        }

        triangles
    }

    /// 组装网格并生成顶点法向
    pub fn build_mesh(&self) -> Mesh {
        let mut mesh = Mesh::from_triangles(&self.triangles());
        mesh.generate_point_normals();
        mesh
    }

    /// 生成网格并作为新的重建结果追加到模型序列
    pub fn append_to(&self, series: &mut ModelSeries) -> Arc<Reconstruction> {
        let mesh = self.build_mesh();
        let name = format!("{}{}", EXTRUDED_MESH_PREFIX, series.len());

        tracing::info!(
            "Created {} with {} triangles",
            name,
            mesh.cell_count()
        );

        series.push(Reconstruction::new(name, mesh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;
    use crate::model_series::ModelSeriesEvent;

    fn view() -> Matrix4 {
        Matrix4::look_at_rh(&Point3::new(0.0, 0.0, 10.0), &Point3::origin(), &Vector3::y())
    }

    fn polygon(k: usize, z: f64, scale: f64) -> Vec<Point3> {
        (0..k)
            .map(|i| {
                let angle = 2.0 * std::f64::consts::PI * i as f64 / k as f64 + 0.3;
                Point3::new(scale * angle.cos(), scale * angle.sin(), z)
            })
            .collect()
    }

    #[test]
    fn test_extruded_counts() {
        let view = view();
        for k in 3..10 {
            let near = polygon(k, 9.9, 1.0);
            let far = polygon(k, -90.0, 100.0);

            let mesh = Extrusion::new(&near, &far, &view, true).build_mesh();
            assert_eq!(mesh.point_count(), 3 * (2 * (k - 2) + 2 * k), "k = {}", k);
            assert_eq!(mesh.cell_count() * 3, mesh.point_count());
            assert_eq!(mesh.point_normals.len(), mesh.point_count());
        }
    }

    #[test]
    fn test_flat_mode_only_has_near_cap() {
        let view = view();
        let near = polygon(6, 9.9, 1.0);
        let far = polygon(6, -90.0, 100.0);

        let triangles = Extrusion::new(&near, &far, &view, false).triangles();
        assert_eq!(triangles.len(), 4);
        assert!(triangles
            .iter()
            .flat_map(|t| t.vertices())
            .all(|v| (v.z - 9.9).abs() < 1e-9));
    }

    #[test]
    fn test_too_few_points() {
        let view = view();
        let near = polygon(2, 9.9, 1.0);
        assert!(Extrusion::new(&near, &near, &view, true).triangles().is_empty());
    }

    #[test]
    fn test_append_names_and_notifies() {
        let view = view();
        let near = polygon(4, 9.9, 1.0);
        let far = polygon(4, -90.0, 100.0);

        let mut series = ModelSeries::new();
        let events = series.subscribe();

        let first = Extrusion::new(&near, &far, &view, true).append_to(&mut series);
        let second = Extrusion::new(&near, &far, &view, true).append_to(&mut series);

        assert_eq!(first.organ_name, "ExtrudedMesh_0");
        assert_eq!(second.organ_name, "ExtrudedMesh_1");
        assert_eq!(series.len(), 2);
        assert!(matches!(
            events.try_recv(),
            Ok(ModelSeriesEvent::ReconstructionsAdded(list)) if list.len() == 1
        ));
    }
}
