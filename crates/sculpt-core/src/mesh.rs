//! 三角网格
//!
//! 每个三角形独占三个顶点（不焊接），法向在组装完成后统一生成。

use crate::geometry::Triangle3;
use crate::math::{Point3, Vector3, EPSILON};
use serde::{Deserialize, Serialize};

/// 超过该单元数时并行计算单元法向
pub const PARALLEL_NORMALS_THRESHOLD: usize = 200_000;

/// 三角网格
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// 顶点坐标
    pub points: Vec<Point3>,
    /// 三角形单元（顶点索引）
    pub cells: Vec<[u32; 3]>,
    /// 顶点法向，与 `points` 等长；未生成时为空
    #[serde(default)]
    pub point_normals: Vec<Vector3>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(triangles: usize) -> Self {
        Self {
            points: Vec::with_capacity(triangles * 3),
            cells: Vec::with_capacity(triangles),
            point_normals: Vec::new(),
        }
    }

    /// 由三角形列表组装网格
    pub fn from_triangles(triangles: &[Triangle3]) -> Self {
        let mut mesh = Self::with_capacity(triangles.len());
        for triangle in triangles {
            mesh.push_triangle(triangle);
        }
        mesh
    }

    /// 追加一个三角形（三个新顶点 + 一个单元）
    pub fn push_triangle(&mut self, triangle: &Triangle3) {
        let base = self.points.len() as u32;
        self.points.extend_from_slice(&triangle.vertices());
        self.cells.push([base, base + 1, base + 2]);
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn has_point_normals(&self) -> bool {
        !self.point_normals.is_empty() && self.point_normals.len() == self.points.len()
    }

    /// 单元的三个顶点
    pub fn cell_points(&self, cell: &[u32; 3]) -> [Point3; 3] {
        [
            self.points[cell[0] as usize],
            self.points[cell[1] as usize],
            self.points[cell[2] as usize],
        ]
    }

    /// 单元法向（单位向量；退化单元为零向量）
    pub fn cell_normals(&self) -> Vec<Vector3> {
        let normal = |cell: &[u32; 3]| {
            let [a, b, c] = self.cell_points(cell);
            (b - a)
                .cross(&(c - a))
                .try_normalize(EPSILON)
                .unwrap_or_else(Vector3::zeros)
        };

        if self.cells.len() >= PARALLEL_NORMALS_THRESHOLD {
            use rayon::prelude::*;
            self.cells.par_iter().map(normal).collect()
        } else {
            self.cells.iter().map(normal).collect()
        }
    }

    /// 生成顶点法向：相邻单元法向之和再归一化
    pub fn generate_point_normals(&mut self) {
        let cell_normals = self.cell_normals();

        let mut normals = vec![Vector3::zeros(); self.points.len()];
        for (cell, normal) in self.cells.iter().zip(&cell_normals) {
            for &index in cell {
                normals[index as usize] += normal;
            }
        }

        for normal in &mut normals {
            *normal = normal.try_normalize(EPSILON).unwrap_or_else(Vector3::zeros);
        }

        self.point_normals = normals;
    }

    /// 所有单元面积之和
    pub fn surface_area(&self) -> f64 {
        self.cells
            .iter()
            .map(|cell| {
                let [a, b, c] = self.cell_points(cell);
                (b - a).cross(&(c - a)).norm() / 2.0
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> Vec<Triangle3> {
        vec![
            Triangle3::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
            ),
            Triangle3::new(
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ),
        ]
    }

    #[test]
    fn test_points_are_not_welded() {
        let mesh = Mesh::from_triangles(&unit_square());
        assert_eq!(mesh.point_count(), 6);
        assert_eq!(mesh.cell_count(), 2);
        assert_eq!(mesh.cells[1], [3, 4, 5]);
        assert_relative_eq!(mesh.surface_area(), 1.0);
    }

    #[test]
    fn test_point_normals() {
        let mut mesh = Mesh::from_triangles(&unit_square());
        assert!(!mesh.has_point_normals());

        mesh.generate_point_normals();
        assert!(mesh.has_point_normals());
        for normal in &mesh.point_normals {
            assert_relative_eq!(*normal, Vector3::z(), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_degenerate_cell_normal_is_zero() {
        let mut mesh = Mesh::new();
        mesh.push_triangle(&Triangle3::new(
            Point3::origin(),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ));
        mesh.generate_point_normals();
        assert_eq!(mesh.point_normals[0], Vector3::zeros());
    }
}
