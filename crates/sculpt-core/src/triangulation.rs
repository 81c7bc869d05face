//! 约束 Delaunay 三角剖分
//!
//! 对一个闭合多边形（最后一点与第一点相连）做 Bowyer-Watson 增量剖分，然后尽力恢复
//! 缺失的边界线段，最后只保留多边形内部的三角形。
//!
//! 流程：
//! 1. 构造包含所有点的超级三角形（包围盒外扩 [`SUPER_TRIANGLE_MARGIN`]）
//! 2. 逐点 Bowyer-Watson 插入
//! 3. 边界恢复：缺失的线段插入中点并递归两半，深度上限 [`CONSTRAINT_MAX_DEPTH`]，
//!    整圈扫描最多 [`CONSTRAINT_MAX_PASSES`] 次
//! 4. 删除含超级三角形顶点的三角形
//! 5. 删除重心位于多边形外的三角形（射线奇偶测试）
//!
//! 边界恢复是尽力而为的：高度非凸或接近退化的多边形可能仍缺少部分边界线段。

use crate::geometry::{Edge2, Triangle2, Triangle3, TriangleId};
use crate::math::{cross2, transform_point, BoundingBox2, Matrix4, Point2, Point3};

/// 超级三角形相对包围盒的外扩距离
pub const SUPER_TRIANGLE_MARGIN: f64 = 1.0;

/// 单条线段恢复的最大递归深度
pub const CONSTRAINT_MAX_DEPTH: u32 = 5;

/// 边界整圈扫描的最大次数
pub const CONSTRAINT_MAX_PASSES: usize = 3;

/// 以 id 为下标的三角形 arena
///
/// 删除只清空槽位，id 永不复用。
#[derive(Debug, Clone, Default)]
pub struct TriangleArena {
    slots: Vec<Option<Triangle2>>,
    live: usize,
}

impl TriangleArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, a: Point2, b: Point2, c: Point2) -> TriangleId {
        let id = TriangleId(self.slots.len());
        self.slots.push(Some(Triangle2::new(id, a, b, c)));
        self.live += 1;
        id
    }

    pub fn remove(&mut self, id: TriangleId) -> Option<Triangle2> {
        let removed = self.slots.get_mut(id.0).and_then(Option::take);
        if removed.is_some() {
            self.live -= 1;
        }
        removed
    }

    pub fn get(&self, id: TriangleId) -> Option<&Triangle2> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Triangle2> {
        self.slots.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// 剖分中是否存在该边
    pub fn contains_edge(&self, edge: &Edge2) -> bool {
        self.iter().any(|triangle| triangle.has_edge(edge))
    }

    /// Bowyer-Watson 插入一个点
    ///
    /// 外接圆包含该点的三角形构成空腔，空腔边界上不被其他坏三角形共享的边与新点相连。
    pub fn insert_point(&mut self, point: Point2) {
        let bad: Vec<TriangleId> = self
            .iter()
            .filter(|triangle| triangle.circumcircle_contains(&point))
            .map(|triangle| triangle.id)
            .collect();

        let mut cavity = Vec::new();
        for &id in &bad {
            let Some(triangle) = self.get(id) else {
                continue;
            };

            for edge in triangle.edges() {
                let shared = bad
                    .iter()
                    .filter(|&&other| other != id)
                    .filter_map(|&other| self.get(other))
                    .any(|other| other.has_edge(&edge));

                if !shared {
                    cavity.push(edge);
                }
            }
        }

        for id in bad {
            self.remove(id);
        }

        for edge in cavity {
            self.insert(edge.a, edge.b, point);
        }
    }
}

/// 二维多边形剖分结果
#[derive(Debug, Clone, Default)]
pub struct PolygonTriangulation {
    /// 多边形内部的三角形
    pub triangles: Vec<Triangle2>,
    /// 边界恢复插入的点
    pub steiner_points: Vec<Point2>,
    /// 恢复结束后仍缺失的边界线段数
    pub missing_segments: usize,
}

/// 覆盖包围盒的直角超级三角形
///
/// 第一个顶点是左下角，同时用作内外测试的外部参考点。
fn super_triangle(points: &[Point2]) -> [Point2; 3] {
    let bbox = BoundingBox2::from_points(points.iter().copied()).inflated(SUPER_TRIANGLE_MARGIN);

    let bottom_left = bbox.min;
    let bottom_right = Point2::new(bbox.min.x + bbox.width() * 2.0, bbox.min.y);
    let top_left = Point2::new(bbox.min.x, bbox.min.y + bbox.height() * 2.0);
    [bottom_left, bottom_right, top_left]
}

/// 递归恢复一条线段，返回插入的中点（按线段方向排列）
pub fn recover_segment(arena: &mut TriangleArena, edge: Edge2, depth: u32) -> Vec<Point2> {
    if depth >= CONSTRAINT_MAX_DEPTH || arena.contains_edge(&edge) {
        return Vec::new();
    }

    let midpoint = edge.midpoint();
    arena.insert_point(midpoint);

    let mut added = recover_segment(arena, Edge2::new(edge.a, midpoint), depth + 1);
    added.push(midpoint);
    added.extend(recover_segment(arena, Edge2::new(midpoint, edge.b), depth + 1));
    added
}

/// 射线奇偶测试
///
/// 从 `origin` 到 `outside` 的线段与多边形边界相交次数为奇数时返回 true。
/// 端点按射线所在直线的两侧分类（恰好在直线上的顶点归入非正侧），
/// 射线穿过多边形顶点时计数仍然正确。
pub fn polygon_contains(polygon: &[Point2], origin: &Point2, outside: &Point2) -> bool {
    let direction = outside - origin;
    let length_squared = direction.norm_squared();
    if length_squared == 0.0 {
        return false;
    }

    let side = |point: &Point2| cross2(&direction, &(point - origin));

    let mut inside = false;
    for (index, current) in polygon.iter().enumerate() {
        let previous = &polygon[(index + polygon.len() - 1) % polygon.len()];

        let previous_side = side(previous);
        let current_side = side(current);
        if (previous_side > 0.0) == (current_side > 0.0) {
            continue;
        }

        let u = previous_side / (previous_side - current_side);
        let crossing = previous + (current - previous) * u;
        let t = (crossing - origin).dot(&direction) / length_squared;
        if (0.0..=1.0).contains(&t) {
            inside = !inside;
        }
    }

    inside
}

/// 剖分二维闭合多边形
pub fn triangulate_polygon(points: &[Point2]) -> PolygonTriangulation {
    if points.len() < 3 {
        return PolygonTriangulation::default();
    }

    let super_vertices = super_triangle(points);
    let mut arena = TriangleArena::new();
    arena.insert(super_vertices[0], super_vertices[1], super_vertices[2]);

    for &point in points {
        arena.insert_point(point);
    }

    // 边界恢复：每一圈都在上一圈细分后的边界上进行
    let mut boundary = points.to_vec();
    let mut steiner_points = Vec::new();
    for _ in 0..CONSTRAINT_MAX_PASSES {
        let mut refined = Vec::with_capacity(boundary.len());
        for (index, &current) in boundary.iter().enumerate() {
            let previous = boundary[(index + boundary.len() - 1) % boundary.len()];
            let added = recover_segment(&mut arena, Edge2::new(previous, current), 0);

            refined.push(previous);
            steiner_points.extend_from_slice(&added);
            refined.extend(added);
        }

        let grown = refined.len() != boundary.len();
        boundary = refined;
        if !grown {
            break;
        }
    }

    let missing_segments = (0..boundary.len())
        .filter(|&index| {
            let previous = boundary[(index + boundary.len() - 1) % boundary.len()];
            !arena.contains_edge(&Edge2::new(previous, boundary[index]))
        })
        .count();

    if missing_segments > 0 {
        tracing::debug!(
            "Constraint recovery left {} boundary segments missing",
            missing_segments
        );
    }

    let outside = super_vertices[0];
    let triangles: Vec<Triangle2> = arena
        .iter()
        .filter(|triangle| !super_vertices.iter().any(|v| triangle.has_vertex(v)))
        .filter(|triangle| !triangle.is_degenerate())
        .filter(|triangle| polygon_contains(points, &triangle.barycenter, &outside))
        .copied()
        .collect();

    PolygonTriangulation {
        triangles,
        steiner_points,
        missing_segments,
    }
}

/// 剖分一组共面的三维点
///
/// 点先变换到视图空间（同一深度的平面），在 xy 平面剖分，再用逆视图矩阵映射回世界坐标。
pub fn triangulate_planar(points: &[Point3], view: &Matrix4) -> Vec<Triangle3> {
    if points.len() < 3 {
        return Vec::new();
    }

    let Some(inverse) = view.try_inverse() else {
        tracing::warn!("View matrix is not invertible, skipping triangulation");
        return Vec::new();
    };

    let projected: Vec<Point2> = points
        .iter()
        .map(|point| {
            let view_point = transform_point(view, point);
            Point2::new(view_point.x, view_point.y)
        })
        .collect();

    let depth = transform_point(view, &points[0]).z;

    let result = triangulate_polygon(&projected);
    tracing::debug!(
        "Triangulated {} points into {} triangles ({} inserted)",
        points.len(),
        result.triangles.len(),
        result.steiner_points.len()
    );

    let lift = |point: &Point2| transform_point(&inverse, &Point3::new(point.x, point.y, depth));

    result
        .triangles
        .iter()
        .map(|triangle| Triangle3::new(lift(&triangle.a), lift(&triangle.b), lift(&triangle.c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;
    use approx::assert_relative_eq;

    fn total_area(triangles: &[Triangle2]) -> f64 {
        triangles.iter().map(Triangle2::area).sum()
    }

    fn covers_exactly(triangles: &[Triangle2], points: &[Point2]) -> bool {
        let all_used = triangles
            .iter()
            .flat_map(|t| t.vertices())
            .all(|v| points.contains(&v));
        let all_present = points
            .iter()
            .all(|p| triangles.iter().any(|t| t.has_vertex(p)));
        all_used && all_present
    }

    #[test]
    fn test_arena_ids_are_not_reused() {
        let mut arena = TriangleArena::new();
        let first = arena.insert(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0));
        let second = arena.insert(Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0));
        assert_ne!(first, second);

        assert!(arena.remove(first).is_some());
        assert!(arena.remove(first).is_none());
        let third = arena.insert(Point2::new(0.0, 0.0), Point2::new(2.0, 0.0), Point2::new(0.0, 2.0));
        assert!(third > second);
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_bowyer_watson_keeps_a_partition() {
        let mut arena = TriangleArena::new();
        arena.insert(Point2::new(-10.0, -10.0), Point2::new(30.0, -10.0), Point2::new(-10.0, 30.0));

        arena.insert_point(Point2::new(1.0, 1.0));
        // 一个内部点把超级三角形分成三块
        assert_eq!(arena.len(), 3);

        arena.insert_point(Point2::new(4.0, 2.0));
        let area: f64 = arena.iter().map(Triangle2::area).sum();
        assert_relative_eq!(area, 40.0 * 40.0 / 2.0, max_relative = 1e-9);
    }

    #[test]
    fn test_square() {
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let result = triangulate_polygon(&square);

        assert_eq!(result.triangles.len(), 2);
        assert!(covers_exactly(&result.triangles, &square));
        assert_relative_eq!(total_area(&result.triangles), 100.0, max_relative = 1e-9);
        assert_eq!(result.missing_segments, 0);
    }

    #[test]
    fn test_convex_polygons() {
        for k in 3..12 {
            let polygon: Vec<Point2> = (0..k)
                .map(|i| {
                    let angle = 2.0 * std::f64::consts::PI * i as f64 / k as f64 + 0.1;
                    Point2::new(10.0 * angle.cos(), 6.0 * angle.sin())
                })
                .collect();

            let result = triangulate_polygon(&polygon);
            assert_eq!(result.triangles.len(), k - 2, "k = {}", k);
            assert!(covers_exactly(&result.triangles, &polygon), "k = {}", k);
        }
    }

    #[test]
    fn test_regular_polygons() {
        // 所有顶点共圆
        for k in [4, 6, 8, 12] {
            let polygon: Vec<Point2> = (0..k)
                .map(|i| {
                    let angle = 2.0 * std::f64::consts::PI * i as f64 / k as f64 + 0.3;
                    Point2::new(angle.cos(), angle.sin())
                })
                .collect();

            let result = triangulate_polygon(&polygon);
            assert_eq!(result.triangles.len(), k - 2, "k = {}", k);
            assert!(covers_exactly(&result.triangles, &polygon), "k = {}", k);
        }
    }

    #[test]
    fn test_concave_polygons() {
        let l_shape = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 4.0),
            Point2::new(4.0, 4.0),
            Point2::new(4.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let result = triangulate_polygon(&l_shape);
        assert_eq!(result.triangles.len(), 4);
        assert_relative_eq!(total_area(&result.triangles), 64.0, max_relative = 1e-9);

        let u_shape = [
            Point2::new(0.0, 0.0),
            Point2::new(9.0, 0.0),
            Point2::new(9.0, 9.0),
            Point2::new(6.0, 9.0),
            Point2::new(6.0, 3.0),
            Point2::new(3.0, 3.0),
            Point2::new(3.0, 9.0),
            Point2::new(0.0, 9.0),
        ];
        let result = triangulate_polygon(&u_shape);
        assert_eq!(result.triangles.len(), 6);
        assert_relative_eq!(total_area(&result.triangles), 63.0, max_relative = 1e-9);
    }

    #[test]
    fn test_segment_recovery() {
        let mut arena = TriangleArena::new();
        arena.insert(
            Point2::new(-100.0, -100.0),
            Point2::new(300.0, -100.0),
            Point2::new(-100.0, 300.0),
        );
        for point in [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(5.0, 1.0),
            Point2::new(5.0, -1.0),
        ] {
            arena.insert_point(point);
        }

        let segment = Edge2::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        // Delaunay 选择了短对角线
        assert!(!arena.contains_edge(&segment));

        let added = recover_segment(&mut arena, segment, 0);
        assert_eq!(added, vec![Point2::new(5.0, 0.0)]);
        assert!(arena.contains_edge(&Edge2::new(Point2::new(0.0, 0.0), Point2::new(5.0, 0.0))));
        assert!(arena.contains_edge(&Edge2::new(Point2::new(5.0, 0.0), Point2::new(10.0, 0.0))));
    }

    #[test]
    fn test_segment_recovery_depth_bound() {
        let mut arena = TriangleArena::new();
        arena.insert(Point2::new(-10.0, -10.0), Point2::new(30.0, -10.0), Point2::new(-10.0, 30.0));
        let before = arena.len();

        let segment = Edge2::new(Point2::new(0.0, 0.0), Point2::new(7.0, 3.0));
        let added = recover_segment(&mut arena, segment, CONSTRAINT_MAX_DEPTH);
        assert!(added.is_empty());
        assert_eq!(arena.len(), before);

        // 一条线段最多插入 2^depth - 1 个点
        let added = recover_segment(&mut arena, segment, 0);
        assert!(added.len() < 1 << CONSTRAINT_MAX_DEPTH);
    }

    #[test]
    fn test_polygon_contains_through_vertex() {
        let square = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let outside = Point2::new(-1.0, -1.0);

        // 射线恰好穿过顶点 (0, 0)
        assert!(polygon_contains(&square, &Point2::new(10.0 / 3.0, 10.0 / 3.0), &outside));
        assert!(polygon_contains(&square, &Point2::new(5.0, 5.0), &outside));
        assert!(!polygon_contains(&square, &Point2::new(12.0, 5.0), &outside));
    }

    #[test]
    fn test_degenerate_input() {
        assert!(triangulate_polygon(&[]).triangles.is_empty());
        assert!(triangulate_polygon(&[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)])
            .triangles
            .is_empty());

        // 共线输入不崩溃
        let collinear = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(3.0, 0.0),
        ];
        let result = triangulate_polygon(&collinear);
        assert!(result.triangles.iter().all(|t| !t.is_degenerate()));
    }

    #[test]
    fn test_planar_roundtrip_to_world() {
        let view = Matrix4::look_at_rh(
            &Point3::new(0.0, 0.0, 10.0),
            &Point3::origin(),
            &Vector3::y(),
        );
        let points = [
            Point3::new(0.0, 0.0, 2.0),
            Point3::new(4.0, 0.0, 2.0),
            Point3::new(4.0, 3.0, 2.0),
            Point3::new(0.0, 3.0, 2.0),
        ];

        let triangles = triangulate_planar(&points, &view);
        assert_eq!(triangles.len(), 2);
        for vertex in triangles.iter().flat_map(|t| t.vertices()) {
            assert_relative_eq!(vertex.z, 2.0, epsilon = 1e-9);
            assert!(points.iter().any(|p| (p - vertex).norm() < 1e-9));
        }
    }
}
