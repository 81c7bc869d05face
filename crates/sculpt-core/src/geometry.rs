//! 三角剖分使用的几何图元
//!
//! - 二维三角形 (Triangle2)：构造时计算外接圆与重心
//! - 无向边 (Edge2)：`{a, b} == {b, a}`
//! - 三维三角形 (Triangle3)：剖分结果映射回世界坐标后的输出

use crate::math::{cross2, Point2, Point3, Vector2, Vector3, EPSILON};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 外接圆包含测试的相对容差；在舍入误差范围内落在圆上的点不算在圆内
pub const CIRCUMCIRCLE_TOLERANCE: f64 = 1e-9;

/// 三角形唯一标识（在所属剖分中单调递增）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TriangleId(pub usize);

impl fmt::Display for TriangleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 二维三角形
#[derive(Debug, Clone, Copy)]
pub struct Triangle2 {
    pub id: TriangleId,
    pub a: Point2,
    pub b: Point2,
    pub c: Point2,
    /// 外接圆圆心
    pub center: Point2,
    /// 外接圆半径；退化三角形为正无穷
    pub radius: f64,
    /// 重心
    pub barycenter: Point2,
}

impl Triangle2 {
    pub fn new(id: TriangleId, a: Point2, b: Point2, c: Point2) -> Self {
        let barycenter = Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);

        let (center, radius) = match Self::circumcircle(&a, &b, &c) {
            Some(center) => (center, (a - center).norm()),
            // 三点共线：圆心取重心，半径无穷大，后续任何插入都会移除它
            None => (barycenter, f64::INFINITY),
        };

        Self {
            id,
            a,
            b,
            c,
            center,
            radius,
            barycenter,
        }
    }

    /// 两条中垂线的交点
    ///
    /// 中垂线 1 过 (a+b)/2，方向垂直于 b-a；中垂线 2 过 (a+c)/2，方向垂直于 c-a。
    fn circumcircle(a: &Point2, b: &Point2, c: &Point2) -> Option<Point2> {
        let ab = b - a;
        let ac = c - a;

        let first_pos = Point2::from((a.coords + b.coords) / 2.0);
        let first_dir = Vector2::new(-ab.y, ab.x);
        let second_pos = Point2::from((a.coords + c.coords) / 2.0);
        let second_dir = Vector2::new(-ac.y, ac.x);

        let denom = cross2(&first_dir, &second_dir);
        let scale = ab.norm_squared().max(ac.norm_squared());
        if denom.abs() <= EPSILON * scale || scale == 0.0 {
            return None;
        }

        let t = cross2(&(second_pos - first_pos), &second_dir) / denom;
        Some(first_pos + first_dir * t)
    }

    pub fn is_degenerate(&self) -> bool {
        !self.radius.is_finite()
    }

    /// 点是否严格位于外接圆内
    pub fn circumcircle_contains(&self, point: &Point2) -> bool {
        (point - self.center).norm() < self.radius * (1.0 - CIRCUMCIRCLE_TOLERANCE)
    }

    pub fn edges(&self) -> [Edge2; 3] {
        [
            Edge2::new(self.a, self.b),
            Edge2::new(self.a, self.c),
            Edge2::new(self.b, self.c),
        ]
    }

    pub fn has_edge(&self, edge: &Edge2) -> bool {
        self.edges().iter().any(|e| e == edge)
    }

    pub fn has_vertex(&self, point: &Point2) -> bool {
        self.a == *point || self.b == *point || self.c == *point
    }

    pub fn vertices(&self) -> [Point2; 3] {
        [self.a, self.b, self.c]
    }

    /// 面积（无符号）
    pub fn area(&self) -> f64 {
        cross2(&(self.b - self.a), &(self.c - self.a)).abs() / 2.0
    }
}

/// 无向二维边
#[derive(Debug, Clone, Copy)]
pub struct Edge2 {
    pub a: Point2,
    pub b: Point2,
}

impl PartialEq for Edge2 {
    fn eq(&self, other: &Self) -> bool {
        (self.a == other.a && self.b == other.b) || (self.a == other.b && self.b == other.a)
    }
}

impl Edge2 {
    pub fn new(a: Point2, b: Point2) -> Self {
        Self { a, b }
    }

    pub fn midpoint(&self) -> Point2 {
        Point2::new((self.a.x + self.b.x) / 2.0, (self.a.y + self.b.y) / 2.0)
    }

    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }

    /// 线段相交测试，两条线段的参数都取半开区间 [0, 1)
    pub fn intersects(&self, other: &Edge2) -> bool {
        let r = self.b - self.a;
        let s = other.b - other.a;
        let qp = other.a - self.a;

        let r_x_s = cross2(&r, &s);
        if r_x_s == 0.0 {
            return false;
        }

        let t = cross2(&qp, &s) / r_x_s;
        let u = cross2(&qp, &r) / r_x_s;
        (0.0..1.0).contains(&t) && (0.0..1.0).contains(&u)
    }
}

/// 三维三角形
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle3 {
    pub a: Point3,
    pub b: Point3,
    pub c: Point3,
}

impl Triangle3 {
    pub fn new(a: Point3, b: Point3, c: Point3) -> Self {
        Self { a, b, c }
    }

    pub fn vertices(&self) -> [Point3; 3] {
        [self.a, self.b, self.c]
    }

    /// 单位法向；退化三角形返回 `None`
    pub fn normal(&self) -> Option<Vector3> {
        (self.b - self.a).cross(&(self.c - self.a)).try_normalize(EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn check_circumcircle(a: Point2, b: Point2, c: Point2) {
        let triangle = Triangle2::new(TriangleId(0), a, b, c);
        for vertex in triangle.vertices() {
            let distance = (vertex - triangle.center).norm();
            assert_relative_eq!(distance, triangle.radius, max_relative = 1e-4);
        }
    }

    #[test]
    fn test_circumcircle_invariant() {
        check_circumcircle(Point2::new(0.0, 0.0), Point2::new(4.0, 0.0), Point2::new(0.0, 3.0));
        check_circumcircle(Point2::new(1.0, 1.0), Point2::new(5.0, 2.0), Point2::new(2.0, 7.0));
        // 含水平边与竖直边
        check_circumcircle(Point2::new(0.0, 0.0), Point2::new(0.0, 10.0), Point2::new(10.0, 10.0));
        check_circumcircle(
            Point2::new(-120.5, 33.25),
            Point2::new(80.0, -14.0),
            Point2::new(3.5, 200.0),
        );
        check_circumcircle(
            Point2::new(0.001, 0.002),
            Point2::new(0.003, 0.001),
            Point2::new(0.002, 0.004),
        );
    }

    #[test]
    fn test_right_triangle_circumcenter() {
        let triangle = Triangle2::new(
            TriangleId(0),
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(0.0, 3.0),
        );
        // 直角三角形外心为斜边中点
        assert_relative_eq!(triangle.center, Point2::new(2.0, 1.5), epsilon = 1e-12);
        assert_relative_eq!(triangle.radius, 2.5, epsilon = 1e-12);
        assert_relative_eq!(triangle.barycenter, Point2::new(4.0 / 3.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(triangle.area(), 6.0);
    }

    #[test]
    fn test_cocircular_point_is_not_inside() {
        let triangle = Triangle2::new(
            TriangleId(0),
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
        );
        assert!(!triangle.circumcircle_contains(&Point2::new(0.0, 10.0)));
        assert!(triangle.circumcircle_contains(&Point2::new(5.0, 5.0)));
        assert!(!triangle.circumcircle_contains(&Point2::new(20.0, 20.0)));
    }

    #[test]
    fn test_degenerate_triangle() {
        let triangle = Triangle2::new(
            TriangleId(0),
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
        );
        assert!(triangle.is_degenerate());
        assert!(triangle.circumcircle_contains(&Point2::new(1e6, -1e6)));
    }

    #[test]
    fn test_edge_equality_is_symmetric() {
        let p = Point2::new(1.0, 2.0);
        let q = Point2::new(3.0, 4.0);
        assert_eq!(Edge2::new(p, q), Edge2::new(q, p));
        assert_ne!(Edge2::new(p, q), Edge2::new(p, Point2::new(3.0, 4.5)));
    }

    #[test]
    fn test_edge_intersection() {
        let horizontal = Edge2::new(Point2::new(0.0, 0.0), Point2::new(10.0, 0.0));
        let vertical = Edge2::new(Point2::new(5.0, -5.0), Point2::new(5.0, 5.0));
        assert!(horizontal.intersects(&vertical));

        let parallel = Edge2::new(Point2::new(0.0, 1.0), Point2::new(10.0, 1.0));
        assert!(!horizontal.intersects(&parallel));

        let far = Edge2::new(Point2::new(20.0, -5.0), Point2::new(20.0, 5.0));
        assert!(!horizontal.intersects(&far));
    }

    #[test]
    fn test_triangle3_normal() {
        let triangle = Triangle3::new(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        );
        assert_relative_eq!(triangle.normal().unwrap(), Vector3::z());

        let flat = Triangle3::new(Point3::origin(), Point3::origin(), Point3::new(1.0, 0.0, 0.0));
        assert!(flat.normal().is_none());
    }
}
