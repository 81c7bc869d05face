//! 相机、射线与平面
//!
//! 套索交互只依赖 [`Camera`] trait：视图矩阵、近/远裁剪距离以及从屏幕坐标发出的射线。
//! [`PerspectiveCamera`] 是一个自包含的透视相机实现，供命令行程序与测试使用。

use crate::math::{Matrix4, Point3, Vector3, EPSILON};
use serde::{Deserialize, Serialize};

/// 射线
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3,
    /// 单位方向
    pub direction: Vector3,
}

impl Ray {
    pub fn new(origin: Point3, direction: Vector3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// 射线上参数 t 处的点
    pub fn point_at(&self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }

    /// 反向射线（原点不变）
    pub fn flipped(&self) -> Self {
        Self {
            origin: self.origin,
            direction: -self.direction,
        }
    }
}

/// 平面：normal · p + d = 0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3,
    pub d: f64,
}

impl Plane {
    /// 由法向和平面上一点构造
    pub fn from_normal_and_point(normal: Vector3, point: Point3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            d: -normal.dot(&point.coords),
        }
    }

    /// 点到平面的有符号距离
    pub fn signed_distance(&self, point: &Point3) -> f64 {
        self.normal.dot(&point.coords) + self.d
    }

    /// 射线与平面求交，返回射线参数
    ///
    /// 射线与平面平行或交点在原点之后时返回 `None`。
    pub fn intersect(&self, ray: &Ray) -> Option<f64> {
        let denom = self.normal.dot(&ray.direction);
        if denom.abs() < EPSILON {
            return None;
        }

        let t = -self.signed_distance(&ray.origin) / denom;
        if t < 0.0 {
            None
        } else {
            Some(t)
        }
    }

    /// 求交；若失败则反转射线方向再试一次
    pub fn intersect_either_way(&self, ray: &Ray) -> Option<Point3> {
        self.intersect(ray)
            .map(|t| ray.point_at(t))
            .or_else(|| {
                let flipped = ray.flipped();
                self.intersect(&flipped).map(|t| flipped.point_at(t))
            })
    }
}

/// 交互层需要的相机能力
pub trait Camera {
    /// 世界坐标 -> 视图坐标
    fn view_matrix(&self) -> Matrix4;

    /// 相机在世界坐标中的位置
    fn position(&self) -> Point3;

    fn near_clip_distance(&self) -> f64;

    fn far_clip_distance(&self) -> f64;

    /// 从视口像素坐标发出的射线（原点位于近裁剪面上）
    fn viewport_ray(&self, x: f64, y: f64) -> Ray;

    /// 观察方向（世界坐标，单位向量）
    fn direction(&self) -> Vector3 {
        let view = self.view_matrix();
        let back = Vector3::new(view[(2, 0)], view[(2, 1)], view[(2, 2)]);
        -back.normalize()
    }
}

/// 透视相机
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerspectiveCamera {
    pub eye: Point3,
    pub target: Point3,
    pub up: Vector3,
    /// 垂直视场角（弧度）
    pub fov_y: f64,
    /// 视口宽度（像素）
    pub viewport_width: f64,
    /// 视口高度（像素）
    pub viewport_height: f64,
    pub near: f64,
    pub far: f64,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self {
            eye: Point3::new(0.0, 0.0, 10.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fov_y: std::f64::consts::FRAC_PI_3,
            viewport_width: 800.0,
            viewport_height: 600.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl PerspectiveCamera {
    pub fn look_at(eye: Point3, target: Point3, up: Vector3) -> Self {
        Self {
            eye,
            target,
            up,
            ..Self::default()
        }
    }

    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    pub fn with_clip_distances(mut self, near: f64, far: f64) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    fn aspect(&self) -> f64 {
        if self.viewport_height.abs() < EPSILON {
            1.0
        } else {
            self.viewport_width / self.viewport_height
        }
    }
}

impl Camera for PerspectiveCamera {
    fn view_matrix(&self) -> Matrix4 {
        Matrix4::look_at_rh(&self.eye, &self.target, &self.up)
    }

    fn position(&self) -> Point3 {
        self.eye
    }

    fn near_clip_distance(&self) -> f64 {
        self.near
    }

    fn far_clip_distance(&self) -> f64 {
        self.far
    }

    fn viewport_ray(&self, x: f64, y: f64) -> Ray {
        // 像素 -> NDC，y 轴向下
        let ndc_x = 2.0 * x / self.viewport_width - 1.0;
        let ndc_y = 1.0 - 2.0 * y / self.viewport_height;
        let half_height = (self.fov_y / 2.0).tan();

        let view_dir = Vector3::new(ndc_x * half_height * self.aspect(), ndc_y * half_height, -1.0);

        let view = self.view_matrix();
        let rotation = view.fixed_view::<3, 3>(0, 0).transpose();
        let direction = (rotation * view_dir).normalize();

        // 原点放在近裁剪面上
        let forward = self.direction();
        let origin = self.eye + direction * (self.near / direction.dot(&forward));

        Ray::new(origin, direction)
    }
}
