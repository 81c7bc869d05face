//! Sculpt 核心几何引擎
//!
//! 把用户在视口中画出的闭合折线（套索）转换为三维网格。
//!
//! # 架构设计
//!
//! - `camera`: 相机接口、射线与平面求交
//! - `triangulation`: 约束 Delaunay 三角剖分（Bowyer-Watson + 边界恢复）
//! - `extrusion`: 近/远平面端面 + 侧壁的拉伸网格
//! - `model_series`: 重建结果集合与变更事件
//!
//! # 示例
//!
//! ```rust
//! use sculpt_core::prelude::*;
//!
//! let square = [
//!     Point2::new(0.0, 0.0),
//!     Point2::new(10.0, 0.0),
//!     Point2::new(10.0, 10.0),
//!     Point2::new(0.0, 10.0),
//! ];
//! let result = triangulate_polygon(&square);
//! assert_eq!(result.triangles.len(), 2);
//! ```

pub mod camera;
pub mod extrusion;
pub mod geometry;
pub mod input_parser;
pub mod math;
pub mod mesh;
pub mod model_series;
pub mod triangulation;

pub mod prelude {
    //! 常用类型的便捷导入
    pub use crate::camera::{Camera, PerspectiveCamera, Plane, Ray};
    pub use crate::extrusion::Extrusion;
    pub use crate::geometry::{Edge2, Triangle2, Triangle3, TriangleId};
    pub use crate::input_parser::{InputParser, ParseError};
    pub use crate::math::{Matrix4, Point2, Point3, Vector2, Vector3};
    pub use crate::mesh::Mesh;
    pub use crate::model_series::{ModelSeries, ModelSeriesEvent, Reconstruction};
    pub use crate::triangulation::{triangulate_planar, triangulate_polygon, PolygonTriangulation};
}
