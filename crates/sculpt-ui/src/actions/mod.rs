//! 交互工具实现

pub mod shape_extruder;

pub use shape_extruder::{
    ExtruderCommand, ExtruderSignal, LassoSample, NotificationLevel, ShapeExtruder,
    ShapeExtruderConfig, Status, WorkingPlanes,
};
