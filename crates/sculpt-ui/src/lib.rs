//! Sculpt 交互层
//!
//! 宿主事件循环把鼠标事件与命令分发给 [`Action`]；形状拉伸工具在视口中收集套索，
//! 确认后把拉伸网格追加到模型序列。

pub mod action;
pub mod actions;
pub mod command_registry;

pub use action::{
    parse_hex_color, Action, ActionContext, ActionResult, MouseButton, PreviewGeometry,
    PreviewShape, Rgba,
};
pub use actions::{
    ExtruderCommand, ExtruderSignal, NotificationLevel, ShapeExtruder, ShapeExtruderConfig, Status,
    WorkingPlanes,
};
pub use command_registry::CommandRegistry;
