//! Action 系统
//!
//! 每个交互工具是一个独立的 Action 实现，采用状态机模式处理宿主事件循环分发的
//! 鼠标事件与命令。事件处理的返回值告诉宿主是否继续把事件交给其它交互器。

use sculpt_core::camera::Camera;
use sculpt_core::math::Point3;
use sculpt_core::model_series::{ModelSeries, Reconstruction};
use std::sync::Arc;

/// Action 执行结果
#[derive(Debug, Clone)]
pub enum ActionResult {
    /// 事件与当前 action 无关，宿主继续分发
    Ignored,
    /// 事件已处理，宿主不应再交给其它交互器（例如缩放）
    Consumed,
    /// 套索已确认；`None` 表示点数不足，没有生成网格
    Validated(Option<Arc<Reconstruction>>),
}

impl ActionResult {
    /// 宿主是否应停止继续分发
    pub fn is_consumed(&self) -> bool {
        !matches!(self, ActionResult::Ignored)
    }
}

/// Action 上下文 - 宿主提供的协作对象
pub struct ActionContext<'a> {
    /// 当前视口相机
    pub camera: &'a dyn Camera,
    /// 拉伸结果写入的模型序列
    pub models: &'a mut ModelSeries,
}

impl<'a> ActionContext<'a> {
    pub fn new(camera: &'a dyn Camera, models: &'a mut ModelSeries) -> Self {
        Self { camera, models }
    }
}

/// RGBA 颜色，分量范围 0..=1
pub type Rgba = [f32; 4];

/// 解析 `#RRGGBB` 或 `#RRGGBBAA`
pub fn parse_hex_color(hex: &str) -> Option<Rgba> {
    let digits = hex.strip_prefix('#')?;
    if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
        return None;
    }

    let mut color = [1.0; 4];
    for (i, channel) in color.iter_mut().enumerate().take(digits.len() / 2) {
        let byte = u8::from_str_radix(&digits[2 * i..2 * i + 2], 16).ok()?;
        *channel = f32::from(byte) / 255.0;
    }
    Some(color)
}

/// 预览形状
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewShape {
    Polyline(Vec<Point3>),
    /// 边点标记（球）
    Marker { center: Point3, radius: f64 },
    Segment { start: Point3, end: Point3 },
}

/// 预览几何体
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewGeometry {
    pub shape: PreviewShape,
    pub color: Rgba,
    pub is_reference: bool, // 是否是参考线（虚线显示）
}

impl PreviewGeometry {
    pub fn new(shape: PreviewShape, color: Rgba) -> Self {
        Self {
            shape,
            color,
            is_reference: false,
        }
    }

    pub fn reference(shape: PreviewShape, color: Rgba) -> Self {
        Self {
            shape,
            color,
            is_reference: true,
        }
    }
}

/// 鼠标按钮
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Action trait - 所有交互工具的核心接口
///
/// 坐标均为视口像素坐标。
pub trait Action: Send {
    /// 获取 action 名称
    fn name(&self) -> &str;

    /// 交互器优先级，数值越大越先收到事件
    fn priority(&self) -> i32 {
        0
    }

    /// 重置 action 状态
    fn reset(&mut self);

    // ========== 事件处理 ==========

    /// 鼠标按下
    fn on_button_press(
        &mut self,
        ctx: &mut ActionContext,
        button: MouseButton,
        x: f64,
        y: f64,
    ) -> ActionResult;

    /// 鼠标移动；`button` 为按住的按钮
    fn on_mouse_move(
        &mut self,
        ctx: &mut ActionContext,
        button: Option<MouseButton>,
        x: f64,
        y: f64,
    ) -> ActionResult;

    /// 鼠标释放
    fn on_button_release(
        &mut self,
        ctx: &mut ActionContext,
        button: MouseButton,
        x: f64,
        y: f64,
    ) -> ActionResult;

    /// 双击
    fn on_double_click(
        &mut self,
        _ctx: &mut ActionContext,
        _button: MouseButton,
        _x: f64,
        _y: f64,
    ) -> ActionResult {
        ActionResult::Ignored
    }

    /// 滚轮
    fn on_wheel(&mut self, _ctx: &mut ActionContext, _delta: f64, _x: f64, _y: f64) -> ActionResult {
        ActionResult::Ignored
    }

    /// 命令输入；无法识别时返回 `None`
    fn on_command(&mut self, ctx: &mut ActionContext, cmd: &str) -> Option<ActionResult>;

    // ========== UI 提示 ==========

    /// 获取当前状态的提示文本
    fn get_prompt(&self) -> &str;

    /// 获取当前可用的命令
    fn get_available_commands(&self) -> Vec<&str> {
        vec![]
    }

    // ========== 预览 ==========

    /// 获取预览几何体
    fn get_preview(&self) -> Vec<PreviewGeometry>;

    // ========== 历史操作 ==========

    /// 是否可以撤销（action 内部的撤销）
    fn can_undo(&self) -> bool {
        false
    }

    /// 撤销
    fn undo(&mut self) {}
}
