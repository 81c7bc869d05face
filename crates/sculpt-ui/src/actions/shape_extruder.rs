//! 形状拉伸工具
//!
//! 用户在视口中点击或拖拽画出一条闭合套索，确认后沿视线方向拉伸成网格：
//! 近裁剪面上的轮廓是一个端面，远裁剪面上的轮廓是另一个端面。
//!
//! 状态：`Disabled → Idle → Drawing → Disabled`。第一个被接受的点位会捕获三个工作平面
//! （工具平面、近平面、远平面）以及当时的视图矩阵，本次绘制期间保持不变，
//! 因此同一层的所有采样点共面。

use crate::action::{
    parse_hex_color, Action, ActionContext, ActionResult, MouseButton, PreviewGeometry,
    PreviewShape, Rgba,
};
use crate::command_registry::CommandRegistry;
use crossbeam::channel::{unbounded, Receiver, Sender};
use sculpt_core::camera::{Camera, Plane, Ray};
use sculpt_core::extrusion::Extrusion;
use sculpt_core::math::{Matrix4, Point3};
use sculpt_core::model_series::ModelSeries;
use serde::{Deserialize, Serialize};

/// 拉伸工具配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeExtruderConfig {
    /// 为假时只生成近平面端面
    pub extrude: bool,
    /// 双击确认套索
    pub validation_on_double_click: bool,
    /// 边点标记半径，也是拒绝新点的邻近距离（工具平面上的世界单位）
    pub edge_size: f64,
    /// 工具平面到相机的距离
    pub tool_plane_distance: f64,
    pub line_color: String,
    pub edge_color: String,
    /// 交互器优先级
    pub priority: i32,
}

impl Default for ShapeExtruderConfig {
    fn default() -> Self {
        Self {
            extrude: true,
            validation_on_double_click: true,
            edge_size: 0.005,
            tool_plane_distance: 1.0,
            line_color: "#FFFFFF".to_string(),
            edge_color: "#FFFFFF".to_string(),
            priority: 2,
        }
    }
}

fn color_or_white(hex: &str, field: &str) -> Rgba {
    parse_hex_color(hex).unwrap_or_else(|| {
        tracing::warn!("Invalid {} '{}', falling back to white", field, hex);
        [1.0; 4]
    })
}

/// 宿主可以触发的槽
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtruderCommand {
    EnableTool,
    DisableTool,
    Validate,
    CancelLastClick,
    DeleteLastMesh,
    Reset,
}

/// 通知级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Failure,
}

/// 工具发出的信号
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtruderSignal {
    /// 确认后工具自动关闭
    ToolDisabled,
    Notification {
        level: NotificationLevel,
        message: String,
    },
}

/// 与视线方向正交的三个工作平面
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingPlanes {
    pub tool: Plane,
    pub near: Plane,
    pub far: Plane,
}

impl WorkingPlanes {
    /// 由相机当前姿态计算
    pub fn from_camera(camera: &dyn Camera, tool_distance: f64) -> Self {
        let direction = camera.direction();
        let position = camera.position();
        let at = |distance: f64| Plane::from_normal_and_point(direction, position + direction * distance);

        Self {
            tool: at(tool_distance),
            near: at(camera.near_clip_distance()),
            far: at(camera.far_clip_distance()),
        }
    }

    /// 把一条视口射线投到三个平面上
    ///
    /// 射线原点可能位于近平面和工具平面之后，此时反向求交。
    pub fn project(&self, ray: &Ray) -> Option<LassoSample> {
        let far = self.far.intersect(ray).map(|t| ray.point_at(t))?;
        let near = self.near.intersect_either_way(ray)?;
        let tool = self.tool.intersect_either_way(ray)?;
        Some(LassoSample { tool, near, far })
    }
}

/// 同一条射线在三个平面上的交点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LassoSample {
    pub tool: Point3,
    pub near: Point3,
    pub far: Point3,
}

/// 套索点位
///
/// `tool`/`near`/`far` 长度始终相同；`edges` 是点击或拖拽结束时提交的点，
/// 每一个都等于 `tool` 中的某个采样。
#[derive(Debug, Clone, Default)]
struct Lasso {
    tool: Vec<Point3>,
    near: Vec<Point3>,
    far: Vec<Point3>,
    edges: Vec<Point3>,
}

impl Lasso {
    fn clear(&mut self) {
        self.tool.clear();
        self.near.clear();
        self.far.clear();
        self.edges.clear();
    }

    fn is_empty(&self) -> bool {
        self.tool.is_empty()
    }

    fn last_sample(&self) -> Option<LassoSample> {
        Some(LassoSample {
            tool: *self.tool.last()?,
            near: *self.near.last()?,
            far: *self.far.last()?,
        })
    }

    fn push_sample(&mut self, sample: LassoSample) {
        self.tool.push(sample.tool);
        self.near.push(sample.near);
        self.far.push(sample.far);
    }

    fn push_edge(&mut self, sample: LassoSample) {
        self.push_sample(sample);
        self.edges.push(sample.tool);
    }

    /// 把最后一个采样提交为边点
    fn commit_last(&mut self) {
        if let Some(&last) = self.tool.last() {
            self.edges.push(last);
        }
    }

    fn is_near_edge(&self, point: &Point3, radius: f64) -> bool {
        self.edges.iter().any(|edge| (point - edge).norm() < radius)
    }

    /// 删除最后一段折线：弹出最后一个边点，再弹出采样直到回到上一个边点
    fn remove_last_segment(&mut self) {
        if self.tool.is_empty() {
            return;
        }

        self.edges.pop();
        loop {
            self.tool.pop();
            self.near.pop();
            self.far.pop();

            if self.tool.is_empty() || self.tool.last() == self.edges.last() {
                break;
            }
        }
    }
}

/// 工具状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Status {
    /// 工具关闭，忽略所有事件
    Disabled,
    /// 工具开启，等待第一个点
    Idle,
    /// 正在绘制
    Drawing {
        planes: WorkingPlanes,
        /// 捕获平面时的视图矩阵
        view: Matrix4,
        /// 左键按住拖拽中
        dragging: bool,
    },
}

/// 形状拉伸交互器
#[derive(Debug)]
pub struct ShapeExtruder {
    config: ShapeExtruderConfig,
    line_color: Rgba,
    edge_color: Rgba,
    status: Status,
    lasso: Lasso,
    /// 最近一次鼠标位置在工具平面上的投影，用于橡皮筋线
    cursor: Option<Point3>,
    commands: CommandRegistry,
    listeners: Vec<Sender<ExtruderSignal>>,
}

impl ShapeExtruder {
    pub fn new(config: ShapeExtruderConfig) -> Self {
        Self {
            line_color: color_or_white(&config.line_color, "line_color"),
            edge_color: color_or_white(&config.edge_color, "edge_color"),
            config,
            status: Status::Disabled,
            lasso: Lasso::default(),
            cursor: None,
            commands: CommandRegistry::new(),
            listeners: Vec::new(),
        }
    }

    pub fn config(&self) -> &ShapeExtruderConfig {
        &self.config
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn is_enabled(&self) -> bool {
        self.status != Status::Disabled
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.status, Status::Drawing { .. })
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.status, Status::Drawing { dragging: true, .. })
    }

    pub fn tool_positions(&self) -> &[Point3] {
        &self.lasso.tool
    }

    pub fn near_positions(&self) -> &[Point3] {
        &self.lasso.near
    }

    pub fn far_positions(&self) -> &[Point3] {
        &self.lasso.far
    }

    pub fn edge_positions(&self) -> &[Point3] {
        &self.lasso.edges
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// 订阅工具信号
    pub fn subscribe(&mut self) -> Receiver<ExtruderSignal> {
        let (sender, receiver) = unbounded();
        self.listeners.push(sender);
        receiver
    }

    fn emit(&mut self, signal: ExtruderSignal) {
        self.listeners
            .retain(|listener| listener.send(signal.clone()).is_ok());
    }

    fn notify(&mut self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Info => tracing::info!("{}", message),
            NotificationLevel::Failure => tracing::warn!("{}", message),
        }
        self.emit(ExtruderSignal::Notification {
            level,
            message: message.to_string(),
        });
    }

    fn set_dragging(&mut self, value: bool) {
        if let Status::Drawing { dragging, .. } = &mut self.status {
            *dragging = value;
        }
    }

    /// 开启或关闭工具；两种情况都会清空套索
    pub fn enable_tool(&mut self, enable: bool) {
        self.status = if enable { Status::Idle } else { Status::Disabled };
        self.lasso.clear();
        self.cursor = None;
        tracing::debug!("Shape extruder {}", if enable { "enabled" } else { "disabled" });
    }

    /// 在视口坐标处添加一个边点
    ///
    /// 与已有边点过近的点被忽略。
    pub fn add_point(&mut self, camera: &dyn Camera, x: f64, y: f64) -> ActionResult {
        let (planes, view) = match self.status {
            Status::Disabled => return ActionResult::Ignored,
            Status::Idle => (
                WorkingPlanes::from_camera(camera, self.config.tool_plane_distance),
                camera.view_matrix(),
            ),
            Status::Drawing { planes, view, .. } => (planes, view),
        };

        self.set_dragging(false);

        let Some(sample) = planes.project(&camera.viewport_ray(x, y)) else {
            tracing::warn!("Lasso ray at ({}, {}) misses the working planes", x, y);
            return ActionResult::Consumed;
        };

        if self.lasso.is_near_edge(&sample.tool, self.config.edge_size) {
            tracing::debug!("Point ({}, {}) is too close to an existing lasso point", x, y);
            return ActionResult::Consumed;
        }

        self.lasso.push_edge(sample);
        self.cursor = Some(sample.tool);
        self.status = Status::Drawing {
            planes,
            view,
            dragging: false,
        };

        ActionResult::Consumed
    }

    /// 删除最后一段折线；删空后回到 Idle
    pub fn remove_last_point(&mut self) -> ActionResult {
        if !self.is_enabled() {
            return ActionResult::Ignored;
        }

        self.lasso.remove_last_segment();

        if self.lasso.is_empty() {
            self.status = Status::Idle;
            self.cursor = None;
        } else {
            self.set_dragging(false);
            self.cursor = self.lasso.tool.last().copied();
        }

        ActionResult::Consumed
    }

    /// 鼠标移动：左键按住时追加采样，否则只更新橡皮筋线
    pub fn move_to(
        &mut self,
        camera: &dyn Camera,
        button: Option<MouseButton>,
        x: f64,
        y: f64,
    ) -> ActionResult {
        let Status::Drawing { planes, .. } = self.status else {
            return ActionResult::Ignored;
        };

        let Some(sample) = planes.project(&camera.viewport_ray(x, y)) else {
            tracing::warn!("Lasso ray at ({}, {}) misses the working planes", x, y);
            return ActionResult::Consumed;
        };

        // 同一位置的重复采样会破坏三角剖分
        if self.lasso.last_sample() == Some(sample) {
            return ActionResult::Consumed;
        }

        if button == Some(MouseButton::Left) {
            self.lasso.push_sample(sample);
            self.set_dragging(true);
        }
        self.cursor = Some(sample.tool);

        ActionResult::Consumed
    }

    /// 拖拽结束：最后一个采样成为边点
    pub fn release(&mut self) -> ActionResult {
        if !self.is_dragging() {
            return ActionResult::Ignored;
        }

        self.lasso.commit_last();
        self.set_dragging(false);
        ActionResult::Consumed
    }

    /// 确认套索：生成网格并关闭工具
    pub fn validate(&mut self, models: &mut ModelSeries) -> ActionResult {
        // 触屏时可能收不到释放事件
        if self.is_dragging() {
            self.lasso.commit_last();
            self.set_dragging(false);
        }

        let reconstruction = match self.status {
            Status::Drawing { view, .. } if self.lasso.near.len() >= 3 => Some(
                Extrusion::new(&self.lasso.near, &self.lasso.far, &view, self.config.extrude)
                    .append_to(models),
            ),
            _ => {
                tracing::warn!(
                    "Lasso has {} points, at least 3 are needed to extrude",
                    self.lasso.near.len()
                );
                None
            }
        };

        self.enable_tool(false);
        self.emit(ExtruderSignal::ToolDisabled);

        ActionResult::Validated(reconstruction)
    }

    /// 删除最后一个拉伸结果
    pub fn delete_last_mesh(&mut self, models: &mut ModelSeries) {
        if models.pop().is_some() {
            self.notify(NotificationLevel::Info, "Last extrusion deleted.");
        } else {
            self.notify(NotificationLevel::Failure, "No extrusion to delete.");
        }
    }

    /// 清空所有拉伸结果
    pub fn reset_models(&mut self, models: &mut ModelSeries) {
        if !models.is_empty() {
            tracing::info!("Removing {} extrusions", models.len());
            models.clear();
        }
    }

    /// 执行一个槽
    pub fn execute(&mut self, ctx: &mut ActionContext, command: ExtruderCommand) -> ActionResult {
        match command {
            ExtruderCommand::EnableTool => {
                self.enable_tool(true);
                ActionResult::Consumed
            }
            ExtruderCommand::DisableTool => {
                self.enable_tool(false);
                ActionResult::Consumed
            }
            ExtruderCommand::Validate => self.validate(ctx.models),
            ExtruderCommand::CancelLastClick => self.remove_last_point(),
            ExtruderCommand::DeleteLastMesh => {
                self.delete_last_mesh(ctx.models);
                ActionResult::Consumed
            }
            ExtruderCommand::Reset => {
                self.reset_models(ctx.models);
                ActionResult::Consumed
            }
        }
    }

    /// 套索折线、边点标记和最后一段橡皮筋线
    pub fn preview(&self) -> Vec<PreviewGeometry> {
        let mut preview = Vec::new();
        let Some(&last) = self.lasso.tool.last() else {
            return preview;
        };

        preview.push(PreviewGeometry::new(
            PreviewShape::Polyline(self.lasso.tool.clone()),
            self.line_color,
        ));

        for &center in &self.lasso.edges {
            preview.push(PreviewGeometry::new(
                PreviewShape::Marker {
                    center,
                    radius: self.config.edge_size,
                },
                self.edge_color,
            ));
        }

        if let Some(cursor) = self.cursor.filter(|cursor| *cursor != last) {
            preview.push(PreviewGeometry::reference(
                PreviewShape::Segment {
                    start: last,
                    end: cursor,
                },
                self.line_color,
            ));
        }

        preview
    }
}

impl Default for ShapeExtruder {
    fn default() -> Self {
        Self::new(ShapeExtruderConfig::default())
    }
}

impl Action for ShapeExtruder {
    fn name(&self) -> &str {
        "ShapeExtruder"
    }

    fn priority(&self) -> i32 {
        self.config.priority
    }

    fn reset(&mut self) {
        self.enable_tool(self.is_enabled());
    }

    fn on_button_press(
        &mut self,
        ctx: &mut ActionContext,
        button: MouseButton,
        x: f64,
        y: f64,
    ) -> ActionResult {
        match button {
            MouseButton::Left => self.add_point(ctx.camera, x, y),
            MouseButton::Right => self.remove_last_point(),
            MouseButton::Middle => ActionResult::Ignored,
        }
    }

    fn on_mouse_move(
        &mut self,
        ctx: &mut ActionContext,
        button: Option<MouseButton>,
        x: f64,
        y: f64,
    ) -> ActionResult {
        self.move_to(ctx.camera, button, x, y)
    }

    fn on_button_release(
        &mut self,
        _ctx: &mut ActionContext,
        _button: MouseButton,
        _x: f64,
        _y: f64,
    ) -> ActionResult {
        self.release()
    }

    fn on_double_click(
        &mut self,
        ctx: &mut ActionContext,
        button: MouseButton,
        _x: f64,
        _y: f64,
    ) -> ActionResult {
        if self.config.validation_on_double_click && self.is_drawing() && button == MouseButton::Left {
            self.validate(ctx.models)
        } else {
            ActionResult::Ignored
        }
    }

    fn on_wheel(&mut self, _ctx: &mut ActionContext, _delta: f64, _x: f64, _y: f64) -> ActionResult {
        // 绘制期间不允许缩放
        if self.is_drawing() {
            ActionResult::Consumed
        } else {
            ActionResult::Ignored
        }
    }

    fn on_command(&mut self, ctx: &mut ActionContext, cmd: &str) -> Option<ActionResult> {
        let command = self.commands.lookup(cmd)?;
        Some(self.execute(ctx, command))
    }

    fn get_prompt(&self) -> &str {
        match self.status {
            Status::Disabled => "Enable the tool to draw a lasso",
            Status::Idle => "Click to place the first lasso point",
            Status::Drawing { .. } => "Click or drag to extend the lasso, double-click to validate",
        }
    }

    fn get_available_commands(&self) -> Vec<&str> {
        self.commands.command_names()
    }

    fn get_preview(&self) -> Vec<PreviewGeometry> {
        self.preview()
    }

    fn can_undo(&self) -> bool {
        !self.lasso.is_empty()
    }

    fn undo(&mut self) {
        self.remove_last_point();
    }
}
