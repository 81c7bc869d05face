//! 模型序列
//!
//! 保存一组重建结果（命名网格），并把增删改事件广播给订阅者（例如渲染层）。

use crate::mesh::Mesh;
use crossbeam::channel::{unbounded, Receiver, Sender};
use std::sync::Arc;

/// 一个命名的重建网格
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    pub organ_name: String,
    pub mesh: Arc<Mesh>,
}

impl Reconstruction {
    pub fn new(organ_name: impl Into<String>, mesh: Mesh) -> Self {
        Self {
            organ_name: organ_name.into(),
            mesh: Arc::new(mesh),
        }
    }
}

/// 模型序列变更事件
#[derive(Debug, Clone)]
pub enum ModelSeriesEvent {
    ReconstructionsAdded(Vec<Arc<Reconstruction>>),
    ReconstructionsRemoved(Vec<Arc<Reconstruction>>),
    /// 整体替换
    Modified,
}

/// 重建结果集合
#[derive(Debug, Default)]
pub struct ModelSeries {
    reconstructions: Vec<Arc<Reconstruction>>,
    subscribers: Vec<Sender<ModelSeriesEvent>>,
}

impl ModelSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reconstructions(&self) -> &[Arc<Reconstruction>] {
        &self.reconstructions
    }

    pub fn len(&self) -> usize {
        self.reconstructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reconstructions.is_empty()
    }

    /// 替换整个列表（不发送事件，由调用方决定通知哪种变更）
    pub fn set_reconstructions(&mut self, reconstructions: Vec<Arc<Reconstruction>>) {
        self.reconstructions = reconstructions;
    }

    /// 订阅变更事件
    pub fn subscribe(&mut self) -> Receiver<ModelSeriesEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    /// 广播事件，顺便清理已断开的订阅者
    pub fn emit(&mut self, event: ModelSeriesEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    /// 追加一个重建结果并通知
    pub fn push(&mut self, reconstruction: Reconstruction) -> Arc<Reconstruction> {
        let reconstruction = Arc::new(reconstruction);
        self.reconstructions.push(reconstruction.clone());
        self.emit(ModelSeriesEvent::ReconstructionsAdded(vec![
            reconstruction.clone(),
        ]));
        reconstruction
    }

    /// 移除最后一个重建结果并通知
    pub fn pop(&mut self) -> Option<Arc<Reconstruction>> {
        let removed = self.reconstructions.pop()?;
        self.emit(ModelSeriesEvent::ReconstructionsRemoved(vec![removed.clone()]));
        Some(removed)
    }

    /// 清空并通知
    pub fn clear(&mut self) {
        self.reconstructions.clear();
        self.emit(ModelSeriesEvent::Modified);
    }
}
