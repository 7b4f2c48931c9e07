// ==========================================
// 车队排班系统 - 协作式取消信号
// ==========================================
// 职责: 向每个车场任务广播取消请求（tokio watch 通道）
// 约束: 取消是协作式的，任务在等待点观察信号后自行结束
// ==========================================

use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// 取消信号（可克隆，所有克隆共享同一状态）
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// 发出取消请求（幂等）
    pub fn cancel(&self) {
        if !*self.tx.borrow() {
            info!("收到取消请求，通知所有车场任务");
        }
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// 等待取消请求
    ///
    /// 发送端全部释放后永不返回
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
