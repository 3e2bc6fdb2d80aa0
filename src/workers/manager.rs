// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::workers::crawl_worker::{CrawlWorker, WorkerContext};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 工作器池
///
/// 每个作业一个固定大小的池。池的大小在作业开始时确定，
/// 运行期不变。
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// 启动指定数量的工作器
    ///
    /// # 参数
    ///
    /// * `count` - 工作器数量
    /// * `ctx` - 共享的工作器上下文
    pub fn start(count: usize, ctx: WorkerContext) -> Self {
        info!("Starting {} crawl workers", count);
        let handles = (0..count)
            .map(|_| {
                let worker = CrawlWorker::new(ctx.clone());
                tokio::spawn(async move {
                    worker.run().await;
                })
            })
            .collect();
        Self { handles }
    }

    /// 等待全部工作器退出
    ///
    /// 取消时给在途抓取一个宽限期，超过宽限期的工作器被
    /// 强制中止。
    pub async fn join(self, cancel: CancellationToken, grace: Duration) {
        for mut handle in self.handles {
            tokio::select! {
                _ = &mut handle => {}
                _ = cancel.cancelled() => {
                    if tokio::time::timeout(grace, &mut handle).await.is_err() {
                        warn!("Worker exceeded cancellation grace period, aborting");
                        handle.abort();
                    }
                }
            }
        }
    }
}
