// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 初始化结构化日志
///
/// RUST_LOG 覆盖默认过滤；SHOPCRAWL_LOG_JSON=1 时输出JSON行，
/// 便于被日志管道采集。
pub fn init_telemetry() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,shopcrawl=debug".into());

    let json = std::env::var("SHOPCRAWL_LOG_JSON").map(|v| v == "1").unwrap_or(false);

    // try_init keeps repeated initialization (tests, embedders that
    // already installed a subscriber) from panicking.
    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };
    let _ = result;
}
