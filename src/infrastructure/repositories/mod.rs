// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库实现模块
///
/// 提供作业存储契约的两种参考实现：进程内并发存储
/// （默认底座，亦作测试替身）与SQLite持久化存储
/// （进程重启后状态查询与重索引仍一致）。
pub mod memory_store;
pub mod sqlite_store;
