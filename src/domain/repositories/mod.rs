// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 定义爬取作业存储的抽象接口：
/// - 作业仓库（job_repository）：作业记录与原子计数器
/// - URL仓库（url_repository）：已发现URL记录与状态推进
/// - 文档仓库（document_repository）：爬取文档记录
/// - 索引器（indexer）：出站索引协作方端口
///
/// 仓库实现必须支持多工作器并发写入；标量计数器通过
/// 原子递增实现，禁止应用层读-改-写。
pub mod document_repository;
pub mod indexer;
pub mod job_repository;
pub mod url_repository;
