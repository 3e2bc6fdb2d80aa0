// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 爬取作业（job）：表示一次完整的店铺爬取运行
/// - 已发现URL（discovered_url）：发现阶段产出的URL记录
/// - 爬取文档（document）：抓取并分类后的最终文档
///
/// 这些模型构成了系统的数据基础，定义了业务概念的
/// 结构和行为，是领域驱动设计的核心组成部分。
pub mod discovered_url;
pub mod document;
pub mod job;
