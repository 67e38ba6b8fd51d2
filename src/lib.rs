//! # Quiz Auto Answer
//!
//! 一个用于自动作答在线课程测验的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `CdpDom` - 在 JsExecutor 之上实现 `Dom` 抽象
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个 Component / Question
//! - `ingest` - 组件 JSON 抓取入库能力
//! - `classifier` - 七种题型的形状识别能力
//! - `resolver` - 题型 → DOM 节点的解析能力
//! - `binder` - 交互绑定与答案回放能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义引擎的完整生命周期
//! - `Engine` - 状态机（Scanning ⇄ Bound）与聚合状态
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/` - 连接浏览器、嗅探组件请求、驱动定时节拍
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod dom;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_browser_and_page;
pub use config::Config;
pub use dom::Dom;
pub use error::AppError;
pub use infrastructure::{CdpDom, JsExecutor};
pub use models::{Component, ComponentStore, Question, QuestionKind};
pub use orchestrator::App;
pub use workflow::{Engine, EngineState};
