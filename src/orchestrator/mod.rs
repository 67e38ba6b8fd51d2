//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责应用生命周期和资源管理，是整个系统的"指挥中心"。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动日志、连接浏览器、启用 Network 域
//! 2. **请求嗅探**：监听 `RequestWillBeSent` 事件，捞出组件 JSON 的 URL
//! 3. **定时驱动**：按固定节拍调用引擎 tick（导航检测 / 扫描 / 事件回放）
//! 4. **资源管理**：唯一持有 Browser，确保生命周期正确
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::App (连接浏览器、嗅探请求、驱动节拍)
//!     ↓
//! workflow::Engine (状态机：Scanning ⇄ Bound)
//!     ↓
//! services (能力层：ingest / classify / resolve / bind)
//!     ↓
//! infrastructure (基础设施：JsExecutor + CdpDom)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：本层只做调度，不做题型判断
//! 2. **资源隔离**：只有编排层持有 Browser
//! 3. **非致命容错**：单拍失败只记日志，下一拍继续

use anyhow::Result;
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, EventRequestWillBeSent};
use chromiumoxide::Browser;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::browser;
use crate::config::Config;
use crate::infrastructure::{CdpDom, JsExecutor};
use crate::services::binder::Settle;
use crate::utils::logging::{init_log_file, log_startup};
use crate::workflow::Engine;

/// 应用主结构
pub struct App {
    config: Config,
    _browser: Browser,
    engine: Engine<CdpDom>,
    components_rx: mpsc::UnboundedReceiver<String>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        // 初始化日志文件
        init_log_file(&config.output_log_file)?;

        log_startup(config.browser_debug_port, &config.components_url_marker);

        // 连接浏览器
        let (browser, page) = browser::connect_to_browser_and_page(
            config.browser_debug_port,
            Some(&config.target_url_fragment),
            Some(&config.fallback_url),
        )
        .await?;

        // 启用 Network 域，否则收不到请求事件
        page.execute(EnableParams::default()).await?;

        // 嗅探组件 JSON 请求，命中的 URL 送进通道
        let (components_tx, components_rx) = mpsc::unbounded_channel();
        let mut requests = page.event_listener::<EventRequestWillBeSent>().await?;
        let marker = config.components_url_marker.clone();
        tokio::spawn(async move {
            while let Some(event) = requests.next().await {
                let url = event.request.url.clone();
                if url.contains(&marker) && components_tx.send(url).is_err() {
                    break;
                }
            }
        });

        // 创建 CdpDom（经由唯一的 page owner JsExecutor）
        let dom = CdpDom::new(JsExecutor::new(page));
        let settle = Settle {
            attempts: config.settle_attempts,
            interval: Duration::from_millis(config.settle_interval_ms),
        };
        let engine = Engine::new(dom, settle);

        Ok(Self {
            config,
            _browser: browser,
            engine,
            components_rx,
        })
    }

    /// 运行应用主循环
    ///
    /// 两个事件源合流：嗅探到的组件 URL 立即入库，定时节拍驱动引擎。
    /// 单拍出错只告警，不退出——页面导航瞬间的脚本失败是常态。
    pub async fn run(mut self) -> Result<()> {
        info!("⏱ 主循环启动，节拍 {} ms", self.config.poll_interval_ms);

        let mut ticker = interval(Duration::from_millis(self.config.poll_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                delivered = self.components_rx.recv() => {
                    match delivered {
                        Some(url) => self.engine.deliver_components_url(&url).await,
                        None => {
                            // 嗅探任务结束意味着页面事件流断了
                            warn!("⚠️ 请求嗅探通道关闭，主循环退出");
                            return Ok(());
                        }
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.engine.tick().await {
                        warn!("⚠️ 本拍处理失败: {}", e);
                        debug!("失败详情: {:?}", e);
                    }
                }
            }
        }
    }
}
