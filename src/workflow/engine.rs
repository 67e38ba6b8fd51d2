//! 引擎聚合与生命周期状态机
//!
//! 两个状态：**Scanning**（等待目标 UI 出现）与 **Bound**（题目已解析、
//! 监听已挂好）。组件仓库、题目列表、绑定表、状态标志全部收在 `Engine`
//! 一个聚合里，由单线程回调上下文独占修改：`questions` 只做整体替换，
//! `components` 只做带去重的追加，扫描中途不存在半成品状态可见。
//!
//! 触发重扫（Bound → Scanning）的只有两件事：页面 URL 变化（定时轮询
//! 发现，不依赖导航事件）、或 Bound 之后又送达了新的组件 URL。每次
//! 重扫都整体重建，不做增量比对。

use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, info};

use crate::dom::search::query_frames;
use crate::dom::{css_escape, Dom};
use crate::models::{ComponentStore, Question};
use crate::services::binder::{bind_questions, dispatch_event, Binding, Settle};
use crate::services::ingest::ingest_components;
use crate::services::resolver::resolve_components;
use crate::utils::truncate_text;

/// 生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// 空闲轮询，等待任一组件的根节点出现
    Scanning,
    /// 已完成 分类 → 解析 → 绑定，等待下一次触发
    Bound,
}

/// 答案注入引擎
///
/// 每个页面上下文生命周期构造一次，所有组件函数都通过引用拿它，
/// 不依赖模块级可变状态。
pub struct Engine<D: Dom> {
    dom: D,
    settle: Settle,
    store: ComponentStore,
    seen_urls: HashSet<String>,
    questions: Vec<Question<D::Node>>,
    bindings: Vec<Binding<D::Node>>,
    state: EngineState,
    scan_in_flight: bool,
    last_url: Option<String>,
}

impl<D: Dom> Engine<D> {
    pub fn new(dom: D, settle: Settle) -> Self {
        Self {
            dom,
            settle,
            store: ComponentStore::new(),
            seen_urls: HashSet::new(),
            questions: Vec::new(),
            bindings: Vec::new(),
            state: EngineState::Scanning,
            scan_in_flight: false,
            last_url: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn questions(&self) -> &[Question<D::Node>] {
        &self.questions
    }

    pub fn store(&self) -> &ComponentStore {
        &self.store
    }

    /// 外部送达一个组件 URL
    ///
    /// 同一 URL 只入库一次；已处于 Bound 时新 URL 会把引擎打回 Scanning。
    pub async fn deliver_components_url(&mut self, url: &str) {
        if !self.seen_urls.insert(url.to_string()) {
            debug!("组件 URL 已见过，忽略: {}", url);
            return;
        }
        info!("📥 收到组件 URL: {}", truncate_text(url, 120));
        let added = ingest_components(&self.dom, &mut self.store, url).await;
        info!("✓ 入库 {} 个组件，仓库共 {} 个", added, self.store.len());

        if self.state == EngineState::Bound {
            self.reset("新组件送达");
        }
    }

    /// 一次定时节拍：导航检测 → 就绪扫描 / 事件分发
    pub async fn tick(&mut self) -> Result<()> {
        let url = self.dom.current_url().await?;
        if self.last_url.as_deref() != Some(url.as_str()) {
            self.last_url = Some(url);
            self.reset("页面导航");
            // 本拍只重置，下一拍再扫，与扫描中的导航轮询互不打架
            return Ok(());
        }

        match self.state {
            EngineState::Scanning => {
                // 重入保护：上一轮扫描还在进行时忽略本拍
                if self.scan_in_flight {
                    return Ok(());
                }
                self.scan_in_flight = true;
                let result = self.try_bind().await;
                self.scan_in_flight = false;
                result
            }
            EngineState::Bound => self.pump_events().await,
        }
    }

    /// 就绪检查通过则执行完整的 分类 → 解析 → 绑定 流水线
    async fn try_bind(&mut self) -> Result<()> {
        if self.store.is_empty() || !self.is_ready().await? {
            return Ok(());
        }

        let resolution = resolve_components(&self.dom, &self.store).await?;
        self.questions = resolution.questions;
        self.bindings = resolution.bindings;
        bind_questions(&self.dom, &self.questions, &mut self.bindings).await?;

        self.state = EngineState::Bound;
        info!(
            "🎯 绑定完成: {} 道题，{} 条交互绑定",
            self.questions.len(),
            self.bindings.len()
        );
        Ok(())
    }

    /// 任一已知组件的 id 选择器能落到活动节点即视为就绪
    async fn is_ready(&self) -> Result<bool> {
        let doc = self.dom.document().await?;
        for component in self.store.components() {
            let selector = format!(".{}", css_escape(&component.id));
            if query_frames(&self.dom, &doc, &selector).await?.is_some() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Bound 态下取走页面记录的交互事件并回放答案
    async fn pump_events(&mut self) -> Result<()> {
        for event in self.dom.take_events().await? {
            dispatch_event(&self.dom, &self.settle, &self.bindings, &event).await?;
        }
        Ok(())
    }

    fn reset(&mut self, reason: &str) {
        // 上一轮的绑定整体作废，从零重建
        self.questions = Vec::new();
        self.bindings = Vec::new();
        if self.state != EngineState::Scanning {
            info!("🔄 重新扫描 ({})", reason);
        }
        self.state = EngineState::Scanning;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::fake::FakeDom;
    use crate::models::{AnswerInputs, QuestionKind};
    use serde_json::json;

    const COMPONENTS_URL: &str = "https://host/content/noes/1/components.json";

    fn fixture() -> serde_json::Value {
        json!([
            {
                "_id": "c1",
                "body": "Pick the right one.",
                "_items": [{"_shouldBeSelected": true}]
            },
            {
                "_id": "c2",
                "body": "Match these.",
                "_items": [{"question": "a", "answer": "b"}]
            },
            {
                "_id": "c3",
                "body": "Another.",
                "_items": [{"_shouldBeSelected": false}]
            }
        ])
    }

    /// 搭出 c1 的最小 DOM：根 div + 题干 + 一对 input/label
    fn build_c1(dom: &FakeDom) -> (usize, usize, usize) {
        let doc = dom.document_node();
        let div = dom.add_element(doc, "div");
        dom.set_attr(div, "class", "c1");
        let prompt = dom.add_element(div, "p");
        dom.set_text(prompt, "Pick the right one.");
        let input = dom.add_element(div, "input");
        dom.set_attr(input, "id", "c1-0-input");
        let label = dom.add_element(div, "label");
        dom.set_attr(label, "id", "c1-0-label");
        dom.set_attr(label, "for", "c1-0-input");
        dom.set_text(label, "Option A");
        (prompt, input, label)
    }

    #[test]
    fn end_to_end_scanning_to_bound_to_answer() {
        tokio_test::block_on(async {
            let dom = FakeDom::new();
            dom.set_url("https://host/course/module/1");
            dom.register_json(COMPONENTS_URL, fixture());

            let mut engine = Engine::new(dom, Settle::default());
            engine.deliver_components_url(COMPONENTS_URL).await;
            assert_eq!(engine.store().len(), 3);

            // 第一拍记录 URL，第二拍扫描但页面还没渲染
            engine.tick().await.unwrap();
            engine.tick().await.unwrap();
            assert_eq!(engine.state(), EngineState::Scanning);
            assert!(engine.questions().is_empty());

            let (prompt, _input, label) = build_c1(&engine.dom);
            engine.tick().await.unwrap();
            assert_eq!(engine.state(), EngineState::Bound);
            assert_eq!(engine.questions().len(), 1);
            let q = &engine.questions()[0];
            assert_eq!(q.kind, QuestionKind::Basic);
            assert_eq!(q.question_element, Some(prompt));
            match &q.inputs {
                AnswerInputs::Basic(inputs) => assert_eq!(inputs.len(), 1),
                other => panic!("意外的 inputs: {:?}", other),
            }

            // 模拟用户点击题干，下一拍回放答案：标签被点恰好一次
            engine.dom.dispatch_click(prompt);
            engine.tick().await.unwrap();
            assert_eq!(engine.dom.clicks_on(label), 1);

            // 状态已正确，再点不会重复点击
            engine.dom.dispatch_click(prompt);
            engine.tick().await.unwrap();
            assert_eq!(engine.dom.clicks_on(label), 1);
        });
    }

    #[test]
    fn navigation_resets_then_rebinds() {
        tokio_test::block_on(async {
            let dom = FakeDom::new();
            dom.set_url("https://host/course/module/1");
            dom.register_json(COMPONENTS_URL, fixture());

            let mut engine = Engine::new(dom, Settle::default());
            engine.deliver_components_url(COMPONENTS_URL).await;
            build_c1(&engine.dom);

            engine.tick().await.unwrap();
            engine.tick().await.unwrap();
            assert_eq!(engine.state(), EngineState::Bound);

            // URL 变化：先清空回到 Scanning，再在后续节拍里重建
            engine.dom.set_url("https://host/course/module/2");
            engine.tick().await.unwrap();
            assert_eq!(engine.state(), EngineState::Scanning);
            assert!(engine.questions().is_empty());

            engine.tick().await.unwrap();
            assert_eq!(engine.state(), EngineState::Bound);
            assert_eq!(engine.questions().len(), 1);
        });
    }

    #[test]
    fn duplicate_url_delivery_is_ignored() {
        tokio_test::block_on(async {
            let dom = FakeDom::new();
            dom.register_json(COMPONENTS_URL, fixture());

            let mut engine = Engine::new(dom, Settle::default());
            engine.deliver_components_url(COMPONENTS_URL).await;
            engine.deliver_components_url(COMPONENTS_URL).await;
            assert_eq!(engine.store().len(), 3);
        });
    }

    #[test]
    fn new_url_after_bound_triggers_rescan() {
        tokio_test::block_on(async {
            let dom = FakeDom::new();
            dom.set_url("https://host/course/module/1");
            dom.register_json(COMPONENTS_URL, fixture());
            dom.register_json(
                "https://host/content/noes/2/components.json",
                json!([{
                    "_id": "c9",
                    "body": "Late arrival.",
                    "_items": [{"_shouldBeSelected": true}]
                }]),
            );

            let mut engine = Engine::new(dom, Settle::default());
            engine.deliver_components_url(COMPONENTS_URL).await;
            build_c1(&engine.dom);
            engine.tick().await.unwrap();
            engine.tick().await.unwrap();
            assert_eq!(engine.state(), EngineState::Bound);

            engine
                .deliver_components_url("https://host/content/noes/2/components.json")
                .await;
            assert_eq!(engine.state(), EngineState::Scanning);
            assert_eq!(engine.store().len(), 4);

            engine.tick().await.unwrap();
            assert_eq!(engine.state(), EngineState::Bound);
        });
    }
}
