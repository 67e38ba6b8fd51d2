//! 测试用内存 DOM
//!
//! 用 arena 存树，支持引擎实际用到的简单选择器子集
//! （`tag` / `*` / `#id` / `.class` / `[attr="value"]` 及其组合，无组合器）。
//! 点击会被记录下来供断言，`input` 节点的点击会翻转选中态。

use std::cell::RefCell;
use std::collections::HashMap;

use anyhow::{anyhow, Result};
use serde_json::Value as JsonValue;

use crate::dom::{is_shadow_host_tag, Dom, EventKind, UiEvent};

#[derive(Debug, Default)]
struct FakeNode {
    tag: String,
    attrs: HashMap<String, String>,
    text: String,
    checked: bool,
    children: Vec<usize>,
    shadow: Option<usize>,
    frame_doc: Option<usize>,
    parent: Option<usize>,
}

#[derive(Debug, Default)]
struct Inner {
    nodes: Vec<FakeNode>,
    url: String,
    watched: Vec<usize>,
    events: Vec<UiEvent<usize>>,
    clicks: Vec<usize>,
    fixtures: HashMap<String, JsonValue>,
}

/// 内存 DOM；节点句柄是 arena 下标
#[derive(Debug, Default)]
pub struct FakeDom {
    inner: RefCell<Inner>,
}

impl FakeDom {
    pub fn new() -> Self {
        let dom = Self::default();
        {
            let mut inner = dom.inner.borrow_mut();
            inner.nodes.push(FakeNode {
                tag: "#document".to_string(),
                ..Default::default()
            });
            inner.url = "about:blank".to_string();
        }
        dom
    }

    pub fn document_node(&self) -> usize {
        0
    }

    // ---------- 建树 ----------

    pub fn add_element(&self, parent: usize, tag: &str) -> usize {
        let mut inner = self.inner.borrow_mut();
        let id = inner.nodes.len();
        inner.nodes.push(FakeNode {
            tag: tag.to_string(),
            parent: Some(parent),
            ..Default::default()
        });
        inner.nodes[parent].children.push(id);
        id
    }

    pub fn set_attr(&self, node: usize, name: &str, value: &str) {
        self.inner.borrow_mut().nodes[node]
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    pub fn set_text(&self, node: usize, text: &str) {
        self.inner.borrow_mut().nodes[node].text = text.to_string();
    }

    pub fn set_checked(&self, node: usize, checked: bool) {
        self.inner.borrow_mut().nodes[node].checked = checked;
    }

    pub fn is_node_checked(&self, node: usize) -> bool {
        self.inner.borrow().nodes[node].checked
    }

    /// 给宿主元素挂 shadow root，返回 shadow root 句柄
    pub fn attach_shadow(&self, host: usize) -> usize {
        let mut inner = self.inner.borrow_mut();
        let id = inner.nodes.len();
        inner.nodes.push(FakeNode {
            tag: "#shadow-root".to_string(),
            parent: Some(host),
            ..Default::default()
        });
        inner.nodes[host].shadow = Some(id);
        id
    }

    /// 插入 iframe，返回 (iframe 元素, contentDocument)
    pub fn add_iframe(&self, parent: usize) -> (usize, usize) {
        let frame = self.add_element(parent, "iframe");
        let mut inner = self.inner.borrow_mut();
        let doc = inner.nodes.len();
        inner.nodes.push(FakeNode {
            tag: "#document".to_string(),
            parent: Some(frame),
            ..Default::default()
        });
        inner.nodes[frame].frame_doc = Some(doc);
        (frame, doc)
    }

    // ---------- 模拟外部世界 ----------

    pub fn set_url(&self, url: &str) {
        self.inner.borrow_mut().url = url.to_string();
    }

    pub fn register_json(&self, url: &str, body: JsonValue) {
        self.inner
            .borrow_mut()
            .fixtures
            .insert(url.to_string(), body);
    }

    /// 模拟用户点击（只有被 watch 的节点才会产生事件）
    pub fn dispatch_click(&self, node: usize) {
        let mut inner = self.inner.borrow_mut();
        if inner.watched.contains(&node) {
            inner.events.push(UiEvent {
                target: node,
                kind: EventKind::Click,
            });
        }
    }

    /// 模拟按住修饰键的悬停
    pub fn dispatch_hover_with_modifier(&self, node: usize) {
        let mut inner = self.inner.borrow_mut();
        if inner.watched.contains(&node) {
            inner.events.push(UiEvent {
                target: node,
                kind: EventKind::HoverWithModifier,
            });
        }
    }

    /// 引擎派发过的全部合成点击（按时间序）
    pub fn clicks(&self) -> Vec<usize> {
        self.inner.borrow().clicks.clone()
    }

    pub fn clicks_on(&self, node: usize) -> usize {
        self.inner.borrow().clicks.iter().filter(|&&n| n == node).count()
    }

    pub fn is_watched(&self, node: usize) -> bool {
        self.inner.borrow().watched.contains(&node)
    }

    // ---------- 内部遍历 ----------

    /// root 子树的全部后代（文档序，不穿透 shadow / iframe）
    fn descendants(&self, root: usize) -> Vec<usize> {
        let inner = self.inner.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<usize> = inner.nodes[root].children.iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(inner.nodes[n].children.iter().rev());
        }
        out
    }

    fn node_matches(&self, node: usize, selector: &str) -> bool {
        let parsed = ParsedSelector::parse(selector);
        let inner = self.inner.borrow();
        parsed.matches(&inner.nodes[node])
    }

    fn collect_text(&self, node: usize, out: &mut String) {
        let (text, children) = {
            let inner = self.inner.borrow();
            (
                inner.nodes[node].text.clone(),
                inner.nodes[node].children.clone(),
            )
        };
        out.push_str(&text);
        for c in children {
            self.collect_text(c, out);
        }
    }
}

/// 单个复合选择器（无后代/子组合器）
#[derive(Debug, Default)]
struct ParsedSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
}

impl ParsedSelector {
    fn parse(selector: &str) -> Self {
        let mut out = Self::default();
        let mut rest = selector.trim();
        // 前导标签名或通配
        let head_end = rest
            .find(|c| c == '#' || c == '.' || c == '[')
            .unwrap_or(rest.len());
        let head = &rest[..head_end];
        if !head.is_empty() && head != "*" {
            out.tag = Some(head.to_ascii_lowercase());
        }
        rest = &rest[head_end..];
        while !rest.is_empty() {
            if let Some(tail) = rest.strip_prefix('#') {
                let end = tail
                    .find(|c| c == '#' || c == '.' || c == '[')
                    .unwrap_or(tail.len());
                out.id = Some(tail[..end].replace('\\', ""));
                rest = &tail[end..];
            } else if let Some(tail) = rest.strip_prefix('.') {
                let end = tail
                    .find(|c| c == '#' || c == '.' || c == '[')
                    .unwrap_or(tail.len());
                out.classes.push(tail[..end].replace('\\', ""));
                rest = &tail[end..];
            } else if let Some(tail) = rest.strip_prefix('[') {
                let end = tail.find(']').unwrap_or(tail.len());
                let body = &tail[..end];
                if let Some((name, value)) = body.split_once('=') {
                    out.attrs.push((
                        name.to_string(),
                        value.trim_matches('"').trim_matches('\'').to_string(),
                    ));
                } else {
                    out.attrs.push((body.to_string(), String::new()));
                }
                rest = tail.get(end + 1..).unwrap_or("");
            } else {
                break;
            }
        }
        out
    }

    fn matches(&self, node: &FakeNode) -> bool {
        if node.tag.starts_with('#') {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !node.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attrs.get("id") != Some(id) {
                return false;
            }
        }
        for class in &self.classes {
            let has = node
                .attrs
                .get("class")
                .map(|c| c.split_whitespace().any(|p| p == class))
                .unwrap_or(false);
            if !has {
                return false;
            }
        }
        for (name, value) in &self.attrs {
            match node.attrs.get(name) {
                Some(v) if value.is_empty() || v == value => {}
                _ => return false,
            }
        }
        true
    }
}

impl Dom for FakeDom {
    type Node = usize;

    async fn document(&self) -> Result<usize> {
        Ok(0)
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.inner.borrow().url.clone())
    }

    async fn query(&self, root: &usize, selector: &str) -> Result<Vec<usize>> {
        Ok(self
            .descendants(*root)
            .into_iter()
            .filter(|&n| self.node_matches(n, selector))
            .collect())
    }

    async fn shadow_roots(&self, root: &usize) -> Result<Vec<usize>> {
        let candidates = self.descendants(*root);
        let inner = self.inner.borrow();
        Ok(candidates
            .into_iter()
            .filter(|&n| is_shadow_host_tag(&inner.nodes[n].tag))
            .filter_map(|n| inner.nodes[n].shadow)
            .collect())
    }

    async fn frame_documents(&self, root: &usize) -> Result<Vec<usize>> {
        let candidates = self.descendants(*root);
        let inner = self.inner.borrow();
        Ok(candidates
            .into_iter()
            .filter(|&n| inner.nodes[n].tag == "iframe")
            .filter_map(|n| inner.nodes[n].frame_doc)
            .collect())
    }

    async fn text(&self, node: &usize) -> Result<String> {
        let mut out = String::new();
        self.collect_text(*node, &mut out);
        Ok(out)
    }

    async fn attr(&self, node: &usize, name: &str) -> Result<Option<String>> {
        Ok(self.inner.borrow().nodes[*node].attrs.get(name).cloned())
    }

    async fn parent(&self, node: &usize) -> Result<Option<usize>> {
        Ok(self.inner.borrow().nodes[*node].parent)
    }

    async fn click(&self, node: &usize) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        inner.clicks.push(*node);
        if inner.nodes[*node].tag == "input" {
            inner.nodes[*node].checked = !inner.nodes[*node].checked;
        } else if inner.nodes[*node].tag == "label" {
            // label 点击转发给 for 指向的 input，与浏览器行为一致
            if let Some(target_id) = inner.nodes[*node].attrs.get("for").cloned() {
                let target = inner
                    .nodes
                    .iter()
                    .position(|n| n.attrs.get("id") == Some(&target_id));
                if let Some(t) = target {
                    inner.nodes[t].checked = !inner.nodes[t].checked;
                }
            }
        }
        Ok(())
    }

    async fn is_checked(&self, node: &usize) -> Result<bool> {
        Ok(self.inner.borrow().nodes[*node].checked)
    }

    async fn watch(&self, node: &usize) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.watched.contains(node) {
            inner.watched.push(*node);
        }
        Ok(())
    }

    async fn take_events(&self) -> Result<Vec<UiEvent<usize>>> {
        Ok(std::mem::take(&mut self.inner.borrow_mut().events))
    }

    async fn fetch_json(&self, url: &str) -> Result<JsonValue> {
        self.inner
            .borrow()
            .fixtures
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("模拟 404: {}", url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_subset_matches() {
        tokio_test::block_on(async {
            let dom = FakeDom::new();
            let doc = dom.document_node();
            let el = dom.add_element(doc, "button");
            dom.set_attr(el, "id", "q1-0-input");
            dom.set_attr(el, "class", "dropdown__item active");
            dom.set_attr(el, "data-id", "3");

            assert_eq!(dom.query(&doc, "#q1-0-input").await.unwrap(), vec![el]);
            assert_eq!(dom.query(&doc, ".dropdown__item").await.unwrap(), vec![el]);
            assert_eq!(
                dom.query(&doc, "button[data-id=\"3\"]").await.unwrap(),
                vec![el]
            );
            assert!(dom.query(&doc, "[data-id=\"4\"]").await.unwrap().is_empty());
            assert_eq!(dom.query(&doc, "*").await.unwrap(), vec![el]);
        });
    }

    #[test]
    fn input_click_toggles_checked() {
        tokio_test::block_on(async {
            let dom = FakeDom::new();
            let doc = dom.document_node();
            let input = dom.add_element(doc, "input");
            assert!(!dom.is_checked(&input).await.unwrap());
            dom.click(&input).await.unwrap();
            assert!(dom.is_checked(&input).await.unwrap());
            assert_eq!(dom.clicks_on(input), 1);
        });
    }

    #[test]
    fn label_click_toggles_its_for_input() {
        tokio_test::block_on(async {
            let dom = FakeDom::new();
            let doc = dom.document_node();
            let input = dom.add_element(doc, "input");
            dom.set_attr(input, "id", "q-0-input");
            let label = dom.add_element(doc, "label");
            dom.set_attr(label, "for", "q-0-input");

            dom.click(&label).await.unwrap();
            assert!(dom.is_checked(&input).await.unwrap());
            assert_eq!(dom.clicks_on(label), 1);
        });
    }

    #[test]
    fn events_only_for_watched_nodes() {
        tokio_test::block_on(async {
            let dom = FakeDom::new();
            let doc = dom.document_node();
            let a = dom.add_element(doc, "div");
            let b = dom.add_element(doc, "div");
            dom.watch(&a).await.unwrap();

            dom.dispatch_click(a);
            dom.dispatch_click(b);
            dom.dispatch_hover_with_modifier(a);

            let events = dom.take_events().await.unwrap();
            assert_eq!(events.len(), 2);
            assert!(events.iter().all(|e| e.target == a));
            assert!(dom.take_events().await.unwrap().is_empty());
        });
    }
}
