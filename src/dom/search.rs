//! 深度树搜索
//!
//! 两种可组合的遍历策略：
//! - shadow-root 策略（`query_deep` / `query_deep_all` / `find_by_text`）：
//!   先查当前根的子树，再按文档序进入每个宿主元素的 shadow root；
//! - iframe 策略（`query_frames`）：某一层存在 iframe 时，直接进入各
//!   iframe 的 contentDocument 继续，**并跳过该层的 shadow-root 搜索**
//!   （沿用原有优先级，保持选择语义可审计）。
//!
//! 找不到永远是正常结果（内容尚未渲染），返回 `None` / 空列表，不报错。

use std::collections::VecDeque;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;

use crate::dom::Dom;

/// 深度搜索的第一个匹配
pub async fn query_deep<D: Dom>(
    dom: &D,
    root: &D::Node,
    selector: &str,
) -> Result<Option<D::Node>> {
    let mut stack = vec![root.clone()];
    while let Some(scope) = stack.pop() {
        if let Some(hit) = dom.query(&scope, selector).await?.into_iter().next() {
            return Ok(Some(hit));
        }
        // 逆序压栈，保证按文档序深入
        let mut shadows = dom.shadow_roots(&scope).await?;
        shadows.reverse();
        stack.extend(shadows);
    }
    Ok(None)
}

/// 深度搜索全部匹配
///
/// `expected` 给定时按"整组匹配"处理：第一个恰好命中 `expected` 个
/// 结果的作用域胜出（配对按钮这类多段控件成组出现），其余作用域的
/// 零散命中不算；穷尽后返回空列表。
pub async fn query_deep_all<D: Dom>(
    dom: &D,
    root: &D::Node,
    selector: &str,
    expected: Option<usize>,
) -> Result<Vec<D::Node>> {
    let mut found = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(scope) = stack.pop() {
        let hits = dom.query(&scope, selector).await?;
        match expected {
            Some(n) => {
                if hits.len() == n {
                    return Ok(hits);
                }
            }
            None => found.extend(hits),
        }
        let mut shadows = dom.shadow_roots(&scope).await?;
        shadows.reverse();
        stack.extend(shadows);
    }
    if expected.is_some() {
        Ok(Vec::new())
    } else {
        Ok(found)
    }
}

/// iframe 感知入口
///
/// 某个文档下只要存在 iframe，就进入各 iframe 的 contentDocument 继续
/// 查找，该层自身的 shadow-root 搜索被短路掉；没有 iframe 的文档退化为
/// `query_deep`。
pub async fn query_frames<D: Dom>(
    dom: &D,
    root: &D::Node,
    selector: &str,
) -> Result<Option<D::Node>> {
    let mut docs = VecDeque::new();
    docs.push_back(root.clone());
    while let Some(doc) = docs.pop_front() {
        let frames = dom.frame_documents(&doc).await?;
        if frames.is_empty() {
            if let Some(hit) = query_deep(dom, &doc, selector).await? {
                return Ok(Some(hit));
            }
        } else {
            docs.extend(frames);
        }
    }
    Ok(None)
}

/// 按去除首尾空白后的 textContent 精确匹配查找元素
///
/// 用于在大量元素中定位题干的字面文本，遍历方式与 `query_deep` 一致。
pub async fn find_by_text<D: Dom>(
    dom: &D,
    root: &D::Node,
    needle: &str,
) -> Result<Option<D::Node>> {
    let needle = needle.trim();
    let mut stack = vec![root.clone()];
    while let Some(scope) = stack.pop() {
        for el in dom.query(&scope, "*").await? {
            if dom.text(&el).await?.trim() == needle {
                return Ok(Some(el));
            }
        }
        let mut shadows = dom.shadow_roots(&scope).await?;
        shadows.reverse();
        stack.extend(shadows);
    }
    Ok(None)
}

/// 有界的条件等待：反复深度查找直到选择器出现或尝试次数耗尽
///
/// 取代固定时长的 settle 延时链，让时序假设显式且可配置。
pub async fn wait_for<D: Dom>(
    dom: &D,
    root: &D::Node,
    selector: &str,
    attempts: usize,
    interval: Duration,
) -> Result<Option<D::Node>> {
    for attempt in 0..attempts.max(1) {
        if let Some(hit) = query_deep(dom, root, selector).await? {
            return Ok(Some(hit));
        }
        if attempt + 1 < attempts.max(1) {
            sleep(interval).await;
        }
    }
    Ok(None)
}
