//! 基于 CDP 的 `Dom` 实现
//!
//! 在页面里装一个小的节点注册表（`window.__qaa`），Rust 侧的节点句柄
//! 就是注册表下标。每次调用前都确保注册表还在——页面导航会把它冲掉，
//! 冲掉之后旧句柄随之失效，引擎在下一次导航检测时整体重建。

use anyhow::{bail, Result};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::dom::{Dom, EventKind, UiEvent};
use crate::infrastructure::JsExecutor;

/// 页面侧助手：节点注册表 + 原语 + 事件队列
///
/// 宿主标签启发式与 `dom::is_shadow_host_tag` 保持一致。
const HELPER_JS: &str = r#"
(() => {
  if (window.__qaa) return true;
  const nodes = [document];
  const events = [];
  const reg = (n) => {
    const i = nodes.indexOf(n);
    if (i >= 0) return i;
    nodes.push(n);
    return nodes.length - 1;
  };
  const isHost = (el) => {
    const t = el.tagName ? el.tagName.toLowerCase() : '';
    return t.endsWith('-view') || t === 'app-root';
  };
  window.__qaa = {
    url: () => location.href,
    query: (r, sel) => {
      const root = nodes[r];
      if (!root) return [];
      return [...root.querySelectorAll(sel)].map(reg);
    },
    shadowRoots: (r) => {
      const root = nodes[r];
      if (!root) return [];
      return [...root.querySelectorAll('*')]
        .filter(isHost)
        .map(el => el.shadowRoot)
        .filter(Boolean)
        .map(reg);
    },
    frames: (r) => {
      const root = nodes[r];
      if (!root) return [];
      return [...root.querySelectorAll('iframe')]
        .map(f => { try { return f.contentDocument; } catch (e) { return null; } })
        .filter(Boolean)
        .map(reg);
    },
    text: (n) => nodes[n] ? (nodes[n].textContent || '') : '',
    attr: (n, name) => {
      const el = nodes[n];
      return el && el.getAttribute ? el.getAttribute(name) : null;
    },
    parent: (n) => {
      const el = nodes[n];
      return el && el.parentElement ? reg(el.parentElement) : null;
    },
    click: (n) => {
      const el = nodes[n];
      if (!el || !el.click) return false;
      el.click();
      return true;
    },
    checked: (n) => nodes[n] ? !!nodes[n].checked : false,
    watch: (n) => {
      const el = nodes[n];
      if (!el || el.__qaaWatched) return false;
      el.__qaaWatched = true;
      el.addEventListener('click', () => events.push({ target: n, kind: 'click' }));
      el.addEventListener('mouseover', (e) => {
        if (e.ctrlKey) events.push({ target: n, kind: 'hover' });
      });
      return true;
    },
    drain: () => events.splice(0, events.length),
  };
  return true;
})()
"#;

#[derive(Debug, Deserialize)]
struct RawEvent {
    target: u64,
    kind: String,
}

/// CDP 页面上的 DOM 视图
pub struct CdpDom {
    executor: JsExecutor,
}

impl CdpDom {
    pub fn new(executor: JsExecutor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &JsExecutor {
        &self.executor
    }

    /// 注册表装载是幂等的，导航后第一次调用会重装
    async fn ensure_helper(&self) -> Result<()> {
        self.executor.eval(HELPER_JS).await?;
        Ok(())
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, expr: String) -> Result<T> {
        self.ensure_helper().await?;
        self.executor.eval_as(expr).await
    }

    fn js_str(s: &str) -> Result<String> {
        Ok(serde_json::to_string(s)?)
    }
}

impl Dom for CdpDom {
    type Node = u64;

    async fn document(&self) -> Result<u64> {
        // document 永远是注册表 0 号
        self.ensure_helper().await?;
        Ok(0)
    }

    async fn current_url(&self) -> Result<String> {
        self.call("__qaa.url()".to_string()).await
    }

    async fn query(&self, root: &u64, selector: &str) -> Result<Vec<u64>> {
        let expr = format!("__qaa.query({}, {})", root, Self::js_str(selector)?);
        self.call(expr).await
    }

    async fn shadow_roots(&self, root: &u64) -> Result<Vec<u64>> {
        self.call(format!("__qaa.shadowRoots({})", root)).await
    }

    async fn frame_documents(&self, root: &u64) -> Result<Vec<u64>> {
        self.call(format!("__qaa.frames({})", root)).await
    }

    async fn text(&self, node: &u64) -> Result<String> {
        self.call(format!("__qaa.text({})", node)).await
    }

    async fn attr(&self, node: &u64, name: &str) -> Result<Option<String>> {
        let expr = format!("__qaa.attr({}, {})", node, Self::js_str(name)?);
        self.call(expr).await
    }

    async fn parent(&self, node: &u64) -> Result<Option<u64>> {
        self.call(format!("__qaa.parent({})", node)).await
    }

    async fn click(&self, node: &u64) -> Result<()> {
        let ok: bool = self.call(format!("__qaa.click({})", node)).await?;
        if !ok {
            bail!("节点句柄已失效: {}", node);
        }
        Ok(())
    }

    async fn is_checked(&self, node: &u64) -> Result<bool> {
        self.call(format!("__qaa.checked({})", node)).await
    }

    async fn watch(&self, node: &u64) -> Result<()> {
        let _installed: bool = self.call(format!("__qaa.watch({})", node)).await?;
        Ok(())
    }

    async fn take_events(&self) -> Result<Vec<UiEvent<u64>>> {
        let raw: Vec<RawEvent> = self.call("__qaa.drain()".to_string()).await?;
        Ok(raw
            .into_iter()
            .filter_map(|e| {
                let kind = match e.kind.as_str() {
                    "click" => EventKind::Click,
                    "hover" => EventKind::HoverWithModifier,
                    _ => return None,
                };
                Some(UiEvent {
                    target: e.target,
                    kind,
                })
            })
            .collect())
    }

    /// 在页面上下文里 fetch，沿用页面自己的 Cookie 与权限
    async fn fetch_json(&self, url: &str) -> Result<JsonValue> {
        let js = format!(
            r#"
            (async () => {{
                const res = await fetch({url}, {{ credentials: 'include' }});
                if (!res.ok) {{
                    return {{ __qaa_http_error: res.status }};
                }}
                return await res.json();
            }})()
            "#,
            url = Self::js_str(url)?
        );
        let value = self.executor.eval(js).await?;
        if let Some(status) = value.get("__qaa_http_error").and_then(|v| v.as_u64()) {
            bail!("HTTP {}: {}", status, url);
        }
        Ok(value)
    }
}
