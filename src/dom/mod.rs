//! DOM 抽象层
//!
//! 引擎核心不直接依赖 CDP，而是通过 `Dom` trait 访问页面：
//! - 生产实现：`infrastructure::CdpDom`（页面内节点注册表 + JS 执行）
//! - 测试实现：`dom::fake::FakeDom`（内存树，确定性）
//!
//! 所有查询都以"某个根节点的子树"为单位，不跨越 shadow root 或 iframe
//! 边界；跨边界的深度遍历统一由 `dom::search` 组合出来。

use anyhow::Result;
use serde_json::Value as JsonValue;

pub mod search;

#[cfg(test)]
pub mod fake;

/// 页面上报的用户交互事件种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// 普通点击
    Click,
    /// 按住修饰键（Ctrl）时的悬停
    HoverWithModifier,
}

/// 绑定节点上发生的一次用户交互
#[derive(Debug, Clone)]
pub struct UiEvent<N> {
    pub target: N,
    pub kind: EventKind,
}

/// 页面 DOM 能力接口
///
/// `Node` 是实现方的节点句柄（CDP 实现用注册表下标，测试实现用 arena
/// 下标），只在当前页面生命周期内有效，引擎不拥有任何节点。
#[allow(async_fn_in_trait)]
pub trait Dom {
    type Node: Clone + PartialEq + std::fmt::Debug;

    /// 顶层 document 节点
    async fn document(&self) -> Result<Self::Node>;

    /// 当前页面 URL（用于导航轮询）
    async fn current_url(&self) -> Result<String>;

    /// 在 root 的子树内执行选择器，返回全部匹配（不进入 shadow root / iframe）
    async fn query(&self, root: &Self::Node, selector: &str) -> Result<Vec<Self::Node>>;

    /// root 子树内符合宿主标签启发式的元素的 shadow root 列表（文档序）
    async fn shadow_roots(&self, root: &Self::Node) -> Result<Vec<Self::Node>>;

    /// root 子树内 iframe 的 contentDocument 列表（跨域等不可达的跳过）
    async fn frame_documents(&self, root: &Self::Node) -> Result<Vec<Self::Node>>;

    /// 节点的 textContent
    async fn text(&self, node: &Self::Node) -> Result<String>;

    /// 节点属性值
    async fn attr(&self, node: &Self::Node, name: &str) -> Result<Option<String>>;

    /// 父元素
    async fn parent(&self, node: &Self::Node) -> Result<Option<Self::Node>>;

    /// 对节点派发一次合成点击
    async fn click(&self, node: &Self::Node) -> Result<()>;

    /// 复选框 / 单选框当前是否选中
    async fn is_checked(&self, node: &Self::Node) -> Result<bool>;

    /// 监听该节点的点击与 Ctrl-悬停事件
    async fn watch(&self, node: &Self::Node) -> Result<()>;

    /// 取走自上次调用以来记录的全部交互事件
    async fn take_events(&self) -> Result<Vec<UiEvent<Self::Node>>>;

    /// 在页面上下文内 fetch 指定 URL 并解析为 JSON（携带页面 Cookie）
    async fn fetch_json(&self, url: &str) -> Result<JsonValue>;
}

/// shadow root 宿主标签启发式：标签名以 `-view` 结尾，或为根组件标签
pub fn is_shadow_host_tag(tag: &str) -> bool {
    let tag = tag.to_ascii_lowercase();
    tag.ends_with("-view") || tag == "app-root"
}

/// 最小化的 CSS 标识符转义（对应页面侧的 `CSS.escape`）
///
/// 组件 id 会被拼进 `.{id}` 这类选择器，这里只处理实际会出现的字符：
/// 非 ASCII 字母数字、`-`、`_` 的字符前加反斜杠，首字符为数字时转义。
pub fn css_escape(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for (i, c) in ident.chars().enumerate() {
        let safe = c.is_ascii_alphanumeric() || c == '-' || c == '_';
        if i == 0 && c.is_ascii_digit() {
            out.push_str(&format!("\\3{} ", c));
        } else if safe {
            out.push(c);
        } else {
            out.push('\\');
            out.push(c);
        }
    }
    out
}
