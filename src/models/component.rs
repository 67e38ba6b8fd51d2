//! 组件数据模型
//!
//! 一个 Component 就是远端 `components.json` 里的一道题定义：
//! 稳定 id + 纯文本题干 + 答案条目列表。条目的字段形状决定题型。

use std::collections::HashSet;
use std::sync::OnceLock;

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;

/// 图片判断题条目携带的图形信息
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Graphic {
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub src: Option<String>,
}

/// 条目下挂的单个选项
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemOption {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "_isCorrect", default)]
    pub is_correct: Option<bool>,
}

/// `_options` 在线上数据里既可能是列表也可能是单个对象
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ItemOptions {
    Many(Vec<ItemOption>),
    One(ItemOption),
}

/// 一个答案条目；哪些可选字段出现决定了所属组件的题型
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "_shouldBeSelected", default)]
    pub should_be_selected: Option<bool>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "_options", default)]
    pub options: Option<ItemOptions>,
    #[serde(rename = "_graphic", default)]
    pub graphic: Option<Graphic>,
    #[serde(rename = "preText", default)]
    pub pre_text: Option<String>,
    #[serde(rename = "postText", default)]
    pub post_text: Option<String>,
    /// `[data-target]` 定位用；线上数据里数字与字符串都出现过
    #[serde(default)]
    pub position: Option<JsonValue>,
}

impl Item {
    /// `_options` 为列表时的视图
    pub fn options_list(&self) -> Option<&[ItemOption]> {
        match &self.options {
            Some(ItemOptions::Many(list)) => Some(list),
            _ => None,
        }
    }

    /// `_options` 为单个对象时的视图
    pub fn single_option(&self) -> Option<&ItemOption> {
        match &self.options {
            Some(ItemOptions::One(opt)) => Some(opt),
            _ => None,
        }
    }

    /// 列表选项中标记为正确的那个的下标
    pub fn correct_option_index(&self) -> Option<usize> {
        self.options_list()?
            .iter()
            .position(|o| o.is_correct == Some(true))
    }

    /// 列表选项中标记为正确的那个的文本
    pub fn correct_option_text(&self) -> Option<&str> {
        let list = self.options_list()?;
        list.iter()
            .find(|o| o.is_correct == Some(true))
            .and_then(|o| o.text.as_deref())
    }

    pub fn position_str(&self) -> Option<String> {
        match &self.position {
            Some(JsonValue::String(s)) => Some(s.clone()),
            Some(JsonValue::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// 一道题的定义
#[derive(Debug, Clone, Deserialize)]
pub struct Component {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "_items", default)]
    pub items: Vec<Item>,
}

impl Component {
    /// 从一条 JSON 记录解析组件，并把题干里的 HTML 剥成纯文本
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let mut component: Component = serde_json::from_value(value.clone())?;
        component.body = strip_html(&component.body)?;
        Ok(component)
    }
}

/// 去掉 HTML 标签并还原常见实体
pub fn strip_html(html: &str) -> Result<String> {
    // 标签正则只编译一次，跨调用复用
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    let re = match TAG_RE.get() {
        Some(re) => re,
        None => {
            let compiled = Regex::new(r"<[^>]*>")?;
            TAG_RE.get_or_init(|| compiled)
        }
    };
    let text = re.replace_all(html, "");
    Ok(text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&"))
}

/// 组件仓库
///
/// 跨多次抓取累积，id 去重，只增不清：重复 id 的后来者被丢弃而不是合并。
#[derive(Debug, Default)]
pub struct ComponentStore {
    components: Vec<Component>,
    ids: HashSet<String>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试收录组件；没有条目的或 id 已存在的直接丢弃
    pub fn insert(&mut self, component: Component) -> bool {
        if component.items.is_empty() || self.ids.contains(&component.id) {
            return false;
        }
        self.ids.insert(component.id.clone());
        self.components.push(component);
        true
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn get(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
