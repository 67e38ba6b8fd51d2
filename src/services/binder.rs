//! 交互绑定与答案回放
//!
//! 每条绑定 = 触发节点 + 触发方式（点击 / Ctrl-悬停）+ 答案回放动作。
//! 静态题型（basic / match / dropdownSelect）的动作只用解析阶段抓到的
//! 节点；动态题型的动作在触发时重新读取 DOM，因为同一批节点会被宿主
//! 应用复用给多个子题。缺失的控件一律存在性检查后跳过，不报错。

use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::dom::search::{query_deep, query_deep_all, wait_for};
use crate::dom::{Dom, EventKind, UiEvent};
use crate::models::{AnswerInputs, BasicInput, MatchPair, Question};

/// settle 等待参数：条件轮询的次数与间隔
#[derive(Debug, Clone, Copy)]
pub struct Settle {
    pub attempts: usize,
    pub interval: Duration,
}

impl Default for Settle {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_millis(100),
        }
    }
}

/// 图片判断题的一个条目：显示中的图判 alt，答案给 yes / no
#[derive(Debug, Clone)]
pub struct ImageJudgement {
    pub alt: String,
    pub answer_is_yes: bool,
}

/// 开放文本题的一个条目：提示文本 → 目标 position
#[derive(Debug, Clone)]
pub struct OpenTextTarget {
    pub prompt: String,
    pub position: Option<String>,
}

/// 答案回放动作
#[derive(Debug, Clone)]
pub enum Action<N> {
    /// basic：期望态与当前态不一致时点一次标签
    AnswerBasic { inputs: Vec<BasicInput<N>> },
    /// match：无条件点掉每一对的两半
    AnswerMatch { pairs: Vec<MatchPair<N>> },
    /// 点一个解析阶段就定好的节点（dropdownSelect / fillBlanks / tableDropdown）
    ClickNode { node: N },
    /// yesNo：触发时按当前显示图片的 alt 重新匹配条目
    JudgeImage {
        container: N,
        items: Vec<ImageJudgement>,
    },
    /// openTextInput：settle 后读当前提示，再 settle 后点目标
    AnswerOpenText {
        container: N,
        targets: Vec<OpenTextTarget>,
    },
}

/// 触发节点上的一条绑定
#[derive(Debug, Clone)]
pub struct Binding<N> {
    pub target: N,
    pub on: EventKind,
    pub action: Action<N>,
}

/// 给非 skip 题目挂通用绑定：题干节点上点击与 Ctrl-悬停各一条，动作相同
pub async fn bind_questions<D: Dom>(
    dom: &D,
    questions: &[Question<D::Node>],
    bindings: &mut Vec<Binding<D::Node>>,
) -> Result<()> {
    for question in questions.iter().filter(|q| !q.skip) {
        let Some(element) = &question.question_element else {
            // 题干没解析出来，这道题保持无操作
            debug!("题目 {} 缺少题干节点，不挂监听", question.component_id);
            continue;
        };
        let action = match &question.inputs {
            AnswerInputs::Basic(inputs) => Action::AnswerBasic {
                inputs: inputs.clone(),
            },
            AnswerInputs::Match(pairs) => Action::AnswerMatch {
                pairs: pairs.clone(),
            },
            AnswerInputs::Dropdown(node) => Action::ClickNode { node: node.clone() },
            AnswerInputs::None => continue,
        };
        dom.watch(element).await?;
        bindings.push(Binding {
            target: element.clone(),
            on: EventKind::Click,
            action: action.clone(),
        });
        bindings.push(Binding {
            target: element.clone(),
            on: EventKind::HoverWithModifier,
            action,
        });
    }
    Ok(())
}

/// 把一次页面事件分发给所有命中的绑定
pub async fn dispatch_event<D: Dom>(
    dom: &D,
    settle: &Settle,
    bindings: &[Binding<D::Node>],
    event: &UiEvent<D::Node>,
) -> Result<()> {
    for binding in bindings {
        if binding.target == event.target && binding.on == event.kind {
            run_action(dom, settle, &binding.action).await?;
        }
    }
    Ok(())
}

/// 执行一个答案回放动作
pub async fn run_action<D: Dom>(
    dom: &D,
    settle: &Settle,
    action: &Action<D::Node>,
) -> Result<()> {
    match action {
        Action::AnswerBasic { inputs } => {
            for entry in inputs {
                let checked = dom.is_checked(&entry.input).await?;
                // 点击切换是唯一可用的原语：当前态 ≠ 期望态时点一次标签
                if checked != entry.should_be_selected {
                    dom.click(&entry.label).await?;
                }
            }
        }
        Action::AnswerMatch { pairs } => {
            for pair in pairs {
                dom.click(&pair.first).await?;
                dom.click(&pair.second).await?;
            }
        }
        Action::ClickNode { node } => {
            dom.click(node).await?;
        }
        Action::JudgeImage { container, items } => {
            judge_image(dom, container, items).await?;
        }
        Action::AnswerOpenText { container, targets } => {
            answer_open_text(dom, settle, container, targets).await?;
        }
    }
    Ok(())
}

/// yesNo：触发时才解析，因为同一组节点被复用给多个子题
async fn judge_image<D: Dom>(
    dom: &D,
    container: &D::Node,
    items: &[ImageJudgement],
) -> Result<()> {
    let Some(img) = query_deep(dom, container, ".img_question").await? else {
        return Ok(());
    };
    // alt 可能在 .img_question 自身，也可能在其内部的 img 上
    let alt = match dom.attr(&img, "alt").await? {
        Some(alt) => Some(alt),
        None => match query_deep(dom, &img, "img").await? {
            Some(inner) => dom.attr(&inner, "alt").await?,
            None => None,
        },
    };
    let Some(alt) = alt else {
        debug!("图片判断题缺少 alt，跳过");
        return Ok(());
    };
    let Some(item) = items.iter().find(|it| it.alt == alt) else {
        debug!("没有 alt 为 {:?} 的条目，跳过", alt);
        return Ok(());
    };
    let selector = if item.answer_is_yes {
        ".user_selects_yes"
    } else {
        ".user_selects_no"
    };
    if let Some(button) = query_deep(dom, container, selector).await? {
        dom.click(&button).await?;
    }
    Ok(())
}

/// openTextInput：等 UI 稳定后读"当前条目"的提示文本，按条目的
/// position 解析 `[data-target]` 并点击；没有定位目标时点容器兜底
async fn answer_open_text<D: Dom>(
    dom: &D,
    settle: &Settle,
    container: &D::Node,
    targets: &[OpenTextTarget],
) -> Result<()> {
    let Some(current) = wait_for(
        dom,
        container,
        ".current-item",
        settle.attempts,
        settle.interval,
    )
    .await?
    else {
        return Ok(());
    };
    let prompt = dom.text(&current).await?;
    let prompt = prompt.trim();
    let Some(target) = targets.iter().find(|t| t.prompt.trim() == prompt) else {
        debug!("当前提示 {:?} 没有匹配条目，跳过", prompt);
        return Ok(());
    };
    match target.position.as_deref() {
        Some(position) => {
            let selector = format!("[data-target=\"{}\"]", position);
            match wait_for(dom, container, &selector, settle.attempts, settle.interval).await? {
                Some(node) => dom.click(&node).await?,
                None => dom.click(container).await?,
            }
        }
        None => dom.click(container).await?,
    }
    Ok(())
}

/// tableDropdown / fillBlanks 解析阶段用：在作用域里按去空白文本找选项
pub async fn find_option_by_text<D: Dom>(
    dom: &D,
    scope: &D::Node,
    selector: &str,
    wanted: &str,
) -> Result<Option<D::Node>> {
    for option in query_deep_all(dom, scope, selector, None).await? {
        if dom.text(&option).await?.trim() == wanted.trim() {
            return Ok(Some(option));
        }
    }
    Ok(None)
}
