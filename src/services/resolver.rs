//! 题目解析
//!
//! 对仓库里每个能在页面上找到根节点的组件，按题型解析出题干与答案
//! 控件。静态题型产出待绑定的 `Question`；动态题型（yesNo /
//! openTextInput / fillBlanks / tableDropdown）以及 dropdownSelect 的
//! 合成题在这里就地挂好绑定并标记 `skip`。解析不到的控件留空，
//! 对应的交互自然退化为无操作。

use anyhow::Result;
use tracing::{debug, info};

use crate::dom::search::{find_by_text, query_deep, query_deep_all, query_frames};
use crate::dom::{css_escape, Dom, EventKind};
use crate::models::component::strip_html;
use crate::models::{
    AnswerInputs, BasicInput, Component, ComponentStore, MatchPair, Question, QuestionKind,
};
use crate::services::binder::{
    find_option_by_text, Action, Binding, ImageJudgement, OpenTextTarget,
};
use crate::services::classifier;

/// 一次全量解析的产物：题目绑定列表 + 已就地挂好的交互绑定
#[derive(Debug)]
pub struct Resolution<N> {
    pub questions: Vec<Question<N>>,
    pub bindings: Vec<Binding<N>>,
}

impl<N> Default for Resolution<N> {
    fn default() -> Self {
        Self {
            questions: Vec::new(),
            bindings: Vec::new(),
        }
    }
}

/// 解析仓库中全部组件
///
/// 先整体判型，判完再逐个解析，保证分类完整先于解析完成。
pub async fn resolve_components<D: Dom>(
    dom: &D,
    store: &ComponentStore,
) -> Result<Resolution<D::Node>> {
    let classified: Vec<(&Component, QuestionKind)> = store
        .components()
        .iter()
        .map(|c| (c, classifier::classify(c)))
        .collect();

    let doc = dom.document().await?;
    let mut out = Resolution::default();

    for (component, kind) in classified {
        let selector = format!(".{}", css_escape(&component.id));
        let Some(div) = query_frames(dom, &doc, &selector).await? else {
            debug!("组件 {} 在页面上没有根节点，跳过", component.id);
            continue;
        };

        match kind {
            QuestionKind::Basic => resolve_basic(dom, component, &div, &mut out).await?,
            QuestionKind::Match => resolve_match(dom, component, &div, &mut out).await?,
            QuestionKind::DropdownSelect => {
                resolve_dropdown_select(dom, component, &div, &mut out).await?
            }
            QuestionKind::YesNo => resolve_yes_no(dom, component, &div, &mut out).await?,
            QuestionKind::OpenTextInput => {
                resolve_open_text(dom, component, &div, &mut out).await?
            }
            QuestionKind::FillBlanks => resolve_fill_blanks(dom, component, &div, &mut out).await?,
            QuestionKind::TableDropdown => {
                resolve_table_dropdown(dom, component, &div, &mut out).await?
            }
        }
        info!("✓ 解析题目 {} ({})", component.id, kind);
    }

    Ok(out)
}

/// basic：逐条找 `#<id>-<i>-input` / `-label`，凑齐即止
async fn resolve_basic<D: Dom>(
    dom: &D,
    component: &Component,
    div: &D::Node,
    out: &mut Resolution<D::Node>,
) -> Result<()> {
    let esc = css_escape(&component.id);
    let mut inputs = Vec::new();
    for (i, item) in component.items.iter().enumerate() {
        let input = query_deep(dom, div, &format!("#{}-{}-input", esc, i)).await?;
        let label = query_deep(dom, div, &format!("#{}-{}-label", esc, i)).await?;
        if let (Some(input), Some(label)) = (input, label) {
            inputs.push(BasicInput {
                input,
                label,
                should_be_selected: item.should_be_selected.unwrap_or(false),
            });
        }
        if inputs.len() == component.items.len() {
            break;
        }
    }
    let question_element = find_by_text(dom, div, &component.body).await?;
    out.questions.push(Question {
        component_id: component.id.clone(),
        question_div: div.clone(),
        kind: QuestionKind::Basic,
        question_element,
        inputs: AnswerInputs::Basic(inputs),
        skip: false,
    });
    Ok(())
}

/// match：每个下标期待恰好一对 `[data-id]` 按钮
async fn resolve_match<D: Dom>(
    dom: &D,
    component: &Component,
    div: &D::Node,
    out: &mut Resolution<D::Node>,
) -> Result<()> {
    let mut pairs = Vec::new();
    for i in 0..component.items.len() {
        let selector = format!("[data-id=\"{}\"]", i);
        let hits = query_deep_all(dom, div, &selector, Some(2)).await?;
        if let [first, second] = hits.as_slice() {
            pairs.push(MatchPair {
                first: first.clone(),
                second: second.clone(),
            });
        }
        if pairs.len() == component.items.len() {
            break;
        }
    }
    let question_element = find_by_text(dom, div, &component.body).await?;
    out.questions.push(Question {
        component_id: component.id.clone(),
        question_div: div.clone(),
        kind: QuestionKind::Match,
        question_element,
        inputs: AnswerInputs::Match(pairs),
        skip: false,
    });
    Ok(())
}

/// dropdownSelect：每个条目是一道合成子题，解析阶段直接绑定
async fn resolve_dropdown_select<D: Dom>(
    dom: &D,
    component: &Component,
    div: &D::Node,
    out: &mut Resolution<D::Node>,
) -> Result<()> {
    for (i, item) in component.items.iter().enumerate() {
        let Some(sub) = query_deep(dom, div, &format!("[index=\"{}\"]", i)).await? else {
            continue;
        };
        let prompt = match item.text.as_deref() {
            Some(text) => find_by_text(dom, &sub, text).await?,
            None => None,
        };
        let Some(correct) = item.correct_option_index() else {
            continue;
        };
        let option = query_deep(dom, &sub, &format!("#dropdown__item-index-{}", correct)).await?;
        let Some(option) = option else {
            continue;
        };

        if let Some(prompt) = &prompt {
            dom.watch(prompt).await?;
            for on in [EventKind::Click, EventKind::HoverWithModifier] {
                out.bindings.push(Binding {
                    target: prompt.clone(),
                    on,
                    action: Action::ClickNode {
                        node: option.clone(),
                    },
                });
            }
        }
        out.questions.push(Question {
            component_id: component.id.clone(),
            question_div: div.clone(),
            kind: QuestionKind::DropdownSelect,
            question_element: prompt,
            inputs: AnswerInputs::Dropdown(option),
            skip: true,
        });
    }
    Ok(())
}

/// yesNo：同一组节点被复用给多个子题，委托到 `.img_question` 的父节点，
/// 触发时再按当前 alt 匹配
async fn resolve_yes_no<D: Dom>(
    dom: &D,
    component: &Component,
    div: &D::Node,
    out: &mut Resolution<D::Node>,
) -> Result<()> {
    let Some(img) = query_deep(dom, div, ".img_question").await? else {
        out.questions.push(Question {
            component_id: component.id.clone(),
            question_div: div.clone(),
            kind: QuestionKind::YesNo,
            question_element: None,
            inputs: AnswerInputs::None,
            skip: true,
        });
        return Ok(());
    };
    let delegate = dom.parent(&img).await?.unwrap_or_else(|| div.clone());

    let items: Vec<ImageJudgement> = component
        .items
        .iter()
        .filter_map(|item| {
            let alt = item.graphic.as_ref().and_then(|g| g.alt.clone())?;
            Some(ImageJudgement {
                alt,
                answer_is_yes: item.should_be_selected.unwrap_or(false),
            })
        })
        .collect();

    dom.watch(&delegate).await?;
    for on in [EventKind::Click, EventKind::HoverWithModifier] {
        out.bindings.push(Binding {
            target: delegate.clone(),
            on,
            action: Action::JudgeImage {
                container: div.clone(),
                items: items.clone(),
            },
        });
    }
    out.questions.push(Question {
        component_id: component.id.clone(),
        question_div: div.clone(),
        kind: QuestionKind::YesNo,
        question_element: Some(delegate),
        inputs: AnswerInputs::None,
        skip: true,
    });
    Ok(())
}

/// openTextInput：提示选项和"当前条目"按钮都可触发，动作在触发时再定位
async fn resolve_open_text<D: Dom>(
    dom: &D,
    component: &Component,
    div: &D::Node,
    out: &mut Resolution<D::Node>,
) -> Result<()> {
    let targets: Vec<OpenTextTarget> = component
        .items
        .iter()
        .filter_map(|item| {
            let prompt = item.single_option().and_then(|o| o.text.clone())?;
            Some(OpenTextTarget {
                prompt,
                position: item.position_str(),
            })
        })
        .collect();

    for (i, item) in component.items.iter().enumerate() {
        let prompt_node = match item.single_option().and_then(|o| o.text.as_deref()) {
            Some(text) => find_by_text(dom, div, text).await?,
            None => None,
        };
        let trigger = query_deep(dom, div, &format!(".current-item-{}", i)).await?;
        for node in [prompt_node, trigger].into_iter().flatten() {
            dom.watch(&node).await?;
            out.bindings.push(Binding {
                target: node,
                on: EventKind::Click,
                action: Action::AnswerOpenText {
                    container: div.clone(),
                    targets: targets.clone(),
                },
            });
        }
    }
    out.questions.push(Question {
        component_id: component.id.clone(),
        question_div: div.clone(),
        kind: QuestionKind::OpenTextInput,
        question_element: None,
        inputs: AnswerInputs::None,
        skip: true,
    });
    Ok(())
}

/// fillBlanks：空位文本按条目 preText/postText 前后缀配对，选项按
/// 去空白文本找下拉节点；点空位或 Ctrl-悬停选项都会点中正确项
async fn resolve_fill_blanks<D: Dom>(
    dom: &D,
    component: &Component,
    div: &D::Node,
    out: &mut Resolution<D::Node>,
) -> Result<()> {
    let blanks =
        query_deep_all(dom, div, ".fillblanks__item", Some(component.items.len())).await?;
    for blank in blanks {
        let blank_text_raw = dom.text(&blank).await?;
        let blank_text = blank_text_raw.trim();
        let matched = component.items.iter().find(|item| {
            let pre = item
                .pre_text
                .as_deref()
                .map(|t| strip_html(t).unwrap_or_else(|_| t.to_string()))
                .unwrap_or_default();
            let post = item
                .post_text
                .as_deref()
                .map(|t| strip_html(t).unwrap_or_else(|_| t.to_string()))
                .unwrap_or_default();
            blank_text.starts_with(pre.trim()) && blank_text.ends_with(post.trim())
        });
        let Some(item) = matched else {
            debug!("空位文本 {:?} 没配上任何条目", blank_text);
            continue;
        };
        let Some(wanted) = item.correct_option_text() else {
            continue;
        };
        let Some(option) = find_option_by_text(dom, div, ".dropdown__item", wanted).await? else {
            continue;
        };

        dom.watch(&blank).await?;
        dom.watch(&option).await?;
        out.bindings.push(Binding {
            target: blank,
            on: EventKind::Click,
            action: Action::ClickNode {
                node: option.clone(),
            },
        });
        out.bindings.push(Binding {
            target: option.clone(),
            on: EventKind::HoverWithModifier,
            action: Action::ClickNode { node: option },
        });
    }
    out.questions.push(Question {
        component_id: component.id.clone(),
        question_div: div.clone(),
        kind: QuestionKind::FillBlanks,
        question_element: None,
        inputs: AnswerInputs::None,
        skip: true,
    });
    Ok(())
}

/// tableDropdown：行数必须等于条目数，行内 `[role="option"]` 按正确
/// 选项文本匹配；点行或 Ctrl-悬停选项都会点中它
async fn resolve_table_dropdown<D: Dom>(
    dom: &D,
    component: &Component,
    div: &D::Node,
    out: &mut Resolution<D::Node>,
) -> Result<()> {
    let rows = query_deep_all(dom, div, "tr", Some(component.items.len())).await?;
    for (row, item) in rows.iter().zip(component.items.iter()) {
        let Some(wanted) = item.correct_option_text() else {
            continue;
        };
        let Some(option) = find_option_by_text(dom, row, "[role=\"option\"]", wanted).await?
        else {
            continue;
        };
        dom.watch(row).await?;
        dom.watch(&option).await?;
        out.bindings.push(Binding {
            target: row.clone(),
            on: EventKind::Click,
            action: Action::ClickNode {
                node: option.clone(),
            },
        });
        out.bindings.push(Binding {
            target: option.clone(),
            on: EventKind::HoverWithModifier,
            action: Action::ClickNode { node: option },
        });
    }
    out.questions.push(Question {
        component_id: component.id.clone(),
        question_div: div.clone(),
        kind: QuestionKind::TableDropdown,
        question_element: None,
        inputs: AnswerInputs::None,
        skip: true,
    });
    Ok(())
}
