//! 题型判定
//!
//! 纯函数：只看 `items[0]` 的字段形状，按固定优先级逐个尝试解码，
//! 第一个命中的题型胜出；全部不中时显式回落到 basic。不访问 DOM。

use crate::models::{Component, Item, QuestionKind};

/// 判定组件题型
pub fn classify(component: &Component) -> QuestionKind {
    match component.items.first() {
        Some(item) => classify_item(item),
        None => QuestionKind::Basic,
    }
}

/// 按优先级对单个条目的形状解码
pub fn classify_item(item: &Item) -> QuestionKind {
    if item.should_be_selected.is_some() {
        return QuestionKind::Basic;
    }
    if item.question.is_some() && item.answer.is_some() {
        return QuestionKind::Match;
    }
    if item.text.is_some() && item.options_list().is_some() {
        return QuestionKind::DropdownSelect;
    }
    if let Some(graphic) = &item.graphic {
        if graphic.alt.is_some() && graphic.src.is_some() {
            return QuestionKind::YesNo;
        }
    }
    if item.id.is_some()
        && item
            .single_option()
            .and_then(|o| o.text.as_deref())
            .is_some()
    {
        return QuestionKind::OpenTextInput;
    }
    if item.pre_text.is_some() && item.post_text.is_some() && item.options_list().is_some() {
        return QuestionKind::FillBlanks;
    }
    if let Some(first) = item.options_list().and_then(|l| l.first()) {
        if first.text.is_some() && first.is_correct.is_some() {
            return QuestionKind::TableDropdown;
        }
    }
    // 形状不明的条目按启发式回落
    QuestionKind::Basic
}
