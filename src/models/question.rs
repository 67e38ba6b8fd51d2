//! 运行期题目绑定模型
//!
//! `Question` 把一个 Component 和当前页面上的活动节点对应起来；每次
//! 全量重扫都重建，绑定完成后不再修改，下一次扫描开始时整体丢弃。

/// 七种题型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    /// 复选 / 单选
    Basic,
    /// 连线配对
    Match,
    /// 下拉选择
    DropdownSelect,
    /// 图片判断（是 / 否）
    YesNo,
    /// 开放文本定位
    OpenTextInput,
    /// 填空下拉
    FillBlanks,
    /// 表格行内下拉
    TableDropdown,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Basic => "basic",
            QuestionKind::Match => "match",
            QuestionKind::DropdownSelect => "dropdownSelect",
            QuestionKind::YesNo => "yesNo",
            QuestionKind::OpenTextInput => "openTextInput",
            QuestionKind::FillBlanks => "fillBlanks",
            QuestionKind::TableDropdown => "tableDropdown",
        }
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// basic 题型的一组控件：输入框 + 标签 + 期望选中态
#[derive(Debug, Clone)]
pub struct BasicInput<N> {
    pub input: N,
    pub label: N,
    pub should_be_selected: bool,
}

/// match 题型的一对按钮
#[derive(Debug, Clone)]
pub struct MatchPair<N> {
    pub first: N,
    pub second: N,
}

/// 解析出的题型专属控件引用
#[derive(Debug, Clone, Default)]
pub enum AnswerInputs<N> {
    /// 动态题型在解析阶段就地绑定，不携带静态控件
    #[default]
    None,
    Basic(Vec<BasicInput<N>>),
    Match(Vec<MatchPair<N>>),
    /// dropdownSelect 合成题：唯一的正确选项节点
    Dropdown(N),
}

/// Component 与活动 DOM 的绑定
#[derive(Debug, Clone)]
pub struct Question<N> {
    /// 所属组件 id（非拥有引用）
    pub component_id: String,
    /// 题目根节点
    pub question_div: N,
    pub kind: QuestionKind,
    /// 题干节点（动态题型可能缺席）
    pub question_element: Option<N>,
    pub inputs: AnswerInputs<N>,
    /// true 表示交互已在解析阶段就地绑定，通用绑定器跳过
    pub skip: bool,
}
