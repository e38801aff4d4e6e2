//! 作答状态
//!
//! 每道题对应一条 `AnswerState`，统一存放在 `AnswerStore` 中。
//! 存储的 `raw_value` 是规范化编码（见 `services::answer_codec`），
//! 只能通过编解码入口修改，科目提交后整体丢弃。

use std::collections::BTreeMap;

/// 单题作答状态
#[derive(Debug, Clone, Default)]
pub struct AnswerState {
    /// 规范化编码后的作答值
    pub raw_value: String,
    /// 是否标记待复查
    pub marked_for_review: bool,
}

impl AnswerState {
    pub fn with_value(raw_value: impl Into<String>) -> Self {
        Self {
            raw_value: raw_value.into(),
            marked_for_review: false,
        }
    }

    /// 是否已作答（raw_value 非空）
    pub fn attempted(&self) -> bool {
        !self.raw_value.is_empty()
    }
}

/// UI 层的作答编辑动作
///
/// 编辑动作经由编解码器转换成规范化 raw_value，
/// 除此之外没有任何路径可以改写作答。
#[derive(Debug, Clone)]
pub enum AnswerEdit {
    /// 单选：选中某个字母
    SelectChoice(char),
    /// 多选：整组勾选状态（原始 UI 输入，允许大小写/空白）
    SetChoices(Vec<String>),
    /// 填空/简答：自由文本
    SetText(String),
    /// 排序：把 from 位置的元素移动到 to 位置
    Reorder { from: usize, to: usize },
    /// 清除作答
    Clear,
    /// 标记/取消待复查
    MarkForReview(bool),
}

/// 当前科目的作答集合，按题号索引
#[derive(Debug, Default)]
pub struct AnswerStore {
    entries: BTreeMap<String, AnswerState>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, question_number: impl Into<String>, state: AnswerState) {
        self.entries.insert(question_number.into(), state);
    }

    pub fn get(&self, question_number: &str) -> Option<&AnswerState> {
        self.entries.get(question_number)
    }

    /// 覆盖某题的 raw_value（只应由编解码入口调用）
    pub fn set_raw_value(&mut self, question_number: &str, raw_value: String) {
        if let Some(state) = self.entries.get_mut(question_number) {
            state.raw_value = raw_value;
        }
    }

    pub fn set_marked_for_review(&mut self, question_number: &str, marked: bool) {
        if let Some(state) = self.entries.get_mut(question_number) {
            state.marked_for_review = marked;
        }
    }

    /// 清除某题作答（raw_value 置空，复查标记保留）
    pub fn clear_response(&mut self, question_number: &str) {
        self.set_raw_value(question_number, String::new());
    }

    /// 已作答题目数量
    pub fn attempted_count(&self) -> usize {
        self.entries.values().filter(|s| s.attempted()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerState)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempted_counts_non_empty_values() {
        let mut store = AnswerStore::new();
        store.insert("1", AnswerState::with_value("A"));
        store.insert("2", AnswerState::default());
        store.insert("3", AnswerState::with_value("A,C"));
        assert_eq!(store.attempted_count(), 2);
    }

    #[test]
    fn test_clear_response_keeps_review_mark() {
        let mut store = AnswerStore::new();
        store.insert("1", AnswerState::with_value("B"));
        store.set_marked_for_review("1", true);
        store.clear_response("1");

        let state = store.get("1").unwrap();
        assert!(!state.attempted());
        assert!(state.marked_for_review);
    }
}
