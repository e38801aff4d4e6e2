//! 作答编解码 - 业务能力层
//!
//! 负责 UI 编辑动作与每题唯一的规范化 `raw_value` 字符串之间的双向转换。
//!
//! 编码规则：
//! - 选项字母固定取自 `A,B,C,D`，依次对应 choice1..choice4，
//!   只有对应选项非空的字母才是合法输入
//! - `SINGLE_CHOICE`：一个大写字母或空串
//! - `MULTI_CHOICE`：去重（大小写不敏感、去空白）后按字母表顺序用 `,` 连接
//! - `TEXT` / `LONG_TEXT`：只去首尾空白，原样存储
//! - `ORDER`：现有字母的一个排列，用 `,` 连接；首次加载为恒等顺序
//!
//! 陈旧字母（存储值里有、当前选项里没有的字母）在展示解码时静默丢弃，
//! 但存储值保持不动，直到下一次显式编辑才被改写。

use tracing::warn;

use crate::models::{AnswerEdit, AnswerState, AnswerStore, Question, QuestionType};

/// 编码单选作答
pub fn encode_single(letter: Option<char>, present: &[char]) -> String {
    match letter {
        Some(l) => {
            let upper = l.to_ascii_uppercase();
            if present.contains(&upper) {
                upper.to_string()
            } else {
                String::new()
            }
        }
        None => String::new(),
    }
}

/// 解码单选作答
pub fn decode_single(raw: &str, present: &[char]) -> Option<char> {
    let trimmed = raw.trim();
    if trimmed.chars().count() != 1 {
        return None;
    }
    let letter = trimmed.chars().next()?.to_ascii_uppercase();
    present.contains(&letter).then_some(letter)
}

/// 编码多选作答
///
/// 输入是 UI 勾选的原始字母集合（允许大小写、允许首尾空白），
/// 去重后按字母表顺序输出，例如 `{"c","A"} → "A,C"`。
pub fn encode_multi<I, S>(letters: I, present: &[char]) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut selected = [false; 4];
    for raw in letters {
        let trimmed = raw.as_ref().trim();
        let mut chars = trimmed.chars();
        let (Some(letter), None) = (chars.next(), chars.next()) else {
            continue;
        };
        let upper = letter.to_ascii_uppercase();
        if let Some(pos) = crate::models::CHOICE_ALPHABET
            .iter()
            .position(|&a| a == upper)
        {
            if present.contains(&upper) {
                selected[pos] = true;
            }
        }
    }

    let encoded: Vec<String> = crate::models::CHOICE_ALPHABET
        .iter()
        .enumerate()
        .filter(|(i, _)| selected[*i])
        .map(|(_, l)| l.to_string())
        .collect();
    encoded.join(",")
}

/// 解码多选作答
///
/// 按 `,` 切分、去空白、转大写、丢弃空项；
/// 不在当前选项里的字母只在展示时丢弃，存储值不动。
pub fn decode_multi(raw: &str, present: &[char]) -> Vec<char> {
    let mut letters = Vec::new();
    for token in raw.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(letter) = trimmed.chars().next() else {
            continue;
        };
        let upper = letter.to_ascii_uppercase();
        if present.contains(&upper) && !letters.contains(&upper) {
            letters.push(upper);
        }
    }
    letters
}

/// 自由文本：只去首尾空白，不做任何大小写转换
pub fn normalize_text(input: &str) -> String {
    input.trim().to_string()
}

/// 排序题的恒等顺序（按选项定义顺序）
pub fn identity_order(present: &[char]) -> String {
    present
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// 解码排序作答用于展示
///
/// 陈旧字母丢弃；当前选项里有、存储顺序里没有的字母补到末尾。
pub fn decode_order(raw: &str, present: &[char]) -> Vec<char> {
    let mut order = Vec::new();
    for token in raw.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Some(letter) = trimmed.chars().next() else {
            continue;
        };
        let upper = letter.to_ascii_uppercase();
        if present.contains(&upper) && !order.contains(&upper) {
            order.push(upper);
        }
    }
    for &letter in present {
        if !order.contains(&letter) {
            order.push(letter);
        }
    }
    order
}

/// 编码排序作答
pub fn encode_order(order: &[char]) -> String {
    order
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// 断线重连时对已有排序作答做对齐
///
/// 缺失的现有字母补到末尾；陈旧字母保留不动
/// （展示时才丢弃，避免瞬时的渲染顺序错位造成数据丢失）。
pub fn reconcile_order(prior: &str, present: &[char]) -> String {
    let mut tokens: Vec<String> = prior
        .split(',')
        .map(|t| t.trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    for &letter in present {
        if !tokens.iter().any(|t| t.chars().next() == Some(letter)) {
            tokens.push(letter.to_string());
        }
    }
    tokens.join(",")
}

/// 纯函数的移位操作：把 `from` 位置的元素移动到 `to` 位置
///
/// 其余元素相对顺序不变；索引越界时返回原列表的拷贝。
pub fn reorder<T: Clone>(list: &[T], from: usize, to: usize) -> Vec<T> {
    let mut result: Vec<T> = list.to_vec();
    if from >= result.len() || to >= result.len() {
        return result;
    }
    let item = result.remove(from);
    result.insert(to, item);
    result
}

/// 计算某道题的初始 raw_value
///
/// 有已存作答时沿用（排序题做对齐），否则排序题取恒等顺序、其余为空。
pub fn initial_value(question: &Question) -> String {
    let present = question.present_letters();
    match &question.answer {
        Some(prior) => match question.qtype {
            QuestionType::Order => reconcile_order(prior, &present),
            QuestionType::SingleChoice => prior.trim().to_ascii_uppercase(),
            _ => prior.trim().to_string(),
        },
        None => match question.qtype {
            QuestionType::Order => identity_order(&present),
            _ => String::new(),
        },
    }
}

/// 按题目列表建立作答集合
pub fn seed_store(questions: &[Question]) -> AnswerStore {
    let mut store = AnswerStore::new();
    for question in questions {
        store.insert(
            question.question_number.clone(),
            AnswerState::with_value(initial_value(question)),
        );
    }
    store
}

/// 应用一次编辑动作，返回新的 raw_value
///
/// 非法输入（字母不存在、动作与题型不匹配）不改动现有值。
pub fn apply_edit(question: &Question, current: &str, edit: &AnswerEdit) -> String {
    let present = question.present_letters();
    match (edit, question.qtype) {
        (AnswerEdit::SelectChoice(letter), QuestionType::SingleChoice) => {
            let encoded = encode_single(Some(*letter), &present);
            if encoded.is_empty() {
                warn!("题目 {} 收到非法选项 {:?}，忽略", question.question_number, letter);
                current.to_string()
            } else {
                encoded
            }
        }
        (AnswerEdit::SetChoices(letters), QuestionType::MultiChoice) => {
            encode_multi(letters, &present)
        }
        (AnswerEdit::SetText(text), QuestionType::Text | QuestionType::LongText) => {
            normalize_text(text)
        }
        (AnswerEdit::Reorder { from, to }, QuestionType::Order) => {
            let order = decode_order(current, &present);
            encode_order(&reorder(&order, *from, *to))
        }
        (AnswerEdit::Clear, _) => String::new(),
        (AnswerEdit::MarkForReview(_), _) => current.to_string(),
        (edit, qtype) => {
            warn!(
                "题目 {} ({}) 收到不匹配的编辑动作 {:?}，忽略",
                question.question_number, qtype, edit
            );
            current.to_string()
        }
    }
}
