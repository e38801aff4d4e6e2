use serde::{Deserialize, Serialize};

/// 选项字母表，依次对应 choice1..choice4
pub const CHOICE_ALPHABET: [char; 4] = ['A', 'B', 'C', 'D'];

/// 题型（封闭枚举）
///
/// 接口传输名为大写下划线形式（`SINGLE_CHOICE` 等），
/// 未知题型在反序列化时直接报错，不做运行时猜测。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    SingleChoice,
    MultiChoice,
    Text,
    LongText,
    Order,
}

impl QuestionType {
    /// 该题型是否携带选项
    pub fn has_choices(self) -> bool {
        matches!(
            self,
            QuestionType::SingleChoice | QuestionType::MultiChoice | QuestionType::Order
        )
    }

    /// 接口传输名
    pub fn wire_name(self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "SINGLE_CHOICE",
            QuestionType::MultiChoice => "MULTI_CHOICE",
            QuestionType::Text => "TEXT",
            QuestionType::LongText => "LONG_TEXT",
            QuestionType::Order => "ORDER",
        }
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// 单道题目
///
/// 资源元数据（resourceType / paragraph / helpFileRef）只在提交时原样回传，
/// 渲染层如何使用与本引擎无关。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// 题号（接口可能给数字也可能给字符串，统一成字符串）
    #[serde(deserialize_with = "deserialize_question_number")]
    pub question_number: String,

    /// 题型
    #[serde(rename = "type")]
    pub qtype: QuestionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice3: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choice4: Option<String>,

    /// 倒扣分
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_marks: Option<f64>,

    /// 知识点ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_file_ref: Option<String>,

    /// 断线重连时服务端返回的已有作答
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl Question {
    /// 当前题目实际存在的选项字母（按字母表顺序）
    ///
    /// 只有对应 choice 非空的字母才是合法输入。
    pub fn present_letters(&self) -> Vec<char> {
        let choices = [&self.choice1, &self.choice2, &self.choice3, &self.choice4];
        CHOICE_ALPHABET
            .iter()
            .zip(choices.iter())
            .filter_map(|(letter, choice)| choice.as_ref().map(|_| *letter))
            .collect()
    }
}

// 题号可能是数字也可能是字符串，统一反序列化成字符串
fn deserialize_question_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct NumberVisitor;

    impl<'de> Visitor<'de> for NumberVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or integer question number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(NumberVisitor)
}
