use serde::{Deserialize, Serialize};

/// 考试科目段
///
/// 一场考试由若干科目段按固定顺序组成，顺序即作答顺序，
/// 不允许跳科、不允许回头。加载后不可变。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    /// 科目ID
    pub subject_id: String,
    /// 科目描述
    #[serde(default)]
    pub description: String,
    /// 作答时长（分钟）
    pub duration_minutes: u64,
}

impl Section {
    /// 作答时长（秒）
    pub fn duration_seconds(&self) -> u64 {
        self.duration_minutes * 60
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} 分钟)",
            if self.description.is_empty() {
                &self.subject_id
            } else {
                &self.description
            },
            self.duration_minutes
        )
    }
}
