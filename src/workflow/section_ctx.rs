//! 科目上下文
//!
//! 封装"我正在作答哪场考试的第几个科目"这一信息

use std::fmt::Display;

/// 科目上下文
///
/// 包含提交单个科目所需的所有标识信息
#[derive(Debug, Clone)]
pub struct SectionCtx {
    /// 考试ID
    pub test_id: String,

    /// 科目ID
    pub subject_id: String,

    /// 本次考试实例ID
    pub user_test_id: String,

    /// 用户ID
    pub user_id: String,

    /// 科目在考试中的序号（从1开始，仅用于日志显示）
    pub section_index: usize,
}

impl SectionCtx {
    /// 创建新的科目上下文
    pub fn new(
        test_id: String,
        subject_id: String,
        user_test_id: String,
        user_id: String,
        section_index: usize,
    ) -> Self {
        Self {
            test_id,
            subject_id,
            user_test_id,
            user_id,
            section_index,
        }
    }
}

impl Display for SectionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[考试 ID#{} 科目#{} 序号#{}]",
            self.test_id, self.subject_id, self.section_index
        )
    }
}
