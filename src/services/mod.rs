//! 业务能力层
//!
//! 每个模块只描述一种能力，只处理单个科目/单道题，不编排流程：
//! - `answer_codec` - 作答编解码能力
//! - `section_timer` - 科目倒计时能力
//! - `distraction` - 切屏监测能力
//! - `capture` - 音视频采集能力

pub mod answer_codec;
pub mod capture;
pub mod distraction;
pub mod section_timer;

pub use capture::{CaptureAdapter, CapturePackage, MediaCapture, NoopCapture};
pub use distraction::{DistractionLog, DistractionTracker};
pub use section_timer::{format_mm_ss, SectionTimer, TimerState};
