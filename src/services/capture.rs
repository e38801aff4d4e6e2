//! 音视频采集 - 业务能力层
//!
//! 采集设备抽象成 [`MediaCapture`] 能力接口，真实的浏览器/系统绑定
//! 是外部适配器；无头环境用 [`NoopCapture`]。
//!
//! 生命周期：科目题目加载完成后 `start_for_section`，
//! 到时或手动交卷时在提交网络请求之前 `stop_and_package`，
//! 打包（gzip 压缩）结果交给上层异步上传。任何采集失败都不致命：
//! 记录日志后考试照常进行。

use std::io::Write;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{info, warn};

use crate::error::AppResult;

/// 采集设备能力接口
#[async_trait]
pub trait MediaCapture: Send + Sync {
    /// 获取设备并开始缓冲
    async fn start(&mut self) -> AppResult<()>;

    /// 结束缓冲，返回原始录制数据（可能为空）
    async fn stop(&mut self) -> AppResult<Vec<u8>>;
}

/// 空实现：无设备环境下考试照常进行
#[derive(Debug, Default)]
pub struct NoopCapture;

#[async_trait]
impl MediaCapture for NoopCapture {
    async fn start(&mut self) -> AppResult<()> {
        Ok(())
    }

    async fn stop(&mut self) -> AppResult<Vec<u8>> {
        Ok(Vec::new())
    }
}

/// 打包完成、等待上传的录制数据
#[derive(Debug, Clone)]
pub struct CapturePackage {
    /// gzip 压缩后的录制数据
    pub data: Vec<u8>,
    /// 上传文件名
    pub file_name: String,
}

/// 采集适配器
///
/// 持有设备能力并维护"是否在录制"这一个状态；
/// 与考试逻辑完全解耦，调用方决定何时启停。
pub struct CaptureAdapter {
    device: Box<dyn MediaCapture>,
    enabled: bool,
    recording: bool,
}

impl CaptureAdapter {
    pub fn new(enabled: bool, device: Box<dyn MediaCapture>) -> Self {
        Self {
            device,
            enabled,
            recording: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// 为当前科目开始录制
    ///
    /// 设备不可用不致命：记一条日志，考试照常进行。
    pub async fn start_for_section(&mut self, subject_id: &str) {
        if !self.enabled {
            return;
        }
        if self.recording {
            warn!("[科目 {}] 上一段录制尚未停止，跳过启动", subject_id);
            return;
        }
        match self.device.start().await {
            Ok(()) => {
                self.recording = true;
                info!("[科目 {}] 🎥 开始录制", subject_id);
            }
            Err(e) => {
                warn!("[科目 {}] ⚠️ 采集设备不可用，跳过录制: {}", subject_id, e);
            }
        }
    }

    /// 停止录制并打包
    ///
    /// 返回 `None` 表示本科目没有可上传的数据（未启用、未在录制、
    /// 缓冲为空或打包失败，失败只记日志）。
    pub async fn stop_and_package(&mut self, subject_id: &str) -> Option<CapturePackage> {
        if !self.recording {
            return None;
        }
        self.recording = false;

        let buffer = match self.device.stop().await {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("[科目 {}] ⚠️ 停止录制失败: {}", subject_id, e);
                return None;
            }
        };
        if buffer.is_empty() {
            return None;
        }

        match gzip(&buffer) {
            Ok(data) => {
                info!(
                    "[科目 {}] 🎥 录制打包完成: {} → {} 字节",
                    subject_id,
                    buffer.len(),
                    data.len()
                );
                Some(CapturePackage {
                    data,
                    file_name: format!("capture_{}.webm.gz", subject_id),
                })
            }
            Err(e) => {
                warn!("[科目 {}] ⚠️ 录制数据打包失败: {}", subject_id, e);
                None
            }
        }
    }
}

fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    /// 固定返回一段数据的假设备
    struct FixedCapture {
        payload: Vec<u8>,
    }

    #[async_trait]
    impl MediaCapture for FixedCapture {
        async fn start(&mut self) -> AppResult<()> {
            Ok(())
        }

        async fn stop(&mut self) -> AppResult<Vec<u8>> {
            Ok(self.payload.clone())
        }
    }

    /// 启动即失败的假设备
    struct BrokenCapture;

    #[async_trait]
    impl MediaCapture for BrokenCapture {
        async fn start(&mut self) -> AppResult<()> {
            Err(crate::error::AppError::capture_unavailable("no camera"))
        }

        async fn stop(&mut self) -> AppResult<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_package_round_trips_through_gzip() {
        let payload = b"webm-bytes-webm-bytes-webm-bytes".to_vec();
        let mut adapter = CaptureAdapter::new(
            true,
            Box::new(FixedCapture {
                payload: payload.clone(),
            }),
        );

        adapter.start_for_section("MATH").await;
        assert!(adapter.is_recording());

        let package = adapter.stop_and_package("MATH").await.unwrap();
        assert_eq!(package.file_name, "capture_MATH.webm.gz");

        let mut decoder = flate2::read::GzDecoder::new(package.data.as_slice());
        let mut decoded = Vec::new();
        decoder.read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[tokio::test]
    async fn test_device_failure_is_non_fatal() {
        let mut adapter = CaptureAdapter::new(true, Box::new(BrokenCapture));
        adapter.start_for_section("MATH").await;
        assert!(!adapter.is_recording());
        assert!(adapter.stop_and_package("MATH").await.is_none());
    }

    #[tokio::test]
    async fn test_disabled_adapter_never_records() {
        let mut adapter = CaptureAdapter::new(
            false,
            Box::new(FixedCapture {
                payload: b"data".to_vec(),
            }),
        );
        adapter.start_for_section("MATH").await;
        assert!(!adapter.is_recording());
    }

    #[tokio::test]
    async fn test_noop_capture_yields_no_package() {
        let mut adapter = CaptureAdapter::new(true, Box::new(NoopCapture));
        adapter.start_for_section("MATH").await;
        assert!(adapter.stop_and_package("MATH").await.is_none());
    }
}
