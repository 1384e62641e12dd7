//! 控制循环指标收集模块
//!
//! 通过 `metrics` facade 记录帧读取、推理耗时与修正量发送；
//! 未安装 recorder 时这些调用是空操作。

use contracts::ReadStatus;
use metrics::{counter, gauge, histogram};

/// 记录一次帧读取结果
pub fn record_frame_read(status: ReadStatus) {
    counter!("trackloop_frame_reads_total", "status" => status.as_str()).increment(1);
}

/// 记录最新交付的帧 ID (用于检测跳帧)
pub fn record_last_frame_id(frame_id: u32) {
    gauge!("trackloop_last_frame_id").set(frame_id as f64);
}

/// 记录感知推理耗时
pub fn record_inference_ms(ms: f64) {
    histogram!("trackloop_inference_ms").record(ms);
}

/// 记录修正量发送
pub fn record_correction_sent(sink_name: &str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "trackloop_corrections_sent_total",
        "sink" => sink_name.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// 记录目标丢失时发出的释放包
pub fn record_release_packet() {
    counter!("trackloop_release_packets_total").increment(1);
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
