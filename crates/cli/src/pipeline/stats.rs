//! Run statistics printed when the loop exits.

use std::time::Duration;

use contracts::ReadStatus;
use observability::{RunningStats, StatsSummary};
use transport::MetricsSnapshot;

/// Statistics from one control-loop run
#[derive(Debug, Clone, Default)]
pub struct LoopStats {
    /// Loop iterations (one `read_latest` each)
    pub iterations: u64,

    /// Fresh frames processed
    pub frames: u64,

    /// Per-status read tallies (indexed by [`ReadStatus::index`])
    pub reads: [u64; 5],

    /// Frames where perception failed
    pub perception_errors: u64,

    /// Frames that produced a target
    pub targets: u64,

    /// Perception latency (only sampled with diagnostics enabled)
    pub inference_ms: RunningStats,

    /// Last processed frame id
    pub last_frame_id: Option<u32>,

    /// Transport counters at exit
    pub transport: MetricsSnapshot,

    /// Wall-clock duration of the run
    pub duration: Duration,
}

impl LoopStats {
    pub fn record_read(&mut self, status: ReadStatus) {
        self.iterations += 1;
        self.reads[status.index()] += 1;
        if status == ReadStatus::Ok {
            self.frames += 1;
        }
    }

    pub fn reads_with(&self, status: ReadStatus) -> u64 {
        self.reads[status.index()]
    }

    /// Processed frames per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.frames as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of processed frames that had a target, in percent
    pub fn target_rate(&self) -> f64 {
        if self.frames > 0 {
            (self.targets as f64 / self.frames as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Control Loop Statistics ===\n");

        println!("Overview");
        println!("   |- Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   |- Iterations: {}", self.iterations);
        println!("   |- Frames: {}", self.frames);
        println!("   |- FPS: {:.2}", self.fps());
        match self.last_frame_id {
            Some(id) => println!("   |- Last frame id: {id}"),
            None => println!("   |- Last frame id: -"),
        }
        println!(
            "   `- Targets: {} ({:.1}%)",
            self.targets,
            self.target_rate()
        );

        println!("\nFrame Reads");
        for status in ReadStatus::ALL {
            println!("   |- {}: {}", status, self.reads_with(status));
        }
        println!("   `- perception errors: {}", self.perception_errors);

        println!("\nPerception (ms)");
        println!("   `- {}", StatsSummary::from(&self.inference_ms));

        println!("\nTransport");
        println!("   |- Sent: {}", self.transport.sent);
        println!("   |- Failed: {}", self.transport.failed);
        println!("   |- Releases: {}", self.transport.released);
        println!("   `- Suppressed logs: {}", self.transport.suppressed);

        println!();
    }
}
