//! Session run statistics.

use std::time::Duration;

use edr::{RecorderStats, SaveReport};

/// Statistics from a headless session run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Session ticks executed
    pub ticks: u64,

    /// Sensors registered with the recorder
    pub sensors: usize,

    /// Sensors that failed to attach
    pub attach_failures: usize,

    /// Near misses detected by the watchdog
    pub near_misses: u64,

    /// Events written to disk
    pub saves: Vec<SaveReport>,

    /// Reason of an event still waiting to be saved at exit
    pub pending_event: Option<String>,

    /// Recorder counters
    pub recorder: RecorderStats,
}

impl RunStats {
    /// Session ticks per second
    pub fn tick_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Session Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Ticks: {} ({:.1} Hz)", self.ticks, self.tick_rate());
        println!("   ├─ Sensors: {}", self.sensors);
        println!("   ├─ Attach failures: {}", self.attach_failures);
        println!("   └─ Near misses: {}", self.near_misses);

        if !self.saves.is_empty() {
            println!("\nSaved events ({})", self.saves.len());
            for (i, save) in self.saves.iter().enumerate() {
                let prefix = if i == self.saves.len() - 1 { "└─" } else { "├─" };
                println!(
                    "   {} {} [{}] {} samples",
                    prefix,
                    save.path.display(),
                    save.reason,
                    save.samples_written
                );
            }
        }

        if let Some(reason) = &self.pending_event {
            println!("\nEvent not saved: {reason}");
        }

        println!("\n{}", self.recorder);
    }
}
