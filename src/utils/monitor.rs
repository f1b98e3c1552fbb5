#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct PhaseTiming {
    pub phase: String,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct SystemStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
}

/// Times the extract / transform / load phases of a run and, when enabled,
/// samples the process' memory and CPU through sysinfo.
pub struct PhaseMonitor {
    started: Instant,
    phase_started: Instant,
    timings: Vec<PhaseTiming>,
    #[cfg(feature = "cli")]
    system: Option<Mutex<(System, Pid, u64)>>,
}

impl PhaseMonitor {
    pub fn new(system_stats: bool) -> Self {
        let now = Instant::now();
        Self {
            started: now,
            phase_started: now,
            timings: Vec::new(),
            #[cfg(feature = "cli")]
            system: if system_stats {
                sysinfo::get_current_pid().ok().map(|pid| {
                    let mut system = System::new();
                    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                    Mutex::new((system, pid, 0))
                })
            } else {
                None
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "cli")]
        {
            self.system.is_some()
        }
        #[cfg(not(feature = "cli"))]
        {
            false
        }
    }

    /// Closes the running phase under `phase` and starts the next one.
    pub fn finish_phase(&mut self, phase: &str) -> Duration {
        let elapsed = self.phase_started.elapsed();
        self.phase_started = Instant::now();
        self.timings.push(PhaseTiming {
            phase: phase.to_string(),
            elapsed,
        });

        match self.stats() {
            Some(stats) => tracing::info!(
                "📊 {} - {:?}, CPU: {:.1}%, Memory: {}MB, Peak: {}MB",
                phase,
                elapsed,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb
            ),
            None => tracing::debug!("{} took {:?}", phase, elapsed),
        }
        elapsed
    }

    pub fn timings(&self) -> &[PhaseTiming] {
        &self.timings
    }

    pub fn total(&self) -> Duration {
        self.started.elapsed()
    }

    #[cfg(feature = "cli")]
    pub fn stats(&self) -> Option<SystemStats> {
        let mut guard = self.system.as_ref()?.lock().ok()?;
        let (system, pid, peak) = &mut *guard;
        system.refresh_processes(ProcessesToUpdate::Some(&[*pid]), true);
        let process = system.process(*pid)?;
        let memory_mb = process.memory() / 1024 / 1024;
        *peak = (*peak).max(memory_mb);

        Some(SystemStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
        })
    }

    #[cfg(not(feature = "cli"))]
    pub fn stats(&self) -> Option<SystemStats> {
        None
    }

    pub fn log_final_stats(&self) {
        let peak = self.stats().map(|s| s.peak_memory_mb);
        match peak {
            Some(peak) => tracing::info!(
                "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
                self.total(),
                peak
            ),
            None => tracing::info!("Finished in {:?}", self.total()),
        }
    }
}

impl Default for PhaseMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
