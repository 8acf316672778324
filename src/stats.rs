//! CPU time consumed by the commands the pool ran.

use std::time::Duration;

/// User/system CPU seconds for a finished run; `None` where unsupported.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CpuTimes {
    pub user_s: f64,
    pub sys_s: f64,
}

impl CpuTimes {
    fn since(self, start: CpuTimes) -> CpuTimes {
        CpuTimes {
            user_s: (self.user_s - start.user_s).max(0.0),
            sys_s: (self.sys_s - start.sys_s).max(0.0),
        }
    }
}

/// Best-effort CPU snapshot for all reaped child processes on Unix platforms.
#[cfg(unix)]
pub fn child_cpu_times() -> Option<CpuTimes> {
    use libc::{RUSAGE_CHILDREN, getrusage, rusage};
    // All-zero is a valid rusage; getrusage overwrites it.
    let mut usage: rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { getrusage(RUSAGE_CHILDREN, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some(CpuTimes {
        user_s: user,
        sys_s: sys,
    })
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
pub fn child_cpu_times() -> Option<CpuTimes> {
    None
}

/// Difference between two snapshots taken around a run.
pub fn cpu_delta(start: Option<CpuTimes>, end: Option<CpuTimes>) -> Option<CpuTimes> {
    match (start, end) {
        (Some(start), Some(end)) => Some(end.since(start)),
        _ => None,
    }
}

/// `elapsed_ms=.. cpu_user_s=.. cpu_sys_s=.. per_worker=[..]`
pub fn format_stats(elapsed: Duration, cpu: Option<CpuTimes>, per_worker: &[usize]) -> String {
    let (cpu_user, cpu_sys) = match cpu {
        Some(cpu) => (format!("{:.4}", cpu.user_s), format!("{:.4}", cpu.sys_s)),
        None => ("NA".to_string(), "NA".to_string()),
    };
    format!(
        "elapsed_ms={:.2} cpu_user_s={cpu_user} cpu_sys_s={cpu_sys} per_worker={per_worker:?}",
        elapsed.as_secs_f64() * 1000.0
    )
}
