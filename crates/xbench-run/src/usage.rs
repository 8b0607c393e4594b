//! Child resource accounting.

/// Snapshot of cumulative resource usage of reaped children.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildUsage {
    pub cpu_seconds: Option<f64>,
    pub max_rss_kb: Option<u64>,
}

/// `getrusage(RUSAGE_CHILDREN)` snapshot.
#[cfg(unix)]
pub fn children_usage() -> ChildUsage {
    use nix::sys::resource::{getrusage, UsageWho};
    use nix::sys::time::TimeVal;

    fn seconds(time: TimeVal) -> f64 {
        time.tv_sec() as f64 + time.tv_usec() as f64 / 1e6
    }

    match getrusage(UsageWho::RUSAGE_CHILDREN) {
        Ok(usage) => ChildUsage {
            cpu_seconds: Some(seconds(usage.user_time()) + seconds(usage.system_time())),
            max_rss_kb: u64::try_from(max_rss_kb(usage.max_rss())).ok(),
        },
        Err(err) => {
            tracing::debug!(error = %err, "getrusage failed");
            ChildUsage::default()
        }
    }
}

// ru_maxrss is kilobytes on Linux and bytes on macOS.
#[cfg(all(unix, target_os = "macos"))]
fn max_rss_kb(raw: nix::libc::c_long) -> i64 {
    i64::from(raw) / 1024
}

#[cfg(all(unix, not(target_os = "macos")))]
fn max_rss_kb(raw: nix::libc::c_long) -> i64 {
    i64::from(raw)
}

#[cfg(not(unix))]
pub fn children_usage() -> ChildUsage {
    ChildUsage::default()
}

/// CPU seconds spent between two snapshots.
pub fn cpu_delta(before: ChildUsage, after: ChildUsage) -> Option<f64> {
    match (before.cpu_seconds, after.cpu_seconds) {
        (Some(before), Some(after)) => Some((after - before).max(0.0)),
        _ => None,
    }
}
