// src/engine/summary.rs

//! Elapsed-time reporting for the end-of-job summary.

use std::time::Duration;

/// `H:MM:SS (secs)`, e.g. `1:02:03 (3723)`.
pub fn format_hms(secs: u64) -> String {
    format!(
        "{}:{:02}:{:02} ({})",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        secs
    )
}

/// Total user + system CPU time consumed by reaped child processes.
#[cfg(unix)]
pub fn children_cpu_time() -> Option<Duration> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: getrusage fills the whole struct on success; we only read it
    // after checking the return code.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_CHILDREN, usage.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    let usage = unsafe { usage.assume_init() };
    Some(timeval_to_duration(usage.ru_utime) + timeval_to_duration(usage.ru_stime))
}

#[cfg(not(unix))]
pub fn children_cpu_time() -> Option<Duration> {
    None
}

#[cfg(unix)]
fn timeval_to_duration(tv: libc::timeval) -> Duration {
    Duration::from_secs(tv.tv_sec.max(0) as u64) + Duration::from_micros(tv.tv_usec.max(0) as u64)
}

/// Elapsed clock and process time lines.
pub fn elapsed_lines(clock: Duration, process: Option<Duration>) -> Vec<String> {
    let mut lines = vec![format!(
        "Elapsed clock time [H:MM:SS (secs)]: {}",
        format_hms(clock.as_secs())
    )];
    match process {
        Some(p) => lines.push(format!(
            "Elapsed process time [H:MM:SS (secs)]: {}",
            format_hms(p.as_secs())
        )),
        None => lines.push("Elapsed process time unavailable on this platform".to_string()),
    }
    lines
}
