// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

/// Priority for the render thread when PADBANK_THREAD_PRIORITY is unset.
const DEFAULT_RENDER_THREAD_PRIORITY: u8 = 70;

/// Reads PADBANK_THREAD_PRIORITY (0-99). Out of range or unparsable values fall back to the
/// default.
pub fn render_thread_priority() -> ThreadPriority {
    let requested = parse_priority(std::env::var("PADBANK_THREAD_PRIORITY").ok().as_deref());
    match ThreadPriorityValue::try_from(requested) {
        Ok(value) => ThreadPriority::Crossplatform(value),
        Err(_) => ThreadPriority::Max,
    }
}

fn parse_priority(value: Option<&str>) -> u8 {
    value
        .and_then(|v| v.trim().parse::<u8>().ok())
        .filter(|n| *n < 100)
        .unwrap_or(DEFAULT_RENDER_THREAD_PRIORITY)
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| {
            v == "1"
                || v.eq_ignore_ascii_case("true")
                || v.eq_ignore_ascii_case("yes")
                || v.eq_ignore_ascii_case("on")
        })
        .unwrap_or(false)
}

/// Whether the render thread should try SCHED_FIFO. Opt out with PADBANK_DISABLE_RT_AUDIO=1.
pub fn rt_render_enabled() -> bool {
    !env_flag("PADBANK_DISABLE_RT_AUDIO")
}

/// Raises the priority of the calling thread. Failures are logged and otherwise ignored, since
/// playback still works at normal priority.
pub fn promote_render_thread(tp: ThreadPriority, rt: bool) {
    if let Err(e) = set_current_thread_priority(tp) {
        warn!(error = ?e, "Failed to raise render thread priority");
    }

    #[cfg(unix)]
    if rt {
        use thread_priority::unix::{
            set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
            ThreadSchedulePolicy,
        };
        match set_thread_priority_and_policy(
            thread_native_id(),
            tp,
            ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
        ) {
            Ok(()) => info!("Enabled RT SCHED_FIFO for render thread"),
            Err(e) => warn!(error = %e, "Failed to set RT SCHED_FIFO for render thread"),
        }
    }
    #[cfg(not(unix))]
    let _ = rt;
}
