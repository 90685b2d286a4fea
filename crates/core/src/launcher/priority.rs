//! Idle scheduling demotion for spawned jobs.
//!
//! ## Overview
//!
//! Jobs run at the lowest priority the host offers so interactive work keeps
//! the machine responsive while a batch is in progress.
//! - On **Linux**: I/O class is set to idle via `ioprio_set`, and the CPU
//!   policy to `SCHED_IDLE`. If the policy change is refused, the nice value
//!   is raised to 19 instead.
//! - On **other Unix platforms**: the nice value is raised to 19.
//! - Elsewhere demotion is unsupported and reported as such.
//!
//! Every step is attempted even if an earlier one fails; the first failure is
//! returned so the caller can log it.

use std::io;

/// Lowest conventional nice priority.
#[cfg(unix)]
const NICE_LOWEST: libc::c_int = 19;

/// Demotes process `pid` to idle CPU and I/O priority.
pub fn demote_to_idle(pid: u32) -> io::Result<()> {
    platform::demote(pid)
}

#[cfg(target_os = "linux")]
mod platform {
    use std::io;

    const IOPRIO_WHO_PROCESS: libc::c_int = 1;
    const IOPRIO_CLASS_IDLE: libc::c_int = 3;
    const IOPRIO_CLASS_SHIFT: libc::c_int = 13;

    pub fn demote(pid: u32) -> io::Result<()> {
        let pid = pid as libc::pid_t;
        let io_result = set_io_idle(pid);
        let cpu_result = set_cpu_idle(pid);
        io_result.and(cpu_result)
    }

    fn set_io_idle(pid: libc::pid_t) -> io::Result<()> {
        let rc = unsafe {
            libc::syscall(
                libc::SYS_ioprio_set,
                IOPRIO_WHO_PROCESS,
                pid,
                IOPRIO_CLASS_IDLE << IOPRIO_CLASS_SHIFT,
            )
        };
        if rc == -1 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn set_cpu_idle(pid: libc::pid_t) -> io::Result<()> {
        let mut param: libc::sched_param = unsafe { std::mem::zeroed() };
        param.sched_priority = 0;

        let rc = unsafe { libc::sched_setscheduler(pid, libc::SCHED_IDLE, &param) };
        if rc == 0 {
            Ok(())
        } else {
            super::set_nice(pid as u32)
        }
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
mod platform {
    use std::io;

    pub fn demote(pid: u32) -> io::Result<()> {
        super::set_nice(pid)
    }
}

#[cfg(not(unix))]
mod platform {
    use std::io;

    pub fn demote(_pid: u32) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "priority demotion is not supported on this platform",
        ))
    }
}

#[cfg(unix)]
fn set_nice(pid: u32) -> io::Result<()> {
    let rc = unsafe { libc::setpriority(libc::PRIO_PROCESS, pid as libc::id_t, NICE_LOWEST) };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}
