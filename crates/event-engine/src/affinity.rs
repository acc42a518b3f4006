//! Thread-to-core pinning for jitter-sensitive roles

/// Pin the calling thread to a single core.
pub fn pin_to_core(core_id: usize) -> std::io::Result<()> {
    #[cfg(target_os = "linux")]
    {
        use std::mem;

        let mut cpu_set: libc::cpu_set_t = unsafe { mem::zeroed() };
        unsafe {
            libc::CPU_ZERO(&mut cpu_set);
            libc::CPU_SET(core_id, &mut cpu_set);

            let result = libc::sched_setaffinity(
                0, // Current thread
                mem::size_of::<libc::cpu_set_t>(),
                &cpu_set,
            );

            if result != 0 {
                return Err(std::io::Error::last_os_error());
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    {
        tracing::warn!("CPU pinning not supported on this platform (core {})", core_id);
    }

    Ok(())
}

/// Whether `core_id` exists on this machine.
#[inline]
pub fn core_in_range(core_id: usize) -> bool {
    core_id < num_cpus::get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_zero_always_in_range() {
        assert!(core_in_range(0));
        assert!(!core_in_range(num_cpus::get()));
    }

    #[test]
    fn test_pin_to_core_smoke() {
        // Containers may restrict the affinity mask; either outcome is fine
        // as long as the call returns.
        let _ = pin_to_core(0);
    }
}
