use std::time::Duration;

/// Check if the given string slice is a valid C-style string.
///
/// Formally, this function checks whether the byte sequence of the string slice contains any
/// b'\x00'. If so, this function returns `false`.
///
/// ```ignore
/// assert!(is_valid_c_string("abc"));
/// assert!(!is_valid_c_string("abc\x00"));
/// ```
///
pub fn is_valid_c_string(s: &str) -> bool {
    !s.as_bytes().contains(&b'\x00')
}

/// Get number of clock ticks in one second, as used by the accounting fields of `/proc/[pid]/stat`.
fn clock_ticks_per_sec() -> i64 {
    // Linux reports `USER_HZ`, which is 100 on every mainstream architecture.
    const USER_HZ: i64 = 100;

    let ret = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ret <= 0 {
        USER_HZ
    } else {
        ret
    }
}

/// Create a `Duration` instance from clock ticks.
pub fn duration_from_clocks(clocks: libc::clock_t) -> Duration {
    Duration::from_secs_f64(clocks as f64 / clock_ticks_per_sec() as f64)
}

/// Get the size of a memory page in bytes.
pub fn page_size() -> usize {
    const FALLBACK_PAGE_SIZE: usize = 4096;

    let ret = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if ret <= 0 {
        FALLBACK_PAGE_SIZE
    } else {
        ret as usize
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_c_string() {
        assert!(is_valid_c_string("abc"));
        assert!(!is_valid_c_string("abc\x00def"));
    }

    #[test]
    fn test_duration_from_clocks() {
        let ticks = clock_ticks_per_sec();
        assert_eq!(Duration::from_secs(3), duration_from_clocks((ticks * 3) as libc::clock_t));
    }

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(page_size().is_power_of_two());
    }
}
