use crate::unknown::unknown;

pub const KB: u64 = 1024;
pub const MB: u64 = KB * 1024;
pub const GB: u64 = MB * 1024;
pub const TB: u64 = GB * 1024;
pub const PB: u64 = TB * 1024;

/// Picks the largest unit that keeps `size` at or above one.
pub fn amount_string(size: u64) -> (u64, &'static str) {
    match size {
        s if s < MB => (KB, "KB"),
        s if s < GB => (MB, "MB"),
        s if s < TB => (GB, "GB"),
        s if s < PB => (TB, "TB"),
        _ => (PB, "PB"),
    }
}

/// `17179869184` -> `16GB`, rounding up; zero renders as the sentinel.
pub fn size_string(bytes: u64) -> String {
    if bytes == 0 {
        return unknown();
    }
    let (unit, suffix) = amount_string(bytes);
    format!("{}{}", bytes.div_ceil(unit), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_unit_and_rounds_up() {
        assert_eq!(size_string(16 * GB), "16GB");
        assert_eq!(size_string(16 * GB - 1), "16GB");
        assert_eq!(size_string(512), "1KB");
        assert_eq!(size_string(3 * MB + 1), "4MB");
        assert_eq!(size_string(2 * PB), "2PB");
    }

    #[test]
    fn zero_is_unknown() {
        assert_eq!(size_string(0), crate::UNKNOWN);
    }
}
