//! Size-string parsing and device/file sizing utilities.

use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::error::{PipelineError, Result};

/// Cache for sector-size lookups, keyed by path — the ioctl is cheap but
/// there is no reason to repeat it for the same device.
static SECTOR_SIZE_CACHE: Lazy<Mutex<HashMap<String, u32>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

const DEFAULT_SECTOR_SIZE: u32 = 512;

/// Parse a size string with SI/IEC prefixes, or `N sect` for a device's
/// sector size. Plain integers are bytes. Underscores are ignored.
/// Returns `Ok(None)` for an absent (`None`) input — callers treat that as
/// "infinite"/"unspecified", not zero.
pub fn parse_size(length: Option<&str>, output_path: Option<&Path>) -> Result<Option<u64>> {
    let Some(length) = length else {
        return Ok(None);
    };
    let s: String = length
        .trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|c| *c != '_' && !c.is_whitespace())
        .collect();

    if let Some(count) = parse_sect(&s) {
        let sector_size = output_path
            .map(sector_size_cached)
            .unwrap_or(DEFAULT_SECTOR_SIZE);
        return Ok(Some(count * u64::from(sector_size)));
    }

    if let Some(bytes) = parse_iec(&s) {
        return Ok(Some(bytes));
    }
    if let Some(bytes) = parse_si(&s) {
        return Ok(Some(bytes));
    }
    if let Ok(n) = s.parse::<u64>() {
        return Ok(Some(n));
    }

    Err(PipelineError::invalid_argument(format!(
        "invalid size format: {length}"
    )))
}

fn parse_sect(s: &str) -> Option<u64> {
    let s = s.strip_suffix('s').unwrap_or(s);
    let s = s.strip_suffix("sect").or_else(|| s.strip_suffix("sects"))?;
    s.parse::<u64>().ok()
}

const IEC_PREFIXES: [(&str, u64); 5] = [
    ("ki", 1024),
    ("mi", 1024 * 1024),
    ("gi", 1024 * 1024 * 1024),
    ("ti", 1024 * 1024 * 1024 * 1024),
    ("pi", 1024 * 1024 * 1024 * 1024 * 1024),
];

const SI_PREFIXES: [(&str, u64); 5] = [
    ("k", 1_000),
    ("m", 1_000_000),
    ("g", 1_000_000_000),
    ("t", 1_000_000_000_000),
    ("p", 1_000_000_000_000_000),
];

fn parse_with_prefixes(s: &str, prefixes: &[(&str, u64)]) -> Option<u64> {
    let s = s.strip_suffix('b').unwrap_or(s);
    for (prefix, multiplier) in prefixes {
        if let Some(num) = s.strip_suffix(prefix) {
            let value: f64 = num.parse().ok()?;
            return Some((value * (*multiplier as f64)) as u64);
        }
    }
    None
}

fn parse_iec(s: &str) -> Option<u64> {
    parse_with_prefixes(s, &IEC_PREFIXES)
}

fn parse_si(s: &str) -> Option<u64> {
    parse_with_prefixes(s, &SI_PREFIXES)
}

fn sector_size_cached(path: &Path) -> u32 {
    let key = path.display().to_string();
    let mut cache = SECTOR_SIZE_CACHE.lock().unwrap();
    if let Some(&size) = cache.get(&key) {
        return size;
    }
    let size = get_sector_size(path);
    cache.insert(key, size);
    size
}

/// Get the sector size for a block device, or 512 as fallback for
/// anything else (regular files, paths that don't exist yet, platforms
/// without the ioctl).
#[cfg(target_os = "linux")]
pub fn get_sector_size(path: &Path) -> u32 {
    use std::fs::File;

    const BLKSSZGET: libc::c_ulong = 0x1268;

    let Ok(metadata) = std::fs::metadata(path) else {
        return DEFAULT_SECTOR_SIZE;
    };
    if !is_block_device(&metadata) {
        return DEFAULT_SECTOR_SIZE;
    }
    let Ok(file) = File::open(path) else {
        return DEFAULT_SECTOR_SIZE;
    };
    let mut size: libc::c_int = 0;
    // SAFETY: `file` is a valid open fd for the duration of the call, and
    // `size` is a valid pointer to an `int` of the size BLKSSZGET expects.
    let rc = unsafe { libc::ioctl(file.as_raw_fd(), BLKSSZGET, &mut size as *mut libc::c_int) };
    if rc == 0 && size > 0 {
        size as u32
    } else {
        DEFAULT_SECTOR_SIZE
    }
}

#[cfg(not(target_os = "linux"))]
pub fn get_sector_size(_path: &Path) -> u32 {
    DEFAULT_SECTOR_SIZE
}

#[cfg(unix)]
fn is_block_device(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::FileTypeExt;
    metadata.file_type().is_block_device()
}

/// Get the size of an existing output file or block device. Returns
/// `None` for stdout (`path = None`) or a path that doesn't exist yet.
#[cfg(target_os = "linux")]
pub fn get_output_size(path: Option<&Path>) -> Option<u64> {
    use std::fs::File;

    const BLKGETSIZE64: libc::c_ulong = 0x80081272;

    let path = path?;
    let metadata = std::fs::metadata(path).ok()?;
    if is_block_device(&metadata) {
        let file = File::open(path).ok()?;
        let mut size: u64 = 0;
        // SAFETY: `file` is a valid open fd; `size` is a valid `u64` out
        // pointer, matching what BLKGETSIZE64 expects.
        let rc = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64, &mut size as *mut u64) };
        if rc == 0 {
            Some(size)
        } else {
            None
        }
    } else if metadata.is_file() {
        Some(metadata.len())
    } else {
        None
    }
}

#[cfg(not(target_os = "linux"))]
pub fn get_output_size(path: Option<&Path>) -> Option<u64> {
    let path = path?;
    std::fs::metadata(path).ok().map(|m| m.len())
}

/// Render a byte count as a human-readable IEC string (`"1.50 MiB"`),
/// matching the original's summary/progress formatting.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Generate a sparse range from 0 to `n`, used by the benchmark driver to
/// pick representative thread counts without testing every integer up to
/// the CPU count.
pub fn sparse_range(n: usize, max_items: usize) -> Vec<usize> {
    if n < 1 {
        return vec![1];
    }
    if n <= max_items.saturating_sub(1) {
        return (0..=n).collect();
    }

    let keep = 3;
    let mut out: Vec<usize> = (0..=keep).collect();

    let remaining = max_items - keep;
    let step = ((n / (remaining - 1).max(1)).max(1)).max(1);

    for k in 1..remaining {
        let v = k * step;
        if v > *out.last().unwrap() {
            out.push(v);
        }
    }

    if *out.last().unwrap() != n {
        *out.last_mut().unwrap() = n;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_integer() {
        assert_eq!(parse_size(Some("1048576"), None).unwrap(), Some(1_048_576));
    }

    #[test]
    fn parse_si_and_iec_prefixes() {
        assert_eq!(parse_size(Some("1g"), None).unwrap(), Some(1_000_000_000));
        assert_eq!(parse_size(Some("1gi"), None).unwrap(), Some(1_073_741_824));
        assert_eq!(parse_size(Some("100mi"), None).unwrap(), Some(100 * 1024 * 1024));
        assert_eq!(parse_size(Some("1kb"), None).unwrap(), Some(1_000));
        assert_eq!(parse_size(Some("1kib"), None).unwrap(), Some(1_024));
    }

    #[test]
    fn parse_underscores_are_ignored() {
        assert_eq!(
            parse_size(Some("1_000_000"), None).unwrap(),
            Some(1_000_000)
        );
    }

    #[test]
    fn parse_allows_whitespace_before_unit() {
        assert_eq!(parse_size(Some("1 gb"), None).unwrap(), Some(1_000_000_000));
        assert_eq!(parse_size(Some("1 gi"), None).unwrap(), Some(1_073_741_824));
        assert_eq!(parse_size(Some("10 sect"), None).unwrap(), Some(5_120));
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(parse_size(Some("1G"), None).unwrap(), Some(1_000_000_000));
        assert_eq!(parse_size(Some("1GI"), None).unwrap(), Some(1_073_741_824));
    }

    #[test]
    fn parse_none_is_none() {
        assert_eq!(parse_size(None, None).unwrap(), None);
    }

    #[test]
    fn parse_sect_without_device_falls_back_to_512() {
        assert_eq!(parse_size(Some("10sect"), None).unwrap(), Some(5_120));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_size(Some("banana"), None).is_err());
    }

    #[test]
    fn format_bytes_picks_the_largest_clean_unit() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(1024 * 1024 * 1024), "1.00 GiB");
    }

    #[test]
    fn sparse_range_is_dense_for_small_n() {
        assert_eq!(sparse_range(4, 9), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn sparse_range_includes_endpoints_for_large_n() {
        let r = sparse_range(64, 9);
        assert_eq!(r[0], 0);
        assert_eq!(*r.last().unwrap(), 64);
        assert!(r.len() <= 9);
    }
}
