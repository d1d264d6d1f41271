use crate::types::LicenseFamily;

const MAX_FILENAME_BYTES: usize = 255;
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];
const RESERVED: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Every character fits in a single ISO-8859-1 byte.
#[must_use]
pub fn is_latin1(s: &str) -> bool {
    s.chars().all(|c| u32::from(c) <= 0xFF)
}

/// Valid as a file name on Windows, macOS and Linux alike.
#[must_use]
pub fn is_portable_filename(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_FILENAME_BYTES {
        return false;
    }
    if name.chars().any(|c| c.is_control() || FORBIDDEN.contains(&c)) {
        return false;
    }
    if name.ends_with(' ') || name.ends_with('.') {
        return false;
    }

    let stem = name.split('.').next().unwrap_or(name).trim_end();
    !RESERVED.iter().any(|r| r.eq_ignore_ascii_case(stem))
}

/// `"{name}-{family}"` when usable, otherwise just the family name.
#[must_use]
pub fn download_stem(name: &str, family: LicenseFamily) -> String {
    let preferred = format!("{name}-{family}");
    if is_latin1(&preferred) && is_portable_filename(&preferred) {
        preferred
    } else {
        family.as_str().to_string()
    }
}

/// `attachment; filename=...` encoded as ISO-8859-1 header bytes, or
/// `None` if the name cannot be represented.
#[must_use]
pub fn content_disposition(filename: &str) -> Option<Vec<u8>> {
    if !is_latin1(filename) || filename.chars().any(char::is_control) {
        return None;
    }

    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    let value = format!("attachment; filename=\"{escaped}\"");
    // Each char is <= 0xFF after the check above
    Some(value.chars().map(|c| c as u8).collect())
}
