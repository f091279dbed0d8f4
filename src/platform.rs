//! Locating an installed 1C platform build by dotted four-part version.

use crate::error::ConfigError;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// Executable locations tried inside a version directory, in order.
const EXECUTABLE_CANDIDATES: &[&str] = &["bin/1cv8.exe", "bin/1cv8", "1cv8"];

/// Fixed installation roots scanned when the configuration names none.
pub fn default_roots() -> Vec<PathBuf> {
    if cfg!(windows) {
        vec![
            PathBuf::from(r"C:\Program Files\1cv8"),
            PathBuf::from(r"C:\Program Files (x86)\1cv8"),
        ]
    } else {
        vec![
            PathBuf::from("/opt/1cv8/x86_64"),
            PathBuf::from("/opt/1cv8/i386"),
            PathBuf::from("/opt/1C/v8.3/x86_64"),
        ]
    }
}

/// A dotted four-part platform version such as `8.3.27.1234`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformVersion([u32; 4]);

impl PlatformVersion {
    /// Parse a directory name; anything but four numeric parts is rejected.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = [0u32; 4];
        let mut count = 0;
        for segment in text.split('.') {
            if count == 4 || segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            parts[count] = segment.parse().ok()?;
            count += 1;
        }
        (count == 4).then_some(PlatformVersion(parts))
    }
}

impl Ord for PlatformVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for PlatformVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// Version filter such as `8.3.27`, `8.3.*` or `8.3.2[0-9]`.
///
/// A mask with fewer than four segments is a prefix: the missing segments
/// match any number. `*` inside a segment matches any digits; a trailing
/// `*` segment matches the whole remainder. Bracket ranges are character
/// classes over one digit. The match is anchored to the full version.
#[derive(Debug, Clone)]
pub struct VersionMask {
    source: String,
    regex: Regex,
}

impl VersionMask {
    pub fn parse(mask: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidVersionMask {
            mask: mask.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = mask.trim().split('.').collect();
        if segments.len() > 4 {
            return Err(invalid("more than four segments"));
        }

        let last = segments.len() - 1;
        let mut pattern = String::from("^");
        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(invalid("empty segment"));
            }
            if i > 0 {
                pattern.push_str(r"\.");
            }
            if i == last && *segment == "*" {
                pattern.push_str(r"\d+(?:\.\d+)*");
                continue;
            }
            pattern.push_str(&segment_pattern(segment).map_err(|r| invalid(&r))?);
        }
        let open_tail = segments[last] == "*";
        if !open_tail {
            for _ in segments.len()..4 {
                pattern.push_str(r"\.\d+");
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            source: mask.trim().to_string(),
            regex,
        })
    }

    pub fn matches(&self, version: &str) -> bool {
        self.regex.is_match(version)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn segment_pattern(segment: &str) -> Result<String, String> {
    let mut out = String::new();
    let mut chars = segment.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(r"\d*"),
            '[' => {
                let mut class = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(c) if c.is_ascii_digit() || c == '-' => class.push(c),
                        Some(c) => return Err(format!("unexpected '{c}' in bracket range")),
                        None => return Err("unclosed bracket range".to_string()),
                    }
                }
                if class.is_empty() {
                    return Err("empty bracket range".to_string());
                }
                out.push('[');
                out.push_str(&class);
                out.push(']');
            }
            c if c.is_ascii_digit() => out.push(c),
            c => return Err(format!("unexpected '{c}'")),
        }
    }
    Ok(out)
}

/// One installed platform build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub version: PlatformVersion,
    pub executable: PathBuf,
}

/// Pick the numerically greatest installed version under `roots` that
/// satisfies `mask` (any version when `mask` is `None`).
pub fn find_platform(roots: &[PathBuf], mask: Option<&VersionMask>) -> Option<Platform> {
    roots
        .iter()
        .flat_map(|root| installed_in(root))
        .filter(|p| mask.map_or(true, |m| m.matches(&p.version.to_string())))
        .max_by_key(|p| p.version)
}

fn installed_in(root: &Path) -> Vec<Platform> {
    let read_dir = match std::fs::read_dir(root) {
        Ok(rd) => rd,
        Err(e) => {
            tracing::debug!(root = %root.display(), error = %e, "platform root not readable");
            return Vec::new();
        }
    };

    read_dir
        .flatten()
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let version = PlatformVersion::parse(&entry.file_name().to_string_lossy())?;
            let dir = entry.path();
            let executable = EXECUTABLE_CANDIDATES
                .iter()
                .map(|rel| dir.join(rel))
                .find(|p| p.is_file())?;
            Some(Platform {
                version,
                executable,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mask(m: &str) -> VersionMask {
        VersionMask::parse(m).unwrap()
    }

    #[test]
    fn literal_mask_is_a_prefix_of_four_parts() {
        let m = mask("8.3.27");
        assert!(m.matches("8.3.27.1234"));
        assert!(!m.matches("8.3.28.1001"));
        assert!(!m.matches("8.3.270.1"));
        assert!(!m.matches("8.3.27"));
    }

    #[test]
    fn full_version_mask_matches_exactly() {
        let m = mask("8.3.27.1234");
        assert!(m.matches("8.3.27.1234"));
        assert!(!m.matches("8.3.27.12345"));
    }

    #[test]
    fn trailing_wildcard_matches_rest() {
        let m = mask("8.3.*");
        assert!(m.matches("8.3.27.1234"));
        assert!(m.matches("8.3.1.1"));
        assert!(!m.matches("8.2.19.130"));
    }

    #[test]
    fn bracket_range_matches_one_digit() {
        let m = mask("8.3.2[0-9]");
        assert!(m.matches("8.3.24.1000"));
        assert!(!m.matches("8.3.19.1000"));
        assert!(!m.matches("8.3.245.1"));
    }

    #[test]
    fn malformed_masks_are_rejected() {
        assert!(VersionMask::parse("8.3.[0-9").is_err());
        assert!(VersionMask::parse("8..3").is_err());
        assert!(VersionMask::parse("8.3.a").is_err());
        assert!(VersionMask::parse("8.3.1.2.3").is_err());
    }

    #[test]
    fn versions_compare_numerically() {
        let a = PlatformVersion::parse("8.3.9.2000").unwrap();
        let b = PlatformVersion::parse("8.3.10.100").unwrap();
        assert!(a < b);
        assert_eq!(b.to_string(), "8.3.10.100");
        assert!(PlatformVersion::parse("8.3.10").is_none());
        assert!(PlatformVersion::parse("8.3.10.x").is_none());
    }

    fn install(root: &Path, version: &str) -> PathBuf {
        let bin = root.join(version).join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let exe = bin.join("1cv8");
        std::fs::write(&exe, b"").unwrap();
        exe
    }

    #[test]
    fn picks_greatest_matching_version() {
        let tmp = TempDir::new().unwrap();
        install(tmp.path(), "8.3.9.2000");
        let newest = install(tmp.path(), "8.3.27.1234");
        install(tmp.path(), "8.3.28.1001");
        std::fs::create_dir_all(tmp.path().join("common")).unwrap();
        std::fs::create_dir_all(tmp.path().join("8.3.30.1").join("empty")).unwrap();

        let roots = vec![tmp.path().to_path_buf()];
        let found = find_platform(&roots, Some(&mask("8.3.27"))).unwrap();
        assert_eq!(found.version.to_string(), "8.3.27.1234");
        assert_eq!(found.executable, newest);

        let any = find_platform(&roots, None).unwrap();
        assert_eq!(any.version.to_string(), "8.3.28.1001");
    }

    #[test]
    fn no_installed_version_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let roots = vec![tmp.path().to_path_buf(), tmp.path().join("missing")];
        assert_eq!(find_platform(&roots, None), None);

        install(tmp.path(), "8.3.28.1001");
        assert_eq!(find_platform(&roots, Some(&mask("8.3.27"))), None);
    }
}
