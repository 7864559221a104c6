//! OpenGL versions: the candidates the probe walks and the parser for the
//! driver-reported version string.

use std::fmt;

/// A major/minor OpenGL version.
///
/// Versions order lexicographically, so `4.6 > 4.1 > 3.3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major version of the Api.
    pub major: u32,
    /// Minor version of the Api.
    pub minor: u32,
}

impl Version {
    /// Create new version with the given `major` and `minor` values.
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// The compact `major * 10 + minor` encoding.
    ///
    /// Only meaningful while `minor` is a single digit, which holds for every
    /// desktop OpenGL release and is enforced by [`parse_version`]. Saturates
    /// at `u32::MAX`; parsed versions always fit.
    pub const fn encoded(self) -> u32 {
        self.major.saturating_mul(10).saturating_add(self.minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Core profile versions worth asking for, oldest first.
pub const KNOWN_CORE_VERSIONS: [Version; 9] = [
    Version::new(3, 2),
    Version::new(3, 3),
    Version::new(4, 0),
    Version::new(4, 1),
    Version::new(4, 2),
    Version::new(4, 3),
    Version::new(4, 4),
    Version::new(4, 5),
    Version::new(4, 6),
];

/// Parse the `GL_VERSION` string of a context.
///
/// Vendor prefixes such as `"OpenGL ES "` are skipped up to the first digit,
/// then `<major>.<minor>` is scanned. Anything after the minor number
/// (profile, driver name, build) is ignored. The result is `None` when the
/// string is missing, the pattern does not match, the minor number is not
/// a single digit, or the encoded value overflows `u32`.
pub fn parse_version(version: Option<&str>) -> Option<Version> {
    let version = version?;
    let start = version.find(|c: char| c.is_ascii_digit())?;
    let mut scanner = Scanner { rest: &version[start..] };

    let major = scanner.integer()?;
    scanner.literal('.')?;
    let minor = scanner.integer()?;

    if !(0..=9).contains(&minor) {
        return None;
    }

    let major = u32::try_from(major).ok()?;
    let minor = minor as u32;
    major.checked_mul(10)?.checked_add(minor)?;
    Some(Version::new(major, minor))
}

/// Minimal `%d` style scanner.
struct Scanner<'a> {
    rest: &'a str,
}

impl Scanner<'_> {
    /// Leading whitespace and a sign are accepted before the digits.
    fn integer(&mut self) -> Option<i64> {
        let trimmed = self.rest.trim_start();
        let (negative, unsigned) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };

        let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }

        let value: i64 = unsigned[..digits].parse().ok()?;
        self.rest = &unsigned[digits..];
        Some(if negative { -value } else { value })
    }

    fn literal(&mut self, expected: char) -> Option<()> {
        self.rest = self.rest.strip_prefix(expected)?;
        Some(())
    }
}
