use super::error::SaveError;
use std::fmt;
use std::str::FromStr;

/// Semantic game version a save blob was written by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GameVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GameVersion {
    pub const ZERO: GameVersion = GameVersion::new(0, 0, 0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Parse, treating missing or blank strings as `0.0.0` (pre-versioning saves).
    pub fn parse_lenient(raw: Option<&str>) -> Result<Self, SaveError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::ZERO),
            Some(s) => s.parse(),
        }
    }

    pub fn current() -> Self {
        // CURRENT_GAME_VERSION is a literal checked by tests below.
        crate::CURRENT_GAME_VERSION.parse().unwrap_or(Self::ZERO)
    }
}

impl FromStr for GameVersion {
    type Err = SaveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let core = s.trim().trim_start_matches('v');
        // Pre-release and build suffixes do not take part in ordering
        let core = core.split(|c| c == '-' || c == '+').next().unwrap_or(core);

        let mut parts = core.split('.');
        let mut next = |required: bool| -> Result<u32, SaveError> {
            match parts.next() {
                Some(p) => p.parse().map_err(|_| SaveError::InvalidVersion(s.to_string())),
                None if required => Err(SaveError::InvalidVersion(s.to_string())),
                None => Ok(0),
            }
        };

        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        if parts.next().is_some() {
            return Err(SaveError::InvalidVersion(s.to_string()));
        }
        Ok(Self { major, minor, patch })
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
