use crate::error::Error;
use std::fmt;

/// Disc region a build targets. Fragments can scope themselves to one
/// region with `.PATCH REGION <name>` using either the full or short form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    NtscU,
    Pal,
    NtscJ,
    NtscK,
    NtscW,
}

impl Region {
    pub fn parse(arg: &str) -> Result<Region, Error> {
        match arg.to_uppercase().as_str() {
            "NTSC-U" | "USA" => Ok(Region::NtscU),
            "PAL" | "EUR" => Ok(Region::Pal),
            "NTSC-J" | "JPN" => Ok(Region::NtscJ),
            "NTSC-K" | "KOR" => Ok(Region::NtscK),
            "NTSC-W" | "TAW" => Ok(Region::NtscW),
            _ => Err(Error::InvalidRegion(arg.to_string())),
        }
    }

    pub fn full(&self) -> &'static str {
        match self {
            Region::NtscU => "NTSC-U",
            Region::Pal => "PAL",
            Region::NtscJ => "NTSC-J",
            Region::NtscK => "NTSC-K",
            Region::NtscW => "NTSC-W",
        }
    }

    /// One-letter disc id suffix, e.g. the `E` in `SB3E01`.
    pub fn short(&self) -> &'static str {
        match self {
            Region::NtscU => "E",
            Region::Pal => "P",
            Region::NtscJ => "J",
            Region::NtscK => "K",
            Region::NtscW => "W",
        }
    }

    /// True if `token` names this region in either full or short form.
    pub fn matches(&self, token: &str) -> bool {
        token == self.full() || token == self.short()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full())
    }
}
