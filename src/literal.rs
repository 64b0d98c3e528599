use crate::error::Error;
use encoding_rs::SHIFT_JIS;

/// Parsed `.string` / `.wstring` data line. `stride` is the terminator
/// width (1 byte narrow, 2 bytes wide); `auto` requests zero-padding of the
/// encoded run up to the next multiple of 4.
#[derive(Debug)]
pub struct StringData {
    pub bytes: Vec<u8>,
    pub stride: usize,
    pub auto: bool,
}

impl StringData {
    /// Total number of bytes the line occupies at `addr`: encoded text plus
    /// terminator, plus `AUTO` alignment padding.
    pub fn byte_count(&self, addr: u32) -> usize {
        let mut count = self.bytes.len() + self.stride;
        if self.auto {
            while (addr as usize + count) % 4 != 0 {
                count += 1;
            }
        }
        count
    }
}

/// Recognize a `.string "…"` / `.wstring "…"` line. Returns `None` for any
/// other line; a string line with no quoted text is an error. Narrow
/// strings use the legacy Shift-JIS encoding, wide strings big-endian
/// UTF-16 code units.
pub fn parse_string_line(line: &str) -> Option<Result<StringData, Error>> {
    let trimmed = line.trim_start();
    let (wide, rest) = if let Some(rest) = trimmed.strip_prefix(".wstring ") {
        (true, rest)
    } else if let Some(rest) = trimmed.strip_prefix(".string ") {
        (false, rest)
    } else {
        return None;
    };

    let malformed = || Error::MalformedString(line.trim().to_string());
    let open = match rest.find('"') {
        Some(i) => i,
        None => return Some(Err(malformed())),
    };
    let close = rest.rfind('"').unwrap_or(open);
    if close <= open {
        return Some(Err(malformed()));
    }
    let content = &rest[open + 1..close];
    let auto = rest[close + 1..].trim() == "AUTO";

    let bytes = if wide {
        content
            .encode_utf16()
            .flat_map(|unit| unit.to_be_bytes())
            .collect()
    } else {
        SHIFT_JIS.encode(content).0.into_owned()
    };
    Some(Ok(StringData {
        bytes,
        stride: if wide { 2 } else { 1 },
        auto,
    }))
}

/// True for `.double` data lines, which occupy 8 bytes instead of 4.
pub fn is_double(line: &str) -> bool {
    line.trim_start().starts_with(".double ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_string() {
        let data = parse_string_line(".string \"AB\"").unwrap().unwrap();
        assert_eq!(data.bytes, b"AB");
        assert_eq!(data.stride, 1);
        assert!(!data.auto);
        // two bytes plus one terminator, no padding requested
        assert_eq!(data.byte_count(0x80000000), 3);
    }

    #[test]
    fn auto_pads_to_word() {
        let data = parse_string_line(".string \"AB\" AUTO").unwrap().unwrap();
        assert!(data.auto);
        assert_eq!(data.byte_count(0x80000000), 4);
        assert_eq!(data.byte_count(0x80000002), 6);
    }

    #[test]
    fn wide_string() {
        let data = parse_string_line(".wstring \"AB\"").unwrap().unwrap();
        assert_eq!(data.bytes, [0x00, 0x41, 0x00, 0x42]);
        assert_eq!(data.stride, 2);
        assert_eq!(data.byte_count(0x80000000), 6);
    }

    #[test]
    fn not_a_string_line() {
        assert!(parse_string_line("lwz r3, 0(r4)").is_none());
        assert!(parse_string_line(".set A, 1").is_none());
    }

    #[test]
    fn missing_quotes() {
        assert!(parse_string_line(".string AB").unwrap().is_err());
        assert!(parse_string_line(".string \"AB").unwrap().is_err());
    }
}
