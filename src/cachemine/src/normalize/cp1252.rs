//! Windows-1252 decoding for legacy 8-bit strings

/// Code points for 0x80..=0x9F; `None` marks bytes the code page leaves undefined
const HIGH_CONTROL: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// Decode cp1252 bytes, returning the offset of the first undefined byte on failure
pub fn decode(bytes: &[u8]) -> Result<String, usize> {
    let mut out = String::with_capacity(bytes.len());
    for (pos, &b) in bytes.iter().enumerate() {
        let c = match b {
            0x80..=0x9F => HIGH_CONTROL[(b - 0x80) as usize].ok_or(pos)?,
            _ => b as char,
        };
        out.push(c);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        assert_eq!(decode(b"Tritanium").unwrap(), "Tritanium");
    }

    #[test]
    fn test_high_range() {
        assert_eq!(decode(&[0x80, 0x20, 0x99]).unwrap(), "\u{20AC} \u{2122}");
        assert_eq!(decode(&[0xE9, 0xFF]).unwrap(), "\u{E9}\u{FF}");
    }

    #[test]
    fn test_undefined_byte() {
        assert_eq!(decode(&[0x41, 0x81]), Err(1));
        assert_eq!(decode(&[0x9D]), Err(0));
    }
}
