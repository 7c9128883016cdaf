//! Raw source bytes → canonical UTF-8 text.

use encoding_rs::{Encoding, WINDOWS_1252};

use crate::error::DecodeError;

/// Decode object-file bytes.
///
/// - A byte-order mark selects UTF-8, UTF-16LE or UTF-16BE; malformed content
///   under a BOM fails.
/// - Otherwise valid UTF-8 is taken as-is.
/// - Otherwise the bytes are read as Windows-1252, the usual encoding of
///   legacy object files.
///
/// Content with NUL bytes (after BOM decoding) is rejected as binary.
pub fn decode_source(bytes: &[u8]) -> Result<String, DecodeError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let text = encoding
            .decode_without_bom_handling_and_without_replacement(&bytes[bom_len..])
            .ok_or(DecodeError::Malformed {
                encoding: encoding.name(),
            })?;
        reject_binary(&text)?;
        return Ok(text.into_owned());
    }

    if let Some(offset) = bytes.iter().position(|b| *b == 0) {
        return Err(DecodeError::Binary { offset });
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => WINDOWS_1252
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|text| text.into_owned())
            .ok_or(DecodeError::Malformed {
                encoding: WINDOWS_1252.name(),
            }),
    }
}

fn reject_binary(text: &str) -> Result<(), DecodeError> {
    match text.find('\0') {
        Some(offset) => Err(DecodeError::Binary { offset }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_utf8() {
        assert_eq!(decode_source(b"name=bus\n").unwrap(), "name=bus\n");
        assert_eq!(
            decode_source("# Straßenbahn\n".as_bytes()).unwrap(),
            "# Straßenbahn\n"
        );
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let bytes = [&[0xEF, 0xBB, 0xBF][..], b"name=x"].concat();
        assert_eq!(decode_source(&bytes).unwrap(), "name=x");
    }

    #[test]
    fn test_utf16le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "name=x".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_source(&bytes).unwrap(), "name=x");
    }

    #[test]
    fn test_legacy_single_byte_fallback() {
        // "copyright=© Zoë" in Windows-1252
        let bytes = b"copyright=\xA9 Zo\xEB";
        assert_eq!(decode_source(bytes).unwrap(), "copyright=© Zoë");
    }

    #[test]
    fn test_binary_content_is_rejected() {
        assert_eq!(
            decode_source(b"name\0=x"),
            Err(DecodeError::Binary { offset: 4 })
        );
    }

    #[test]
    fn test_malformed_utf16_is_rejected() {
        // BOM followed by a lone high surrogate.
        let bytes = [0xFF, 0xFE, 0x00, 0xD8];
        assert!(matches!(
            decode_source(&bytes),
            Err(DecodeError::Malformed { .. })
        ));
    }
}
