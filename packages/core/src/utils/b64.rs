// Base64 утилиты

use base64::{engine::general_purpose, Engine};

pub fn encode(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

pub fn decode(data: &str) -> Result<Vec<u8>, String> {
    general_purpose::STANDARD
        .decode(data)
        .map_err(|e| format!("Base64 decode failed: {}", e))
}

/// Декодировать base64 и интерпретировать результат как UTF-8 текст
pub fn decode_utf8(data: &str) -> Result<String, String> {
    let bytes = decode(data)?;
    String::from_utf8(bytes).map_err(|e| format!("Decoded bytes are not UTF-8: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_utf8(&encode("привет".as_bytes())).unwrap(), "привет");
        // "test" is valid base64 but decodes to non-UTF-8 bytes
        assert!(decode_utf8("test").is_err());
        assert!(decode_utf8("not base64!").is_err());
    }
}
