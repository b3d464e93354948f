// Wire format (JSON сериализация)
// Конверт передаётся хосту и обратно в виде JSON с тегом `shape`

use crate::protocol::envelope::MessageEnvelope;
use crate::protocol::validation::validate_envelope;
use crate::utils::error::{Result, VeilError};
use serde::{Deserialize, Serialize};

/// Упаковать конверт в JSON (перед упаковкой проверяется форма)
pub fn pack_envelope(envelope: &MessageEnvelope) -> Result<String> {
    validate_envelope(envelope)?;
    pack_raw(envelope)
}

/// Распаковать JSON в конверт и проверить форму
pub fn unpack_envelope(json: &str) -> Result<MessageEnvelope> {
    let envelope: MessageEnvelope = unpack_raw(json)?;
    validate_envelope(&envelope)?;
    Ok(envelope)
}

/// Упаковать произвольные данные в JSON
pub fn pack_raw<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string(data)
        .map_err(|e| VeilError::SerializationError(format!("JSON pack error: {}", e)))
}

/// Распаковать JSON в произвольный тип
pub fn unpack_raw<'a, T: Deserialize<'a>>(json: &'a str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| VeilError::SerializationError(format!("JSON unpack error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_envelope() {
        let envelope = MessageEnvelope::plain_encoded("hello");
        let packed = pack_envelope(&envelope).unwrap();
        assert!(packed.contains(r#""shape":"plainEncoded""#));
        assert_eq!(unpack_envelope(&packed).unwrap(), envelope);
    }

    #[test]
    fn test_unpack_rejects_bad_json_and_bad_shape() {
        assert!(matches!(
            unpack_envelope("{not json"),
            Err(VeilError::SerializationError(_))
        ));
        assert!(matches!(
            unpack_envelope(r#"{"shape":"hybrid","content":"nope","encryptedKey":"a2V5"}"#),
            Err(VeilError::ValidationError(_))
        ));
    }
}
