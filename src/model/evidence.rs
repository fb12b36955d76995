//! Evidence files travel as standard base64 in JSON and as raw bytes in storage.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serializer;

pub fn decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(encoded.trim())
}

pub fn serialize<S: Serializer>(evidence: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match evidence {
        Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Doc {
        #[serde(serialize_with = "serialize")]
        evidence: Option<Vec<u8>>,
    }

    #[test]
    fn encodes_bytes_and_accepts_padded_input() {
        let json = serde_json::to_value(Doc {
            evidence: Some(b"scan".to_vec()),
        })
        .unwrap();
        assert_eq!(json["evidence"], "c2Nhbg==");
        assert_eq!(decode(" c2Nhbg==\n").unwrap(), b"scan");
        assert!(decode("%%").is_err());
    }
}
