// JSON Message Codec
// In-process stand-in for the wire grammar: drafts and responses as JSON

use hbci_core::domain::{DecodedMessage, MessageDraft};
use hbci_core::port::MessageCodec;
use hbci_core::{AppError, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode(&self, draft: &MessageDraft) -> Result<Vec<u8>> {
        serde_json::to_vec(draft).map_err(|e| AppError::Codec(format!("encode failed: {}", e)))
    }

    fn decode(&self, raw: &[u8]) -> Result<DecodedMessage> {
        serde_json::from_slice(raw).map_err(|e| AppError::Codec(format!("decode failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_response() {
        let raw = json!({
            "dialog_id": "dlg-1",
            "msg_num": 1,
            "msg_ref": 1,
            "segments": [{
                "name": "SegResult",
                "segment": 3,
                "reference_segment": 2,
                "data": {"SegResult": {"result": [{"resultcode": "0020"}]}},
                "security": null
            }]
        });
        let msg = JsonCodec.decode(raw.to_string().as_bytes()).unwrap();
        assert_eq!(msg.msg_ref, Some(1));
        assert_eq!(msg.segments[0].reference_segment, Some(2));
    }

    #[test]
    fn test_decode_garbage_is_codec_error() {
        assert!(matches!(JsonCodec.decode(b"HNHBK:1:3+"), Err(AppError::Codec(_))));
    }
}
