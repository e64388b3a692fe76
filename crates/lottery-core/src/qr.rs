//! QR payload format (§6): pure string encoding/decoding, no dependency on
//! an actual QR codec (image encoding is out of scope, per §1 Non-goals).

use crate::ids::EventId;

pub fn encode_qr_payload(event_id: EventId) -> String {
    format!("EVENT:{event_id}")
}

pub fn encode_qr_payload_with_hash(event_id: EventId, timestamp_ms: u64, hash_hex: &str) -> String {
    format!("EVENT:{event_id}:TIMESTAMP:{timestamp_ms}:HASH:{hash_hex}")
}

/// Accepts either form the encoder produces, extracting the `eventId`
/// substring between the first two colons (§6 "QR payload format").
pub fn decode_qr_payload(payload: &str) -> Option<EventId> {
    let rest = payload.strip_prefix("EVENT:")?;
    let id_str = match rest.find(':') {
        Some(idx) => &rest[..idx],
        None => rest,
    };
    id_str.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_short_form() {
        let id = EventId::new();
        assert_eq!(decode_qr_payload(&encode_qr_payload(id)), Some(id));
    }

    #[test]
    fn roundtrips_long_form() {
        let id = EventId::new();
        let payload = encode_qr_payload_with_hash(id, 1234, "abcdef");
        assert_eq!(decode_qr_payload(&payload), Some(id));
    }

    #[test]
    fn rejects_malformed_payload() {
        assert_eq!(decode_qr_payload("NOT-AN-EVENT"), None);
    }
}
