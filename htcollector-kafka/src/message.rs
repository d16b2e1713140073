use crate::version::KafkaVersion;

const MAX_VARINT_LEN_32: usize = 5;
const MAX_VARINT_LEN_64: usize = 10;
// record batch framing, Kafka 0.11 and later
const MAXIMUM_RECORD_OVERHEAD: usize = 5 * MAX_VARINT_LEN_32 + MAX_VARINT_LEN_64 + 1;
// message set framing before 0.11
const PRODUCER_MESSAGE_OVERHEAD: usize = 26;

/// A Kafka record header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordHeader {
    /// Header key.
    pub key: Vec<u8>,
    /// Header value.
    pub value: Vec<u8>,
}

/// A message handed to the [`KafkaProducer`](crate::KafkaProducer).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProducerMessage {
    /// Destination topic.
    pub topic: String,
    /// Partitioning key.
    pub key: Option<Vec<u8>>,
    /// Encoded payload.
    pub value: Vec<u8>,
    /// Record headers. Only sent to brokers on 0.11 or later.
    pub headers: Vec<RecordHeader>,
}

impl ProducerMessage {
    /// Size the producer accounts for this message when comparing it with
    /// `max_message_bytes`.
    ///
    /// Headers only count against record batches, which exist from Kafka
    /// 0.11 on. Older message sets use a fixed overhead.
    pub fn byte_size(&self, version: KafkaVersion) -> usize {
        let mut size = if version.is_at_least(KafkaVersion::V0_11_0_0) {
            MAXIMUM_RECORD_OVERHEAD
                + self
                    .headers
                    .iter()
                    .map(|h| h.key.len() + h.value.len() + 2 * MAX_VARINT_LEN_32)
                    .sum::<usize>()
        } else {
            PRODUCER_MESSAGE_OVERHEAD
        };
        size += self.key.as_ref().map_or(0, Vec::len);
        size + self.value.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overhead_depends_on_protocol_version() {
        let message = ProducerMessage {
            topic: "spans".into(),
            key: Some(b"abc".to_vec()),
            value: vec![0; 100],
            headers: vec![RecordHeader {
                key: b"tenant".to_vec(),
                value: b"acme".to_vec(),
            }],
        };

        assert_eq!(MAXIMUM_RECORD_OVERHEAD, 36);
        assert_eq!(
            message.byte_size(KafkaVersion::new(2, 0, 0, 0)),
            36 + (6 + 4 + 10) + 3 + 100
        );
        assert_eq!(message.byte_size(KafkaVersion::new(0, 10, 2, 1)), 26 + 3 + 100);
    }
}
