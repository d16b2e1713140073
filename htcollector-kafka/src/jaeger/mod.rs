//! Jaeger `api_v2` protobuf model and the translation from OTLP.
mod model;
mod translate;

pub use model::{KeyValue, Log, Process, Span, SpanRef, SpanRefType, ValueType};
pub use translate::{translate, Translated};

impl KeyValue {
    /// A `STRING` tag.
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        KeyValue {
            key: key.into(),
            v_type: ValueType::String as i32,
            v_str: value.into(),
            ..Default::default()
        }
    }

    /// A `BOOL` tag.
    pub fn bool(key: impl Into<String>, value: bool) -> Self {
        KeyValue {
            key: key.into(),
            v_type: ValueType::Bool as i32,
            v_bool: value,
            ..Default::default()
        }
    }

    /// An `INT64` tag.
    pub fn int64(key: impl Into<String>, value: i64) -> Self {
        KeyValue {
            key: key.into(),
            v_type: ValueType::Int64 as i32,
            v_int64: value,
            ..Default::default()
        }
    }

    /// A `FLOAT64` tag.
    pub fn float64(key: impl Into<String>, value: f64) -> Self {
        KeyValue {
            key: key.into(),
            v_type: ValueType::Float64 as i32,
            v_float64: value,
            ..Default::default()
        }
    }

    /// A `BINARY` tag.
    pub fn binary(key: impl Into<String>, value: Vec<u8>) -> Self {
        KeyValue {
            key: key.into(),
            v_type: ValueType::Binary as i32,
            v_binary: value,
            ..Default::default()
        }
    }

    /// The tag value rendered as text.
    pub fn value_text(&self) -> String {
        match self.v_type() {
            ValueType::String => self.v_str.clone(),
            ValueType::Bool => self.v_bool.to_string(),
            ValueType::Int64 => self.v_int64.to_string(),
            ValueType::Float64 => self.v_float64.to_string(),
            ValueType::Binary => const_hex::encode(&self.v_binary),
        }
    }

    /// Byte length of a `STRING` or `BINARY` value, zero otherwise.
    pub fn value_len(&self) -> usize {
        match self.v_type() {
            ValueType::String => self.v_str.len(),
            ValueType::Binary => self.v_binary.len(),
            _ => 0,
        }
    }
}

/// Renders a 16 byte trace id the way Jaeger's `TraceID.String()` does: the
/// low half alone when the high half is zero, otherwise the high half
/// followed by the zero padded low half.
pub fn trace_id_string(trace_id: &[u8]) -> String {
    let (high, low) = split_trace_id(trace_id);
    if high == 0 {
        format!("{low:x}")
    } else {
        format!("{high:x}{low:016x}")
    }
}

fn split_trace_id(trace_id: &[u8]) -> (u64, u64) {
    let mut high = [0u8; 8];
    let mut low = [0u8; 8];
    if trace_id.len() == 16 {
        high.copy_from_slice(&trace_id[..8]);
        low.copy_from_slice(&trace_id[8..]);
    }
    (u64::from_be_bytes(high), u64::from_be_bytes(low))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_id_rendering() {
        let mut trace_id = [0u8; 16];
        trace_id[15] = 0x2a;
        assert_eq!(trace_id_string(&trace_id), "2a");

        trace_id[7] = 0x01;
        assert_eq!(trace_id_string(&trace_id), "1000000000000002a");

        assert_eq!(trace_id_string(&[0x5b; 16]), "5b".repeat(16));
    }

    #[test]
    fn tag_values() {
        assert_eq!(KeyValue::string("k", "v").value_text(), "v");
        assert_eq!(KeyValue::bool("k", true).value_text(), "true");
        assert_eq!(KeyValue::int64("k", -3).value_text(), "-3");
        assert_eq!(KeyValue::binary("k", vec![0xca, 0xfe]).value_text(), "cafe");
        assert_eq!(KeyValue::binary("k", vec![0xca, 0xfe]).value_len(), 2);
        assert_eq!(KeyValue::int64("k", 12345).value_len(), 0);
    }
}
