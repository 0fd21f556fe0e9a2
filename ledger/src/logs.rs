//! Decoding of exported application logs

use crate::errors::LedgerResult;
use avm_emu_arc4::constants::ABI_RETURN_PREFIX;
use avm_emu_arc4::{Arc4Error, DecodePrefix, EncodedValue, TypeDescriptor};

/// How to interpret one log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogKind {
    Uint64,
    Str,
    Bytes,
    /// ARC4 value; a leading ABI return marker is stripped
    Arc4(TypeDescriptor),
}

/// A decoded log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogValue {
    Uint64(u64),
    Str(String),
    Bytes(Vec<u8>),
    Arc4(EncodedValue),
}

/// Decode `logs` using `kinds` positionally. When there are fewer kinds than
/// logs the last kind applies to the rest; no kinds means raw bytes.
pub fn decode_logs(logs: &[Vec<u8>], kinds: &[LogKind]) -> LedgerResult<Vec<LogValue>> {
    logs.iter()
        .enumerate()
        .map(|(i, log)| match kinds.get(i).or(kinds.last()) {
            Some(kind) => decode_log(log, kind),
            None => Ok(LogValue::Bytes(log.clone())),
        })
        .collect()
}

pub fn decode_log(log: &[u8], kind: &LogKind) -> LedgerResult<LogValue> {
    match kind {
        LogKind::Uint64 => {
            let raw: [u8; 8] = log.try_into().map_err(|_| Arc4Error::Malformed {
                ty: "uint64 log".to_string(),
                reason: format!("expected 8 bytes, got {}", log.len()),
            })?;
            Ok(LogValue::Uint64(u64::from_be_bytes(raw)))
        }
        LogKind::Str => {
            let s = String::from_utf8(log.to_vec()).map_err(|_| Arc4Error::Malformed {
                ty: "string log".to_string(),
                reason: "invalid utf-8".to_string(),
            })?;
            Ok(LogValue::Str(s))
        }
        LogKind::Bytes => Ok(LogValue::Bytes(log.to_vec())),
        LogKind::Arc4(ty) => {
            let prefix = if log.starts_with(&ABI_RETURN_PREFIX) {
                DecodePrefix::Log
            } else {
                DecodePrefix::None
            };
            Ok(LogValue::Arc4(EncodedValue::decode(log, ty.clone(), prefix)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avm_emu_arc4::Arc4Value;

    #[test]
    fn test_decode_mixed_logs() {
        let ret = EncodedValue::encode(Arc4Value::from(3u64), TypeDescriptor::uint64()).unwrap();
        let logs = vec![
            7u64.to_be_bytes().to_vec(),
            b"hello".to_vec(),
            ret.to_return_log(),
        ];
        let decoded = decode_logs(
            &logs,
            &[LogKind::Uint64, LogKind::Str, LogKind::Arc4(TypeDescriptor::uint64())],
        )
        .unwrap();

        assert_eq!(decoded[0], LogValue::Uint64(7));
        assert_eq!(decoded[1], LogValue::Str("hello".to_string()));
        assert_eq!(decoded[2], LogValue::Arc4(ret));
    }

    #[test]
    fn test_last_kind_repeats() {
        let logs = vec![b"a".to_vec(), b"b".to_vec()];
        let decoded = decode_logs(&logs, &[LogKind::Str]).unwrap();
        assert_eq!(decoded[1], LogValue::Str("b".to_string()));

        let raw = decode_logs(&logs, &[]).unwrap();
        assert_eq!(raw[0], LogValue::Bytes(b"a".to_vec()));
    }

    #[test]
    fn test_bad_uint64_log() {
        assert!(decode_log(&[1, 2, 3], &LogKind::Uint64).is_err());
    }
}
