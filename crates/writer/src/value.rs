//! CQL values and their native serialization
//!
//! Values are encoded exactly as the database expects them inside a bound
//! statement: fixed-width big-endian numbers, raw UTF-8 for text, 16 raw
//! bytes for UUIDs. The same encoding feeds partition routing keys, so it
//! must stay byte-for-byte stable.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::schema::CqlType;

/// A single column value
#[derive(Debug, Clone, PartialEq)]
pub enum CqlValue {
    Null,
    Boolean(bool),
    Int(i32),
    BigInt(i64),
    /// Counter delta
    Counter(i64),
    Float(f32),
    Double(f64),
    Text(String),
    Blob(Bytes),
    Uuid(Uuid),
    /// Milliseconds since the Unix epoch
    Timestamp(i64),
}

impl CqlValue {
    /// Whether this is the null value
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Int(_) => "int",
            Self::BigInt(_) => "bigint",
            Self::Counter(_) => "counter",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
            Self::Uuid(_) => "uuid",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// Whether the value can be bound to a column of type `ty`
    ///
    /// Null fits every type. Counter columns also take plain bigint deltas.
    pub fn fits(&self, ty: CqlType) -> bool {
        matches!(
            (self, ty),
            (Self::Null, _)
                | (Self::Boolean(_), CqlType::Boolean)
                | (Self::Int(_), CqlType::Int)
                | (Self::BigInt(_), CqlType::BigInt)
                | (Self::BigInt(_) | Self::Counter(_), CqlType::Counter)
                | (Self::Float(_), CqlType::Float)
                | (Self::Double(_), CqlType::Double)
                | (Self::Text(_), CqlType::Text)
                | (Self::Blob(_), CqlType::Blob)
                | (Self::Uuid(_), CqlType::Uuid)
                | (Self::Timestamp(_), CqlType::Timestamp)
        )
    }

    /// Length of the native encoding; zero for null
    pub fn serialized_len(&self) -> usize {
        match self {
            Self::Null => 0,
            Self::Boolean(_) => 1,
            Self::Int(_) | Self::Float(_) => 4,
            Self::BigInt(_) | Self::Counter(_) | Self::Double(_) | Self::Timestamp(_) => 8,
            Self::Text(s) => s.len(),
            Self::Blob(b) => b.len(),
            Self::Uuid(_) => 16,
        }
    }

    /// Append the native encoding to `buf`; null appends nothing
    pub fn write_to(&self, buf: &mut BytesMut) {
        match self {
            Self::Null => {}
            Self::Boolean(v) => buf.put_u8(u8::from(*v)),
            Self::Int(v) => buf.put_i32(*v),
            Self::BigInt(v) | Self::Counter(v) | Self::Timestamp(v) => buf.put_i64(*v),
            Self::Float(v) => buf.put_f32(*v),
            Self::Double(v) => buf.put_f64(*v),
            Self::Text(s) => buf.put_slice(s.as_bytes()),
            Self::Blob(b) => buf.put_slice(b),
            Self::Uuid(u) => buf.put_slice(u.as_bytes()),
        }
    }

    /// Native encoding as an owned buffer, `None` for null
    pub fn to_bytes(&self) -> Option<Bytes> {
        if self.is_null() {
            return None;
        }
        let mut buf = BytesMut::with_capacity(self.serialized_len());
        self.write_to(&mut buf);
        Some(buf.freeze())
    }
}

impl From<bool> for CqlValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<i32> for CqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for CqlValue {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<f64> for CqlValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for CqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for CqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Uuid> for CqlValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<Bytes> for CqlValue {
    fn from(v: Bytes) -> Self {
        Self::Blob(v)
    }
}

impl From<Vec<u8>> for CqlValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(Bytes::from(v))
    }
}

impl<T: Into<CqlValue>> From<Option<T>> for CqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A bind slot that is either set (possibly to null) or left untouched
#[derive(Debug, Clone, PartialEq)]
pub enum MaybeUnset<V> {
    /// Column is not written
    Unset,
    /// Column is written with this value
    Set(V),
}

impl MaybeUnset<CqlValue> {
    /// Value if set and non-null
    pub fn value(&self) -> Option<&CqlValue> {
        match self {
            Self::Set(v) if !v.is_null() => Some(v),
            _ => None,
        }
    }

    /// Estimated payload size of this slot
    pub fn serialized_len(&self) -> usize {
        match self {
            Self::Unset => 0,
            Self::Set(v) => v.serialized_len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_encoding() {
        assert_eq!(CqlValue::Int(1).to_bytes().unwrap().as_ref(), &[0, 0, 0, 1]);
        assert_eq!(
            CqlValue::BigInt(-1).to_bytes().unwrap().as_ref(),
            &[0xff; 8]
        );
        assert_eq!(CqlValue::Boolean(true).to_bytes().unwrap().as_ref(), &[1]);
    }

    #[test]
    fn test_variable_width_encoding() {
        let text = CqlValue::from("héllo");
        assert_eq!(text.serialized_len(), "héllo".len());
        assert_eq!(text.to_bytes().unwrap().as_ref(), "héllo".as_bytes());

        let id = Uuid::from_u128(0x0102_0304_0506_0708_090a_0b0c_0d0e_0f10);
        assert_eq!(CqlValue::Uuid(id).to_bytes().unwrap().as_ref(), id.as_bytes());
    }

    #[test]
    fn test_null_has_no_bytes() {
        assert!(CqlValue::Null.to_bytes().is_none());
        assert_eq!(CqlValue::Null.serialized_len(), 0);
        assert_eq!(CqlValue::from(None::<i32>), CqlValue::Null);
    }

    #[test]
    fn test_fits() {
        assert!(CqlValue::Null.fits(CqlType::Uuid));
        assert!(CqlValue::BigInt(5).fits(CqlType::Counter));
        assert!(CqlValue::Counter(5).fits(CqlType::Counter));
        assert!(!CqlValue::Int(5).fits(CqlType::BigInt));
        assert!(!CqlValue::from("5").fits(CqlType::Int));
    }

    #[test]
    fn test_maybe_unset() {
        let unset: MaybeUnset<CqlValue> = MaybeUnset::Unset;
        assert_eq!(unset.serialized_len(), 0);
        assert!(unset.value().is_none());
        assert!(MaybeUnset::Set(CqlValue::Null).value().is_none());
        assert_eq!(
            MaybeUnset::Set(CqlValue::Int(3)).value(),
            Some(&CqlValue::Int(3))
        );
    }
}
