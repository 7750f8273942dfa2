use std::fmt;

use serde::{Deserialize, Serialize};

/// The fixed table of primitive types.
///
/// Each primitive carries an intrinsic arity: `Vector`, `StringMap`,
/// `Nullable` and `TypeToken` take one type argument, everything else takes
/// none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Primitive {
    Void,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Word8,
    Word16,
    Word32,
    Word64,
    Float,
    Double,
    String,
    Bytes,
    Vector,
    StringMap,
    Nullable,
    Json,
    TypeToken,
}

impl Primitive {
    pub fn from_str(name: &str) -> Option<Primitive> {
        use Primitive::*;
        let p = match name {
            "Void" => Void,
            "Bool" => Bool,
            "Int8" => Int8,
            "Int16" => Int16,
            "Int32" => Int32,
            "Int64" => Int64,
            "Word8" => Word8,
            "Word16" => Word16,
            "Word32" => Word32,
            "Word64" => Word64,
            "Float" => Float,
            "Double" => Double,
            "String" => String,
            "Bytes" => Bytes,
            "Vector" => Vector,
            "StringMap" => StringMap,
            "Nullable" => Nullable,
            "Json" => Json,
            "TypeToken" => TypeToken,
            _ => return None,
        };
        Some(p)
    }

    pub fn as_str(&self) -> &'static str {
        use Primitive::*;
        match self {
            Void => "Void",
            Bool => "Bool",
            Int8 => "Int8",
            Int16 => "Int16",
            Int32 => "Int32",
            Int64 => "Int64",
            Word8 => "Word8",
            Word16 => "Word16",
            Word32 => "Word32",
            Word64 => "Word64",
            Float => "Float",
            Double => "Double",
            String => "String",
            Bytes => "Bytes",
            Vector => "Vector",
            StringMap => "StringMap",
            Nullable => "Nullable",
            Json => "Json",
            TypeToken => "TypeToken",
        }
    }

    /// Number of type arguments the primitive expects.
    pub fn arity(&self) -> usize {
        use Primitive::*;
        match self {
            Vector | StringMap | Nullable | TypeToken => 1,
            _ => 0,
        }
    }

    /// Inclusive bounds for the integral primitives, as (min, max) pairs
    /// wide enough to hold every representable value.
    pub fn integer_bounds(&self) -> Option<(i128, i128)> {
        use Primitive::*;
        let bounds = match self {
            Int8 => (i8::MIN as i128, i8::MAX as i128),
            Int16 => (i16::MIN as i128, i16::MAX as i128),
            Int32 => (i32::MIN as i128, i32::MAX as i128),
            Int64 => (i64::MIN as i128, i64::MAX as i128),
            Word8 => (0, u8::MAX as i128),
            Word16 => (0, u16::MAX as i128),
            Word32 => (0, u32::MAX as i128),
            Word64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(bounds)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Primitive> for String {
    fn from(p: Primitive) -> String {
        p.as_str().to_string()
    }
}

impl TryFrom<String> for Primitive {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Primitive::from_str(&s).ok_or_else(|| format!("unknown primitive type '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_name() {
        for name in [
            "Void",
            "Bool",
            "Int8",
            "Int16",
            "Int32",
            "Int64",
            "Word8",
            "Word16",
            "Word32",
            "Word64",
            "Float",
            "Double",
            "String",
            "Bytes",
            "Vector",
            "StringMap",
            "Nullable",
            "Json",
            "TypeToken",
        ] {
            let p = Primitive::from_str(name).unwrap();
            assert_eq!(p.as_str(), name);
        }
        assert!(Primitive::from_str("Int128").is_none());
    }

    #[test]
    fn arities() {
        assert_eq!(Primitive::Bool.arity(), 0);
        assert_eq!(Primitive::Vector.arity(), 1);
        assert_eq!(Primitive::StringMap.arity(), 1);
        assert_eq!(Primitive::Nullable.arity(), 1);
        assert_eq!(Primitive::TypeToken.arity(), 1);
    }
}
