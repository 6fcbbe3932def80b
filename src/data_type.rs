/// Represents the supported semantic column types.
/// These types define the structure of columns and the expected format of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// An 8-bit signed integer.
    Int8,
    /// A 16-bit signed integer.
    Int16,
    /// A 32-bit signed integer.
    Int32,
    /// A 64-bit signed integer.
    Int64,
    /// An 8-bit unsigned integer.
    UInt8,
    /// A 16-bit unsigned integer.
    UInt16,
    /// A 32-bit unsigned integer.
    UInt32,
    /// A 64-bit unsigned integer.
    UInt64,
    /// A 32-bit floating-point number.
    Float32,
    /// A 64-bit floating-point number.
    Float64,
    /// A boolean value (true or false).
    Bool,
    /// A bounded label set stored as integer codes plus a dictionary.
    Categorical,
    /// A variable-length UTF-8 character string. Not key-eligible.
    Str,
    /// An opaque user-defined scalar packed into 64 bits, ordered by its
    /// bit pattern. The extensibility hook for custom fixed-size types.
    Fixed,
}

impl DataType {
    /// Whether columns of this type may participate in a comparison key.
    /// Everything is key-eligible except variable-length strings.
    pub fn is_key_eligible(self) -> bool {
        !matches!(self, Self::Str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_eligibility() {
        assert!(DataType::Int8.is_key_eligible());
        assert!(DataType::Float64.is_key_eligible());
        assert!(DataType::Bool.is_key_eligible());
        assert!(DataType::Categorical.is_key_eligible());
        assert!(DataType::Fixed.is_key_eligible());
        assert!(!DataType::Str.is_key_eligible());
    }
}
