// ============================================================================
// Enum Code Tables
// ============================================================================
//
// Closed, bidirectional mappings between domain enumerations and the compact
// codes used on the wire. Decoding can fail, encoding cannot.
//
// ============================================================================

use crate::core::{Result, SyncError};

pub trait CodeTable: Sized + Copy + 'static {
    /// Wire field name reported when a code is rejected.
    const FIELD: &'static str;

    fn code(self) -> &'static str;

    fn from_code(code: &str) -> Option<Self>;

    fn variants() -> &'static [Self];

    fn decode(code: &str) -> Result<Self> {
        Self::decode_field(Self::FIELD, code)
    }

    fn decode_field(field: &str, code: &str) -> Result<Self> {
        Self::from_code(code).ok_or_else(|| SyncError::unknown_code(field, code))
    }
}

macro_rules! code_table {
    (
        $(#[$meta:meta])*
        $name:ident, field = $field:literal,
        { $($variant:ident => $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $crate::codec::tables::CodeTable for $name {
            const FIELD: &'static str = $field;

            fn code(self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }

            fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some(Self::$variant),)+
                    _ => None,
                }
            }

            fn variants() -> &'static [Self] {
                &[$(Self::$variant),+]
            }
        }
    };
}

pub(crate) use code_table;
