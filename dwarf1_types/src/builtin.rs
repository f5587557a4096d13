use serde_derive::{Deserialize, Serialize};

/* Fundamental types known to the encoder. The discriminants are the negative
   codes stored in a tag's type reference. */
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum BuiltinType {
    Bool = -1,

    Char = -2,
    SignedChar = -3,
    UnsignedChar = -4,

    Short = -5,
    SignedShort = -6,
    UnsignedShort = -7,

    Int = -8,
    SignedInt = -9,
    UnsignedInt = -10,

    Long = -11,
    SignedLong = -12,
    UnsignedLong = -13,

    Float = -14,
    DoublePrecFloat = -15,
    ExtPrecFloat = -16,

    Double = -17,
    DoublePrecDouble = -18,
    ExtPrecDouble = -19,

    Void = -20,
    Pointer = -21,

    /* Emitted when the encoder dropped the type entirely */
    Unknown = -23,
}

const ALL: [BuiltinType; 22] = [
    BuiltinType::Bool,
    BuiltinType::Char,
    BuiltinType::SignedChar,
    BuiltinType::UnsignedChar,
    BuiltinType::Short,
    BuiltinType::SignedShort,
    BuiltinType::UnsignedShort,
    BuiltinType::Int,
    BuiltinType::SignedInt,
    BuiltinType::UnsignedInt,
    BuiltinType::Long,
    BuiltinType::SignedLong,
    BuiltinType::UnsignedLong,
    BuiltinType::Float,
    BuiltinType::DoublePrecFloat,
    BuiltinType::ExtPrecFloat,
    BuiltinType::Double,
    BuiltinType::DoublePrecDouble,
    BuiltinType::ExtPrecDouble,
    BuiltinType::Void,
    BuiltinType::Pointer,
    BuiltinType::Unknown,
];

impl BuiltinType {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<BuiltinType> {
        ALL.iter().copied().find(|b| b.code() == code)
    }

    /* Map an `FT_*` token from the dump onto a builtin */
    pub fn from_fundamental(token: &str) -> Option<BuiltinType> {
        let builtin = match token {
            "FT_boolean" => BuiltinType::Bool,
            "FT_char" => BuiltinType::Char,
            "FT_signed_char" => BuiltinType::SignedChar,
            "FT_unsigned_char" => BuiltinType::UnsignedChar,
            "FT_short" => BuiltinType::Short,
            "FT_signed_short" => BuiltinType::SignedShort,
            "FT_unsigned_short" => BuiltinType::UnsignedShort,
            "FT_integer" => BuiltinType::Int,
            "FT_signed_integer" => BuiltinType::SignedInt,
            "FT_unsigned_integer" => BuiltinType::UnsignedInt,
            "FT_long" => BuiltinType::Long,
            "FT_signed_long" => BuiltinType::SignedLong,
            "FT_unsigned_long" => BuiltinType::UnsignedLong,
            "FT_float" => BuiltinType::Float,
            "FT_dbl_prec_float" => BuiltinType::DoublePrecFloat,
            "FT_ext_prec_float" => BuiltinType::ExtPrecFloat,
            "FT_complex" => BuiltinType::Double,
            "FT_dbl_prec_complex" => BuiltinType::DoublePrecDouble,
            "FT_ext_prec_complex" => BuiltinType::ExtPrecDouble,
            "FT_void" => BuiltinType::Void,
            "FT_pointer" => BuiltinType::Pointer,
            _ => return None,
        };
        Some(builtin)
    }

    /* C spelling of the type, without trailing whitespace */
    pub fn keyword(self) -> &'static str {
        match self {
            BuiltinType::Bool => "bool",
            BuiltinType::Char => "char",
            BuiltinType::SignedChar => "signed char",
            BuiltinType::UnsignedChar => "unsigned char",
            BuiltinType::Short => "short",
            BuiltinType::SignedShort => "signed short",
            BuiltinType::UnsignedShort => "unsigned short",
            BuiltinType::Int => "int",
            BuiltinType::SignedInt => "signed int",
            BuiltinType::UnsignedInt => "unsigned int",
            BuiltinType::Long => "long",
            BuiltinType::SignedLong => "signed long",
            BuiltinType::UnsignedLong => "unsigned long",
            BuiltinType::Float => "float",
            BuiltinType::DoublePrecFloat => "long float",
            BuiltinType::ExtPrecFloat => "long long float",
            BuiltinType::Double => "double",
            BuiltinType::DoublePrecDouble => "long double",
            BuiltinType::ExtPrecDouble => "long long double",
            BuiltinType::Void => "void",
            BuiltinType::Pointer => "void *",
            BuiltinType::Unknown => "UnknownType",
        }
    }

    /* Byte size on the target (32-bit, big-endian PowerPC) */
    pub fn size(self) -> i32 {
        match self {
            BuiltinType::Bool
            | BuiltinType::Char
            | BuiltinType::SignedChar
            | BuiltinType::UnsignedChar => 1,
            BuiltinType::Short | BuiltinType::SignedShort | BuiltinType::UnsignedShort => 2,
            BuiltinType::Int
            | BuiltinType::SignedInt
            | BuiltinType::UnsignedInt
            | BuiltinType::Long
            | BuiltinType::SignedLong
            | BuiltinType::UnsignedLong
            | BuiltinType::Float
            | BuiltinType::Pointer => 4,
            BuiltinType::DoublePrecFloat | BuiltinType::Double => 8,
            BuiltinType::ExtPrecFloat | BuiltinType::DoublePrecDouble => 12,
            BuiltinType::ExtPrecDouble => 16,
            BuiltinType::Void => 0,
            BuiltinType::Unknown => -1,
        }
    }

    /* The raw pointer keyword already ends in a glyph and takes no separator */
    pub fn ends_in_glyph(self) -> bool {
        self.keyword().ends_with('*')
    }
}
