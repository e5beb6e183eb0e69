use std::fmt::Display;

/// Storage type of a column as declared by the table schema.
///
/// DECIMAL32/DECIMAL64 and DATETIME are stored as scaled/epoch integers;
/// conditions against them are collapsed to that integer form at compile time.
#[derive(PartialEq, Eq, PartialOrd, Ord, Debug, Clone, Copy)]
pub enum DbType {
    BOOL,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    DECIMAL32,
    DECIMAL64,
    DATETIME,
    BYTES,
    STRING,
}

/// Canonical comparison class a storage type widens to. All per-row
/// evaluation runs in one of these classes so comparison loops exist
/// once per class instead of once per storage type.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum TypeClass {
    Bool,
    Int,
    Uint,
    Float,
    Bytes,
    Str,
}

impl Display for DbType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("{:?}", self))
    }
}

impl DbType {
    pub fn to_byte(&self) -> u8 {
        match self {
            DbType::BOOL => 1,
            DbType::I8 => 2,
            DbType::I16 => 3,
            DbType::I32 => 4,
            DbType::I64 => 5,
            DbType::U8 => 6,
            DbType::U16 => 7,
            DbType::U32 => 8,
            DbType::U64 => 9,
            DbType::F32 => 10,
            DbType::F64 => 11,
            DbType::DECIMAL32 => 12,
            DbType::DECIMAL64 => 13,
            DbType::DATETIME => 14,
            DbType::BYTES => 15,
            DbType::STRING => 16,
        }
    }

    #[track_caller]
    pub fn from_byte(byte: u8) -> DbType {
        match byte {
            1 => DbType::BOOL,
            2 => DbType::I8,
            3 => DbType::I16,
            4 => DbType::I32,
            5 => DbType::I64,
            6 => DbType::U8,
            7 => DbType::U16,
            8 => DbType::U32,
            9 => DbType::U64,
            10 => DbType::F32,
            11 => DbType::F64,
            12 => DbType::DECIMAL32,
            13 => DbType::DECIMAL64,
            14 => DbType::DATETIME,
            15 => DbType::BYTES,
            16 => DbType::STRING,
            _ => panic!("Invalid byte type: {}", byte),
        }
    }

    #[inline]
    pub fn class(&self) -> TypeClass {
        match self {
            DbType::BOOL => TypeClass::Bool,
            DbType::I8 | DbType::I16 | DbType::I32 | DbType::I64 => TypeClass::Int,
            DbType::DECIMAL32 | DbType::DECIMAL64 | DbType::DATETIME => TypeClass::Int,
            DbType::U8 | DbType::U16 | DbType::U32 | DbType::U64 => TypeClass::Uint,
            DbType::F32 | DbType::F64 => TypeClass::Float,
            DbType::BYTES => TypeClass::Bytes,
            DbType::STRING => TypeClass::Str,
        }
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        *self == DbType::STRING
    }
}
