/// Materialized values of one column inside one pack, in row order.
///
/// Decimal and datetime columns appear here as their integer storage form
/// (I32/I64); the compiler collapses condition operands the same way, so
/// evaluation never sees a decimal point.
#[derive(Debug, Clone)]
pub enum ColumnValues {
    Bool(Vec<bool>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Bytes(Vec<Vec<u8>>),
    Str(Vec<String>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Bool(v) => v.len(),
            ColumnValues::I8(v) => v.len(),
            ColumnValues::I16(v) => v.len(),
            ColumnValues::I32(v) => v.len(),
            ColumnValues::I64(v) => v.len(),
            ColumnValues::U8(v) => v.len(),
            ColumnValues::U16(v) => v.len(),
            ColumnValues::U32(v) => v.len(),
            ColumnValues::U64(v) => v.len(),
            ColumnValues::F32(v) => v.len(),
            ColumnValues::F64(v) => v.len(),
            ColumnValues::Bytes(v) => v.len(),
            ColumnValues::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One pack column handed to the row matcher by the column accessor.
///
/// `sorted` is true for primary-key columns of flushed packs, which are
/// stored in ascending order; the journal (most recent unflushed) pack is
/// never sorted.
#[derive(Debug, Clone)]
pub struct Column {
    pub values: ColumnValues,
    pub sorted: bool,
}

impl Column {
    pub fn new(values: impl Into<ColumnValues>) -> Self {
        Column {
            values: values.into(),
            sorted: false,
        }
    }

    pub fn new_sorted(values: impl Into<ColumnValues>) -> Self {
        Column {
            values: values.into(),
            sorted: true,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

macro_rules! column_from_vec {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$t>> for ColumnValues {
                fn from(v: Vec<$t>) -> Self {
                    ColumnValues::$variant(v)
                }
            }
        )*
    };
}

column_from_vec! {
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Vec<u8> => Bytes,
    String => Str,
}

impl From<Vec<&str>> for ColumnValues {
    fn from(v: Vec<&str>) -> Self {
        ColumnValues::Str(v.into_iter().map(|s| s.to_string()).collect())
    }
}
