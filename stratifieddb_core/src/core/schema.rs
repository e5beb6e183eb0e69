use super::db_type::DbType;

/// Column descriptor consumed by the predicate compiler.
///
/// `index` is the position of the column's block inside every pack and
/// every pack's statistics list. `scale` is the fractional digit count
/// for decimal fields and zero otherwise. `bloom` marks fields whose
/// stat blocks carry a probabilistic membership filter, which makes the
/// compiler precompute filter hashes for all condition operands.
#[derive(Debug, Clone)]
pub struct FieldDesc {
    pub name: String,
    pub db_type: DbType,
    pub index: usize,
    pub scale: u8,
    pub is_primary: bool,
    pub bloom: bool,
}

impl FieldDesc {
    pub fn new(name: &str, db_type: DbType, index: usize) -> Self {
        FieldDesc {
            name: name.to_string(),
            db_type,
            index,
            scale: 0,
            is_primary: false,
            bloom: false,
        }
    }

    /// Marks this field as the table's primary key. Primary-key columns are
    /// stored in ascending order in flushed packs, which unlocks the
    /// merge-join membership path in the row matcher.
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn with_scale(mut self, scale: u8) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_bloom(mut self) -> Self {
        self.bloom = true;
        self
    }
}
