/// Languages stored for localized columns
pub const LANGUAGES: &[&str] = &["en", "ja", "zh"];

/// Column data type
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
    Integer,
    Text,
    Boolean,
    /// Localized text expands to one column per language (display_name_en, ...)
    Localized,
    /// Verbatim upstream JSON stored as text
    Json,
    /// RFC 3339 text
    Timestamp,
}

impl ColumnType {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Boolean => "INTEGER",
            ColumnType::Text | ColumnType::Localized | ColumnType::Json | ColumnType::Timestamp => {
                "TEXT"
            }
        }
    }
}

/// Column definition
#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub col_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
}

impl Column {
    /// Create an optional (nullable) column
    pub const fn new(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: true,
            unique: false,
        }
    }

    /// Create a required (non-nullable) column
    pub const fn required(name: &'static str, col_type: ColumnType) -> Self {
        Self {
            name,
            col_type,
            nullable: false,
            unique: false,
        }
    }

    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    /// Physical column names, expanding localized columns per language
    pub fn physical_names(&self) -> Vec<String> {
        match self.col_type {
            ColumnType::Localized => LANGUAGES
                .iter()
                .map(|lang| format!("{}_{}", self.name, lang))
                .collect(),
            _ => vec![self.name.to_string()],
        }
    }
}

/// Foreign key reference; child rows are deleted with their parent
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: &'static str,
    pub references_table: &'static str,
    pub references_column: &'static str,
}

impl ForeignKey {
    pub const fn new(column: &'static str, references_table: &'static str) -> Self {
        Self {
            column,
            references_table,
            references_column: "id",
        }
    }
}

/// Secondary index definition
#[derive(Debug, Clone)]
pub struct Index {
    pub columns: &'static [&'static str],
}

impl Index {
    pub const fn on(columns: &'static [&'static str]) -> Self {
        Self { columns }
    }
}

/// Table schema definition
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub primary_key: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
    /// Explicit index definitions
    pub indexes: &'static [Index],
    /// For relation tables: the column holding the owning row's id
    pub owner_column: Option<&'static str>,
}

impl TableSchema {
    /// All physical column names in declaration order
    pub fn column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .flat_map(Column::physical_names)
            .collect()
    }

    pub fn is_relation(&self) -> bool {
        self.owner_column.is_some()
    }
}
