use crate::schema::TableSchema;

/// Generate CREATE TABLE SQL for a table schema
pub fn generate_create_table(schema: &TableSchema) -> String {
    let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (\n", schema.name);
    let mut columns = Vec::new();

    for col in schema.columns {
        // Expand localized columns to per-language columns
        for name in col.physical_names() {
            let null_constraint = if !col.nullable { " NOT NULL" } else { "" };
            let unique = if col.unique { " UNIQUE" } else { "" };
            columns.push(format!(
                "    {} {}{}{}",
                name,
                col.col_type.sql_type(),
                null_constraint,
                unique
            ));
        }
    }

    columns.push(format!("    PRIMARY KEY ({})", schema.primary_key.join(", ")));

    for fk in schema.foreign_keys {
        columns.push(format!(
            "    FOREIGN KEY ({}) REFERENCES {}({}) ON DELETE CASCADE",
            fk.column, fk.references_table, fk.references_column
        ));
    }

    sql.push_str(&columns.join(",\n"));
    sql.push_str("\n)");

    sql
}

/// Generate CREATE INDEX statements for the declared indexes
pub fn generate_indexes(schema: &TableSchema) -> Vec<String> {
    schema
        .indexes
        .iter()
        .map(|index| {
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{}_{} ON {}({})",
                schema.name,
                index.columns.join("_"),
                schema.name,
                index.columns.join(", ")
            )
        })
        .collect()
}

/// INSERT statement covering every column of `schema`
pub fn generate_insert(schema: &TableSchema, conflict: &str) -> String {
    let columns = schema.column_names();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let verb = if conflict.is_empty() {
        "INSERT".to_string()
    } else {
        format!("INSERT {}", conflict)
    };
    format!(
        "{} INTO {} ({}) VALUES ({})",
        verb,
        schema.name,
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Upsert keyed on the primary key: new values overwrite every other column
pub fn generate_upsert(schema: &TableSchema) -> String {
    let updates: Vec<String> = schema
        .column_names()
        .into_iter()
        .filter(|c| !schema.primary_key.contains(&c.as_str()))
        .map(|c| format!("{c}=excluded.{c}"))
        .collect();
    format!(
        "{} ON CONFLICT({}) DO UPDATE SET {}",
        generate_insert(schema, ""),
        schema.primary_key.join(", "),
        updates.join(", ")
    )
}
