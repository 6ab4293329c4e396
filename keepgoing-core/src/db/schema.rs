pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS habits (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    daysChecked TEXT NOT NULL,
    streak INTEGER NOT NULL DEFAULT 0
);
"#;
