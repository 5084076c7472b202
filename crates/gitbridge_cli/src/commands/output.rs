use clap::ValueEnum;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

/// Output format for listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Render rows as a rounded table.
pub(crate) fn render_table<T: Tabled>(rows: Vec<T>) -> String {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

/// Print `rows` as a table, or `json` as pretty JSON.
pub(crate) fn print_rows<T: Tabled, J: Serialize + ?Sized>(
    rows: Vec<T>,
    json: &J,
    format: OutputFormat,
    empty_message: &str,
) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Table if rows.is_empty() => println!("{}", empty_message),
        OutputFormat::Table => println!("{}", render_table(rows)),
        OutputFormat::Json => print_json(json)?,
    }
    Ok(())
}

pub(crate) fn print_json<J: Serialize + ?Sized>(value: &J) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `-` for missing values.
pub(crate) fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}
