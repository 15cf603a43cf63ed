use crate::cli::{Cli, OutputFormat};
use crate::commands::{build_tools, spinner, Result};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use owo_colors::OwoColorize;
use serde_json::Value;

pub async fn run(cli: &Cli, offset: u32, limit: Option<u32>) -> Result<()> {
    let tools = build_tools(cli)?;
    let spinner = spinner("Listing Drive files...".to_string());
    let page = tools.list_files(offset, limit).await;
    spinner.finish_and_clear();
    let page = page?;

    match cli.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&page)?),
        OutputFormat::Text => {
            for file in files(&page) {
                println!("{}\t{}\t{}", field(file, "id"), field(file, "name"), field(file, "mimeType"));
            }
        }
        OutputFormat::Pretty => print_table(&page),
    }
    Ok(())
}

fn files(page: &Value) -> &[Value] {
    page["data"].as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn field<'a>(file: &'a Value, key: &str) -> &'a str {
    file[key].as_str().unwrap_or("")
}

fn print_table(page: &Value) {
    let files = files(page);
    if files.is_empty() {
        println!("{}", "No files on this page.".dimmed());
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["ID", "Name", "Type", "Size", "Modified"]);

    for file in files {
        let size = file["size"]
            .as_u64()
            .map(human_size)
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            field(file, "id").to_string(),
            field(file, "name").to_string(),
            field(file, "mimeType").to_string(),
            size,
            field(file, "modifiedTime").to_string(),
        ]);
    }
    println!("{}", table);
    println!(
        "{}",
        format!(
            "{} files (offset {}, limit {})",
            page["count"], page["offset"], page["limit"]
        )
        .dimmed()
    );
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_sizes() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1536), "1.5 KB");
        assert_eq!(human_size(15 * 1024 * 1024), "15.0 MB");
    }
}
