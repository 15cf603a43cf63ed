use crate::cli::{Cli, OutputFormat};
use crate::commands::{build_tools, is_error_text, spinner, CommandError, Result};
use owo_colors::OwoColorize;
use serde_json::json;

pub async fn run(cli: &Cli, id: Option<&str>, name: Option<&str>) -> Result<()> {
    let tools = build_tools(cli)?;
    let target = id.or(name).unwrap_or_default();
    let spinner = spinner(format!("Reading {}...", target));
    let text = tools.read_file(id, name).await;
    spinner.finish_and_clear();

    if is_error_text(&text) {
        return Err(CommandError::Tool(text));
    }

    match cli.output {
        OutputFormat::Json => {
            let v = json!({ "file_id": id, "file_name": name, "text": text });
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
        OutputFormat::Text => println!("{}", text),
        OutputFormat::Pretty => {
            println!("{} {}", "File:".bold().cyan(), target.yellow());
            println!();
            println!("{}", text);
        }
    }
    Ok(())
}
