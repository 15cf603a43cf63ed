use crate::cli::{Cli, OutputFormat};
use crate::commands::{build_tools, is_error_text, spinner, CommandError, Result};
use owo_colors::OwoColorize;
use serde_json::json;

pub async fn run(cli: &Cli, query: &str, max: Option<u32>) -> Result<()> {
    let tools = build_tools(cli)?;
    let spinner = spinner(format!("Searching Drive for {}...", query));
    let text = tools.search_files(query, max).await;
    spinner.finish_and_clear();

    if is_error_text(&text) {
        return Err(CommandError::Tool(text));
    }

    match cli.output {
        OutputFormat::Json => {
            let v = json!({ "query": query, "results": text });
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
        OutputFormat::Text => println!("{}", text),
        OutputFormat::Pretty => {
            println!("{} {}", "Query:".bold().cyan(), query.yellow());
            println!();
            for line in text.lines() {
                match line.split_once(": ") {
                    Some((key, value)) if key == "ID" || key == "Name" => {
                        println!("{} {}", format!("{}:", key).bold(), value)
                    }
                    Some((key, value)) => println!("{} {}", format!("{}:", key).dimmed(), value),
                    None => println!("{}", line.dimmed()),
                }
            }
        }
    }
    Ok(())
}
