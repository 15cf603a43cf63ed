use crate::cli::{AuthAction, Cli, OutputFormat};
use crate::commands::{spinner, CommandError, Result};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use drivelens_core::auth::AuthDetails;
use drivelens_core::auth_store::{AuthStore, FileAuthStore};
use drivelens_core::oauth::{self, DRIVE_READONLY_SCOPE};
use drivelens_core::token::{ACCESS_TOKEN_ENV, STORE_KEYS};
use owo_colors::OwoColorize;
use serde_json::json;

pub async fn run(cli: &Cli, action: &AuthAction) -> Result<()> {
    match action {
        AuthAction::Start { client_id, scopes } => start(cli, client_id, scopes.as_deref()).await,
        AuthAction::Poll {
            client_id,
            client_secret,
            ask_secret,
            device_code,
        } => {
            let secret = if *ask_secret {
                Some(rpassword::prompt_password("Client secret: ")?)
            } else {
                client_secret.clone()
            };
            poll(cli, client_id, secret, device_code).await
        }
        AuthAction::Status => status(cli),
    }
}

async fn start(cli: &Cli, client_id: &str, scopes: Option<&str>) -> Result<()> {
    let scopes = scopes.unwrap_or(DRIVE_READONLY_SCOPE);
    let spinner = spinner("Requesting device code...".to_string());
    let started = oauth::google_device_authorize(client_id, scopes).await;
    spinner.finish_and_clear();
    let started = started?;

    if cli.output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&started)?);
        return Ok(());
    }

    let url = started
        .verification_uri_complete
        .as_deref()
        .unwrap_or(&started.verification_uri);
    println!("{}", "Google device authorization".bold().cyan());
    println!("  Visit:       {}", url.yellow());
    println!("  Enter code:  {}", started.user_code.bold());
    println!("  Expires in:  {}s", started.expires_in);
    println!();
    println!(
        "Then run: {}",
        format!(
            "drivelens auth poll --client-id {} --device-code {}",
            client_id, started.device_code
        )
        .dimmed()
    );
    Ok(())
}

async fn poll(
    cli: &Cli,
    client_id: &str,
    client_secret: Option<String>,
    device_code: &str,
) -> Result<()> {
    let spinner = spinner("Waiting for token...".to_string());
    let tokens = oauth::google_device_poll(client_id, client_secret.as_deref(), device_code).await;
    spinner.finish_and_clear();
    let tokens = tokens?;
    if tokens.access_token.is_empty() {
        return Err(CommandError::Tool(
            "Error: Google returned no access token; has the code been approved?".to_string(),
        ));
    }

    let mut details = AuthDetails::new();
    details.insert("client_id".to_string(), client_id.to_string());
    if let Some(secret) = client_secret.filter(|s| !s.is_empty()) {
        details.insert("client_secret".to_string(), secret);
    }
    let details = oauth::apply_tokens(details, &tokens);

    let store = FileAuthStore::new_default();
    for key in STORE_KEYS {
        store.save(key, &details)?;
    }

    if cli.output == OutputFormat::Json {
        let v = json!({
            "stored": true,
            "path": store.path().display().to_string(),
            "has_refresh_token": tokens.refresh_token.is_some(),
            "expires_in": tokens.expires_in,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
    } else {
        println!(
            "{} Credentials saved to {}",
            "✓".green(),
            store.path().display()
        );
    }
    Ok(())
}

struct KeyStatus {
    key: &'static str,
    present: bool,
    unexpired: bool,
    refreshable: bool,
}

fn status(cli: &Cli) -> Result<()> {
    let store = FileAuthStore::new_default();
    let rows: Vec<KeyStatus> = STORE_KEYS
        .iter()
        .map(|&key| {
            let auth = store.load(key).unwrap_or_default();
            KeyStatus {
                key,
                present: auth.get("access_token").is_some_and(|t| !t.is_empty()),
                unexpired: oauth::unexpired_access_token(&auth).is_some(),
                refreshable: auth.contains_key("refresh_token"),
            }
        })
        .collect();
    let env_token = std::env::var(ACCESS_TOKEN_ENV).is_ok_and(|t| !t.is_empty());

    if cli.output == OutputFormat::Json {
        let keys: Vec<_> = rows
            .iter()
            .map(|r| {
                json!({
                    "key": r.key,
                    "access_token": r.present,
                    "unexpired": r.unexpired,
                    "refresh_token": r.refreshable,
                })
            })
            .collect();
        let v = json!({
            "path": store.path().display().to_string(),
            "env_token": env_token,
            "keys": keys,
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Store key", "Access token", "Unexpired", "Refresh token"]);
    for r in &rows {
        table.add_row(vec![r.key, yes_no(r.present), yes_no(r.unexpired), yes_no(r.refreshable)]);
    }
    println!("{}", table);
    println!("Store: {}", store.path().display().to_string().dimmed());
    if env_token {
        println!(
            "{} {} is set and takes precedence",
            "!".yellow(),
            ACCESS_TOKEN_ENV
        );
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
