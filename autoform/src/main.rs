use anyhow::Context;
use autoform::config::EngineSettings;
use autoform::script::Script;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn load_env_file() {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(error = %e, "Could not determine current directory for .env lookup");
            return;
        }
    };

    let mut current = cwd.clone();
    loop {
        let candidate = current.join(".env");
        if candidate.exists() {
            match dotenvy::from_path(&candidate) {
                Ok(_) => {
                    tracing::info!(path = %candidate.display(), "Loaded environment from .env");
                }
                Err(e) => {
                    tracing::warn!(
                        path = %candidate.display(),
                        error = %e,
                        "Failed to load .env file"
                    );
                }
            }
            return;
        }

        if !current.pop() {
            break;
        }
    }

    tracing::debug!(cwd = %cwd.display(), "No .env file found; using process environment only");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    load_env_file();
    let settings = EngineSettings::from_env();

    let script_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: autoform <script.json>")?;
    let script = Script::load(&script_path)?;

    tracing::info!(
        script = %script_path.display(),
        steps = script.steps.len(),
        locale = %settings.locale,
        "Replaying form script"
    );
    let report = script.run(&settings).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
