use std::path::Path;

use classkit_classroom::auth::CLASSROOM_SCOPES;
use classkit_core::config::ClasskitConfig;
use tracing::info;

/// Run the `init` command: write a default configuration file.
pub async fn run(config_path: &str, force: bool) -> anyhow::Result<()> {
    let path = Path::new(config_path);
    if path.exists() && !force {
        anyhow::bail!("{config_path} already exists. Use --force to overwrite it.");
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let config = ClasskitConfig::generate_default();
    std::fs::write(path, config.to_toml()?)?;
    info!("Wrote configuration to {}", path.display());

    println!("classkit initialized!");
    println!("  Configuration: {}", path.display());
    println!("  Token file:    {}", config.auth.token_file);
    println!();
    println!("Authorize an OAuth client for these scopes and save the authorized-user");
    println!("JSON (token, refresh_token, client_id, client_secret) to the token file:");
    for scope in CLASSROOM_SCOPES {
        println!("  {scope}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("classkit.toml");
        let path_str = path.to_string_lossy().to_string();

        run(&path_str, false).await.unwrap();

        let config = ClasskitConfig::load(&path).unwrap();
        assert_eq!(config.classroom.base_url, "https://classroom.googleapis.com");
        assert_eq!(config.auth.token_file, "token.json");
    }

    #[tokio::test]
    async fn init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classkit.toml");
        std::fs::write(&path, "# mine\n").unwrap();
        let path_str = path.to_string_lossy().to_string();

        let err = run(&path_str, false).await.unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");

        run(&path_str, true).await.unwrap();
        assert!(ClasskitConfig::load(&path).is_ok());
    }
}
