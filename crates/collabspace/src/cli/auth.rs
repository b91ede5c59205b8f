//! Cloud session commands.

use collabspace_core::{Config, DataCenter, Result};

use super::{Cli, block_on, open_data_center, save_config};

const DEFAULT_CLOUD_SERVER: &str = "https://app.collabspace.dev";

/// Save the token, then log in and load the cloud workspaces.
pub fn handle_login(cli: &Cli, mut config: Config, token: &str, server: Option<&str>) -> Result<()> {
    let server_url = server
        .or(config.cloud_server_url.as_deref())
        .unwrap_or(DEFAULT_CLOUD_SERVER)
        .to_string();

    println!("Logging in to {}...", server_url);
    config.cloud_server_url = Some(server_url);
    config.cloud_session_token = Some(token.to_string());

    let data_center = open_data_center(&config)?;
    block_on(data_center.login(None))?;
    save_config(cli, &config)?;

    if let Some(user) = block_on(data_center.get_user_info(None))? {
        println!("Logged in as {} <{}>", user.name, user.email);
    }
    let cloud = data_center
        .workspaces()
        .workspaces()
        .into_iter()
        .filter(|meta| meta.provider == collabspace_core::CLOUD_PROVIDER_ID)
        .count();
    println!("{} cloud workspace(s) available", cloud);
    Ok(())
}

/// Log out and forget the stored token.
pub fn handle_logout(cli: &Cli, mut config: Config) -> Result<()> {
    if config.cloud_session_token.is_none() {
        println!("Not logged in.");
        return Ok(());
    }

    let data_center = DataCenter::init(&config)?;
    block_on(data_center.logout(None))?;

    config.cloud_session_token = None;
    save_config(cli, &config)?;
    println!("Logged out.");
    Ok(())
}
