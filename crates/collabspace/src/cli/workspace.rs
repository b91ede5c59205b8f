//! Workspace command handlers

use std::path::Path;

use collabspace_core::{DataCenter, Result, WorkspaceMeta, WorkspaceMetaPatch};

use super::block_on;

pub fn handle_list(data_center: &DataCenter, json: bool) -> Result<()> {
    let workspaces = data_center.workspaces().workspaces();
    if json {
        println!("{}", serde_json::to_string_pretty(&workspaces)?);
        return Ok(());
    }
    if workspaces.is_empty() {
        println!("No workspaces. Create one with `collabspace create <NAME>`.");
        return Ok(());
    }
    for meta in &workspaces {
        print_meta(meta);
    }
    Ok(())
}

fn print_meta(meta: &WorkspaceMeta) {
    let public = if meta.is_publish { " (public)" } else { "" };
    println!("{:<38} {:<6} {}{}", meta.id, meta.provider, meta.name, public);
}

pub fn handle_create(data_center: &DataCenter, name: &str, avatar: Option<&str>) -> Result<()> {
    let mut patch = WorkspaceMetaPatch::named(name);
    patch.avatar = avatar.map(str::to_string);

    let workspace = block_on(data_center.create_workspace(&patch))?;
    if let Some(meta) = data_center.workspaces().find(workspace.room()) {
        print_meta(&meta);
    }
    Ok(())
}

pub fn handle_delete(data_center: &DataCenter, id: &str) -> Result<()> {
    block_on(data_center.delete_workspace(id))?;
    println!("Deleted {}", id);
    Ok(())
}

pub fn handle_publish(data_center: &DataCenter, id: &str, is_publish: bool) -> Result<()> {
    block_on(data_center.set_workspace_publish(id, is_publish))?;
    println!(
        "{} is now {}",
        id,
        if is_publish { "public" } else { "private" }
    );
    Ok(())
}

pub fn handle_rename(data_center: &DataCenter, id: &str, name: &str) -> Result<()> {
    let workspace = block_on(data_center.load_workspace(id))?;
    let result = block_on(
        data_center.update_workspace_meta(&WorkspaceMetaPatch::named(name), &workspace),
    );
    block_on(data_center.close_workspace(id))?;
    result?;
    println!("Renamed {} to {}", id, name);
    Ok(())
}

pub fn handle_enable_cloud(data_center: &DataCenter, id: &str) -> Result<()> {
    let workspace = block_on(data_center.load_workspace(id))?;
    match block_on(data_center.enable_workspace_cloud(&workspace)) {
        Ok(Some(moved)) => {
            println!("Moved {} to the cloud as {}", id, moved.room());
            block_on(data_center.close_workspace(moved.room()))
        }
        Ok(None) => {
            println!("{} is already in the cloud", id);
            block_on(data_center.close_workspace(id))
        }
        Err(e) => {
            block_on(data_center.close_workspace(id))?;
            Err(e)
        }
    }
}

pub fn handle_export(data_center: &DataCenter, id: &str, output: &Path) -> Result<()> {
    let state = block_on(data_center.export_workspace(id))?;
    std::fs::write(output, &state)?;
    println!("Exported {} ({} bytes) to {}", id, state.len(), output.display());
    Ok(())
}

pub fn handle_import(data_center: &DataCenter, path: &Path) -> Result<()> {
    let update = std::fs::read(path)?;
    let workspace = block_on(data_center.import_workspace(&update))?;
    println!(
        "Imported {} as {}",
        workspace.name().unwrap_or_default(),
        workspace.room()
    );
    Ok(())
}
