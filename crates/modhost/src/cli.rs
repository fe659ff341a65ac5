//! Command handlers over an initialized [`Application`]. Short results are
//! printed as text, structured ones as pretty JSON.
use std::path::{Path, PathBuf};

use serde::Serialize;

use modhost_core::kernel::error::{Error, Result};
use modhost_core::metadata::filename;
use modhost_core::storage::{GameEntry, HostConfig, LocalStorageProvider};
use modhost_core::{Application, InstallOptions, RollbackReport};

use crate::{Commands, ExtensionCommand, GameCommand, InstallArgs, ModCommand};

/// Configuration plus where it came from, so `game manage --path` can save it
struct ConfigFile {
    provider: LocalStorageProvider,
    file: PathBuf,
    config: HostConfig,
}

impl ConfigFile {
    fn load(path: &Path) -> Result<Self> {
        let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let file = path.file_name().map(PathBuf::from).unwrap_or_else(|| path.to_path_buf());
        let provider = LocalStorageProvider::new(base);
        let config = HostConfig::load(&provider, &file)?;
        Ok(Self { provider, file, config })
    }

    fn save(&self) -> Result<()> {
        let dir = self.provider.base_path();
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .map_err(|e| Error::io(e, "create_dir_all", dir.to_path_buf()))?;
        }
        self.config.save(&self.provider, &self.file)?;
        Ok(())
    }
}

pub async fn run(config_path: &Path, command: Commands) -> Result<()> {
    if let Commands::ParseName { filename } = &command {
        return parse_name(filename);
    }

    let mut config_file = ConfigFile::load(config_path)?;
    if let Commands::Game { command: GameCommand::Manage { game, path: Some(path) } } = &command {
        config_file.config.games.insert(game.clone(), GameEntry { path: path.clone() });
        config_file.save()?;
    }

    let mut app = Application::new(config_file.config.clone())?;
    app.initialize().await?;

    match command {
        Commands::Extensions { command } => extensions(&app, command).await,
        Commands::Game { command } => game(&app, command).await,
        Commands::Mods { command } => mods(&app, command).await,
        Commands::ParseName { .. } => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| Error::Other(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn parse_name(name: &str) -> Result<()> {
    // Drop a trailing archive extension, keep dotted versions intact
    let stem = match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) if ["zip", "rar", "7z"].contains(&ext.to_ascii_lowercase().as_str()) => {
            &name[..name.len() - ext.len() - 1]
        }
        _ => name,
    };
    print_json(&filename::extract(stem))
}

async fn extensions(app: &Application, command: ExtensionCommand) -> Result<()> {
    match command {
        ExtensionCommand::List => {
            let descriptors = app.extensions().descriptors().await;
            if descriptors.is_empty() {
                println!("No extensions loaded.");
            }
            for descriptor in descriptors {
                println!(
                    "{}\t{}\t{}\t[{}]",
                    descriptor.id,
                    descriptor.name,
                    descriptor.version.as_deref().unwrap_or("-"),
                    descriptor.hook_names().join(", ")
                );
            }
            Ok(())
        }
        ExtensionCommand::Enable { name } => {
            let path = app.extensions().set_enabled(&name, true).await?;
            println!("Enabled '{}' ({})", name, path.display());
            Ok(())
        }
        ExtensionCommand::Disable { name } => {
            let path = app.extensions().set_enabled(&name, false).await?;
            println!("Disabled '{}' ({})", name, path.display());
            Ok(())
        }
    }
}

async fn game(app: &Application, command: GameCommand) -> Result<()> {
    let mods = app.mods();
    match command {
        GameCommand::Detect { game, candidates } => {
            match mods.detect_game(&game, &candidates).await? {
                Some(path) => println!("{}", path.display()),
                None => println!("'{}' not found among {} candidate(s)", game, candidates.len()),
            }
            Ok(())
        }
        GameCommand::Manage { game, path } => {
            let report = mods.manage_game(&game, path.as_deref()).await?;
            println!("Managing '{}'", game);
            match report {
                Some(report) => print_json(&report),
                None => Ok(()),
            }
        }
        GameCommand::Unmanage { game } => {
            mods.unmanage_game(&game).await?;
            println!("Stopped managing '{}'", game);
            Ok(())
        }
    }
}

fn print_rollback(mod_id: &str, report: &RollbackReport) {
    println!(
        "{}: removed {}, skipped {}, failed {}",
        mod_id,
        report.removed.len(),
        report.skipped.len(),
        report.failed.len()
    );
    for (path, reason) in &report.failed {
        eprintln!("  could not remove {}: {}", path.display(), reason);
    }
}

fn install_options(args: &InstallArgs) -> InstallOptions {
    InstallOptions {
        name: args.name.clone(),
        mod_type: args.mod_type.clone(),
        version: args.version.clone(),
        external_id: args.external_id.clone(),
        note: args.note.clone(),
        auto_enable: args.enable,
        ..Default::default()
    }
}

async fn mods(app: &Application, command: ModCommand) -> Result<()> {
    let mods = app.mods();
    match command {
        ModCommand::List { game } => print_json(&mods.list_mods(&game)),
        ModCommand::Install(args) => {
            let entry = mods.install(&args.game, &args.archive, install_options(&args)).await?;
            println!(
                "Installed '{}' ({}){}",
                entry.id,
                entry.name,
                if entry.enabled { ", enabled" } else { "" }
            );
            Ok(())
        }
        ModCommand::Enable { game, id } => {
            let entry = mods.enable(&game, &id).await?;
            println!("Enabled '{}' ({} file(s))", entry.id, entry.files.len());
            Ok(())
        }
        ModCommand::Disable { game, id } => {
            print_rollback(&id, &mods.disable(&game, &id).await?);
            Ok(())
        }
        ModCommand::Delete { game, id } => {
            print_rollback(&id, &mods.delete_mod(&game, &id).await?);
            println!("Deleted '{}'", id);
            Ok(())
        }
        ModCommand::DisableAll { game } => {
            for (id, report) in mods.disable_all(&game).await? {
                print_rollback(&id, &report);
            }
            Ok(())
        }
        ModCommand::CheckUpdate { game, id } => match mods.check_update(&game, &id).await? {
            Some(info) => print_json(&info),
            None => {
                println!("'{}' has no update information", id);
                Ok(())
            }
        },
    }
}
