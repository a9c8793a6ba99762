use clap::Subcommand;
use teamtally_core::Settings;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective settings as TOML
    Show,
    /// Print the settings file location
    Path,
    /// Write default settings if no file exists yet
    Init,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let settings = Settings::load()?;
            print!("{}", settings.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", Settings::path().display());
        }
        ConfigAction::Init => {
            let path = Settings::path();
            if Settings::init_at(&path)? {
                println!("wrote {}", path.display());
            } else {
                println!("{} already exists", path.display());
            }
        }
    }
    Ok(())
}
