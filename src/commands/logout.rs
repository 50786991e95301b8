use tasktrack::auth::{FileTokenStore, TokenStore};
use tasktrack::config::AppConfig;

pub fn run(config: &AppConfig) -> Result<(), String> {
    FileTokenStore::new(&config.session_file).clear();
    println!("Signed out.");
    Ok(())
}
