use std::io::{self, BufRead, Write};

use tasktrack::config::AppConfig;

use super::connect;

pub async fn run(config: &AppConfig, email: &str, password: Option<&str>) -> Result<(), String> {
    let password = match password {
        Some(p) => p.to_string(),
        None => prompt_password()?,
    };
    if email.trim().is_empty() || password.is_empty() {
        return Err("email and password are required".to_string());
    }

    let store = connect(config);
    store
        .backend()
        .login(email.trim(), &password)
        .await
        .map_err(|e| format!("sign in failed: {}", e.message()))?;

    println!("Signed in as {}", email.trim());
    Ok(())
}

fn prompt_password() -> Result<String, String> {
    eprint!("Password: ");
    io::stderr().flush().map_err(|e| format!("io error: {e}"))?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| format!("failed to read password: {e}"))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
