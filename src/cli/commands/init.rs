use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("Created config.toml with default settings.");
        println!("Set DATAFORSEO_LOGIN / DATAFORSEO_PASSWORD and STRIPE_SECRET_KEY in the environment.");
    } else {
        println!("config.toml already exists, leaving it untouched.");
    }
    Ok(())
}
