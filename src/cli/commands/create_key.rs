use crate::clients::TelegramNotifier;
use crate::config::Config;
use crate::db::Store;
use crate::services::AccountService;
use crate::state::build_shared_http_client;

pub async fn cmd_create_key(config: &Config, email: &str, name: Option<&str>) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_url).await?;
    let notifier = TelegramNotifier::new(build_shared_http_client(10)?, &config.telegram);
    let accounts = AccountService::new(store, notifier);

    let key = accounts.issue_key_for_email(email, name).await?;

    println!("API key for {email}:");
    println!("  {}", key.api_key);
    println!("{:-<50}", "");
    println!("Id:     {}", key.id);
    println!("Name:   {}", key.name);
    println!("Prefix: {}", key.key_prefix);
    println!("{}", key.warning);

    Ok(())
}
