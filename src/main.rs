use std::io;
use weatherbot::bot::request::OpenAiClient;
use weatherbot::bot::Bot;
use weatherbot::config::Config;
use weatherbot::input::{read_user_input, PROMPT};
use weatherbot::logging::init_logger;
use tracing::{info, warn};
use color_eyre::eyre::{Result, WrapErr};

fn main() -> Result<()> {
    // Install color-eyre for better error reporting
    color_eyre::install()?;

    // A missing .env is fine; the environment may already carry the key.
    let dotenv_result = dotenv::dotenv();
    let config = Config::load()?;

    let _guard = init_logger(&config)
        .wrap_err("Failed to initialize logging")?;

    if let Err(e) = dotenv_result {
        warn!("Error loading .env file: {}", e);
    }
    if config.api_key().is_none() {
        warn!("OPENAI_API_KEY is not set; requests will be sent without credentials");
    }

    info!("🌦️ weatherbot starting");
    info!("  - Model: {}", config.openai_model);
    info!("  - Endpoint: {}", config.completions_url());

    let user_input = read_user_input(&mut io::stdin().lock(), &mut io::stdout(), PROMPT)?;
    info!(chars = user_input.len(), "user input received");

    let mut bot = Bot::new(OpenAiClient::new(&config), &config);
    let outcome = bot.ask(&user_input)?;

    println!("{}", outcome);
    info!(rounds = bot.rounds(), "✅ done");
    Ok(())
}
