
use color_eyre::eyre::{Result, WrapErr};
use color_eyre::Section;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;


#[derive(Debug,Clone,Serialize,Deserialize,SmartDefault)]
#[serde(default)]
pub struct Config{
    pub openai_api_key:Option<String>,
    #[default = "https://api.openai.com"]
    pub openai_base_url:String,
    #[default = "gpt-4o"]
    pub openai_model:String,
    #[default = 0]
    pub seed:i64,
    #[default = "logs"]
    pub log_dir:String,
    #[default = "info"]
    pub log_level:String,
}

impl Config{
    /// Reads the config from the process environment. Unset variables fall back
    /// to their defaults; a variable that is set but unparsable is an error.
    pub fn load()->Result<Self>{
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars:I)->Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, Config>(vars)
            .wrap_err("Failed to read configuration from environment")
            .with_suggestion(|| "Check OPENAI_BASE_URL, OPENAI_MODEL, SEED and LOG_LEVEL in your environment or .env file")
    }

    /// An empty key counts as missing.
    pub fn api_key(&self)->Option<&str>{
        self.openai_api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn completions_url(&self)->String{
        format!("{}/v1/chat/completions", self.openai_base_url.trim_end_matches('/'))
    }
}
