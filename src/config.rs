use anyhow::Result;
use dotenvy::dotenv;

/// Maximum accepted length of a query message, matching the inbound API
/// contract.
pub const MAX_MESSAGE_LEN: usize = 500;

const DEFAULT_DATA_FILE: &str = "data/Sample_data.xlsx";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the provider's spreadsheet. A missing file is not fatal; the
    /// dataset loader substitutes sample data.
    pub data_file_path: String,
    /// HuggingFace Inference API credential. Absent means the remote summary
    /// is skipped and the analytical fallback is used directly.
    pub huggingface_api_key: Option<String>,
    pub port: u16,
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();

        let data_file_path =
            std::env::var("DATA_FILE_PATH").unwrap_or_else(|_| DEFAULT_DATA_FILE.to_string());

        let huggingface_api_key = std::env::var("HUGGINGFACE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT value {:?}: {}", raw, e))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Config {
            data_file_path,
            huggingface_api_key,
            port,
        })
    }
}
