use serde::{Deserialize, Serialize};
use std::path::Path;

/// Runtime settings for the hub, its views and the outer collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HubConfig {
    /// Page size of the consumer transaction table.
    pub transaction_limit: usize,
    /// How many recent transactions feed the spending charts.
    pub spending_window: usize,
    /// Days covered by the spending trend line.
    pub trend_days: u32,
    /// Institution used when a B2B profile carries no `institutionId`.
    pub default_institution_id: String,
    pub chat_endpoint: String,
    pub upload_prefix: String,
    pub upload_chunk_size: usize,
    pub min_password_len: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            transaction_limit: 50,
            spending_window: 100,
            trend_days: 7,
            default_institution_id: "demo-institution".into(),
            chat_endpoint: "http://127.0.0.1:5001/chat_stream".into(),
            upload_prefix: "csv-uploads".into(),
            upload_chunk_size: 64 * 1024,
            min_password_len: 6,
        }
    }
}

impl HubConfig {
    /// Load settings from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
        let config: HubConfig = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Small pages and a tiny upload chunk so tests exercise paging and
    /// multi-chunk progress without large fixtures.
    pub fn default_test() -> Self {
        Self {
            transaction_limit: 10,
            spending_window: 20,
            upload_chunk_size: 4,
            ..Self::default()
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.trend_days > 0, "trend_days must be > 0");
        anyhow::ensure!(self.upload_chunk_size > 0, "upload_chunk_size must be > 0");
        anyhow::ensure!(
            !self.default_institution_id.is_empty(),
            "default_institution_id must not be empty"
        );
        Ok(())
    }
}
