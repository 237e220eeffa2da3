use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Base URL under which client links are shared
    /// (e.g., "https://app.example.com")
    pub public_base_url: String,

    /// Bucket name for diagnostic photos
    pub storage_bucket: String,

    /// S3-compatible endpoint URL
    pub storage_endpoint: String,

    /// S3-compatible access key ID
    pub storage_access_key: String,

    /// S3-compatible secret access key
    pub storage_secret_key: String,

    /// Public base URL of the photo bucket (CDN or bucket website)
    pub storage_public_url: String,

    /// HS256 secret shared with the hosted auth provider
    pub jwt_secret: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
