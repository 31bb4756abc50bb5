#[derive(Debug, Clone, clap::Args)]
pub struct ServeOptions {
    /// Host to bind to
    #[arg(long, env = "EDITZ_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "EDITZ_PORT", default_value = "8000")]
    pub port: u16,

    /// Largest accepted request body, in megabytes
    #[arg(long, env = "EDITZ_MAX_UPLOAD_MB", default_value = "50")]
    pub max_upload_mb: usize,

    /// Frontend origin allowed by CORS (any origin when unset)
    #[arg(long, env = "FRONTEND_URL")]
    pub allow_origin: Option<String>,
}
