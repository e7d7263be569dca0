use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use sha2::{Digest, Sha256};
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize dotenv and structured tracing based on RUST_LOG.
///
/// - Supports explicit env file paths via ENV_FILE or DOTENV_PATH
/// - Falls back to standard ".env" discovery in the working directory
/// - Logs the source used
pub fn init_tracing() {
    let mut env_source: String = "none".into();
    for key in ["ENV_FILE", "DOTENV_PATH"] {
        if let Ok(p) = std::env::var(key) {
            let p = p.trim();
            if !p.is_empty()
                && std::path::Path::new(p).is_file()
                && dotenvy::from_filename(p).is_ok()
            {
                env_source = format!("{p} ({key})");
                break;
            }
        }
    }

    if env_source == "none" && dotenvy::dotenv().is_ok() {
        env_source = ".env".into();
    }

    // Respects RUST_LOG potentially provided by the env file loaded above.
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let subscriber = fmt().with_env_filter(EnvFilter::new(filter)).finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    tracing::info!("Environment loaded from: {}", env_source);
}

/// Read an environment variable, treating empty/whitespace values as absent.
pub fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Interpret an environment variable as a boolean flag (1|true|yes|on).
pub fn env_truthy(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => {
            let s = v.trim().to_ascii_lowercase();
            s == "1" || s == "true" || s == "yes" || s == "on"
        }
        Err(_) => default,
    }
}

/// Standard base64 encoding used for keys, nonces and ciphertext at rest.
pub fn b64_encode(data: &[u8]) -> String {
    BASE64_STANDARD.encode(data)
}

/// Decode standard base64; callers map failures into their own error types.
pub fn b64_decode(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64_STANDARD.decode(s.trim())
}

/// Generate a compact request correlation id (32 lowercase hex chars).
pub fn request_id() -> String {
    format!("{:032x}", uuid::Uuid::new_v4().as_u128())
}

/// Short SHA-256 fingerprint of key material, safe to put in log lines.
/// Never log the material itself.
pub fn key_fingerprint(material: &[u8]) -> String {
    let digest = Sha256::digest(material);
    let mut fp = hex::encode(digest);
    fp.truncate(8);
    fp
}
