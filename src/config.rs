//! Runtime configuration, read once from the environment at startup.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::python::InvokerConfig;
use crate::utils::AppError;

/// Absolute paths of the analysis scripts.
#[derive(Debug, Clone)]
pub struct ScriptPaths {
    pub resume: PathBuf,
    pub transcript: PathBuf,
    pub certificate: PathBuf,
    pub github: PathBuf,
    pub personality: PathBuf,
    pub skill_path: PathBuf,
    pub portfolio_builder: PathBuf,
    pub job_demand: PathBuf,
    pub career_role: PathBuf,
}

impl ScriptPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            resume: dir.join("resume.py"),
            transcript: dir.join("transcript.py"),
            certificate: dir.join("certificate.py"),
            github: dir.join("github.py"),
            personality: dir.join("personality.py"),
            skill_path: dir.join("skillpath.py"),
            portfolio_builder: dir.join("portfolioBuilder.py"),
            job_demand: dir.join("jobDemand.py"),
            career_role: dir.join("CareerRole.py"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub mongodb_database: Option<String>,
    pub jwt_secret: String,
    /// Marks the session cookie `Secure`.
    pub secure_cookies: bool,
    pub client_url: String,
    pub scripts: ScriptPaths,
    pub uploads_dir: PathBuf,
    pub tmp_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub bcrypt_cost: u32,
    pub invoker: InvokerConfig,
    /// `None` when `GOOGLE_API_KEY` is not set.
    pub gemini: Option<GeminiConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let mongodb_uri = env::var("MONGODB_URI")
            .map_err(|_| AppError::Misconfigured("MONGODB_URI environment variable is not defined".into()))?;

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("⚠️  JWT_SECRET not set, using an insecure development secret");
            "default-secret-change-me".to_string()
        });

        let scripts_dir = absolute(PathBuf::from(var_or("SCRIPTS_DIR", "./scripts")))?;

        let gemini = env::var("GOOGLE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| -> Result<GeminiConfig, AppError> {
                Ok(GeminiConfig {
                    api_key,
                    model: var_or("GEMINI_MODEL", "gemini-2.5-pro"),
                    base_url: var_or("GEMINI_BASE_URL", "https://generativelanguage.googleapis.com"),
                    timeout: Duration::from_secs(parse_var("GEMINI_TIMEOUT_SECS", 120)?),
                })
            })
            .transpose()?;

        Ok(Self {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", 3000)?,
            mongodb_uri,
            mongodb_database: env::var("MONGODB_DATABASE").ok(),
            jwt_secret,
            secure_cookies: var_or("APP_ENV", "development") == "production",
            client_url: var_or("CLIENT_URL", "http://localhost:5173"),
            scripts: ScriptPaths::in_dir(&scripts_dir),
            uploads_dir: absolute(PathBuf::from(var_or("UPLOADS_DIR", "./uploads")))?,
            tmp_dir: absolute(PathBuf::from(var_or("TMP_DIR", "./tmp")))?,
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            bcrypt_cost: parse_var("BCRYPT_COST", 10)?,
            invoker: InvokerConfig {
                interpreter: var_or("PYTHON_BIN", "python"),
                timeout: Duration::from_secs(parse_var("SCRIPT_TIMEOUT_SECS", 300)?),
                max_output_bytes: parse_var("SCRIPT_MAX_OUTPUT_BYTES", 4 * 1024 * 1024)?,
                max_concurrency: parse_var("SCRIPT_MAX_CONCURRENCY", 4)?,
                max_queue: parse_var("SCRIPT_MAX_QUEUE", 32)?,
            },
            gemini,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Misconfigured(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}

// Os scripts rodam com o próprio diretório como cwd, então todo caminho
// passado para eles precisa ser absoluto.
fn absolute(path: PathBuf) -> Result<PathBuf, AppError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_paths_resolve_inside_dir() {
        let scripts = ScriptPaths::in_dir(Path::new("/opt/careergap"));
        assert_eq!(scripts.career_role, PathBuf::from("/opt/careergap/CareerRole.py"));
        assert_eq!(scripts.skill_path, PathBuf::from("/opt/careergap/skillpath.py"));
    }

    #[test]
    fn test_relative_paths_become_absolute() {
        let path = absolute(PathBuf::from("uploads")).unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("uploads"));
    }

    #[test]
    fn test_parse_var_falls_back_to_default() {
        let value: u64 = parse_var("CAREERGAP_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
