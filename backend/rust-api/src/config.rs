use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Mongo,
    Memory,
}

impl FromStr for DatabaseBackend {
    type Err = config::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(DatabaseBackend::Mongo),
            "memory" => Ok(DatabaseBackend::Memory),
            other => Err(config::ConfigError::Message(format!(
                "database.backend must be \"mongo\" or \"memory\", got {:?}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub timeout_secs: u64,
    pub max_document_chars: usize,
    pub temperature: f32,
}

/// System instructions and user templates sent to the generative backend.
/// User templates are filled with `{document}`, `{hint}` and `{responses}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub classifier_system: String,
    pub classifier_user: String,
    pub quiz_system: String,
    pub quiz_user: String,
    pub evaluator_system: String,
    pub evaluator_user: String,
    pub chat_system: String,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            classifier_system: "You are a strict document classifier. Answer \"yes\" if ANY \
                portion of the document touches mathematical topics: formulas, equations, \
                numeric problems, or named fields of mathematics such as algebra, geometry, \
                calculus, statistics or number theory. Otherwise answer \"no\". \
                Reply with the single word yes or no."
                .to_string(),
            classifier_user: "Document:\n{document}".to_string(),
            quiz_system: "You write multiple-choice quizzes from study material. Respond with \
                ONLY a JSON object of the form \
                {\"questions\":[{\"question\":\"...\",\"options\":[\"...\",\"...\"],\"answer\":\"...\"}]}. \
                Each question has at least two distinct options and its answer is copied \
                exactly from those options. No prose and no Markdown."
                .to_string(),
            quiz_user: "Study material:\n{document}\n\nStudent request: {hint}".to_string(),
            evaluator_system: "You assess a student's math skill from their answers to a quiz. \
                Reply with exactly one word: Beginner, Intermediate or Expert."
                .to_string(),
            evaluator_user: "Answered questions:\n{responses}".to_string(),
            chat_system: "You are a math tutor and only answer to math-related questions."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_backend: DatabaseBackend,
    pub mongo_uri: String,
    pub mongo_database: String,
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    pub bcrypt_cost: u32,
    pub gemini: GeminiConfig,
    pub generation: GenerationConfig,
    pub upload_max_bytes: usize,
    pub prompts: Prompts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8081,
            database_backend: DatabaseBackend::Mongo,
            mongo_uri: "mongodb://localhost:27017".to_string(),
            mongo_database: "mathtutor".to_string(),
            jwt_secret: "dev-secret-only-for-local-testing".to_string(),
            token_ttl_minutes: 30,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            gemini: GeminiConfig {
                api_key: String::new(),
                base_url: "https://generativelanguage.googleapis.com".to_string(),
                model: "gemini-2.0-flash".to_string(),
            },
            generation: GenerationConfig {
                timeout_secs: 30,
                max_document_chars: 12_000,
                temperature: 0.2,
            },
            upload_max_bytes: 10 * 1024 * 1024,
            prompts: Prompts::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        // Root .env first (two levels up), then the local one
        let skip_root_env = env::var("SKIP_ROOT_ENV").is_ok();
        if skip_root_env {
            dotenvy::dotenv().ok();
        } else if dotenvy::from_path("../../.env").is_err() {
            dotenvy::dotenv().ok();
        }

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

        // config/*.toml + APP__SECTION__KEY overrides
        let settings = config::Config::builder()
            .add_source(config::File::with_name(&format!("config/{}", app_env)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Self::from_settings(&settings, &app_env)
    }

    fn from_settings(
        settings: &config::Config,
        app_env: &str,
    ) -> Result<Self, config::ConfigError> {
        let defaults = Config::default();

        let port = match settings.get_int("server.port") {
            Ok(port) => port_from_i64(port)?,
            Err(_) => match env::var("PORT") {
                Ok(raw) => raw.parse().map_err(|_| {
                    config::ConfigError::Message(format!("PORT is not a valid port: {}", raw))
                })?,
                Err(_) => defaults.port,
            },
        };

        let database_backend = match settings.get_string("database.backend") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.database_backend,
        };

        let mongo_uri = settings
            .get_string("database.mongo_uri")
            .or_else(|_| env::var("MONGO_URI"))
            .unwrap_or(defaults.mongo_uri);

        let mongo_database = settings
            .get_string("database.mongo_database")
            .or_else(|_| env::var("MONGO_DATABASE"))
            .unwrap_or(defaults.mongo_database);

        let jwt_secret = match settings
            .get_string("auth.jwt_secret")
            .or_else(|_| env::var("SECRETKEY"))
            .or_else(|_| env::var("JWT_SECRET"))
        {
            Ok(secret) => secret,
            Err(_) if app_env == "prod" => {
                return Err(config::ConfigError::Message(
                    "auth.jwt_secret (or JWT_SECRET) must be set in production".to_string(),
                ))
            }
            Err(_) => {
                eprintln!("WARNING: Using default JWT secret (dev mode only!)");
                defaults.jwt_secret
            }
        };

        let token_ttl_minutes = settings
            .get_int("auth.token_ttl_minutes")
            .unwrap_or(defaults.token_ttl_minutes);

        let bcrypt_cost = match settings.get_int("auth.bcrypt_cost") {
            Ok(cost) if (4..=31).contains(&cost) => cost as u32,
            Ok(cost) => {
                return Err(config::ConfigError::Message(format!(
                    "auth.bcrypt_cost must be between 4 and 31, got {}",
                    cost
                )))
            }
            Err(_) => defaults.bcrypt_cost,
        };

        let gemini = GeminiConfig {
            api_key: settings
                .get_string("gemini.api_key")
                .or_else(|_| env::var("GEMINI_API_KEY"))
                .unwrap_or(defaults.gemini.api_key),
            base_url: settings
                .get_string("gemini.base_url")
                .unwrap_or(defaults.gemini.base_url),
            model: settings
                .get_string("gemini.model")
                .unwrap_or(defaults.gemini.model),
        };
        if gemini.api_key.is_empty() {
            eprintln!("WARNING: GEMINI_API_KEY is not set; generative calls will fail");
        }

        let generation = GenerationConfig {
            timeout_secs: positive(settings, "generation.timeout_secs")?
                .unwrap_or(defaults.generation.timeout_secs),
            max_document_chars: positive(settings, "generation.max_document_chars")?
                .map(|v| v as usize)
                .unwrap_or(defaults.generation.max_document_chars),
            temperature: settings
                .get_float("generation.temperature")
                .map(|t| t as f32)
                .unwrap_or(defaults.generation.temperature),
        };

        let upload_max_bytes = positive(settings, "upload.max_bytes")?
            .map(|v| v as usize)
            .unwrap_or(defaults.upload_max_bytes);

        let prompts = settings
            .get::<Prompts>("prompts")
            .unwrap_or_else(|_| Prompts::default());

        Ok(Config {
            port,
            database_backend,
            mongo_uri,
            mongo_database,
            jwt_secret,
            token_ttl_minutes,
            bcrypt_cost,
            gemini,
            generation,
            upload_max_bytes,
            prompts,
        })
    }
}

fn port_from_i64(value: i64) -> Result<u16, config::ConfigError> {
    u16::try_from(value)
        .map_err(|_| config::ConfigError::Message(format!("server.port out of range: {}", value)))
}

fn positive(settings: &config::Config, key: &str) -> Result<Option<u64>, config::ConfigError> {
    match settings.get_int(key) {
        Ok(v) if v > 0 => Ok(Some(v as u64)),
        Ok(v) => Err(config::ConfigError::Message(format!(
            "{} must be positive, got {}",
            key, v
        ))),
        Err(_) => Ok(None),
    }
}
