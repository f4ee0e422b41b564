// Server configuration
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: &str = "8000";
pub const DEFAULT_DATA_PATH: &str = "data";
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000";
pub const DEFAULT_LOG_FILTER: &str = "finance_dashboard=info,tower_http=info";

// Token configuration
pub const DEFAULT_TOKEN_EXPIRY_MINUTES: i64 = 30;
pub const TOKEN_TYPE: &str = "bearer";

// LLM configuration
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:3b";
pub const LLM_TIMEOUT_SECS: u64 = 20;
pub const ANALYSIS_WINDOW_DAYS: i64 = 90;
pub const DEFAULT_CHAT_HISTORY_LIMIT: u32 = 50;
pub const MAX_CHAT_MESSAGE_LENGTH: usize = 4000;
pub const MAX_CHAT_HISTORY_TURNS: usize = 20;

// Database limits and defaults
pub const DEFAULT_TRANSACTIONS_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;
pub const MAX_OFFSET: u32 = 1_000_000;
pub const DEFAULT_MONTHS: u32 = 6;
pub const MAX_MONTHS: u32 = 12;

// Validation limits
pub const MAX_CATEGORY_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 255;
pub const MAX_PROJECTION_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 255;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MIN_PASSWORD_LENGTH: usize = 6;

// Category defaults
pub const DEFAULT_CATEGORY_COLOR: &str = "#3b82f6";
pub const UNCATEGORIZED_NAME: &str = "Sem Categoria";
pub const UNCATEGORIZED_COLOR: &str = "#999999";
pub const DEFAULT_CATEGORY_NAMES: [&str; 8] = [
    "Alimentação",
    "Transporte",
    "Moradia",
    "Saúde",
    "Lazer",
    "Educação",
    "Compras",
    "Outros",
];

// Bank statement status
pub const STATEMENT_PENDING_REVIEW: &str = "pending_review";
pub const STATEMENT_COMPLETED: &str = "completed";

// Error messages
pub const ERR_DATABASE_ACCESS: &str = "Database access error";
pub const ERR_DATABASE_OPERATION: &str = "Database operation failed";
pub const ERR_UNAUTHORIZED: &str = "Could not validate credentials";
pub const ERR_INVALID_CREDENTIALS: &str = "Invalid credentials";
pub const ERR_ASSISTANT_UNAVAILABLE: &str =
    "AI service unavailable. Make sure the Ollama server is running.";
