use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Validation(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Http { message, .. } if !message.is_empty() => message.clone(),
            ClientError::Validation(message) => message.clone(),
            ClientError::NotAuthenticated => "Sessão expirada, faça login novamente".to_string(),
            _ => "Não foi possível completar a operação".to_string(),
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_errors_expose_status_and_message() {
        let err = ClientError::Http {
            status: 409,
            message: "Category name already exists".to_string(),
        };
        assert_eq!(err.status(), Some(409));
        assert_eq!(err.user_message(), "Category name already exists");
        assert_eq!(err.to_string(), "HTTP 409: Category name already exists");
    }

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err = ClientError::Validation("As senhas não coincidem".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.user_message(), "As senhas não coincidem");
    }
}
