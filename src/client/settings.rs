use super::api::ApiClient;
use super::error::{ClientError, ClientResult};
use super::lifecycle::Mount;
use super::ui::Notices;
use crate::constants::MIN_PASSWORD_LENGTH;
use crate::models::{ChangePasswordPayload, PublicUser, UpdateProfilePayload};

/// Profile buffer. The email is shown read-only; only the name is editable.
/// A blank name is sent as an empty string, which clears it on the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
}

impl ProfileForm {
    pub fn from_user(user: &PublicUser) -> Self {
        ProfileForm {
            name: user.name.clone().unwrap_or_default(),
            email: user.email.clone(),
        }
    }

    pub fn to_payload(&self) -> UpdateProfilePayload {
        UpdateProfilePayload {
            name: Some(self.name.trim().to_string()),
            email: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PasswordForm {
    pub current: String,
    pub new: String,
    pub confirm: String,
}

impl PasswordForm {
    pub fn validate(&self) -> ClientResult<ChangePasswordPayload> {
        if self.new != self.confirm {
            return Err(ClientError::Validation(
                "As senhas não coincidem!".to_string(),
            ));
        }
        if self.new.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ClientError::Validation(format!(
                "Senha deve ter pelo menos {} caracteres!",
                MIN_PASSWORD_LENGTH
            )));
        }
        Ok(ChangePasswordPayload {
            current_password: self.current.clone(),
            new_password: self.new.clone(),
        })
    }

    pub fn clear(&mut self) {
        *self = PasswordForm::default();
    }
}

pub struct SettingsPage {
    api: ApiClient,
    mount: Mount,
    pub profile: ProfileForm,
    pub password: PasswordForm,
    pub saving: bool,
    pub notices: Notices,
}

impl SettingsPage {
    pub fn new(api: ApiClient) -> Self {
        SettingsPage {
            api,
            mount: Mount::new(),
            profile: ProfileForm::default(),
            password: PasswordForm::default(),
            saving: false,
            notices: Notices::default(),
        }
    }

    pub fn unmount(&self) {
        self.mount.unmount();
    }

    pub async fn load(&mut self) {
        let Some(result) = self.mount.token().guard(self.api.me()).await else {
            return;
        };
        match result {
            Ok(user) => self.profile = ProfileForm::from_user(&user),
            Err(e) => {
                tracing::error!(error = %e, "failed to load profile");
                self.notices.error("Erro ao carregar perfil");
            }
        }
    }

    pub async fn save_profile(&mut self) {
        self.saving = true;
        match self.api.update_profile(&self.profile.to_payload()).await {
            Ok(user) => {
                self.profile = ProfileForm::from_user(&user);
                self.notices.success("Perfil atualizado!");
            }
            Err(e) => self
                .notices
                .error(format!("Erro ao atualizar perfil: {}", e.user_message())),
        }
        self.saving = false;
    }

    /// Validation runs before any request; an invalid form never reaches the server.
    pub async fn change_password(&mut self) {
        let payload = match self.password.validate() {
            Ok(payload) => payload,
            Err(e) => return self.notices.error(e.user_message()),
        };
        self.saving = true;
        match self.api.change_password(&payload).await {
            Ok(()) => {
                self.notices.success("Senha atualizada!");
                self.password.clear();
            }
            Err(e) => self
                .notices
                .error(format!("Erro ao atualizar senha: {}", e.user_message())),
        }
        self.saving = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(new: &str, confirm: &str) -> PasswordForm {
        PasswordForm {
            current: "old-secret".to_string(),
            new: new.to_string(),
            confirm: confirm.to_string(),
        }
    }

    #[test]
    fn mismatch_is_reported_first() {
        let err = form("abc", "abd").validate().unwrap_err();
        assert_eq!(err.user_message(), "As senhas não coincidem!");
    }

    #[test]
    fn short_password_is_rejected() {
        let err = form("abc", "abc").validate().unwrap_err();
        assert_eq!(err.user_message(), "Senha deve ter pelo menos 6 caracteres!");
        assert!(form("abcdef", "abcdef").validate().is_ok());
    }

    #[test]
    fn profile_payload_never_changes_email() {
        let profile = ProfileForm {
            name: "  Ana ".to_string(),
            email: "ana@example.com".to_string(),
        };
        let payload = profile.to_payload();
        assert_eq!(payload.name.as_deref(), Some("Ana"));
        assert!(payload.email.is_none());
    }

    #[test]
    fn blank_name_is_sent_as_empty() {
        let profile = ProfileForm {
            name: "   ".to_string(),
            email: "ana@example.com".to_string(),
        };
        assert_eq!(profile.to_payload().name.as_deref(), Some(""));
    }
}
