use crate::config::AuthConfig;

/// The authenticated user, as handed to the controller by its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub name: String,
    pub token: Option<String>,
}

impl CurrentUser {
    pub fn new(name: &str, token: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            token,
        }
    }

    /// A session exists only when a user is configured; a token alone is not a login.
    pub fn from_config(auth: &AuthConfig) -> Option<Self> {
        let name = auth.user.as_deref()?.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, auth.token.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let auth = AuthConfig {
            user: Some("ada@example.com".to_string()),
            token: Some("t0k3n".to_string()),
        };
        let user = CurrentUser::from_config(&auth).unwrap();
        assert_eq!(user.name, "ada@example.com");
        assert_eq!(user.token.as_deref(), Some("t0k3n"));
    }

    #[test]
    fn test_no_user_means_logged_out() {
        let token_only = AuthConfig {
            user: None,
            token: Some("t0k3n".to_string()),
        };
        assert_eq!(CurrentUser::from_config(&token_only), None);

        let blank = AuthConfig {
            user: Some("   ".to_string()),
            token: None,
        };
        assert_eq!(CurrentUser::from_config(&blank), None);
    }
}
