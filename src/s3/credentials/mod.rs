use secrecy::{ExposeSecret, SecretString};
use std::env;

#[derive(Clone, Debug)]
pub struct Credentials {
    // AWS_ACCESS_KEY_ID
    key: String,
    // AWS_SECRET_ACCESS_KEY
    secret: SecretString,
}

impl Credentials {
    /// Keys from the environment take precedence over the given ones.
    #[must_use]
    pub fn new(access: &str, secret: &SecretString) -> Self {
        let key = env::var("AWS_ACCESS_KEY_ID").unwrap_or_else(|_| access.to_string());
        let secret = env::var("AWS_SECRET_ACCESS_KEY")
            .map_or_else(|_| secret.clone(), SecretString::from);

        Self { key, secret }
    }

    #[must_use]
    pub fn aws_access_key_id(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn aws_secret_access_key(&self) -> &str {
        self.secret.expose_secret()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials() {
        temp_env::with_vars_unset(["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY"], || {
            let creds = Credentials::new("access", &SecretString::from("secret"));
            assert_eq!(creds.aws_access_key_id(), "access");
            assert_eq!(creds.aws_secret_access_key(), "secret");
        });
    }

    #[test]
    fn test_credentials_env() {
        temp_env::with_vars(
            [
                ("AWS_ACCESS_KEY_ID", Some("env-access")),
                ("AWS_SECRET_ACCESS_KEY", Some("env-secret")),
            ],
            || {
                let creds = Credentials::new("access", &SecretString::from("secret"));
                assert_eq!(creds.aws_access_key_id(), "env-access");
                assert_eq!(creds.aws_secret_access_key(), "env-secret");
            },
        );
    }

    #[test]
    fn test_credentials_debug_hides_secret() {
        let creds = Credentials::new("access", &SecretString::from("super-secret"));
        assert!(!format!("{creds:?}").contains("super-secret"));
    }
}
