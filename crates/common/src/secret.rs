//! Secret wrapper for credentials (client secrets, tokens read from disk)

use std::fmt;
use zeroize::Zeroize;

/// Sensitive value - redacted in Debug/Display/logs, zeroized on drop
pub struct Secret<T: Zeroize>(T);

impl<T: Zeroize> Secret<T> {
    /// Wrap a sensitive value
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Expose the inner value (use sparingly, e.g. when building a form body)
    pub fn expose(&self) -> &T {
        &self.0
    }
}

impl From<String> for Secret<String> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Secret<String> {
    fn from(value: &str) -> Self {
        Self::new(value.to_owned())
    }
}

impl<T: Zeroize> fmt::Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl<T: Zeroize> Drop for Secret<T> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<T: Zeroize + Clone> Clone for Secret<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_secret_is_redacted_in_logs() {
        let secret: Secret<String> = "Zx8Q~app-client-secret".into();
        assert_eq!(format!("{secret:?}"), "[REDACTED]");
        assert_eq!(format!("{secret}"), "[REDACTED]");
        assert_eq!(secret.expose(), "Zx8Q~app-client-secret");
    }

    #[test]
    fn form_field_sees_the_exposed_value() {
        let secret = Secret::from(String::from("Zx8Q~app-client-secret"));
        let form = [
            ("grant_type", "client_credentials"),
            ("client_secret", secret.expose().as_str()),
        ];
        assert_eq!(form[1], ("client_secret", "Zx8Q~app-client-secret"));
    }

    #[test]
    fn clone_keeps_value_and_redaction() {
        let secret: Secret<String> = "Zx8Q~app-client-secret".into();
        let copy = secret.clone();
        drop(secret);
        assert_eq!(copy.expose(), "Zx8Q~app-client-secret");
        assert_eq!(format!("{copy}"), "[REDACTED]");
    }

    #[test]
    fn app_registration_debug_hides_client_secret() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct AppRegistration {
            tenant_id: &'static str,
            application_id: &'static str,
            client_secret: Secret<String>,
        }

        let app = AppRegistration {
            tenant_id: "contoso.onmicrosoft.com",
            application_id: "11111111-2222-3333-4444-555555555555",
            client_secret: "Zx8Q~app-client-secret".into(),
        };
        let debug = format!("{app:?}");
        assert!(debug.contains("contoso.onmicrosoft.com"));
        assert!(debug.contains("client_secret: [REDACTED]"), "got: {debug}");
        assert!(!debug.contains("Zx8Q~"), "got: {debug}");
    }
}
