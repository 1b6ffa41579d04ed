use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of visitor tokens and generated client secrets.
pub const TOKEN_LENGTH: usize = 40;

const COOKIE_PREFIX: &str = "sso_token_";

/// Generates a random string of ASCII letters and digits.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Generates a secret for a newly registered client.
#[must_use]
pub fn generate_client_secret() -> String {
    random_alphanumeric(TOKEN_LENGTH)
}

/// Name of the broker cookie holding the visitor token.
///
/// Several clients may share a domain, so the name is derived from the client
/// name: lowercased, with every run of underscores or non-word characters
/// collapsed into one `_`.
#[must_use]
pub fn cookie_name(client_name: &str) -> String {
    let mut name = String::with_capacity(COOKIE_PREFIX.len() + client_name.len());
    name.push_str(COOKIE_PREFIX);

    let mut in_separator = false;
    for c in client_name.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
            in_separator = false;
        } else if !in_separator {
            name.push('_');
            in_separator = true;
        }
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_alphanumeric_length_and_charset() {
        let value = random_alphanumeric(TOKEN_LENGTH);
        assert_eq!(value.len(), 40);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_random_alphanumeric_uniqueness() {
        assert_ne!(random_alphanumeric(40), random_alphanumeric(40));
    }

    #[test]
    fn test_client_secret_length() {
        assert_eq!(generate_client_secret().len(), TOKEN_LENGTH);
    }

    #[test]
    fn test_cookie_name_lowercases() {
        assert_eq!(cookie_name("MyApp"), "sso_token_myapp");
    }

    #[test]
    fn test_cookie_name_collapses_separators() {
        assert_eq!(cookie_name("my app"), "sso_token_my_app");
        assert_eq!(cookie_name("my--_ app"), "sso_token_my_app");
        assert_eq!(cookie_name("a__b"), "sso_token_a_b");
        assert_eq!(cookie_name("app.example.com"), "sso_token_app_example_com");
    }
}
