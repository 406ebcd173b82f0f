/// Render a store key or hash name into a Redis key with the given prefix.
///
/// The format is `prefix:key`. An empty prefix leaves the key untouched.
pub fn render_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}:{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_prefixed_key() {
        assert_eq!(render_key("keyward", "lock:orders"), "keyward:lock:orders");
    }

    #[test]
    fn renders_hash_name() {
        assert_eq!(
            render_key("app", "SESSION_TOKEN_HASH"),
            "app:SESSION_TOKEN_HASH"
        );
    }

    #[test]
    fn empty_prefix_is_passthrough() {
        assert_eq!(render_key("", "lock"), "lock");
    }
}
