use url::form_urlencoded;

use super::storage::KeyValueStorage;
use super::store::TokenStore;
use crate::jwt::{is_expired, now_secs};

pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Allow,
    Redirect(String),
}

/// Login URL that sends the user back to `path` afterwards.
pub fn login_redirect(path: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("{}?redirectTo={}", LOGIN_PATH, encoded.replace("%2F", "/"))
}

/// Gate a protected page. Looks only at local state and never refreshes.
pub fn guard<S: KeyValueStorage>(store: &TokenStore<S>, path: &str) -> Navigation {
    let auth = store.snapshot();
    let now = now_secs().unwrap_or(u64::MAX);

    if auth.token.is_none() || is_expired(auth.refresh_token.as_deref(), now) {
        store.clear();
        return Navigation::Redirect(login_redirect(path));
    }

    Navigation::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MemoryStorage, PersistedAuth};
    use crate::jwt::{Claim, TokenCodec, TokenKind};
    use crate::models::TokenPair;

    fn codec() -> TokenCodec {
        TokenCodec::new(b"access-secret-for-guard-tests", b"refresh-secret-for-guard-tests")
            .unwrap()
    }

    fn claim() -> Claim {
        Claim {
            id: 3,
            email: "guard@example.com".into(),
        }
    }

    #[test]
    fn test_login_redirect_encoding() {
        assert_eq!(login_redirect("/posts"), "/login?redirectTo=/posts");
        assert_eq!(
            login_redirect("/posts/1?tab=a b"),
            "/login?redirectTo=/posts/1%3Ftab%3Da+b"
        );
    }

    #[test]
    fn test_empty_session_redirects() {
        let store = TokenStore::open(MemoryStorage::new());
        assert_eq!(
            guard(&store, "/posts"),
            Navigation::Redirect("/login?redirectTo=/posts".into())
        );
    }

    #[test]
    fn test_both_expired_redirects_and_clears() {
        let codec = codec();
        let long_ago = now_secs().unwrap() - 30 * 24 * 3600;
        let store = TokenStore::open(MemoryStorage::new());
        store
            .set_tokens(&TokenPair {
                token: codec.issue_at(&claim(), TokenKind::Access, long_ago).unwrap().token,
                refresh_token: codec
                    .issue_at(&claim(), TokenKind::Refresh, long_ago)
                    .unwrap()
                    .token,
            })
            .unwrap();

        assert_eq!(
            guard(&store, "/posts"),
            Navigation::Redirect("/login?redirectTo=/posts".into())
        );
        assert_eq!(store.snapshot(), PersistedAuth::default());
    }

    #[test]
    fn test_expired_access_with_live_refresh_is_allowed() {
        let codec = codec();
        let an_hour_ago = now_secs().unwrap() - 3600;
        let store = TokenStore::open(MemoryStorage::new());
        store
            .set_tokens(&TokenPair {
                token: codec.issue_at(&claim(), TokenKind::Access, an_hour_ago).unwrap().token,
                refresh_token: codec.issue(&claim(), TokenKind::Refresh).unwrap().token,
            })
            .unwrap();

        assert_eq!(guard(&store, "/posts"), Navigation::Allow);
        assert!(store.snapshot().token.is_some());
    }
}
