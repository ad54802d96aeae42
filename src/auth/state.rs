//! Authentication state trait and macro.

use crate::jwt::TokenCodec;

/// Trait for state types that can verify bearer tokens.
pub trait HasAuthBackend {
    fn jwt(&self) -> &TokenCodec;
}

/// Implement `HasAuthBackend` for a state struct with a `jwt: Arc<TokenCodec>` field.
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub jwt: Arc<TokenCodec>,
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn jwt(&self) -> &$crate::jwt::TokenCodec {
                &self.jwt
            }
        }
    };
}
