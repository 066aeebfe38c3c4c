//! Utility macros for reducing boilerplate

/// Implement `FromRef<AppState>` for a state component.
///
/// ```ignore
/// impl_from_ref!(Marketplace, marketplace);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for Marketplace {
///     fn from_ref(state: &AppState) -> Self {
///         state.marketplace.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
