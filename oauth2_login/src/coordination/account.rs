use crate::oauth2::{OAuth2Error, OAuthUserInfo};
use crate::userdb::{AccountLink, User, UserError, UserStore};
use crate::utils::gen_random_hex;

use super::errors::CoordinationError;

/// Suffix retries before giving up on a username.
const MAX_USERNAME_ATTEMPTS: usize = 5;
/// Hex characters appended after the `_` separator.
const USERNAME_SUFFIX_LEN: usize = 8;

/// Map a verified external identity onto exactly one local account.
///
/// Resolution order is fixed: an existing link wins outright, then an
/// email match may gain a link if the account has none, then a fresh
/// account is created. A lost uniqueness race during the write steps is
/// retried once from the top, so when the concurrent winner inserted the
/// link for this very identity the retry resolves to it through the link
/// lookup instead of tripping the conflict rule.
pub async fn resolve_account(
    store: &dyn UserStore,
    info: &OAuthUserInfo,
) -> Result<User, CoordinationError> {
    match try_resolve(store, info).await {
        Err(CoordinationError::User(ref e)) if matches!(e, UserError::UniqueViolation(_)) => {
            tracing::debug!(provider = %info.provider, "lost a uniqueness race, re-resolving");
            try_resolve(store, info).await
        }
        other => other,
    }
}

async fn try_resolve(
    store: &dyn UserStore,
    info: &OAuthUserInfo,
) -> Result<User, CoordinationError> {
    if let Some(user) = store.find_by_link(info.provider, &info.oauth_id).await? {
        tracing::debug!(user_id = %user.id, provider = %info.provider, "resolved via existing link");
        return Ok(user);
    }

    attach_or_create(store, info).await
}

async fn attach_or_create(
    store: &dyn UserStore,
    info: &OAuthUserInfo,
) -> Result<User, CoordinationError> {
    if let Some(user) = store.find_by_email(&info.email).await? {
        let links = store.links_for_user(&user.id).await?;
        if !links.is_empty() {
            tracing::warn!(
                user_id = %user.id,
                provider = %info.provider,
                "email matches an account already linked elsewhere"
            );
            return Err(CoordinationError::EmailConflict);
        }

        let link = AccountLink::new(user.id.clone(), info.provider, info.oauth_id.clone());
        store.add_link(&link).await?;
        tracing::info!(user_id = %user.id, provider = %info.provider, "linked to existing account");
        return Ok(user);
    }

    create_with_unique_username(store, info).await
}

async fn create_with_unique_username(
    store: &dyn UserStore,
    info: &OAuthUserInfo,
) -> Result<User, CoordinationError> {
    let candidate = info.username_candidate();
    let mut username = candidate.clone();

    for _ in 0..MAX_USERNAME_ATTEMPTS {
        let user = User::new(username, info.email.clone());
        let link = AccountLink::new(user.id.clone(), info.provider, info.oauth_id.clone());
        match store.create_user_with_link(&user, &link).await {
            Ok(()) => {
                tracing::info!(user_id = %user.id, provider = %info.provider, "created account");
                return Ok(user);
            }
            Err(e) if e.is_username_conflict() => {
                let suffix = gen_random_hex(USERNAME_SUFFIX_LEN).map_err(OAuth2Error::from)?;
                username = format!("{candidate}_{suffix}");
            }
            Err(e) => return Err(e.into()),
        }
    }

    tracing::error!(candidate = %candidate, "exhausted username candidates");
    Err(CoordinationError::UsernameExhausted)
}
