//! Session manager: owns the credential pair and profile snapshot.
//!
//! Exactly one store holds the active session. The `remember` flag at
//! login picks the durable store; otherwise everything stays volatile.
//! The manager never inspects token contents — they are opaque strings
//! handed to the HTTP layer.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::auth::keys;
use crate::auth::profile::{Role, UserProfile};
use crate::auth::store::{StoreKind, StorePair};
use crate::config::ClientConfig;
use crate::utils::mask_token;

/// Everything a successful login or registration hands the session layer.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub profile: UserProfile,
}

pub struct SessionManager {
    stores: StorePair,
    auth_entry: String,
}

impl SessionManager {
    pub fn new(stores: StorePair, auth_entry: String) -> Self {
        Self { stores, auth_entry }
    }

    /// Production wiring from config: sealed durable store on disk,
    /// in-memory volatile store.
    pub fn open(config: &ClientConfig) -> Result<Arc<Self>> {
        let stores = StorePair::open_default(config)?;
        Ok(Arc::new(Self::new(stores, config.auth_entry())))
    }

    // ===== Lookups =====

    /// Current access token and the store holding it, volatile first.
    pub fn access_token(&self) -> Option<(String, StoreKind)> {
        self.stores.find(&keys::ACCESS_TOKEN_KEYS)
    }

    /// Current refresh token and the store holding it, volatile first.
    pub fn refresh_token(&self) -> Option<(String, StoreKind)> {
        self.stores.find(&keys::REFRESH_TOKEN_KEYS)
    }

    /// Cached profile snapshot, if a session is active.
    pub fn cached_profile(&self) -> Option<UserProfile> {
        let (raw, _) = self.stores.find(&keys::USER_KEYS)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "cached profile unparseable, ignoring");
                None
            }
        }
    }

    /// Last-known role: the cached role string, falling back to the
    /// profile snapshot.
    pub fn cached_role(&self) -> Option<Role> {
        if let Some((raw, _)) = self.stores.find(&[keys::ROLE_KEY]) {
            if let Some(role) = Role::parse(&raw) {
                return Some(role);
            }
            warn!(role = %raw, "cached role string unrecognized");
        }
        self.cached_profile().map(|p| p.role)
    }

    pub fn is_logged_in(&self) -> bool {
        self.stores.find(&[keys::LOGGED_IN_KEY]).is_some() && self.access_token().is_some()
    }

    // ===== Transitions =====

    /// Commit a fresh login or registration.
    ///
    /// The target store comes from `remember` (durable when true). The
    /// other store is purged of every session key first so credentials
    /// never end up split across both.
    pub fn commit_login(&self, session: &AuthSession, remember: bool) -> Result<()> {
        let target = if remember {
            StoreKind::Durable
        } else {
            StoreKind::Volatile
        };
        let other = if remember {
            StoreKind::Volatile
        } else {
            StoreKind::Durable
        };

        self.purge(other)?;

        let store = self.stores.store(target);
        for key in keys::ACCESS_TOKEN_KEYS {
            store.set(key, &session.access_token)?;
        }
        for key in keys::REFRESH_TOKEN_KEYS {
            store.set(key, &session.refresh_token)?;
        }
        let profile_json =
            serde_json::to_string(&session.profile).context("Failed to serialize profile")?;
        for key in keys::USER_KEYS {
            store.set(key, &profile_json)?;
        }
        store.set(keys::LOGGED_IN_KEY, "true")?;
        store.set(keys::ROLE_KEY, session.profile.role.as_str())?;
        if let Some(ref avatar) = session.profile.avatar_url {
            store.set(keys::AVATAR_URL_KEY, avatar)?;
        }

        info!(
            store = ?target,
            role = %session.profile.role,
            token = %mask_token(&session.access_token),
            "session committed"
        );
        Ok(())
    }

    /// Persist tokens from a successful refresh into the store that held
    /// the refresh token, keeping the pair co-located.
    pub fn store_refreshed(
        &self,
        access_token: &str,
        rotated_refresh: Option<&str>,
        kind: StoreKind,
    ) -> Result<()> {
        let store = self.stores.store(kind);
        for key in keys::ACCESS_TOKEN_KEYS {
            store.set(key, access_token)?;
        }
        if let Some(refresh) = rotated_refresh {
            for key in keys::REFRESH_TOKEN_KEYS {
                store.set(key, refresh)?;
            }
            debug!(store = ?kind, "refresh token rotated");
        }
        Ok(())
    }

    /// Re-cache the profile snapshot next to the current credentials.
    pub fn update_profile(&self, profile: &UserProfile) -> Result<()> {
        let Some((_, kind)) = self.access_token() else {
            warn!("no active session, profile update dropped");
            return Ok(());
        };
        let store = self.stores.store(kind);
        let profile_json = serde_json::to_string(profile).context("Failed to serialize profile")?;
        for key in keys::USER_KEYS {
            store.set(key, &profile_json)?;
        }
        store.set(keys::ROLE_KEY, profile.role.as_str())?;
        match profile.avatar_url {
            Some(ref avatar) => store.set(keys::AVATAR_URL_KEY, avatar)?,
            None => store.remove(keys::AVATAR_URL_KEY)?,
        }
        Ok(())
    }

    /// Cache the template id a business tenant applied, next to the
    /// current credentials.
    pub fn cache_applied_template(&self, template_id: &str) -> Result<()> {
        self.set_product_key(keys::APPLIED_TEMPLATE_KEY, template_id)
    }

    /// Mark that the user holds an active purchase.
    pub fn mark_purchased(&self) -> Result<()> {
        self.set_product_key(keys::HAS_PURCHASED_KEY, "true")
    }

    fn set_product_key(&self, key: &str, value: &str) -> Result<()> {
        let Some((_, kind)) = self.access_token() else {
            debug!(key, "no active session, cached value dropped");
            return Ok(());
        };
        self.stores.store(kind).set(key, value)
    }

    /// Clear every session key from both stores.
    pub fn logout(&self) -> Result<()> {
        self.purge(StoreKind::Volatile)?;
        self.purge(StoreKind::Durable)?;
        info!("session cleared from both stores");
        Ok(())
    }

    /// Forced logout after an unrecoverable refresh: clear both stores
    /// and return the auth entry redirect, carrying the last-known role
    /// as a query hint when one was cached.
    pub fn expire_session(&self) -> String {
        let role = self.cached_role();
        if let Err(e) = self.logout() {
            // Keep going: the redirect must happen even if a store write
            // failed partway through the purge.
            warn!(error = %e, "session purge incomplete during forced logout");
        }
        match role {
            Some(role) => format!("{}?role={}", self.auth_entry, role.as_str()),
            None => self.auth_entry.clone(),
        }
    }

    fn purge(&self, kind: StoreKind) -> Result<()> {
        let store = self.stores.store(kind);
        for key in keys::SESSION_KEYS {
            store.remove(key)?;
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn stores(&self) -> &StorePair {
        &self.stores
    }
}

// ============================================================================
// Tests
// ============================================================================
