//! Storage key registry for the session stores.
//!
//! Older releases of the web client wrote tokens and the cached user
//! under camelCase names; the canonical names are snake_case. Writes go
//! to every alias so older readers keep working, and lookups check the
//! aliases in order.

/// Access token keys, canonical name first.
pub const ACCESS_TOKEN_KEYS: [&str; 2] = ["access_token", "accessToken"];

/// Refresh token keys, canonical name first.
pub const REFRESH_TOKEN_KEYS: [&str; 2] = ["refresh_token", "refreshToken"];

/// Serialized user profile keys, canonical name first.
pub const USER_KEYS: [&str; 2] = ["user", "currentUser"];

/// Plain-text marker set while a session is active.
pub const LOGGED_IN_KEY: &str = "logged_in";

/// Role string cached for synchronous role checks and redirect hints.
pub const ROLE_KEY: &str = "role";

/// Cached avatar URL for the signed-in user.
pub const AVATAR_URL_KEY: &str = "avatar_url";

/// Site template id last applied by a business tenant.
pub const APPLIED_TEMPLATE_KEY: &str = "applied_template";

/// Set once the user has an active paid subscription.
pub const HAS_PURCHASED_KEY: &str = "has_purchased";

/// Every key the session layer owns. Purged from a store before it is
/// handed a fresh login, and from both stores on logout.
pub const SESSION_KEYS: [&str; 11] = [
    "access_token",
    "accessToken",
    "refresh_token",
    "refreshToken",
    "user",
    "currentUser",
    LOGGED_IN_KEY,
    ROLE_KEY,
    AVATAR_URL_KEY,
    APPLIED_TEMPLATE_KEY,
    HAS_PURCHASED_KEY,
];
