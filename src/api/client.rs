//! API client for communicating with the SkillBridge REST API.
//!
//! Every request flows through `send`, which attaches the current
//! access token and recovers from an expired one: on a 401 the client
//! refreshes the token (coordinated, so concurrent failures share one
//! refresh call) and re-issues the original request exactly once. A 401
//! on the retried request, or any refresh failure, ends the session:
//! both credential stores are cleared and the caller receives a
//! redirect to the auth entry route.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Request, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{
    RefreshCoordinator, RefreshError, RefreshTransport, RefreshedTokens, Role, SessionManager,
    UserProfile,
};
use crate::config::ClientConfig;
use crate::models::{
    AuthResponse, Course, CourseDraft, CourseSummary, Dashboard, GeneratedSite, LoginRequest,
    Plan, RefreshRequest, RefreshResponse, RegisterRequest, SiteTemplate, Subscription,
    UploadTicket, UserPage,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
/// This is a client-wide bound and therefore also covers the refresh call.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Called with the auth entry redirect when a session becomes
/// unrecoverable. The embedding application decides what "navigate"
/// means for its surface.
pub type SessionExpiredHook = Arc<dyn Fn(&str) + Send + Sync>;

/// API client for SkillBridge.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<SessionManager>,
    refresh: Arc<RefreshCoordinator>,
    transport: Arc<dyn RefreshTransport>,
    session_expired_hook: Option<SessionExpiredHook>,
}

impl ApiClient {
    /// Create a new API client over the given session manager.
    pub fn new(config: &ClientConfig, session: Arc<SessionManager>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        let base_url = config.base_url();
        let transport: Arc<dyn RefreshTransport> = Arc::new(HttpRefreshTransport {
            http: http.clone(),
            refresh_url: format!("{base_url}/auth/refresh"),
        });

        Ok(Self {
            http,
            base_url,
            session,
            refresh: Arc::new(RefreshCoordinator::new()),
            transport,
            session_expired_hook: None,
        })
    }

    /// Register a hook invoked with the redirect target when the session
    /// is unrecoverable.
    pub fn on_session_expired(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.session_expired_hook = Some(Arc::new(hook));
        self
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn bearer(token: &str) -> Result<header::HeaderValue, ApiError> {
        header::HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::InvalidResponse("stored access token is not header-safe".into()))
    }

    // ===== Intercepting send path =====

    /// Send a request with the current credentials attached.
    ///
    /// Without a token the request proceeds unauthenticated and the
    /// server decides. A 401 triggers one refresh-and-retry; a second
    /// 401 on the retried request is surfaced as-is. Refresh failure
    /// clears the session and yields `SessionExpired`.
    async fn send(&self, mut request: Request) -> Result<Response, ApiError> {
        if let Some((token, _)) = self.session.access_token() {
            request
                .headers_mut()
                .insert(header::AUTHORIZATION, Self::bearer(&token)?);
        }

        // Clone up front: a request with a streaming body cannot be
        // cloned and is not retried.
        let retry = request.try_clone();
        let response = self.http.execute(request).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let Some(mut retry) = retry else {
            return Err(ApiError::Unauthorized);
        };

        debug!("request unauthorized, refreshing access token");
        let token = match self.refresh.refresh(&self.session, &self.transport).await {
            Ok(token) => token,
            Err(err) => return Err(self.expire_session(&err)),
        };

        retry
            .headers_mut()
            .insert(header::AUTHORIZATION, Self::bearer(&token)?);
        let response = self.http.execute(retry).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("request unauthorized after refreshed retry");
            return Err(ApiError::Unauthorized);
        }
        Ok(response)
    }

    fn expire_session(&self, err: &RefreshError) -> ApiError {
        warn!(error = %err, "session unrecoverable, forcing logout");
        let redirect = self.session.expire_session();
        if let Some(ref hook) = self.session_expired_hook {
            hook(&redirect);
        }
        ApiError::SessionExpired { redirect }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self
            .http
            .get(self.url(path))
            .build()
            .with_context(|| format!("Failed to build GET request for {path}"))?;
        let response = Self::check(self.send(request).await?).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {path}"))
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let request = self
            .http
            .post(self.url(path))
            .json(body)
            .build()
            .with_context(|| format!("Failed to build POST request for {path}"))?;
        let response = Self::check(self.send(request).await?).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {path}"))
    }

    async fn put_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let request = self
            .http
            .put(self.url(path))
            .json(body)
            .build()
            .with_context(|| format!("Failed to build PUT request for {path}"))?;
        let response = Self::check(self.send(request).await?).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {path}"))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let request = self
            .http
            .delete(self.url(path))
            .build()
            .with_context(|| format!("Failed to build DELETE request for {path}"))?;
        Self::check(self.send(request).await?).await?;
        Ok(())
    }

    // ===== Auth =====

    /// Sign in and commit the session. `remember` picks the durable
    /// store; otherwise credentials stay volatile.
    ///
    /// Auth endpoints bypass the intercepting send path: a 401 here
    /// means bad credentials, not an expired token.
    pub async fn login(&self, email: &str, password: &str, remember: bool) -> Result<UserProfile> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response = self
            .http
            .post(self.url("/auth/login"))
            .json(&body)
            .send()
            .await
            .context("Failed to send login request")?;
        let response = Self::check(response).await?;
        let auth: AuthResponse = response.json().await.context("Failed to parse login response")?;

        let profile = auth.user.clone();
        self.session
            .commit_login(&auth.into(), remember)
            .context("Failed to persist session")?;
        info!(role = %profile.role, "signed in");
        Ok(profile)
    }

    /// Create an account and commit the session, like `login`.
    pub async fn register(&self, request: &RegisterRequest, remember: bool) -> Result<UserProfile> {
        let response = self
            .http
            .post(self.url("/auth/register"))
            .json(request)
            .send()
            .await
            .context("Failed to send registration request")?;
        let response = Self::check(response).await?;
        let auth: AuthResponse = response
            .json()
            .await
            .context("Failed to parse registration response")?;

        let profile = auth.user.clone();
        self.session
            .commit_login(&auth.into(), remember)
            .context("Failed to persist session")?;
        info!(role = %profile.role, "account registered");
        Ok(profile)
    }

    /// Sign out: best-effort server-side revocation, then clear both
    /// local stores unconditionally.
    pub async fn logout(&self) -> Result<()> {
        match self.http.post(self.url("/auth/logout")).build() {
            Ok(request) => {
                if let Err(e) = self.send(request).await {
                    debug!(error = %e, "server-side logout failed, clearing locally anyway");
                }
            }
            Err(e) => debug!(error = %e, "could not build logout request"),
        }
        self.session.logout()
    }

    /// Fetch the signed-in user and re-cache the profile snapshot.
    pub async fn me(&self) -> Result<UserProfile> {
        let profile: UserProfile = self.get_json("/auth/me").await?;
        self.session.update_profile(&profile)?;
        Ok(profile)
    }

    // ===== Catalog =====

    /// Browse the course catalog, optionally filtered by a search term.
    pub async fn fetch_catalog(&self, search: Option<&str>) -> Result<Vec<CourseSummary>> {
        let mut builder = self.http.get(self.url("/courses"));
        if let Some(q) = search {
            builder = builder.query(&[("search", q)]);
        }
        let request = builder.build().context("Failed to build catalog request")?;
        let response = Self::check(self.send(request).await?).await?;
        response
            .json()
            .await
            .context("Failed to parse catalog response")
    }

    pub async fn fetch_course(&self, course_id: &str) -> Result<Course> {
        self.get_json(&format!("/courses/{course_id}")).await
    }

    // ===== Creator content =====

    /// Create a new course draft.
    pub async fn create_course(&self, draft: &CourseDraft) -> Result<Course> {
        self.post_json("/courses", draft).await
    }

    /// Request an upload ticket for course media. The actual file
    /// transfer goes straight to the returned URL.
    pub async fn request_upload(
        &self,
        course_id: &str,
        file_name: &str,
        content_type: &str,
    ) -> Result<UploadTicket> {
        let body = UploadRequest {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
        };
        self.post_json(&format!("/courses/{course_id}/assets"), &body)
            .await
    }

    pub async fn publish_course(&self, course_id: &str) -> Result<Course> {
        self.post_json(&format!("/courses/{course_id}/publish"), &serde_json::json!({}))
            .await
    }

    // ===== Billing =====

    pub async fn fetch_plans(&self) -> Result<Vec<Plan>> {
        self.get_json("/plans").await
    }

    /// The caller's current subscription, or None when they have none.
    pub async fn fetch_subscription(&self) -> Result<Option<Subscription>> {
        match self.get_json::<Subscription>("/billing/subscription").await {
            Ok(subscription) => Ok(Some(subscription)),
            Err(e) => match e.downcast_ref::<ApiError>() {
                Some(ApiError::NotFound(_)) => Ok(None),
                _ => Err(e),
            },
        }
    }

    /// Subscribe to a plan. Marks the purchase in the session store so
    /// pricing surfaces can gate synchronously.
    pub async fn subscribe(&self, plan_id: &str) -> Result<Subscription> {
        let body = SubscribeRequest {
            plan_id: plan_id.to_string(),
        };
        let subscription: Subscription = self.post_json("/billing/subscribe", &body).await?;
        self.session.mark_purchased()?;
        Ok(subscription)
    }

    pub async fn cancel_subscription(&self) -> Result<()> {
        self.delete("/billing/subscription").await
    }

    // ===== Business site builder =====

    pub async fn fetch_templates(&self) -> Result<Vec<SiteTemplate>> {
        self.get_json("/sites/templates").await
    }

    /// Apply a template to the tenant's site. The applied template id is
    /// cached next to the session for the builder UI.
    pub async fn apply_template(&self, template_id: &str) -> Result<GeneratedSite> {
        let body = ApplyTemplateRequest {
            template_id: template_id.to_string(),
        };
        let site: GeneratedSite = self.post_json("/sites/apply", &body).await?;
        self.session.cache_applied_template(&site.template_id)?;
        Ok(site)
    }

    pub async fn fetch_site(&self) -> Result<GeneratedSite> {
        self.get_json("/sites/mine").await
    }

    // ===== Dashboards =====

    /// Fetch the dashboard summary for the caller's role.
    pub async fn fetch_dashboard(&self) -> Result<Dashboard> {
        self.get_json("/dashboard").await
    }

    // ===== Admin =====

    pub async fn list_users(&self, page: u32) -> Result<UserPage> {
        let request = self
            .http
            .get(self.url("/admin/users"))
            .query(&[("page", page)])
            .build()
            .context("Failed to build user listing request")?;
        let response = Self::check(self.send(request).await?).await?;
        response
            .json()
            .await
            .context("Failed to parse user listing response")
    }

    pub async fn set_user_role(&self, user_id: &str, role: Role) -> Result<UserProfile> {
        let body = SetRoleRequest { role };
        self.put_json(&format!("/admin/users/{user_id}/role"), &body)
            .await
    }
}

// ============================================================================
// Refresh transport
// ============================================================================

/// Exchanges the refresh token at `POST /auth/refresh`.
///
/// Uses the raw reqwest client on purpose: the refresh call must never
/// flow through the intercepting send path, so a 401 from the refresh
/// endpoint is terminal instead of triggering another refresh.
struct HttpRefreshTransport {
    http: Client,
    refresh_url: String,
}

#[async_trait]
impl RefreshTransport for HttpRefreshTransport {
    async fn exchange(&self, refresh_token: &str) -> Result<RefreshedTokens, RefreshError> {
        let body = RefreshRequest {
            refresh_token: refresh_token.to_string(),
        };
        let response = self
            .http
            .post(&self.refresh_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RefreshError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, "refresh rejected by server");
            return Err(RefreshError::Rejected(format!("status {status}")));
        }

        let tokens: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::Rejected(format!("unparseable refresh response: {e}")))?;

        Ok(RefreshedTokens {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        })
    }
}

// Internal request body types

#[derive(Debug, Serialize, Deserialize)]
struct UploadRequest {
    #[serde(rename = "fileName")]
    file_name: String,
    #[serde(rename = "contentType")]
    content_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SubscribeRequest {
    #[serde(rename = "planId")]
    plan_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApplyTemplateRequest {
    #[serde(rename = "templateId")]
    template_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SetRoleRequest {
    role: Role,
}
