//! HTTP client for the grading and directory service.
//!
//! Thin typed wrapper over the REST API. Non-2xx responses carry a
//! `{"message": ...}` body; that message is surfaced in `RemoteError::Api`
//! so the CLI can print what the server actually said.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::auth::{AccountRole, AuthIdentity};
use crate::candidate::{CandidateId, Profile};
use crate::error::RemoteError;
use crate::session::{FinalSummary, SessionState};
use crate::storage::Config;

use super::{Evaluation, FinalizeRequest, GradeRequest, InterviewService, NextQuestionRequest};

/// One row of the server-side candidate directory, already sorted by the
/// server (best score first). The server returns its documents raw, so
/// everything beyond the id and role is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRow {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub role: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub final_score: Option<f64>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub recommendation: Option<RowRecommendation>,
}

/// Recommendation as it appears on a directory row; partial documents are
/// common, so both fields are optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowRecommendation {
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub justification: Option<String>,
}

pub struct HttpInterviewClient {
    base_url: String,
    http_client: Client,
    token: Option<String>,
}

impl HttpInterviewClient {
    /// Build a client against the configured base URL.
    ///
    /// # Errors
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        Url::parse(&config.remote.base_url)?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.remote.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.remote.base_url.trim_end_matches('/').to_string(),
            http_client,
            token: None,
        })
    }

    /// Attach a bearer token for account-scoped endpoints.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    // ── Accounts ─────────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthIdentity, RemoteError> {
        let body = json!({ "email": email, "password": password });
        let resp: AuthResponse = self
            .request_json(Method::POST, "users/login", Some(&body))
            .await?;
        Ok(resp.into_identity())
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: AccountRole,
    ) -> Result<AuthIdentity, RemoteError> {
        let body = json!({
            "name": name,
            "email": email,
            "password": password,
            "role": role,
        });
        let resp: AuthResponse = self
            .request_json(Method::POST, "users/register", Some(&body))
            .await?;
        Ok(resp.into_identity())
    }

    // ── Candidates ───────────────────────────────────────────────────

    /// Push collected contact details to the candidate's directory record.
    pub async fn update_details(
        &self,
        candidate_id: &CandidateId,
        profile: &Profile,
    ) -> Result<(), RemoteError> {
        let path = format!("candidates/{}", candidate_id.to_wire());
        let body = json!({
            "name": profile.name,
            "email": profile.email,
            "phone": profile.phone,
            "role": profile.role,
        });
        let _: serde_json::Value = self
            .request_json(Method::PATCH, &path, Some(&body))
            .await?;
        Ok(())
    }

    /// Upload the session's profile and transcript under the signed-in
    /// account. The server upserts a candidate record keyed by the account
    /// and returns the document it created.
    pub async fn sync_session(&self, state: &SessionState) -> Result<CandidateId, RemoteError> {
        #[derive(Deserialize)]
        struct SyncResponse {
            candidate: SyncedCandidate,
        }
        #[derive(Deserialize)]
        struct SyncedCandidate {
            #[serde(rename = "_id")]
            id: String,
        }
        let body = json!({
            "name": state.profile.name,
            "email": state.profile.email,
            "phone": state.profile.phone,
            "role": state.profile.role,
            "history": state.history,
            "currentQuestionIndex": state.current_question_index,
        });
        let resp: SyncResponse = self
            .request_json(Method::POST, "candidates/sync", Some(&body))
            .await?;
        Ok(CandidateId::Issued(resp.candidate.id))
    }

    /// The interviewer-facing directory, best score first.
    pub async fn fetch_candidates(&self) -> Result<Vec<CandidateRow>, RemoteError> {
        self.request_json(Method::GET, "candidates", None).await
    }

    /// Resolve an interviewer-created session link to its target role.
    pub async fn join_session(&self, session_id: &str) -> Result<String, RemoteError> {
        #[derive(Deserialize)]
        struct SessionResponse {
            role: String,
        }
        let path = format!("sessions/{session_id}");
        let resp: SessionResponse = self.request_json(Method::GET, &path, None).await?;
        Ok(resp.role)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn builder(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self.http_client.request(method, self.endpoint(path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, RemoteError> {
        let mut builder = self.builder(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("message")?.as_str().map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let value = resp.json::<serde_json::Value>().await?;
        serde_json::from_value(value).map_err(|e| RemoteError::Malformed(e.to_string()))
    }
}

impl InterviewService for HttpInterviewClient {
    async fn next_question(&self, request: NextQuestionRequest) -> Result<String, RemoteError> {
        #[derive(Deserialize)]
        struct QuestionResponse {
            question: String,
        }
        // The generator only needs the question texts already asked.
        let prior: Vec<&str> = request.history.iter().map(|r| r.question.as_str()).collect();
        let body = json!({
            "candidateId": request.candidate_id.to_wire(),
            "role": request.role,
            "difficulty": request.difficulty,
            "history": prior,
        });
        let resp: QuestionResponse = self
            .request_json(Method::POST, "interview/question", Some(&body))
            .await?;
        Ok(resp.question)
    }

    async fn grade_answer(&self, request: GradeRequest) -> Result<Evaluation, RemoteError> {
        let body = json!({
            "candidateId": request.candidate_id.to_wire(),
            "question": request.question,
            "answer": request.answer,
        });
        self.request_json(Method::POST, "interview/answer", Some(&body))
            .await
    }

    async fn finalize(&self, request: FinalizeRequest) -> Result<FinalSummary, RemoteError> {
        #[derive(Deserialize)]
        struct CompleteResponse {
            candidate: FinalSummary,
        }
        // The server already holds the transcript; only the id travels.
        let body = json!({ "candidateId": request.candidate_id.to_wire() });
        let resp: CompleteResponse = self
            .request_json(Method::POST, "interview/complete", Some(&body))
            .await?;
        Ok(resp.candidate)
    }
}

/// Login and register both answer with the flat user document plus a
/// token. The account's candidate record id is not part of it; that is
/// learned later, from a sync.
#[derive(Deserialize)]
struct AuthResponse {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    role: AccountRole,
    token: String,
}

impl AuthResponse {
    fn into_identity(self) -> AuthIdentity {
        AuthIdentity {
            token: self.token,
            user_id: self.id,
            name: self.name,
            email: self.email,
            role: self.role,
            candidate_id: None,
        }
    }
}
