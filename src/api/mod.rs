//! Typed client for the supervision REST API.
//!
//! The wire contract is owned by the backend; this module only calls it. Every
//! successful body is a `{ "data": ... }` envelope and every failure becomes an
//! [`ApiError`].

mod error;
pub mod normalize;

pub use error::{log_error, ApiError};

use crate::config::Settings;
use crate::model::{
    CoSupervisorInvitation, Document, Envelope, Meeting, Milestone, RelationshipBundle,
    ResearchItem, SupervisionRelationship, SupervisionRequest, ViewerRole,
};
use crate::source::{CandidateSource, ConnectionEntry, SearchHit, ShortlistEntry};
use reqwest::{header, multipart, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A file read from disk, ready to be sent as a multipart part.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub async fn read(path: &Path) -> Result<Self, ApiError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ApiError::File {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self { file_name, bytes })
    }

    fn into_part(self) -> multipart::Part {
        multipart::Part::bytes(self.bytes).file_name(self.file_name)
    }
}

/// Proposal submitted by a student to a prospective supervisor.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub academician_id: u64,
    pub proposal_title: String,
    pub motivation: String,
    pub attachments: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Rejection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recommended_supervisors: Vec<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoSupervisorInvite {
    pub academician_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMeeting {
    pub title: String,
    /// RFC 3339 timestamp.
    pub scheduled_for: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agenda: Option<String>,
}

/// Body of a successful mutating call. Only the message is of interest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|_| ApiError::BaseUrl(settings.base_url.clone()))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .user_agent(format!("supervision-cli/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .map_err(ApiError::Network)?;

        Ok(Self {
            http,
            base_url,
            token: settings.token.clone(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&joined).map_err(|_| ApiError::BaseUrl(joined))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send_raw(&self, builder: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let resp = self.authorize(builder).send().await.map_err(ApiError::Network)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(ApiError::Network)?;
        if !status.is_success() {
            return Err(ApiError::from_response(status, &body));
        }
        Ok(body.to_vec())
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let body = self.send_raw(builder).await?;
        serde_json::from_slice::<Envelope<T>>(&body)
            .map(|env| env.data)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn mutate(&self, builder: RequestBuilder) -> Result<Ack, ApiError> {
        let body = self.send_raw(builder).await?;
        // 204s and non-JSON success bodies are still successes.
        Ok(serde_json::from_slice(&body).unwrap_or_default())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        tracing::debug!(path, "GET");
        self.fetch(self.http.get(self.url(path)?)).await
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Ack, ApiError> {
        tracing::debug!(path, "POST");
        self.mutate(self.http.post(self.url(path)?).json(body)).await
    }

    async fn post_empty(&self, path: &str) -> Result<Ack, ApiError> {
        tracing::debug!(path, "POST");
        self.mutate(self.http.post(self.url(path)?)).await
    }

    async fn post_multipart(&self, path: &str, form: multipart::Form) -> Result<Ack, ApiError> {
        tracing::debug!(path, "POST multipart");
        self.mutate(self.http.post(self.url(path)?).multipart(form)).await
    }

    // Requests

    pub async fn list_requests(&self) -> Result<Vec<SupervisionRequest>, ApiError> {
        self.get("supervision/requests").await
    }

    pub async fn get_request(&self, id: u64) -> Result<SupervisionRequest, ApiError> {
        self.get(&format!("supervision/requests/{id}")).await
    }

    pub async fn submit_request(&self, req: &NewRequest) -> Result<Ack, ApiError> {
        let mut form = multipart::Form::new()
            .text("academician_id", req.academician_id.to_string())
            .text("proposal_title", req.proposal_title.clone())
            .text("motivation", req.motivation.clone());
        for path in &req.attachments {
            let file = UploadFile::read(path).await?;
            form = form.part("attachments[]", file.into_part());
        }
        self.post_multipart("supervision/requests", form).await
    }

    /// Used by the supervisor for a fresh request and by the student to take an offer.
    pub async fn accept_request(&self, id: u64) -> Result<Ack, ApiError> {
        self.post_empty(&format!("supervision/requests/{id}/accept"))
            .await
    }

    pub async fn reject_request(&self, id: u64, rejection: &Rejection) -> Result<Ack, ApiError> {
        self.post(&format!("supervision/requests/{id}/reject"), rejection)
            .await
    }

    pub async fn cancel_request(&self, id: u64) -> Result<Ack, ApiError> {
        self.post_empty(&format!("supervision/requests/{id}/cancel"))
            .await
    }

    // Relationships

    pub async fn list_relationships(&self) -> Result<Vec<SupervisionRelationship>, ApiError> {
        self.get("supervision/relationships").await
    }

    pub async fn get_relationship(&self, id: u64) -> Result<SupervisionRelationship, ApiError> {
        self.get(&format!("supervision/relationships/{id}")).await
    }

    /// Load the relationship first, then its collections concurrently.
    pub async fn load_relationship_bundle(&self, id: u64) -> Result<RelationshipBundle, ApiError> {
        let relationship = self.get_relationship(id).await?;
        let (documents, milestones, meetings) = futures::try_join!(
            self.list_documents(id),
            self.list_milestones(id),
            self.list_meetings(id),
        )?;
        Ok(RelationshipBundle {
            relationship,
            documents,
            milestones,
            meetings,
        })
    }

    // Co-supervision

    pub async fn invite_cosupervisor(
        &self,
        relationship: u64,
        invite: &CoSupervisorInvite,
    ) -> Result<Ack, ApiError> {
        self.post(
            &format!("supervision/relationships/{relationship}/cosupervisor/invite"),
            invite,
        )
        .await
    }

    pub async fn list_invitations(
        &self,
        relationship: u64,
    ) -> Result<Vec<CoSupervisorInvitation>, ApiError> {
        self.get(&format!(
            "supervision/relationships/{relationship}/cosupervisor/invitations"
        ))
        .await
    }

    pub async fn respond_invitation(&self, id: u64, accept: bool) -> Result<Ack, ApiError> {
        self.post(
            &format!("cosupervisor-invitations/{id}/respond"),
            &serde_json::json!({ "accept": accept }),
        )
        .await
    }

    pub async fn approve_invitation(&self, id: u64, approve: bool) -> Result<Ack, ApiError> {
        self.post(
            &format!("cosupervisor-invitations/{id}/approve"),
            &serde_json::json!({ "approve": approve }),
        )
        .await
    }

    // Relationship collections

    pub async fn list_documents(&self, relationship: u64) -> Result<Vec<Document>, ApiError> {
        self.get(&format!("relationships/{relationship}/documents"))
            .await
    }

    pub async fn upload_document(
        &self,
        relationship: u64,
        path: &Path,
        folder: Option<&str>,
    ) -> Result<Ack, ApiError> {
        let file = UploadFile::read(path).await?;
        let mut form = multipart::Form::new().part("file", file.into_part());
        if let Some(folder) = folder {
            form = form.text("folder", folder.to_string());
        }
        self.post_multipart(&format!("relationships/{relationship}/documents"), form)
            .await
    }

    pub async fn list_research(&self, relationship: u64) -> Result<Vec<ResearchItem>, ApiError> {
        self.get(&format!("relationships/{relationship}/research"))
            .await
    }

    pub async fn list_milestones(&self, relationship: u64) -> Result<Vec<Milestone>, ApiError> {
        self.get(&format!("relationships/{relationship}/milestones"))
            .await
    }

    pub async fn list_meetings(&self, relationship: u64) -> Result<Vec<Meeting>, ApiError> {
        self.get(&format!("relationships/{relationship}/meetings"))
            .await
    }

    pub async fn schedule_meeting(
        &self,
        relationship: u64,
        meeting: &NewMeeting,
    ) -> Result<Ack, ApiError> {
        self.post(&format!("relationships/{relationship}/meetings"), meeting)
            .await
    }

    // Unbind

    pub async fn request_unbind(&self, relationship: u64, reason: &str) -> Result<Ack, ApiError> {
        self.post(
            &format!("supervision/relationships/{relationship}/unbind-requests"),
            &serde_json::json!({ "reason": reason }),
        )
        .await
    }

    /// The approve/reject endpoints are split by the responding party's role.
    pub async fn respond_unbind(
        &self,
        id: u64,
        role: ViewerRole,
        approve: bool,
    ) -> Result<Ack, ApiError> {
        let verb = if approve { "approve" } else { "reject" };
        self.post_empty(&format!(
            "supervision/unbind-requests/{id}/{}/{verb}",
            role.as_path_segment()
        ))
        .await
    }

    // Candidate supervisors, tagged by where they came from.

    pub async fn shortlist(&self) -> Result<Vec<CandidateSource>, ApiError> {
        let entries: Vec<ShortlistEntry> = self.get("supervision/shortlist").await?;
        Ok(entries.into_iter().map(CandidateSource::Shortlist).collect())
    }

    pub async fn connections(&self) -> Result<Vec<CandidateSource>, ApiError> {
        let entries: Vec<ConnectionEntry> = self.get("supervision/connections").await?;
        Ok(entries.into_iter().map(CandidateSource::Connection).collect())
    }

    pub async fn search_academicians(&self, query: &str) -> Result<Vec<CandidateSource>, ApiError> {
        let mut url = self.url("academicians")?;
        url.query_pairs_mut().append_pair("search", query);
        tracing::debug!(%url, "GET");
        let hits: Vec<SearchHit> = self.fetch(self.http.get(url)).await?;
        Ok(hits.into_iter().map(CandidateSource::Search).collect())
    }
}
