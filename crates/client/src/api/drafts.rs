// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::transport::{ApiRequest, FormPart};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub id: u64,
    pub title: String,
    /// `pending`, `approved` or `rejected`.
    pub status: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Content uploaded with a draft.
#[derive(Debug, Clone)]
pub struct DraftFile {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Bytes,
}

/// A draft submission: a title plus a link, a file, or both.
#[derive(Debug, Clone)]
pub struct NewDraft {
    pub title: String,
    pub url: Option<String>,
    pub file: Option<DraftFile>,
}

impl NewDraft {
    fn into_parts(self) -> Vec<FormPart> {
        let mut parts = vec![FormPart::text("draft[title]", self.title)];
        if let Some(url) = self.url {
            parts.push(FormPart::text("draft[url]", url));
        }
        if let Some(file) = self.file {
            parts.push(FormPart::File {
                name: "draft[file]".to_owned(),
                file_name: file.file_name,
                mime: file.mime,
                bytes: file.bytes,
            });
        }
        parts
    }
}

#[derive(Deserialize)]
struct DraftData {
    draft: Draft,
}

#[derive(Deserialize)]
struct DraftsData {
    #[serde(default)]
    drafts: Vec<Draft>,
}

fn drafts_path(campaign_post_id: u64) -> String {
    format!("/api/v1/talents/campaign_posts/{campaign_post_id}/drafts")
}

impl ApiClient {
    /// Submit a draft for a campaign post as a multipart form.
    pub async fn create_draft(
        &self,
        campaign_post_id: u64,
        draft: NewDraft,
    ) -> Result<Draft, ApiError> {
        let request = ApiRequest::post(drafts_path(campaign_post_id)).multipart(draft.into_parts());
        let envelope = self.request_json::<DraftData>(request).await?;
        Ok(envelope.into_data(201)?.draft)
    }

    pub async fn drafts(&self, campaign_post_id: u64) -> Result<Vec<Draft>, ApiError> {
        let envelope = self.get_json::<DraftsData>(drafts_path(campaign_post_id)).await?;
        Ok(envelope.data.map(|d| d.drafts).unwrap_or_default())
    }
}
