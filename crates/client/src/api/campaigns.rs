// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::envelope::Pagination;
use crate::error::ApiError;
use crate::transport::ApiRequest;

pub const CAMPAIGNS_PATH: &str = "/api/v1/talents/campaigns";

/// Which campaigns to list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CampaignScope {
    #[default]
    Active,
    Applied,
    Finished,
}

impl CampaignScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Applied => "applied",
            Self::Finished => "finished",
        }
    }
}

impl fmt::Display for CampaignScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignPlatform {
    pub name: String,
    pub short_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: u64,
    pub title: String,
    pub status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub launch_date: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub platforms: Vec<CampaignPlatform>,
}

/// Payment offered for a campaign. `contents` maps platform to deliverables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignOffer {
    pub price: f64,
    pub currency: String,
    #[serde(default)]
    pub contents: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignDetail {
    #[serde(flatten)]
    pub campaign: Campaign,
    #[serde(default)]
    pub offer: Option<CampaignOffer>,
}

/// One page of campaigns.
#[derive(Debug, Clone)]
pub struct CampaignPage {
    pub campaigns: Vec<Campaign>,
    pub pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct CampaignsData {
    #[serde(default)]
    campaigns: Vec<Campaign>,
}

#[derive(Deserialize)]
struct CampaignData {
    campaign: CampaignDetail,
}

impl ApiClient {
    pub async fn campaigns(&self, scope: CampaignScope) -> Result<CampaignPage, ApiError> {
        let request = ApiRequest::get(CAMPAIGNS_PATH).query("scope", scope.as_str());
        let envelope = self.request_json::<CampaignsData>(request).await?;
        let pagination = envelope.pagination().cloned();
        let campaigns = envelope.data.map(|d| d.campaigns).unwrap_or_default();
        Ok(CampaignPage { campaigns, pagination })
    }

    pub async fn campaign(&self, id: u64) -> Result<CampaignDetail, ApiError> {
        let envelope = self.get_json::<CampaignData>(format!("{CAMPAIGNS_PATH}/{id}")).await?;
        Ok(envelope.into_data(200)?.campaign)
    }
}
