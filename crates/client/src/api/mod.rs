// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Marketplace endpoints called through the authenticated pipeline.

pub mod campaigns;
pub mod drafts;

pub use campaigns::{
    Campaign, CampaignDetail, CampaignOffer, CampaignPage, CampaignPlatform, CampaignScope,
};
pub use drafts::{Draft, DraftFile, NewDraft};
