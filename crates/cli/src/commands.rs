// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand handlers. Each returns the process exit code.

use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use disker_client::api::{Campaign, CampaignDetail, CampaignPage};
use disker_client::token::{epoch_secs, expiry_claim};
use disker_client::{ApiClient, ApiError, AuthUser};

use crate::{Cli, Command};

pub async fn run(cli: Cli) -> i32 {
    let client = match ApiClient::new(cli.client) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e}");
            return 1;
        }
    };
    client.hydrate();
    let signed_in = client.session().is_authenticated();
    debug!(base_url = %client.config().base_url, signed_in, "session loaded");

    match execute(&client, cli.command, cli.json).await {
        Ok(()) => 0,
        Err(e) => {
            let session_lost = signed_in && !client.session().is_authenticated();
            report(&e, session_lost);
            1
        }
    }
}

async fn execute(client: &ApiClient, command: Command, json: bool) -> Result<(), ApiError> {
    match command {
        Command::Login { email, password } => {
            let user = client.login(&email, &password).await?;
            print_signed_in(user.as_ref(), json);
        }
        Command::LoginGoogle { id_token } => {
            let user = client.login_with_google(&id_token).await?;
            print_signed_in(user.as_ref(), json);
        }
        Command::Logout => {
            client.logout();
            if !json {
                println!("Signed out.");
            }
        }
        Command::Whoami { fetch } => {
            if fetch {
                client.current_user().await?;
            }
            match client.store().current_user() {
                Some(user) if json => print_json(&user),
                Some(user) => print_user(&user),
                None if client.session().is_authenticated() => {
                    println!("Signed in; no profile cached (try --fetch).")
                }
                None => {
                    println!("Not signed in.");
                }
            }
        }
        Command::Status => {
            let status = SessionStatus::from_client(client);
            if json {
                print_json(&status);
            } else {
                print_status(&status);
            }
        }
        Command::Campaigns { scope } => {
            let page = client.campaigns(scope).await?;
            if json {
                print_json(&page.campaigns);
            } else {
                print_campaigns(&page);
            }
        }
        Command::Campaign { id } => {
            let detail = client.campaign(id).await?;
            if json {
                print_json(&detail);
            } else {
                print_campaign(&detail);
            }
        }
    }
    Ok(())
}

fn report(e: &ApiError, session_lost: bool) {
    eprintln!("error: {e}");
    if session_lost || e.ends_session() {
        eprintln!("Your session has ended. Run `disker login` to sign in again.");
    } else if e.is_auth_rejection() {
        eprintln!("The server rejected your credentials. Run `disker login` to sign in again.");
    }
}

/// Local view of the session, for `disker status`.
#[derive(Debug, Serialize)]
struct SessionStatus {
    signed_in: bool,
    user: Option<String>,
    hydrated: bool,
    has_refresh_token: bool,
    /// Seconds until the access token expires; negative when already expired.
    access_expires_in: Option<i64>,
    refresh_armed_in: Option<u64>,
    last_fetched_user_at: Option<u64>,
}

impl SessionStatus {
    fn from_client(client: &ApiClient) -> Self {
        let state = client.session();
        let access_expires_in = state
            .credentials
            .access_token
            .as_deref()
            .and_then(expiry_claim)
            .map(|exp| exp as i64 - epoch_secs() as i64);
        Self {
            signed_in: state.is_authenticated(),
            user: state.current_user.as_ref().map(display_user),
            hydrated: state.is_hydrated,
            has_refresh_token: state.credentials.refresh_token.is_some(),
            access_expires_in,
            refresh_armed_in: client.scheduler().remaining().map(|d| d.as_secs()),
            last_fetched_user_at: state.last_fetched_user_at,
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("error: {e}"),
    }
}

fn print_signed_in(user: Option<&AuthUser>, json: bool) {
    match (user, json) {
        (Some(user), true) => print_json(user),
        (Some(user), false) => println!("Signed in as {}.", display_user(user)),
        (None, true) => println!("null"),
        (None, false) => println!("Signed in."),
    }
}

fn print_user(user: &AuthUser) {
    println!("id:     {}", user.id);
    println!("email:  {}", user.email);
    println!("name:   {}", user.name.as_deref().unwrap_or(DASH));
    println!("role:   {}", user.role.as_deref().unwrap_or(DASH));
}

fn print_status(status: &SessionStatus) {
    println!("signed in:       {}", yes_no(status.signed_in));
    println!("user:            {}", status.user.as_deref().unwrap_or(DASH));
    println!("hydrated:        {}", yes_no(status.hydrated));
    println!("refresh token:   {}", if status.has_refresh_token { "held" } else { "none" });
    println!("access expires:  {}", format_expires(status.access_expires_in));
    println!(
        "next refresh:    {}",
        status
            .refresh_armed_in
            .map(|s| format_duration(Duration::from_secs(s)))
            .unwrap_or_else(|| DASH.to_owned())
    );
}

fn print_campaigns(page: &CampaignPage) {
    if page.campaigns.is_empty() {
        println!("No campaigns.");
        return;
    }
    let status_w = page.campaigns.iter().map(|c| c.status.len()).max().unwrap_or(0).max(6);
    println!("{:<8}  {:<status_w$}  {:<10}  {:<12}  TITLE", "ID", "STATUS", "LAUNCH", "PLATFORMS");
    for c in &page.campaigns {
        println!(
            "{:<8}  {:<status_w$}  {:<10}  {:<12}  {}",
            c.id,
            c.status,
            c.launch_date.as_deref().unwrap_or(DASH),
            platforms(c),
            c.title
        );
    }
    if let Some(ref p) = page.pagination {
        println!();
        println!("page {}/{} ({} total)", p.current_page, p.total_pages, p.total_count);
    }
}

fn print_campaign(detail: &CampaignDetail) {
    let c = &detail.campaign;
    println!("{} (#{})", c.title, c.id);
    println!("status:     {}", c.status);
    println!("launch:     {}", c.launch_date.as_deref().unwrap_or(DASH));
    println!("platforms:  {}", platforms(c));
    if let Some(ref offer) = detail.offer {
        println!("offer:      {:.2} {}", offer.price, offer.currency);
    }
}

const DASH: &str = "\u{2014}";

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

fn display_user(user: &AuthUser) -> String {
    match user.name {
        Some(ref name) => format!("{name} <{}>", user.email),
        None => user.email.clone(),
    }
}

fn platforms(campaign: &Campaign) -> String {
    if campaign.platforms.is_empty() {
        return DASH.to_owned();
    }
    campaign.platforms.iter().map(|p| p.short_name.as_str()).collect::<Vec<_>>().join(",")
}

fn format_expires(secs: Option<i64>) -> String {
    match secs {
        Some(s) if s <= 0 => "expired".to_owned(),
        Some(s) => format!("in {}", format_duration(Duration::from_secs(s as u64))),
        None => DASH.to_owned(),
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m")
    } else {
        format!("{m}m {s:02}s")
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
