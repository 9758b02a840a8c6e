//! Signed-in account and identity resolution
//!
//! Every address book path is scoped by the account's `pceId`. Resolving it
//! takes two calls: `GET /accounts` to find the signed-in account's
//! `commsId`, then `GET /users/{commsId}/identities` to map it to a `pceId`.

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::{
    client::{ensure_success, CloudClient},
    CloudError,
};

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    comms_id: Option<String>,
    directed_id: Option<String>,
    #[serde(default)]
    signed_in_user: bool,
    comms_provision_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    pce_id: Option<String>,
}

// ============================================================================
// Account
// ============================================================================

/// Provisioning state of the address book service for an account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStatus {
    Unknown,
    Provisioned,
    Deprovisioned,
    AutoProvisioned,
}

impl ProvisionStatus {
    fn parse(value: &str) -> Result<Self, CloudError> {
        match value {
            "UNKNOWN" => Ok(ProvisionStatus::Unknown),
            "PROVISIONED" => Ok(ProvisionStatus::Provisioned),
            "DEPROVISIONED" => Ok(ProvisionStatus::Deprovisioned),
            "AUTO_PROVISIONED" => Ok(ProvisionStatus::AutoProvisioned),
            other => Err(CloudError::InvalidResponse(format!(
                "unknown commsProvisionStatus '{other}'"
            ))),
        }
    }

    /// Whether the service must be asked to provision the account
    pub fn needs_provisioning(&self) -> bool {
        matches!(self, ProvisionStatus::Unknown | ProvisionStatus::Deprovisioned)
    }
}

/// The signed-in account as reported by the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Empty until the account is provisioned
    pub comms_id: String,
    pub directed_id: String,
    pub provision_status: ProvisionStatus,
}

/// Fetch the account flagged `signedInUser`
pub async fn signed_in_account(client: &CloudClient) -> Result<Account, CloudError> {
    let accounts: Vec<AccountResponse> = client.get_json("/accounts", &[]).await?;

    let account = accounts
        .into_iter()
        .find(|account| account.signed_in_user)
        .ok_or_else(|| CloudError::InvalidResponse("no signed-in account".to_string()))?;

    let directed_id = account
        .directed_id
        .ok_or_else(|| CloudError::InvalidResponse("directedId not present".to_string()))?;
    let status = account
        .comms_provision_status
        .ok_or_else(|| CloudError::InvalidResponse("commsProvisionStatus not present".to_string()))?;

    Ok(Account {
        comms_id: account.comms_id.unwrap_or_default(),
        directed_id,
        provision_status: ProvisionStatus::parse(&status)?,
    })
}

/// Map a `commsId` to the `pceId` used in address book paths
pub async fn resolve_pce_id(client: &CloudClient, comms_id: &str) -> Result<String, CloudError> {
    let path = format!("/users/{comms_id}/identities");
    let identity: IdentityResponse = client
        .get_json(&path, &[("includeUserName", "false")])
        .await?;

    match identity.pce_id {
        Some(pce_id) if !pce_id.is_empty() => {
            debug!("Resolved account identity");
            Ok(pce_id)
        }
        _ => Err(CloudError::InvalidResponse("pceId not present".to_string())),
    }
}

/// Resolve the `pceId` of the signed-in account, failing with
/// [`CloudError::AccountNotProvisioned`] if it has no comms identity yet
pub async fn provisioned_pce_id(client: &CloudClient) -> Result<String, CloudError> {
    let account = signed_in_account(client).await?;
    if account.comms_id.is_empty() {
        return Err(CloudError::AccountNotProvisioned(format!(
            "account status {:?} has no commsId",
            account.provision_status
        )));
    }
    resolve_pce_id(client, &account.comms_id).await
}

/// Ask the service to provision `directed_id`
pub async fn request_auto_provision(
    client: &CloudClient,
    directed_id: &str,
) -> Result<(), CloudError> {
    let path = format!("/accounts/{directed_id}/users");
    let body = json!({ "autoProvision": true });
    let response = client.send(Method::POST, &path, &[], Some(&body)).await?;
    ensure_success(&response)?;

    info!("Account auto-provisioning requested");
    Ok(())
}
