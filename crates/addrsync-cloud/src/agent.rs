//! REST implementation of the cloud agent port
//!
//! [`RestCloudAgent`] adapts the address book service to the `ICloudAgent`
//! trait from `addrsync-core`. The only state it keeps between calls is the
//! account's `pceId`, resolved lazily and dropped by [`ICloudAgent::reset`].

use std::sync::{Arc, Mutex, PoisonError};

use addrsync_core::{
    config::CloudConfig,
    domain::{CloudAddressBookId, ContentType, EntriesDocument},
    ports::{
        CloudAddressBook, CloudAgentError, CloudResult, DeviceInfo, HttpResponse, IAuthDelegate,
        ICloudAgent,
    },
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{
    account,
    address_book::{self, CreateOutcome},
    client::CloudClient,
    entries, CloudError,
};

/// Address book service agent backed by [`CloudClient`]
pub struct RestCloudAgent {
    client: CloudClient,
    /// Display name given to created address books
    address_book_name: String,
    /// Cached identity used to scope every address book path
    pce_id: Mutex<Option<String>>,
}

impl RestCloudAgent {
    /// Creates an agent from the `cloud` configuration section
    pub fn new(
        config: &CloudConfig,
        auth: Arc<dyn IAuthDelegate>,
        device: &DeviceInfo,
    ) -> Result<Self, CloudError> {
        let client = CloudClient::new(config, auth, device)?;
        Ok(Self::with_client(client, config.address_book_name.clone()))
    }

    /// Creates an agent around an existing client
    pub fn with_client(client: CloudClient, address_book_name: impl Into<String>) -> Self {
        Self {
            client,
            address_book_name: address_book_name.into(),
            pce_id: Mutex::new(None),
        }
    }

    fn cached_pce_id(&self) -> Option<String> {
        self.pce_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_pce_id(&self, pce_id: Option<String>) {
        *self.pce_id.lock().unwrap_or_else(PoisonError::into_inner) = pce_id;
    }

    /// Cached `pceId`, resolving it from the service on first use
    async fn pce_id(&self) -> Result<String, CloudError> {
        if let Some(pce_id) = self.cached_pce_id() {
            return Ok(pce_id);
        }

        let pce_id = account::provisioned_pce_id(&self.client).await?;
        self.store_pce_id(Some(pce_id.clone()));
        Ok(pce_id)
    }

    async fn scoped_pce_id(&self) -> Result<String, CloudAgentError> {
        self.pce_id()
            .await
            .map_err(|e| e.into_agent_error(CloudResult::AccountNotProvisioned))
    }
}

#[async_trait]
impl ICloudAgent for RestCloudAgent {
    async fn is_account_provisioned(&self) -> bool {
        match self.pce_id().await {
            Ok(_) => true,
            Err(err) => {
                warn!(error = %err, "Account is not provisioned");
                false
            }
        }
    }

    async fn auto_provision_account(&self) -> Result<(), CloudAgentError> {
        let fail = |e: CloudError| e.into_agent_error(CloudResult::AccountNotProvisioned);

        let mut account = account::signed_in_account(&self.client).await.map_err(fail)?;
        if account.provision_status.needs_provisioning() {
            info!(status = ?account.provision_status, "Auto-provisioning account");
            account::request_auto_provision(&self.client, &account.directed_id)
                .await
                .map_err(fail)?;
            account = account::signed_in_account(&self.client).await.map_err(fail)?;
        }

        if account.comms_id.is_empty() {
            return Err(CloudAgentError::new(
                CloudResult::AccountNotProvisioned,
                "commsId still empty after provisioning",
            ));
        }

        let pce_id = account::resolve_pce_id(&self.client, &account.comms_id)
            .await
            .map_err(fail)?;
        self.store_pce_id(Some(pce_id));
        Ok(())
    }

    async fn create_and_get_cloud_address_book(
        &self,
        source_id: &str,
        content_type: ContentType,
    ) -> Result<CloudAddressBookId, CloudAgentError> {
        let pce_id = self.scoped_pce_id().await?;

        let outcome = address_book::create(
            &self.client,
            &pce_id,
            source_id,
            content_type,
            &self.address_book_name,
        )
        .await
        .map_err(|e| e.into_agent_error(CloudResult::CreateFailed))?;

        match outcome {
            CreateOutcome::Created(id) => Ok(id),
            CreateOutcome::AlreadyExists => {
                address_book::find(&self.client, &pce_id, source_id, content_type)
                    .await
                    .map_err(|e| e.into_agent_error(CloudResult::CreateFailed))?
                    .ok_or_else(|| {
                        CloudAgentError::new(
                            CloudResult::CreateFailed,
                            format!("address book {source_id} reported as existing but not found"),
                        )
                    })
            }
        }
    }

    async fn get_cloud_address_book_id(
        &self,
        source_id: &str,
        content_type: ContentType,
    ) -> Result<Option<CloudAddressBookId>, CloudAgentError> {
        let pce_id = self.scoped_pce_id().await?;
        Ok(address_book::find(&self.client, &pce_id, source_id, content_type).await?)
    }

    async fn list_cloud_address_books(&self) -> Result<Vec<CloudAddressBook>, CloudAgentError> {
        let pce_id = self.scoped_pce_id().await?;
        Ok(address_book::list(&self.client, &pce_id).await?)
    }

    async fn delete_cloud_address_book(
        &self,
        id: &CloudAddressBookId,
    ) -> Result<(), CloudAgentError> {
        let pce_id = self.scoped_pce_id().await?;
        address_book::delete(&self.client, &pce_id, id)
            .await
            .map_err(|e| e.into_agent_error(CloudResult::DeleteFailed))
    }

    async fn upload_document_to_cloud(
        &self,
        document: &EntriesDocument,
        id: &CloudAddressBookId,
    ) -> Result<HttpResponse, CloudAgentError> {
        let pce_id = self.scoped_pce_id().await?;
        Ok(entries::upload(&self.client, &pce_id, id, document).await?)
    }

    fn parse_create_address_book_entry_response(
        &self,
        response: &HttpResponse,
    ) -> Result<Vec<String>, CloudAgentError> {
        entries::parse_failed_entries(response)
            .map_err(|e| CloudAgentError::new(CloudResult::ParseFailed, e.to_string()))
    }

    fn build_failed_entries_json(&self, failed_entries: &[String]) -> String {
        entries::build_failed_entries_json(failed_entries)
    }

    fn reset(&self) {
        debug!("Dropping cached account identity");
        self.store_pce_id(None);
    }
}
