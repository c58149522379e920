use crate::capabilities::{Capability, CapabilityResult, required, segment};
use crate::client::RemoteClient;
use crate::client::WriteReceipt;
use crate::client::contacts::{AddressBook, Contact, ContactData};
use crate::error::invalid_params;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parameters for nc_contacts_list_contacts
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct ListContactsRequest {
    #[schemars(description = "Name of the addressbook, as returned by nc_contacts_list_addressbooks")]
    pub addressbook: String,
}

/// Parameters for nc_contacts_create_addressbook
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CreateAddressbookRequest {
    #[schemars(description = "URL name of the new addressbook, e.g. \"personal\"")]
    pub name: String,

    #[schemars(description = "Human readable name, e.g. \"Personal\"")]
    pub display_name: String,
}

/// Parameters for nc_contacts_delete_addressbook
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DeleteAddressbookRequest {
    #[schemars(description = "URL name of the addressbook to delete")]
    pub name: String,
}

/// Parameters for nc_contacts_create_contact
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct CreateContactRequest {
    #[schemars(description = "Name of the addressbook to create the contact in")]
    pub addressbook: String,

    #[schemars(description = "Unique id of the new contact")]
    pub uid: String,

    #[schemars(description = "Contact fields; \"fn\" is required")]
    pub contact_data: ContactData,
}

/// Parameters for nc_contacts_delete_contact
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct DeleteContactRequest {
    pub addressbook: String,
    pub uid: String,
}

/// Parameters for nc_contacts_update_contact
#[derive(Debug, Deserialize, Serialize, JsonSchema)]
pub struct UpdateContactRequest {
    pub addressbook: String,

    pub uid: String,

    #[schemars(description = "Fields to replace; properties not listed are kept as they are")]
    pub contact_data: ContactData,

    #[serde(default)]
    #[schemars(
        description = "ETag from a previous read; the update fails if the contact changed since (optional, defaults to the current ETag)"
    )]
    pub etag: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListAddressbooksResponse {
    pub addressbooks: Vec<AddressBook>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListContactsResponse {
    pub contacts: Vec<Contact>,
}

/// Capability for CardDAV addressbooks and contacts
pub struct ContactsCapability {
    client: Arc<dyn RemoteClient>,
}

impl ContactsCapability {
    pub fn new(client: Arc<dyn RemoteClient>) -> Self {
        Self { client }
    }

    pub async fn list_addressbooks(&self) -> CapabilityResult<ListAddressbooksResponse> {
        let addressbooks = self.client.contacts().list_addressbooks().await?;
        Ok(ListAddressbooksResponse { addressbooks })
    }

    pub async fn list_contacts(
        &self,
        request: ListContactsRequest,
    ) -> CapabilityResult<ListContactsResponse> {
        let addressbook = segment("addressbook", &request.addressbook)?;
        let contacts = self.client.contacts().list_contacts(addressbook).await?;
        Ok(ListContactsResponse { contacts })
    }

    pub async fn create_addressbook(
        &self,
        request: CreateAddressbookRequest,
    ) -> CapabilityResult<WriteReceipt> {
        let name = segment("name", &request.name)?;
        let display_name = required("display_name", &request.display_name)?;
        Ok(self
            .client
            .contacts()
            .create_addressbook(name, display_name)
            .await?)
    }

    pub async fn delete_addressbook(
        &self,
        request: DeleteAddressbookRequest,
    ) -> CapabilityResult<WriteReceipt> {
        let name = segment("name", &request.name)?;
        Ok(self.client.contacts().delete_addressbook(name).await?)
    }

    pub async fn create_contact(
        &self,
        request: CreateContactRequest,
    ) -> CapabilityResult<WriteReceipt> {
        let addressbook = segment("addressbook", &request.addressbook)?;
        let uid = segment("uid", &request.uid)?;
        let data = &request.contact_data;
        if data.full_name.as_deref().is_none_or(|v| v.trim().is_empty()) {
            return Err(invalid_params("contact_data.fn is required"));
        }
        data.validate()?;
        Ok(self
            .client
            .contacts()
            .create_contact(addressbook, uid, data)
            .await?)
    }

    pub async fn delete_contact(
        &self,
        request: DeleteContactRequest,
    ) -> CapabilityResult<WriteReceipt> {
        let addressbook = segment("addressbook", &request.addressbook)?;
        let uid = segment("uid", &request.uid)?;
        Ok(self.client.contacts().delete_contact(addressbook, uid).await?)
    }

    pub async fn update_contact(
        &self,
        request: UpdateContactRequest,
    ) -> CapabilityResult<WriteReceipt> {
        let addressbook = segment("addressbook", &request.addressbook)?;
        let uid = segment("uid", &request.uid)?;
        if request.contact_data.is_empty() {
            return Err(invalid_params("contact_data must contain at least one field"));
        }
        request.contact_data.validate()?;
        Ok(self
            .client
            .contacts()
            .update_contact(addressbook, uid, &request.contact_data, &request.etag)
            .await?)
    }
}

impl Capability for ContactsCapability {
    fn id(&self) -> &'static str {
        "contacts"
    }

    fn description(&self) -> &'static str {
        "List, create, update and delete addressbooks and contacts (CardDAV)"
    }
}
