//! Emergency contact use-case service.
//!
//! # Invariants
//! - Stored contacts always pass `Contact::validate()`.
//! - At most one contact is marked primary; saving a new primary contact
//!   clears the flag on all others.
//! - Updates use full replacement semantics.

use crate::model::contact::{Contact, ContactValidationError};
use crate::model::RecordId;
use crate::repo::collection_repo::{CollectionRepository, RepoError};
use crate::store::Storage;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ContactServiceError {
    Validation(ContactValidationError),
    ContactNotFound(RecordId),
    Repo(RepoError),
}

impl Display for ContactServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ContactNotFound(id) => write!(f, "contact not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ContactServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::ContactNotFound(_) => None,
        }
    }
}

impl From<RepoError> for ContactServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ContactNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ContactValidationError> for ContactServiceError {
    fn from(value: ContactValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Contact list facade.
pub struct ContactService {
    repo: CollectionRepository<Contact>,
}

impl ContactService {
    pub fn new(storage: Storage) -> Self {
        Self {
            repo: CollectionRepository::new(storage),
        }
    }

    /// Validates and stores a new contact.
    pub fn add_contact(
        &self,
        name: &str,
        phone: &str,
        relationship: &str,
        is_primary: bool,
    ) -> Result<Contact, ContactServiceError> {
        let contact = Contact::new(name.trim(), phone.trim(), relationship.trim(), is_primary);
        contact.validate()?;

        let mut contacts = self.repo.list()?;
        if contact.is_primary {
            clear_primary(&mut contacts);
        }
        contacts.push(contact.clone());
        self.repo.write_all(&contacts)?;

        info!(
            "event=contact_add module=service status=ok contact_id={} primary={}",
            contact.id, contact.is_primary
        );
        Ok(contact)
    }

    /// Lists contacts in insertion order.
    pub fn list_contacts(&self) -> Result<Vec<Contact>, ContactServiceError> {
        Ok(self.repo.list()?)
    }

    pub fn get_contact(&self, id: RecordId) -> Result<Option<Contact>, ContactServiceError> {
        Ok(self.repo.get(id)?)
    }

    /// Replaces a stored contact wholesale.
    pub fn replace_contact(&self, contact: &Contact) -> Result<(), ContactServiceError> {
        contact.validate()?;

        let mut contacts = self.repo.list()?;
        let index = contacts
            .iter()
            .position(|existing| existing.id == contact.id)
            .ok_or(ContactServiceError::ContactNotFound(contact.id))?;
        if contact.is_primary {
            clear_primary(&mut contacts);
        }
        contacts[index] = contact.clone();
        self.repo.write_all(&contacts)?;
        Ok(())
    }

    pub fn remove_contact(&self, id: RecordId) -> Result<Contact, ContactServiceError> {
        let removed = self.repo.remove(id)?;
        info!("event=contact_remove module=service status=ok contact_id={id}");
        Ok(removed)
    }

    pub fn primary_contact(&self) -> Result<Option<Contact>, ContactServiceError> {
        Ok(self
            .repo
            .list()?
            .into_iter()
            .find(|contact| contact.is_primary))
    }
}

fn clear_primary(contacts: &mut [Contact]) {
    for contact in contacts {
        contact.is_primary = false;
    }
}
