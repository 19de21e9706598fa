//! Delivery contacts used at checkout.

use catalog_store::{CatalogStore, Contact, NewContact, UserId};

use crate::error::{DomainError, ReservationError};

fn required(errors: &mut Vec<ReservationError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ReservationError::InvalidInput(format!("{field} is required")));
    }
}

/// Checks that the mandatory address fields are present.
pub fn validate_contact(contact: &NewContact) -> Result<(), Vec<ReservationError>> {
    let mut errors = Vec::new();
    required(&mut errors, "city", &contact.city);
    required(&mut errors, "street", &contact.street);
    required(&mut errors, "phone", &contact.phone);
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub struct ContactService<S: CatalogStore> {
    store: S,
}

impl<S: CatalogStore> ContactService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Contact>, DomainError> {
        Ok(self.store.contacts(user_id).await?)
    }

    #[tracing::instrument(skip(self, contact), fields(user_id = %contact.user_id))]
    pub async fn create(&self, contact: NewContact) -> Result<Contact, DomainError> {
        validate_contact(&contact).map_err(DomainError::Rejected)?;
        let created = self.store.create_contact(contact).await?;
        tracing::info!(contact_id = %created.id, "contact created");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_store::{InMemoryCatalogStore, UserKind};

    fn contact(user_id: UserId, city: &str, phone: &str) -> NewContact {
        NewContact {
            user_id,
            city: city.to_string(),
            street: "Lenina".to_string(),
            house: None,
            structure: None,
            building: None,
            apartment: None,
            phone: phone.to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_list() {
        let store = InMemoryCatalogStore::new();
        let user = store.add_user("buyer@example.com", UserKind::Buyer).await;
        let service = ContactService::new(store);

        let created = service
            .create(contact(user.id, "Kazan", "+7000"))
            .await
            .unwrap();

        assert_eq!(service.list(user.id).await.unwrap(), vec![created]);
    }

    #[tokio::test]
    async fn blank_fields_are_all_reported() {
        let store = InMemoryCatalogStore::new();
        let user = store.add_user("buyer@example.com", UserKind::Buyer).await;
        let service = ContactService::new(store);

        let err = service
            .create(contact(user.id, "  ", ""))
            .await
            .unwrap_err();

        assert_eq!(err.reasons().len(), 2);
        assert!(service.list(user.id).await.unwrap().is_empty());
    }
}
