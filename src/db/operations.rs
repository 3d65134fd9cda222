use std::sync::Arc;

use crate::db::models::{from_document, to_document, ContactSubmission, Plot, User, CONTACT, PLOTS, USERS};
use crate::db::store::{DocumentStore, FieldFilter};
use crate::error::StoreError;

/// Collection-level access on top of a [`DocumentStore`].
#[derive(Clone)]
pub struct DbOperations {
    store: Arc<dyn DocumentStore>,
}

impl DbOperations {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        match self.store.get(USERS, email).await? {
            Some(doc) => Ok(Some(from_document(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn user_exists(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.store.get(USERS, email).await?.is_some())
    }

    /// Writes the user under its email, replacing any existing record.
    pub async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        self.store.set(USERS, &user.email, to_document(user)?).await
    }

    pub async fn create_contact(&self, contact: &ContactSubmission) -> Result<String, StoreError> {
        self.store.add(CONTACT, to_document(contact)?).await
    }

    pub async fn get_plots(&self, region: Option<&str>) -> Result<Vec<Plot>, StoreError> {
        let filter = region.map(|r| FieldFilter::eq("region", r));
        self.store.scan(PLOTS, filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::{Document, MemoryStore};
    use serde_json::json;

    fn user(email: &str) -> User {
        User {
            name: "A".into(),
            phone: "1".into(),
            email: email.into(),
            password: "p".into(),
            address: "addr".into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch_user() {
        let db = DbOperations::new(Arc::new(MemoryStore::new()));
        assert!(!db.user_exists("a@x.com").await.unwrap());

        db.create_user(&user("a@x.com")).await.unwrap();

        assert!(db.user_exists("a@x.com").await.unwrap());
        let found = db.get_user_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found, user("a@x.com"));
    }

    #[tokio::test]
    async fn test_get_plots_by_region() {
        let store = Arc::new(MemoryStore::new());
        for (region, id) in [("north", 1), ("south", 2), ("north", 3)] {
            let doc: Document = json!({"region": region, "id": id}).as_object().cloned().unwrap();
            store.add(PLOTS, doc).await.unwrap();
        }
        let db = DbOperations::new(store);

        let north = db.get_plots(Some("north")).await.unwrap();
        assert_eq!(north.len(), 2);
        assert!(north.iter().all(|p| p["region"] == "north"));

        assert_eq!(db.get_plots(None).await.unwrap().len(), 3);
        assert!(db.get_plots(Some("east")).await.unwrap().is_empty());
    }
}
