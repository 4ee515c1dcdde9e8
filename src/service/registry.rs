use crate::config::Config;
use crate::db::{
    LedgerStorage, NewObject, ObjectId, ObjectSummary, Place, PlaceHit, PlaceId, SearchHit,
    connect,
};
use crate::error::{LotError, ValidationError};
use crate::service::credential_ops::{AdminToken, CredentialOps, PasswordPolicy, hash_password};
use crate::service::image_store::{ImageStore, ImageUpload, image_extension};
use tracing::{info, warn};

/// Input for a new client/vehicle registration.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub client_name: String,
    pub car_number: String,
    /// Existing or new place; trimmed, created on demand.
    pub place_name: String,
    pub image: Option<ImageUpload>,
}

/// Application operations over the ledger. Reads are open; every write
/// takes an [`AdminToken`].
#[derive(Clone)]
pub struct Registry {
    storage: LedgerStorage,
    credentials: CredentialOps,
    images: ImageStore,
    policy: PasswordPolicy,
}

impl Registry {
    pub fn new(storage: LedgerStorage, images: ImageStore, policy: PasswordPolicy) -> Self {
        let credentials = CredentialOps::new(storage.clone());
        Self {
            storage,
            credentials,
            images,
            policy,
        }
    }

    /// Connect, prepare the image directory and ensure the schema, all from `cfg`.
    pub async fn open(cfg: &Config) -> Result<Self, LotError> {
        let pool = connect(&cfg.storage.database_url).await?;
        let images = ImageStore::open(&cfg.storage.images_dir)?;
        let policy = PasswordPolicy {
            min_len: cfg.admin.min_password_len,
        };
        let registry = Self::new(LedgerStorage::new(pool), images, policy);
        registry.init(&cfg.admin.default_password).await?;
        Ok(registry)
    }

    /// Ensure the schema exists, seeding `default_password` on an empty store.
    pub async fn init(&self, default_password: &str) -> Result<(), LotError> {
        self.storage.ensure_schema(&hash_password(default_password)).await
    }

    pub fn credentials(&self) -> &CredentialOps {
        &self.credentials
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    // ---- session ----

    pub async fn login(&self, password: &str) -> Result<Option<AdminToken>, LotError> {
        if self.credentials.verify(password).await? {
            info!("admin login accepted");
            Ok(Some(AdminToken::grant()))
        } else {
            warn!("admin login rejected");
            Ok(None)
        }
    }

    pub async fn change_password(
        &self,
        _token: &AdminToken,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), LotError> {
        let current_ok = self.credentials.verify(current).await?;
        self.policy.validate_change(current_ok, new_password, confirm)?;
        self.credentials.update_credential(new_password).await
    }

    // ---- places ----

    pub async fn list_places(&self) -> Result<Vec<Place>, LotError> {
        self.storage.list_places().await
    }

    /// Insert-or-get; adding an existing name returns its id.
    pub async fn add_place(&self, _token: &AdminToken, name: &str) -> Result<PlaceId, LotError> {
        let name = required("place_name", name)?;
        self.storage.add_place(name).await
    }

    pub async fn find_place_id_by_name(&self, name: &str) -> Result<Option<PlaceId>, LotError> {
        self.storage.find_place_id_by_name(name).await
    }

    /// `false` when the place is still referenced and was kept.
    pub async fn delete_place(&self, _token: &AdminToken, id: PlaceId) -> Result<bool, LotError> {
        self.storage.delete_place(id).await
    }

    // ---- registrations ----

    pub async fn exists(&self, client_name: &str, car_number: &str) -> Result<bool, LotError> {
        self.storage.object_exists(client_name, car_number).await
    }

    /// Validate, reject a duplicate (client, car) pair, store the photo, then
    /// create the place if needed and insert the row.
    ///
    /// A photo that cannot be written aborts the registration before the
    /// place is created.
    pub async fn register(
        &self,
        token: &AdminToken,
        reg: NewRegistration,
    ) -> Result<ObjectId, LotError> {
        let client_name = required("client_name", &reg.client_name)?;
        let car_number = required("car_number", &reg.car_number)?;
        let place_name = required("place_name", &reg.place_name)?;
        if let Some(upload) = &reg.image {
            image_extension(&upload.file_name)?;
        }

        if self.exists(client_name, car_number).await? {
            warn!(client_name, car_number, "duplicate registration rejected");
            return Err(LotError::DuplicateRegistration);
        }

        let image_path = self.store_image(client_name, reg.image.as_ref()).await?;
        let place_id = self.storage.add_place(place_name).await?;
        self.insert(token, client_name, car_number, place_id, image_path).await
    }

    /// Store the optional photo, then insert the row for an existing place.
    /// Performs no duplicate check; see [`register`](Self::register).
    pub async fn add_object(
        &self,
        token: &AdminToken,
        client_name: &str,
        car_number: &str,
        place_id: PlaceId,
        image: Option<&ImageUpload>,
    ) -> Result<ObjectId, LotError> {
        let image_path = self.store_image(client_name, image).await?;
        self.insert(token, client_name, car_number, place_id, image_path).await
    }

    async fn store_image(
        &self,
        client_name: &str,
        image: Option<&ImageUpload>,
    ) -> Result<Option<String>, LotError> {
        match image {
            Some(upload) => Ok(Some(self.images.store(client_name, upload).await?)),
            None => Ok(None),
        }
    }

    async fn insert(
        &self,
        _token: &AdminToken,
        client_name: &str,
        car_number: &str,
        place_id: PlaceId,
        image_path: Option<String>,
    ) -> Result<ObjectId, LotError> {
        self.storage
            .insert_object(NewObject {
                client_name: client_name.to_string(),
                car_number: car_number.to_string(),
                place_id,
                image_path,
            })
            .await
    }

    pub async fn update_car_number(
        &self,
        _token: &AdminToken,
        id: ObjectId,
        new_number: &str,
    ) -> Result<(), LotError> {
        let new_number = required("car_number", new_number)?;
        if self.storage.update_car_number(id, new_number).await? {
            Ok(())
        } else {
            Err(LotError::NotFound("registration"))
        }
    }

    /// The row goes; its photo file, if any, is left in place.
    pub async fn delete_object(&self, _token: &AdminToken, id: ObjectId) -> Result<(), LotError> {
        if self.storage.delete_object(id).await? {
            Ok(())
        } else {
            Err(LotError::NotFound("registration"))
        }
    }

    pub async fn list_objects(&self, _token: &AdminToken) -> Result<Vec<ObjectSummary>, LotError> {
        self.storage.list_objects().await
    }

    // ---- search ----

    pub async fn search_by_client_or_car(&self, term: &str) -> Result<Vec<SearchHit>, LotError> {
        self.storage.search_by_client_or_car(term.trim()).await
    }

    pub async fn search_by_place(&self, term: &str) -> Result<Vec<PlaceHit>, LotError> {
        self.storage.search_by_place(term.trim()).await
    }
}

/// Surrounding whitespace is dropped; blank input is refused.
fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(trimmed)
    }
}
