//! Per-tenant secret record service.
//!
//! Sensitive columns (password, card number, expiry and cvc) are encrypted
//! with the [`FieldCipher`] before they reach the [`RecordStore`] and
//! decrypted on the way out. Every query is scoped to the calling
//! [`Principal`], so one customer can never read, change or delete another
//! customer's records; a foreign title simply looks absent.

use std::sync::Arc;

use keeper_storage::{
    Column, ObjectStore, RecordKind, RecordPayload, RecordScope, RecordStore, StoredRecord,
};

use crate::cipher::FieldCipher;
use crate::error::{CipherError, RecordError};
use crate::model::{
    CardEntry, CardPatch, CardSummary, FileDownload, FilePatch, FileSummary, NewCard, NewFile,
    NewPassword, PasswordEntry, PasswordPatch, PasswordSummary, mask_card_number,
};
use crate::patch::RecordPatchBuilder;
use crate::session::Principal;
use crate::validation;

/// Create, read, update and delete secret records on behalf of a principal.
#[derive(Clone)]
pub struct VaultRecordService {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
    cipher: Arc<FieldCipher>,
}

impl std::fmt::Debug for VaultRecordService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultRecordService")
            .field("cipher", &self.cipher)
            .finish_non_exhaustive()
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|s| !s.is_empty())
}

fn scope(principal: &Principal, title: &str) -> RecordScope {
    RecordScope {
        owner_id: principal.id,
        title: title.to_owned(),
    }
}

impl VaultRecordService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        objects: Arc<dyn ObjectStore>,
        cipher: Arc<FieldCipher>,
    ) -> Self {
        Self {
            records,
            objects,
            cipher,
        }
    }

    fn seal(&self, plaintext: &str) -> Result<String, CipherError> {
        self.cipher.encrypt(plaintext)
    }

    /// Encrypt a patch value. An explicit empty value clears the column and
    /// is stored as-is.
    fn seal_patch(&self, value: Option<String>) -> Result<Option<String>, CipherError> {
        match value {
            Some(v) if !v.is_empty() => self.seal(&v).map(Some),
            other => Ok(other),
        }
    }

    /// Decrypt a stored column. Cleared columns read back as empty.
    fn open(&self, stored: &str) -> Result<String, CipherError> {
        if stored.is_empty() {
            return Ok(String::new());
        }
        self.cipher.decrypt(stored)
    }

    async fn fetch(
        &self,
        kind: RecordKind,
        principal: &Principal,
        title: &str,
    ) -> Result<StoredRecord, RecordError> {
        self.records
            .record_by_title(kind, &scope(principal, title))
            .await?
            .ok_or_else(|| RecordError::not_found(kind, title))
    }

    async fn insert(&self, record: StoredRecord) -> Result<(), RecordError> {
        let kind = record.kind();
        let title = record.title.clone();
        let owner_id = record.owner_id;
        self.records
            .insert_record(record)
            .await
            .map_err(|e| RecordError::from_storage(kind, &title, e))?;
        tracing::info!(owner_id, %kind, "record created");
        Ok(())
    }

    async fn apply(
        &self,
        principal: &Principal,
        title: &str,
        builder: RecordPatchBuilder,
    ) -> Result<(), RecordError> {
        let update = builder.build();
        let kind = update.kind;
        if update.is_empty() {
            self.fetch(kind, principal, title).await?;
            return Ok(());
        }
        let changed = self.records.apply_update(&update).await?;
        if changed == 0 {
            return Err(RecordError::not_found(kind, title));
        }
        tracing::info!(
            owner_id = principal.id,
            %kind,
            columns = update.assignments.len(),
            "record updated"
        );
        Ok(())
    }

    async fn remove(
        &self,
        kind: RecordKind,
        principal: &Principal,
        title: &str,
    ) -> Result<Option<StoredRecord>, RecordError> {
        let removed = self
            .records
            .delete_record(kind, &scope(principal, title))
            .await?;
        tracing::info!(
            owner_id = principal.id,
            %kind,
            removed = removed.is_some(),
            "record delete"
        );
        Ok(removed)
    }

    // ── Passwords ────────────────────────────────────────────────────

    /// Store a new password.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Validation`] for an empty title or password,
    /// [`RecordError::Conflict`] if the title is taken, and
    /// [`RecordError::Crypto`] or [`RecordError::Storage`] on failure.
    pub async fn create_password(
        &self,
        principal: &Principal,
        new: NewPassword,
    ) -> Result<(), RecordError> {
        validation::title(&new.title)?;
        validation::required("pwd", &new.secret)?;
        let record = StoredRecord {
            owner_id: principal.id,
            payload: RecordPayload::Password {
                secret: self.seal(&new.secret)?,
            },
            title: new.title,
            description: new.description,
        };
        self.insert(record).await
    }

    /// Fetch and decrypt one password.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] if the caller has no such title.
    pub async fn password_by_title(
        &self,
        principal: &Principal,
        title: &str,
    ) -> Result<PasswordEntry, RecordError> {
        let record = self.fetch(RecordKind::Password, principal, title).await?;
        let RecordPayload::Password { secret } = &record.payload else {
            return Err(RecordError::not_found(RecordKind::Password, title));
        };
        Ok(PasswordEntry {
            secret: self.open(secret)?,
            title: record.title,
            description: record.description,
        })
    }

    /// Titles and descriptions of every password of the caller.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Storage`] if the store fails.
    pub async fn list_passwords(
        &self,
        principal: &Principal,
    ) -> Result<Vec<PasswordSummary>, RecordError> {
        let records = self
            .records
            .list_records(RecordKind::Password, principal.id)
            .await?;
        Ok(records
            .into_iter()
            .map(|r| PasswordSummary {
                title: r.title,
                description: r.description,
            })
            .collect())
    }

    /// Apply a partial update to a password.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] if the caller has no such title.
    pub async fn update_password(
        &self,
        principal: &Principal,
        title: &str,
        patch: PasswordPatch,
    ) -> Result<(), RecordError> {
        let builder = RecordPatchBuilder::new(RecordKind::Password, title, principal.id)
            .set(Column::Secret, self.seal_patch(patch.secret)?)
            .set(Column::Description, patch.description);
        self.apply(principal, title, builder).await
    }

    /// Delete a password. Deleting an absent title does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Storage`] if the store fails.
    pub async fn delete_password(
        &self,
        principal: &Principal,
        title: &str,
    ) -> Result<(), RecordError> {
        self.remove(RecordKind::Password, principal, title).await?;
        Ok(())
    }

    // ── Cards ────────────────────────────────────────────────────────

    /// Store a new card.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Validation`] for a malformed number, expiry,
    /// cvc or title, [`RecordError::Conflict`] if the title is taken, and
    /// [`RecordError::Crypto`] or [`RecordError::Storage`] on failure.
    pub async fn create_card(&self, principal: &Principal, new: NewCard) -> Result<(), RecordError> {
        validation::title(&new.title)?;
        validation::card_number(&new.number)?;
        validation::card_expiry(&new.expiry)?;
        validation::card_cvc(&new.cvc)?;
        let record = StoredRecord {
            owner_id: principal.id,
            payload: RecordPayload::Card {
                number: self.seal(&new.number)?,
                expiry: self.seal(&new.expiry)?,
                cvc: self.seal(&new.cvc)?,
            },
            title: new.title,
            description: new.description,
        };
        self.insert(record).await
    }

    /// Fetch and decrypt one card.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] if the caller has no such title.
    pub async fn card_by_title(
        &self,
        principal: &Principal,
        title: &str,
    ) -> Result<CardEntry, RecordError> {
        let record = self.fetch(RecordKind::Card, principal, title).await?;
        let RecordPayload::Card {
            number,
            expiry,
            cvc,
        } = &record.payload
        else {
            return Err(RecordError::not_found(RecordKind::Card, title));
        };
        Ok(CardEntry {
            number: self.open(number)?,
            expiry: self.open(expiry)?,
            cvc: self.open(cvc)?,
            title: record.title,
            description: record.description,
        })
    }

    /// Every card of the caller with the number masked to its last four
    /// digits. Expiry and cvc are never included.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Crypto`] or [`RecordError::Storage`].
    pub async fn list_cards(&self, principal: &Principal) -> Result<Vec<CardSummary>, RecordError> {
        let records = self
            .records
            .list_records(RecordKind::Card, principal.id)
            .await?;
        records
            .into_iter()
            .map(|r| -> Result<CardSummary, RecordError> {
                let masked_number = match &r.payload {
                    RecordPayload::Card { number, .. } => mask_card_number(&self.open(number)?),
                    _ => mask_card_number(""),
                };
                Ok(CardSummary {
                    title: r.title,
                    masked_number,
                    description: r.description,
                })
            })
            .collect()
    }

    /// Apply a partial update to a card. Present non-empty values are
    /// validated; explicit empty values clear the column.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Validation`] for malformed values and
    /// [`RecordError::NotFound`] if the caller has no such title.
    pub async fn update_card(
        &self,
        principal: &Principal,
        title: &str,
        patch: CardPatch,
    ) -> Result<(), RecordError> {
        if let Some(number) = non_empty(patch.number.as_ref()) {
            validation::card_number(number)?;
        }
        if let Some(expiry) = non_empty(patch.expiry.as_ref()) {
            validation::card_expiry(expiry)?;
        }
        if let Some(cvc) = non_empty(patch.cvc.as_ref()) {
            validation::card_cvc(cvc)?;
        }

        let builder = RecordPatchBuilder::new(RecordKind::Card, title, principal.id)
            .set(Column::Number, self.seal_patch(patch.number)?)
            .set(Column::Expiry, self.seal_patch(patch.expiry)?)
            .set(Column::Cvc, self.seal_patch(patch.cvc)?)
            .set(Column::Description, patch.description);
        self.apply(principal, title, builder).await
    }

    /// Delete a card. Deleting an absent title does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Storage`] if the store fails.
    pub async fn delete_card(&self, principal: &Principal, title: &str) -> Result<(), RecordError> {
        self.remove(RecordKind::Card, principal, title).await?;
        Ok(())
    }

    // ── Files ────────────────────────────────────────────────────────

    /// Upload a file payload and store its metadata.
    ///
    /// The title is checked before the upload. If storing the metadata
    /// fails afterwards, the uploaded object is removed again.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Validation`] for an empty title or file name,
    /// [`RecordError::Conflict`] if the title is taken, and
    /// [`RecordError::Storage`] if either store fails.
    pub async fn create_file(
        &self,
        principal: &Principal,
        new: NewFile,
        bytes: Vec<u8>,
    ) -> Result<(), RecordError> {
        validation::title(&new.title)?;
        let file_name = validation::file_name(&new.file_name)?;

        if self
            .records
            .record_by_title(RecordKind::File, &scope(principal, &new.title))
            .await?
            .is_some()
        {
            return Err(RecordError::Conflict {
                kind: RecordKind::File,
                title: new.title,
            });
        }

        let object_key = uuid::Uuid::new_v4().to_string();
        let size = bytes.len();
        self.objects.put_object(&object_key, bytes).await?;
        tracing::debug!(owner_id = principal.id, size, "file payload uploaded");

        let record = StoredRecord {
            owner_id: principal.id,
            title: new.title,
            description: new.description,
            payload: RecordPayload::File {
                file_name,
                object_key: object_key.clone(),
            },
        };
        if let Err(err) = self.insert(record).await {
            if let Err(cleanup) = self.objects.delete_object(&object_key).await {
                tracing::warn!(error = %cleanup, "failed to remove orphaned file payload");
            }
            return Err(err);
        }
        Ok(())
    }

    /// Fetch file metadata and its payload.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotFound`] if the caller has no such title and
    /// [`RecordError::Storage`] if the payload cannot be read.
    pub async fn download_file(
        &self,
        principal: &Principal,
        title: &str,
    ) -> Result<FileDownload, RecordError> {
        let record = self.fetch(RecordKind::File, principal, title).await?;
        let RecordPayload::File {
            file_name,
            object_key,
        } = record.payload
        else {
            return Err(RecordError::not_found(RecordKind::File, title));
        };
        let bytes = self.objects.get_object(&object_key).await?;
        Ok(FileDownload {
            summary: FileSummary {
                title: record.title,
                file_name,
                description: record.description,
            },
            bytes,
        })
    }

    /// Metadata of every file of the caller.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Storage`] if the store fails.
    pub async fn list_files(&self, principal: &Principal) -> Result<Vec<FileSummary>, RecordError> {
        let records = self
            .records
            .list_records(RecordKind::File, principal.id)
            .await?;
        Ok(records
            .into_iter()
            .map(|r| FileSummary {
                file_name: match r.payload {
                    RecordPayload::File { file_name, .. } => file_name,
                    _ => String::new(),
                },
                title: r.title,
                description: r.description,
            })
            .collect())
    }

    /// Rename a file or change its description. The payload is untouched.
    /// A non-empty name is reduced to its base name; an explicit empty name
    /// clears the column.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Validation`] for an unusable file name and
    /// [`RecordError::NotFound`] if the caller has no such title.
    pub async fn update_file(
        &self,
        principal: &Principal,
        title: &str,
        patch: FilePatch,
    ) -> Result<(), RecordError> {
        let file_name = match patch.file_name {
            Some(name) if !name.is_empty() => Some(validation::file_name(&name)?),
            other => other,
        };
        let builder = RecordPatchBuilder::new(RecordKind::File, title, principal.id)
            .set(Column::FileName, file_name)
            .set(Column::Description, patch.description);
        self.apply(principal, title, builder).await
    }

    /// Delete a file record and its payload. Deleting an absent title does
    /// nothing. A payload that cannot be removed is logged, not reported.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Storage`] if the record store fails.
    pub async fn delete_file(&self, principal: &Principal, title: &str) -> Result<(), RecordError> {
        let removed = self.remove(RecordKind::File, principal, title).await?;
        if let Some(StoredRecord {
            payload: RecordPayload::File { object_key, .. },
            ..
        }) = removed
        {
            if let Err(err) = self.objects.delete_object(&object_key).await {
                tracing::warn!(error = %err, "failed to remove file payload");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use keeper_storage::{MemoryBackend, MemoryObjectStore};

    use super::*;

    struct Fixture {
        service: VaultRecordService,
        backend: MemoryBackend,
        objects: MemoryObjectStore,
    }

    fn fixture() -> Fixture {
        let backend = MemoryBackend::new();
        let objects = MemoryObjectStore::new();
        let cipher = Arc::new(FieldCipher::new(b"0123456789abcdef").unwrap());
        let service = VaultRecordService::new(
            Arc::new(backend.clone()),
            Arc::new(objects.clone()),
            cipher,
        );
        Fixture {
            service,
            backend,
            objects,
        }
    }

    fn principal(id: i64) -> Principal {
        Principal {
            id,
            login: format!("user{id}@example.com"),
        }
    }

    fn visa() -> NewCard {
        NewCard {
            title: "visa".into(),
            number: "4111111111111111".into(),
            expiry: "1230".into(),
            cvc: "123".into(),
            description: "main".into(),
        }
    }

    fn password(title: &str, secret: &str) -> NewPassword {
        NewPassword {
            title: title.into(),
            secret: secret.into(),
            description: "d".into(),
        }
    }

    #[tokio::test]
    async fn secrets_are_encrypted_at_rest() {
        let f = fixture();
        let alice = principal(1);
        f.service.create_card(&alice, visa()).await.unwrap();

        let stored = f
            .backend
            .record_by_title(RecordKind::Card, &scope(&alice, "visa"))
            .await
            .unwrap()
            .unwrap();
        let RecordPayload::Card {
            number,
            expiry,
            cvc,
        } = stored.payload
        else {
            unreachable!()
        };
        assert_ne!(number, "4111111111111111");
        assert_ne!(expiry, "1230");
        assert_ne!(cvc, "123");
        assert_eq!(stored.description, "main");

        let entry = f.service.card_by_title(&alice, "visa").await.unwrap();
        assert_eq!(entry.number, "4111111111111111");
        assert_eq!(entry.expiry, "1230");
        assert_eq!(entry.cvc, "123");
    }

    #[tokio::test]
    async fn password_patch_semantics() {
        let f = fixture();
        let alice = principal(1);
        f.service
            .create_password(&alice, password("t", "a"))
            .await
            .unwrap();

        f.service
            .update_password(
                &alice,
                "t",
                PasswordPatch {
                    secret: None,
                    description: Some(String::new()),
                },
            )
            .await
            .unwrap();
        let entry = f.service.password_by_title(&alice, "t").await.unwrap();
        assert_eq!((entry.secret.as_str(), entry.description.as_str()), ("a", ""));

        f.service
            .update_password(
                &alice,
                "t",
                PasswordPatch {
                    secret: Some("b".into()),
                    description: None,
                },
            )
            .await
            .unwrap();
        let entry = f.service.password_by_title(&alice, "t").await.unwrap();
        assert_eq!((entry.secret.as_str(), entry.description.as_str()), ("b", ""));
    }

    #[tokio::test]
    async fn explicit_empty_secret_clears_the_column() {
        let f = fixture();
        let alice = principal(1);
        f.service
            .create_password(&alice, password("t", "a"))
            .await
            .unwrap();
        f.service
            .update_password(
                &alice,
                "t",
                PasswordPatch {
                    secret: Some(String::new()),
                    description: None,
                },
            )
            .await
            .unwrap();
        let entry = f.service.password_by_title(&alice, "t").await.unwrap();
        assert_eq!(entry.secret, "");
        assert_eq!(entry.description, "d");
    }

    #[tokio::test]
    async fn tenants_are_isolated() {
        let f = fixture();
        let (alice, bob) = (principal(1), principal(2));
        f.service
            .create_password(&alice, password("x", "alice-secret"))
            .await
            .unwrap();
        f.service
            .create_password(&bob, password("x", "bob-secret"))
            .await
            .unwrap();

        f.service.delete_password(&bob, "x").await.unwrap();
        f.service.delete_password(&bob, "x").await.unwrap();

        let entry = f.service.password_by_title(&alice, "x").await.unwrap();
        assert_eq!(entry.secret, "alice-secret");
        assert!(matches!(
            f.service.password_by_title(&bob, "x").await,
            Err(RecordError::NotFound { .. })
        ));
        assert!(matches!(
            f.service
                .update_password(&bob, "x", PasswordPatch::default())
                .await,
            Err(RecordError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_title_conflicts() {
        let f = fixture();
        let alice = principal(1);
        f.service.create_card(&alice, visa()).await.unwrap();
        assert!(matches!(
            f.service.create_card(&alice, visa()).await,
            Err(RecordError::Conflict { kind: RecordKind::Card, .. })
        ));
    }

    #[tokio::test]
    async fn card_validation() {
        let f = fixture();
        let alice = principal(1);
        let mut bad = visa();
        bad.number = "4111111111111112".into();
        assert!(matches!(
            f.service.create_card(&alice, bad).await,
            Err(RecordError::Validation(_))
        ));

        f.service.create_card(&alice, visa()).await.unwrap();
        let patch = CardPatch {
            cvc: Some("12".into()),
            ..CardPatch::default()
        };
        assert!(matches!(
            f.service.update_card(&alice, "visa", patch).await,
            Err(RecordError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn card_list_is_masked() {
        let f = fixture();
        let alice = principal(1);
        f.service.create_card(&alice, visa()).await.unwrap();

        let cards = f.service.list_cards(&alice).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].masked_number, "************1111");
        assert!(!cards[0].masked_number.contains("411111"));
    }

    #[tokio::test]
    async fn card_update_keeps_unsent_fields() {
        let f = fixture();
        let alice = principal(1);
        f.service.create_card(&alice, visa()).await.unwrap();
        f.service
            .update_card(
                &alice,
                "visa",
                CardPatch {
                    description: Some("new".into()),
                    ..CardPatch::default()
                },
            )
            .await
            .unwrap();
        let entry = f.service.card_by_title(&alice, "visa").await.unwrap();
        assert_eq!(entry.description, "new");
        assert_eq!(entry.number, "4111111111111111");
        assert_eq!(entry.expiry, "1230");
        assert_eq!(entry.cvc, "123");
    }

    #[tokio::test]
    async fn file_lifecycle() {
        let f = fixture();
        let alice = principal(1);
        let new = NewFile {
            title: "report".into(),
            file_name: "/tmp/report.pdf".into(),
            description: "q3".into(),
        };
        f.service
            .create_file(&alice, new.clone(), b"%PDF".to_vec())
            .await
            .unwrap();
        assert!(matches!(
            f.service.create_file(&alice, new, b"again".to_vec()).await,
            Err(RecordError::Conflict { .. })
        ));

        let download = f.service.download_file(&alice, "report").await.unwrap();
        assert_eq!(download.bytes, b"%PDF");
        assert_eq!(download.summary.file_name, "report.pdf");

        f.service
            .update_file(
                &alice,
                "report",
                FilePatch {
                    file_name: Some("final.pdf".into()),
                    description: None,
                },
            )
            .await
            .unwrap();
        let files = f.service.list_files(&alice).await.unwrap();
        assert_eq!(files[0].file_name, "final.pdf");
        assert_eq!(files[0].description, "q3");

        f.service.delete_file(&alice, "report").await.unwrap();
        assert!(f.objects.is_empty().await);
        assert!(matches!(
            f.service.download_file(&alice, "report").await,
            Err(RecordError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn deleting_a_foreign_file_keeps_its_payload() {
        let f = fixture();
        let new = NewFile {
            title: "doc".into(),
            file_name: "doc.txt".into(),
            description: String::new(),
        };
        f.service
            .create_file(&principal(1), new, b"mine".to_vec())
            .await
            .unwrap();
        f.service.delete_file(&principal(2), "doc").await.unwrap();
        assert!(!f.objects.is_empty().await);
    }

    #[tokio::test]
    async fn explicit_empty_file_name_clears_the_column() {
        let f = fixture();
        let alice = principal(1);
        let new = NewFile {
            title: "scan".into(),
            file_name: "scan.png".into(),
            description: "id".into(),
        };
        f.service
            .create_file(&alice, new, b"png".to_vec())
            .await
            .unwrap();

        f.service
            .update_file(
                &alice,
                "scan",
                FilePatch {
                    file_name: Some(String::new()),
                    description: None,
                },
            )
            .await
            .unwrap();
        let files = f.service.list_files(&alice).await.unwrap();
        assert_eq!(files[0].file_name, "");
        assert_eq!(files[0].description, "id");

        assert!(matches!(
            f.service
                .update_file(
                    &alice,
                    "scan",
                    FilePatch {
                        file_name: Some("dir/".into()),
                        description: None,
                    },
                )
                .await,
            Err(RecordError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn recreated_file_keeps_only_its_own_payload() {
        let f = fixture();
        let alice = principal(1);
        let new = |name: &str| NewFile {
            title: "notes".into(),
            file_name: name.into(),
            description: String::new(),
        };
        f.service
            .create_file(&alice, new("v1.txt"), b"first".to_vec())
            .await
            .unwrap();
        f.service.delete_file(&alice, "notes").await.unwrap();
        assert!(f.objects.is_empty().await);

        f.service
            .create_file(&alice, new("v2.txt"), b"second".to_vec())
            .await
            .unwrap();
        let download = f.service.download_file(&alice, "notes").await.unwrap();
        assert_eq!(download.bytes, b"second");

        f.service.delete_file(&alice, "notes").await.unwrap();
        assert!(f.objects.is_empty().await);
        assert!(
            f.backend
                .record_by_title(RecordKind::File, &scope(&alice, "notes"))
                .await
                .unwrap()
                .is_none()
        );
    }
}
