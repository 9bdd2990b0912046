//! Address domain: keyed records with caller-chosen or allocated ids

use tracing::debug;

use super::{Reconciled, Reconciler, detached};
use crate::error::{Error, Result};
use crate::records::address::is_reserved_id;
use crate::records::{AddressRecord, Domain, DomainRecord};
use crate::sequence::SequenceAllocator;

/// Create/Update/Delete/List contract of the address domain
#[derive(Clone)]
pub struct AddressReconciler {
    inner: Reconciler<AddressRecord>,
    sequence: SequenceAllocator,
}

impl AddressReconciler {
    pub(crate) fn new(inner: Reconciler<AddressRecord>) -> Self {
        let sequence = SequenceAllocator::new(inner.store().clone());
        Self { inner, sequence }
    }

    /// Declare a new address
    ///
    /// An empty id is replaced by the next free decimal id. A caller-chosen
    /// id must not be a bare unsigned integer and must not exist yet.
    ///
    /// # Errors
    ///
    /// - `Validation`: Bad link or CIDR, or a numeric id
    /// - `Conflict`: The id is already declared
    /// - `SystemApply`: The address could not be assigned (nothing stored)
    /// - `Persistence`: The store write failed
    pub async fn create(&self, record: AddressRecord) -> Result<Reconciled<AddressRecord>> {
        record.validate()?;
        if !record.id.is_empty() && is_reserved_id(&record.id) {
            return Err(Error::validation(format!(
                "id '{}' is numeric; numeric ids are reserved for allocation",
                record.id
            )));
        }

        let this = self.clone();
        detached(async move { this.create_locked(record).await }).await
    }

    async fn create_locked(&self, mut record: AddressRecord) -> Result<Reconciled<AddressRecord>> {
        if record.id.is_empty() {
            loop {
                let id = self.sequence.next_free_id(Domain::Address).await?;
                let _guard = self.inner.locks().lock(Domain::Address, &id).await;
                // Someone may have taken the id between allocation and locking
                if self.inner.load(&id).await?.is_some() {
                    debug!("Allocated address id {} raced, allocating again", id);
                    continue;
                }
                record.id = id.clone();
                return self.inner.transition(&id, None, record, true).await;
            }
        }

        let id = record.id.clone();
        let _guard = self.inner.locks().lock(Domain::Address, &id).await;
        if self.inner.load(&id).await?.is_some() {
            return Err(Error::conflict(format!("address '{}' already exists", id)));
        }
        self.inner.transition(&id, None, record, true).await
    }

    /// Replace the declaration at `id`
    ///
    /// The path id wins over any id in the body.
    ///
    /// # Errors
    ///
    /// - `NotFound`: `id` was never declared (nothing applied)
    /// - `SystemApply`: The new address could not be assigned; the previous
    ///   one is restored and stays stored
    pub async fn update(
        &self,
        id: &str,
        record: AddressRecord,
    ) -> Result<Reconciled<AddressRecord>> {
        if id.is_empty() {
            return Err(Error::validation("address id is empty"));
        }
        let record = record.with_id(id);
        record.validate()?;

        let this = self.clone();
        detached(async move {
            let id = record.id.clone();
            let _guard = this.inner.locks().lock(Domain::Address, &id).await;
            let previous = this
                .inner
                .load(&id)
                .await?
                .ok_or_else(|| Error::not_found(format!("address '{}'", id)))?;
            this.inner.transition(&id, Some(previous), record, false).await
        })
        .await
    }

    /// Upsert a fully specified record
    ///
    /// Used by the command-line bootstrap path, where the operator may pick
    /// any id, numeric ones included. An id that was never declared is
    /// created in place.
    pub async fn reconcile(&self, record: AddressRecord) -> Result<Reconciled<AddressRecord>> {
        if record.id.is_empty() {
            return Err(Error::validation("address id is empty"));
        }
        record.validate()?;

        let this = self.clone();
        detached(async move {
            let id = record.id.clone();
            let _guard = this.inner.locks().lock(Domain::Address, &id).await;
            let previous = this.inner.load(&id).await?;
            this.inner.transition(&id, previous, record, false).await
        })
        .await
    }

    /// Remove the address at `id` from the live system, then forget it
    ///
    /// # Errors
    ///
    /// - `NotFound`: No such id
    /// - `SystemApply`: The address could not be removed (still stored)
    pub async fn delete(&self, id: &str) -> Result<AddressRecord> {
        let this = self.clone();
        let id = id.to_string();
        detached(async move {
            let _guard = this.inner.locks().lock(Domain::Address, &id).await;
            let previous = this
                .inner
                .load(&id)
                .await?
                .ok_or_else(|| Error::not_found(format!("address '{}'", id)))?;

            this.inner.retire(&id, &previous).await?;
            Ok(previous)
        })
        .await
    }

    /// Get the declaration at `id`
    pub async fn get(&self, id: &str) -> Result<AddressRecord> {
        self.inner
            .load(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("address '{}'", id)))
    }

    /// All declared addresses, in store order
    pub async fn list(&self) -> Result<Vec<AddressRecord>> {
        self.inner.load_all().await
    }
}
