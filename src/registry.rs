// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Correlation of requests and responses by transaction id.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU16, Ordering},
};

use tokio::time::Instant;

use crate::{
    frame::{FunctionCode, Header, TransactionId, UnitId},
    Error,
};

const INITIAL_TRANSACTION_ID: TransactionId = 0;

/// Generator of wrapping transaction ids.
#[derive(Debug)]
pub(crate) struct TransactionIds(AtomicU16);

impl Default for TransactionIds {
    fn default() -> Self {
        Self(AtomicU16::new(INITIAL_TRANSACTION_ID))
    }
}

impl TransactionIds {
    pub(crate) fn next(&self) -> TransactionId {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// A request that has been handed to the transport and awaits its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PendingRequest {
    pub(crate) unit_id: UnitId,
    pub(crate) function: FunctionCode,
    pub(crate) deadline: Instant,
}

impl PendingRequest {
    pub(crate) fn header(&self, transaction_id: TransactionId) -> Header {
        Header::new(transaction_id, self.unit_id)
    }
}

/// Outstanding requests of a connection, keyed by transaction id.
#[derive(Debug, Default)]
pub(crate) struct TransactionRegistry {
    pending: HashMap<TransactionId, PendingRequest>,
}

impl TransactionRegistry {
    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }

    /// Track a new request.
    ///
    /// Fails if a request with the same transaction id is still in flight,
    /// because its response could not be told apart.
    pub(crate) fn insert(
        &mut self,
        transaction_id: TransactionId,
        pending: PendingRequest,
    ) -> Result<(), Error> {
        if self.pending.contains_key(&transaction_id) {
            return Err(Error::TransactionInUse(transaction_id));
        }
        self.pending.insert(transaction_id, pending);
        Ok(())
    }

    /// Draw the next id from `ids` that is not in flight.
    pub(crate) fn allocate(&self, ids: &TransactionIds) -> TransactionId {
        let mut transaction_id = ids.next();
        for _ in 0..u16::MAX {
            if !self.pending.contains_key(&transaction_id) {
                break;
            }
            transaction_id = ids.next();
        }
        transaction_id
    }

    /// Remove the request a response belongs to.
    ///
    /// `None` means the response was not asked for.
    pub(crate) fn remove(&mut self, transaction_id: TransactionId) -> Option<PendingRequest> {
        self.pending.remove(&transaction_id)
    }

    /// The earliest deadline of all outstanding requests.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|pending| pending.deadline).min()
    }

    /// Remove all requests whose deadline has passed at `now`,
    /// ordered by deadline.
    pub(crate) fn expire(&mut self, now: Instant) -> Vec<(TransactionId, PendingRequest)> {
        let expired_ids: Vec<_> = self
            .pending
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        let mut expired: Vec<_> = expired_ids
            .into_iter()
            .filter_map(|id| self.pending.remove(&id).map(|pending| (id, pending)))
            .collect();
        expired.sort_by_key(|(id, pending)| (pending.deadline, *id));
        expired
    }

    /// Remove all outstanding requests, e.g. after the connection failed.
    pub(crate) fn drain(&mut self) -> Vec<(TransactionId, PendingRequest)> {
        let mut drained: Vec<_> = self.pending.drain().collect();
        drained.sort_by_key(|(id, _)| *id);
        drained
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn pending(deadline: Instant) -> PendingRequest {
        PendingRequest {
            unit_id: 1,
            function: FunctionCode::ReadHoldingRegisters,
            deadline,
        }
    }

    #[test]
    fn transaction_ids_wrap_around() {
        let ids = TransactionIds::default();
        assert_eq!(ids.next(), 0);
        assert_eq!(ids.next(), 1);
        ids.0.store(u16::MAX, Ordering::Relaxed);
        assert_eq!(ids.next(), u16::MAX);
        assert_eq!(ids.next(), 0);
    }

    #[test]
    fn insert_and_remove() {
        let now = Instant::now();
        let mut registry = TransactionRegistry::default();
        registry.insert(1, pending(now)).unwrap();
        registry.insert(2, pending(now)).unwrap();
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.remove(2), Some(pending(now)));
        assert_eq!(registry.remove(2), None);
        assert_eq!(registry.remove(3), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reject_transaction_id_in_flight() {
        let now = Instant::now();
        let mut registry = TransactionRegistry::default();
        registry.insert(42, pending(now)).unwrap();
        assert!(matches!(
            registry.insert(42, pending(now)),
            Err(Error::TransactionInUse(42))
        ));
        registry.remove(42);
        assert!(registry.insert(42, pending(now)).is_ok());
    }

    #[test]
    fn allocate_skips_ids_in_flight() {
        let now = Instant::now();
        let ids = TransactionIds::default();
        let mut registry = TransactionRegistry::default();
        registry.insert(0, pending(now)).unwrap();
        registry.insert(1, pending(now)).unwrap();
        assert_eq!(registry.allocate(&ids), 2);
        assert_eq!(registry.allocate(&ids), 3);
    }

    #[test]
    fn expire_by_deadline() {
        let now = Instant::now();
        let mut registry = TransactionRegistry::default();
        registry.insert(1, pending(now + Duration::from_secs(2))).unwrap();
        registry.insert(2, pending(now)).unwrap();
        registry.insert(3, pending(now + Duration::from_secs(1))).unwrap();
        assert_eq!(registry.next_deadline(), Some(now));

        let expired = registry.expire(now + Duration::from_secs(1));
        let ids: Vec<_> = expired.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, [2, 3]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.next_deadline(), Some(now + Duration::from_secs(2)));
    }

    #[test]
    fn drain_all() {
        let now = Instant::now();
        let mut registry = TransactionRegistry::default();
        registry.insert(5, pending(now)).unwrap();
        registry.insert(4, pending(now)).unwrap();
        let drained: Vec<_> = registry.drain().into_iter().map(|(id, _)| id).collect();
        assert_eq!(drained, [4, 5]);
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.next_deadline(), None);
    }
}
