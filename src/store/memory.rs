//! In-memory ledger for unit tests and database-less local runs.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use super::LedgerStore;
use super::models::{
    CoreTeamMember, REWARD_KIND, ReferralEdge, TransactionRecord, TxStatus, UserRecord,
};
use crate::domain::referral_tree::ReferralLookup;
use crate::domain::{TokenAmount, UserId};
use crate::error::ServiceError;

#[derive(Debug, Default)]
struct Inner {
    next_user_id: i64,
    next_tx_id: i64,
    users: HashMap<UserId, UserRecord>,
    codes: HashMap<String, UserId>,
    edges: HashMap<UserId, ReferralEdge>,
    core_team: HashMap<UserId, CoreTeamMember>,
    claims: HashSet<(UserId, Uuid)>,
    transactions: BTreeMap<i64, TransactionRecord>,
}

/// Hash-map-backed [`LedgerStore`].
///
/// Mirrors the Postgres schema's uniqueness rules: unique emails and
/// referral codes, one inbound edge per referred user, one payout claim
/// per `(referred, source_event)`.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    inner: Mutex<Inner>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Grants core-team membership to a user (ops/test seeding; there is
    /// no API surface for this).
    pub fn grant_core_team(&self, user: UserId) {
        let mut inner = self.lock();
        inner.core_team.insert(
            user,
            CoreTeamMember {
                user_id: user,
                granted_at: Utc::now(),
            },
        );
    }
}

impl ReferralLookup for InMemoryLedger {
    async fn referrer_of(&self, user: UserId) -> Result<Option<UserId>, ServiceError> {
        Ok(self.lock().edges.get(&user).map(|edge| edge.referrer_id))
    }
}

impl LedgerStore for InMemoryLedger {
    async fn create_user(
        &self,
        email: &str,
        referral_code: &str,
    ) -> Result<UserRecord, ServiceError> {
        let mut inner = self.lock();
        if inner.users.values().any(|u| u.email == email) {
            return Err(ServiceError::AlreadyRegistered(email.to_string()));
        }
        inner.next_user_id += 1;
        let id = UserId::new(inner.next_user_id);
        let record = UserRecord {
            id,
            email: email.to_string(),
            referral_code: referral_code.to_string(),
            wallet_address: None,
            created_at: Utc::now(),
        };
        inner.users.insert(id, record.clone());
        inner.codes.insert(referral_code.to_string(), id);
        Ok(record)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, ServiceError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<UserRecord>, ServiceError> {
        let inner = self.lock();
        Ok(inner
            .codes
            .get(code)
            .and_then(|id| inner.users.get(id))
            .cloned())
    }

    async fn set_wallet_address(
        &self,
        user: UserId,
        wallet_address: &str,
    ) -> Result<(), ServiceError> {
        let mut inner = self.lock();
        match inner.users.get_mut(&user) {
            Some(record) => {
                record.wallet_address = Some(wallet_address.to_string());
                Ok(())
            }
            None => Err(ServiceError::UserNotFound(user)),
        }
    }

    async fn create_referral_edge(
        &self,
        referrer: UserId,
        referred: UserId,
    ) -> Result<ReferralEdge, ServiceError> {
        let mut inner = self.lock();
        if inner.edges.contains_key(&referred) {
            return Err(ServiceError::AlreadyReferred(referred));
        }
        let edge = ReferralEdge {
            referrer_id: referrer,
            referred_id: referred,
            created_at: Utc::now(),
        };
        inner.edges.insert(referred, edge);
        Ok(edge)
    }

    async fn find_edge_by_referred(
        &self,
        referred: UserId,
    ) -> Result<Option<ReferralEdge>, ServiceError> {
        Ok(self.lock().edges.get(&referred).copied())
    }

    async fn find_core_team_member(
        &self,
        user: UserId,
    ) -> Result<Option<CoreTeamMember>, ServiceError> {
        Ok(self.lock().core_team.get(&user).copied())
    }

    async fn claim_payout(
        &self,
        referred: UserId,
        source_event: Uuid,
    ) -> Result<bool, ServiceError> {
        Ok(self.lock().claims.insert((referred, source_event)))
    }

    async fn insert_reward_intent(
        &self,
        recipient: UserId,
        amount: TokenAmount,
    ) -> Result<i64, ServiceError> {
        let mut inner = self.lock();
        inner.next_tx_id += 1;
        let id = inner.next_tx_id;
        inner.transactions.insert(
            id,
            TransactionRecord {
                id,
                user_id: recipient,
                kind: REWARD_KIND.to_string(),
                amount,
                status: TxStatus::Pending,
                transfer_hash: None,
                created_at: Utc::now(),
                settled_at: None,
            },
        );
        Ok(id)
    }

    async fn settle_transaction(
        &self,
        transaction_id: i64,
        status: TxStatus,
        transfer_hash: Option<&str>,
    ) -> Result<(), ServiceError> {
        let mut inner = self.lock();
        if let Some(tx) = inner.transactions.get_mut(&transaction_id) {
            tx.status = status;
            tx.transfer_hash = transfer_hash.map(str::to_string);
            tx.settled_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn find_transaction(
        &self,
        transaction_id: i64,
    ) -> Result<Option<TransactionRecord>, ServiceError> {
        Ok(self.lock().transactions.get(&transaction_id).cloned())
    }

    async fn list_transactions(
        &self,
        user: UserId,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<TransactionRecord>, u32), ServiceError> {
        let inner = self.lock();
        let mut rows: Vec<TransactionRecord> = inner
            .transactions
            .values()
            .filter(|tx| tx.user_id == user)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let start = page.saturating_sub(1).saturating_mul(per_page) as usize;
        let page_rows = rows
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();
        Ok((page_rows, total))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let ledger = InMemoryLedger::new();
        let first = ledger.create_user("a@example.com", "code-a").await;
        assert!(first.is_ok());

        let second = ledger.create_user("a@example.com", "code-b").await;
        assert!(matches!(second, Err(ServiceError::AlreadyRegistered(_))));
    }

    #[tokio::test]
    async fn second_inbound_edge_is_rejected() {
        let ledger = InMemoryLedger::new();
        let a = UserId::new(1);
        let b = UserId::new(2);
        let c = UserId::new(3);

        assert!(ledger.create_referral_edge(a, c).await.is_ok());
        let second = ledger.create_referral_edge(b, c).await;
        assert!(matches!(second, Err(ServiceError::AlreadyReferred(id)) if id == c));
    }

    #[tokio::test]
    async fn payout_claim_is_idempotent() {
        let ledger = InMemoryLedger::new();
        let referred = UserId::new(9);
        let event = Uuid::new_v4();

        let Ok(first) = ledger.claim_payout(referred, event).await else {
            panic!("claim failed");
        };
        let Ok(second) = ledger.claim_payout(referred, event).await else {
            panic!("claim failed");
        };
        assert!(first);
        assert!(!second);

        // A different event id for the same user claims fresh.
        let Ok(other) = ledger.claim_payout(referred, Uuid::new_v4()).await else {
            panic!("claim failed");
        };
        assert!(other);
    }

    #[tokio::test]
    async fn intent_settles_with_hash() {
        let ledger = InMemoryLedger::new();
        let user = UserId::new(1);
        let Ok(tx_id) = ledger.insert_reward_intent(user, TokenAmount::new(50)).await else {
            panic!("intent failed");
        };

        let Ok(Some(pending)) = ledger.find_transaction(tx_id).await else {
            panic!("missing intent row");
        };
        assert_eq!(pending.status, TxStatus::Pending);
        assert!(pending.transfer_hash.is_none());

        let settled = ledger
            .settle_transaction(tx_id, TxStatus::Completed, Some("0xfeed"))
            .await;
        assert!(settled.is_ok());

        let Ok(Some(done)) = ledger.find_transaction(tx_id).await else {
            panic!("missing settled row");
        };
        assert_eq!(done.status, TxStatus::Completed);
        assert_eq!(done.transfer_hash.as_deref(), Some("0xfeed"));
        assert!(done.settled_at.is_some());
    }

    #[tokio::test]
    async fn transaction_listing_paginates_newest_first() {
        let ledger = InMemoryLedger::new();
        let user = UserId::new(1);
        for i in 0..5 {
            let Ok(_) = ledger
                .insert_reward_intent(user, TokenAmount::new(i))
                .await
            else {
                panic!("intent failed");
            };
        }

        let Ok((rows, total)) = ledger.list_transactions(user, 1, 2).await else {
            panic!("listing failed");
        };
        assert_eq!(total, 5);
        assert_eq!(rows.len(), 2);
        // Newest (highest id) first.
        assert!(rows.first().map(|r| r.id) > rows.last().map(|r| r.id));

        let Ok((last_page, _)) = ledger.list_transactions(user, 3, 2).await else {
            panic!("listing failed");
        };
        assert_eq!(last_page.len(), 1);
    }
}
