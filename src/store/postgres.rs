//! PostgreSQL implementation of the ledger store.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::LedgerStore;
use super::models::{
    CoreTeamMember, REWARD_KIND, ReferralEdge, TransactionRecord, TxStatus, UserRecord,
};
use crate::domain::referral_tree::ReferralLookup;
use crate::domain::{TokenAmount, UserId};
use crate::error::ServiceError;

/// PostgreSQL-backed ledger using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

/// Raw transaction row tuple as selected from the database.
type TxRow = (
    i64,
    i64,
    String,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

impl PostgresLedger {
    /// Creates a new ledger with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_tx_row(row: TxRow) -> Result<TransactionRecord, ServiceError> {
        let (id, user_id, kind, amount, status, transfer_hash, created_at, settled_at) = row;
        let amount: TokenAmount = amount
            .parse()
            .map_err(|_| ServiceError::Store(format!("transaction {id} has malformed amount")))?;
        let status = TxStatus::parse(&status)
            .ok_or_else(|| ServiceError::Store(format!("transaction {id} has status {status}")))?;
        Ok(TransactionRecord {
            id,
            user_id: UserId::new(user_id),
            kind,
            amount,
            status,
            transfer_hash,
            created_at,
            settled_at,
        })
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}

fn store_err(err: sqlx::Error) -> ServiceError {
    ServiceError::Store(err.to_string())
}

impl ReferralLookup for PostgresLedger {
    async fn referrer_of(&self, user: UserId) -> Result<Option<UserId>, ServiceError> {
        Ok(self
            .find_edge_by_referred(user)
            .await?
            .map(|edge| edge.referrer_id))
    }
}

impl LedgerStore for PostgresLedger {
    async fn create_user(
        &self,
        email: &str,
        referral_code: &str,
    ) -> Result<UserRecord, ServiceError> {
        let row = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            "INSERT INTO users (email, referral_code) VALUES ($1, $2) RETURNING id, created_at",
        )
        .bind(email)
        .bind(referral_code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::AlreadyRegistered(email.to_string())
            } else {
                store_err(e)
            }
        })?;

        Ok(UserRecord {
            id: UserId::new(row.0),
            email: email.to_string(),
            referral_code: referral_code.to_string(),
            wallet_address: None,
            created_at: row.1,
        })
    }

    async fn find_user(&self, id: UserId) -> Result<Option<UserRecord>, ServiceError> {
        let row = sqlx::query_as::<_, (i64, String, String, Option<String>, DateTime<Utc>)>(
            "SELECT id, email, referral_code, wallet_address, created_at \
             FROM users WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(|(id, email, referral_code, wallet_address, created_at)| UserRecord {
            id: UserId::new(id),
            email,
            referral_code,
            wallet_address,
            created_at,
        }))
    }

    async fn find_user_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<UserRecord>, ServiceError> {
        let row = sqlx::query_as::<_, (i64, String, String, Option<String>, DateTime<Utc>)>(
            "SELECT id, email, referral_code, wallet_address, created_at \
             FROM users WHERE referral_code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(|(id, email, referral_code, wallet_address, created_at)| UserRecord {
            id: UserId::new(id),
            email,
            referral_code,
            wallet_address,
            created_at,
        }))
    }

    async fn set_wallet_address(
        &self,
        user: UserId,
        wallet_address: &str,
    ) -> Result<(), ServiceError> {
        let result = sqlx::query("UPDATE users SET wallet_address = $2 WHERE id = $1")
            .bind(user.get())
            .bind(wallet_address)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::UserNotFound(user));
        }
        Ok(())
    }

    async fn create_referral_edge(
        &self,
        referrer: UserId,
        referred: UserId,
    ) -> Result<ReferralEdge, ServiceError> {
        let row = sqlx::query_as::<_, (DateTime<Utc>,)>(
            "INSERT INTO referral_edges (referrer_id, referred_id) \
             VALUES ($1, $2) RETURNING created_at",
        )
        .bind(referrer.get())
        .bind(referred.get())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::AlreadyReferred(referred)
            } else {
                store_err(e)
            }
        })?;

        Ok(ReferralEdge {
            referrer_id: referrer,
            referred_id: referred,
            created_at: row.0,
        })
    }

    async fn find_edge_by_referred(
        &self,
        referred: UserId,
    ) -> Result<Option<ReferralEdge>, ServiceError> {
        let row = sqlx::query_as::<_, (i64, i64, DateTime<Utc>)>(
            "SELECT referrer_id, referred_id, created_at \
             FROM referral_edges WHERE referred_id = $1",
        )
        .bind(referred.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(|(referrer_id, referred_id, created_at)| ReferralEdge {
            referrer_id: UserId::new(referrer_id),
            referred_id: UserId::new(referred_id),
            created_at,
        }))
    }

    async fn find_core_team_member(
        &self,
        user: UserId,
    ) -> Result<Option<CoreTeamMember>, ServiceError> {
        let row = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            "SELECT user_id, granted_at FROM core_team_members WHERE user_id = $1",
        )
        .bind(user.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(|(user_id, granted_at)| CoreTeamMember {
            user_id: UserId::new(user_id),
            granted_at,
        }))
    }

    async fn claim_payout(
        &self,
        referred: UserId,
        source_event: Uuid,
    ) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            "INSERT INTO reward_payouts (referred_id, source_event_id) \
             VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(referred.get())
        .bind(source_event)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_reward_intent(
        &self,
        recipient: UserId,
        amount: TokenAmount,
    ) -> Result<i64, ServiceError> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO transactions (user_id, kind, amount, status) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(recipient.get())
        .bind(REWARD_KIND)
        .bind(amount.to_string())
        .bind(TxStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn settle_transaction(
        &self,
        transaction_id: i64,
        status: TxStatus,
        transfer_hash: Option<&str>,
    ) -> Result<(), ServiceError> {
        sqlx::query(
            "UPDATE transactions SET status = $2, transfer_hash = $3, settled_at = now() \
             WHERE id = $1",
        )
        .bind(transaction_id)
        .bind(status.as_str())
        .bind(transfer_hash)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn find_transaction(
        &self,
        transaction_id: i64,
    ) -> Result<Option<TransactionRecord>, ServiceError> {
        let row = sqlx::query_as::<_, TxRow>(
            "SELECT id, user_id, kind, amount, status, transfer_hash, created_at, settled_at \
             FROM transactions WHERE id = $1",
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        row.map(Self::map_tx_row).transpose()
    }

    async fn list_transactions(
        &self,
        user: UserId,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<TransactionRecord>, u32), ServiceError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(per_page);

        let rows = sqlx::query_as::<_, TxRow>(
            "SELECT id, user_id, kind, amount, status, transfer_hash, created_at, settled_at \
             FROM transactions WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
        )
        .bind(user.get())
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM transactions WHERE user_id = $1",
        )
        .bind(user.get())
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        let records = rows
            .into_iter()
            .map(Self::map_tx_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((records, u32::try_from(total).unwrap_or(u32::MAX)))
    }
}
