//! Ledger persistence: users, referral edges, payout claims, transactions.
//!
//! [`LedgerStore`] is the interface the services and the referral-tree
//! resolver are written against. The production implementation is
//! [`PostgresLedger`] over `sqlx::PgPool`; [`InMemoryLedger`] backs unit
//! tests and local development without a database.

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::InMemoryLedger;
pub use models::{
    CoreTeamMember, REWARD_KIND, ReferralEdge, TransactionRecord, TxStatus, UserRecord,
};
pub use postgres::PostgresLedger;

use uuid::Uuid;

use crate::domain::referral_tree::ReferralLookup;
use crate::domain::{TokenAmount, UserId};
use crate::error::ServiceError;

/// Persistence interface for the user/referral/payout ledger.
///
/// Every method is one logical read or write; multi-step payout flows are
/// sequenced by the service layer, not hidden inside the store.
///
/// [`ReferralLookup`] is a supertrait so the referral-tree resolver can
/// walk parent pointers over any ledger implementation; stores implement
/// it by delegating to [`LedgerStore::find_edge_by_referred`].
pub trait LedgerStore: ReferralLookup + Send + Sync {
    /// Creates a user with a unique email and referral code.
    ///
    /// # Errors
    ///
    /// [`ServiceError::AlreadyRegistered`] when the email is taken;
    /// [`ServiceError::Store`] on database failure.
    fn create_user(
        &self,
        email: &str,
        referral_code: &str,
    ) -> impl Future<Output = Result<UserRecord, ServiceError>> + Send;

    /// Looks up a user by id.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Store`] on database failure.
    fn find_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<UserRecord>, ServiceError>> + Send;

    /// Looks up a user by their referral code.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Store`] on database failure.
    fn find_user_by_referral_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<UserRecord>, ServiceError>> + Send;

    /// Sets a user's wallet address.
    ///
    /// # Errors
    ///
    /// [`ServiceError::UserNotFound`] when the user does not exist;
    /// [`ServiceError::Store`] on database failure.
    fn set_wallet_address(
        &self,
        user: UserId,
        wallet_address: &str,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Creates the referral edge `referrer → referred`.
    ///
    /// # Errors
    ///
    /// [`ServiceError::AlreadyReferred`] when `referred` already has an
    /// inbound edge; [`ServiceError::Store`] on database failure.
    fn create_referral_edge(
        &self,
        referrer: UserId,
        referred: UserId,
    ) -> impl Future<Output = Result<ReferralEdge, ServiceError>> + Send;

    /// Returns the inbound edge of `referred`, if anyone referred them.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Store`] on database failure.
    fn find_edge_by_referred(
        &self,
        referred: UserId,
    ) -> impl Future<Output = Result<Option<ReferralEdge>, ServiceError>> + Send;

    /// Returns the core-team membership of `user`, if any.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Store`] on database failure.
    fn find_core_team_member(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Option<CoreTeamMember>, ServiceError>> + Send;

    /// Claims the payout `(referred, source_event)`, returning `false`
    /// when the claim already exists. The claim is the idempotency
    /// barrier: it must be taken before any gateway call.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Store`] on database failure.
    fn claim_payout(
        &self,
        referred: UserId,
        source_event: Uuid,
    ) -> impl Future<Output = Result<bool, ServiceError>> + Send;

    /// Inserts a pending reward transaction intent and returns its row id.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Store`] on database failure.
    fn insert_reward_intent(
        &self,
        recipient: UserId,
        amount: TokenAmount,
    ) -> impl Future<Output = Result<i64, ServiceError>> + Send;

    /// Reconciles a transaction intent to its settled status, recording
    /// the transfer hash for completed payouts.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Store`] on database failure.
    fn settle_transaction(
        &self,
        transaction_id: i64,
        status: TxStatus,
        transfer_hash: Option<&str>,
    ) -> impl Future<Output = Result<(), ServiceError>> + Send;

    /// Returns one transaction row by id.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Store`] on database failure.
    fn find_transaction(
        &self,
        transaction_id: i64,
    ) -> impl Future<Output = Result<Option<TransactionRecord>, ServiceError>> + Send;

    /// Returns a page of a user's transactions, newest first, plus the
    /// total row count.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Store`] on database failure.
    fn list_transactions(
        &self,
        user: UserId,
        page: u32,
        per_page: u32,
    ) -> impl Future<Output = Result<(Vec<TransactionRecord>, u32), ServiceError>> + Send;
}
