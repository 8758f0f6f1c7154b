//! Account service: signup, referral edge creation, wallet linkage,
//! profile and transaction retrieval.
//!
//! Referral edges are created here, at signup time — which is where the
//! forest's acyclicity is enforced. The reward engine assumes edges are
//! acyclic and never re-validates during resolution.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::referral_tree;
use crate::domain::{EventBus, RewardEvent, UserId};
use crate::error::ServiceError;
use crate::store::{LedgerStore, TransactionRecord, UserRecord};

/// A user profile as served to the API layer.
#[derive(Debug, Clone)]
pub struct UserProfile {
    /// The user record.
    pub user: UserRecord,
    /// Who referred this user, if anyone.
    pub referrer_id: Option<UserId>,
    /// Whether this user is a core-team member.
    pub core_team: bool,
}

/// Orchestration layer for account operations.
#[derive(Debug)]
pub struct AccountService<S> {
    store: Arc<S>,
    event_bus: EventBus,
}

impl<S: LedgerStore> AccountService<S> {
    /// Creates a new `AccountService`.
    #[must_use]
    pub fn new(store: Arc<S>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Registers a new user, optionally under a referrer's code.
    ///
    /// The referral code is resolved before the user row is created so an
    /// unknown code fails the whole signup instead of leaving an
    /// unreferred account behind.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidRequest`] — malformed email or unknown
    ///   referral code.
    /// - [`ServiceError::AlreadyRegistered`] — email already in use.
    /// - [`ServiceError::Store`] — ledger failure.
    pub async fn register(
        &self,
        email: &str,
        referral_code: Option<&str>,
    ) -> Result<UserRecord, ServiceError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ServiceError::InvalidRequest(format!(
                "invalid email address: {email}"
            )));
        }

        let referrer = match referral_code {
            Some(code) => Some(
                self.store
                    .find_user_by_referral_code(code)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::InvalidRequest(format!("unknown referral code: {code}"))
                    })?,
            ),
            None => None,
        };

        let own_code = generate_referral_code();
        let user = self.store.create_user(email, &own_code).await?;
        tracing::info!(user = %user.id, "user registered");

        if let Some(referrer) = referrer {
            self.create_edge(referrer.id, user.id).await?;
        }

        Ok(user)
    }

    /// Creates the edge `referrer → referred` after acyclicity checks.
    ///
    /// Self-referral and any edge that would make `referred` an ancestor
    /// of its own referrer are rejected; the resolver's termination
    /// depends on this guard running at creation time.
    async fn create_edge(&self, referrer: UserId, referred: UserId) -> Result<(), ServiceError> {
        if referrer == referred
            || referral_tree::is_ancestor(self.store.as_ref(), referred, referrer).await?
        {
            return Err(ServiceError::ReferralCycle(referred));
        }

        self.store.create_referral_edge(referrer, referred).await?;
        tracing::info!(%referrer, %referred, "referral edge created");
        let _ = self.event_bus.publish(RewardEvent::ReferralRegistered {
            referrer,
            referred,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Links a wallet address to a user account.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidRequest`] — empty or whitespace address.
    /// - [`ServiceError::UserNotFound`] — no such user.
    /// - [`ServiceError::Store`] — ledger failure.
    pub async fn link_wallet(
        &self,
        user: UserId,
        wallet_address: &str,
    ) -> Result<(), ServiceError> {
        let wallet_address = wallet_address.trim();
        if wallet_address.is_empty() || wallet_address.chars().any(char::is_whitespace) {
            return Err(ServiceError::InvalidRequest(
                "wallet address must be a non-empty token".to_string(),
            ));
        }

        self.store.set_wallet_address(user, wallet_address).await?;
        tracing::info!(%user, "wallet linked");
        let _ = self.event_bus.publish(RewardEvent::WalletLinked {
            user,
            wallet_address: wallet_address.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Returns the profile for `user`.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::UserNotFound`] — no such user.
    /// - [`ServiceError::Store`] — ledger failure.
    pub async fn profile(&self, user: UserId) -> Result<UserProfile, ServiceError> {
        let record = self
            .store
            .find_user(user)
            .await?
            .ok_or(ServiceError::UserNotFound(user))?;
        let referrer_id = self
            .store
            .find_edge_by_referred(user)
            .await?
            .map(|edge| edge.referrer_id);
        let core_team = self.store.find_core_team_member(user).await?.is_some();

        Ok(UserProfile {
            user: record,
            referrer_id,
            core_team,
        })
    }

    /// Returns a page of `user`'s transactions plus the total count.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::UserNotFound`] — no such user.
    /// - [`ServiceError::Store`] — ledger failure.
    pub async fn transactions(
        &self,
        user: UserId,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<TransactionRecord>, u32), ServiceError> {
        if self.store.find_user(user).await?.is_none() {
            return Err(ServiceError::UserNotFound(user));
        }
        self.store.list_transactions(user, page, per_page).await
    }

    /// Resolves the root ancestor of `user`'s referral chain.
    ///
    /// Returns `None` when `user` has no referrer.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::UserNotFound`] — no such user.
    /// - [`ServiceError::ReferralCycle`] — corrupted edge data.
    /// - [`ServiceError::Store`] — ledger failure.
    pub async fn find_root(&self, user: UserId) -> Result<Option<UserRecord>, ServiceError> {
        if self.store.find_user(user).await?.is_none() {
            return Err(ServiceError::UserNotFound(user));
        }
        match referral_tree::find_root(self.store.as_ref(), user).await? {
            Some(root_id) => Ok(self.store.find_user(root_id).await?),
            None => Ok(None),
        }
    }
}

/// Generates a short referral code from a fresh UUID.
fn generate_referral_code() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::store::InMemoryLedger;

    fn make_service() -> AccountService<InMemoryLedger> {
        AccountService::new(Arc::new(InMemoryLedger::new()), EventBus::new(100))
    }

    #[tokio::test]
    async fn register_without_code_creates_no_edge() {
        let service = make_service();
        let Ok(user) = service.register("a@example.com", None).await else {
            panic!("registration failed");
        };
        let Ok(profile) = service.profile(user.id).await else {
            panic!("profile failed");
        };
        assert!(profile.referrer_id.is_none());
        assert!(!profile.core_team);
        assert_eq!(user.referral_code.len(), 8);
    }

    #[tokio::test]
    async fn register_with_code_creates_edge() {
        let service = make_service();
        let Ok(referrer) = service.register("a@example.com", None).await else {
            panic!("registration failed");
        };
        let Ok(referred) = service
            .register("b@example.com", Some(&referrer.referral_code))
            .await
        else {
            panic!("registration failed");
        };

        let Ok(profile) = service.profile(referred.id).await else {
            panic!("profile failed");
        };
        assert_eq!(profile.referrer_id, Some(referrer.id));
    }

    #[tokio::test]
    async fn unknown_referral_code_rejects_signup() {
        let service = make_service();
        let result = service.register("a@example.com", Some("nope1234")).await;
        assert!(matches!(result, Err(ServiceError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn malformed_email_is_rejected() {
        let service = make_service();
        assert!(matches!(
            service.register("not-an-email", None).await,
            Err(ServiceError::InvalidRequest(_))
        ));
        assert!(matches!(
            service.register("  ", None).await,
            Err(ServiceError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn self_referral_is_a_cycle() {
        let service = make_service();
        let Ok(user) = service.register("a@example.com", None).await else {
            panic!("registration failed");
        };
        let result = service.create_edge(user.id, user.id).await;
        assert!(matches!(result, Err(ServiceError::ReferralCycle(_))));
    }

    #[tokio::test]
    async fn closing_edge_over_existing_chain_is_a_cycle() {
        let service = make_service();
        let Ok(a) = service.register("a@example.com", None).await else {
            panic!("registration failed");
        };
        let Ok(b) = service
            .register("b@example.com", Some(&a.referral_code))
            .await
        else {
            panic!("registration failed");
        };

        // a referred b; an edge b -> a would close the loop.
        let result = service.create_edge(b.id, a.id).await;
        assert!(matches!(result, Err(ServiceError::ReferralCycle(_))));
    }

    #[tokio::test]
    async fn link_wallet_validates_address() {
        let service = make_service();
        let Ok(user) = service.register("a@example.com", None).await else {
            panic!("registration failed");
        };

        assert!(matches!(
            service.link_wallet(user.id, "   ").await,
            Err(ServiceError::InvalidRequest(_))
        ));
        assert!(service.link_wallet(user.id, "0xabc123").await.is_ok());

        let Ok(profile) = service.profile(user.id).await else {
            panic!("profile failed");
        };
        assert_eq!(profile.user.wallet_address.as_deref(), Some("0xabc123"));
    }

    #[tokio::test]
    async fn find_root_walks_the_chain() {
        let service = make_service();
        let Ok(a) = service.register("a@example.com", None).await else {
            panic!("registration failed");
        };
        let Ok(b) = service
            .register("b@example.com", Some(&a.referral_code))
            .await
        else {
            panic!("registration failed");
        };
        let Ok(c) = service
            .register("c@example.com", Some(&b.referral_code))
            .await
        else {
            panic!("registration failed");
        };

        let Ok(Some(root)) = service.find_root(c.id).await else {
            panic!("expected a root");
        };
        assert_eq!(root.id, a.id);

        // The top of the chain has no root of its own.
        let Ok(none) = service.find_root(a.id).await else {
            panic!("resolution failed");
        };
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn transactions_for_unknown_user_404() {
        let service = make_service();
        let result = service.transactions(UserId::new(999), 1, 20).await;
        assert!(matches!(result, Err(ServiceError::UserNotFound(_))));
    }
}
