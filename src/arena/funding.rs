//! Deposit and withdrawal flows: the admin-review gateway into the ledger.

use crate::arena::referral::ReferralEvaluator;
use crate::db::repo::{DepositDecision, WithdrawalDecision, WithdrawalOutcome};
use crate::db::Repository;
use crate::domain::{Amount, DepositRequest, UserId, WithdrawalRequest};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum FundingError {
    #[error("account not found")]
    AccountNotFound,
    #[error("amount must be positive")]
    InvalidAmount,
    #[error("request not found")]
    RequestNotFound,
    #[error("request already decided")]
    AlreadyDecided,
    #[error("balance cannot cover the withdrawal")]
    InsufficientFunds,
    #[error("refund could not be applied")]
    RefundFailed,
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct Funding {
    repo: Arc<Repository>,
    referral: ReferralEvaluator,
}

impl Funding {
    pub fn new(repo: Arc<Repository>, referral: ReferralEvaluator) -> Self {
        Self { repo, referral }
    }

    /// Record a deposit request awaiting admin review.
    ///
    /// Idempotent on the external payment reference: a duplicate submission
    /// returns the already-recorded request instead of creating a second one.
    pub async fn request_deposit(
        &self,
        user_id: &UserId,
        amount: Amount,
        external_ref: Option<String>,
    ) -> Result<DepositRequest, FundingError> {
        if !amount.is_positive() {
            return Err(FundingError::InvalidAmount);
        }
        if self.repo.get_account(user_id).await?.is_none() {
            return Err(FundingError::AccountNotFound);
        }

        let request = DepositRequest::new(user_id.clone(), amount, external_ref);
        if self.repo.insert_deposit_request(&request).await? {
            info!(user = %user_id, amount = amount.as_minor_units(), "deposit requested");
            return Ok(request);
        }

        // Collapsed into the earlier request with the same event key.
        self.repo
            .get_deposit_request_by_event_key(&request.event_key)
            .await?
            .ok_or(FundingError::RequestNotFound)
    }

    /// Admin approval: credit the wallet and run the referral evaluator.
    pub async fn approve_deposit(&self, request_id: &str) -> Result<(), FundingError> {
        match self.repo.approve_deposit_atomic(request_id).await? {
            DepositDecision::Approved {
                user_id,
                amount,
                new_balance,
                ..
            } => {
                info!(
                    request_id,
                    user = %user_id,
                    amount = amount.as_minor_units(),
                    balance = new_balance.as_minor_units(),
                    "deposit approved"
                );
                // The deposit stands regardless of referral bookkeeping.
                if let Err(e) = self.referral.on_deposit_completed(&user_id, amount).await {
                    warn!(user = %user_id, error = %e, "referral evaluation failed");
                }
                Ok(())
            }
            DepositDecision::AlreadyDecided => Err(FundingError::AlreadyDecided),
            DepositDecision::RequestMissing => Err(FundingError::RequestNotFound),
            DepositDecision::AccountMissing => Err(FundingError::AccountNotFound),
            DepositDecision::Rejected => Err(FundingError::AlreadyDecided),
        }
    }

    /// Admin rejection: mark the request; no ledger activity.
    pub async fn reject_deposit(&self, request_id: &str) -> Result<(), FundingError> {
        match self.repo.reject_deposit_atomic(request_id).await? {
            DepositDecision::Rejected => {
                info!(request_id, "deposit rejected");
                Ok(())
            }
            DepositDecision::AlreadyDecided => Err(FundingError::AlreadyDecided),
            DepositDecision::RequestMissing => Err(FundingError::RequestNotFound),
            _ => Err(FundingError::AlreadyDecided),
        }
    }

    /// Create a withdrawal request, holding the amount immediately.
    pub async fn request_withdrawal(
        &self,
        user_id: &UserId,
        amount: Amount,
    ) -> Result<WithdrawalRequest, FundingError> {
        if !amount.is_positive() {
            return Err(FundingError::InvalidAmount);
        }
        if self.repo.get_account(user_id).await?.is_none() {
            return Err(FundingError::AccountNotFound);
        }

        match self.repo.create_withdrawal_atomic(user_id, amount).await? {
            WithdrawalOutcome::Created(request) => {
                info!(
                    user = %user_id,
                    amount = amount.as_minor_units(),
                    request_id = %request.id,
                    "withdrawal requested, funds held"
                );
                Ok(request)
            }
            WithdrawalOutcome::InsufficientFunds { entry_id } => {
                warn!(user = %user_id, entry_id = %entry_id, "withdrawal rejected: insufficient balance");
                Err(FundingError::InsufficientFunds)
            }
            WithdrawalOutcome::AccountMissing { .. } => Err(FundingError::AccountNotFound),
        }
    }

    /// Admin approval: the hold already moved the funds off the wallet.
    pub async fn approve_withdrawal(&self, request_id: &str) -> Result<(), FundingError> {
        match self.repo.approve_withdrawal_atomic(request_id).await? {
            WithdrawalDecision::Approved => {
                info!(request_id, "withdrawal approved");
                Ok(())
            }
            WithdrawalDecision::AlreadyDecided => Err(FundingError::AlreadyDecided),
            WithdrawalDecision::RequestMissing => Err(FundingError::RequestNotFound),
            _ => Err(FundingError::AlreadyDecided),
        }
    }

    /// Admin rejection: refund the held amount through a refund entry.
    pub async fn reject_withdrawal(&self, request_id: &str) -> Result<(), FundingError> {
        match self.repo.reject_withdrawal_atomic(request_id).await? {
            WithdrawalDecision::Rejected { new_balance, .. } => {
                info!(
                    request_id,
                    balance = new_balance.as_minor_units(),
                    "withdrawal rejected, hold refunded"
                );
                Ok(())
            }
            WithdrawalDecision::AlreadyDecided => Err(FundingError::AlreadyDecided),
            WithdrawalDecision::RequestMissing => Err(FundingError::RequestNotFound),
            WithdrawalDecision::RefundFailed => Err(FundingError::RefundFailed),
            WithdrawalDecision::Approved => Err(FundingError::AlreadyDecided),
        }
    }
}
