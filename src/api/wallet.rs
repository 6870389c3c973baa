// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{
    account_for,
    extract::{ApiJson, ApiQuery},
};
use crate::{
    auth::TelegramAuth,
    error::ApiError,
    models::{CreditRequest, LedgerCategory, LedgerEntry},
    state::AppState,
};

pub const DEFAULT_TRANSACTIONS_LIMIT: usize = 20;
pub const MAX_TRANSACTIONS_LIMIT: usize = 100;

#[derive(Debug, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub balance: Decimal,
    pub total_earned: Decimal,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct TransactionsQuery {
    /// Maximum entries to return (default 20, max 100)
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionsResponse {
    /// Newest first
    pub transactions: Vec<LedgerEntry>,
}

/// User-initiated balance change.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AddRewardRequest {
    #[serde(rename = "type")]
    pub category: LedgerCategory,
    /// Positive amount; withdrawals are debited by this amount
    #[schema(value_type = String, example = "25.00")]
    pub amount: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddRewardResponse {
    pub transaction_id: Uuid,
    pub balance: Decimal,
    pub total_earned: Decimal,
}

#[utoipa::path(
    get,
    path = "/v1/wallet/balance",
    tag = "Wallet",
    security(("tma" = [])),
    responses(
        (status = 200, body = BalanceResponse),
        (status = 401, description = "Invalid init data"),
        (status = 404, description = "No account for this Telegram user")
    )
)]
pub async fn get_balance(
    TelegramAuth(user): TelegramAuth,
    State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = account_for(&state, &user)?;
    Ok(Json(BalanceResponse {
        balance: account.balance,
        total_earned: account.total_earned,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/wallet/transactions",
    params(TransactionsQuery),
    tag = "Wallet",
    security(("tma" = [])),
    responses(
        (status = 200, body = TransactionsResponse),
        (status = 401, description = "Invalid init data"),
        (status = 404, description = "No account for this Telegram user")
    )
)]
pub async fn list_transactions(
    TelegramAuth(user): TelegramAuth,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let account = account_for(&state, &user)?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_TRANSACTIONS_LIMIT)
        .clamp(1, MAX_TRANSACTIONS_LIMIT);

    let transactions = state.db.ledger_entries(&account.id, limit)?;
    Ok(Json(TransactionsResponse { transactions }))
}

/// Record a task reward or a withdrawal for the caller.
///
/// `ad_reward` and `referral_bonus` entries are issued by the server only.
#[utoipa::path(
    post,
    path = "/v1/wallet/add-reward",
    request_body = AddRewardRequest,
    tag = "Wallet",
    security(("tma" = [])),
    responses(
        (status = 200, body = AddRewardResponse),
        (status = 401, description = "Invalid init data"),
        (status = 404, description = "No account for this Telegram user"),
        (status = 422, description = "Amount, type or balance rejected")
    )
)]
pub async fn add_reward(
    TelegramAuth(user): TelegramAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AddRewardRequest>,
) -> Result<Json<AddRewardResponse>, ApiError> {
    let account = account_for(&state, &user)?;

    if request.amount <= Decimal::ZERO {
        return Err(ApiError::unprocessable("Amount must be positive"));
    }

    let amount = match request.category {
        LedgerCategory::TaskReward => request.amount,
        LedgerCategory::Withdrawal => {
            if account.balance < state.rewards.min_withdrawal {
                return Err(ApiError::unprocessable(format!(
                    "Minimum balance for withdrawal is {} points",
                    state.rewards.min_withdrawal
                )));
            }
            if account.balance < request.amount {
                return Err(ApiError::unprocessable("Insufficient balance"));
            }
            -request.amount
        }
        LedgerCategory::AdReward | LedgerCategory::ReferralBonus => {
            return Err(ApiError::unprocessable(format!(
                "Transactions of type '{}' cannot be submitted by clients",
                request.category
            )));
        }
    };

    let mut credit = CreditRequest::new(account.id, amount, request.category);
    if let Some(description) = request.description {
        credit = credit.with_description(description);
    }
    if let Some(metadata) = request.metadata {
        credit = credit.with_metadata(metadata);
    }

    let entry = state.db.apply_credit(&credit)?;
    let updated = state.db.account(&account.id)?.ok_or_else(|| {
        ApiError::internal(format!("account {} vanished after credit", account.id))
    })?;

    tracing::info!(
        account_id = %account.id,
        entry_id = %entry.id,
        category = %entry.category,
        amount = %entry.amount,
        "Wallet transaction recorded"
    );

    Ok(Json(AddRewardResponse {
        transaction_id: entry.id,
        balance: updated.balance,
        total_earned: updated.total_earned,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TelegramUser;
    use crate::models::{Account, NewAccount};
    use crate::state::test_support::test_state;
    use axum::http::StatusCode;
    use serde_json::json;

    fn tg(id: i64) -> TelegramAuth {
        TelegramAuth(serde_json::from_value::<TelegramUser>(json!({ "id": id })).unwrap())
    }

    fn seed(state: &AppState, telegram_id: i64, balance: i64) -> Account {
        let account = Account::new(
            NewAccount {
                telegram_id: Some(telegram_id),
                ..Default::default()
            },
            format!("W{telegram_id:07}"),
        );
        state.db.create_account(&account).unwrap();
        if balance > 0 {
            state
                .db
                .apply_credit(&CreditRequest::new(
                    account.id,
                    Decimal::new(balance, 0),
                    LedgerCategory::TaskReward,
                ))
                .unwrap();
        }
        account
    }

    fn reward(category: LedgerCategory, amount: i64) -> ApiJson<AddRewardRequest> {
        ApiJson(AddRewardRequest {
            category,
            amount: Decimal::new(amount, 0),
            description: Some("test".into()),
            metadata: None,
        })
    }

    #[tokio::test]
    async fn balance_requires_account() {
        let (state, _temp_dir) = test_state();
        let err = get_balance(tg(42), State(state)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    async fn submit(
        state: &AppState,
        telegram_id: i64,
        category: LedgerCategory,
        amount: i64,
    ) -> Result<AddRewardResponse, ApiError> {
        add_reward(tg(telegram_id), State(state.clone()), reward(category, amount))
            .await
            .map(|Json(response)| response)
    }

    async fn history(state: &AppState, telegram_id: i64, limit: Option<usize>) -> Vec<LedgerEntry> {
        let Json(response) = list_transactions(
            tg(telegram_id),
            State(state.clone()),
            ApiQuery(TransactionsQuery { limit }),
        )
        .await
        .unwrap();
        response.transactions
    }

    #[tokio::test]
    async fn task_reward_increases_balance_and_total() {
        let (state, _temp_dir) = test_state();
        seed(&state, 42, 0);

        let response = submit(&state, 42, LedgerCategory::TaskReward, 25).await.unwrap();
        assert_eq!(response.balance, Decimal::new(25, 0));
        assert_eq!(response.total_earned, Decimal::new(25, 0));

        let Json(balance) = get_balance(tg(42), State(state)).await.unwrap();
        assert_eq!(balance.balance, Decimal::new(25, 0));
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let (state, _temp_dir) = test_state();
        seed(&state, 42, 0);

        for amount in [0, -5] {
            let err = submit(&state, 42, LedgerCategory::TaskReward, amount)
                .await
                .unwrap_err();
            assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[tokio::test]
    async fn system_categories_are_rejected() {
        let (state, _temp_dir) = test_state();
        let account = seed(&state, 42, 0);

        for category in [LedgerCategory::AdReward, LedgerCategory::ReferralBonus] {
            let err = submit(&state, 42, category, 10).await.unwrap_err();
            assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        }
        assert!(state.db.ledger_entries(&account.id, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn withdrawal_enforces_minimum_and_balance() {
        let (state, _temp_dir) = test_state();
        seed(&state, 42, 999);
        let err = submit(&state, 42, LedgerCategory::Withdrawal, 10)
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        seed(&state, 43, 1200);
        let err = submit(&state, 43, LedgerCategory::Withdrawal, 1500)
            .await
            .unwrap_err();
        assert_eq!(err.message, "Insufficient balance");

        let response = submit(&state, 43, LedgerCategory::Withdrawal, 1000)
            .await
            .unwrap();
        assert_eq!(response.balance, Decimal::new(200, 0));
        assert_eq!(response.total_earned, Decimal::new(1200, 0));
    }

    #[tokio::test]
    async fn transactions_are_newest_first_and_limited() {
        let (state, _temp_dir) = test_state();
        seed(&state, 42, 0);
        for amount in 1..=5 {
            submit(&state, 42, LedgerCategory::TaskReward, amount)
                .await
                .unwrap();
            // Ledger keys order by microsecond timestamp
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let all = history(&state, 42, None).await;
        assert_eq!(all.len(), 5);
        let amounts: Vec<Decimal> = all.iter().map(|entry| entry.amount).collect();
        assert_eq!(amounts, (1..=5).rev().map(|n| Decimal::new(n, 0)).collect::<Vec<_>>());

        let two = history(&state, 42, Some(2)).await;
        assert_eq!(two.len(), 2);
        assert_eq!(two[1].amount, Decimal::new(4, 0));
    }
}
