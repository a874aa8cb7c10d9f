//! Responder rewards in the PULSE token
//!
//! Reward amounts are a pure function of response metrics. Transfers debit
//! the treasury (the operator account) and credit the responder in a single
//! transfer transaction, so a rejected transfer moves nothing.

use crate::client::LedgerClient;
use crate::event::now_millis;
use crate::metrics::REWARD_UNITS_TRANSFERRED;
use crate::network::Operation;
use crate::types::{AccountId, TokenId, TokenSpec, TransferReceipt};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Reward for every completed response
pub const BASE_REWARD: u64 = 50;

/// Bonus for arriving within [`FAST_RESPONSE_SECONDS`]
pub const FAST_RESPONSE_BONUS: u64 = 25;

/// Response time (exclusive) that earns the fast-response bonus
pub const FAST_RESPONSE_SECONDS: f64 = 180.0;

/// Bonus for a perfect rating
pub const RATING_BONUS: u64 = 10;

/// Rating that earns [`RATING_BONUS`]
pub const PERFECT_RATING: f64 = 5.0;

/// Reward token name
pub const REWARD_TOKEN_NAME: &str = "PulsePoint Reward Token";

/// Reward token symbol
pub const REWARD_TOKEN_SYMBOL: &str = "PULSE";

/// Reward token decimals
pub const REWARD_TOKEN_DECIMALS: u32 = 2;

/// Units minted into the treasury at creation
pub const REWARD_TOKEN_INITIAL_SUPPLY: u64 = 1_000_000;

/// Compute the reward for a response
///
/// 50 base, +25 when `response_time_seconds < 180`, +10 when `rating == 5`.
pub fn calculate_reward(response_time_seconds: f64, rating: f64) -> u64 {
    let mut reward = BASE_REWARD;

    if response_time_seconds < FAST_RESPONSE_SECONDS {
        reward += FAST_RESPONSE_BONUS;
    }

    if rating == PERFECT_RATING {
        reward += RATING_BONUS;
    }

    reward
}

/// Why a reward was issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardReason {
    /// Plain completed response
    Response,
    /// Response under the fast-response threshold
    FastResponse,
    /// Perfect rating
    RatingBonus,
}

/// A reward owed to a responder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardTransfer {
    /// Responder account credited
    pub responder_id: AccountId,
    /// Token units
    pub amount: u64,
    /// Reason label
    pub reason: RewardReason,
    /// Alert the response belongs to
    pub alert_id: String,
    /// Epoch milliseconds
    pub timestamp: i64,
}

impl RewardTransfer {
    /// Reward for a completed response, amount from [`calculate_reward`]
    ///
    /// The reason names the largest bonus earned.
    pub fn for_response(
        responder_id: AccountId,
        alert_id: impl Into<String>,
        response_time_seconds: f64,
        rating: f64,
    ) -> Self {
        let reason = if response_time_seconds < FAST_RESPONSE_SECONDS {
            RewardReason::FastResponse
        } else if rating == PERFECT_RATING {
            RewardReason::RatingBonus
        } else {
            RewardReason::Response
        };

        Self {
            responder_id,
            amount: calculate_reward(response_time_seconds, rating),
            reason,
            alert_id: alert_id.into(),
            timestamp: now_millis(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.amount == 0 {
            return Err(Error::invalid("amount", "must be positive"));
        }
        if self.alert_id.trim().is_empty() {
            return Err(Error::missing("alertId"));
        }
        Ok(())
    }
}

/// Issues reward transfers from the treasury
pub struct RewardEngine {
    client: Arc<LedgerClient>,
    token: Option<TokenId>,
}

impl RewardEngine {
    /// Create new engine; `token` is the configured reward token
    pub fn new(client: Arc<LedgerClient>, token: Option<TokenId>) -> Self {
        Self { client, token }
    }

    /// Configured reward token
    pub fn token(&self) -> Result<TokenId> {
        self.token
            .ok_or_else(|| Error::Config("HEDERA_REWARD_TOKEN_ID is not set".to_string()))
    }

    /// Move `reward.amount` units from the treasury to the responder
    #[tracing::instrument(skip(self, reward), fields(responder = %reward.responder_id, amount = reward.amount))]
    pub async fn transfer(&self, reward: &RewardTransfer) -> Result<TransferReceipt> {
        reward.validate()?;
        let token = self.token()?;
        let conn = self.client.acquire()?;
        let treasury = conn.operator_id();

        let receipt = conn
            .call(
                Operation::TransferToken,
                conn.network()
                    .transfer_token(token, treasury, reward.responder_id, reward.amount),
            )
            .await?;

        REWARD_UNITS_TRANSFERRED.inc_by(reward.amount);
        info!(
            "Rewarded {} {} to {} for alert {} ({:?})",
            reward.amount, REWARD_TOKEN_SYMBOL, reward.responder_id, reward.alert_id, reward.reason
        );
        Ok(receipt)
    }

    /// Create the reward token with the operator as treasury and supply key
    pub async fn create_reward_token(&self) -> Result<TokenId> {
        let conn = self.client.acquire()?;
        let spec = TokenSpec {
            name: REWARD_TOKEN_NAME.to_string(),
            symbol: REWARD_TOKEN_SYMBOL.to_string(),
            decimals: REWARD_TOKEN_DECIMALS,
            initial_supply: REWARD_TOKEN_INITIAL_SUPPLY,
            treasury: conn.operator_id(),
            supply_key: conn.operator_public_key(),
        };

        let token = conn
            .call(Operation::CreateToken, conn.network().create_token(&spec))
            .await?;
        info!("Created {} token {}", REWARD_TOKEN_SYMBOL, token);
        Ok(token)
    }

    /// Associate a responder account with the reward token
    pub async fn associate(&self, account: AccountId) -> Result<()> {
        let token = self.token()?;
        let conn = self.client.acquire()?;

        conn.call(
            Operation::AssociateToken,
            conn.network().associate_token(account, token),
        )
        .await?;
        info!("Associated token {} with account {}", token, account);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_table() {
        assert_eq!(calculate_reward(170.0, 5.0), 85);
        assert_eq!(calculate_reward(200.0, 4.0), 50);
        assert_eq!(calculate_reward(179.0, 5.0), 85);
        assert_eq!(calculate_reward(180.0, 5.0), 60);
        assert_eq!(calculate_reward(60.0, 3.0), 75);
    }

    #[test]
    fn test_rating_bonus_is_exact() {
        assert_eq!(calculate_reward(300.0, 4.99), 50);
        assert_eq!(calculate_reward(300.0, 4.5), 50);
    }

    #[test]
    fn test_boundary_just_under_threshold() {
        assert_eq!(calculate_reward(179.999, 1.0), 75);
    }

    #[test]
    fn test_reason_selection() {
        let responder = AccountId::new(0, 0, 77);
        assert_eq!(
            RewardTransfer::for_response(responder, "A-1", 90.0, 5.0).reason,
            RewardReason::FastResponse
        );
        assert_eq!(
            RewardTransfer::for_response(responder, "A-1", 400.0, 5.0).reason,
            RewardReason::RatingBonus
        );
        let plain = RewardTransfer::for_response(responder, "A-1", 400.0, 3.0);
        assert_eq!(plain.reason, RewardReason::Response);
        assert_eq!(plain.amount, 50);
    }

    #[test]
    fn test_reason_wire_names() {
        assert_eq!(
            serde_json::to_string(&RewardReason::FastResponse).unwrap(),
            "\"fast_response\""
        );
    }
}
