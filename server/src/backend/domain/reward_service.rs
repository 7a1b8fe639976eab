use anyhow::Result;
use shared::validation::{validate_create_reward, validate_reward_costs, validate_update_reward};
use shared::{
    CreateRewardRequest, RedeemRewardRequest, RedeemRewardResponse, Reward, RewardListRequest, RewardListResponse,
    TransactionKind, UpdateRewardRequest, User,
};
use tracing::{info, warn};

use crate::backend::domain::errors::validated;
use crate::backend::domain::transaction_service::recorded;
use crate::backend::domain::{ensure_parent, find_member, now_timestamp, DomainError};
use crate::backend::storage::{DbConnection, NewEntry, RewardRepository, TransactionRepository, UserRepository};

/// Service for the reward catalogue and redemptions
#[derive(Clone)]
pub struct RewardService {
    rewards: RewardRepository,
    users: UserRepository,
    transactions: TransactionRepository,
}

impl RewardService {
    pub fn new(db: DbConnection) -> Self {
        Self {
            rewards: RewardRepository::new(db.clone()),
            users: UserRepository::new(db.clone()),
            transactions: TransactionRepository::new(db),
        }
    }

    /// Inactive rewards are only listed for parents who ask for them
    pub async fn list_rewards(&self, actor: &User, query: RewardListRequest) -> Result<RewardListResponse> {
        let include_inactive = query.include_inactive && actor.is_parent();
        let rewards = self.rewards.list_rewards(&actor.household_id, include_inactive).await?;
        info!("Found {} rewards for {}", rewards.len(), actor.household_id);
        Ok(RewardListResponse { rewards })
    }

    pub async fn get_reward(&self, actor: &User, reward_id: &str) -> Result<Reward> {
        self.rewards
            .get_reward(&actor.household_id, reward_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reward").into())
    }

    pub async fn create_reward(&self, actor: &User, request: CreateRewardRequest) -> Result<Reward> {
        ensure_parent(actor, "create rewards")?;
        validated(validate_create_reward(&request))?;

        let now = now_timestamp();
        let reward = Reward {
            id: Reward::generate_id(),
            household_id: actor.household_id.clone(),
            title: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            cost_points: request.cost_points,
            cost_money: request.cost_money,
            is_active: true,
            created_at: now.clone(),
            updated_at: now,
        };
        self.rewards.store_reward(&reward).await?;

        info!("Created reward '{}' with ID: {}", reward.title, reward.id);
        Ok(reward)
    }

    pub async fn update_reward(&self, actor: &User, reward_id: &str, request: UpdateRewardRequest) -> Result<Reward> {
        ensure_parent(actor, "edit rewards")?;
        let mut reward = self.get_reward(actor, reward_id).await?;
        validated(validate_update_reward(&request))?;

        if let Some(title) = request.title {
            reward.title = title.trim().to_string();
        }
        if let Some(description) = request.description {
            reward.description = description.trim().to_string();
        }
        if let Some(cost_points) = request.cost_points {
            reward.cost_points = cost_points;
        }
        if let Some(cost_money) = request.cost_money {
            reward.cost_money = cost_money;
        }
        if let Some(is_active) = request.is_active {
            reward.is_active = is_active;
        }
        validated(validate_reward_costs(reward.cost_points, reward.cost_money))?;
        reward.updated_at = now_timestamp();

        self.rewards.update_reward(&reward).await?;
        info!("Updated reward {}", reward.id);
        Ok(reward)
    }

    pub async fn delete_reward(&self, actor: &User, reward_id: &str) -> Result<()> {
        ensure_parent(actor, "delete rewards")?;
        if !self.rewards.delete_reward(&actor.household_id, reward_id).await? {
            return Err(DomainError::not_found("Reward").into());
        }
        info!("Deleted reward {}", reward_id);
        Ok(())
    }

    /// Spend points and money on a reward. A parent may redeem on behalf
    /// of another member by naming them in the request.
    pub async fn redeem_reward(
        &self,
        actor: &User,
        reward_id: &str,
        request: RedeemRewardRequest,
    ) -> Result<RedeemRewardResponse> {
        let reward = self.get_reward(actor, reward_id).await?;
        if !reward.is_active {
            return Err(DomainError::Validation("This reward is no longer available".to_string()).into());
        }

        let recipient = match request.user_id {
            Some(user_id) if user_id != actor.id => {
                ensure_parent(actor, "redeem rewards for someone else")?;
                find_member(&self.users, &actor.household_id, &user_id).await?
            }
            _ => actor.clone(),
        };

        let entry = NewEntry {
            household_id: actor.household_id.clone(),
            user_id: recipient.id.clone(),
            kind: TransactionKind::RewardRedemption,
            description: format!("Reward: {}", reward.title),
            points: -reward.cost_points,
            money: -reward.cost_money,
            related_id: Some(reward.id.clone()),
            created_at: now_timestamp(),
        };

        let transaction = match recorded(self.transactions.record_entry(&entry, None).await?) {
            Ok(transaction) => transaction,
            Err(e) => {
                warn!("Redemption of {} by {} refused: {}", reward.id, recipient.id, e);
                return Err(e);
            }
        };

        info!("{} redeemed reward {}", recipient.id, reward.id);
        Ok(RedeemRewardResponse {
            transaction,
            success_message: format!("{} redeemed {}!", recipient.name, reward.title),
        })
    }
}
