//! Back-office operations: store approval, coupons and the support inbox.

use pedeai_core::{CouponId, Role, StoreStatus, SupportSender, UserId};
use tracing::instrument;

use crate::backend::{Backend, BackendError, Direction, Query};
use crate::error::ServiceError;
use crate::models::coupon::CouponActive;
use crate::models::support::NewSupportMessage;
use crate::models::{
    Coupon, NewCoupon, Profile, StoreApproval, SupportConversation, SupportMessage,
    group_conversations,
};

use super::signed_in;

/// Operations available to staff accounts.
pub struct StaffService<'a> {
    backend: &'a Backend,
}

impl<'a> StaffService<'a> {
    #[must_use]
    pub const fn new(backend: &'a Backend) -> Self {
        Self { backend }
    }

    /// Every store profile, newest registration first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn stores(&self) -> Result<Vec<Profile>, ServiceError> {
        Ok(self
            .backend
            .select(
                &Query::table("profiles")
                    .eq("role", Role::Store)
                    .order("created_at", Direction::Desc),
            )
            .await?)
    }

    /// Approve a store.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no store has this id.
    pub async fn approve_store(&self, store_id: UserId) -> Result<Profile, ServiceError> {
        self.set_store_status(store_id, StoreStatus::Approved).await
    }

    /// Reject or suspend a store.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if no store has this id.
    pub async fn reject_store(&self, store_id: UserId) -> Result<Profile, ServiceError> {
        self.set_store_status(store_id, StoreStatus::Rejected).await
    }

    #[instrument(skip(self))]
    async fn set_store_status(&self, store_id: UserId, status: StoreStatus) -> Result<Profile, ServiceError> {
        let updated: Vec<Profile> = self
            .backend
            .update(
                &Query::table("profiles")
                    .eq("id", store_id)
                    .eq("role", Role::Store),
                &StoreApproval { status },
            )
            .await?;
        let profile = updated
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound(format!("Loja {store_id}")))?;
        tracing::info!(store_id = %store_id, status = %status, "Store status changed");
        Ok(profile)
    }

    /// All coupons, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn coupons(&self) -> Result<Vec<Coupon>, ServiceError> {
        Ok(self
            .backend
            .select(&Query::table("coupons").order("created_at", Direction::Desc))
            .await?)
    }

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for a blank code or an invalid
    /// value, and `ServiceError::Conflict` if the code already exists.
    #[instrument(skip(self, coupon), fields(code = %coupon.code))]
    pub async fn create_coupon(&self, coupon: &NewCoupon) -> Result<Coupon, ServiceError> {
        if coupon.code.is_empty() {
            return Err(ServiceError::Validation("Informe o código do cupom".to_string()));
        }
        coupon.discount().validate()?;

        match self.backend.insert("coupons", coupon).await {
            Ok(created) => Ok(created),
            Err(BackendError::Conflict(_)) => Err(ServiceError::Conflict(format!(
                "Cupom {} já existe",
                coupon.code
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Turn a coupon on or off.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for unknown coupons.
    #[instrument(skip(self))]
    pub async fn set_coupon_active(&self, coupon_id: CouponId, active: bool) -> Result<Coupon, ServiceError> {
        let updated: Vec<Coupon> = self
            .backend
            .update(
                &Query::table("coupons").eq("id", coupon_id),
                &CouponActive { active },
            )
            .await?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::NotFound(format!("Cupom {coupon_id}")))
    }

    /// Flip a coupon's active flag.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` for unknown coupons.
    pub async fn toggle_coupon(&self, coupon_id: CouponId) -> Result<Coupon, ServiceError> {
        let current: Coupon = match self
            .backend
            .select_single(&Query::table("coupons").eq("id", coupon_id))
            .await
        {
            Ok(coupon) => coupon,
            Err(BackendError::NotFound(_)) => {
                return Err(ServiceError::NotFound(format!("Cupom {coupon_id}")));
            }
            Err(e) => return Err(e.into()),
        };
        self.set_coupon_active(coupon_id, !current.active).await
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` if nothing was deleted.
    #[instrument(skip(self))]
    pub async fn delete_coupon(&self, coupon_id: CouponId) -> Result<(), ServiceError> {
        let removed = self
            .backend
            .delete(&Query::table("coupons").eq("id", coupon_id))
            .await?;
        if removed == 0 {
            return Err(ServiceError::NotFound(format!("Cupom {coupon_id}")));
        }
        Ok(())
    }

    /// Support messages grouped per user, most recent conversation first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    #[instrument(skip(self))]
    pub async fn inbox(&self) -> Result<Vec<SupportConversation>, ServiceError> {
        let messages: Vec<SupportMessage> = self
            .backend
            .select(&Query::table("support_messages").order("created_at", Direction::Desc))
            .await?;
        Ok(group_conversations(messages))
    }

    /// Answer a user's support conversation.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Validation` for blank text.
    #[instrument(skip(self, text))]
    pub async fn reply(&self, user_id: UserId, text: &str) -> Result<SupportMessage, ServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::Validation("Mensagem vazia".to_string()));
        }
        let staff_id = signed_in(self.backend).await?;

        Ok(self
            .backend
            .insert(
                "support_messages",
                &NewSupportMessage {
                    user_id,
                    staff_id: Some(staff_id),
                    text,
                    sender_type: SupportSender::Staff,
                },
            )
            .await?)
    }
}
