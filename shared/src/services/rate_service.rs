use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::prelude::*;
use sea_orm::{ActiveModelTrait, IntoActiveModel, QueryOrder, QuerySelect, Set};

use super::ServiceContext;
use crate::entity::rates;
use crate::error::{is_unique_violation, VendoraError, VendoraResult};
use crate::models::RateInput;

pub struct RateService {
    ctx: ServiceContext,
}

fn normalise_asset(asset: &str) -> VendoraResult<String> {
    let asset = asset.trim().to_uppercase();
    if asset.is_empty() || asset.len() > 20 || !asset.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(VendoraError::validation("Asset must be a short alphanumeric symbol, e.g. USDT."));
    }
    Ok(asset)
}

fn ensure_positive(buy: Decimal, sell: Decimal) -> VendoraResult<()> {
    if buy <= Decimal::ZERO || sell <= Decimal::ZERO {
        return Err(VendoraError::validation("Rates must be positive."));
    }
    Ok(())
}

impl RateService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, vendor_id: i32) -> VendoraResult<Vec<rates::Model>> {
        Ok(rates::Entity::find()
            .filter(rates::Column::VendorId.eq(vendor_id))
            .order_by_asc(rates::Column::Asset)
            .all(self.ctx.db.as_ref())
            .await?)
    }

    pub async fn get(&self, vendor_id: i32, id: i32) -> VendoraResult<rates::Model> {
        rates::Entity::find_by_id(id)
            .filter(rates::Column::VendorId.eq(vendor_id))
            .one(self.ctx.db.as_ref())
            .await?
            .ok_or_else(|| VendoraError::not_found("Rate"))
    }

    pub async fn find(&self, vendor_id: i32, asset: &str) -> VendoraResult<Option<rates::Model>> {
        Ok(rates::Entity::find()
            .filter(rates::Column::VendorId.eq(vendor_id))
            .filter(rates::Column::Asset.eq(asset.trim().to_uppercase()))
            .one(self.ctx.db.as_ref())
            .await?)
    }

    /// Distinct asset symbols, for one vendor or across all vendors.
    pub async fn assets(&self, vendor_id: Option<i32>) -> VendoraResult<Vec<String>> {
        let mut query = rates::Entity::find().order_by_asc(rates::Column::Asset);
        if let Some(vendor_id) = vendor_id {
            query = query.filter(rates::Column::VendorId.eq(vendor_id));
        }
        let mut assets: Vec<String> = query
            .all(self.ctx.db.as_ref())
            .await?
            .into_iter()
            .map(|r| r.asset)
            .collect();
        assets.dedup();
        Ok(assets)
    }

    /// Up to `limit` rates for `asset` across vendors, newest first.
    pub async fn for_asset(&self, asset: &str, limit: u64) -> VendoraResult<Vec<rates::Model>> {
        Ok(rates::Entity::find()
            .filter(rates::Column::Asset.eq(asset.trim().to_uppercase()))
            .order_by_desc(rates::Column::UpdatedAt)
            .limit(limit)
            .all(self.ctx.db.as_ref())
            .await?)
    }

    pub async fn create(&self, vendor_id: i32, input: RateInput) -> VendoraResult<rates::Model> {
        let asset = normalise_asset(&input.asset)?;
        ensure_positive(input.buy_rate, input.sell_rate)?;
        let active = rates::ActiveModel {
            vendor_id: Set(vendor_id),
            asset: Set(asset.clone()),
            buy_rate: Set(input.buy_rate.round_dp(2)),
            sell_rate: Set(input.sell_rate.round_dp(2)),
            contract_address: Set(input.contract_address.filter(|s| !s.trim().is_empty())),
            bank_details: Set(input.bank_details.filter(|s| !s.trim().is_empty())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        match active.insert(self.ctx.db.as_ref()).await {
            Ok(rate) => {
                tracing::info!(vendor_id, "rate created for {}", asset);
                Ok(rate)
            }
            Err(e) if is_unique_violation(&e) => Err(VendoraError::Conflict(format!(
                "A rate for {} already exists.",
                asset
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn update(&self, vendor_id: i32, id: i32, input: RateInput) -> VendoraResult<rates::Model> {
        let rate = self.get(vendor_id, id).await?;
        let asset = normalise_asset(&input.asset)?;
        ensure_positive(input.buy_rate, input.sell_rate)?;
        let mut active = rate.into_active_model();
        active.asset = Set(asset.clone());
        active.buy_rate = Set(input.buy_rate.round_dp(2));
        active.sell_rate = Set(input.sell_rate.round_dp(2));
        active.contract_address = Set(input.contract_address.filter(|s| !s.trim().is_empty()));
        active.bank_details = Set(input.bank_details.filter(|s| !s.trim().is_empty()));
        active.updated_at = Set(Utc::now());
        match active.update(self.ctx.db.as_ref()).await {
            Ok(rate) => Ok(rate),
            Err(e) if is_unique_violation(&e) => Err(VendoraError::Conflict(format!(
                "A rate for {} already exists.",
                asset
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete(&self, vendor_id: i32, id: i32) -> VendoraResult<()> {
        let rate = self.get(vendor_id, id).await?;
        rates::Entity::delete_by_id(rate.id)
            .exec(self.ctx.db.as_ref())
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> VendoraResult<u64> {
        Ok(rates::Entity::find().count(self.ctx.db.as_ref()).await?)
    }
}
