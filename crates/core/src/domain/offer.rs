use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::deal::{ContactRecord, DealRecord};
use crate::normalize;

/// Offer terms as presented to the customer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OfferSummary {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "monto", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "periodos")]
    pub periods: i64,
    #[serde(rename = "pago", with = "rust_decimal::serde::float")]
    pub payment: Decimal,
    #[serde(rename = "tasa", with = "rust_decimal::serde::float")]
    pub rate: Decimal,
    #[serde(rename = "dealName")]
    pub deal_name: String,
    #[serde(rename = "yaProcesado")]
    pub already_processed: bool,
}

impl OfferSummary {
    pub fn from_records(deal: &DealRecord, contact: Option<&ContactRecord>) -> Self {
        Self {
            name: normalize::contact_display_name(contact),
            amount: normalize::money_or_zero(deal.amount.as_deref()),
            periods: normalize::periods_or_zero(deal.periods.as_deref()),
            payment: normalize::money_or_zero(deal.payment.as_deref()),
            rate: normalize::normalize_weekly_rate(deal.weekly_rate.as_deref()),
            deal_name: deal.deal_name.clone().unwrap_or_default(),
            already_processed: deal.already_processed,
        }
    }
}
