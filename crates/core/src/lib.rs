pub mod config;
pub mod crm;
pub mod domain;
pub mod errors;
pub mod normalize;
pub mod offers;

pub use crm::{CrmGateway, InMemoryCrmGateway};
pub use domain::deal::{ContactRecord, DealId, DealRecord};
pub use domain::offer::OfferSummary;
pub use domain::patch::{DealPatch, PropertyUpdate};
pub use errors::{CrmError, OfferError, OfferOperation};
pub use offers::{AcceptOffer, AdjustOffer, OfferAck, OfferPolicy, OfferService, RejectOffer};
