pub mod api;
pub mod events;
pub mod models;

pub use models::{
    AccountId, Amount, AmountError, DonationEntry, DonationId, EntryId, FieldId, FormId,
    Identity, SessionToken,
};
