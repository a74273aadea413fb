//! Bearer access tokens: secrets, stored records, and caller-facing views.

pub mod issued;
pub mod record;
pub mod secret;
