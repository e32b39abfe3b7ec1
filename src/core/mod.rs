//! Small value types shared by every other module: identities and money.
mod ids;
mod money;

pub use ids::{PlayerId, SessionId};
pub use money::{Cents, as_dollars, format_dollars, format_signed_dollars};
