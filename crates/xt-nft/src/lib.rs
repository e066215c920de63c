pub mod document;
pub mod error;
pub mod model;
pub mod nft;
pub mod translate;

pub use document::{DocumentStore, RulesetDocument};
pub use error::StoreError;
pub use model::{ChainState, RuleState, Ruleset, RulesetStore, TableState};
pub use nft::{NftStore, parse_ruleset};
