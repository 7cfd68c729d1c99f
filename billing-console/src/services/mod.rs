pub mod collection;
pub mod events;
pub mod ledger_cache;
pub mod overview;
pub mod payment_session;
pub mod roles;

pub use collection::{CollectionSession, Phase};
pub use events::{ChangeBus, PaymentChanged};
pub use ledger_cache::CycleLedgerCache;
pub use overview::{
    CustomerOverview, CycleRow, OverviewLoader, OverviewState, SubscriptionPanel,
    DEFAULT_CYCLE_PAGE_SIZE,
};
pub use payment_session::{
    ComposeMode, ConfirmSummary, Mutation, PaymentForm, PaymentSession, SessionState,
};
pub use roles::{Capabilities, OperatorRole};
