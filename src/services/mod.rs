pub mod discounts;
pub mod holds;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod sweeper;

pub use self::discounts::{AppliedCoupon, DiscountError, DiscountService};
pub use self::holds::{HoldError, HoldManager, LockOutcome};
pub use self::notifications::{LogNotifier, Notifier, NotifyError};
pub use self::orders::{OrderError, OrderRequest, OrderService};
pub use self::payments::{MockPaymentProvider, PaymentError, PaymentProvider};
pub use self::sweeper::{ExpirySweeper, SweepReport};
