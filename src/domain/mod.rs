pub mod core;
pub mod coupons;
pub mod events;
pub mod orders;
pub mod seats;

pub use self::core::*;
pub use self::coupons::{best_coupon, compute_discount, Coupon, CouponRejection, CouponRule, Discount, DiscountContext, DiscountType};
pub use self::events::{Event, SeatingType, TicketType};
pub use self::orders::{Admission, Customer, Order, PaymentMode, Selection, Ticket, Totals};
pub use self::seats::{Seat, SeatStatus, StatusOverride};
