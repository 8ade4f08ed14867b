use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rand::thread_rng;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;
use crate::domain::orders::{generate_ticket_id, DEFAULT_MAX_TICKETS_PER_ORDER};
use crate::domain::{
    ConflictReason, Customer, Errors, Event, EventId, Order, PaymentMode, Seat, SeatConflict, Selection,
    Ticket, TicketId, TicketType, Totals,
};
use crate::money::Money;
use crate::persistence::{modify, EventStore, ModifyError, OrderStore, StoreError};
use super::discounts::{AppliedCoupon, DiscountService};
use super::notifications::{dispatch, Confirmation, Notifier};
use super::payments::{PaymentError, PaymentProvider};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRequest {
    pub customer: Customer,
    pub event_id: EventId,
    pub selection: Selection,
    pub service_fee: Money,
    pub coupon_id: Option<String>,
    pub payment_mode: PaymentMode,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error(transparent)]
    Domain(#[from] Errors),

    #[error("Some seats are not available")]
    Conflict {
        conflicts: Vec<SeatConflict>,
        transaction_id: Option<String>,
    },

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Unknown ticket: {0}")]
    UnknownTicket(TicketId),

    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    /// The sale could not be recorded. When `transaction_id` is set the
    /// shopper has already paid and the order needs manual reconciliation.
    #[error("Order could not be recorded: {source}")]
    Store {
        source: StoreError,
        transaction_id: Option<String>,
    },
}

impl OrderError {
    fn store(source: StoreError, transaction_id: Option<String>) -> Self {
        match source {
            StoreError::NotFound(id) => OrderError::Domain(Errors::UnknownEvent(id)),
            source => OrderError::Store { source, transaction_id },
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        OrderError::store(err, None)
    }
}

/// Units actually sold by the commit, read from the committed document.
enum Sold {
    Seats(Vec<Seat>),
    Admissions(Vec<(TicketType, u32)>),
}

#[derive(Clone)]
pub struct OrderService {
    events: Arc<dyn EventStore>,
    orders: Arc<dyn OrderStore>,
    discounts: DiscountService,
    payments: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn Notifier>,
    admin_email: Option<String>,
    max_tickets: u32,
}

impl OrderService {
    pub fn new(
        events: Arc<dyn EventStore>,
        orders: Arc<dyn OrderStore>,
        discounts: DiscountService,
        payments: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn Notifier>,
        admin_email: Option<String>,
    ) -> Self {
        OrderService {
            events,
            orders,
            discounts,
            payments,
            notifier,
            admin_email,
            max_tickets: DEFAULT_MAX_TICKETS_PER_ORDER,
        }
    }

    pub fn with_max_tickets(mut self, max_tickets: u32) -> Self {
        self.max_tickets = max_tickets;
        self
    }

    /// The commit point of a purchase.
    ///
    /// Seat availability is checked again here, inside the same
    /// compare-and-swap that marks the seats sold, so a hold that lapsed
    /// after the lock cannot let two orders claim one seat. Any conflicting
    /// seat rejects the whole order.
    ///
    /// The coupon use is taken before payment is confirmed, so the amount
    /// confirmed is the amount recorded. An order that fails after that
    /// hands the use back.
    pub fn create_order(&self, request: OrderRequest, now: DateTime<Utc>) -> Result<Order, OrderError> {
        if request.service_fee.is_negative() {
            return Err(Errors::NegativeServiceFee(request.service_fee).into());
        }
        let snapshot = self.events.load(&request.event_id)?.value;
        snapshot.ensure_live()?;
        let (subtotal, units) = request.selection.price(&snapshot, self.max_tickets)?;

        let applied = self
            .discounts
            .resolve(&snapshot, subtotal, units, request.coupon_id.as_deref(), now)?
            .filter(|a| self.redeem(a, &request.event_id));
        let discount = applied.as_ref().map_or(Money::ZERO, |a| a.discount.amount);
        let totals = Totals::compute(subtotal, discount, request.service_fee);

        let (transaction_id, sold, committed) = match self.pay_and_commit(&request, &totals) {
            Ok(done) => done,
            Err(err) => {
                if let Some(applied) = &applied {
                    self.give_back(applied, &request.event_id);
                }
                return Err(err);
            }
        };

        let tickets = self.issue_tickets(&sold, &committed)?;
        let order = Order {
            id: Uuid::new_v4().to_string(),
            event_id: committed.id.clone(),
            event_name: committed.name.clone(),
            customer: request.customer.clone(),
            tickets,
            totals,
            coupon_id: applied.as_ref().map(|a| a.coupon.id.clone()),
            coupon_code: applied.as_ref().map(|a| a.coupon.code.clone()),
            payment_mode: request.payment_mode,
            transaction_id: transaction_id.clone(),
            created_at: now,
        };

        if let Err(err) = self.orders.insert(order.clone()) {
            error!(
                "Seats sold on event {} but order {} was not stored (transaction {:?}): {}",
                committed.id, order.id, transaction_id, err
            );
            return Err(OrderError::Store { source: err, transaction_id });
        }

        info!(
            "Order {} on event {}: {} ticket(s), total {}",
            order.id,
            order.event_id,
            order.tickets.len(),
            order.totals.total_amount
        );

        dispatch(
            self.notifier.as_ref(),
            &Confirmation {
                order: &order,
                event: &committed,
                customer_email: &order.customer.email,
                organizer_email: committed.organizer_email.as_deref(),
                admin_email: self.admin_email.as_deref(),
            },
        );

        Ok(order)
    }

    pub fn find_order(&self, order_id: &str) -> Result<Order, OrderError> {
        self.orders
            .find(order_id)?
            .ok_or_else(|| OrderError::UnknownOrder(order_id.to_string()))
    }

    pub fn find_ticket(&self, ticket_id: &str) -> Result<(Order, Ticket), OrderError> {
        let order = self
            .orders
            .find_by_ticket(ticket_id)?
            .ok_or_else(|| OrderError::UnknownTicket(ticket_id.to_string()))?;
        let ticket = order
            .ticket(ticket_id)
            .cloned()
            .ok_or_else(|| OrderError::UnknownTicket(ticket_id.to_string()))?;
        Ok((order, ticket))
    }

    /// Toggles admission for one ticket. The only change an order allows.
    pub fn toggle_check_in(&self, ticket_id: &str, now: DateTime<Utc>) -> Result<Ticket, OrderError> {
        let order = self
            .orders
            .update_ticket(ticket_id, &mut |order| {
                if let Some(ticket) = order.ticket_mut(ticket_id) {
                    ticket.toggle_check_in(now);
                }
            })
            .map_err(|err| match err {
                StoreError::NotFound(_) => OrderError::UnknownTicket(ticket_id.to_string()),
                other => other.into(),
            })?;

        let ticket = order
            .ticket(ticket_id)
            .cloned()
            .ok_or_else(|| OrderError::UnknownTicket(ticket_id.to_string()))?;
        info!("Ticket {} checked in: {}", ticket.id, ticket.checked_in);
        Ok(ticket)
    }

    fn pay_and_commit(&self, request: &OrderRequest, totals: &Totals) -> Result<(Option<String>, Sold, Event), OrderError> {
        let transaction_id = self.confirm_payment(request, totals)?;
        let (sold, committed) = self.commit(request, transaction_id.as_deref())?;
        Ok((transaction_id, sold, committed))
    }

    fn confirm_payment(&self, request: &OrderRequest, totals: &Totals) -> Result<Option<String>, OrderError> {
        match request.payment_mode {
            PaymentMode::Free => {
                if !totals.total_amount.is_zero() {
                    return Err(PaymentError::NotFree(totals.total_amount).into());
                }
                Ok(None)
            }
            PaymentMode::Online => {
                let transaction_id = request
                    .transaction_id
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .ok_or(PaymentError::MissingTransaction)?;
                self.payments.confirm(transaction_id)?;
                Ok(Some(transaction_id.to_string()))
            }
        }
    }

    /// Re-validates and sells in one compare-and-swap. A lost race is not
    /// retried: the shopper sees every requested seat as in conflict.
    fn commit(&self, request: &OrderRequest, transaction_id: Option<&str>) -> Result<(Sold, Event), OrderError> {
        let result = modify(self.events.as_ref(), &request.event_id, |event| {
            event.ensure_live()?;
            if event.is_general_admission() {
                let pairs = request.selection.admission_pairs();
                let types = event.sell_general_admission(&pairs)?;
                let sold = pairs
                    .iter()
                    .filter(|(_, qty)| *qty > 0)
                    .filter_map(|(id, qty)| types.iter().find(|t| &t.id == id).map(|t| (t.clone(), *qty)))
                    .collect();
                Ok((Sold::Admissions(sold), event.clone()))
            } else {
                let seats = event.sell_seats(&request.selection.seat_ids)?;
                Ok((Sold::Seats(seats), event.clone()))
            }
        });

        let transaction_id = transaction_id.map(str::to_string);
        match result {
            Ok((committed, version)) => {
                debug!("Order commit on event {} wrote v{}", request.event_id, version);
                Ok(committed)
            }
            Err(ModifyError::Rejected(Errors::SeatsUnavailable(conflicts))) => {
                warn!(
                    "Order on event {} rejected, seats taken: {:?}",
                    request.event_id,
                    conflicts.iter().map(|c| (&c.seat_id, c.reason)).collect::<Vec<_>>()
                );
                Err(OrderError::Conflict { conflicts, transaction_id })
            }
            Err(ModifyError::Rejected(err)) => Err(err.into()),
            Err(ModifyError::Store(StoreError::VersionConflict { .. })) => {
                warn!("Order commit on event {} lost a concurrent write", request.event_id);
                Err(OrderError::Conflict {
                    conflicts: request
                        .selection
                        .seat_ids
                        .iter()
                        .map(|id| SeatConflict::new(id.as_str(), ConflictReason::BookingInProgress))
                        .collect(),
                    transaction_id,
                })
            }
            Err(ModifyError::Store(err)) => Err(OrderError::store(err, transaction_id)),
        }
    }

    /// Counts the coupon use. Keeps the discount only if a use was left.
    fn redeem(&self, applied: &AppliedCoupon, event_id: &str) -> bool {
        match self.discounts.redeem(applied) {
            Ok(true) => true,
            Ok(false) => {
                warn!("Coupon {} ran out before order on event {} was priced; no discount", applied.coupon.id, event_id);
                false
            }
            Err(err) => {
                error!("Coupon {} use not recorded for event {}: {}", applied.coupon.id, event_id, err);
                false
            }
        }
    }

    fn give_back(&self, applied: &AppliedCoupon, event_id: &str) {
        match self.discounts.give_back(applied) {
            Ok(()) => debug!("Coupon {} use returned after failed order on event {}", applied.coupon.id, event_id),
            Err(err) => error!("Coupon {} use could not be returned for event {}: {}", applied.coupon.id, event_id, err),
        }
    }

    fn issue_tickets(&self, sold: &Sold, event: &Event) -> Result<Vec<Ticket>, OrderError> {
        let mut rng = thread_rng();
        let mut issued: HashSet<TicketId> = HashSet::new();
        let mut next_id = || -> Result<TicketId, StoreError> {
            loop {
                let id = generate_ticket_id(&mut rng);
                if !issued.contains(&id) && !self.orders.ticket_id_taken(&id)? {
                    issued.insert(id.clone());
                    return Ok(id);
                }
            }
        };

        let mut tickets = Vec::new();
        match sold {
            Sold::Seats(seats) => {
                for seat in seats {
                    tickets.push(Ticket::for_seat(next_id()?, seat, event));
                }
            }
            Sold::Admissions(admissions) => {
                for (ticket_type, qty) in admissions {
                    for _ in 0..*qty {
                        tickets.push(Ticket::for_admission(next_id()?, ticket_type));
                    }
                }
            }
        }
        Ok(tickets)
    }
}
