//! Order book for the order-tracking variant
//!
//! Orders arrive over time, each asking for a number of pile-pairs. A loading
//! is bound to the lowest-id order that still has unassigned demand, and every
//! completed haul cycle delivers one pair to the order it was bound to.

use super::{SimulationError, SimulationResult};
use crate::types::OrderId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An open customer order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order identifier, assigned in arrival order
    pub id: OrderId,
    /// Pile-pairs the order needs
    pub required: u32,
    /// Pile-pairs bound to loadings so far
    pub assigned: u32,
    /// Pile-pairs delivered so far
    pub delivered: u32,
    /// Arrival time
    pub created_at: f64,
}

impl Order {
    /// Whether another loading may be bound to this order
    pub fn has_unassigned_demand(&self) -> bool {
        self.assigned < self.required
    }
}

/// Outcome of delivering one pile-pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delivery {
    /// The order still needs more
    Partial {
        /// Pairs delivered including this one
        delivered: u32,
        /// Pairs the order needs
        required: u32,
    },
    /// This delivery completed the order
    Completed {
        /// Completion time minus arrival time
        lead_time: f64,
    },
    /// The order is no longer tracked; the delivery was ignored
    ///
    /// The engine never produces this: an order leaves the book only once
    /// every assigned pair is delivered. It guards `deliver` against ids that
    /// did not come from this book, such as deliveries replayed by a driver.
    Stale,
}

/// Summary of order activity for a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    /// Orders that have arrived
    pub arrived: u32,
    /// Orders fully delivered
    pub completed: u32,
    /// Orders still open at the end of the run
    pub open: u32,
    /// Mean arrival-to-completion time
    pub average_lead_time: Option<f64>,
    /// Deliveries that arrived for untracked orders, always 0 for engine-driven runs
    pub stale_deliveries: u64,
}

/// Open orders plus the counters needed for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    open: BTreeMap<OrderId, Order>,
    max_orders: u32,
    arrived: u32,
    completed: u32,
    lead_time_sum: f64,
    stale_deliveries: u64,
}

impl OrderBook {
    /// Empty book that will accept up to `max_orders` arrivals
    pub fn new(max_orders: u32) -> Self {
        Self {
            open: BTreeMap::new(),
            max_orders,
            arrived: 0,
            completed: 0,
            lead_time_sum: 0.0,
            stale_deliveries: 0,
        }
    }

    /// Identifier the next arriving order will get
    pub fn next_id(&self) -> OrderId {
        OrderId::new(self.arrived)
    }

    /// Whether more orders may still arrive
    pub fn accepts_arrivals(&self) -> bool {
        self.arrived < self.max_orders
    }

    /// Orders fully delivered so far
    pub fn completed(&self) -> u32 {
        self.completed
    }

    /// Look up an open order
    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.open.get(&id)
    }

    /// Record an arriving order
    pub fn open_order(&mut self, id: OrderId, required: u32, now: f64) -> SimulationResult<()> {
        if id != self.next_id() {
            return Err(SimulationError::unknown_event(format!(
                "order arrival for {} but next order is {}",
                id,
                self.next_id()
            )));
        }
        if !self.accepts_arrivals() {
            return Err(SimulationError::invariant_violation(format!(
                "order {} exceeds the limit of {} orders",
                id, self.max_orders
            )));
        }

        self.open.insert(id, Order { id, required, assigned: 0, delivered: 0, created_at: now });
        self.arrived += 1;
        Ok(())
    }

    /// Lowest-id order that still has unassigned demand
    pub fn assignable(&self) -> Option<OrderId> {
        self.open.values().find(|order| order.has_unassigned_demand()).map(|order| order.id)
    }

    /// Bind one loading to an order
    pub fn assign(&mut self, id: OrderId) -> SimulationResult<()> {
        let order = self
            .open
            .get_mut(&id)
            .filter(|order| order.has_unassigned_demand())
            .ok_or_else(|| {
                SimulationError::invariant_violation(format!("{} has no unassigned demand", id))
            })?;
        order.assigned += 1;
        Ok(())
    }

    /// Deliver one pile-pair to an order
    pub fn deliver(&mut self, id: OrderId, now: f64) -> Delivery {
        let Some(order) = self.open.get_mut(&id) else {
            self.stale_deliveries += 1;
            return Delivery::Stale;
        };

        order.delivered += 1;
        if order.delivered < order.required {
            return Delivery::Partial { delivered: order.delivered, required: order.required };
        }

        let lead_time = now - order.created_at;
        self.open.remove(&id);
        self.completed += 1;
        self.lead_time_sum += lead_time;
        Delivery::Completed { lead_time }
    }

    /// Snapshot of the book for reporting
    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            arrived: self.arrived,
            completed: self.completed,
            open: self.open.len() as u32,
            average_lead_time: (self.completed > 0)
                .then(|| self.lead_time_sum / f64::from(self.completed)),
            stale_deliveries: self.stale_deliveries,
        }
    }
}
