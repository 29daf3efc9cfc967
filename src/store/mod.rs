//! Persistence seam for the booking lifecycle.
//!
//! The lifecycle module only talks to [`BookingStore`], so the state machine
//! can be exercised against an in-memory fake in tests while production wires
//! in [`SeaOrmBookingStore`]. The `claim` operation is the one primitive with
//! a non-obvious contract: it must apply the driver assignment and report
//! success/no-op atomically with the status check.

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set,
};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};

/// Optional fields written alongside a status change.
#[derive(Debug, Default, Clone)]
pub struct TransitionFields {
    pub started_at: Option<chrono::DateTime<Utc>>,
    pub completed_at: Option<chrono::DateTime<Utc>>,
    pub actual_fare: Option<f64>,
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: booking::Model) -> Result<booking::Model, DbErr>;

    async fn find(&self, id: Uuid) -> Result<Option<booking::Model>, DbErr>;

    /// Atomically assign a driver: the write applies only if the stored status
    /// is still `Pending` and no driver is set. Returns whether it applied.
    async fn claim(&self, id: Uuid, driver_profile_id: Uuid) -> Result<bool, DbErr>;

    /// Unconditional status update, used by the single-writer transitions
    /// (arrive/start/complete/cancel and admin overrides).
    async fn transition(
        &self,
        id: Uuid,
        status: BookingStatus,
        fields: TransitionFields,
    ) -> Result<booking::Model, DbErr>;
}

/// Production store backed by the SeaORM connection.
pub struct SeaOrmBookingStore<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SeaOrmBookingStore<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookingStore for SeaOrmBookingStore<'_> {
    async fn insert(&self, booking: booking::Model) -> Result<booking::Model, DbErr> {
        let active = booking::ActiveModel {
            id: Set(booking.id),
            booking_number: Set(booking.booking_number),
            customer_id: Set(booking.customer_id),
            driver_id: Set(booking.driver_id),
            vehicle_id: Set(booking.vehicle_id),
            service_type: Set(booking.service_type),
            pickup_address: Set(booking.pickup_address),
            pickup_lat: Set(booking.pickup_lat),
            pickup_lng: Set(booking.pickup_lng),
            dropoff_address: Set(booking.dropoff_address),
            dropoff_lat: Set(booking.dropoff_lat),
            dropoff_lng: Set(booking.dropoff_lng),
            pickup_at: Set(booking.pickup_at),
            estimated_fare: Set(booking.estimated_fare),
            actual_fare: Set(booking.actual_fare),
            payment_method: Set(booking.payment_method),
            notes: Set(booking.notes),
            status: Set(booking.status),
            started_at: Set(booking.started_at),
            completed_at: Set(booking.completed_at),
            created_at: Set(booking.created_at),
            updated_at: Set(booking.updated_at),
        };
        active.insert(self.db).await
    }

    async fn find(&self, id: Uuid) -> Result<Option<booking::Model>, DbErr> {
        booking::Entity::find_by_id(id).one(self.db).await
    }

    async fn claim(&self, id: Uuid, driver_profile_id: Uuid) -> Result<bool, DbErr> {
        // Single conditional UPDATE; the row-level check and the write are one
        // statement, so two racing claims cannot both match.
        let result = booking::Entity::update_many()
            .col_expr(booking::Column::DriverId, Expr::value(driver_profile_id))
            .col_expr(
                booking::Column::Status,
                BookingStatus::DriverAssigned.as_enum(),
            )
            .col_expr(booking::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::Status.eq(BookingStatus::Pending))
            .filter(booking::Column::DriverId.is_null())
            .exec(self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn transition(
        &self,
        id: Uuid,
        status: BookingStatus,
        fields: TransitionFields,
    ) -> Result<booking::Model, DbErr> {
        let booking = booking::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("booking {id}")))?;

        let mut active: booking::ActiveModel = booking.into();
        active.status = Set(status);
        if let Some(t) = fields.started_at {
            active.started_at = Set(Some(t.into()));
        }
        if let Some(t) = fields.completed_at {
            active.completed_at = Set(Some(t.into()));
        }
        if let Some(fare) = fields.actual_fare {
            active.actual_fare = Set(Some(fare));
        }
        active.updated_at = Set(Utc::now().into());

        active.update(self.db).await
    }
}
