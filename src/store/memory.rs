//! In-memory booking store for unit tests. The mutex stands in for the
//! database's row-level atomicity: `claim` checks and writes under one lock.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DbErr;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};

use super::{BookingStore, TransitionFields};

#[derive(Default)]
pub struct MemoryBookingStore {
    rows: Mutex<HashMap<Uuid, booking::Model>>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn insert(&self, booking: booking::Model) -> Result<booking::Model, DbErr> {
        let mut rows = self.rows.lock().unwrap();
        rows.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn find(&self, id: Uuid) -> Result<Option<booking::Model>, DbErr> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(&id).cloned())
    }

    async fn claim(&self, id: Uuid, driver_profile_id: Uuid) -> Result<bool, DbErr> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&id) {
            Some(row) if row.status == BookingStatus::Pending && row.driver_id.is_none() => {
                row.driver_id = Some(driver_profile_id);
                row.status = BookingStatus::DriverAssigned;
                row.updated_at = Utc::now().into();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn transition(
        &self,
        id: Uuid,
        status: BookingStatus,
        fields: TransitionFields,
    ) -> Result<booking::Model, DbErr> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&id)
            .ok_or_else(|| DbErr::RecordNotFound(format!("booking {id}")))?;

        row.status = status;
        if let Some(t) = fields.started_at {
            row.started_at = Some(t.into());
        }
        if let Some(t) = fields.completed_at {
            row.completed_at = Some(t.into());
        }
        if let Some(fare) = fields.actual_fare {
            row.actual_fare = Some(fare);
        }
        row.updated_at = Utc::now().into();

        Ok(row.clone())
    }
}
