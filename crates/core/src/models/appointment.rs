use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::{ResourceAttrs, ResourceKind};
use crate::types::{AppointmentId, AppointmentStatus, ResidenceId, UserId};

/// A meeting between the user who booked it and a concerned user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    pub owner_id: UserId,
    pub concerned_id: UserId,
    pub residence_id: Option<ResidenceId>,
    pub title: String,
    pub note: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    #[must_use]
    pub fn attrs(&self) -> ResourceAttrs {
        let attrs = ResourceAttrs::new(ResourceKind::Appointment)
            .with_owner(self.owner_id)
            .with_concerned(self.concerned_id);
        match self.residence_id {
            Some(residence) => attrs.with_residence(residence),
            None => attrs,
        }
    }
}
