use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

use crate::errors::{AppError, ResultExt};
use crate::models::{
    Lead, LeadFilter, LeadUpdate, NewLead, NewVehicle, VehicleCompatibility, VehicleFilter,
};

/// Postgres caps bind parameters per statement; five per vehicle row keeps
/// each chunk well below it.
const VEHICLE_INSERT_CHUNK: usize = 1000;

/// Persistence for leads.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Inserts a lead with status `new` and returns the stored row.
    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, AppError>;

    /// Applies an operator revision. `Ok(None)` when the id is unknown.
    async fn update_lead(&self, id: Uuid, update: LeadUpdate) -> Result<Option<Lead>, AppError>;

    /// Newest first.
    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError>;
}

/// Persistence for vehicle compatibility rows.
#[async_trait]
pub trait VehicleStore: Send + Sync {
    /// Inserts every row or none of them. Returns the number inserted.
    async fn bulk_insert_vehicles(&self, rows: &[NewVehicle]) -> Result<u64, AppError>;

    /// Ordered by brand, then model.
    async fn list_vehicles(
        &self,
        filter: &VehicleFilter,
    ) -> Result<Vec<VehicleCompatibility>, AppError>;
}

/// Postgres-backed store for both tables.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgStore {
    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, AppError> {
        sqlx::query_as::<_, Lead>(
            r#"
            INSERT INTO leads (phone, area, type, source, payload, score, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'new')
            RETURNING *
            "#,
        )
        .bind(&lead.phone)
        .bind(&lead.area)
        .bind(lead.lead_type.as_str())
        .bind(&lead.source)
        .bind(serde_json::Value::Object(lead.payload))
        .bind(lead.score)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert lead")
    }

    async fn update_lead(&self, id: Uuid, update: LeadUpdate) -> Result<Option<Lead>, AppError> {
        sqlx::query_as::<_, Lead>(
            r#"
            UPDATE leads
            SET status = COALESCE($2, status),
                notes = COALESCE($3, notes),
                score = COALESCE($4, score)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.notes)
        .bind(update.score)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to update lead {}", id))
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT * FROM leads WHERE TRUE");
        if let Some(status) = filter.status {
            query.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(lead_type) = filter.lead_type {
            query.push(" AND type = ").push_bind(lead_type.as_str());
        }
        query
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit);

        query
            .build_query_as::<Lead>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list leads")
    }
}

#[async_trait]
impl VehicleStore for PgStore {
    async fn bulk_insert_vehicles(&self, rows: &[NewVehicle]) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await.context("Failed to start import")?;
        let mut inserted = 0u64;

        for chunk in rows.chunks(VEHICLE_INSERT_CHUNK) {
            let mut query: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO vehicle_compatibility (brand, model, fuel_type, vehicle_segment, capacity_ah) ",
            );
            query.push_values(chunk, |mut b, row| {
                b.push_bind(row.brand.clone())
                    .push_bind(row.model.clone())
                    .push_bind(row.fuel_type.clone())
                    .push_bind(row.vehicle_segment.clone())
                    .push_bind(row.capacity_ah);
            });
            query.push(" RETURNING id");

            let ids: Vec<(Uuid,)> = query
                .build_query_as()
                .fetch_all(&mut *tx)
                .await
                .context("Failed to insert vehicles")?;
            inserted += ids.len() as u64;
        }

        tx.commit().await.context("Failed to commit import")?;
        Ok(inserted)
    }

    async fn list_vehicles(
        &self,
        filter: &VehicleFilter,
    ) -> Result<Vec<VehicleCompatibility>, AppError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM vehicle_compatibility WHERE TRUE");
        if let Some(ref brand) = filter.brand {
            query
                .push(" AND LOWER(brand) = LOWER(")
                .push_bind(brand.clone())
                .push(")");
        }
        query
            .push(" ORDER BY brand, model LIMIT ")
            .push_bind(filter.limit);

        query
            .build_query_as::<VehicleCompatibility>()
            .fetch_all(&self.pool)
            .await
            .context("Failed to list vehicles")
    }
}

/// In-process store used by tests and local runs without a database.
#[derive(Default)]
pub struct MemoryStore {
    leads: Mutex<Vec<Lead>>,
    vehicles: Mutex<Vec<VehicleCompatibility>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail, as a rejecting database would.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn leads(&self) -> Vec<Lead> {
        self.leads.lock().map(|l| l.clone()).unwrap_or_default()
    }

    pub fn vehicles(&self) -> Vec<VehicleCompatibility> {
        self.vehicles.lock().map(|v| v.clone()).unwrap_or_default()
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::InternalError("store rejected write".to_string()));
        }
        Ok(())
    }
}

fn poisoned<T>(_: T) -> AppError {
    AppError::InternalError("memory store lock poisoned".to_string())
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, AppError> {
        self.check_writable()?;
        let row = Lead {
            id: Uuid::new_v4(),
            phone: lead.phone,
            area: lead.area,
            lead_type: lead.lead_type.as_str().to_string(),
            source: lead.source,
            payload: serde_json::Value::Object(lead.payload),
            score: lead.score,
            status: "new".to_string(),
            notes: None,
            created_at: Utc::now(),
        };
        self.leads.lock().map_err(poisoned)?.push(row.clone());
        Ok(row)
    }

    async fn update_lead(&self, id: Uuid, update: LeadUpdate) -> Result<Option<Lead>, AppError> {
        self.check_writable()?;
        let mut leads = self.leads.lock().map_err(poisoned)?;
        let Some(lead) = leads.iter_mut().find(|l| l.id == id) else {
            return Ok(None);
        };
        if let Some(status) = update.status {
            lead.status = status.as_str().to_string();
        }
        if let Some(notes) = update.notes {
            lead.notes = Some(notes);
        }
        if let Some(score) = update.score {
            lead.score = score;
        }
        Ok(Some(lead.clone()))
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
        let leads = self.leads.lock().map_err(poisoned)?;
        let mut matching: Vec<Lead> = leads
            .iter()
            .filter(|l| filter.status.map_or(true, |s| l.status == s.as_str()))
            .filter(|l| filter.lead_type.map_or(true, |t| l.lead_type == t.as_str()))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(filter.limit.max(0) as usize);
        Ok(matching)
    }
}

#[async_trait]
impl VehicleStore for MemoryStore {
    async fn bulk_insert_vehicles(&self, rows: &[NewVehicle]) -> Result<u64, AppError> {
        self.check_writable()?;
        let now = Utc::now();
        let mut vehicles = self.vehicles.lock().map_err(poisoned)?;
        vehicles.extend(rows.iter().map(|row| VehicleCompatibility {
            id: Uuid::new_v4(),
            brand: row.brand.clone(),
            model: row.model.clone(),
            fuel_type: row.fuel_type.clone(),
            vehicle_segment: row.vehicle_segment.clone(),
            capacity_ah: row.capacity_ah,
            battery_group_id: None,
            created_at: now,
        }));
        Ok(rows.len() as u64)
    }

    async fn list_vehicles(
        &self,
        filter: &VehicleFilter,
    ) -> Result<Vec<VehicleCompatibility>, AppError> {
        let vehicles = self.vehicles.lock().map_err(poisoned)?;
        let wanted = filter.brand.as_ref().map(|b| b.to_lowercase());
        let mut matching: Vec<VehicleCompatibility> = vehicles
            .iter()
            .filter(|v| wanted.as_ref().map_or(true, |b| v.brand.to_lowercase() == *b))
            .cloned()
            .collect();
        matching.sort_by(|a, b| (&a.brand, &a.model).cmp(&(&b.brand, &b.model)));
        matching.truncate(filter.limit.max(0) as usize);
        Ok(matching)
    }
}
