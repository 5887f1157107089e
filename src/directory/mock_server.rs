//! In-process stand-in for the pharmacy directory service.
//!
//! Serves the same REST shape as the hosted mock API over an in-memory list,
//! so the demo can run offline and tests can exercise the real HTTP client.
//! Records are stored as raw JSON so callers can seed deliberately malformed
//! entries.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

/// Shared in-memory record list.
#[derive(Clone, Default)]
pub struct MockDirectory {
    records: Arc<RwLock<Vec<Value>>>,
}

impl MockDirectory {
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Directory pre-populated with [`seed_records`].
    pub fn seeded() -> Self {
        Self::new(seed_records())
    }

    pub async fn records(&self) -> Vec<Value> {
        self.records.read().await.clone()
    }

    async fn next_id(&self) -> String {
        let records = self.records.read().await;
        let max = records
            .iter()
            .filter_map(|r| match r.get("id") {
                Some(Value::String(s)) => s.parse::<u64>().ok(),
                Some(Value::Number(n)) => n.as_u64(),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        (max + 1).to_string()
    }
}

/// Build the directory router: `GET/POST /pharmacies`, `PUT /pharmacies/{id}`.
pub fn directory_routes(directory: MockDirectory) -> Router {
    Router::new()
        .route("/pharmacies", get(list_pharmacies).post(create_pharmacy))
        .route("/pharmacies/{id}", put(update_pharmacy))
        .with_state(directory)
}

/// A running mock directory bound to a random local port.
pub struct MockDirectoryServer {
    pub addr: SocketAddr,
    pub directory: MockDirectory,
    task: JoinHandle<()>,
}

impl MockDirectoryServer {
    /// Bind `127.0.0.1:0` and serve `directory` in a background task.
    pub async fn spawn(directory: MockDirectory) -> std::io::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = directory_routes(directory.clone());

        let task = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        info!(%addr, "Mock pharmacy directory started");
        Ok(Self {
            addr,
            directory,
            task,
        })
    }

    /// Collection URL to hand to the directory client.
    pub fn base_url(&self) -> String {
        format!("http://{}/pharmacies", self.addr)
    }
}

impl Drop for MockDirectoryServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn list_pharmacies(State(directory): State<MockDirectory>) -> Json<Vec<Value>> {
    Json(directory.records().await)
}

async fn create_pharmacy(
    State(directory): State<MockDirectory>,
    Json(mut body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), StatusCode> {
    let id = directory.next_id().await;
    let obj = body.as_object_mut().ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;
    obj.insert("id".to_string(), Value::String(id));

    directory.records.write().await.push(body.clone());
    Ok((StatusCode::CREATED, Json(body)))
}

async fn update_pharmacy(
    State(directory): State<MockDirectory>,
    Path(id): Path<String>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let patch = patch.as_object().ok_or(StatusCode::UNPROCESSABLE_ENTITY)?;

    let mut records = directory.records.write().await;
    let record = records
        .iter_mut()
        .find(|r| match r.get("id") {
            Some(Value::String(s)) => *s == id,
            Some(Value::Number(n)) => n.to_string() == id,
            _ => false,
        })
        .ok_or(StatusCode::NOT_FOUND)?;

    if let Some(obj) = record.as_object_mut() {
        for (key, value) in patch {
            if key != "id" {
                obj.insert(key.clone(), value.clone());
            }
        }
    }
    Ok(Json(record.clone()))
}

/// Sample directory contents used by the demo.
pub fn seed_records() -> Vec<Value> {
    vec![
        json!({
            "id": "1",
            "name": "HealthFirst Pharmacy",
            "phone": "555-123-4567",
            "location": "New York, NY",
            "rx_volume": 1500,
            "contact_person": "Emily Carter",
            "email": "emily@healthfirstpharmacy.com",
            "notes": "Long-standing account"
        }),
        json!({
            "id": "2",
            "name": "Neighborhood Drugs",
            "phone": "(555) 234-5678",
            "location": "Austin, TX",
            "rx_volume": "650",
            "contact_person": "Marcus Lee",
            "email": "marcus@neighborhooddrugs.com"
        }),
        json!({
            "id": "3",
            "name": "Corner Apothecary",
            "phone": "555.345.6789",
            "location": "Portland, OR",
            "rx_volume": 320,
            "contact_person": "Priya Nair",
            "email": null
        }),
        json!({
            "id": "4",
            "name": "Metro Health Pharmacy",
            "phone": "555-456-7890",
            "location": "Chicago, IL",
            "rx_volume": 2400,
            "contact_person": "Daniel Brooks",
            "email": "dbrooks@metrohealthrx.com"
        }),
    ]
}
