//! Neo4j Query API client

use crate::config::GraphConfig;
use crate::graph::{GraphError, GraphResult, GraphService};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Client for the Neo4j HTTP Query API (v2)
pub struct Neo4jHttpClient {
    client: Client,
    url: String,
    database: String,
    username: String,
    password: String,
}

impl Neo4jHttpClient {
    pub fn new(config: &GraphConfig) -> GraphResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GraphError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

#[async_trait]
impl GraphService for Neo4jHttpClient {
    async fn query(&self, statement: &str, params: Value) -> GraphResult<Vec<Value>> {
        #[derive(Serialize)]
        struct Request<'a> {
            statement: &'a str,
            #[serde(skip_serializing_if = "Value::is_null")]
            parameters: Value,
        }

        debug!("Executing statement against {}: {}", self.database, statement);

        let url = format!("{}/db/{}/query/v2", self.url, self.database);
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&Request {
                statement,
                parameters: params,
            })
            .send()
            .await
            .map_err(|e| GraphError::NetworkError(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GraphError::NetworkError(e.to_string()))?;

        parse_query_response(status, &body)
    }
}

/// Turn one Query API response into rows.
///
/// Server-reported statement errors and non-2xx statuses both surface as
/// [`GraphError::ExecutionError`]; auth failures and proxies answer with
/// non-JSON bodies, which must not be misreported as serialization bugs.
fn parse_query_response(status: StatusCode, body: &str) -> GraphResult<Vec<Value>> {
    #[derive(Deserialize)]
    struct Response {
        data: Option<Data>,
        #[serde(default)]
        errors: Vec<Neo4jError>,
    }

    #[derive(Deserialize)]
    struct Data {
        fields: Vec<String>,
        values: Vec<Vec<Value>>,
    }

    #[derive(Deserialize)]
    struct Neo4jError {
        message: String,
    }

    let parsed: Result<Response, _> = serde_json::from_str(body);
    let response = match parsed {
        Ok(response) => response,
        Err(_) if !status.is_success() => {
            return Err(GraphError::ExecutionError(format!(
                "Neo4j returned status {}",
                status
            )));
        }
        Err(e) => return Err(GraphError::SerializationError(e.to_string())),
    };

    if let Some(error) = response.errors.first() {
        return Err(GraphError::ExecutionError(error.message.clone()));
    }

    if !status.is_success() {
        return Err(GraphError::ExecutionError(format!(
            "Neo4j returned status {}",
            status
        )));
    }

    let data = response.data.ok_or_else(|| {
        GraphError::SerializationError("Response contained no data".to_string())
    })?;

    // Zip column names with each value row into one object per row
    let rows = data
        .values
        .into_iter()
        .map(|values| {
            let mut row = Map::new();
            for (field, value) in data.fields.iter().zip(values) {
                row.insert(field.clone(), value);
            }
            Value::Object(row)
        })
        .collect();

    Ok(rows)
}
