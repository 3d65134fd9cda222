//! Firestore REST (v1) backend for [`DocumentStore`].
//!
//! Authenticates with a service-account key, with a pre-minted access token,
//! or not at all when pointed at the local emulator.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};
use tracing::{debug, info};
use url::Url;

use crate::config::StoreConfig;
use crate::db::credentials::{ServiceAccountKey, TokenProvider};
use crate::db::store::{Document, DocumentStore, FieldFilter};
use crate::error::StoreError;

const PAGE_SIZE: &str = "300";
const HOSTED_FIRESTORE: &str = "firestore.googleapis.com";

enum Auth {
    Anonymous,
    AccessToken(String),
    ServiceAccount(TokenProvider),
}

pub struct FirestoreStore {
    client: Client,
    documents_url: Url,
    run_query_url: Url,
    auth: Auth,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    document: Option<RawDocument>,
}

/// Rejects ids Firestore cannot address as a single path segment.
pub(crate) fn validate_key(key: &str) -> Result<(), StoreError> {
    let reserved = key.len() >= 4 && key.starts_with("__") && key.ends_with("__");
    if key.is_empty() || key == "." || key == ".." || key.contains('/') || reserved {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

impl FirestoreStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::new();

        let provider = match config.credentials.as_deref().map(str::trim) {
            Some(json) if !json.is_empty() => {
                let key = ServiceAccountKey::from_json(json)?;
                Some(TokenProvider::new(client.clone(), key)?)
            }
            _ => None,
        };

        let project_id = match (&provider, config.project_id.is_empty()) {
            (_, false) => config.project_id.clone(),
            (Some(provider), true) => provider.project_id().to_string(),
            (None, true) => {
                return Err(StoreError::Request("store.project_id is not set".to_string()));
            }
        };

        let auth = match (provider, config.access_token.clone().filter(|t| !t.is_empty())) {
            (Some(provider), _) => Auth::ServiceAccount(provider),
            (None, Some(token)) => Auth::AccessToken(token),
            (None, None) => Auth::Anonymous,
        };

        let mut documents_url = Url::parse(&config.base_url)
            .map_err(|e| StoreError::Request(format!("Invalid store base url: {}", e)))?;

        if matches!(auth, Auth::Anonymous) && documents_url.host_str() == Some(HOSTED_FIRESTORE) {
            return Err(StoreError::Credentials(
                "hosted Firestore needs store.credentials or store.access_token".to_string(),
            ));
        }

        documents_url
            .path_segments_mut()
            .map_err(|_| StoreError::Request("store base url cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend([
                "projects",
                project_id.as_str(),
                "databases",
                config.database.as_str(),
                "documents",
            ]);

        let mut run_query_url = documents_url.clone();
        if let Ok(mut segments) = run_query_url.path_segments_mut() {
            segments.pop().push("documents:runQuery");
        }

        info!("Firestore documents at {}", documents_url);
        Ok(Self {
            client,
            documents_url,
            run_query_url,
            auth,
        })
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        Ok(match &self.auth {
            Auth::Anonymous => request,
            Auth::AccessToken(token) => request.bearer_auth(token),
            Auth::ServiceAccount(provider) => request.bearer_auth(provider.access_token().await?),
        })
    }

    /// Appends each segment percent-encoded, so `#`, `?` and `%` in keys stay inside the path.
    fn url_with(&self, segments: &[&str]) -> Result<Url, StoreError> {
        for segment in segments {
            validate_key(segment)?;
        }

        let mut url = self.documents_url.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Request("store base url cannot hold a path".to_string()))?
            .extend(segments);
        Ok(url)
    }

    fn collection_url(&self, collection: &str) -> Result<Url, StoreError> {
        self.url_with(&[collection])
    }

    fn document_url(&self, collection: &str, key: &str) -> Result<Url, StoreError> {
        self.url_with(&[collection, key])
    }

    async fn list_page(
        &self,
        collection: &str,
        page_token: Option<&str>,
    ) -> Result<ListResponse, StoreError> {
        let mut url = self.collection_url(collection)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("pageSize", PAGE_SIZE);
            if let Some(token) = page_token {
                query.append_pair("pageToken", token);
            }
        }

        let response = self.authorize(self.client.get(url)).await?.send().await?;
        Ok(check(response).await?.json().await?)
    }

    async fn run_query(&self, collection: &str, filter: &FieldFilter) -> Result<Vec<Document>, StoreError> {
        validate_key(collection)?;
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": filter.field },
                        "op": "EQUAL",
                        "value": encode_value(&filter.value),
                    }
                }
            }
        });

        let request = self.client.post(self.run_query_url.clone()).json(&body);
        let response = self.authorize(request).await?.send().await?;
        let results: Vec<QueryResult> = check(response).await?.json().await?;

        results
            .into_iter()
            .filter_map(|r| r.document)
            .map(|d| decode_fields(d.fields))
            .collect()
    }
}

async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    Err(StoreError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let request = self.client.get(self.document_url(collection, key)?);
        let response = self.authorize(request).await?.send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let raw: RawDocument = check(response).await?.json().await?;
        decode_fields(raw.fields).map(Some)
    }

    async fn set(&self, collection: &str, key: &str, doc: Document) -> Result<(), StoreError> {
        let body = json!({ "fields": encode_fields(&doc) });
        let request = self.client.patch(self.document_url(collection, key)?).json(&body);
        let response = self.authorize(request).await?.send().await?;
        check(response).await?;
        Ok(())
    }

    async fn add(&self, collection: &str, doc: Document) -> Result<String, StoreError> {
        let body = json!({ "fields": encode_fields(&doc) });
        let request = self.client.post(self.collection_url(collection)?).json(&body);
        let response = self.authorize(request).await?.send().await?;

        let raw: RawDocument = check(response).await?.json().await?;
        let key = raw
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        debug!("Created {}/{}", collection, key);
        Ok(key)
    }

    async fn scan(
        &self,
        collection: &str,
        filter: Option<FieldFilter>,
    ) -> Result<Vec<Document>, StoreError> {
        if let Some(filter) = filter {
            return self.run_query(collection, &filter).await;
        }

        let mut docs = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let page = self.list_page(collection, page_token.as_deref()).await?;
            for raw in page.documents {
                docs.push(decode_fields(raw.fields)?);
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }
        Ok(docs)
    }
}

fn encode_fields(doc: &Document) -> Value {
    Value::Object(
        doc.iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

pub(crate) fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        // integerValue is an int64 carried as a JSON string
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "integerValue": n.to_string() }),
        Value::Number(n) => json!({ "doubleValue": n }),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn decode_fields(fields: Map<String, Value>) -> Result<Document, StoreError> {
    fields
        .into_iter()
        .map(|(k, v)| decode_value(v).map(|v| (k, v)))
        .collect()
}

pub(crate) fn decode_value(value: Value) -> Result<Value, StoreError> {
    let Value::Object(mut typed) = value else {
        return Err(StoreError::Decode("expected a typed value object".to_string()));
    };

    let Some((kind, inner)) = typed.iter_mut().next().map(|(k, v)| (k.clone(), v.take())) else {
        return Err(StoreError::Decode("empty typed value".to_string()));
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" | "doubleValue" => Ok(inner),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => Ok(inner),
        "integerValue" => match &inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(|n| Value::Number(Number::from(n)))
                .map_err(|e| StoreError::Decode(format!("integerValue {}: {}", s, e))),
            _ => Ok(inner),
        },
        "geoPointValue" => Ok(inner),
        "arrayValue" => {
            let values = match inner {
                Value::Object(mut m) => m.remove("values").unwrap_or(Value::Array(Vec::new())),
                _ => Value::Array(Vec::new()),
            };
            let Value::Array(values) = values else {
                return Err(StoreError::Decode("arrayValue.values is not a list".to_string()));
            };
            values
                .into_iter()
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "mapValue" => {
            let fields = match inner {
                Value::Object(mut m) => match m.remove("fields") {
                    Some(Value::Object(f)) => f,
                    _ => Map::new(),
                },
                _ => Map::new(),
            };
            decode_fields(fields).map(Value::Object)
        }
        other => Err(StoreError::Decode(format!("unsupported value type {}", other))),
    }
}
