//! HTTP server for the overlay node.

use crate::config::{HttpConfig, OverlayConfig};
use crate::errors::NodeError;
use crate::lookup::LookupService;
use crate::messagebox::{authenticate, MessageBox};
use crate::metrics::{REQUEST_TIME, SUBMISSION_COUNTER};
use crate::storage::OverlayStore;
use crate::topic::TopicManager;
use anyhow::Result;
use postboard_core::wire::{
    AcknowledgeRequest, ErrorObject, ListMessagesRequest, ListMessagesResponse, LookupRequest,
    SendMessageRequest, SubmitRequest, SubmitResponse, IDENTITY_KEY_HEADER, NONCE_HEADER, SIGNATURE_HEADER,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

/// State shared by the HTTP handlers.
pub struct NodeState {
    /// The topic manager
    pub topics: TopicManager,
    /// The lookup service
    pub lookup: LookupService,
    /// The message boxes
    pub messages: MessageBox,
}

impl NodeState {
    /// Opens the store at `path` and wires the overlay services to it.
    pub fn open<P: AsRef<Path>>(path: P, config: &OverlayConfig) -> Result<Self, NodeError> {
        let store = OverlayStore::new(path)?;
        Ok(Self::with_store(store, config))
    }

    /// Wires the overlay services to an open store.
    pub fn with_store(store: OverlayStore, config: &OverlayConfig) -> Self {
        Self {
            topics: TopicManager::new(&config.topic, store.clone()),
            lookup: LookupService::new(&config.provider, &config.topic, store.clone()),
            messages: MessageBox::new(store, config.max_messages_per_box),
        }
    }
}

/// Authentication headers of a message box request.
#[derive(Debug, Default)]
struct AuthHeaders {
    identity_key: Option<String>,
    nonce: Option<String>,
    signature: Option<String>,
}

/// Provides the node state to handlers.
fn with_state(
    state: Arc<NodeState>,
) -> impl Filter<Extract = (Arc<NodeState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn auth_headers() -> impl Filter<Extract = (AuthHeaders,), Error = Rejection> + Clone {
    warp::header::optional::<String>(IDENTITY_KEY_HEADER)
        .and(warp::header::optional::<String>(NONCE_HEADER))
        .and(warp::header::optional::<String>(SIGNATURE_HEADER))
        .map(|identity_key, nonce, signature| AuthHeaders {
            identity_key,
            nonce,
            signature,
        })
}

fn json_reply<T: Serialize>(value: &T) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(value), StatusCode::OK)
}

fn error_reply(error: &NodeError) -> WithStatus<Json> {
    warp::reply::with_status(warp::reply::json(&error.to_error_object()), error.status())
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, NodeError> {
    serde_json::from_slice(body).map_err(|e| NodeError::InvalidRequest(e.to_string()))
}

fn authenticate_request(headers: &AuthHeaders, body: &[u8]) -> Result<String, NodeError> {
    authenticate(
        headers.identity_key.as_deref(),
        headers.nonce.as_deref(),
        headers.signature.as_deref(),
        body,
    )
}

fn submit(body: &[u8], state: &NodeState) -> Result<SubmitResponse, NodeError> {
    let request: SubmitRequest = parse_body(body)?;
    SUBMISSION_COUNTER.inc();

    let mut topics = BTreeMap::new();
    if request.topics.iter().any(|topic| topic == state.topics.topic()) {
        let admittance = state.topics.submit(&request.action)?;
        topics.insert(state.topics.topic().to_string(), admittance.admitted);
    } else {
        debug!("Action {} names no tracked topic", request.action.txid);
    }

    Ok(SubmitResponse {
        status: "success".to_string(),
        topics,
    })
}

/// Handles `POST /submit`.
async fn handle_submit(body: Bytes, state: Arc<NodeState>) -> Result<WithStatus<Json>, Infallible> {
    let _timer = REQUEST_TIME.start_timer();
    Ok(match submit(&body, &state) {
        Ok(response) => json_reply(&response),
        Err(e) => {
            warn!("Submission rejected: {}", e);
            error_reply(&e)
        }
    })
}

/// Handles `POST /lookup`.
async fn handle_lookup(body: Bytes, state: Arc<NodeState>) -> Result<WithStatus<Json>, Infallible> {
    let _timer = REQUEST_TIME.start_timer();
    let result = parse_body::<LookupRequest>(&body).and_then(|request| state.lookup.lookup(&request));
    Ok(match result {
        Ok(outputs) => json_reply(&outputs),
        Err(e) => {
            debug!("Lookup failed: {}", e);
            error_reply(&e)
        }
    })
}

/// Handles `POST /sendMessage`.
async fn handle_send_message(
    headers: AuthHeaders,
    body: Bytes,
    state: Arc<NodeState>,
) -> Result<WithStatus<Json>, Infallible> {
    let _timer = REQUEST_TIME.start_timer();
    let result = authenticate_request(&headers, &body).and_then(|sender| {
        let request: SendMessageRequest = parse_body(&body)?;
        state.messages.send(&sender, &request.message)
    });
    Ok(match result {
        Ok(message_id) => json_reply(&serde_json::json!({ "status": "success", "messageId": message_id })),
        Err(e) => {
            warn!("sendMessage rejected: {}", e);
            error_reply(&e)
        }
    })
}

/// Handles `POST /listMessages`.
async fn handle_list_messages(
    headers: AuthHeaders,
    body: Bytes,
    state: Arc<NodeState>,
) -> Result<WithStatus<Json>, Infallible> {
    let _timer = REQUEST_TIME.start_timer();
    let result = authenticate_request(&headers, &body).and_then(|recipient| {
        let request: ListMessagesRequest = parse_body(&body)?;
        state.messages.list(&recipient, &request.message_box)
    });
    Ok(match result {
        Ok(messages) => json_reply(&ListMessagesResponse {
            status: "success".to_string(),
            messages,
        }),
        Err(e) => {
            warn!("listMessages rejected: {}", e);
            error_reply(&e)
        }
    })
}

/// Handles `POST /acknowledgeMessage`.
async fn handle_acknowledge(
    headers: AuthHeaders,
    body: Bytes,
    state: Arc<NodeState>,
) -> Result<WithStatus<Json>, Infallible> {
    let _timer = REQUEST_TIME.start_timer();
    let result = authenticate_request(&headers, &body).and_then(|recipient| {
        let request: AcknowledgeRequest = parse_body(&body)?;
        state.messages.acknowledge(&recipient, &request.message_ids)
    });
    Ok(match result {
        Ok(acknowledged) => json_reply(&serde_json::json!({ "status": "success", "acknowledged": acknowledged })),
        Err(e) => {
            warn!("acknowledgeMessage rejected: {}", e);
            error_reply(&e)
        }
    })
}

/// Turns unmatched requests into error objects.
async fn handle_rejection(rejection: Rejection) -> Result<WithStatus<Json>, Infallible> {
    let (status, code, description) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "ERR_NOT_FOUND", "no such route".to_string())
    } else if rejection.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "ERR_INVALID_REQUEST", "request body too large".to_string())
    } else if let Some(forbidden) = rejection.find::<warp::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, "ERR_UNAUTHORIZED", forbidden.to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "ERR_NOT_FOUND", "method not allowed".to_string())
    } else {
        (StatusCode::BAD_REQUEST, "ERR_INVALID_REQUEST", format!("{:?}", rejection))
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorObject::new(code, description)),
        status,
    ))
}

/// Builds the CORS policy from the configured origins.
pub fn cors(domains: &[String]) -> warp::cors::Builder {
    let builder = warp::cors()
        .allow_methods(vec!["POST", "OPTIONS"])
        .allow_headers(vec![
            "content-type",
            IDENTITY_KEY_HEADER,
            NONCE_HEADER,
            SIGNATURE_HEADER,
        ]);
    if domains.iter().any(|domain| domain == "*") {
        return builder.allow_any_origin();
    }
    let origins: Vec<&str> = domains
        .iter()
        .map(String::as_str)
        .filter(|origin| {
            let valid = origin.starts_with("http://") || origin.starts_with("https://");
            if !valid {
                warn!("Ignoring CORS origin {:?}", origin);
            }
            valid
        })
        .collect();
    builder.allow_origins(origins)
}

/// All overlay routes.
pub fn routes(
    state: Arc<NodeState>,
    config: &HttpConfig,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let body = warp::body::content_length_limit(config.max_body_bytes).and(warp::body::bytes());

    let submit = warp::path("submit")
        .and(warp::path::end())
        .and(warp::post())
        .and(body.clone())
        .and(with_state(state.clone()))
        .and_then(handle_submit);

    let lookup = warp::path("lookup")
        .and(warp::path::end())
        .and(warp::post())
        .and(body.clone())
        .and(with_state(state.clone()))
        .and_then(handle_lookup);

    let send_message = warp::path("sendMessage")
        .and(warp::path::end())
        .and(warp::post())
        .and(auth_headers())
        .and(body.clone())
        .and(with_state(state.clone()))
        .and_then(handle_send_message);

    let list_messages = warp::path("listMessages")
        .and(warp::path::end())
        .and(warp::post())
        .and(auth_headers())
        .and(body.clone())
        .and(with_state(state.clone()))
        .and_then(handle_list_messages);

    let acknowledge = warp::path("acknowledgeMessage")
        .and(warp::path::end())
        .and(warp::post())
        .and(auth_headers())
        .and(body.clone())
        .and(with_state(state))
        .and_then(handle_acknowledge);

    submit
        .or(lookup)
        .or(send_message)
        .or(list_messages)
        .or(acknowledge)
        .with(cors(&config.cors_domains))
        .recover(handle_rejection)
}

/// Starts the HTTP server and returns the address it is bound to.
pub async fn start_http_server(addr: SocketAddr, state: Arc<NodeState>, config: &HttpConfig) -> Result<SocketAddr> {
    let (bound, server) = warp::serve(routes(state, config)).try_bind_ephemeral(addr)?;
    info!("Overlay listening on {}", bound);

    tokio::spawn(server);

    Ok(bound)
}
