//! Local warp server hosting a `BridgeHost` over an in-memory provider.

use cades_signer::{BridgeHost, InMemoryProvider};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Reply};

fn routes(
    host: Arc<BridgeHost>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = warp::Rejection> + Clone {
    warp::post()
        .and(warp::path("api"))
        .and(warp::path("v1"))
        .and(warp::path::tail())
        .and(warp::body::json::<serde_json::Value>())
        .and_then(move |tail: warp::path::Tail, body: serde_json::Value| {
            let host = Arc::clone(&host);
            async move {
                let response = match host.dispatch(tail.as_str(), body).await {
                    Ok(json) => warp::reply::json(&json).into_response(),
                    Err(error) => warp::reply::with_status(
                        warp::reply::json(&error),
                        StatusCode::BAD_REQUEST,
                    )
                    .into_response(),
                };
                Ok::<_, Infallible>(response)
            }
        })
}

/// Serve `provider` on an ephemeral localhost port.
pub fn spawn_host(provider: &InMemoryProvider) -> (SocketAddr, Arc<BridgeHost>) {
    let host = Arc::new(BridgeHost::new(provider.handle()));
    let (addr, server) = warp::serve(routes(Arc::clone(&host))).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, host)
}
