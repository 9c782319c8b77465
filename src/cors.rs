//! Cross-origin access for the browser-based editor.

use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, Method, Status},
    Request, Response, Route,
};

use crate::Config;

const ALLOWED_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str = "Accept, Authorization, Content-Type, X-CSRF-Token";
const EXPOSED_HEADERS: &str = "Link";
/// Seconds a browser may cache a preflight result.
const MAX_AGE: &str = "300";

pub fn routes() -> Vec<Route> {
    routes![preflight]
}

/// Answer any preflight request; the fairing adds the actual CORS headers.
#[options("/<_..>")]
fn preflight() -> Status {
    Status::NoContent
}

/// Does the `Origin` match one of the allowed patterns?
fn origin_allowed(allowed: &[String], origin: &str) -> bool {
    allowed.iter().any(|pattern| match pattern.strip_suffix('*') {
        Some(prefix) => origin.starts_with(prefix),
        None => pattern == origin,
    })
}

/// A fairing that adds CORS headers to responses for allowed origins.
#[derive(Debug, Copy, Clone)]
pub struct CorsFairing;

#[rocket::async_trait]
impl Fairing for CorsFairing {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let Some(origin) = req.headers().get_one("Origin") else {
            return;
        };
        let Some(config) = req.rocket().state::<Config>() else {
            return;
        };
        if !origin_allowed(config.cors_allowed_origins(), origin) {
            return;
        }

        // Credentials are allowed, so the origin is echoed rather than `*`.
        res.set_header(Header::new("Access-Control-Allow-Origin", origin.to_string()));
        res.set_header(Header::new("Vary", "Origin"));
        res.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
        res.set_header(Header::new("Access-Control-Expose-Headers", EXPOSED_HEADERS));
        if req.method() == Method::Options {
            res.set_header(Header::new("Access-Control-Allow-Methods", ALLOWED_METHODS));
            res.set_header(Header::new("Access-Control-Allow-Headers", ALLOWED_HEADERS));
            res.set_header(Header::new("Access-Control-Max-Age", MAX_AGE));
        }
    }
}
