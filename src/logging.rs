use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    Data, Orbit, Request, Response, Rocket,
};

use crate::model::{district::DistrictRegistry, identity::Role, mongodb::Id};

/// Per-request trace: a sequence number for pairing request and response
/// lines, and the time the request arrived.
#[derive(Debug, Copy, Clone)]
pub struct RequestTrace {
    pub seq: u64,
    started: Instant,
}

impl RequestTrace {
    fn start() -> Self {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        Self {
            seq: SEQ.fetch_add(1, Ordering::Relaxed),
            started: Instant::now(),
        }
    }

    pub fn of<'r>(req: &'r Request<'_>) -> &'r Self {
        req.local_cache(Self::start)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Who a request was authenticated as, once an auth guard has run.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RequestIdentity(Option<(Id, Role)>);

impl RequestIdentity {
    /// First call wins.
    pub fn record(req: &Request<'_>, id: Id, role: Role) {
        req.local_cache(|| RequestIdentity(Some((id, role))));
    }

    fn of(req: &Request<'_>) -> Self {
        *req.local_cache(|| RequestIdentity(None))
    }
}

impl Display for RequestIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some((id, role)) => write!(f, " [{role} {id}]"),
            None => Ok(()),
        }
    }
}

/// Logs launch, every request/response pair and shutdown.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Request logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let config = rocket.config();
        let scheme = if config.tls_enabled() { "https" } else { "http" };
        info!(
            "SmartPol listening on {scheme}://{}:{}",
            config.address, config.port
        );
        if let Some(registry) = rocket.state::<DistrictRegistry>() {
            info!(
                "Serving {} electoral districts ({} overlapping prefixes)",
                registry.districts().len(),
                registry.overlaps().len()
            );
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let trace = RequestTrace::of(req);
        info!("->#{} {} {}", trace.seq, req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let trace = RequestTrace::of(req);
        let status = res.status();
        let route = req
            .route()
            .map(|route| match route.name {
                Some(ref name) => format!("{name} {}", route.uri),
                None => route.uri.to_string(),
            })
            .unwrap_or_else(|| "no route".to_string());
        let line = format!(
            "<-#{} {status} {route}{} in {}ms",
            trace.seq,
            RequestIdentity::of(req),
            trace.elapsed().as_millis()
        );
        match status.class() {
            StatusClass::ServerError => error!("{line}"),
            StatusClass::ClientError => warn!("{line}"),
            _ => info!("{line}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("SmartPol shutting down");
    }
}
