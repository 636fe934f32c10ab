//! Service boundary: turns wire requests into manager calls

mod privilege;
mod protocol;

pub use privilege::{AllowAll, PrivilegeChecker, PrivilegeTable, WILDCARD};
pub use protocol::{Request, Response};

use policyd_api::{PolicyValue, Scope};
use std::sync::Arc;

use crate::error::{ErrorCode, ManagerError};
use crate::manager::PolicyManager;

/// Identity of whoever sent a request, as established by the transport.
///
/// This identity is the administrator recorded for `Set` requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub identity: String,
}

impl Caller {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
        }
    }
}

const BAD_REQUEST_JSON: &str = r#"{"status":"error","code":-1,"error":"bad_request"}"#;

/// Dispatches requests to a [`PolicyManager`].
///
/// Only `Set` is privilege-checked here. `Enroll`, `Disenroll` and `Activate`
/// are accepted from any caller, so the transport must restrict who reaches
/// them.
pub struct PolicyService {
    manager: Arc<PolicyManager>,
    privileges: Box<dyn PrivilegeChecker>,
}

impl PolicyService {
    /// A service that lets every caller set every policy
    pub fn new(manager: Arc<PolicyManager>) -> Self {
        Self {
            manager,
            privileges: Box::new(AllowAll),
        }
    }

    pub fn with_privileges(mut self, checker: impl PrivilegeChecker + 'static) -> Self {
        self.privileges = Box::new(checker);
        self
    }

    pub fn manager(&self) -> &Arc<PolicyManager> {
        &self.manager
    }

    /// Run one request on behalf of `caller`
    pub fn dispatch(&self, caller: &Caller, request: Request) -> Result<Response, ManagerError> {
        match request {
            Request::Enroll { admin } => {
                self.manager.enroll(&admin)?;
                Ok(Response::Ok)
            }
            Request::Disenroll { admin } => {
                self.manager.disenroll(&admin)?;
                Ok(Response::Ok)
            }
            Request::Activate { admin, state } => {
                self.manager.activate(&admin, state)?;
                Ok(Response::Ok)
            }
            Request::Set {
                policy,
                value,
                domain,
            } => {
                if !self.privileges.may_set(&caller.identity, &policy) {
                    return Err(ManagerError::PermissionDenied(format!(
                        "'{}' may not set '{}'",
                        caller.identity, policy
                    )));
                }
                let model = self
                    .manager
                    .model(&policy)
                    .ok_or_else(|| ManagerError::UnknownPolicy(policy.clone()))?;
                let value = PolicyValue::parse_like(model.initial(), &value)?;
                self.manager
                    .set_scoped(&policy, scope_of(domain), value, &caller.identity)?;
                Ok(Response::Ok)
            }
            Request::Get { policy, domain } => {
                let value = self.manager.get_scoped(&policy, scope_of(domain))?;
                Ok(Response::Value { value })
            }
            Request::GetAll { domain } => {
                let values = match domain {
                    Some(uid) => self.manager.get_all_in(uid)?,
                    None => self.manager.get_all()?,
                };
                Ok(Response::Values { values })
            }
        }
    }

    /// Run one request, folding any failure into an error response
    pub fn handle(&self, caller: &Caller, request: Request) -> Response {
        match self.dispatch(caller, request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(caller = %caller.identity, error = %e, "Request failed");
                Response::error(e.code())
            }
        }
    }

    /// Handle one JSON-encoded request and return the JSON response
    pub fn handle_json(&self, caller: &Caller, line: &str) -> String {
        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(caller, request),
            Err(e) => {
                tracing::warn!(caller = %caller.identity, error = %e, "Malformed request");
                Response::error(ErrorCode::BadRequest)
            }
        };
        serde_json::to_string(&response).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to encode response");
            BAD_REQUEST_JSON.to_string()
        })
    }
}

fn scope_of(domain: Option<u32>) -> Scope {
    domain.map_or(Scope::Global, Scope::Domain)
}
