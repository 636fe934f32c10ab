//! JSON service boundary tests

mod common;

use std::sync::Arc;

use common::Device;
use policyd_api::{PolicyValue, Scope};
use policyd_core::{Caller, PolicyService, PrivilegeTable};
use serde_json::{Value, json};

fn service(device: &Device) -> PolicyService {
    PolicyService::new(Arc::new(common::manager(device)))
}

fn call(service: &PolicyService, caller: &str, request: Value) -> Value {
    let line = service.handle_json(&Caller::new(caller), &request.to_string());
    serde_json::from_str(&line).unwrap()
}

#[test]
fn set_uses_caller_as_admin() {
    let device = Device::new();
    let service = service(&device);

    assert_eq!(call(&service, "x", json!({"op": "enroll", "admin": "mdm"}))["status"], "ok");
    assert_eq!(
        call(&service, "mdm", json!({"op": "set", "policy": "camera", "value": "0"}))["status"],
        "ok"
    );

    let rows = service.manager().storage().managed_values("camera").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].admin, "mdm");

    let reply = call(&service, "x", json!({"op": "get", "policy": "camera"}));
    assert_eq!(reply["status"], "value");
    assert_eq!(reply["value"], json!({"type": "int", "value": 0}));
}

#[test]
fn errors_map_to_stable_codes() {
    let device = Device::new();
    let service = service(&device);

    let reply = call(&service, "ghost", json!({"op": "set", "policy": "camera", "value": "0"}));
    assert_eq!(reply, json!({"status": "error", "code": -3, "error": "unknown_admin"}));

    let reply = call(&service, "x", json!({"op": "get", "policy": "teleport"}));
    assert_eq!(reply["code"], -2);

    let reply = call(&service, "policyd", json!({"op": "set", "policy": "camera", "value": "yes"}));
    assert_eq!(reply["code"], -5);

    let reply = call(&service, "x", json!({"op": "disenroll", "admin": "policyd"}));
    assert_eq!(reply["code"], -4);
}

#[test]
fn malformed_request_is_bad_request() {
    let device = Device::new();
    let service = service(&device);

    let line = service.handle_json(&Caller::new("x"), "{not json");
    let reply: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(reply, json!({"status": "error", "code": -1, "error": "bad_request"}));

    let reply = call(&service, "x", json!({"op": "reboot"}));
    assert_eq!(reply["code"], -1);
}

#[test]
fn error_responses_do_not_leak_details() {
    let device = Device::new();
    let service = service(&device);

    let line = service.handle_json(
        &Caller::new("ghost"),
        &json!({"op": "set", "policy": "camera", "value": "0"}).to_string(),
    );
    assert!(!line.contains("ghost"));
    assert!(!line.contains("camera"));
}

#[test]
fn privilege_table_gates_set() {
    let device = Device::new();
    let service = service(&device).with_privileges(PrivilegeTable::new().grant("camera", "mdm"));
    call(&service, "x", json!({"op": "enroll", "admin": "mdm"}));
    call(&service, "x", json!({"op": "enroll", "admin": "intruder"}));

    let reply = call(&service, "intruder", json!({"op": "set", "policy": "camera", "value": "0"}));
    assert_eq!(reply["code"], -4);
    assert!(service.manager().storage().managed_values("camera").unwrap().is_empty());

    let reply = call(&service, "mdm", json!({"op": "set", "policy": "camera", "value": "0"}));
    assert_eq!(reply["status"], "ok");
}

#[test]
fn privilege_table_does_not_gate_admin_lifecycle() {
    let device = Device::new();
    let service = service(&device).with_privileges(PrivilegeTable::new().grant("camera", "mdm"));

    // Lifecycle requests are open to any caller; the transport restricts them
    let enroll = call(&service, "stranger", json!({"op": "enroll", "admin": "mdm"}));
    assert_eq!(enroll["status"], "ok");
    let activate = call(
        &service,
        "stranger",
        json!({"op": "activate", "admin": "mdm", "state": true}),
    );
    assert_eq!(activate["status"], "ok");
    assert_eq!(
        call(&service, "mdm", json!({"op": "set", "policy": "camera", "value": "0"}))["status"],
        "ok"
    );

    let disenroll = call(&service, "stranger", json!({"op": "disenroll", "admin": "mdm"}));
    assert_eq!(disenroll["status"], "ok");
    assert!(service.manager().storage().managed_values("camera").unwrap().is_empty());
    assert_eq!(device.last("camera", Scope::Global), Some(PolicyValue::Int(1)));
}

#[test]
fn get_all_by_domain() {
    let device = Device::new();
    let service = service(&device);
    call(&service, "x", json!({"op": "enroll", "admin": "mdm"}));

    let reply = call(
        &service,
        "mdm",
        json!({"op": "set", "policy": "browser-autofill", "value": "false", "domain": 5001}),
    );
    assert_eq!(reply["status"], "ok");

    let reply = call(&service, "x", json!({"op": "get_all", "domain": 5001}));
    assert_eq!(reply["status"], "values");
    assert_eq!(
        reply["values"]["browser-autofill"],
        json!({"type": "bool", "value": false})
    );

    let reply = call(&service, "x", json!({"op": "get_all"}));
    assert_eq!(reply["values"].as_object().unwrap().len(), 5);
}
