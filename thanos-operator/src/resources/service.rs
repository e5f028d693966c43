//! Service builder.

use super::child_metadata;
use crate::config::BuilderDefaults;
use crate::crd::Role;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

/// Name of the Service generated for the component `name`.
pub fn service_name(name: &str) -> String {
    name.to_string()
}

/// Ports the Service exposes for `role`.
pub fn service_ports(role: Role, defaults: &BuilderDefaults) -> Vec<ServicePort> {
    let mut ports = vec![
        port("http", defaults.http_port),
        port("grpc", defaults.grpc_port),
    ];
    if role == Role::Receiver {
        ports.push(port("receive", defaults.receive_port));
    }
    ports
}

fn port(name: &str, number: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port: number,
        target_port: Some(IntOrString::String(name.to_string())),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

/// Build the Service fronting the pods of component `name`.
///
/// The selector only uses the group label so that custom pod labels never
/// detach the Service from its pods.
pub fn build_service(
    role: Role,
    name: &str,
    namespace: &str,
    defaults: &BuilderDefaults,
) -> Service {
    let selector = BTreeMap::from([(defaults.group_label_key.clone(), name.to_string())]);

    Service {
        metadata: child_metadata(role, &service_name(name), namespace, defaults),
        spec: Some(ServiceSpec {
            selector: Some(selector),
            ports: Some(service_ports(role, defaults)),
            ..Default::default()
        }),
        ..Default::default()
    }
}
