use std::{env, fs};

use opentelemetry::KeyValue;
use opentelemetry_sdk::resource::ResourceDetector;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::attribute::{
    DEPLOYMENT_ENVIRONMENT_NAME, HOST_NAME, PROCESS_PID, SERVICE_NAMESPACE,
};

/// Reports the OS-assigned id of the running process.
#[derive(Debug)]
pub struct ProcessResourceDetector;

impl ResourceDetector for ProcessResourceDetector {
    fn detect(&self) -> Resource {
        Resource::builder_empty()
            .with_attribute(KeyValue::new(PROCESS_PID, std::process::id() as i64))
            .build()
    }
}

/// Reports the machine hostname from the HOSTNAME variable, falling back
/// to the kernel hostname files.
#[derive(Debug)]
pub struct HostResourceDetector;

impl ResourceDetector for HostResourceDetector {
    fn detect(&self) -> Resource {
        match hostname() {
            Some(name) => Resource::builder_empty()
                .with_attribute(KeyValue::new(HOST_NAME, name))
                .build(),
            None => Resource::builder_empty().build(),
        }
    }
}

fn hostname() -> Option<String> {
    [
        env::var("HOSTNAME").ok(),
        fs::read_to_string("/proc/sys/kernel/hostname").ok(),
        fs::read_to_string("/etc/hostname").ok(),
    ]
    .into_iter()
    .flatten()
    .map(|name| name.trim().to_string())
    .find(|name| !name.is_empty())
}

/// Resource attached to every exported span: the service identity plus
/// process and host details.
pub fn build_resource() -> Resource {
    Resource::builder()
        .with_detectors(&[
            Box::new(ProcessResourceDetector) as Box<dyn ResourceDetector>,
            Box::new(HostResourceDetector),
        ])
        .with_attributes([
            KeyValue::new(SERVICE_NAMESPACE, "monitoring"),
            KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, "development"),
        ])
        .with_service_name("sample-service")
        .build()
}
